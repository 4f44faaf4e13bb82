//! # Fork Specs
//!
//! Versioned Parlia consensus parameters and the per-network activation table.
//!
//! | Fork    | Epoch | Max turn | Gas divider | Msec headers |
//! |---------|-------|----------|-------------|--------------|
//! | Pascal  | 200   | 9        | 256         | no           |
//! | Lorentz | 500   | 64       | 1024        | yes          |
//! | Maxwell | 1000  | 64       | 1024        | yes          |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ParliaError;

/// When a fork spec becomes active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForkActivation {
    /// Active from this block number.
    Height(u64),
    /// Active from the first block whose millisecond timestamp reaches this value.
    Timestamp(u64),
}

impl ForkActivation {
    /// Whether a block at `height` with `ms_timestamp` is on or past this activation.
    pub fn is_reached(&self, height: u64, ms_timestamp: u64) -> bool {
        match *self {
            Self::Height(h) => h <= height,
            Self::Timestamp(t) => t <= ms_timestamp,
        }
    }
}

/// Consensus parameters of one hard fork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkSpec {
    /// Activation predicate
    pub activation: ForkActivation,
    /// Extra RLP items appended to headers after this fork
    pub additional_header_item_count: u64,
    /// Blocks per epoch
    pub epoch_length: u64,
    /// Upper bound of the validator turn length
    pub max_turn_length: u64,
    /// Gas limit bound divider
    pub gas_limit_bound_divider: u64,
    /// Headers carry millisecond timestamps
    pub enable_header_msec: bool,
}

impl ForkSpec {
    /// Reject parameters the epoch arithmetic cannot work with.
    pub fn validate(&self) -> Result<(), ParliaError> {
        if self.epoch_length == 0 {
            return Err(ParliaError::InvalidForkSpec(format!(
                "epoch length must be positive ({:?})",
                self.activation
            )));
        }
        if self.max_turn_length == 0 {
            return Err(ParliaError::InvalidForkSpec(format!(
                "max turn length must be positive ({:?})",
                self.activation
            )));
        }
        Ok(())
    }

    fn pascal(activation: ForkActivation) -> Self {
        Self {
            activation,
            additional_header_item_count: 1,
            epoch_length: 200,
            max_turn_length: 9,
            gas_limit_bound_divider: 256,
            enable_header_msec: false,
        }
    }

    fn lorentz(activation: ForkActivation) -> Self {
        Self {
            activation,
            additional_header_item_count: 1,
            epoch_length: 500,
            max_turn_length: 64,
            gas_limit_bound_divider: 1024,
            enable_header_msec: true,
        }
    }

    fn maxwell(activation: ForkActivation) -> Self {
        Self {
            activation,
            additional_header_item_count: 1,
            epoch_length: 1000,
            max_turn_length: 64,
            gas_limit_bound_divider: 1024,
            enable_header_msec: true,
        }
    }
}

/// Supported chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Local development chain
    Localnet,
    /// Public testnet (chapel)
    Testnet,
    /// Mainnet
    Mainnet,
}

impl FromStr for Network {
    type Err = ParliaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "localnet" => Ok(Self::Localnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(ParliaError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Localnet => "localnet",
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        };
        f.write_str(name)
    }
}

/// Ordered fork table for `network`, oldest first.
///
/// `local_latest_activation` replaces the activation of the newest localnet
/// fork, which lets local chains switch it to a timestamp.
pub fn fork_specs(network: Network, local_latest_activation: Option<ForkActivation>) -> Vec<ForkSpec> {
    match network {
        Network::Localnet => vec![
            ForkSpec::pascal(ForkActivation::Height(0)),
            ForkSpec::lorentz(ForkActivation::Height(1)),
            ForkSpec::maxwell(local_latest_activation.unwrap_or(ForkActivation::Height(1))),
        ],
        Network::Testnet => vec![
            ForkSpec::pascal(ForkActivation::Height(48_576_786)),
            ForkSpec::lorentz(ForkActivation::Height(49_791_365)),
        ],
        // https://bscscan.com/block/48773576
        Network::Mainnet => vec![
            ForkSpec::pascal(ForkActivation::Height(47_618_307)),
            ForkSpec::lorentz(ForkActivation::Height(48_773_576)),
        ],
    }
}
