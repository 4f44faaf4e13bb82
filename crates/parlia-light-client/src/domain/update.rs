//! # Update Messages
//!
//! Header updates and initial client/consensus states submitted to the
//! counterparty Parlia light client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::ParliaError;
use super::fork_spec::ForkSpec;
use super::header::ParliaHeader;
use super::proof::decode_account_proof;
use super::validators::Validators;
use super::value_objects::{Address, Fraction, Hash, Height};

/// One update unit: a target header plus the headers finalizing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderUpdate {
    /// RLP-encoded headers; the first is the target
    pub headers: Vec<Vec<u8>>,
    /// Height the counterparty already trusts; `None` before client creation
    pub trusted_height: Option<Height>,
    /// RLP list of account proof nodes for the IBC store contract
    pub account_proof: Vec<u8>,
    /// Validator set of the target's epoch
    pub current_validators: Validators,
    /// Validator set of the epoch before the target's
    pub previous_validators: Validators,
    /// Turn length of the target's epoch
    pub current_turn_length: u8,
    /// Turn length of the epoch before the target's
    pub previous_turn_length: u8,
}

impl HeaderUpdate {
    /// Decode the target header.
    pub fn target(&self) -> Result<ParliaHeader, ParliaError> {
        let raw = self.headers.first().ok_or(ParliaError::EmptyHeaders)?;
        ParliaHeader::decode_rlp(raw)
    }

    /// Decode every header.
    pub fn decode_headers(&self) -> Result<Vec<ParliaHeader>, ParliaError> {
        self.headers
            .iter()
            .map(|raw| ParliaHeader::decode_rlp(raw))
            .collect()
    }

    /// Block number of the target header.
    pub fn target_number(&self) -> Result<u64, ParliaError> {
        Ok(self.target()?.number)
    }

    /// Revisioned height of the target header.
    pub fn height(&self, revision_number: u64) -> Result<Height, ParliaError> {
        Ok(Height::new(revision_number, self.target_number()?))
    }

    /// Account proof nodes, each re-encoded as standalone RLP.
    pub fn account_proof_nodes(&self) -> Result<Vec<Vec<u8>>, ParliaError> {
        decode_account_proof(&self.account_proof)
    }

    /// Return a copy pointing at a different trusted height.
    pub fn with_trusted_height(mut self, trusted_height: Height) -> Self {
        self.trusted_height = Some(trusted_height);
        self
    }

    /// Structural checks performed before submission.
    pub fn validate_basic(&self) -> Result<(), ParliaError> {
        let target = self.target()?;
        self.account_proof_nodes()?;
        if let Some(trusted) = self.trusted_height {
            if trusted.revision_height >= target.number {
                return Err(ParliaError::InvalidTrustedHeight {
                    trusted: trusted.revision_height,
                    target: target.number,
                });
            }
        }
        Ok(())
    }
}

/// Initial client state of the counterparty light client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientState {
    /// Chain id of the Parlia chain
    pub chain_id: u64,
    /// IBC handler contract address
    pub ibc_store_address: Address,
    /// Storage slot of the commitments mapping
    pub ibc_commitments_slot: Hash,
    /// Latest trusted height
    pub latest_height: Height,
    /// Trusting period
    pub trusting_period: Duration,
    /// Maximum allowed clock drift
    pub max_clock_drift: Duration,
    /// Trust level
    pub trust_level: Fraction,
    /// Fraction of the trusting period after which a refresh is due
    pub refresh_threshold_rate: Fraction,
    /// Fork table the client verifies against
    pub fork_specs: Vec<ForkSpec>,
    /// Frozen by misbehaviour
    pub frozen: bool,
}

/// Consensus state trusted at `ClientState::latest_height`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusState {
    /// Header timestamp in seconds
    pub timestamp: u64,
    /// Storage root of the IBC store account (zero if not deployed)
    pub state_root: Hash,
    /// Hash of the validator set of the trusted epoch
    pub current_validators_hash: Hash,
    /// Hash of the validator set of the epoch before it
    pub previous_validators_hash: Hash,
}
