//! # Prover Configuration
//!
//! Network selection, fork table overrides and the parameters passed through
//! to the counterparty client state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{
    fork_specs, ForkActivation, ForkSpec, Fraction, Network, ParliaError,
    DEFAULT_BOUNDARY_CACHE_SIZE,
};

/// Parlia prover configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Network name: `localnet`, `testnet` or `mainnet`.
    pub network: String,

    /// Millisecond timestamp activating the newest localnet fork.
    /// Ignored on other networks.
    pub local_latest_hf_timestamp: Option<u64>,

    /// Trusting period of the counterparty client, in seconds.
    pub trusting_period_secs: Option<u64>,

    /// Maximum clock drift tolerated by the counterparty client, in seconds.
    pub max_clock_drift_secs: Option<u64>,

    /// Trust level of the counterparty client.
    pub trust_level: Option<Fraction>,

    /// Fraction of the trusting period after which the client must be refreshed.
    pub refresh_threshold_rate: Option<Fraction>,

    /// Boundary height cache capacity; 0 disables caching.
    pub boundary_cache_size: usize,

    /// Revision number of produced heights. Initial states are only
    /// created for targets in this revision.
    pub revision_number: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet.to_string(),
            local_latest_hf_timestamp: None,
            trusting_period_secs: Some(86_400),
            max_clock_drift_secs: Some(1),
            trust_level: Some(Fraction::new(1, 3)),
            refresh_threshold_rate: Some(Fraction::new(1, 2)),
            boundary_cache_size: DEFAULT_BOUNDARY_CACHE_SIZE,
            revision_number: 0,
        }
    }
}

impl ProverConfig {
    /// Create a config for testing (localnet, small cache).
    pub fn for_testing() -> Self {
        Self {
            network: Network::Localnet.to_string(),
            trusting_period_secs: Some(3_600),
            max_clock_drift_secs: Some(10),
            boundary_cache_size: 8,
            ..Default::default()
        }
    }

    /// Load from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ParliaError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ParliaError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed network.
    pub fn network(&self) -> Result<Network, ParliaError> {
        Network::from_str(&self.network)
    }

    /// Fork table of the configured network, oldest first.
    pub fn fork_specs(&self) -> Result<Vec<ForkSpec>, ParliaError> {
        let network = self.network()?;
        let override_activation = match network {
            Network::Localnet => self.local_latest_hf_timestamp.map(ForkActivation::Timestamp),
            _ => None,
        };
        let specs = fork_specs(network, override_activation);
        if specs.is_empty() {
            return Err(ParliaError::EmptyForkSpecs);
        }
        for spec in &specs {
            spec.validate()?;
        }
        Ok(specs)
    }

    /// Trusting period.
    pub fn trusting_period(&self) -> Result<Duration, ParliaError> {
        self.trusting_period_secs
            .map(Duration::from_secs)
            .ok_or(ParliaError::MissingParameter("trusting_period"))
    }

    /// Maximum clock drift.
    pub fn max_clock_drift(&self) -> Result<Duration, ParliaError> {
        self.max_clock_drift_secs
            .map(Duration::from_secs)
            .ok_or(ParliaError::MissingParameter("max_clock_drift"))
    }

    /// Trust level.
    pub fn trust_level(&self) -> Result<Fraction, ParliaError> {
        valid_fraction(self.trust_level, "trust_level")
    }

    /// Refresh threshold rate.
    pub fn refresh_threshold_rate(&self) -> Result<Fraction, ParliaError> {
        valid_fraction(self.refresh_threshold_rate, "refresh_threshold_rate")
    }

    /// Check every parameter needed to build a prover.
    pub fn validate(&self) -> Result<(), ParliaError> {
        self.fork_specs()?;
        self.trusting_period()?;
        self.max_clock_drift()?;
        self.trust_level()?;
        self.refresh_threshold_rate()?;
        Ok(())
    }
}

fn valid_fraction(value: Option<Fraction>, name: &'static str) -> Result<Fraction, ParliaError> {
    let fraction = value.ok_or(ParliaError::MissingParameter(name))?;
    if !fraction.is_valid() {
        return Err(ParliaError::InvalidConfig(format!(
            "{name}: {}/{} is not a fraction in [0, 1]",
            fraction.numerator, fraction.denominator
        )));
    }
    Ok(fraction)
}
