//! # Domain Errors
//!
//! Error types for the Parlia light client prover.
//!
//! Every variant belongs to one [`ErrorKind`] so callers (the relayer loop)
//! can decide between "reconfigure", "retry later" and "alert".

use thiserror::Error;

use super::value_objects::Hash;

/// Error category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing configuration (network name, fork table, parameters).
    Configuration,
    /// Malformed chain data (headers, extra data, proofs, wire messages).
    Decode,
    /// Not enough data on chain yet to answer the query.
    InsufficientData,
    /// The chain returned data violating Parlia protocol rules.
    ProtocolViolation,
    /// Two conflicting headers for the same height.
    Equivocation,
    /// An external collaborator (RPC, storage) failed.
    External,
}

/// Parlia light client error types.
#[derive(Debug, Error)]
pub enum ParliaError {
    /// Unknown network name.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// Fork spec table is empty.
    #[error("Fork spec table is empty")]
    EmptyForkSpecs,

    /// Fork spec parameters are unusable.
    #[error("Invalid fork spec: {0}")]
    InvalidForkSpec(String),

    /// Required prover parameter is missing.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Configuration is inconsistent.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Header could not be RLP decoded.
    #[error("Header decode failed: {reason}")]
    HeaderDecode {
        /// Decoder message
        reason: String,
    },

    /// Header extra data does not hold a validator set.
    #[error("Invalid extra data at height {height}: {reason}")]
    InvalidExtraData {
        /// Header height
        height: u64,
        /// What was wrong
        reason: String,
    },

    /// Header carries a vote attestation that cannot be decoded.
    #[error("Invalid vote attestation at height {height}: {reason}")]
    InvalidVoteAttestation {
        /// Header height
        height: u64,
        /// Decoder message
        reason: String,
    },

    /// Header update holds no headers.
    #[error("Header update is empty")]
    EmptyHeaders,

    /// Account proof is not an RLP list of trie nodes.
    #[error("Account proof decode failed: {0}")]
    AccountProofDecode(String),

    /// Wire (de)serialization failed.
    #[error("Wire format error: {0}")]
    WireFormat(String),

    /// No fork spec is active at the given point.
    #[error("No fork spec found: height={height}, timestamp={timestamp}")]
    NoForkSpecFound {
        /// Queried height
        height: u64,
        /// Queried millisecond timestamp
        timestamp: u64,
    },

    /// A neighboring epoch header could not be finalized inside its limit.
    #[error("Insufficient vote attestation: epoch={epoch}, limit={limit}, trusted={trusted}")]
    InsufficientVoteAttestation {
        /// Epoch block number
        epoch: u64,
        /// Highest height searched
        limit: u64,
        /// Trusted height at that point
        trusted: u64,
    },

    /// No finalized header between 1 and the latest height.
    #[error("No finalized header found below height {0}")]
    NoFinalizedHeader(u64),

    /// Attestation chain contradicts the headers it references.
    #[error("Protocol violation at height {height}: {reason}")]
    ProtocolViolation {
        /// Header height
        height: u64,
        /// What was violated
        reason: String,
    },

    /// Trusted height is not below the target height.
    #[error("Invalid trusted height: trusted={trusted} >= target={target}")]
    InvalidTrustedHeight {
        /// Trusted height
        trusted: u64,
        /// Target height
        target: u64,
    },

    /// Merkle-Patricia proof did not authenticate the expected value.
    #[error("Proof verification failed: {0}")]
    ProofVerification(String),

    /// Two headers at the same height with different hashes.
    #[error("Equivocation detected at height {height}: {} != {}", hex::encode(.hash_1), hex::encode(.hash_2))]
    EquivocationDetected {
        /// Shared height
        height: u64,
        /// First header hash
        hash_1: Hash,
        /// Second header hash
        hash_2: Hash,
    },

    /// Header fetch or RPC failure.
    #[error("Fetch failed at height {height}: {reason}")]
    Fetch {
        /// Requested height
        height: u64,
        /// Collaborator message
        reason: String,
    },
}

impl ParliaError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownNetwork(_)
            | Self::EmptyForkSpecs
            | Self::InvalidForkSpec(_)
            | Self::MissingParameter(_)
            | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::HeaderDecode { .. }
            | Self::InvalidExtraData { .. }
            | Self::InvalidVoteAttestation { .. }
            | Self::EmptyHeaders
            | Self::AccountProofDecode(_)
            | Self::WireFormat(_) => ErrorKind::Decode,
            Self::NoForkSpecFound { .. }
            | Self::InsufficientVoteAttestation { .. }
            | Self::NoFinalizedHeader(_) => ErrorKind::InsufficientData,
            Self::ProtocolViolation { .. }
            | Self::InvalidTrustedHeight { .. }
            | Self::ProofVerification(_) => ErrorKind::ProtocolViolation,
            Self::EquivocationDetected { .. } => ErrorKind::Equivocation,
            Self::Fetch { .. } => ErrorKind::External,
        }
    }

    /// True when retrying later (with more blocks produced) may succeed.
    ///
    /// An epoch that missed its checkpoint limit stays unverifiable no matter
    /// how many blocks follow, so `InsufficientVoteAttestation` is permanent.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NoForkSpecFound { .. } | Self::NoFinalizedHeader(_) | Self::Fetch { .. }
        )
    }
}
