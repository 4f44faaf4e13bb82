//! # Parlia Light Client Prover
//!
//! Relayer-side verification core for a Parlia (BNB Smart Chain) light
//! client running on a counterparty chain.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Decide which Parlia headers a counterparty light client must receive to
//! advance from its trusted height to the latest finalized block:
//! - Fork specs select epoch length and turn length per block
//! - Epoch boundaries stay correct across forks that change the epoch length
//! - Vote attestations prove fast finality (target, child, grandchild)
//! - Neighboring epoch headers carry validator-set continuity
//!
//! ## Verification Rules
//!
//! | Rule | Description |
//! |------|-------------|
//! | Fast finality | Child attests the target, grandchild justifies the child |
//! | Checkpoint | An epoch header must be finalized before `epoch + checkpoint - 1` |
//! | Superset shortcut | A superset validator set may use its own checkpoint |
//! | Canonical check | A submitted header must match the canonical block hash |
//!
//! ## Module Structure
//!
//! ```text
//! parlia-light-client/
//! ├── domain/          # Headers, fork specs, validators, votes, updates, errors
//! ├── algorithms/      # Fork resolution, boundaries, finality, update planning, proofs
//! ├── ports/           # ProverApi (inbound) + ChainClient, ProofVerifier, MessageCodec (outbound)
//! ├── adapters/        # Bincode wire codec
//! ├── application/     # ParliaProver orchestrating everything
//! └── config.rs        # ProverConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::BincodeCodec;
pub use algorithms::{
    epochs_between, estimate_distance, find_target_fork_spec, get_boundary_height,
    is_finalized_by, query_latest_finalized_header, query_verifying_headers,
    setup_headers_for_update, verify_account, verify_membership, AttestedHeader, BoundaryEpochs,
    BoundaryHeight, EpochSchedule, Finality, NeighborEpoch,
};
pub use application::ParliaProver;
pub use config::ProverConfig;
pub use domain::{
    commitment_slot, commitment_storage_key, ensure_no_equivocation,
    extract_validator_set_and_turn_length, fork_specs, invariant_trust_chain, keccak256,
    vote_attestation_from_header, Address, BoundaryHeightCache, ClientState, ConsensusState,
    ErrorKind, ForkActivation, ForkSpec, Fraction, Hash, HeaderUpdate, Height, Misbehaviour,
    Network, ParliaError, ParliaHeader, StateAccount, Validators, VoteAttestation, VoteData,
    DEFAULT_BOUNDARY_CACHE_SIZE, EMPTY_HASH, FINALITY_DEPTH,
};
pub use ports::{
    ChainClient, HeaderFetcher, MessageCodec, MockChain, MockChainBuilder, MockProofVerifier,
    ProofVerifier, ProverApi, StateProof,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
