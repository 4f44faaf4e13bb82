//! # Algorithms Module
//!
//! Fork resolution, epoch arithmetic, finality search and update planning.

pub mod boundary;
pub mod finality;
pub mod fork_resolver;
pub mod state_proof;
pub mod update_planner;

pub use boundary::{estimate_distance, get_boundary_height, BoundaryEpochs, BoundaryHeight, EpochSchedule};
pub use finality::{
    is_finalized_by, query_latest_finalized_header, query_verifying_headers, AttestedHeader, Finality,
};
pub use fork_resolver::find_target_fork_spec;
pub use state_proof::{verify_account, verify_membership};
pub use update_planner::{epochs_between, setup_headers_for_update, NeighborEpoch};
