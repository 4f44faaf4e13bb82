//! # Domain Module
//!
//! Core Parlia types: headers, fork specs, validators, votes and updates.

pub mod boundary_cache;
pub mod errors;
pub mod fork_spec;
pub mod header;
pub mod invariants;
pub mod misbehaviour;
pub mod proof;
pub mod update;
pub mod validators;
pub mod value_objects;
pub mod vote;

pub use boundary_cache::*;
pub use errors::*;
pub use fork_spec::*;
pub use header::*;
pub use invariants::*;
pub use misbehaviour::*;
pub use proof::*;
pub use update::*;
pub use validators::*;
pub use value_objects::*;
pub use vote::*;
