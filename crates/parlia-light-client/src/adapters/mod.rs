//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits for the prover.

mod wire;

pub use wire::BincodeCodec;
