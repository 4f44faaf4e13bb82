//! # Value Objects
//!
//! Immutable primitives shared by every layer.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// 32-byte keccak-256 hash.
pub type Hash = [u8; 32];

/// 20-byte account address.
pub type Address = [u8; 20];

/// Zero hash.
pub const EMPTY_HASH: Hash = [0u8; 32];

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Keccak-256 over the concatenation of `parts`.
pub fn keccak256_concat<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Revisioned height as tracked by the counterparty client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Height {
    /// Revision (chain upgrade) number
    pub revision_number: u64,
    /// Block number within the revision
    pub revision_height: u64,
}

impl Height {
    /// Create a height.
    pub fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// Same revision, different block number.
    pub fn with_height(&self, revision_height: u64) -> Self {
        Self {
            revision_number: self.revision_number,
            revision_height,
        }
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

/// Rational number (trust level, refresh threshold).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    /// Numerator
    pub numerator: u64,
    /// Denominator
    pub denominator: u64,
}

impl Fraction {
    /// Create a fraction.
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// A fraction is usable when the denominator is set and it does not exceed 1.
    pub fn is_valid(&self) -> bool {
        self.denominator != 0 && self.numerator <= self.denominator
    }
}
