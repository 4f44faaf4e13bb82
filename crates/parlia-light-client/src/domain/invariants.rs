//! # Domain Invariants
//!
//! Rules every emitted update sequence must satisfy.

use super::errors::ParliaError;
use super::update::HeaderUpdate;
use super::value_objects::Height;

/// Headers required to prove fast finality: target, child, grandchild.
pub const FINALITY_DEPTH: u64 = 2;

/// Minimum step of the fork-boundary search.
pub const MIN_ESTIMATED_DISTANCE: u64 = 1;

/// Default capacity of the boundary height cache.
pub const DEFAULT_BOUNDARY_CACHE_SIZE: usize = 64;

/// Invariant: each update trusts the update before it.
///
/// The first update must trust `trusted`; every later update must trust the
/// target of its predecessor; targets strictly increase.
pub fn invariant_trust_chain(trusted: Height, updates: &[HeaderUpdate]) -> Result<(), ParliaError> {
    let mut expected = trusted;
    for update in updates {
        let target = update.target_number()?;
        match update.trusted_height {
            Some(h) if h == expected => {}
            Some(h) => {
                return Err(ParliaError::ProtocolViolation {
                    height: target,
                    reason: format!("trusted height {h} does not chain to {expected}"),
                })
            }
            None => {
                return Err(ParliaError::ProtocolViolation {
                    height: target,
                    reason: "missing trusted height".into(),
                })
            }
        }
        if target <= expected.revision_height {
            return Err(ParliaError::InvalidTrustedHeight {
                trusted: expected.revision_height,
                target,
            });
        }
        expected = expected.with_height(target);
    }
    Ok(())
}
