//! # Misbehaviour
//!
//! Evidence of two conflicting headers submitted to freeze the counterparty
//! client. Whether the headers truly conflict is decided by the remote
//! verifier; locally both must be structurally valid.

use serde::{Deserialize, Serialize};

use super::errors::ParliaError;
use super::header::ParliaHeader;
use super::update::HeaderUpdate;

/// Misbehaviour message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misbehaviour {
    /// Counterparty client id
    pub client_id: String,
    /// First header
    pub header_1: HeaderUpdate,
    /// Second header
    pub header_2: HeaderUpdate,
}

impl Misbehaviour {
    /// Package two headers after validating each.
    pub fn new(
        client_id: impl Into<String>,
        header_1: HeaderUpdate,
        header_2: HeaderUpdate,
    ) -> Result<Self, ParliaError> {
        let misbehaviour = Self {
            client_id: client_id.into(),
            header_1,
            header_2,
        };
        misbehaviour.validate_basic()?;
        Ok(misbehaviour)
    }

    /// Both headers pass [`HeaderUpdate::validate_basic`].
    pub fn validate_basic(&self) -> Result<(), ParliaError> {
        if self.client_id.is_empty() {
            return Err(ParliaError::MissingParameter("client_id"));
        }
        self.header_1.validate_basic()?;
        self.header_2.validate_basic()
    }
}

/// Fail when `a` and `b` are different blocks at the same height.
pub fn ensure_no_equivocation(a: &ParliaHeader, b: &ParliaHeader) -> Result<(), ParliaError> {
    if a.number != b.number {
        return Ok(());
    }
    let (hash_1, hash_2) = (a.hash(), b.hash());
    if hash_1 != hash_2 {
        return Err(ParliaError::EquivocationDetected {
            height: a.number,
            hash_1,
            hash_2,
        });
    }
    Ok(())
}
