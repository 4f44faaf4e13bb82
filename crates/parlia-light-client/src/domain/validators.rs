//! # Validators
//!
//! Validator set carried by epoch headers and the ring view used for
//! rotation and checkpoint arithmetic.
//!
//! ## Epoch header `extra` layout
//!
//! ```text
//! | vanity 32 | count 1 | count * (address 20 + BLS key 48) | turn length 1 | vote attestation | seal 65 |
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::errors::ParliaError;
use super::header::{ParliaHeader, EXTRA_SEAL, EXTRA_VANITY};
use super::value_objects::{keccak256_concat, Address, Hash};

/// BLS public key length.
pub const BLS_PUBKEY_LENGTH: usize = 48;

/// Width of the validator count prefix.
pub const VALIDATOR_NUMBER_SIZE: usize = 1;

/// Width of one validator entry (address + BLS key).
pub const VALIDATOR_BYTES_LENGTH: usize = 20 + BLS_PUBKEY_LENGTH;

/// Width of the turn length suffix.
pub const TURN_LENGTH_SIZE: usize = 1;

/// Ordered, duplicate-free validator set of one epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validators(Vec<Vec<u8>>);

impl Validators {
    /// Build a set from raw entries, rejecting duplicates.
    pub fn new(entries: Vec<Vec<u8>>) -> Result<Self, ParliaError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.as_slice()) {
                return Err(ParliaError::InvalidConfig(format!(
                    "duplicate validator {}",
                    hex::encode(entry)
                )));
            }
        }
        Ok(Self(entries))
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw entries in order.
    pub fn entries(&self) -> &[Vec<u8>] {
        &self.0
    }

    /// Entry at `index`, wrapping around the ring.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        if self.0.is_empty() {
            return None;
        }
        Some(&self.0[index % self.0.len()])
    }

    /// Position of the validator whose entry starts with `address`.
    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.0.iter().position(|v| v.starts_with(address))
    }

    /// Whether `address` is in the set.
    pub fn contains(&self, address: &Address) -> bool {
        self.index_of(address).is_some()
    }

    /// Index following `index`; wraps to 0 after the last validator.
    pub fn next_index(&self, index: usize) -> usize {
        if index + 1 >= self.0.len() {
            0
        } else {
            index + 1
        }
    }

    /// `count` consecutive entries starting at `start`, wrapping around.
    pub fn range(&self, start: usize, count: usize) -> Vec<&[u8]> {
        if self.0.is_empty() {
            return Vec::new();
        }
        let len = self.0.len();
        (0..count)
            .map(|offset| self.0[(start + offset) % len].as_slice())
            .collect()
    }

    /// Blocks after the epoch start by which the new set has fully taken over.
    ///
    /// `(n / 2 + 1) * turn_length`
    pub fn checkpoint(&self, turn_length: u8) -> u64 {
        (self.0.len() as u64 / 2 + 1) * u64::from(turn_length)
    }

    /// Every member of `other` is also a member of `self`.
    pub fn is_superset_of(&self, other: &Validators) -> bool {
        let mine: HashSet<&[u8]> = self.0.iter().map(Vec::as_slice).collect();
        other.0.iter().all(|v| mine.contains(v.as_slice()))
    }

    /// keccak-256 over the concatenated entries.
    pub fn hash(&self) -> Hash {
        keccak256_concat(self.0.iter().map(Vec::as_slice))
    }
}

/// Parse the validator set and turn length from an epoch header.
pub fn extract_validator_set_and_turn_length(
    header: &ParliaHeader,
) -> Result<(Validators, u8), ParliaError> {
    let extra = &header.extra;
    let invalid = |reason: String| ParliaError::InvalidExtraData {
        height: header.number,
        reason,
    };

    if extra.len() < EXTRA_VANITY + EXTRA_SEAL {
        return Err(invalid(format!("extra length {} is too short", extra.len())));
    }
    let num = extra[EXTRA_VANITY] as usize;
    let required = EXTRA_VANITY + VALIDATOR_NUMBER_SIZE + num * VALIDATOR_BYTES_LENGTH
        + TURN_LENGTH_SIZE
        + EXTRA_SEAL;
    if num == 0 || extra.len() < required {
        return Err(invalid(format!(
            "validator bytes length: count={}, extra={}",
            num,
            extra.len()
        )));
    }

    let start = EXTRA_VANITY + VALIDATOR_NUMBER_SIZE;
    let end = start + num * VALIDATOR_BYTES_LENGTH;
    let entries = extra[start..end]
        .chunks_exact(VALIDATOR_BYTES_LENGTH)
        .map(<[u8]>::to_vec)
        .collect();
    let validators = Validators::new(entries).map_err(|e| invalid(e.to_string()))?;
    let turn_length = extra[end];
    if turn_length == 0 {
        return Err(invalid("turn length must be positive".into()));
    }
    Ok((validators, turn_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(i: u8) -> Vec<u8> {
        let mut v = vec![0u8; VALIDATOR_BYTES_LENGTH];
        v[0] = i;
        v[20] = i;
        v
    }

    fn validators(n: usize) -> Validators {
        Validators::new((0..n).map(|i| entry(i as u8 + 1)).collect()).unwrap()
    }

    fn epoch_header(count_byte: u8, entries: usize, turn: Option<u8>) -> ParliaHeader {
        let mut extra = vec![0u8; EXTRA_VANITY];
        extra.push(count_byte);
        for i in 0..entries {
            extra.extend(entry(i as u8 + 1));
        }
        if let Some(t) = turn {
            extra.push(t);
        }
        extra.extend([0u8; EXTRA_SEAL]);
        ParliaHeader {
            number: 400,
            extra,
            ..Default::default()
        }
    }

    #[test]
    fn test_checkpoint_vectors() {
        let cases = [
            (1, [(1, 1), (3, 3), (9, 9)]),
            (5, [(1, 3), (3, 9), (9, 27)]),
            (8, [(1, 5), (3, 15), (9, 45)]),
            (21, [(1, 11), (3, 33), (9, 99)]),
        ];
        for (n, turns) in cases {
            let v = validators(n);
            for (turn, expected) in turns {
                assert_eq!(v.checkpoint(turn), expected, "n={n} turn={turn}");
            }
        }
        let four = validators(4);
        assert_eq!(four.checkpoint(1), 3);
        assert_eq!(four.checkpoint(9), 27);
    }

    #[test]
    fn test_ring_queries() {
        let v = validators(3);
        let mut addr = [0u8; 20];
        addr[0] = 2;
        assert_eq!(v.index_of(&addr), Some(1));
        assert!(v.contains(&addr));
        assert!(!v.contains(&[9u8; 20]));

        assert_eq!(v.next_index(0), 1);
        assert_eq!(v.next_index(2), 0);
        assert_eq!(v.get(4), Some(entry(2).as_slice()));

        let r = v.range(2, 4);
        assert_eq!(r, vec![entry(3).as_slice(), entry(1).as_slice(), entry(2).as_slice(), entry(3).as_slice()]);
    }

    #[test]
    fn test_empty_ring() {
        let v = Validators::default();
        assert!(v.get(0).is_none());
        assert!(v.range(0, 3).is_empty());
        assert_eq!(v.next_index(0), 0);
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(Validators::new(vec![entry(1), entry(1)]).is_err());
    }

    #[test]
    fn test_superset() {
        let big = validators(4);
        let small = validators(2);
        assert!(big.is_superset_of(&small));
        assert!(!small.is_superset_of(&big));
        assert!(big.is_superset_of(&big));
    }

    #[test]
    fn test_hash_depends_on_order() {
        let a = Validators::new(vec![entry(1), entry(2)]).unwrap();
        let b = Validators::new(vec![entry(2), entry(1)]).unwrap();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_extract_valid() {
        let header = epoch_header(3, 3, Some(4));
        let (v, turn) = extract_validator_set_and_turn_length(&header).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v.entries()[0], entry(1));
        assert_eq!(turn, 4);
    }

    #[test]
    fn test_extract_short_extra() {
        let header = ParliaHeader {
            number: 200,
            extra: vec![0u8; 40],
            ..Default::default()
        };
        let err = extract_validator_set_and_turn_length(&header).unwrap_err();
        assert!(matches!(err, ParliaError::InvalidExtraData { height: 200, .. }));
    }

    #[test]
    fn test_extract_zero_count() {
        let header = epoch_header(0, 0, Some(1));
        assert!(extract_validator_set_and_turn_length(&header).is_err());
    }

    #[test]
    fn test_extract_missing_turn_length() {
        let header = epoch_header(2, 2, None);
        assert!(extract_validator_set_and_turn_length(&header).is_err());
    }

    #[test]
    fn test_extract_zero_turn_length() {
        let header = epoch_header(4, 4, Some(0));
        let err = extract_validator_set_and_turn_length(&header).unwrap_err();
        assert!(matches!(
            err,
            ParliaError::InvalidExtraData { height: 400, ref reason } if reason.contains("turn length")
        ));
    }

    #[test]
    fn test_extract_count_exceeds_region() {
        let header = epoch_header(5, 2, Some(1));
        assert!(extract_validator_set_and_turn_length(&header).is_err());
    }

    proptest! {
        #[test]
        fn checkpoint_monotonic_in_count(n1 in 0usize..60, extra in 0usize..60, turn in 1u8..=64) {
            let n2 = n1 + extra;
            prop_assert!(validators(n1).checkpoint(turn) <= validators(n2).checkpoint(turn));
        }

        #[test]
        fn extract_never_panics(extra in proptest::collection::vec(any::<u8>(), 0..400)) {
            let header = ParliaHeader { extra, ..Default::default() };
            let _ = extract_validator_set_and_turn_length(&header);
        }
    }
}
