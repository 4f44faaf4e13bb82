//! # Parlia Header
//!
//! Ethereum-style block header as produced by Parlia validators.
//!
//! The 15 legacy fields are decoded; any post-London items
//! (base fee, withdrawals root, blob gas, requests hash, ...) are carried
//! as raw RLP so that re-encoding is byte-identical and the hash is preserved.

use rlp::{DecoderError, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use super::errors::ParliaError;
use super::value_objects::{keccak256, Address, Hash, EMPTY_HASH};

/// Number of legacy header fields.
pub const BASE_HEADER_FIELDS: usize = 15;

/// Bloom filter width in bytes.
pub const BLOOM_LENGTH: usize = 256;

/// Fixed-length vanity prefix of `extra`.
pub const EXTRA_VANITY: usize = 32;

/// Fixed-length seal (secp256k1 signature) suffix of `extra`.
pub const EXTRA_SEAL: usize = 65;

/// Decoded Parlia block header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParliaHeader {
    /// Parent block hash
    pub parent_hash: Hash,
    /// Ommers hash
    pub uncle_hash: Hash,
    /// Block producer
    pub coinbase: Address,
    /// State trie root
    pub root: Hash,
    /// Transactions trie root
    pub tx_hash: Hash,
    /// Receipts trie root
    pub receipt_hash: Hash,
    /// Logs bloom
    pub bloom: Vec<u8>,
    /// Difficulty (2 in-turn, 1 out-of-turn)
    pub difficulty: u64,
    /// Block number
    pub number: u64,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas used
    pub gas_used: u64,
    /// Timestamp in seconds
    pub time: u64,
    /// Vanity, validator set, vote attestation and seal
    pub extra: Vec<u8>,
    /// Carries the sub-second part of the timestamp
    pub mix_digest: Hash,
    /// Nonce
    pub nonce: [u8; 8],
    /// Raw RLP of the fields following `nonce`
    pub trailing: Vec<Vec<u8>>,
}

impl Default for ParliaHeader {
    fn default() -> Self {
        Self {
            parent_hash: EMPTY_HASH,
            uncle_hash: EMPTY_HASH,
            coinbase: [0u8; 20],
            root: EMPTY_HASH,
            tx_hash: EMPTY_HASH,
            receipt_hash: EMPTY_HASH,
            bloom: vec![0u8; BLOOM_LENGTH],
            difficulty: 2,
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            time: 0,
            extra: Vec::new(),
            mix_digest: EMPTY_HASH,
            nonce: [0u8; 8],
            trailing: Vec::new(),
        }
    }
}

impl ParliaHeader {
    /// Decode a header from its RLP encoding.
    pub fn decode_rlp(bytes: &[u8]) -> Result<Self, ParliaError> {
        Self::decode_list(&Rlp::new(bytes)).map_err(|e| ParliaError::HeaderDecode {
            reason: e.to_string(),
        })
    }

    fn decode_list(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if !rlp.is_list() {
            return Err(DecoderError::RlpExpectedToBeList);
        }
        let count = rlp.item_count()?;
        if count < BASE_HEADER_FIELDS {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let bloom: Vec<u8> = rlp.val_at(6)?;
        if bloom.len() != BLOOM_LENGTH {
            return Err(DecoderError::RlpInvalidLength);
        }
        let mut trailing = Vec::with_capacity(count - BASE_HEADER_FIELDS);
        for i in BASE_HEADER_FIELDS..count {
            trailing.push(rlp.at(i)?.as_raw().to_vec());
        }
        Ok(Self {
            parent_hash: fixed_at(rlp, 0)?,
            uncle_hash: fixed_at(rlp, 1)?,
            coinbase: fixed_at(rlp, 2)?,
            root: fixed_at(rlp, 3)?,
            tx_hash: fixed_at(rlp, 4)?,
            receipt_hash: fixed_at(rlp, 5)?,
            bloom,
            difficulty: rlp.val_at(7)?,
            number: rlp.val_at(8)?,
            gas_limit: rlp.val_at(9)?,
            gas_used: rlp.val_at(10)?,
            time: rlp.val_at(11)?,
            extra: rlp.val_at(12)?,
            mix_digest: fixed_at(rlp, 13)?,
            nonce: fixed_at(rlp, 14)?,
            trailing,
        })
    }

    /// RLP encode the header.
    pub fn encode_rlp(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(BASE_HEADER_FIELDS + self.trailing.len());
        stream.append(&self.parent_hash.to_vec());
        stream.append(&self.uncle_hash.to_vec());
        stream.append(&self.coinbase.to_vec());
        stream.append(&self.root.to_vec());
        stream.append(&self.tx_hash.to_vec());
        stream.append(&self.receipt_hash.to_vec());
        stream.append(&self.bloom);
        stream.append(&self.difficulty);
        stream.append(&self.number);
        stream.append(&self.gas_limit);
        stream.append(&self.gas_used);
        stream.append(&self.time);
        stream.append(&self.extra);
        stream.append(&self.mix_digest.to_vec());
        stream.append(&self.nonce.to_vec());
        for raw in &self.trailing {
            stream.append_raw(raw, 1);
        }
        stream.out().to_vec()
    }

    /// Block hash: keccak-256 of the RLP encoding.
    pub fn hash(&self) -> Hash {
        keccak256(&self.encode_rlp())
    }

    /// Timestamp in milliseconds.
    ///
    /// After the millisecond-header fork the low 8 bytes of `mix_digest`
    /// hold the sub-second milliseconds; before it the digest is zero.
    pub fn milli_timestamp(&self) -> u64 {
        let mut millis = self.time.saturating_mul(1000);
        if self.mix_digest != EMPTY_HASH {
            let mut low = [0u8; 8];
            low.copy_from_slice(&self.mix_digest[24..]);
            millis = millis.saturating_add(u64::from_be_bytes(low));
        }
        millis
    }
}

fn fixed_at<const N: usize>(rlp: &Rlp<'_>, index: usize) -> Result<[u8; N], DecoderError> {
    let bytes: Vec<u8> = rlp.val_at(index)?;
    bytes.try_into().map_err(|_| DecoderError::RlpInvalidLength)
}
