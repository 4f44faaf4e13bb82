//! # State Proof Primitives
//!
//! Account/storage proof decoding and IBC commitment key derivation.

use rlp::{Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use super::errors::ParliaError;
use super::value_objects::{keccak256, Hash, EMPTY_HASH};

/// Account record stored in the state trie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAccount {
    /// Nonce
    pub nonce: u64,
    /// Balance as big-endian bytes without leading zeros
    pub balance: Vec<u8>,
    /// Storage trie root
    pub storage_root: Hash,
    /// Code hash
    pub code_hash: Hash,
}

impl StateAccount {
    /// Decode `[nonce, balance, storage_root, code_hash]`.
    pub fn decode_rlp(bytes: &[u8]) -> Result<Self, ParliaError> {
        let invalid = |reason: String| ParliaError::ProofVerification(format!("state account: {reason}"));
        let rlp = Rlp::new(bytes);
        let count = rlp.item_count().map_err(|e| invalid(e.to_string()))?;
        if count != 4 {
            return Err(invalid(format!("expected 4 items, got {count}")));
        }
        let hash_at = |i: usize| -> Result<Hash, ParliaError> {
            let raw: Vec<u8> = rlp.val_at(i).map_err(|e| invalid(e.to_string()))?;
            raw.try_into()
                .map_err(|_| invalid(format!("item {i} is not 32 bytes")))
        };
        Ok(Self {
            nonce: rlp.val_at(0).map_err(|e| invalid(e.to_string()))?,
            balance: rlp.val_at(1).map_err(|e| invalid(e.to_string()))?,
            storage_root: hash_at(2)?,
            code_hash: hash_at(3)?,
        })
    }

    /// RLP encode the account.
    pub fn encode_rlp(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        stream.append(&self.nonce);
        stream.append(&self.balance);
        stream.append(&self.storage_root.to_vec());
        stream.append(&self.code_hash.to_vec());
        stream.out().to_vec()
    }
}

/// Split an RLP list of trie nodes into standalone encoded nodes.
pub fn decode_account_proof(bytes: &[u8]) -> Result<Vec<Vec<u8>>, ParliaError> {
    let rlp = Rlp::new(bytes);
    if !rlp.is_list() {
        return Err(ParliaError::AccountProofDecode("proof is not a list".into()));
    }
    let count = rlp
        .item_count()
        .map_err(|e| ParliaError::AccountProofDecode(e.to_string()))?;
    (0..count)
        .map(|i| {
            rlp.at(i)
                .map(|node| node.as_raw().to_vec())
                .map_err(|e| ParliaError::AccountProofDecode(e.to_string()))
        })
        .collect()
}

/// Encode proof nodes as one RLP list (inverse of [`decode_account_proof`]).
pub fn encode_account_proof(nodes: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(nodes.len());
    for node in nodes {
        stream.append_raw(node, 1);
    }
    stream.out().to_vec()
}

/// Storage slot of `path` in the commitments mapping (slot 0).
pub fn commitment_slot(path: &[u8]) -> Hash {
    let mut preimage = keccak256(path).to_vec();
    preimage.extend_from_slice(&EMPTY_HASH);
    keccak256(&preimage)
}

/// Secure-trie key of the commitment for `path`.
pub fn commitment_storage_key(path: &[u8]) -> Hash {
    keccak256(&commitment_slot(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_roundtrip_fields() {
        let account = StateAccount {
            nonce: 3,
            balance: vec![0x01, 0x00],
            storage_root: [4u8; 32],
            code_hash: [5u8; 32],
        };
        let decoded = StateAccount::decode_rlp(&account.encode_rlp()).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn test_account_rejects_short_hash() {
        let mut stream = RlpStream::new_list(4);
        stream.append(&1u64);
        stream.append(&vec![1u8]);
        stream.append(&vec![1u8; 31]);
        stream.append(&vec![1u8; 32]);
        assert!(StateAccount::decode_rlp(&stream.out()).is_err());
    }

    #[test]
    fn test_proof_nodes_split() {
        let mut a = RlpStream::new_list(2);
        a.append(&vec![1u8; 3]);
        a.append(&vec![2u8; 40]);
        let mut b = RlpStream::new_list(1);
        b.append(&vec![3u8; 33]);
        let nodes = vec![a.out().to_vec(), b.out().to_vec()];

        let encoded = encode_account_proof(&nodes);
        assert_eq!(decode_account_proof(&encoded).unwrap(), nodes);
    }

    #[test]
    fn test_proof_not_list() {
        assert!(matches!(
            decode_account_proof(&[0x83, 1, 2, 3]),
            Err(ParliaError::AccountProofDecode(_))
        ));
    }

    #[test]
    fn test_commitment_slot_derivation() {
        let path = b"commitments/ports/transfer/channels/channel-0/sequences/1";
        let mut preimage = keccak256(path).to_vec();
        preimage.extend([0u8; 32]);
        assert_eq!(commitment_slot(path), keccak256(&preimage));
        assert_eq!(commitment_storage_key(path), keccak256(&keccak256(&preimage)));
    }
}
