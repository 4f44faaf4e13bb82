//! # State Proof Verification
//!
//! Authenticates the IBC store account and its commitments against a
//! header's state root through the trie [`ProofVerifier`] port.

use rlp::RlpStream;

use crate::domain::{
    commitment_storage_key, decode_account_proof, keccak256, Address, Hash, ParliaError,
    StateAccount,
};
use crate::ports::ProofVerifier;

/// Account of `address` proven against `state_root`.
pub fn verify_account<V: ProofVerifier + ?Sized>(
    verifier: &V,
    state_root: &Hash,
    address: &Address,
    account_proof: &[u8],
) -> Result<StateAccount, ParliaError> {
    let nodes = decode_account_proof(account_proof)?;
    let key = keccak256(address);
    let value = verifier.verify(state_root, &key, &nodes)?.ok_or_else(|| {
        ParliaError::ProofVerification(format!("account {} not found", hex::encode(address)))
    })?;
    StateAccount::decode_rlp(&value)
}

/// Check that `commitment` is stored under `path` in the storage trie `storage_root`.
pub fn verify_membership<V: ProofVerifier + ?Sized>(
    verifier: &V,
    storage_root: &Hash,
    storage_proof: &[u8],
    path: &[u8],
    commitment: &[u8],
) -> Result<(), ParliaError> {
    let nodes = decode_account_proof(storage_proof)?;
    let key = commitment_storage_key(path);
    let recovered = verifier.verify(storage_root, &key, &nodes)?.ok_or_else(|| {
        ParliaError::ProofVerification(format!(
            "no commitment for {}",
            String::from_utf8_lossy(path)
        ))
    })?;

    let mut expected = RlpStream::new();
    expected.append(&commitment.to_vec());
    let expected = expected.out().to_vec();
    if recovered != expected {
        return Err(ParliaError::ProofVerification(format!(
            "value unmatch: {}(length={}) != {}(length={})",
            hex::encode(&recovered),
            recovered.len(),
            hex::encode(&expected),
            expected.len()
        )));
    }
    Ok(())
}
