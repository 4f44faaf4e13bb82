//! # Outbound Ports
//!
//! Traits for external dependencies (chain RPC, trie proof verification,
//! wire codec) plus mock implementations for tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::algorithms::EpochSchedule;
use crate::domain::{
    encode_account_proof, Address, BoundaryHeightCache, ForkSpec, Hash, Height, ParliaError,
    ParliaHeader, Validators, VoteAttestation, VoteData, BLS_SIGNATURE_LENGTH, EMPTY_HASH,
    EXTRA_SEAL, EXTRA_VANITY, VALIDATOR_BYTES_LENGTH,
};

/// Blocking header source used by the algorithms.
///
/// Implemented for every `Fn(u64) -> Result<ParliaHeader, ParliaError>`.
pub trait HeaderFetcher {
    /// Fetch the canonical header at `height`.
    fn header(&self, height: u64) -> Result<ParliaHeader, ParliaError>;
}

impl<F> HeaderFetcher for F
where
    F: Fn(u64) -> Result<ParliaHeader, ParliaError>,
{
    fn header(&self, height: u64) -> Result<ParliaHeader, ParliaError> {
        self(height)
    }
}

/// Result of `eth_getProof` for one account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateProof {
    /// RLP list of account proof nodes
    pub account_proof: Vec<u8>,
    /// Storage root of the account
    pub storage_hash: Hash,
    /// RLP list of storage proof nodes, one per requested key
    pub storage_proofs: Vec<Vec<u8>>,
}

/// Parlia chain RPC - outbound port.
pub trait ChainClient: Send + Sync {
    /// Header at `height`.
    fn header(&self, height: u64) -> Result<ParliaHeader, ParliaError>;

    /// Account and storage proofs of `address` at `height`.
    fn proof(
        &self,
        address: Address,
        storage_keys: &[Hash],
        height: u64,
    ) -> Result<StateProof, ParliaError>;

    /// Canonical chain id.
    fn chain_id(&self) -> Result<u64, ParliaError>;

    /// Latest block height.
    fn latest_height(&self) -> Result<Height, ParliaError>;

    /// IBC handler contract address.
    fn ibc_address(&self) -> Address;
}

/// Merkle-Patricia trie proof verification - outbound port.
pub trait ProofVerifier {
    /// Value stored under `key` in the trie rooted at `root`, `None` if proven absent.
    fn verify(&self, root: &Hash, key: &[u8], proof: &[Vec<u8>]) -> Result<Option<Vec<u8>>, ParliaError>;
}

/// Wire codec for messages handed to the relayer - outbound port.
pub trait MessageCodec {
    /// Encode a message.
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ParliaError>;

    /// Decode a message.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ParliaError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// In-memory Parlia chain.
#[derive(Debug, Default)]
pub struct MockChain {
    /// Chain id.
    pub chain_id: u64,
    /// IBC handler address.
    pub ibc_address: Address,
    /// Headers by number.
    pub headers: BTreeMap<u64, ParliaHeader>,
    /// Proof returned for every height.
    pub state_proof: StateProof,
    /// Should return errors?
    pub should_fail: bool,
    /// Should proof queries alone fail?
    pub fail_proofs: bool,
    /// Number of header fetches served.
    pub fetches: AtomicUsize,
}

impl MockChain {
    /// Start building a generated chain.
    pub fn builder(fork_specs: Vec<ForkSpec>) -> MockChainBuilder {
        MockChainBuilder::new(fork_specs)
    }

    /// Header fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest header number.
    pub fn tip(&self) -> u64 {
        self.headers.keys().next_back().copied().unwrap_or(0)
    }
}

impl ChainClient for MockChain {
    fn header(&self, height: u64) -> Result<ParliaHeader, ParliaError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(ParliaError::Fetch {
                height,
                reason: "Mock failure".into(),
            });
        }
        self.headers.get(&height).cloned().ok_or(ParliaError::Fetch {
            height,
            reason: "header not found".into(),
        })
    }

    fn proof(&self, _address: Address, storage_keys: &[Hash], height: u64) -> Result<StateProof, ParliaError> {
        if self.should_fail || self.fail_proofs {
            return Err(ParliaError::Fetch {
                height,
                reason: "Mock failure".into(),
            });
        }
        let mut proof = self.state_proof.clone();
        proof.storage_proofs.resize(storage_keys.len(), encode_account_proof(&[]));
        Ok(proof)
    }

    fn chain_id(&self) -> Result<u64, ParliaError> {
        Ok(self.chain_id)
    }

    fn latest_height(&self) -> Result<Height, ParliaError> {
        Ok(Height::new(0, self.tip()))
    }

    fn ibc_address(&self) -> Address {
        self.ibc_address
    }
}

/// Builder generating a linked chain whose blocks attest their parents.
///
/// Every block `h >= 2` carries a vote with source `h - 2` and target `h - 1`,
/// which fast-finalizes every block two blocks below the tip.
pub struct MockChainBuilder {
    fork_specs: Vec<ForkSpec>,
    latest: u64,
    genesis_ms: u64,
    block_interval_ms: u64,
    validator_sets: Vec<(u64, Validators, u8)>,
    without_votes: BTreeSet<u64>,
    forged_votes: HashMap<u64, VoteData>,
    state_proof: StateProof,
}

impl MockChainBuilder {
    fn new(fork_specs: Vec<ForkSpec>) -> Self {
        Self {
            fork_specs,
            latest: 0,
            genesis_ms: 1_700_000_000_000,
            block_interval_ms: 3_000,
            validator_sets: vec![(0, mock_validators(4, 0), 1)],
            without_votes: BTreeSet::new(),
            forged_votes: HashMap::new(),
            state_proof: StateProof {
                account_proof: encode_account_proof(&[]),
                ..Default::default()
            },
        }
    }

    /// Generate headers `0..=latest`.
    pub fn latest(mut self, latest: u64) -> Self {
        self.latest = latest;
        self
    }

    /// Timestamp of block 0 and block spacing, in milliseconds.
    pub fn timing(mut self, genesis_ms: u64, block_interval_ms: u64) -> Self {
        self.genesis_ms = genesis_ms;
        self.block_interval_ms = block_interval_ms;
        self
    }

    /// Use `validators` and `turn_length` for epochs starting at or after `from_epoch`.
    pub fn validators_from(mut self, from_epoch: u64, validators: Validators, turn_length: u8) -> Self {
        self.validator_sets.push((from_epoch, validators, turn_length));
        self.validator_sets.sort_by_key(|(from, _, _)| *from);
        self
    }

    /// Blocks in `heights` carry no vote attestation.
    pub fn without_votes(mut self, heights: impl IntoIterator<Item = u64>) -> Self {
        self.without_votes.extend(heights);
        self
    }

    /// Replace the vote data carried by block `height`.
    pub fn forged_vote(mut self, height: u64, data: VoteData) -> Self {
        self.forged_votes.insert(height, data);
        self
    }

    /// Proof returned by [`ChainClient::proof`].
    pub fn state_proof(mut self, state_proof: StateProof) -> Self {
        self.state_proof = state_proof;
        self
    }

    fn millis(&self, height: u64) -> u64 {
        self.genesis_ms + height * self.block_interval_ms
    }

    fn timed_header(&self, height: u64) -> ParliaHeader {
        let ms = self.millis(height);
        let mut mix_digest = EMPTY_HASH;
        mix_digest[24..].copy_from_slice(&(ms % 1000).to_be_bytes());
        ParliaHeader {
            number: height,
            time: ms / 1000,
            mix_digest,
            ..Default::default()
        }
    }

    fn validators_for(&self, epoch: u64) -> (Validators, u8) {
        self.validator_sets
            .iter()
            .rev()
            .find(|(from, _, _)| *from <= epoch)
            .map(|(_, v, t)| (v.clone(), *t))
            .unwrap_or_default()
    }

    /// Generate the chain.
    pub fn build(self) -> Result<MockChain, ParliaError> {
        let schedule = EpochSchedule::new(self.fork_specs.clone(), Arc::new(BoundaryHeightCache::default()))?;
        let timing = |h: u64| -> Result<ParliaHeader, ParliaError> { Ok(self.timed_header(h)) };

        let mut headers = BTreeMap::new();
        let mut hashes: Vec<Hash> = Vec::with_capacity(self.latest as usize + 1);
        for height in 0..=self.latest {
            let mut header = self.timed_header(height);
            header.parent_hash = height.checked_sub(1).map_or(EMPTY_HASH, |p| hashes[p as usize]);
            header.coinbase = [(height % 251) as u8; 20];
            header.root = [(height % 241) as u8; 32];

            let mut extra = vec![0u8; EXTRA_VANITY];
            if schedule.is_epoch_block(&timing, &header)? {
                let (validators, turn_length) = self.validators_for(height);
                extra.push(validators.len() as u8);
                for entry in validators.entries() {
                    extra.extend_from_slice(entry);
                }
                extra.push(turn_length);
            }
            if height >= 2 && !self.without_votes.contains(&height) {
                let data = self.forged_votes.get(&height).cloned().unwrap_or(VoteData {
                    source_number: height - 2,
                    source_hash: hashes[height as usize - 2],
                    target_number: height - 1,
                    target_hash: hashes[height as usize - 1],
                });
                let vote = VoteAttestation {
                    vote_address_set: 0b111,
                    agg_signature: vec![0u8; BLS_SIGNATURE_LENGTH],
                    data,
                    extra: Vec::new(),
                };
                extra.extend(vote.encode_rlp());
            }
            extra.extend([0u8; EXTRA_SEAL]);
            header.extra = extra;

            hashes.push(header.hash());
            headers.insert(height, header);
        }

        Ok(MockChain {
            chain_id: 9999,
            ibc_address: [0x1b; 20],
            headers,
            state_proof: self.state_proof,
            should_fail: false,
            fail_proofs: false,
            fetches: AtomicUsize::new(0),
        })
    }
}

/// Deterministic validator set of `count` members, distinct per `seed`.
pub fn mock_validators(count: usize, seed: u8) -> Validators {
    let entries = (0..count)
        .map(|i| {
            let mut entry = vec![seed; VALIDATOR_BYTES_LENGTH];
            entry[0] = i as u8;
            entry
        })
        .collect();
    Validators::new(entries).unwrap_or_default()
}

/// Trie verifier answering from a fixed table of `(root, key) -> value`.
#[derive(Debug, Default)]
pub struct MockProofVerifier {
    /// Known values.
    pub values: HashMap<(Hash, Vec<u8>), Vec<u8>>,
}

impl MockProofVerifier {
    /// Register `value` under `key` in trie `root`.
    pub fn insert(&mut self, root: Hash, key: &[u8], value: Vec<u8>) {
        self.values.insert((root, key.to_vec()), value);
    }
}

impl ProofVerifier for MockProofVerifier {
    fn verify(&self, root: &Hash, key: &[u8], _proof: &[Vec<u8>]) -> Result<Option<Vec<u8>>, ParliaError> {
        Ok(self.values.get(&(*root, key.to_vec())).cloned())
    }
}
