//! # Parlia Prover Service
//!
//! Application service assembling header updates, initial states and
//! misbehaviour evidence from a [`ChainClient`].

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::algorithms::{
    query_latest_finalized_header, query_verifying_headers, setup_headers_for_update,
    EpochSchedule, Finality, NeighborEpoch,
};
use crate::config::ProverConfig;
use crate::domain::{
    commitment_slot, ensure_no_equivocation, extract_validator_set_and_turn_length,
    BoundaryHeightCache, ClientState, ConsensusState, Hash, HeaderUpdate, Height, Misbehaviour,
    ParliaError, ParliaHeader, Validators, EMPTY_HASH,
};
use crate::ports::{ChainClient, ProverApi};

/// Parlia Prover - orchestrates finality search and update planning.
pub struct ParliaProver<C: ChainClient> {
    /// Configuration.
    config: ProverConfig,
    /// Chain RPC.
    chain: Arc<C>,
    /// Fork table and boundary cache.
    schedule: EpochSchedule,
}

impl<C: ChainClient> ParliaProver<C> {
    /// Create a prover with its own boundary cache.
    pub fn new(config: ProverConfig, chain: Arc<C>) -> Result<Self, ParliaError> {
        let cache = Arc::new(BoundaryHeightCache::new(config.boundary_cache_size));
        Self::with_cache(config, chain, cache)
    }

    /// Create a prover sharing `cache` with other provers of the same chain.
    pub fn with_cache(
        config: ProverConfig,
        chain: Arc<C>,
        cache: Arc<BoundaryHeightCache>,
    ) -> Result<Self, ParliaError> {
        config.validate()?;
        let schedule = EpochSchedule::new(config.fork_specs()?, cache)?;
        info!(
            "[parlia] prover ready: network={}, forks={}",
            config.network,
            schedule.fork_specs().len()
        );
        Ok(Self {
            config,
            chain,
            schedule,
        })
    }

    /// Configuration.
    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    /// Epoch schedule.
    pub fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    fn fetcher(&self) -> impl Fn(u64) -> Result<ParliaHeader, ParliaError> + '_ {
        move |height| self.chain.header(height)
    }

    /// Start of the epoch before the one starting at `epoch`.
    fn previous_epoch(&self, epoch: u64) -> Result<u64, ParliaError> {
        let fetch = self.fetcher();
        Ok(self
            .schedule
            .boundary_epochs_at(&fetch, epoch)?
            .previous_epoch_block_number(epoch))
    }

    fn validators_at(&self, epoch: u64) -> Result<(Validators, u8), ParliaError> {
        extract_validator_set_and_turn_length(&self.chain.header(epoch)?)
    }

    /// Wrap finalized `headers` with the account proof and validator sets.
    pub fn build_update(&self, headers: Vec<ParliaHeader>) -> Result<HeaderUpdate, ParliaError> {
        let target = headers.first().ok_or(ParliaError::EmptyHeaders)?;
        let fetch = self.fetcher();

        let current_epoch = self
            .schedule
            .boundary_epochs(&fetch, target)?
            .current_epoch_block_number(target.number);
        let previous_epoch = self.previous_epoch(current_epoch)?;
        let (current_validators, current_turn_length) = self.validators_at(current_epoch)?;
        let (previous_validators, previous_turn_length) = self.validators_at(previous_epoch)?;

        let proof = self
            .chain
            .proof(self.chain.ibc_address(), &[], target.number)?;
        debug!(
            "[parlia] build update: target={}, epoch={}, previous_epoch={}, headers={}",
            target.number,
            current_epoch,
            previous_epoch,
            headers.len()
        );

        Ok(HeaderUpdate {
            headers: headers.iter().map(ParliaHeader::encode_rlp).collect(),
            trusted_height: None,
            account_proof: proof.account_proof,
            current_validators,
            previous_validators,
            current_turn_length,
            previous_turn_length,
        })
    }

    /// Storage proof of the commitment stored under `path` at `height`.
    pub fn prove_commitment(&self, path: &[u8], height: Height) -> Result<Vec<u8>, ParliaError> {
        let slot = commitment_slot(path);
        let proof = self
            .chain
            .proof(self.chain.ibc_address(), &[slot], height.revision_height)?;
        proof.storage_proofs.into_iter().next().ok_or_else(|| {
            ParliaError::ProofVerification(format!(
                "no storage proof for slot {} at {}",
                hex::encode(slot),
                height
            ))
        })
    }

    fn state_root_or_empty(&self, header: &ParliaHeader) -> Hash {
        match self.chain.proof(self.chain.ibc_address(), &[], header.number) {
            Ok(proof) => proof.storage_hash,
            Err(e) => {
                // The IBC handler may not be deployed yet at this height.
                warn!("[parlia] no storage root at {}: {}", header.number, e);
                EMPTY_HASH
            }
        }
    }
}

impl<C: ChainClient> ProverApi for ParliaProver<C> {
    fn get_latest_finalized_header(&self) -> Result<HeaderUpdate, ParliaError> {
        let latest = self.chain.latest_height()?.revision_height;
        let fetch = self.fetcher();
        let (_, headers) = query_latest_finalized_header(&fetch, &self.schedule, latest)?;
        let update = self.build_update(headers)?;
        debug!(
            "[parlia] latest finalized header: height={}, latest={}",
            update.height(self.config.revision_number)?,
            latest
        );
        Ok(update)
    }

    fn query_verifiable_neighboring_epoch_header(
        &self,
        epoch: u64,
        limit: u64,
    ) -> Result<NeighborEpoch, ParliaError> {
        let fetch = self.fetcher();
        match query_verifying_headers(&fetch, &self.schedule, epoch, limit)? {
            Finality::Finalized(headers) => Ok(NeighborEpoch::Verified(self.build_update(headers)?)),
            Finality::NotYetFinalized => Ok(NeighborEpoch::NotYetFinalized),
        }
    }

    fn setup_headers_for_update(
        &self,
        trusted_height: Height,
        latest_finalized: HeaderUpdate,
    ) -> Result<Vec<HeaderUpdate>, ParliaError> {
        let latest = self.chain.latest_height()?.revision_height;
        let fetch = self.fetcher();
        setup_headers_for_update(
            |epoch, limit| self.query_verifiable_neighboring_epoch_header(epoch, limit),
            &fetch,
            &self.schedule,
            trusted_height,
            latest_finalized,
            latest,
        )
    }

    fn create_initial_state(&self, target: Height) -> Result<(ClientState, ConsensusState), ParliaError> {
        if target.revision_number != self.config.revision_number {
            return Err(ParliaError::InvalidConfig(format!(
                "target {} is not in revision {}",
                target, self.config.revision_number
            )));
        }
        let fetch = self.fetcher();
        let header = self.chain.header(target.revision_height)?;
        let current_epoch = self
            .schedule
            .boundary_epochs(&fetch, &header)?
            .current_epoch_block_number(header.number);
        let epoch = self.previous_epoch(current_epoch)?;
        let epoch_header = self.chain.header(epoch)?;
        let (validators, _) = extract_validator_set_and_turn_length(&epoch_header)?;
        let (previous_validators, _) = self.validators_at(self.previous_epoch(epoch)?)?;

        let client_state = ClientState {
            chain_id: self.chain.chain_id()?,
            ibc_store_address: self.chain.ibc_address(),
            ibc_commitments_slot: EMPTY_HASH,
            latest_height: Height::new(self.config.revision_number, epoch),
            trusting_period: self.config.trusting_period()?,
            max_clock_drift: self.config.max_clock_drift()?,
            trust_level: self.config.trust_level()?,
            refresh_threshold_rate: self.config.refresh_threshold_rate()?,
            fork_specs: self.schedule.fork_specs().to_vec(),
            frozen: false,
        };
        let consensus_state = ConsensusState {
            timestamp: epoch_header.time,
            state_root: self.state_root_or_empty(&epoch_header),
            current_validators_hash: validators.hash(),
            previous_validators_hash: previous_validators.hash(),
        };
        info!(
            "[parlia] initial state: target={}, trusted_epoch={}, validators={}",
            target,
            epoch,
            validators.len()
        );
        Ok((client_state, consensus_state))
    }

    fn create_misbehaviour(
        &self,
        client_id: &str,
        header_1: HeaderUpdate,
        header_2: HeaderUpdate,
    ) -> Result<Misbehaviour, ParliaError> {
        Misbehaviour::new(client_id, header_1, header_2)
    }

    fn check_canonical(&self, update: &HeaderUpdate) -> Result<(), ParliaError> {
        for header in update.decode_headers()? {
            let canonical = self.chain.header(header.number)?;
            ensure_no_equivocation(&header, &canonical)?;
        }
        Ok(())
    }
}
