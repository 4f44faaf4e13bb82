//! # Inbound Ports
//!
//! API trait defining what the Parlia prover offers to a relayer.

use crate::algorithms::NeighborEpoch;
use crate::domain::{ClientState, ConsensusState, HeaderUpdate, Height, Misbehaviour, ParliaError};

/// Parlia prover API - inbound port.
pub trait ProverApi {
    /// Latest finalized header, with its finalizing child and grandchild.
    fn get_latest_finalized_header(&self) -> Result<HeaderUpdate, ParliaError>;

    /// Epoch header at `epoch` finalized no later than `limit`.
    fn query_verifiable_neighboring_epoch_header(
        &self,
        epoch: u64,
        limit: u64,
    ) -> Result<NeighborEpoch, ParliaError>;

    /// Updates moving the counterparty from `trusted_height` to `latest_finalized`.
    fn setup_headers_for_update(
        &self,
        trusted_height: Height,
        latest_finalized: HeaderUpdate,
    ) -> Result<Vec<HeaderUpdate>, ParliaError>;

    /// Client and consensus state for a new counterparty client.
    ///
    /// The state is built from the epoch header preceding `target`'s epoch, so
    /// that the first update can carry the validator set of `target`'s epoch.
    fn create_initial_state(&self, target: Height) -> Result<(ClientState, ConsensusState), ParliaError>;

    /// Package two conflicting headers as misbehaviour evidence.
    fn create_misbehaviour(
        &self,
        client_id: &str,
        header_1: HeaderUpdate,
        header_2: HeaderUpdate,
    ) -> Result<Misbehaviour, ParliaError>;

    /// Fail with `EquivocationDetected` if any header of `update` is not canonical.
    fn check_canonical(&self, update: &HeaderUpdate) -> Result<(), ParliaError>;
}
