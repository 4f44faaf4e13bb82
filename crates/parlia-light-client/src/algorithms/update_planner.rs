//! # Header Update Planner
//!
//! Builds the ordered header sequence that moves the counterparty client
//! from its trusted height to the latest finalized header.
//!
//! The counterparty can only verify a header with the validator set of the
//! epoch it trusts, so every epoch start between trusted and finalized is
//! submitted first, each finalized within the window in which the relevant
//! validator set is still guaranteed to be signing.

use tracing::{debug, info};

use super::boundary::EpochSchedule;
use crate::domain::{
    extract_validator_set_and_turn_length, HeaderUpdate, Height, ParliaError, Validators,
};
use crate::ports::HeaderFetcher;

/// Outcome of a neighboring-epoch header query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NeighborEpoch {
    /// Epoch header finalized within the limit.
    Verified(HeaderUpdate),
    /// Not finalized within the limit.
    NotYetFinalized,
}

/// Epoch starts strictly between `trusted` and `finalized`, ascending.
pub fn epochs_between<F: HeaderFetcher + ?Sized>(
    fetcher: &F,
    schedule: &EpochSchedule,
    trusted: u64,
    finalized: u64,
) -> Result<Vec<u64>, ParliaError> {
    let finalized_epochs = schedule.boundary_epochs_at(fetcher, finalized)?;
    let mut epoch = finalized_epochs.current_epoch_block_number(finalized);
    if epoch == finalized {
        epoch = finalized_epochs.previous_epoch_block_number(epoch);
    }

    let mut epochs = Vec::new();
    while epoch > trusted {
        epochs.push(epoch);
        let previous = schedule
            .boundary_epochs_at(fetcher, epoch)?
            .previous_epoch_block_number(epoch);
        if previous >= epoch {
            break;
        }
        epoch = previous;
    }
    epochs.reverse();
    Ok(epochs)
}

fn validators_at<F: HeaderFetcher + ?Sized>(
    fetcher: &F,
    epoch: u64,
) -> Result<(Validators, u8), ParliaError> {
    extract_validator_set_and_turn_length(&fetcher.header(epoch)?)
}

/// Ordered updates from `trusted_height` to `latest_finalized`.
///
/// `fetch_neighbor(epoch, limit)` returns a verified header for `epoch`
/// finalized no later than `limit`. Each update trusts its predecessor; the
/// first trusts `trusted_height`.
pub fn setup_headers_for_update<N, F>(
    mut fetch_neighbor: N,
    fetcher: &F,
    schedule: &EpochSchedule,
    trusted_height: Height,
    latest_finalized: HeaderUpdate,
    latest_chain_height: u64,
) -> Result<Vec<HeaderUpdate>, ParliaError>
where
    N: FnMut(u64, u64) -> Result<NeighborEpoch, ParliaError>,
    F: HeaderFetcher + ?Sized,
{
    let trusted = trusted_height.revision_height;
    let finalized = latest_finalized.target_number()?;
    debug!("[parlia] setup headers for update: trusted={}, target={}", trusted, finalized);
    if trusted == finalized {
        return Ok(Vec::new());
    }
    if trusted > finalized {
        return Err(ParliaError::InvalidTrustedHeight {
            trusted,
            target: finalized,
        });
    }

    let epochs = epochs_between(fetcher, schedule, trusted, finalized)?;
    let mut updates = Vec::with_capacity(epochs.len() + 1);
    if !epochs.is_empty() {
        let trusted_epoch = schedule
            .boundary_epochs_at(fetcher, trusted)?
            .current_epoch_block_number(trusted);
        let (mut trusted_validators, mut trusted_turn) = validators_at(fetcher, trusted_epoch)?;
        let mut last_trusted = trusted;

        for epoch in epochs {
            let (validators, turn) = validators_at(fetcher, epoch)?;
            let checkpoint = if validators.is_superset_of(&trusted_validators) {
                validators.checkpoint(turn)
            } else {
                trusted_validators.checkpoint(trusted_turn)
            };
            let limit = (epoch + checkpoint).saturating_sub(1).min(latest_chain_height);

            match fetch_neighbor(epoch, limit)? {
                NeighborEpoch::Verified(update) => updates.push(update),
                NeighborEpoch::NotYetFinalized => {
                    return Err(ParliaError::InsufficientVoteAttestation {
                        epoch,
                        limit,
                        trusted: last_trusted,
                    })
                }
            }
            debug!("[parlia] setup epoch header: trusted={}, height={}, limit={}", last_trusted, epoch, limit);
            last_trusted = epoch;
            trusted_validators = validators;
            trusted_turn = turn;
        }
    }
    updates.push(latest_finalized);

    let chained = with_trusted_heights(updates, trusted_height)?;
    info!("[parlia] {} header(s) to update from {}", chained.len(), trusted_height);
    Ok(chained)
}

fn with_trusted_heights(
    updates: Vec<HeaderUpdate>,
    trusted_height: Height,
) -> Result<Vec<HeaderUpdate>, ParliaError> {
    let mut trusted = trusted_height;
    updates
        .into_iter()
        .map(|update| -> Result<HeaderUpdate, ParliaError> {
            let target = update.target_number()?;
            let chained = update.with_trusted_height(trusted);
            trusted = trusted.with_height(target);
            Ok(chained)
        })
        .collect()
}
