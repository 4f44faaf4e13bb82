//! # Finality Verifier
//!
//! Fast finality: a block is finalized once its child attests it and its
//! grandchild carries the justification chain `target -> child`.

use std::collections::VecDeque;
use tracing::debug;

use super::boundary::EpochSchedule;
use crate::domain::{
    vote_attestation_from_header, Hash, ParliaError, ParliaHeader, VoteAttestation, FINALITY_DEPTH,
};
use crate::ports::HeaderFetcher;

/// Outcome of a finality search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Finality {
    /// Headers from the search start up to the finalized target, its child and grandchild.
    Finalized(Vec<ParliaHeader>),
    /// No target in the window is finalized yet; retry with a higher limit.
    NotYetFinalized,
}

/// Header with its hash and attestation.
#[derive(Clone, Debug)]
pub struct AttestedHeader {
    /// Decoded header
    pub header: ParliaHeader,
    /// Block hash
    pub hash: Hash,
    /// Vote attestation, if any
    pub vote: Option<VoteAttestation>,
}

impl AttestedHeader {
    /// Fetch the header at `height` and extract its attestation.
    pub fn fetch<F: HeaderFetcher + ?Sized>(
        fetcher: &F,
        schedule: &EpochSchedule,
        height: u64,
    ) -> Result<Self, ParliaError> {
        let header = fetcher.header(height)?;
        let is_epoch = schedule.is_epoch_block(fetcher, &header)?;
        let vote = vote_attestation_from_header(&header, is_epoch)?;
        Ok(Self {
            hash: header.hash(),
            header,
            vote,
        })
    }
}

/// Whether `target` is finalized by `child` and `grandchild`.
///
/// Attestations whose block numbers line up but whose hashes do not are a
/// protocol violation, not a missing finality.
pub fn is_finalized_by(
    target: &AttestedHeader,
    child: &AttestedHeader,
    grandchild: &AttestedHeader,
) -> Result<bool, ParliaError> {
    let (Some(child_vote), Some(grandchild_vote)) = (&child.vote, &grandchild.vote) else {
        return Ok(false);
    };
    let target_number = target.header.number;
    let child_number = child.header.number;
    if child_vote.data.target_number != target_number
        || grandchild_vote.data.source_number != target_number
        || grandchild_vote.data.target_number != child_number
    {
        return Ok(false);
    }

    let mismatch = |height: u64, what: &str| ParliaError::ProtocolViolation {
        height,
        reason: format!("{what} of block {target_number} attested with a different hash"),
    };
    if child_vote.data.target_hash != target.hash {
        return Err(mismatch(child_number, "target"));
    }
    if grandchild_vote.data.source_hash != target.hash {
        return Err(mismatch(grandchild.header.number, "source"));
    }
    if grandchild_vote.data.target_hash != child.hash {
        return Err(ParliaError::ProtocolViolation {
            height: grandchild.header.number,
            reason: format!("target of block {child_number} attested with a different hash"),
        });
    }
    Ok(true)
}

/// Scan `[from, limit]` for the first finalized target.
///
/// Targets that are not finalized are kept as pass-through headers, so a
/// successful result always starts at `from`.
pub fn query_verifying_headers<F: HeaderFetcher + ?Sized>(
    fetcher: &F,
    schedule: &EpochSchedule,
    from: u64,
    limit: u64,
) -> Result<Finality, ParliaError> {
    let Some(last_target) = limit.checked_sub(FINALITY_DEPTH) else {
        return Ok(Finality::NotYetFinalized);
    };
    let mut passed = Vec::new();
    let mut window: VecDeque<AttestedHeader> = VecDeque::with_capacity(3);
    let mut i = from;
    while i <= last_target {
        while window.len() < 3 {
            let next = i + window.len() as u64;
            window.push_back(AttestedHeader::fetch(fetcher, schedule, next)?);
        }
        if is_finalized_by(&window[0], &window[1], &window[2])? {
            passed.extend(window.into_iter().map(|h| h.header));
            return Ok(Finality::Finalized(passed));
        }
        if let Some(target) = window.pop_front() {
            passed.push(target.header);
        }
        i += 1;
    }
    debug!("[parlia] insufficient verifying headers to finalize: from={}, limit={}", from, limit);
    Ok(Finality::NotYetFinalized)
}

/// Newest finalized block at or below `latest`, with its verifying headers.
pub fn query_latest_finalized_header<F: HeaderFetcher + ?Sized>(
    fetcher: &F,
    schedule: &EpochSchedule,
    latest: u64,
) -> Result<(u64, Vec<ParliaHeader>), ParliaError> {
    for height in (1..=latest).rev() {
        let attested = AttestedHeader::fetch(fetcher, schedule, height)?;
        let Some(vote) = attested.vote else {
            continue;
        };
        let probably_finalized = vote.data.source_number;
        // a source can only justify an ancestor of the attesting block
        if probably_finalized >= height {
            debug!(
                "[parlia] skip attestation with source above its block: height={}, source={}",
                height, probably_finalized
            );
            continue;
        }
        debug!(
            "[parlia] try to seek verifying headers: probably_finalized={}, latest={}",
            probably_finalized, latest
        );
        if let Finality::Finalized(headers) =
            query_verifying_headers(fetcher, schedule, probably_finalized, latest)?
        {
            return Ok((probably_finalized, headers));
        }
    }
    Err(ParliaError::NoFinalizedHeader(latest))
}
