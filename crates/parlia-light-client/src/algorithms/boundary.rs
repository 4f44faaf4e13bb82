//! # Epoch Boundary Calculator
//!
//! Epoch start heights across a fork that changes the epoch length.
//!
//! ```text
//! previous epochs (200)        intermediates        current epochs (500)
//! ... 1200 | 1400 ^ 1501  | 1600 | 1800 |           2000 | 2500 | ...
//!         prev_last  boundary                   current_first
//! ```
//!
//! Blocks between the boundary and `current_first` keep rotating validators
//! at multiples of the previous epoch length.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::fork_resolver::find_target_fork_spec;
use crate::domain::{
    BoundaryHeightCache, ForkActivation, ForkSpec, ParliaError, ParliaHeader,
    MIN_ESTIMATED_DISTANCE,
};
use crate::ports::HeaderFetcher;

/// First block at which `current_spec` applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryHeight {
    /// Boundary block number
    pub height: u64,
    /// Spec activated at `height`
    pub current_spec: ForkSpec,
}

/// Epoch starts around one fork boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryEpochs {
    /// Spec in force before the boundary
    pub previous_spec: ForkSpec,
    /// Spec in force from the boundary
    pub current_spec: ForkSpec,
    /// Boundary block number
    pub boundary_height: u64,
    /// Last epoch start of the previous spec at or below the boundary
    pub prev_last: u64,
    /// Previous-length epoch starts between `prev_last` and `current_first`
    pub intermediates: Vec<u64>,
    /// First epoch start aligned to the current epoch length
    pub current_first: u64,
}

impl BoundaryHeight {
    /// Epoch layout around this boundary.
    ///
    /// `prior_specs` are the specs before `current_spec`, newest first. When
    /// empty the current spec is its own predecessor.
    pub fn boundary_epochs(&self, prior_specs: &[ForkSpec]) -> Result<BoundaryEpochs, ParliaError> {
        self.current_spec.validate()?;
        for spec in prior_specs {
            spec.validate()?;
        }
        let previous = prior_specs.first().unwrap_or(&self.current_spec);
        let boundary = self.height;
        let prev_len = previous.epoch_length;
        let cur_len = self.current_spec.epoch_length;

        let prev_last = boundary - boundary % prev_len;
        let current_first = if boundary % cur_len == 0 {
            boundary
        } else {
            boundary + (cur_len - boundary % cur_len)
        };

        let mut intermediates = Vec::new();
        if prev_last == 0 {
            // Chain started close to the fork: replay every older epoch length.
            let mut lengths: Vec<u64> = Vec::new();
            for spec in prior_specs {
                if !lengths.contains(&spec.epoch_length) {
                    lengths.push(spec.epoch_length);
                }
            }
            lengths.reverse();
            for pair in lengths.windows(2) {
                let (start, end) = (pair[0], pair[1]);
                let mut value = start;
                while value < end {
                    intermediates.push(value);
                    value += start;
                }
            }
        }

        let mut mid = prev_last + prev_len;
        while mid < current_first {
            intermediates.push(mid);
            mid += prev_len;
        }

        Ok(BoundaryEpochs {
            previous_spec: previous.clone(),
            current_spec: self.current_spec.clone(),
            boundary_height: boundary,
            prev_last,
            intermediates,
            current_first,
        })
    }
}

impl BoundaryEpochs {
    /// Start of the epoch containing `number`.
    pub fn current_epoch_block_number(&self, number: u64) -> u64 {
        if number >= self.current_first {
            return number - number % self.current_spec.epoch_length;
        }
        if let Some(mid) = self.intermediates.iter().rev().find(|mid| number >= **mid) {
            return *mid;
        }
        number - number % self.previous_spec.epoch_length
    }

    /// Start of the epoch before the one starting at `epoch_block_number`.
    pub fn previous_epoch_block_number(&self, epoch_block_number: u64) -> u64 {
        if epoch_block_number == 0 {
            return 0;
        }
        if epoch_block_number <= self.prev_last {
            return epoch_block_number.saturating_sub(self.previous_spec.epoch_length);
        }
        if let Some(i) = self.intermediates.iter().position(|mid| *mid == epoch_block_number) {
            return if i == 0 {
                self.prev_last
            } else {
                self.intermediates[i - 1]
            };
        }
        if epoch_block_number == self.current_first {
            return self.intermediates.last().copied().unwrap_or(self.prev_last);
        }
        epoch_block_number.saturating_sub(self.current_spec.epoch_length)
    }

    /// Whether `number` starts an epoch.
    pub fn is_epoch_block(&self, number: u64) -> bool {
        self.current_epoch_block_number(number) == number
    }
}

/// Blocks between `cur` and the block produced at `target_ms`.
///
/// Uses the block rate observed between `prev` and `cur`; never returns less
/// than [`MIN_ESTIMATED_DISTANCE`].
pub fn estimate_distance(prev: &ParliaHeader, cur: &ParliaHeader, target_ms: u64) -> u64 {
    let blocks = cur.number.abs_diff(prev.number).max(1);
    let elapsed = cur.milli_timestamp().abs_diff(prev.milli_timestamp());
    let ms_per_block = (elapsed / blocks).max(1);
    let gap = cur.milli_timestamp().abs_diff(target_ms);
    (gap / ms_per_block).max(MIN_ESTIMATED_DISTANCE)
}

/// Boundary of `current_spec` as seen from a block at `current_height`.
///
/// Height activations are exact. Timestamp activations are located by
/// searching the chain for the first block whose millisecond timestamp
/// reaches the activation; 0 if `current_height` itself is before it.
pub fn get_boundary_height<F: HeaderFetcher + ?Sized>(
    fetcher: &F,
    current_height: u64,
    current_spec: &ForkSpec,
    cache: &BoundaryHeightCache,
) -> Result<BoundaryHeight, ParliaError> {
    let height = match current_spec.activation {
        ForkActivation::Height(h) => h,
        ForkActivation::Timestamp(ts) => match cache.get(ts) {
            Some(h) => h,
            None => {
                let h = search_boundary_height(fetcher, current_height, ts)?;
                cache.insert(ts, h);
                h
            }
        },
    };
    Ok(BoundaryHeight {
        height,
        current_spec: current_spec.clone(),
    })
}

fn search_boundary_height<F: HeaderFetcher + ?Sized>(
    fetcher: &F,
    current_height: u64,
    ts: u64,
) -> Result<u64, ParliaError> {
    debug!("[parlia] seek fork height: current={}, ts={}", current_height, ts);
    let current = fetcher.header(current_height)?;
    if current.milli_timestamp() < ts {
        return Ok(0);
    }

    // hi: earliest header known at/after ts, lo: latest header known before ts
    let mut hi = current;
    let mut lo: Option<ParliaHeader> = None;
    let mut reference: Option<ParliaHeader> = None;
    loop {
        let floor = lo.as_ref().map_or(0, |l| l.number + 1);
        if hi.number <= floor {
            debug!("[parlia] seek fork height found: ts={}, boundary={}", ts, hi.number);
            return Ok(hi.number);
        }
        let distance = reference
            .as_ref()
            .map_or(MIN_ESTIMATED_DISTANCE, |r| estimate_distance(r, &hi, ts));
        let candidate = hi.number.saturating_sub(distance).clamp(floor, hi.number - 1);
        let header = fetcher.header(candidate)?;
        if header.milli_timestamp() >= ts {
            let previous_hi = std::mem::replace(&mut hi, header);
            reference = Some(lo.clone().unwrap_or(previous_hi));
        } else {
            reference = Some(header.clone());
            lo = Some(header);
        }
    }
}

/// Fork table plus boundary cache: resolves the epoch layout of any block.
#[derive(Clone, Debug)]
pub struct EpochSchedule {
    fork_specs: Vec<ForkSpec>,
    cache: Arc<BoundaryHeightCache>,
}

impl EpochSchedule {
    /// Create a schedule over an ordered fork table.
    ///
    /// Every spec is validated; an empty table is rejected.
    pub fn new(fork_specs: Vec<ForkSpec>, cache: Arc<BoundaryHeightCache>) -> Result<Self, ParliaError> {
        if fork_specs.is_empty() {
            return Err(ParliaError::EmptyForkSpecs);
        }
        for spec in &fork_specs {
            spec.validate()?;
        }
        Ok(Self { fork_specs, cache })
    }

    /// Fork table, oldest first.
    pub fn fork_specs(&self) -> &[ForkSpec] {
        &self.fork_specs
    }

    /// Shared boundary cache.
    pub fn cache(&self) -> &BoundaryHeightCache {
        &self.cache
    }

    /// Epoch layout governing `header`.
    pub fn boundary_epochs<F: HeaderFetcher + ?Sized>(
        &self,
        fetcher: &F,
        header: &ParliaHeader,
    ) -> Result<BoundaryEpochs, ParliaError> {
        let (current, prior) =
            find_target_fork_spec(&self.fork_specs, header.number, header.milli_timestamp())?;
        let boundary = get_boundary_height(fetcher, header.number, &current, &self.cache)?;
        boundary.boundary_epochs(&prior)
    }

    /// Epoch layout governing the block at `height`.
    pub fn boundary_epochs_at<F: HeaderFetcher + ?Sized>(
        &self,
        fetcher: &F,
        height: u64,
    ) -> Result<BoundaryEpochs, ParliaError> {
        let header = fetcher.header(height)?;
        self.boundary_epochs(fetcher, &header)
    }

    /// Whether `header` starts an epoch.
    pub fn is_epoch_block<F: HeaderFetcher + ?Sized>(
        &self,
        fetcher: &F,
        header: &ParliaHeader,
    ) -> Result<bool, ParliaError> {
        Ok(self.boundary_epochs(fetcher, header)?.is_epoch_block(header.number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EMPTY_HASH;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn spec(activation: ForkActivation, epoch_length: u64) -> ForkSpec {
        ForkSpec {
            activation,
            additional_header_item_count: 1,
            epoch_length,
            max_turn_length: 9,
            gas_limit_bound_divider: 256,
            enable_header_msec: false,
        }
    }

    fn epochs(boundary: u64, prior: &[u64], current: u64) -> BoundaryEpochs {
        let prior: Vec<ForkSpec> = prior
            .iter()
            .map(|len| spec(ForkActivation::Height(0), *len))
            .collect();
        BoundaryHeight {
            height: boundary,
            current_spec: spec(ForkActivation::Height(boundary), current),
        }
        .boundary_epochs(&prior)
        .unwrap()
    }

    #[test]
    fn test_boundary_epochs_vectors() {
        let cases: [(u64, u64, &[u64], u64); 5] = [
            (1501, 1400, &[1600, 1800], 2000),
            (1600, 1600, &[1800], 2000),
            (1601, 1600, &[1800], 2000),
            (1800, 1800, &[], 2000),
            (2000, 2000, &[], 2000),
        ];
        for (boundary, prev_last, intermediates, current_first) in cases {
            let be = epochs(boundary, &[200], 500);
            assert_eq!(be.prev_last, prev_last, "boundary {boundary}");
            assert_eq!(be.intermediates, intermediates, "boundary {boundary}");
            assert_eq!(be.current_first, current_first, "boundary {boundary}");
        }
    }

    #[test]
    fn test_boundary_one_single_prior() {
        let be = epochs(1, &[200], 500);
        assert_eq!(be.prev_last, 0);
        assert_eq!(be.intermediates, vec![200, 400]);
        assert_eq!(be.current_first, 500);

        for (number, expected) in [(199, 0), (200, 200), (499, 400), (500, 500), (999, 500), (1000, 1000), (1501, 1500)] {
            assert_eq!(be.current_epoch_block_number(number), expected, "current({number})");
        }
        for (epoch, expected) in [(0, 0), (200, 0), (400, 200), (500, 400), (1000, 500), (1500, 1000)] {
            assert_eq!(be.previous_epoch_block_number(epoch), expected, "previous({epoch})");
        }
    }

    #[test]
    fn test_boundary_one_two_priors() {
        let be = epochs(1, &[500, 200], 1000);
        assert_eq!(be.intermediates, vec![200, 400, 500]);
        assert_eq!(be.current_first, 1000);
        assert_eq!(be.current_epoch_block_number(1999), 1000);
        assert_eq!(be.current_epoch_block_number(2000), 2000);
        assert_eq!(be.current_epoch_block_number(3000), 3000);
        assert_eq!(be.previous_epoch_block_number(1000), 500);
        assert_eq!(be.previous_epoch_block_number(2000), 1000);
        assert_eq!(be.previous_epoch_block_number(500), 400);
    }

    #[test]
    fn test_boundary_1501_queries() {
        let be = epochs(1501, &[200], 500);
        assert_eq!(be.current_epoch_block_number(1399), 1200);
        assert_eq!(be.current_epoch_block_number(1550), 1400);
        assert_eq!(be.current_epoch_block_number(1700), 1600);
        assert_eq!(be.current_epoch_block_number(1999), 1800);
        assert_eq!(be.current_epoch_block_number(2499), 2000);
        assert_eq!(be.previous_epoch_block_number(1400), 1200);
        assert_eq!(be.previous_epoch_block_number(1600), 1400);
        assert_eq!(be.previous_epoch_block_number(1800), 1600);
        assert_eq!(be.previous_epoch_block_number(2000), 1800);
        assert_eq!(be.previous_epoch_block_number(2500), 2000);
        assert!(be.is_epoch_block(1800));
        assert!(!be.is_epoch_block(1900));
    }

    #[test]
    fn test_no_prior_is_own_predecessor() {
        let be = BoundaryHeight {
            height: 0,
            current_spec: spec(ForkActivation::Height(0), 200),
        }
        .boundary_epochs(&[])
        .unwrap();
        assert_eq!(be.previous_spec, be.current_spec);
        assert!(be.intermediates.is_empty());
        assert_eq!(be.current_epoch_block_number(399), 200);
        assert_eq!(be.previous_epoch_block_number(200), 0);
    }

    fn timed(number: u64, genesis_ms: u64, interval_ms: u64) -> ParliaHeader {
        let ms = genesis_ms + number * interval_ms;
        let mut mix_digest = EMPTY_HASH;
        mix_digest[24..].copy_from_slice(&(ms % 1000).to_be_bytes());
        ParliaHeader {
            number,
            time: ms / 1000,
            mix_digest,
            ..Default::default()
        }
    }

    #[test]
    fn test_estimate_distance() {
        let prev = timed(100, 0, 3_000);
        let cur = timed(200, 0, 3_000);
        assert_eq!(estimate_distance(&prev, &cur, 150 * 3_000), 50);
        assert_eq!(estimate_distance(&prev, &cur, 200 * 3_000), MIN_ESTIMATED_DISTANCE);
        assert_eq!(estimate_distance(&cur, &cur, 0), 600_000);
    }

    #[test]
    fn test_height_activation_is_exact() {
        let fetch = |_h: u64| -> Result<ParliaHeader, ParliaError> {
            Err(ParliaError::Fetch {
                height: 0,
                reason: "unused".into(),
            })
        };
        let cache = BoundaryHeightCache::default();
        let b = get_boundary_height(&fetch, 5_000, &spec(ForkActivation::Height(1_501), 500), &cache).unwrap();
        assert_eq!(b.height, 1_501);
    }

    #[test]
    fn test_timestamp_search_and_cache() {
        let calls = Cell::new(0u64);
        let fetch = |h: u64| -> Result<ParliaHeader, ParliaError> {
            calls.set(calls.get() + 1);
            Ok(timed(h, 1_000_000, 750))
        };
        // block 1234 is the first at/after the activation
        let ts = 1_000_000 + 1234 * 750 - 100;
        let fork = spec(ForkActivation::Timestamp(ts), 500);
        let cache = BoundaryHeightCache::default();

        let b = get_boundary_height(&fetch, 5_000, &fork, &cache).unwrap();
        assert_eq!(b.height, 1234);
        assert_eq!(cache.get(ts), Some(1234));

        let before = calls.get();
        let again = get_boundary_height(&fetch, 6_000, &fork, &cache).unwrap();
        assert_eq!(again.height, 1234);
        assert_eq!(calls.get(), before);
    }

    #[test]
    fn test_timestamp_not_yet_forked() {
        let fetch = |h: u64| -> Result<ParliaHeader, ParliaError> { Ok(timed(h, 0, 3_000)) };
        let cache = BoundaryHeightCache::default();
        let fork = spec(ForkActivation::Timestamp(1_000_000_000), 500);
        let b = get_boundary_height(&fetch, 10, &fork, &cache).unwrap();
        assert_eq!(b.height, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_timestamp_search_with_disabled_cache_matches() {
        let fetch = |h: u64| -> Result<ParliaHeader, ParliaError> { Ok(timed(h, 0, 450)) };
        let fork = spec(ForkActivation::Timestamp(777_777), 500);
        let cached = get_boundary_height(&fetch, 9_000, &fork, &BoundaryHeightCache::default()).unwrap();
        let uncached = get_boundary_height(&fetch, 9_000, &fork, &BoundaryHeightCache::disabled()).unwrap();
        assert_eq!(cached, uncached);
        assert_eq!(cached.height, 777_777u64.div_ceil(450));
    }

    #[test]
    fn test_schedule_resolves_per_header() {
        let schedule = EpochSchedule::new(
            vec![spec(ForkActivation::Height(0), 200), spec(ForkActivation::Height(1501), 500)],
            Arc::new(BoundaryHeightCache::disabled()),
        )
        .unwrap();
        let fetch = |h: u64| -> Result<ParliaHeader, ParliaError> { Ok(timed(h, 0, 3_000)) };
        let old = schedule.boundary_epochs_at(&fetch, 1400).unwrap();
        assert_eq!(old.current_spec.epoch_length, 200);
        let new = schedule.boundary_epochs_at(&fetch, 1600).unwrap();
        assert_eq!(new.intermediates, vec![1600, 1800]);
        assert!(schedule.is_epoch_block(&fetch, &timed(1800, 0, 3_000)).unwrap());
        assert!(!schedule.is_epoch_block(&fetch, &timed(1900, 0, 3_000)).unwrap());
        assert!(schedule.is_epoch_block(&fetch, &timed(2000, 0, 3_000)).unwrap());
    }

    #[test]
    fn test_zero_epoch_length_is_rejected() {
        let cache = Arc::new(BoundaryHeightCache::disabled());
        let result = EpochSchedule::new(vec![spec(ForkActivation::Height(0), 0)], cache.clone());
        assert!(matches!(result, Err(ParliaError::InvalidForkSpec(_))));
        assert!(matches!(
            EpochSchedule::new(Vec::new(), cache),
            Err(ParliaError::EmptyForkSpecs)
        ));

        let boundary = BoundaryHeight {
            height: 10,
            current_spec: spec(ForkActivation::Height(10), 0),
        };
        assert!(matches!(boundary.boundary_epochs(&[]), Err(ParliaError::InvalidForkSpec(_))));

        let boundary = BoundaryHeight {
            height: 1,
            current_spec: spec(ForkActivation::Height(1), 500),
        };
        let prior = [spec(ForkActivation::Height(0), 0)];
        assert!(matches!(boundary.boundary_epochs(&prior), Err(ParliaError::InvalidForkSpec(_))));
    }

    proptest! {
        #[test]
        fn epoch_round_trip_past_transition(
            boundary in 1u64..20_000,
            offset in 0u64..50_000,
        ) {
            let be = epochs(boundary, &[200], 500);
            let h = be.current_first + offset;
            let epoch = be.current_epoch_block_number(h);
            prop_assert_eq!(be.previous_epoch_block_number(epoch + 500), epoch);
        }

        #[test]
        fn current_epoch_is_at_or_below(boundary in 1u64..20_000, h in 0u64..40_000) {
            let be = epochs(boundary, &[200], 500);
            let epoch = be.current_epoch_block_number(h);
            prop_assert!(epoch <= h);
            prop_assert!(be.is_epoch_block(epoch));
        }

        #[test]
        fn timestamp_search_finds_first_block(
            genesis in 0u64..1_000_000,
            interval in 100u64..5_000,
            target_block in 1u64..3_000,
            slack in 0u64..100,
        ) {
            let fetch = |h: u64| -> Result<ParliaHeader, ParliaError> { Ok(timed(h, genesis, interval)) };
            let ts = genesis + target_block * interval - slack.min(interval - 1);
            let fork = spec(ForkActivation::Timestamp(ts), 500);
            let b = get_boundary_height(&fetch, 3_000, &fork, &BoundaryHeightCache::disabled()).unwrap();
            prop_assert_eq!(b.height, target_block);
        }
    }
}
