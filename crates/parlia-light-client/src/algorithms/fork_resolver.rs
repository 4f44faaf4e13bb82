//! # Fork Spec Resolver
//!
//! Picks the consensus parameters active at a block.

use crate::domain::{ForkSpec, ParliaError};

/// Active fork spec at `(height, ms_timestamp)` plus the specs before it.
///
/// The table is ordered oldest first. The last entry whose activation is
/// reached wins, so a later hard fork shadows an earlier one even when both
/// share an activation height. The returned prior specs are newest first and
/// empty when the oldest spec is active.
pub fn find_target_fork_spec(
    specs: &[ForkSpec],
    height: u64,
    ms_timestamp: u64,
) -> Result<(ForkSpec, Vec<ForkSpec>), ParliaError> {
    specs
        .iter()
        .enumerate()
        .rev()
        .find(|(_, spec)| spec.activation.is_reached(height, ms_timestamp))
        .map(|(index, spec)| {
            let prior = specs[..index].iter().rev().cloned().collect();
            (spec.clone(), prior)
        })
        .ok_or(ParliaError::NoForkSpecFound {
            height,
            timestamp: ms_timestamp,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{fork_specs, ForkActivation, Network};
    use proptest::prelude::*;

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

    #[test]
    fn test_empty_table() {
        assert!(matches!(
            find_target_fork_spec(&[], 10, 10),
            Err(ParliaError::NoForkSpecFound { height: 10, timestamp: 10 })
        ));
    }

    #[test]
    fn test_before_first_activation() {
        let specs = vec![spec(ForkActivation::Height(100), 200)];
        assert!(find_target_fork_spec(&specs, 99, u64::MAX).is_err());
    }

    #[test]
    fn test_height_table() {
        let specs = vec![
            spec(ForkActivation::Height(0), 200),
            spec(ForkActivation::Height(1000), 500),
        ];
        let (current, prior) = find_target_fork_spec(&specs, 999, 0).unwrap();
        assert_eq!(current.epoch_length, 200);
        assert!(prior.is_empty());

        let (current, prior) = find_target_fork_spec(&specs, 1000, 0).unwrap();
        assert_eq!(current.epoch_length, 500);
        assert_eq!(prior, vec![specs[0].clone()]);
    }

    #[test]
    fn test_timestamp_table() {
        let specs = vec![
            spec(ForkActivation::Height(0), 200),
            spec(ForkActivation::Timestamp(5_000), 500),
        ];
        assert_eq!(find_target_fork_spec(&specs, 10, 4_999).unwrap().0.epoch_length, 200);
        assert_eq!(find_target_fork_spec(&specs, 10, 5_000).unwrap().0.epoch_length, 500);
    }

    #[test]
    fn test_later_entry_wins_on_shared_activation() {
        let specs = fork_specs(Network::Localnet, None);
        let (current, prior) = find_target_fork_spec(&specs, 1, 0).unwrap();
        assert_eq!(current.epoch_length, 1000);
        assert_eq!(prior.len(), 2);
        assert_eq!(prior[0].epoch_length, 500);
        assert_eq!(prior[1].epoch_length, 200);

        let (genesis, prior) = find_target_fork_spec(&specs, 0, 0).unwrap();
        assert_eq!(genesis.epoch_length, 200);
        assert!(prior.is_empty());
    }

    proptest! {
        #[test]
        fn resolved_index_is_monotonic(
            mut activations in proptest::collection::vec(0u64..10_000, 1..6),
            h1 in 0u64..12_000,
            delta in 0u64..12_000,
        ) {
            activations.sort_unstable();
            let specs: Vec<ForkSpec> = activations
                .iter()
                .enumerate()
                .map(|(i, a)| spec(ForkActivation::Height(*a), 100 * (i as u64 + 1)))
                .collect();
            let h2 = h1 + delta;
            let first = find_target_fork_spec(&specs, h1, 0).map(|(_, p)| p.len());
            let second = find_target_fork_spec(&specs, h2, 0).map(|(_, p)| p.len());
            match (first, second) {
                (Ok(i1), Ok(i2)) => prop_assert!(i1 <= i2),
                (Ok(_), Err(_)) => prop_assert!(false, "later height lost its fork spec"),
                _ => {}
            }
        }

        #[test]
        fn resolved_index_is_monotonic_with_timestamps(
            mut heights in proptest::collection::vec(0u64..10_000, 0..4),
            mut timestamps in proptest::collection::vec(1_700_000_000_000u64..1_700_000_100_000, 1..4),
            h1 in 0u64..12_000,
            h_delta in 0u64..12_000,
            ts1 in 1_699_999_990_000u64..1_700_000_110_000,
            ts_delta in 0u64..120_000,
        ) {
            heights.sort_unstable();
            timestamps.sort_unstable();
            let specs: Vec<ForkSpec> = heights
                .iter()
                .map(|h| ForkActivation::Height(*h))
                .chain(timestamps.iter().map(|ts| ForkActivation::Timestamp(*ts)))
                .enumerate()
                .map(|(i, activation)| spec(activation, 100 * (i as u64 + 1)))
                .collect();
            let first = find_target_fork_spec(&specs, h1, ts1).map(|(_, p)| p.len());
            let second =
                find_target_fork_spec(&specs, h1 + h_delta, ts1 + ts_delta).map(|(_, p)| p.len());
            match (first, second) {
                (Ok(i1), Ok(i2)) => prop_assert!(i1 <= i2),
                (Ok(_), Err(_)) => prop_assert!(false, "later block lost its fork spec"),
                _ => {}
            }

            // timestamp forks only move with time
            let before = find_target_fork_spec(&specs, h1, ts1).map(|(_, p)| p.len());
            let after = find_target_fork_spec(&specs, h1, ts1 + ts_delta).map(|(_, p)| p.len());
            if let (Ok(i1), Ok(i2)) = (before, after) {
                prop_assert!(i1 <= i2);
            }
        }
    }
}
