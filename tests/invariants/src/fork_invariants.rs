//! Property-based tests for fork activation.
//!
//! Properties tested:
//! 1. Over 1000 consecutive heights the memoized answer equals a direct
//!    count of the window, for any rule and signal pattern.
//! 2. The O(1) incremental step equals a full scan at every height.
//! 3. Query order does not matter: shuffled heights give the same answers.

#[cfg(test)]
mod tests {
    use {
        proptest::prelude::*,
        tessera_forks::{ActivatedForks, ForkConfig, ForkRule},
        tessera_ledger_types::{Fork, ForkSignalSet},
    };

    const HEIGHTS: u64 = 1_000;

    fn rule_strategy() -> impl Strategy<Value = ForkRule> {
        (1u64..=64)
            .prop_flat_map(|blocks_to_check| {
                (
                    Just(blocks_to_check),
                    1..=blocks_to_check,
                    0u64..200,
                    500u64..1_200,
                )
            })
            .prop_map(
                |(blocks_to_check, blocks_required, signaling_start, signaling_end)| ForkRule {
                    fork: Fork::VirtualMachine,
                    blocks_required,
                    blocks_to_check,
                    signaling_start,
                    signaling_end,
                },
            )
    }

    fn pattern_strategy() -> impl Strategy<Value = Vec<bool>> {
        (0.05f64..0.95).prop_flat_map(|density| {
            proptest::collection::vec(proptest::bool::weighted(density), HEIGHTS as usize)
        })
    }

    fn tracker(rule: ForkRule) -> ActivatedForks {
        let config = ForkConfig {
            rules: vec![rule],
            ..ForkConfig::default()
        };
        ActivatedForks::new(config, [])
    }

    fn signals(pattern: &[bool]) -> impl Fn(u64) -> ForkSignalSet + '_ {
        move |height| {
            let signaled = usize::try_from(height)
                .ok()
                .and_then(|index| pattern.get(index))
                .copied()
                .unwrap_or(false);
            if signaled {
                ForkSignalSet::of(&[Fork::VirtualMachine]).unwrap()
            } else {
                ForkSignalSet::default()
            }
        }
    }

    /// Counts the window below `height` directly from the pattern.
    fn expected(rule: &ForkRule, pattern: &[bool], height: u64) -> bool {
        let previous = height.saturating_sub(1);
        if !rule.in_signaling_period(previous) {
            return false;
        }
        let lower = height.saturating_sub(rule.blocks_to_check) as usize;
        let count = pattern[lower..=previous as usize]
            .iter()
            .filter(|signaled| **signaled)
            .count() as u64;
        count >= rule.blocks_required
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_memo_matches_window_count(
            rule in rule_strategy(),
            pattern in pattern_strategy(),
        ) {
            let tracker = tracker(rule);
            let source = signals(&pattern);
            for height in 1..HEIGHTS {
                prop_assert_eq!(
                    tracker.is_activated(&source, Fork::VirtualMachine, height).unwrap(),
                    expected(&rule, &pattern, height),
                    "height {}", height
                );
            }
        }

        #[test]
        fn prop_incremental_matches_full_scan(
            rule in rule_strategy(),
            pattern in pattern_strategy(),
        ) {
            let tracker = tracker(rule);
            let source = signals(&pattern);
            let mut memo = tracker.count_full_scan(&source, Fork::VirtualMachine, 1).unwrap();
            for height in 2..HEIGHTS {
                let step = tracker
                    .count_incremental(&source, Fork::VirtualMachine, height, memo)
                    .unwrap();
                let scan = tracker
                    .count_full_scan(&source, Fork::VirtualMachine, height)
                    .unwrap();
                prop_assert_eq!(step, scan, "height {}", height);
                memo = step;
            }
        }

        #[test]
        fn prop_query_order_is_irrelevant(
            rule in rule_strategy(),
            pattern in pattern_strategy(),
            heights in Just((1..HEIGHTS).collect::<Vec<u64>>()).prop_shuffle(),
        ) {
            let tracker = tracker(rule);
            let source = signals(&pattern);
            for height in heights {
                prop_assert_eq!(
                    tracker.is_activated(&source, Fork::VirtualMachine, height).unwrap(),
                    expected(&rule, &pattern, height),
                    "height {}", height
                );
            }
        }
    }
}
