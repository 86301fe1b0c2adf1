//! Property tests for statistics aggregation.

use bb_common::stats::{RunCounts, RunStats};
use proptest::prelude::*;

fn run_counts() -> impl Strategy<Value = RunCounts> {
    (
        0u64..500,
        0u64..500,
        0u64..50,
        0u64..50,
        0u64..50,
        0u64..100,
        1u64..8,
        0u64..8,
        1u64..8,
        0u64..8,
        any::<bool>(),
    )
        .prop_map(
            |(
                expected,
                rows,
                missing,
                duplicates,
                invalid,
                out_of_order,
                producers,
                idle_producers,
                consumers,
                idle_consumers,
                killed,
            )| RunCounts {
                expected,
                rows,
                missing,
                duplicates,
                invalid,
                out_of_order,
                producers,
                idle_producers,
                consumers,
                idle_consumers,
                killed,
            },
        )
}

proptest! {
    #[test]
    fn aggregation_is_associative(a in run_counts(), b in run_counts(), c in run_counts()) {
        let (a, b, c) = (RunStats::for_run(&a), RunStats::for_run(&b), RunStats::for_run(&c));
        prop_assert_eq!((a + b) + c, a + (b + c));
    }

    #[test]
    fn aggregation_is_order_independent(runs in prop::collection::vec(run_counts(), 0..12)) {
        let stats: Vec<RunStats> = runs.iter().map(RunStats::for_run).collect();
        let forward: RunStats = stats.iter().sum();
        let backward: RunStats = stats.iter().rev().sum();
        prop_assert_eq!(forward, backward);
        prop_assert_eq!(forward.runs, stats.len() as u64);
        prop_assert_eq!(forward.clean_runs.base, stats.len() as u64);
    }

    #[test]
    fn percentages_never_fault(counts in run_counts()) {
        let stats = RunStats::for_run(&counts);
        for stat in stats.fields() {
            prop_assert!(stat.percent().is_finite());
        }
    }
}
