use std::collections::BTreeMap;

use proptest::prelude::*;
use tempfile::TempDir;
use tempo_core::{Interval, Range, Store, segment_range};

#[path = "generators.rs"]
mod generators;
use generators::*;

fn live_counts(store: &Store) -> BTreeMap<String, u64> {
    store
        .tag_index()
        .counts()
        .iter()
        .filter(|(_, info)| info.count > 0)
        .map(|(tag, info)| (tag.clone(), info.count))
        .collect()
}

fn model_counts(model: &BTreeMap<String, Interval>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for interval in model.values() {
        for tag in &interval.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn serialization_roundtrips(interval in arb_interval()) {
        let line = interval.serialize();
        let parsed = Interval::from_serialization(&line).expect("parse");
        prop_assert_eq!(parsed, interval);
    }

    #[test]
    fn traversal_stays_sorted_and_counts_match(
        pool in prop::collection::vec(arb_interval(), 1..12),
        ops in arb_ops(12),
    ) {
        let tmp = TempDir::new().expect("tempdir");
        let mut store = Store::open(tmp.path(), -1).expect("open");
        let mut model: BTreeMap<String, Interval> = BTreeMap::new();

        for (is_add, pick) in ops {
            let interval = &pool[pick % pool.len()];
            let line = interval.serialize();
            if is_add {
                let outcome = store.add_interval(interval).expect("add");
                prop_assert_eq!(outcome.inserted, model.insert(line, interval.clone()).is_none());
            } else if model.remove(&line).is_some() {
                store.delete_interval(interval).expect("delete");
            } else {
                prop_assert!(store.delete_interval(interval).is_err());
            }
        }

        let oldest_first: Vec<String> = store
            .iter_rev()
            .map(|l| l.expect("line").to_string())
            .collect();
        let expected: Vec<String> = model.keys().cloned().collect();
        prop_assert_eq!(&oldest_first, &expected);

        let mut newest_first: Vec<String> = store
            .iter()
            .map(|l| l.expect("line").to_string())
            .collect();
        newest_first.reverse();
        prop_assert_eq!(&newest_first, &expected);

        prop_assert_eq!(live_counts(&store), model_counts(&model));

        store.commit().expect("commit");
        let reloaded = Store::open(tmp.path(), -1).expect("reopen");
        let reloaded_lines: Vec<String> = reloaded
            .iter_rev()
            .map(|l| l.expect("line").to_string())
            .collect();
        prop_assert_eq!(reloaded_lines, expected);
    }

    #[test]
    fn segments_tile_the_range(start in arb_instant(), secs in 0i64..(400 * 86_400)) {
        let end = start + chrono::Duration::seconds(secs);
        let range = Range::new(start, end);
        let segments = segment_range(&range, end);

        if start < end {
            prop_assert_eq!(segments.first().map(|s| s.start), Some(start));
            prop_assert_eq!(segments.last().and_then(|s| s.end), Some(end));
        }
        for pair in segments.windows(2) {
            prop_assert_eq!(pair[0].end, Some(pair[1].start));
        }
        for segment in &segments {
            let seg_end = segment.end.expect("closed");
            prop_assert!(segment.start < seg_end);
            let month = Range::month_of(segment.start);
            prop_assert!(month.contains(segment.start));
            prop_assert!(month.end.is_some_and(|m| seg_end <= m));
        }
    }
}
