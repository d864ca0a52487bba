use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use tempo_core::Interval;

/// 1990-01-01 .. 2030-01-01, whole seconds.
pub fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (631_152_000i64..1_893_456_000).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .expect("in-range timestamp")
    })
}

pub fn arb_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("client".to_string()),
        Just("admin".to_string()),
        Just("deep work".to_string()),
        Just("say \"hi\"".to_string()),
        Just("line\nbreak".to_string()),
        Just("tab\there".to_string()),
        "[a-z]{1,6}",
    ]
}

pub fn arb_interval() -> impl Strategy<Value = Interval> {
    (
        arb_instant(),
        prop::option::of(0i64..86_400),
        prop::collection::btree_set(arb_tag(), 0..4),
    )
        .prop_map(|(start, length, tags)| Interval {
            start,
            end: length.map(|secs| start + Duration::seconds(secs)),
            tags,
        })
}

/// Add (true) or delete (false) of an interval picked from a pool.
pub fn arb_ops(pool: usize) -> impl Strategy<Value = Vec<(bool, usize)>> {
    prop::collection::vec((any::<bool>(), 0..pool), 0..40)
}
