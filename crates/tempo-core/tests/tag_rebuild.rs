use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use tempo_core::tags::TAGS_FILENAME;
use tempo_core::{Interval, Store};

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 10, 0, 0)
        .single()
        .expect("valid date")
}

fn tagged(y: i32, m: u32, d: u32, tags: &[&str]) -> Interval {
    Interval::closed(at(y, m, d), at(y, m, d) + chrono::Duration::minutes(45))
        .with_tags(tags.iter().copied())
}

fn counts(store: &Store) -> BTreeMap<String, u64> {
    store
        .tag_index()
        .counts()
        .iter()
        .filter(|(_, info)| info.count > 0)
        .map(|(tag, info)| (tag.clone(), info.count))
        .collect()
}

/// Build a committed store and return its incrementally maintained counts.
fn populate(location: &Path) -> BTreeMap<String, u64> {
    let mut store = Store::open(location, -1).expect("open");
    let intervals = [
        tagged(2016, 6, 2, &["client", "deep work"]),
        tagged(2016, 7, 9, &["client"]),
        tagged(2017, 1, 3, &["admin"]),
        tagged(2017, 1, 4, &["say \"hi\"", "client"]),
        tagged(2018, 2, 5, &[]),
    ];
    for interval in &intervals {
        store.add_interval(interval).expect("add");
    }
    store.delete_interval(&intervals[2]).expect("delete");
    store.commit().expect("commit");
    counts(&store)
}

#[test]
fn missing_index_is_rebuilt_from_data_files() {
    let tmp = TempDir::new().expect("tempdir");
    let expected = populate(tmp.path());
    assert_eq!(expected.get("client"), Some(&3));
    assert_eq!(expected.get("admin"), None);

    fs::remove_file(tmp.path().join(TAGS_FILENAME)).expect("remove");

    let mut store = Store::open(tmp.path(), -1).expect("reopen");
    assert_eq!(counts(&store), expected);
    assert!(store.tag_index().is_modified());

    store.commit().expect("commit");
    let persisted = Store::open(tmp.path(), -1).expect("reopen again");
    assert_eq!(counts(&persisted), expected);
    assert!(!persisted.tag_index().is_modified());
}

#[test]
fn corrupt_index_is_rebuilt_from_data_files() {
    let tmp = TempDir::new().expect("tempdir");
    let expected = populate(tmp.path());

    fs::write(tmp.path().join(TAGS_FILENAME), "{ this is not json").expect("corrupt");

    let store = Store::open(tmp.path(), -1).expect("reopen");
    assert_eq!(counts(&store), expected);
}

#[test]
fn index_missing_count_member_is_rebuilt() {
    let tmp = TempDir::new().expect("tempdir");
    let expected = populate(tmp.path());

    fs::write(tmp.path().join(TAGS_FILENAME), r#"{"client": {"uses": 3}}"#).expect("corrupt");

    let store = Store::open(tmp.path(), -1).expect("reopen");
    assert_eq!(counts(&store), expected);
}

#[test]
fn reset_index_is_written_before_commit() {
    let tmp = TempDir::new().expect("tempdir");
    populate(tmp.path());
    let path = tmp.path().join(TAGS_FILENAME);
    fs::write(&path, "garbage").expect("corrupt");

    let _store = Store::open(tmp.path(), -1).expect("reopen");
    let on_disk = fs::read_to_string(&path).expect("read");
    assert_eq!(on_disk.trim(), "{}");
}

#[test]
fn explicit_rebuild_matches_incremental_counts() {
    let tmp = TempDir::new().expect("tempdir");
    let expected = populate(tmp.path());

    let mut store = Store::open(tmp.path(), -1).expect("reopen");
    store.rebuild_tags().expect("rebuild");
    assert_eq!(counts(&store), expected);
}

#[test]
fn tags_with_line_breaks_survive_commit_and_rebuild() {
    let tmp = TempDir::new().expect("tempdir");
    let interval = tagged(2016, 6, 2, &["a\nb", "cr\rlf"]);
    {
        let mut store = Store::open(tmp.path(), -1).expect("open");
        store.add_interval(&interval).expect("add");
        store.commit().expect("commit");
    }

    let content = fs::read_to_string(tmp.path().join("2016-06.data")).expect("read shard");
    assert_eq!(content.lines().count(), 1);

    fs::remove_file(tmp.path().join(TAGS_FILENAME)).expect("remove");
    let store = Store::open(tmp.path(), -1).expect("reopen");
    assert_eq!(store.tag_count("a\nb"), 1);
    assert_eq!(store.tag_count("cr\rlf"), 1);

    let latest = store.latest_entry().expect("latest").expect("one entry");
    assert_eq!(Interval::from_serialization(&latest).expect("parse"), interval);
}
