//! `tempo export`: print every interval as JSON, oldest first.

use crate::cmd::open_session;
use crate::output::write_json;
use anyhow::Result;
use serde::Serialize;
use std::io;
use std::path::Path;
use tempo_core::{Interval, Store};

#[derive(Debug, Serialize)]
struct ExportRow {
    id: usize,
    #[serde(flatten)]
    interval: Interval,
}

/// Every interval with its id (`1` = most recent), oldest first.
fn collect_rows(store: &Store) -> Result<Vec<ExportRow>> {
    let mut rows = Vec::new();
    for (idx, line) in store.iter().enumerate() {
        rows.push(ExportRow {
            id: idx + 1,
            interval: Interval::from_serialization(line?)?,
        });
    }
    rows.reverse();
    Ok(rows)
}

pub fn run_export(db: Option<&Path>) -> Result<()> {
    let session = open_session(db)?;
    let rows = collect_rows(&session.store)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_json(&mut out, &rows)
}
