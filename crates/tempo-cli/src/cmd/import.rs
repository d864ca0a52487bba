//! `tempo import`: add a JSON array of intervals as one undo transaction.

use crate::cmd::open_session;
use crate::output::{OutputMode, note_new_tags, write_json};
use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempo_core::{Interval, Store};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file to read; omit to read from stdin.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
struct ImportReport {
    imported: usize,
    skipped_existing: usize,
    new_tags: Vec<String>,
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn parse_intervals(content: &str) -> Result<Vec<Interval>> {
    let intervals: Vec<Interval> =
        serde_json::from_str(content).context("Import input must be a JSON array of intervals")?;
    Ok(intervals)
}

/// Add every interval inside one journal transaction. The transaction is
/// closed even when an add fails part-way.
fn import_all(store: &mut Store, intervals: &[Interval]) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    store.journal_mut().start_transaction();
    let added: Result<()> = intervals.iter().try_for_each(|interval| {
        let outcome = store.add_interval(interval)?;
        if outcome.inserted {
            report.imported += 1;
        } else {
            report.skipped_existing += 1;
        }
        report.new_tags.extend(outcome.new_tags);
        Ok(())
    });
    store.journal_mut().end_transaction()?;
    added?;

    tracing::info!(
        imported = report.imported,
        skipped_existing = report.skipped_existing,
        "import complete"
    );
    Ok(report)
}

pub fn run_import(args: &ImportArgs, db: Option<&Path>, output: OutputMode) -> Result<()> {
    let intervals = parse_intervals(&read_input(args.file.as_deref())?)?;

    let mut session = open_session(db)?;
    let report = import_all(&mut session.store, &intervals)?;
    session.store.commit()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if output.is_json() {
        return write_json(&mut out, &report);
    }

    if session.config.reports.verbose {
        note_new_tags(&mut out, &report.new_tags)?;
    }
    writeln!(
        out,
        "Imported {} interval(s), {} already present",
        report.imported, report.skipped_existing
    )?;
    Ok(())
}
