//! `tempo track`: record one closed interval.

use crate::cmd::{open_session, parse_time};
use crate::output::{OutputMode, note_new_tags, write_json};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tempo_core::Interval;

#[derive(Args, Debug)]
pub struct TrackArgs {
    /// Start time (RFC 3339 or `YYYYMMDDTHHMMSSZ`).
    pub start: String,

    /// End time.
    pub end: String,

    /// Tags for the interval.
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TrackReport<'a> {
    interval: &'a Interval,
    inserted: bool,
    new_tags: &'a [String],
}

pub fn run_track(args: &TrackArgs, db: Option<&Path>, output: OutputMode) -> Result<()> {
    let start = parse_time(&args.start)?;
    let end = parse_time(&args.end)?;
    let interval = Interval::closed(start, end).with_tags(args.tags.iter().cloned());

    let mut session = open_session(db)?;
    let outcome = session.store.add_interval(&interval)?;
    session.store.commit()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if output.is_json() {
        write_json(
            &mut out,
            &TrackReport {
                interval: &interval,
                inserted: outcome.inserted,
                new_tags: &outcome.new_tags,
            },
        )?;
        return Ok(());
    }

    if session.config.reports.verbose {
        note_new_tags(&mut out, &outcome.new_tags)?;
    }
    if outcome.inserted {
        writeln!(out, "Recorded {interval}")?;
    } else {
        writeln!(out, "Already recorded {interval}")?;
    }
    Ok(())
}
