//! `tempo modify`: move the start or end of a closed interval.

use crate::cmd::{open_session, parse_id, parse_time, resolve_id};
use crate::output::{OutputMode, render};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tempo_core::Interval;

/// Which end of the interval moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Edge {
    Start,
    Stop,
}

#[derive(Args, Debug)]
pub struct ModifyArgs {
    /// `start` or `stop`.
    #[arg(value_enum)]
    pub edge: Edge,

    /// Interval id, e.g. `@1` for the most recent.
    pub id: String,

    /// New time for that edge.
    pub time: String,
}

/// The modified copy of `from`, or an error if the edit is not allowed.
fn apply_edge(from: &Interval, edge: Edge, time: DateTime<Utc>) -> Result<Interval> {
    let Some(end) = from.end else {
        anyhow::bail!("cannot modify an open interval: {from}");
    };

    let (start, end) = match edge {
        Edge::Start => (time, end),
        Edge::Stop => (from.start, time),
    };
    if start > end {
        anyhow::bail!("the start of an interval must be before its end ({start} > {end})");
    }

    Ok(Interval {
        start,
        end: Some(end),
        tags: from.tags.clone(),
    })
}

pub fn run_modify(args: &ModifyArgs, db: Option<&Path>, output: OutputMode) -> Result<()> {
    let id = parse_id(&args.id)?;
    let time = parse_time(&args.time)?;

    let mut session = open_session(db)?;
    let from = resolve_id(&session.store, id)?;
    let to = apply_edge(&from, args.edge, time)?;

    session.store.modify_interval(Some(&from), Some(&to))?;
    session.store.commit()?;

    render(
        output,
        &json!({ "id": id, "before": from, "after": to }),
        |_, w| writeln!(w, "Modified @{id}: {to}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 6, 2, h, 0, 0)
            .single()
            .expect("valid date")
    }

    #[test]
    fn moves_either_edge() {
        let from = Interval::closed(at(9), at(17));
        assert_eq!(
            apply_edge(&from, Edge::Start, at(10)).expect("start"),
            Interval::closed(at(10), at(17))
        );
        assert_eq!(
            apply_edge(&from, Edge::Stop, at(12)).expect("stop"),
            Interval::closed(at(9), at(12))
        );
    }

    #[test]
    fn rejects_open_interval() {
        let err = apply_edge(&Interval::open(at(9)), Edge::Stop, at(12)).expect_err("open");
        assert!(err.to_string().contains("open interval"));
    }

    #[test]
    fn rejects_start_after_end() {
        let from = Interval::closed(at(9), at(17));
        assert!(apply_edge(&from, Edge::Start, at(18)).is_err());
        assert!(apply_edge(&from, Edge::Stop, at(8)).is_err());
    }
}
