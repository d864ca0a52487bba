pub mod delete;
pub mod export;
pub mod files;
pub mod import;
pub mod modify;
pub mod tags;
pub mod track;

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use std::path::Path;
use tempo_core::config::{Config, load_config, resolve_location};
use tempo_core::interval::parse_timestamp;
use tempo_core::{Interval, Store};

/// An opened store together with its configuration.
pub struct Session {
    pub store: Store,
    pub config: Config,
}

/// Resolve the store location, load its config, and open it.
pub fn open_session(db: Option<&Path>) -> Result<Session> {
    let location = resolve_location(db)?;
    let config = load_config(&location)?;
    let store = Store::open(&location, config.journal.size)
        .with_context(|| format!("Failed to open store at {}", location.display()))?;
    tracing::debug!(location = %location.display(), "session opened");
    Ok(Session { store, config })
}

/// Parse a point in time given on the command line.
///
/// Accepts RFC 3339 (`2016-06-02T09:00:00Z`), the storage form
/// (`20160602T090000Z`), and a naive `YYYY-MM-DDTHH:MM:SS` taken as UTC.
/// Fractional seconds are dropped, since stored records keep whole seconds.
pub fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    parse_time_exact(raw).map(|t| t.trunc_subsecs(0))
}

fn parse_time_exact(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = parse_timestamp(raw) {
        return Ok(t);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|t| t.and_utc())
        .with_context(|| format!("invalid time '{raw}'"))
}

/// Parse an interval id: `@N` or `N`, where 1 is the most recent interval.
pub fn parse_id(raw: &str) -> Result<usize> {
    let digits = raw.strip_prefix('@').unwrap_or(raw);
    match digits.parse::<usize>() {
        Ok(0) | Err(_) => anyhow::bail!("invalid interval id '{raw}': expected @1, @2, ..."),
        Ok(n) => Ok(n),
    }
}

/// Look up the interval with the given id.
pub fn resolve_id(store: &Store, id: usize) -> Result<Interval> {
    let line = store
        .iter()
        .nth(id - 1)
        .transpose()?
        .with_context(|| format!("no interval with id @{id}"))?;
    Ok(Interval::from_serialization(line)?)
}
