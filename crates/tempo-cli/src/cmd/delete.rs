//! `tempo delete`: remove an interval by id.

use crate::cmd::{open_session, parse_id, resolve_id};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde_json::json;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Interval id, e.g. `@1` for the most recent.
    pub id: String,
}

pub fn run_delete(args: &DeleteArgs, db: Option<&Path>, output: OutputMode) -> Result<()> {
    let id = parse_id(&args.id)?;

    let mut session = open_session(db)?;
    let interval = resolve_id(&session.store, id)?;
    session.store.delete_interval(&interval)?;
    session.store.commit()?;

    render(
        output,
        &json!({ "deleted": id, "interval": interval }),
        |_, w| writeln!(w, "Deleted @{id}: {interval}"),
    )
}
