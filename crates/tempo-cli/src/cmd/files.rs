//! `tempo files`: list data files in chronological order.

use crate::cmd::open_session;
use crate::output::{OutputMode, render};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

pub fn run_files(db: Option<&Path>, output: OutputMode) -> Result<()> {
    let session = open_session(db)?;
    let files = session.store.files();
    tracing::debug!(location = %session.store.location().display(), count = files.len(), "listing files");

    render(output, &files, |files, w| {
        for file in files {
            writeln!(w, "{file}")?;
        }
        Ok(())
    })
}
