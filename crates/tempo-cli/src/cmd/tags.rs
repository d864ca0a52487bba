//! `tempo tags`: list tags with usage counts.

use crate::cmd::open_session;
use crate::output::{OutputMode, render};
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

pub fn run_tags(db: Option<&Path>, output: OutputMode) -> Result<()> {
    let session = open_session(db)?;
    let counts: BTreeMap<&str, u64> = session
        .store
        .tag_index()
        .counts()
        .iter()
        .map(|(tag, info)| (tag.as_str(), info.count))
        .collect();

    render(output, &counts, |counts, w| {
        for (tag, count) in counts {
            writeln!(w, "{tag}\t{count}")?;
        }
        Ok(())
    })
}
