//! Shared output layer for text/JSON parity across CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly. `export` is JSON in both modes.

use serde::Serialize;
use std::io::{self, Write};

/// Output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Plain text for humans and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    pub const fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render a serializable value as pretty JSON, or with `text_fn` in text
/// mode.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => write_json(&mut out, value)?,
        OutputMode::Text => text_fn(value, &mut out)?,
    }
    Ok(())
}

/// Pretty JSON followed by a newline.
pub fn write_json<T: Serialize>(w: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

/// Tell the user about tags that were used for the first time.
pub fn note_new_tags(w: &mut dyn Write, tags: &[String]) -> io::Result<()> {
    for tag in tags {
        writeln!(w, "Note: '{tag}' is a new tag.")?;
    }
    Ok(())
}
