use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// File name of the per-store configuration inside the store location.
pub const CONFIG_FILENAME: &str = "tempo.toml";

/// Environment variable overriding the default store location.
pub const LOCATION_ENV: &str = "TEMPODB";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Transactions to keep in `undo.data`. Negative is unlimited, zero
    /// disables the journal.
    #[serde(default = "default_journal_size")]
    pub size: i64,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            size: default_journal_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Print user-facing notices such as new tags.
    #[serde(default = "default_true")]
    pub verbose: bool,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            verbose: default_true(),
        }
    }
}

/// Load `<location>/tempo.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(location: &Path) -> Result<Config> {
    let path = location.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the store location: explicit flag, then `TEMPODB`, then the
/// platform data directory.
///
/// # Errors
///
/// Returns an error if no flag or env var is given and the platform has no
/// data directory.
pub fn resolve_location(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env::var_os(LOCATION_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    dirs::data_dir()
        .map(|dir| dir.join("tempo"))
        .context("Could not determine a data directory; set TEMPODB or pass --db")
}

const fn default_journal_size() -> i64 {
    -1
}

const fn default_true() -> bool {
    true
}
