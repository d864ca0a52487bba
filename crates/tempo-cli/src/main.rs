#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tempo_core::StoreError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(author, version, about = "tempo: a plain-file time tracker", long_about = None)]
struct Cli {
    /// Store directory. Defaults to $TEMPODB, then the platform data directory.
    #[arg(long, global = true, value_name = "DIR")]
    db: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Record a closed interval",
        after_help = "EXAMPLES:\n    tempo track 2016-06-02T09:00:00Z 2016-06-02T17:00:00Z client \"deep work\""
    )]
    Track(cmd::track::TrackArgs),

    #[command(
        about = "Add intervals from a JSON array",
        long_about = "Add every interval in a JSON array (as produced by `tempo export`). \
                      The whole import is one undo transaction."
    )]
    Import(cmd::import::ImportArgs),

    #[command(about = "Print all intervals as JSON, oldest first")]
    Export,

    #[command(about = "Delete an interval by id (@1 is the most recent)")]
    Delete(cmd::delete::DeleteArgs),

    #[command(about = "Move the start or end of a closed interval")]
    Modify(cmd::modify::ModifyArgs),

    #[command(about = "List known tags with usage counts")]
    Tags,

    #[command(about = "List data files in chronological order")]
    Files,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TEMPO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "tempo=debug,info"
        } else {
            "tempo=info,warn"
        })
    });

    let format = env::var("TEMPO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let output = OutputMode::from_flag(cli.json);
    let db = cli.db.as_deref();

    let result = match cli.command {
        Commands::Track(ref args) => cmd::track::run_track(args, db, output),
        Commands::Import(ref args) => cmd::import::run_import(args, db, output),
        Commands::Export => cmd::export::run_export(db),
        Commands::Delete(ref args) => cmd::delete::run_delete(args, db, output),
        Commands::Modify(ref args) => cmd::modify::run_modify(args, db, output),
        Commands::Tags => cmd::tags::run_tags(db, output),
        Commands::Files => cmd::files::run_files(db, output),
    };

    if let Some(store_err) = result
        .as_ref()
        .err()
        .and_then(|err| err.downcast_ref::<StoreError>())
    {
        tracing::error!(code = %store_err.code(), "{}", store_err.code().message());
        if let Some(hint) = store_err.hint() {
            eprintln!("hint: {hint}");
        }
    }

    result
}
