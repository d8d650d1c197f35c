//! # cdr-notify CLI (`cdrn`)
//!
//! The `cdrn` binary watches a spool folder for newly arrived call-detail-
//! record files and notifies a mail gateway and a Telegram chat exactly once
//! per distinct file, recording every outcome in SQLite.
//!
//! ## Usage
//!
//! ```bash
//! cdrn --config ./config/cdrn.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cdrn init` | Create the SQLite database and schema |
//! | `cdrn scan` | Run one scan pass over the watched folder |
//! | `cdrn channels` | Show per-channel configuration health |
//! | `cdrn status` | Show recorded files and their outcomes |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! cdrn init --config ./config/cdrn.toml
//!
//! # See what a scan would pick up, without notifying
//! cdrn scan --dry-run
//!
//! # Process newly arrived files
//! cdrn scan
//!
//! # Inspect outcomes, including FAILED rows needing manual remediation
//! cdrn status
//! ```
//!
//! Credentials are taken from the environment: `MAIL_API_TOKEN` for the
//! mail gateway and `TELEGRAM_BOT_TOKEN` for the chat bot.

mod channel;
mod config;
mod error;
mod fingerprint;
mod models;
mod notify;
mod outcome;
mod retry;
mod scan;
mod status;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// cdr-notify — a folder watcher that deduplicates CDR files and notifies
/// mail and chat channels.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cdrn.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cdrn",
    about = "cdr-notify — watch a folder for CDR files and notify mail and chat channels exactly once per file",
    version,
    long_about = "cdr-notify fingerprints every file that arrives in a watched folder \
    (SHA-256 over filename and content), skips fingerprints it has already recorded, \
    dispatches mail and chat notifications with retry and exponential backoff, and \
    durably records the outcome (SENT, PARTIAL, FAILED, or SKIPPED) so files are \
    neither re-notified nor silently dropped."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cdrn.toml`. Folder, database, channel, and
    /// retry settings are read from this file.
    #[arg(long, global = true, default_value = "./config/cdrn.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `cdr_files` table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Run one scan pass over the watched folder.
    ///
    /// Lists eligible files (regular, non-hidden, top level only) in
    /// lexicographic order, fingerprints each one, skips already-recorded
    /// fingerprints, dispatches the enabled channels with retry, and
    /// records every outcome. Missing channel credentials abort the run
    /// before any file is touched.
    Scan {
        /// List the files that would be notified, without dispatching or
        /// recording anything.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of files to process this pass.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show per-channel configuration health.
    ///
    /// Reports whether each channel is enabled, fully addressed, and has
    /// its token present in the environment. Useful before the first scan.
    Channels,

    /// Show recorded files and their outcomes.
    ///
    /// Prints per-status counts and the most recently recorded files.
    /// FAILED and PARTIAL rows are never retried automatically; this is
    /// where an operator finds them.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = store::DedupStore::open(&cfg.db.path).await?;
            store.init_schema().await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Scan { dry_run, limit } => {
            scan::run_scan(&cfg, dry_run, limit).await?;
        }
        Commands::Channels => {
            channel::list_channels(&cfg);
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
    }

    Ok(())
}
