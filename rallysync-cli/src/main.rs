//! rallysync: keep a fixtures sheet and its remote table in step.
//!
//! # Usage
//!
//! ```text
//! rallysync init --endpoint <url> [--source <name>] [--delay-ms <ms>] [--timeout-secs <s>] [--no-provision-all]
//! rallysync sync <sheet.yaml> [--dry-run]
//! rallysync diff <sheet.yaml> [--json]
//! rallysync status <sheet.yaml> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, init::InitArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "rallysync",
    version,
    about = "Reconcile a tournament fixtures sheet with its remote table",
    long_about = None,
)]
struct Cli {
    /// Log progress at info level (RUST_LOG overrides).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write ~/.rallysync/config.yaml.
    Init(InitArgs),

    /// Run one reconciliation cycle for a sheet.
    Sync(SyncArgs),

    /// Show the changes the next sync would deliver.
    Diff(DiffArgs),

    /// Show per-row sync status for a sheet.
    Status(StatusArgs),
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
