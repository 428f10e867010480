//! Command-line interface for repo-pulse
//!
//! Provides `run`, `status` and `export` subcommands.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod export;
mod run;
mod status;

/// Incremental git history extraction for contribution analytics
#[derive(Parser)]
#[command(name = "repo-pulse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync mirrors and extract new commits and PRs into the dataset
    Run(run::RunArgs),

    /// Show per-repository checkpoints and dataset row counts
    Status(status::StatusArgs),

    /// Export the dataset as JSONL for downstream reporting
    Export(export::ExportArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Wire verbose flag to the tracing log level.
    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Run(args) => run::run(args),
        Commands::Status(args) => status::run(args),
        Commands::Export(args) => export::run(args),
    }
}
