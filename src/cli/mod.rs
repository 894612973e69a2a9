//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;
pub mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use commands::coverage::CoverageArgs;
use commands::init::InitArgs;
use commands::record::RecordArgs;
use commands::report::ReportArgs;
use commands::run::RunArgs;
use commands::work::WorkArgs;
use context::AppContext;

/// Parsed command line.
#[derive(Parser, Debug)]
#[command(name = "bookbridge")]
#[command(about = "BookBridge - CEFR text simplification pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .bookbridge/
    #[arg(short, long, global = true, env = "BOOKBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the project directory, default config, and database
    Init(InitArgs),
    /// Ingest and inspect works
    Work(WorkArgs),
    /// Show coverage and backlog
    Coverage(CoverageArgs),
    /// Process the backlog through the simplifier and quality gate
    Run(RunArgs),
    /// Inspect or invalidate stored simplifications
    Record(RecordArgs),
    /// Failure ledger and run history
    Report(ReportArgs),
}

impl Cli {
    /// Load configuration from `--config` or the project hierarchy.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(),
        }
    }
}

/// Dispatch a parsed command.
pub async fn dispatch(command: Commands, config: Config, json_mode: bool) -> Result<()> {
    if let Commands::Init(args) = command {
        return commands::init::execute(args, config, json_mode).await;
    }

    let ctx = AppContext::open(config).await?;
    match command {
        Commands::Init(_) => Ok(()),
        Commands::Work(args) => commands::work::execute(args, &ctx, json_mode).await,
        Commands::Coverage(args) => commands::coverage::execute(args, &ctx, json_mode).await,
        Commands::Run(args) => commands::run::execute(args, &ctx, json_mode).await,
        Commands::Record(args) => commands::record::execute(args, &ctx, json_mode).await,
        Commands::Report(args) => commands::report::execute(args, &ctx, json_mode).await,
    }
}

/// Print `err` in the selected format and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
