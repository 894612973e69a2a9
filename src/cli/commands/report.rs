//! Reporting CLI commands: failure ledger and run history.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::output::{output, table_with_header, truncate, CommandOutput};
use crate::domain::models::{FailureRecord, RunReport};

/// Arguments for `report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Report subcommand
    #[command(subcommand)]
    pub command: ReportCommands,
}

/// `report` subcommands.
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// List keys that failed terminally and have not been accepted since
    Failures {
        /// Restrict to one work
        #[arg(long)]
        work: Option<String>,
    },
    /// List recent batch runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

/// Failure ledger listing.
#[derive(Debug, serde::Serialize)]
pub struct FailuresOutput {
    /// Open failures
    pub failures: Vec<FailureRecord>,
    /// Number of open failures
    pub total: usize,
}

impl CommandOutput for FailuresOutput {
    fn to_human(&self) -> String {
        if self.failures.is_empty() {
            return "No outstanding failures.".to_string();
        }

        let mut table = table_with_header(&["Work", "Level", "Chunk", "Attempts", "Class", "Error", "Failed At"]);
        for failure in &self.failures {
            table.add_row(vec![
                failure.key.work_id.clone(),
                failure.key.level.to_string(),
                failure.key.chunk_index.to_string(),
                failure.attempts.to_string(),
                failure.failure_class.as_str().to_string(),
                truncate(&failure.last_error, 60),
                failure.failed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        format!("{} failure(s):\n{table}", self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Recent run history.
#[derive(Debug, serde::Serialize)]
pub struct RunsOutput {
    /// Runs, newest first
    pub runs: Vec<RunReport>,
}

impl CommandOutput for RunsOutput {
    fn to_human(&self) -> String {
        if self.runs.is_empty() {
            return "No runs recorded.".to_string();
        }

        let mut table = table_with_header(&[
            "Run", "Started", "Backlog", "Accepted", "Failed", "Skipped", "Status",
        ]);
        for run in &self.runs {
            let status = match (&run.aborted, run.interrupted) {
                (Some(_), _) => "aborted",
                (None, true) => "interrupted",
                (None, false) => "completed",
            };
            table.add_row(vec![
                run.run_id.to_string()[..8].to_string(),
                run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                run.backlog_size.to_string(),
                run.accepted.to_string(),
                run.failed.to_string(),
                run.skipped.to_string(),
                status.to_string(),
            ]);
        }
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run `report`.
pub async fn execute(args: ReportArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        ReportCommands::Failures { work } => {
            let failures = ctx.store.list_failures(work.as_deref()).await?;
            let out = FailuresOutput {
                total: failures.len(),
                failures,
            };
            output(&out, json_mode);
        }
        ReportCommands::Runs { limit } => {
            let runs = ctx.store.list_runs(limit).await?;
            output(&RunsOutput { runs }, json_mode);
        }
    }

    Ok(())
}
