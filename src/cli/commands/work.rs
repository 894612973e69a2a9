//! Work CLI commands: ingest, list, show.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::context::AppContext;
use crate::cli::output::{output, percent, table_with_header, truncate, CommandOutput};
use crate::domain::models::{CoverageSummary, EraLabel, Work};
use crate::services::IngestRequest;

/// Arguments for `work`.
#[derive(Args, Debug)]
pub struct WorkArgs {
    /// Work subcommand
    #[command(subcommand)]
    pub command: WorkCommands,
}

/// `work` subcommands.
#[derive(Subcommand, Debug)]
pub enum WorkCommands {
    /// Ingest (or re-ingest) a plain-text work
    Ingest {
        /// Path to the UTF-8 text file
        file: PathBuf,
        /// Work id (defaults to the file stem)
        #[arg(long)]
        id: Option<String>,
        /// Title (defaults to the id)
        #[arg(long)]
        title: Option<String>,
        /// Author
        #[arg(long, default_value = "Unknown")]
        author: String,
        /// Era label, skipping detection (archaic, 19th-century-formal, 19th-century-vernacular, contemporary)
        #[arg(long)]
        era: Option<String>,
    },
    /// List ingested works
    List,
    /// Show one work with its coverage
    Show {
        /// Work id
        id: String,
    },
}

/// A work without its text.
#[derive(Debug, serde::Serialize)]
pub struct WorkOutput {
    /// Work id
    pub id: String,
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Era label
    pub era: String,
    /// Total words
    pub word_count: usize,
    /// Chunks in the work
    pub total_chunks: usize,
    /// Last ingestion time, RFC 3339
    pub updated_at: String,
}

impl From<&Work> for WorkOutput {
    fn from(work: &Work) -> Self {
        Self {
            id: work.id.clone(),
            title: work.title.clone(),
            author: work.author.clone(),
            era: work.era.as_str().to_string(),
            word_count: work.word_count,
            total_chunks: work.total_chunks,
            updated_at: work.updated_at.to_rfc3339(),
        }
    }
}

/// Result of `work ingest`.
#[derive(Debug, serde::Serialize)]
pub struct IngestOutput {
    /// The stored work
    pub work: WorkOutput,
    /// Whether an existing work was replaced
    pub replaced: bool,
    /// Records dropped for chunk indices that no longer exist
    pub purged_records: u64,
    /// Records dropped because their chunk text changed
    pub stale_records: u64,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        let verb = if self.replaced { "Re-ingested" } else { "Ingested" };
        let mut lines = vec![format!(
            "{verb} '{}' ({} words, {} chunks, era {})",
            self.work.id, self.work.word_count, self.work.total_chunks, self.work.era
        )];
        if self.purged_records > 0 {
            lines.push(format!(
                "Removed {} stored record(s) for chunks that no longer exist",
                self.purged_records
            ));
        }
        if self.stale_records > 0 {
            lines.push(format!(
                "Removed {} stored record(s) simplified from replaced text",
                self.stale_records
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Every ingested work.
#[derive(Debug, serde::Serialize)]
pub struct WorkListOutput {
    /// Works ordered by id
    pub works: Vec<WorkOutput>,
    /// Number of works
    pub total: usize,
}

impl CommandOutput for WorkListOutput {
    fn to_human(&self) -> String {
        if self.works.is_empty() {
            return "No works found.".to_string();
        }

        let mut table = table_with_header(&["ID", "Title", "Author", "Era", "Words", "Chunks"]);
        for work in &self.works {
            table.add_row(vec![
                work.id.clone(),
                truncate(&work.title, 40),
                truncate(&work.author, 24),
                work.era.clone(),
                work.word_count.to_string(),
                work.total_chunks.to_string(),
            ]);
        }
        format!("Found {} work(s):\n{table}", self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// One work with its coverage.
#[derive(Debug, serde::Serialize)]
pub struct WorkDetailOutput {
    /// The work
    pub work: WorkOutput,
    /// Its coverage summary
    pub coverage: CoverageSummary,
}

impl CommandOutput for WorkDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Work: {}", self.work.title),
            format!("ID: {}", self.work.id),
            format!("Author: {}", self.work.author),
            format!("Era: {}", self.work.era),
            format!("Words: {}", self.work.word_count),
            format!("Chunks: {}", self.work.total_chunks),
            format!(
                "Coverage: {}/{} ({})",
                self.coverage.valid,
                self.coverage.expected,
                percent(self.coverage.completion())
            ),
        ];
        for (level, valid) in &self.coverage.per_level {
            lines.push(format!("  {level}: {valid}/{}", self.coverage.total_chunks));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run `work`.
pub async fn execute(args: WorkArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        WorkCommands::Ingest {
            file,
            id,
            title,
            author,
            era,
        } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let id = match id {
                Some(id) => id,
                None => file
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .ok_or_else(|| anyhow!("Cannot derive a work id from {}; pass --id", file.display()))?,
            };
            let era_override = era
                .map(|e| EraLabel::from_str(&e).ok_or_else(|| anyhow!("Invalid era: {e}")))
                .transpose()?;

            let outcome = ctx
                .ingestion_service()?
                .ingest(IngestRequest {
                    title: title.unwrap_or_else(|| id.clone()),
                    id,
                    author,
                    text,
                    era_override,
                })
                .await?;

            let out = IngestOutput {
                work: WorkOutput::from(&outcome.work),
                replaced: outcome.replaced,
                purged_records: outcome.purged_records,
                stale_records: outcome.stale_records,
            };
            output(&out, json_mode);
        }

        WorkCommands::List => {
            let works = ctx.works.list_works().await?;
            let out = WorkListOutput {
                total: works.len(),
                works: works.iter().map(WorkOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        WorkCommands::Show { id } => {
            let work = ctx
                .works
                .get_work(&id)
                .await?
                .ok_or_else(|| anyhow!("Work not found: {id}"))?;
            let coverage = ctx.backlog_service()?.coverage(&id).await?;
            let out = WorkDetailOutput {
                work: WorkOutput::from(&work),
                coverage,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
