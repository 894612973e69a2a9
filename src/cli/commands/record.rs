//! Result store CLI commands: inspect and invalidate records.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{CefrLevel, NaturalKey, SimplificationRecord};

/// Arguments for `record`.
#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Record subcommand
    #[command(subcommand)]
    pub command: RecordCommands,
}

/// `record` subcommands.
#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Show the stored record for one key
    Get {
        /// Work id
        work: String,
        /// CEFR level
        level: String,
        /// Chunk index
        chunk: usize,
    },
    /// Delete stored records so the next run regenerates them
    Invalidate {
        /// Work id
        work: String,
        /// Only this level
        #[arg(long)]
        level: Option<String>,
        /// Only this chunk index
        #[arg(long)]
        chunk: Option<usize>,
    },
}

fn parse_level(level: &str) -> Result<CefrLevel> {
    CefrLevel::from_str(level).ok_or_else(|| anyhow!("Invalid level: {level}"))
}

/// One stored record.
#[derive(Debug, serde::Serialize)]
pub struct RecordOutput {
    /// The record as stored
    #[serde(flatten)]
    pub record: SimplificationRecord,
}

impl CommandOutput for RecordOutput {
    fn to_human(&self) -> String {
        let r = &self.record;
        let mut lines = vec![
            format!("Key: {}", r.key),
            format!("Era: {}", r.era),
            format!("Score: {:.3}", r.quality_score),
            format!("Stored: {}", r.created_at.to_rfc3339()),
        ];
        if r.has_warnings() {
            lines.push("Warnings:".to_string());
            for issue in &r.preservation_issues {
                lines.push(format!("  - {issue}"));
            }
        }
        lines.push(String::new());
        lines.push("Original:".to_string());
        lines.push(r.original_text.clone());
        lines.push(String::new());
        lines.push("Simplified:".to_string());
        lines.push(r.simplified_text.clone());
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.record).unwrap_or_default()
    }
}

/// Result of `record invalidate`.
#[derive(Debug, serde::Serialize)]
pub struct InvalidateOutput {
    /// Work touched
    pub work_id: String,
    /// Level filter, if given
    pub level: Option<CefrLevel>,
    /// Chunk filter, if given
    pub chunk_index: Option<usize>,
    /// Records removed
    pub deleted: u64,
}

impl CommandOutput for InvalidateOutput {
    fn to_human(&self) -> String {
        let mut scope = format!("work '{}'", self.work_id);
        if let Some(level) = self.level {
            scope.push_str(&format!(", level {level}"));
        }
        if let Some(chunk) = self.chunk_index {
            scope.push_str(&format!(", chunk {chunk}"));
        }
        format!("Deleted {} record(s) for {scope}", self.deleted)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run `record`.
pub async fn execute(args: RecordArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        RecordCommands::Get { work, level, chunk } => {
            let key = NaturalKey::new(work, parse_level(&level)?, chunk);
            let record = ctx
                .store
                .get(&key)
                .await?
                .ok_or_else(|| anyhow!("No record stored for {key}"))?;
            output(&RecordOutput { record }, json_mode);
        }

        RecordCommands::Invalidate { work, level, chunk } => {
            let level = level.as_deref().map(parse_level).transpose()?;
            let deleted = ctx.store.invalidate(&work, level, chunk).await?;
            let out = InvalidateOutput {
                work_id: work,
                level,
                chunk_index: chunk,
                deleted,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
