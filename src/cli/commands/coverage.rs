//! Coverage CLI commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::output::{output, percent, table_with_header, CommandOutput};
use crate::domain::models::{BacklogItem, CefrLevel, CoverageSummary};

/// Arguments for `coverage`.
#[derive(Args, Debug)]
pub struct CoverageArgs {
    /// Restrict the summary to one work
    #[arg(long)]
    pub work: Option<String>,

    /// Optional backlog listing
    #[command(subcommand)]
    pub command: Option<CoverageCommands>,
}

/// `coverage` subcommands.
#[derive(Subcommand, Debug)]
pub enum CoverageCommands {
    /// List the keys of a work that still need a valid record
    Backlog {
        /// Work id
        work: String,
        /// Comma-separated levels (defaults to all six)
        #[arg(long)]
        levels: Option<String>,
        /// Show at most this many items
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Parse `--levels`, defaulting to every level.
pub fn parse_levels(levels: Option<&str>) -> Result<Vec<CefrLevel>> {
    match levels {
        None => Ok(CefrLevel::ALL.to_vec()),
        Some(list) => {
            let parsed = CefrLevel::parse_list(list).map_err(|e| anyhow!(e))?;
            if parsed.is_empty() {
                return Err(anyhow!("--levels must name at least one level"));
            }
            Ok(parsed)
        }
    }
}

/// Coverage of one or all works.
#[derive(Debug, serde::Serialize)]
pub struct CoverageOutput {
    /// One summary per work
    pub works: Vec<CoverageSummary>,
}

impl CommandOutput for CoverageOutput {
    fn to_human(&self) -> String {
        if self.works.is_empty() {
            return "No works found.".to_string();
        }

        let mut headers = vec!["Work", "Chunks"];
        headers.extend(CefrLevel::ALL.iter().map(CefrLevel::as_str));
        headers.extend(["Valid", "Complete"]);

        let mut table = table_with_header(&headers);
        for summary in &self.works {
            let mut row = vec![summary.work_id.clone(), summary.total_chunks.to_string()];
            row.extend(
                CefrLevel::ALL
                    .iter()
                    .map(|level| summary.per_level.get(level).copied().unwrap_or(0).to_string()),
            );
            row.push(format!("{}/{}", summary.valid, summary.expected));
            row.push(percent(summary.completion()));
            table.add_row(row);
        }
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Backlog listing for one work.
#[derive(Debug, serde::Serialize)]
pub struct BacklogOutput {
    /// Work listed
    pub work_id: String,
    /// Items shown, possibly truncated by `--limit`
    pub items: Vec<BacklogItem>,
    /// Backlog size before truncation
    pub total: usize,
}

impl CommandOutput for BacklogOutput {
    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return format!("Work '{}' is fully covered.", self.work_id);
        }

        let mut table = table_with_header(&["Chunk", "Level", "Reason"]);
        for item in &self.items {
            table.add_row(vec![
                item.key.chunk_index.to_string(),
                item.key.level.to_string(),
                item.reason.to_string(),
            ]);
        }
        let mut text = format!("{} backlog item(s) for '{}':\n{table}", self.total, self.work_id);
        if self.items.len() < self.total {
            text.push_str(&format!("\n... {} more", self.total - self.items.len()));
        }
        text
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run `coverage`.
pub async fn execute(args: CoverageArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = ctx.backlog_service()?;

    match args.command {
        Some(CoverageCommands::Backlog { work, levels, limit }) => {
            let levels = parse_levels(levels.as_deref())?;
            let mut items = service.backlog(&work, &levels).await?;
            let total = items.len();
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            let out = BacklogOutput {
                work_id: work,
                items,
                total,
            };
            output(&out, json_mode);
        }
        None => {
            let works = match args.work {
                Some(id) => vec![service.coverage(&id).await?],
                None => service.coverage_all().await?,
            };
            output(&CoverageOutput { works }, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels_defaults_to_all() {
        assert_eq!(parse_levels(None).unwrap(), CefrLevel::ALL.to_vec());
        assert_eq!(
            parse_levels(Some("b2,a1")).unwrap(),
            vec![CefrLevel::A1, CefrLevel::B2]
        );
        assert!(parse_levels(Some("D4")).is_err());
        assert!(parse_levels(Some(",")).is_err());
    }
}
