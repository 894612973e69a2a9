//! Implementation of the `bookbridge run` command.

use anyhow::{Context, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::adapters::simplifier::create_simplifier;
use crate::cli::commands::coverage::parse_levels;
use crate::cli::context::AppContext;
use crate::cli::output::{output, table_with_header, CommandOutput};
use crate::cli::progress::{create_progress_bar, ProgressBarExt};
use crate::domain::models::{RunReport, WorkItem};
use crate::infrastructure::pacing::RequestPacer;
use crate::services::{BatchScheduler, RetryPolicy, SchedulerError, SchedulerEvent, SchedulerSettings};

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Works to process (repeatable; defaults to every work)
    #[arg(long = "work")]
    pub works: Vec<String>,

    /// Comma-separated levels (defaults to all six)
    #[arg(long)]
    pub levels: Option<String>,

    /// Process at most this many backlog items
    #[arg(long)]
    pub limit: Option<usize>,

    /// Override the configured worker pool size (1-8)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Print the plan without calling the simplifier
    #[arg(long)]
    pub dry_run: bool,
}

/// Dry-run plan.
#[derive(Debug, serde::Serialize)]
pub struct PlanOutput {
    /// Items that would be dispatched
    pub total: usize,
    /// Planned items per work
    pub per_work: BTreeMap<String, usize>,
    /// The items themselves, in dispatch order
    pub items: Vec<PlannedItem>,
}

/// One planned slot.
#[derive(Debug, serde::Serialize)]
pub struct PlannedItem {
    /// Owning work
    pub work_id: String,
    /// Target level
    pub level: String,
    /// Chunk position
    pub chunk_index: usize,
    /// Era used for the threshold
    pub era: String,
}

impl PlanOutput {
    fn from_items(items: &[WorkItem]) -> Self {
        let mut per_work = BTreeMap::new();
        for item in items {
            *per_work.entry(item.key.work_id.clone()).or_insert(0) += 1;
        }
        Self {
            total: items.len(),
            per_work,
            items: items
                .iter()
                .map(|item| PlannedItem {
                    work_id: item.key.work_id.clone(),
                    level: item.key.level.to_string(),
                    chunk_index: item.key.chunk_index,
                    era: item.era.to_string(),
                })
                .collect(),
        }
    }
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        if self.total == 0 {
            return "Nothing to do: backlog is empty.".to_string();
        }
        let mut table = table_with_header(&["Work", "Items"]);
        for (work, count) in &self.per_work {
            table.add_row(vec![work.clone(), count.to_string()]);
        }
        format!("Dry run: {} item(s) would be processed\n{table}", self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Finished run.
#[derive(Debug, serde::Serialize)]
pub struct RunOutput {
    /// Report of the run
    #[serde(flatten)]
    pub report: RunReport,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let r = &self.report;
        let mut lines = vec![format!("Run {}", r.run_id)];
        if let Some(reason) = &r.aborted {
            lines.push(format!("Aborted: {reason}"));
        } else if r.interrupted {
            lines.push("Interrupted by shutdown signal".to_string());
        }
        lines.push(format!(
            "Backlog {} | accepted {} ({} with warnings) | failed {} | skipped {} | rejected attempts {} | retries {}",
            r.backlog_size, r.accepted, r.accepted_with_warnings, r.failed, r.skipped, r.rejected, r.retries
        ));
        if let Some(secs) = r.duration_secs() {
            lines.push(format!("Duration: {secs}s"));
        }

        if !r.per_level.is_empty() {
            let mut table = table_with_header(&["Level", "Accepted", "Rejected", "Failed"]);
            for (level, counts) in &r.per_level {
                table.add_row(vec![
                    level.to_string(),
                    counts.accepted.to_string(),
                    counts.rejected.to_string(),
                    counts.failed.to_string(),
                ]);
            }
            lines.push(table.to_string());
        }

        if !r.failed_items.is_empty() {
            lines.push("Failed items:".to_string());
            for item in &r.failed_items {
                lines.push(format!(
                    "  {} after {} attempt(s) [{}]: {}",
                    item.key,
                    item.attempts,
                    item.failure_class.as_str(),
                    item.reason
                ));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.report).unwrap_or_default()
    }
}

/// Run `run`: plan the backlog, then either print it or process it.
pub async fn execute(args: RunArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let levels = parse_levels(args.levels.as_deref())?;
    let items = ctx
        .backlog_service()?
        .plan(&args.works, &levels, args.limit)
        .await?;

    if args.dry_run {
        output(&PlanOutput::from_items(&items), json_mode);
        return Ok(());
    }

    let config = &ctx.config;
    let mut settings = SchedulerSettings::from_config(&config.scheduler, &config.simplifier);
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }

    let simplifier = create_simplifier(&config.simplifier).context("Failed to create simplifier")?;
    let (events_tx, mut events_rx) = mpsc::channel(256);
    let scheduler = BatchScheduler::new(
        simplifier,
        Arc::clone(&ctx.store),
        Arc::new(ctx.quality_gate()?),
        Arc::new(RequestPacer::from_config(&config.scheduler)),
        RetryPolicy::from(&config.retry),
        settings,
    )?
    .with_events(events_tx);

    info!(
        items = items.len(),
        concurrency = settings.concurrency,
        provider = %config.simplifier.provider,
        "Starting simplification run"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown requested; finishing in-flight items");
            let _ = shutdown_tx.send(true);
        }
    });

    let progress = create_progress_bar(items.len() as u64, json_mode);
    let progress_task = {
        let progress = progress.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match event {
                    SchedulerEvent::ItemAccepted { key, .. } => {
                        progress.inc(1);
                        progress.set_message(format!("accepted {key}"));
                    }
                    SchedulerEvent::ItemFailed { key, .. } => {
                        progress.inc(1);
                        progress.set_message(format!("failed {key}"));
                    }
                    SchedulerEvent::ItemRetrying { key, attempt, .. } => {
                        progress.set_message(format!("retrying {key} (attempt {attempt})"));
                    }
                    SchedulerEvent::CircuitOpened { failures, .. } => {
                        progress.set_message(format!("circuit open after {failures} failures"));
                    }
                    SchedulerEvent::Started { .. }
                    | SchedulerEvent::ItemRejected { .. }
                    | SchedulerEvent::Finished { .. } => {}
                }
            }
        })
    };

    let result = scheduler.run_until(items, shutdown_rx).await;
    // Closing the event channel ends the progress task.
    drop(scheduler);
    let _ = progress_task.await;
    signal_task.abort();

    match result {
        Ok(report) => {
            if report.interrupted {
                progress.finish_warning("interrupted");
            } else {
                progress.finish_success("done");
            }
            output(&RunOutput { report }, json_mode);
            Ok(())
        }
        Err(err @ SchedulerError::CircuitOpen { .. }) => {
            progress.finish_warning("aborted");
            output(
                &RunOutput {
                    report: err.report().clone(),
                },
                json_mode,
            );
            Err(err.into())
        }
    }
}
