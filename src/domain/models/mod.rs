//! Domain models for the simplification pipeline.

pub mod config;
pub mod coverage;
pub mod era;
pub mod level;
pub mod quality;
pub mod run;
pub mod simplification;
pub mod work;

pub use config::{
    ChunkingConfig, Config, CoverageConfig, DatabaseConfig, EraConfig, LoggingConfig, QualityConfig,
    RetryConfig, SchedulerConfig, SimplifierConfig, ThresholdOverride,
};
pub use coverage::{BacklogItem, BacklogReason, CoverageSummary};
pub use era::EraLabel;
pub use level::CefrLevel;
pub use quality::{
    FailureClass, MarkerCategory, MarkerCounts, PreservationIssue, QualityThresholdTable,
    QualityVerdict, RejectionReason,
};
pub use run::{FailedItem, ItemState, OutcomeCounts, RunReport, WorkItem};
pub use simplification::{FailureRecord, NaturalKey, SimplificationRecord};
pub use work::{Chunk, Work};
