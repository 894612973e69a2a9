//! Service layer: heuristics, quality gating, coverage, and batch execution.

pub mod backlog_service;
pub mod batch_scheduler;
pub mod chunker;
pub mod circuit_breaker;
pub mod content_markers;
pub mod coverage_tracker;
pub mod era_classifier;
pub mod ingestion;
pub mod quality_gate;
pub mod retry_policy;
pub mod text;

pub use backlog_service::BacklogService;
pub use batch_scheduler::{
    BatchScheduler, SchedulerError, SchedulerEvent, SchedulerSettings, MAX_CONCURRENCY,
};
pub use chunker::WordWindowChunker;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use content_markers::RegexMarkerCounter;
pub use coverage_tracker::{
    compute_backlog, compute_backlog_for_levels, coverage_summary, CoveragePolicy,
};
pub use era_classifier::LexicalEraClassifier;
pub use ingestion::{IngestOutcome, IngestRequest, IngestionService};
pub use quality_gate::{QualityGate, QualityPolicy};
pub use retry_policy::RetryPolicy;
