//! BookBridge - CEFR text simplification pipeline
//!
//! BookBridge rewrites long-form texts into six CEFR reading levels (A1-C2).
//! Works are split into fixed-size chunks, each chunk is sent to an external
//! simplification service once per level, and every candidate passes a
//! quality gate before it is stored. Coverage tracking turns the store into
//! a resumable backlog for the batch scheduler.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, port traits, and errors
//! - **Service Layer** (`services`): Heuristics, quality gating, coverage, and scheduling
//! - **Adapters** (`adapters`): SQLite result store and simplifier clients
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging, and pacing
//! - **CLI Layer** (`cli`): Command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    CefrLevel, Chunk, Config, CoverageSummary, EraLabel, NaturalKey, QualityVerdict, RunReport,
    SimplificationRecord, Work, WorkItem,
};
pub use domain::ports::{SimplificationRepository, Simplifier, WorkRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{BacklogService, BatchScheduler, IngestionService, QualityGate};
