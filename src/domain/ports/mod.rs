//! Port trait definitions (Hexagonal Architecture)
//!
//! - `Simplifier`: external text-simplification collaborator
//! - `WorkRepository`: ingested works and chunks
//! - `SimplificationRepository`: the result store, failure ledger and run history
//! - `EraClassifier` / `MarkerCounter`: pluggable text heuristics

pub mod heuristics;
pub mod simplification_repository;
pub mod simplifier;
pub mod work_repository;

pub use heuristics::{EraClassifier, MarkerCounter};
pub use simplification_repository::SimplificationRepository;
pub use simplifier::{SimplificationRequest, Simplifier, SimplifierError, SimplifierResponse};
pub use work_repository::WorkRepository;
