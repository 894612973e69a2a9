//! Infrastructure layer module
//!
//! Cross-cutting plumbing used by the services and the CLI:
//! - Configuration management
//! - Logging infrastructure
//! - Request pacing toward the simplification collaborator

pub mod config;
pub mod logging;
pub mod pacing;
