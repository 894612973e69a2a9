//! Adapters for external systems: storage and the simplification collaborator.

pub mod simplifier;
pub mod sqlite;
