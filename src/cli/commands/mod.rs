//! CLI command implementations.

pub mod coverage;
pub mod init;
pub mod record;
pub mod report;
pub mod run;
pub mod work;
