//! Simplification collaborator port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::{CefrLevel, EraLabel, FailureClass};

/// One chunk to transform into one target level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplificationRequest {
    /// Chunk text to simplify
    pub text: String,
    /// Level to rewrite into
    pub target_level: CefrLevel,
    /// Era of the source, passed on as a style hint
    pub era_hint: EraLabel,
}

/// A successful collaborator response with non-empty candidate text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplifierResponse {
    /// Rewritten text; never empty
    pub candidate: String,
    /// Optional quality/similarity signal reported by the collaborator
    pub reported_quality: Option<f64>,
}

/// Failures surfaced by a simplification client.
///
/// Clients never substitute the original text for a failed call.
#[derive(Debug, Error)]
pub enum SimplifierError {
    /// Connection or protocol failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the request timeout
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Non-success HTTP status
    #[error("Collaborator returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated by the client
        body: String,
    },

    /// Successful response whose candidate text is empty or missing
    #[error("Empty or missing content in response")]
    EmptyContent,

    /// Collaborator reported a structured failure reason
    #[error("Collaborator refused request: {0}")]
    Refused(String),

    /// Response body could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Client could not be constructed from its configuration
    #[error("Invalid simplifier configuration: {0}")]
    InvalidConfig(String),
}

impl SimplifierError {
    /// Broad category used by the retry policy and the breaker.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::EmptyContent | Self::Refused(_) => FailureClass::Content,
            Self::Network(_)
            | Self::Timeout(_)
            | Self::Status { .. }
            | Self::Malformed(_)
            | Self::InvalidConfig(_) => FailureClass::Transport,
        }
    }

    /// Classify a `reqwest` failure, reporting timeouts with the configured limit.
    pub fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Port for the external text-simplification collaborator.
///
/// A single synchronous request/response; retries belong to the scheduler.
#[async_trait]
pub trait Simplifier: Send + Sync {
    /// Transform one chunk into one target level.
    async fn simplify(&self, request: &SimplificationRequest) -> Result<SimplifierResponse, SimplifierError>;

    /// Provider name for logs and reports.
    fn name(&self) -> &str;
}
