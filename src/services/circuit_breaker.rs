//! Circuit breaker guarding a batch run against a failing collaborator.
//!
//! Counts consecutive transport and content failures. Quality rejections
//! mean the collaborator is answering, so they neither trip nor reset the
//! breaker. An accepted item closes it again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::FailureClass;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// The run must stop dispatching.
    Open,
}

impl CircuitState {
    /// Lower-case state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
        }
    }
}

/// A failure counted by the breaker.
#[derive(Debug, Clone)]
pub struct BreakerFailure {
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// Its class; always one that counts toward the breaker
    pub class: FailureClass,
    /// Error message
    pub error: String,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    state: CircuitState,
    consecutive: Vec<BreakerFailure>,
    opened_at: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    /// A threshold of 0 disables the breaker.
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            failure_threshold,
            state: CircuitState::Closed,
            consecutive: Vec::new(),
            opened_at: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Whether the run should stop dispatching.
    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }

    /// When the breaker last opened.
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    /// Length of the current failure streak.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive.len() as u32
    }

    /// Most recent counted failure.
    pub fn last_failure(&self) -> Option<&BreakerFailure> {
        self.consecutive.last()
    }

    /// Record a failed attempt. Returns `true` when this failure opened the circuit.
    pub fn record_failure(&mut self, class: FailureClass, error: impl Into<String>) -> bool {
        if !class.counts_toward_breaker() {
            return false;
        }

        self.consecutive.push(BreakerFailure {
            timestamp: Utc::now(),
            class,
            error: error.into(),
        });

        if self.state == CircuitState::Closed
            && self.failure_threshold > 0
            && self.consecutive_failures() >= self.failure_threshold
        {
            self.state = CircuitState::Open;
            self.opened_at = Some(Utc::now());
            tracing::warn!(
                failures = self.consecutive_failures(),
                "Circuit breaker opened"
            );
            return true;
        }
        false
    }

    /// Record an accepted item; closes the circuit and clears the streak.
    pub fn record_success(&mut self) {
        self.consecutive.clear();
        if self.state == CircuitState::Open {
            tracing::info!("Circuit breaker closed");
        }
        self.state = CircuitState::Closed;
        self.opened_at = None;
    }
}
