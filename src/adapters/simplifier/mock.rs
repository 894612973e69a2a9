//! Mock simplifier for tests and offline runs.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::models::CefrLevel;
use crate::domain::ports::{SimplificationRequest, Simplifier, SimplifierError, SimplifierResponse};

/// One scripted collaborator reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this candidate with an optional reported score.
    Candidate { text: String, quality: Option<f64> },
    /// Return the original text unchanged.
    Echo { quality: Option<f64> },
    /// Return the built-in shortened rewrite.
    Rewrite { quality: Option<f64> },
    /// Fail with an empty candidate.
    Empty,
    /// Fail at the transport level with this HTTP status.
    Status(u16),
    /// Fail with a network error.
    Network(String),
    /// Sleep before answering with the built-in rewrite.
    Slow(Duration),
    /// Panic inside the call.
    Panic,
}

impl MockReply {
    /// Fixed candidate with a reported score.
    pub fn candidate(text: impl Into<String>, quality: f64) -> Self {
        Self::Candidate {
            text: text.into(),
            quality: Some(quality),
        }
    }

    /// Built-in rewrite with a reported score.
    pub fn rewrite(quality: f64) -> Self {
        Self::Rewrite {
            quality: Some(quality),
        }
    }
}

/// Deterministic stand-in rewrite: a short lead-in followed by roughly the
/// first four fifths of the words.
pub fn stub_rewrite(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let keep = (words.len() * 4).div_ceil(5).max(1).min(words.len());
    format!("In short: {}", words[..keep].join(" "))
}

/// Mock simplifier with per-(text, level) reply scripts.
///
/// Scripted replies are consumed in order; once a script runs out the
/// last reply repeats. Unscripted requests get the default reply.
pub struct MockSimplifier {
    default_reply: MockReply,
    scripts: Arc<RwLock<HashMap<(String, CefrLevel), VecDeque<MockReply>>>>,
    calls: Arc<RwLock<Vec<SimplificationRequest>>>,
}

impl MockSimplifier {
    /// Mock whose unscripted requests get a rewrite scored `0.9`.
    pub fn new() -> Self {
        Self::with_default_reply(MockReply::rewrite(0.9))
    }

    /// Mock answering unscripted requests with `reply`.
    pub fn with_default_reply(reply: MockReply) -> Self {
        Self {
            default_reply: reply,
            scripts: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Script the replies for one chunk text at one level.
    pub async fn script(&self, text: impl Into<String>, level: CefrLevel, replies: Vec<MockReply>) {
        let mut scripts = self.scripts.write().await;
        scripts.insert((text.into(), level), replies.into());
    }

    /// Every request received so far.
    pub async fn calls(&self) -> Vec<SimplificationRequest> {
        self.calls.read().await.clone()
    }

    /// Number of requests received.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn next_reply(&self, request: &SimplificationRequest) -> MockReply {
        let mut scripts = self.scripts.write().await;
        let key = (request.text.clone(), request.target_level);
        match scripts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| self.default_reply.clone()),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| self.default_reply.clone()),
            None => self.default_reply.clone(),
        }
    }
}

impl Default for MockSimplifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Simplifier for MockSimplifier {
    async fn simplify(&self, request: &SimplificationRequest) -> Result<SimplifierResponse, SimplifierError> {
        self.calls.write().await.push(request.clone());

        match self.next_reply(request).await {
            MockReply::Candidate { text, quality } => Ok(SimplifierResponse {
                candidate: text,
                reported_quality: quality,
            }),
            MockReply::Echo { quality } => Ok(SimplifierResponse {
                candidate: request.text.clone(),
                reported_quality: quality,
            }),
            MockReply::Rewrite { quality } => Ok(SimplifierResponse {
                candidate: stub_rewrite(&request.text),
                reported_quality: quality,
            }),
            MockReply::Empty => Err(SimplifierError::EmptyContent),
            MockReply::Status(status) => Err(SimplifierError::Status {
                status,
                body: "mock failure".to_string(),
            }),
            MockReply::Network(message) => Err(SimplifierError::Network(message)),
            MockReply::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(SimplifierResponse {
                    candidate: stub_rewrite(&request.text),
                    reported_quality: Some(0.9),
                })
            }
            MockReply::Panic => panic!("mock simplifier panicked on {}", request.target_level),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
