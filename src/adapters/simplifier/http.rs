//! Generic HTTP simplification service.
//!
//! Wire format:
//! `POST {base_url}/simplify` with `{"text", "target_level", "era_hint"}`,
//! answered by `{"simplified_text"?, "quality_score"?, "error"?}`.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::models::{CefrLevel, EraLabel};
use crate::domain::ports::{SimplificationRequest, Simplifier, SimplifierError, SimplifierResponse};

#[derive(Debug, Serialize)]
struct SimplifyBody<'a> {
    text: &'a str,
    target_level: CefrLevel,
    era_hint: EraLabel,
}

#[derive(Debug, Deserialize)]
struct SimplifyReply {
    #[serde(default)]
    simplified_text: Option<String>,
    #[serde(default)]
    quality_score: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for a self-hosted simplification endpoint.
pub struct HttpSimplifier {
    http_client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpSimplifier {
    /// Client for `base_url`, sending `api_key` as a bearer token when present.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, SimplifierError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| SimplifierError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[async_trait]
impl Simplifier for HttpSimplifier {
    #[instrument(skip(self, request), fields(level = %request.target_level))]
    async fn simplify(&self, request: &SimplificationRequest) -> Result<SimplifierResponse, SimplifierError> {
        let mut builder = self
            .http_client
            .post(format!("{}/simplify", self.base_url))
            .json(&SimplifyBody {
                text: &request.text,
                target_level: request.target_level,
                era_hint: request.era_hint,
            });
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SimplifierError::from_reqwest(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(SimplifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: SimplifyReply = response
            .json()
            .await
            .map_err(|e| SimplifierError::from_reqwest(&e, self.timeout))?;
        debug!(has_text = reply.simplified_text.is_some(), quality = ?reply.quality_score, "Simplification reply");

        match reply.simplified_text.filter(|t| !t.trim().is_empty()) {
            Some(candidate) => Ok(SimplifierResponse {
                candidate,
                reported_quality: reply.quality_score,
            }),
            None => match reply.error {
                Some(reason) => Err(SimplifierError::Refused(reason)),
                None => Err(SimplifierError::EmptyContent),
            },
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
