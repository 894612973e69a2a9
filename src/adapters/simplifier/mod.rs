//! Simplification client adapters.

pub mod anthropic;
pub mod http;
pub mod mock;

pub use anthropic::{AnthropicConfig, AnthropicSimplifier};
pub use http::HttpSimplifier;
pub use mock::{MockReply, MockSimplifier};

use std::sync::Arc;

use crate::domain::models::SimplifierConfig;
use crate::domain::ports::{Simplifier, SimplifierError};

/// Build the simplifier named by `config.provider`.
///
/// The API key is read from the environment variable named by
/// `config.api_key_env`; it is required for `anthropic` and optional for `http`.
/// [`MockSimplifier`] is never built here, so stub rewrites cannot reach a
/// real store.
pub fn create_simplifier(config: &SimplifierConfig) -> Result<Arc<dyn Simplifier>, SimplifierError> {
    let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());

    match config.provider.as_str() {
        "http" => Ok(Arc::new(HttpSimplifier::new(
            config.base_url.clone(),
            api_key,
            config.timeout_secs,
        )?)),
        "anthropic" => {
            let api_key = api_key.ok_or_else(|| {
                SimplifierError::InvalidConfig(format!(
                    "{} environment variable not set",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(AnthropicSimplifier::new(AnthropicConfig {
                api_key,
                model: config.model.clone(),
                base_url: config.base_url.clone(),
                max_tokens: config.max_tokens,
                timeout_secs: config.timeout_secs,
            })?))
        }
        other => Err(SimplifierError::InvalidConfig(format!("Unknown simplifier provider: {other}"))),
    }
}
