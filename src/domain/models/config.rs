//! Configuration model deserialized by the config loader.

use serde::{Deserialize, Serialize};

/// Main configuration structure for BookBridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Era classifier configuration
    #[serde(default)]
    pub era: EraConfig,

    /// Simplification collaborator configuration
    #[serde(default)]
    pub simplifier: SimplifierConfig,

    /// Batch scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Quality gate configuration
    #[serde(default)]
    pub quality: QualityConfig,

    /// Coverage tracker configuration
    #[serde(default)]
    pub coverage: CoverageConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".bookbridge/bookbridge.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `sqlx` connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChunkingConfig {
    /// Target words per chunk; the last chunk may be shorter
    #[serde(default = "default_words_per_chunk")]
    pub words_per_chunk: usize,
}

const fn default_words_per_chunk() -> usize {
    400
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            words_per_chunk: default_words_per_chunk(),
        }
    }
}

/// Era classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EraConfig {
    /// Number of leading characters sampled for classification
    #[serde(default = "default_sample_chars")]
    pub sample_chars: usize,
}

const fn default_sample_chars() -> usize {
    2000
}

impl Default for EraConfig {
    fn default() -> Self {
        Self {
            sample_chars: default_sample_chars(),
        }
    }
}

/// Simplification collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimplifierConfig {
    /// Provider: http or anthropic
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the collaborator
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model name (anthropic provider)
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per request (anthropic provider)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_key_env() -> String {
    "BOOKBRIDGE_API_KEY".to_string()
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_timeout_secs() -> u64 {
    60
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Batch scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Worker pool size (1-8)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Global ceiling on requests per minute to the collaborator
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Minimum delay between two consecutive requests
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Consecutive transport/content failures that abort the run
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
}

const fn default_concurrency() -> usize {
    2
}

const fn default_requests_per_minute() -> u32 {
    30
}

const fn default_min_request_interval_ms() -> u64 {
    1000
}

const fn default_circuit_breaker_threshold() -> u32 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            requests_per_minute: default_requests_per_minute(),
            min_request_interval_ms: default_min_request_interval_ms(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per item, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    2000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Quality gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QualityConfig {
    /// Smallest accepted candidate/original length ratio
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,

    /// Largest accepted candidate/original length ratio
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,

    /// Leading characters compared by the near-identity check
    #[serde(default = "default_identity_prefix_chars")]
    pub identity_prefix_chars: usize,

    /// Dropped markers tolerated per category before flagging
    #[serde(default = "default_preservation_tolerance")]
    pub preservation_tolerance: usize,

    /// Cell overrides for the threshold table
    #[serde(default)]
    pub threshold_overrides: Vec<ThresholdOverride>,
}

const fn default_min_length_ratio() -> f64 {
    0.3
}

const fn default_max_length_ratio() -> f64 {
    1.5
}

const fn default_identity_prefix_chars() -> usize {
    150
}

const fn default_preservation_tolerance() -> usize {
    1
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_length_ratio: default_min_length_ratio(),
            max_length_ratio: default_max_length_ratio(),
            identity_prefix_chars: default_identity_prefix_chars(),
            preservation_tolerance: default_preservation_tolerance(),
            threshold_overrides: Vec::new(),
        }
    }
}

/// One `(era, level) -> min_score` override
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ThresholdOverride {
    /// Era name, e.g. `archaic`
    pub era: String,
    /// Level name, e.g. `B2`
    pub level: String,
    /// Replacement minimum score
    pub min_score: f64,
}

/// Coverage tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoverageConfig {
    /// Legacy score value marking known-bad cache entries; unset disables the check
    #[serde(default)]
    pub sentinel_score: Option<f64>,
}
