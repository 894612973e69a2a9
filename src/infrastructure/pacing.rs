//! Global request pacing for the simplification collaborator.
//!
//! One pacer is shared by every scheduler worker, so the combined request
//! rate never exceeds `requests_per_minute` and two requests never start
//! closer together than `min_request_interval_ms`.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::domain::models::SchedulerConfig;

/// Shared pacer built on a single-slot `governor` quota.
pub struct RequestPacer {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    period: Duration,
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl RequestPacer {
    /// Pacer allowing one request per `period`, with no bursting.
    pub fn with_period(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(quota),
            period,
        }
    }

    /// Pacer honouring both the per-minute ceiling and the minimum spacing.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::with_period(Self::period_for(
            config.requests_per_minute,
            config.min_request_interval_ms,
        ))
    }

    /// The stricter of `60s / rpm` and the minimum interval.
    pub fn period_for(requests_per_minute: u32, min_request_interval_ms: u64) -> Duration {
        let per_request = Duration::from_secs(60) / requests_per_minute.max(1);
        per_request.max(Duration::from_millis(min_request_interval_ms))
    }

    /// Minimum spacing between two requests.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until the next request may start.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}
