//! Rate limiting implementation
//!
//! Uses the governor crate with a burst of one, which spaces consecutive
//! requests at least `1000 / requests_per_second` ms apart.
//!
//! The limiter is private to one client: separate clients (for example
//! parallel workflow executions) each get their own budget, so the
//! server-side limit is not coordinated across them.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Lowest accepted requests-per-second setting
pub const MIN_REQUESTS_PER_SECOND: u32 = 1;

/// Highest accepted requests-per-second setting
pub const MAX_REQUESTS_PER_SECOND: u32 = 10;

/// Requests-per-second used when nothing is configured
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// Clamp a requests-per-second value into the accepted range
pub fn clamp_requests_per_second(rps: u32) -> u32 {
    rps.clamp(MIN_REQUESTS_PER_SECOND, MAX_REQUESTS_PER_SECOND)
}

/// Request pacer
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    requests_per_second: u32,
}

impl RateLimiter {
    /// Create a pacer for the given rate, clamped to `[1, 10]`
    pub fn new(requests_per_second: u32) -> Self {
        let requests_per_second = clamp_requests_per_second(requests_per_second);
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
            requests_per_second,
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// The effective (clamped) rate
    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}
