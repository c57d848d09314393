//! Call pacing for rate-limited upstream APIs.
//!
//! The public reverse-geocoding service allows one request per second. A
//! [`Pacer`] is shared by every caller of such an API so that the spacing
//! holds across jobs, not only within one loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spaces out calls by a fixed cooldown.
#[derive(Clone)]
pub struct Pacer {
    limiter: Option<Arc<Limiter>>,
    cooldown: Duration,
}

impl fmt::Debug for Pacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pacer")
            .field("cooldown", &self.cooldown)
            .field("throttled", &self.limiter.is_some())
            .finish()
    }
}

impl Pacer {
    /// Allow one call per `cooldown`. A zero cooldown disables pacing.
    #[must_use]
    pub fn every(cooldown: Duration) -> Self {
        let limiter = Quota::with_period(cooldown).map(|q| Arc::new(RateLimiter::direct(q)));
        Self { limiter, cooldown }
    }

    /// A pacer that never waits. Intended for tests.
    #[must_use]
    pub fn unthrottled() -> Self {
        Self::every(Duration::ZERO)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Wait until the next call is permitted.
    pub async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
