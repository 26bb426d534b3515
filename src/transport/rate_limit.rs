//! Client-side request budget
//!
//! A portal meters every webhook with a leaky bucket: each HTTP request adds
//! one unit, the bucket drains at a fixed rate, and once it holds `burst_size`
//! units further requests fail with `QUERY_LIMIT_EXCEEDED`. A grouped call is
//! a single request no matter how many commands it carries, which is why the
//! pagination engine folds windows into grouped calls.
//!
//! [`RequestBudget`] keeps a local copy of that bucket (a governor token
//! bucket with the same rate and capacity), so a client pauses before the
//! portal starts rejecting commands.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Request budget of one webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Units drained from the bucket per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Bucket capacity: requests that can be sent back to back
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

fn default_requests_per_second() -> u32 {
    2
}

fn default_burst_size() -> u32 {
    50
}

impl Default for RateLimiterConfig {
    /// Budget of standard plans: 2 requests per second, bucket of 50
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

impl RateLimiterConfig {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    /// Budget of enterprise plans: 5 requests per second, bucket of 250
    pub fn enterprise() -> Self {
        Self::new(5, 250)
    }

    /// Time for one unit to drain out of the bucket
    pub fn refill_interval(&self) -> Duration {
        Duration::from_secs(1) / self.requests_per_second.max(1)
    }

    /// Time for a full bucket to drain completely
    pub fn recovery_time(&self) -> Duration {
        self.refill_interval() * self.burst_size.max(1)
    }

    fn quota(&self) -> Quota {
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(rate).allow_burst(burst)
    }
}

/// Local mirror of a webhook's leaky bucket
#[derive(Clone)]
pub struct RequestBudget {
    bucket: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RequestBudget {
    /// Start with a full allowance of `burst_size` requests
    pub fn new(config: &RateLimiterConfig) -> Self {
        debug!(
            "Request budget: {} back to back, one more every {:?}, full recovery in {:?}",
            config.burst_size.max(1),
            config.refill_interval(),
            config.recovery_time()
        );
        Self {
            bucket: Arc::new(Governor::direct(config.quota())),
        }
    }

    /// Wait until the portal would accept one more request
    pub async fn acquire(&self) {
        self.bucket.until_ready().await;
    }

    /// Take one request from the allowance without waiting
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RequestBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBudget").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    #[test]
    fn test_standard_and_enterprise_budgets() {
        let standard = RateLimiterConfig::default();
        assert_eq!(standard, RateLimiterConfig::new(2, 50));
        assert_eq!(standard.refill_interval(), Duration::from_millis(500));
        assert_eq!(standard.recovery_time(), Duration::from_secs(25));

        let enterprise = RateLimiterConfig::enterprise();
        assert_eq!(enterprise.refill_interval(), Duration::from_millis(200));
        assert_eq!(enterprise.recovery_time(), Duration::from_secs(50));
    }

    #[test]
    fn test_partial_yaml_keeps_standard_bucket() {
        let config: RateLimiterConfig = serde_yaml::from_str("requests_per_second: 5").unwrap();
        assert_eq!(config, RateLimiterConfig::new(5, 50));
    }

    #[test]
    fn test_zero_values_behave_as_one() {
        let config = RateLimiterConfig::new(0, 0);
        assert_eq!(config.refill_interval(), Duration::from_secs(1));
        assert_eq!(config.recovery_time(), Duration::from_secs(1));

        let budget = RequestBudget::new(&config);
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
    }

    #[test]
    fn test_full_bucket_then_rejection() {
        let budget = RequestBudget::default();
        for _ in 0..50 {
            assert!(budget.try_acquire());
        }
        assert!(!budget.try_acquire());
    }

    #[tokio::test]
    async fn test_drained_bucket_waits_for_one_refill() {
        let config = RateLimiterConfig::new(20, 3);
        let budget = RequestBudget::new(&config);
        for _ in 0..3 {
            budget.acquire().await;
        }

        let started = Instant::now();
        budget.acquire().await;
        assert!(started.elapsed() >= config.refill_interval() / 2);
    }
}
