use std::time::Duration;

use async_trait::async_trait;
use ratelimit_core::{PeriodStatus, RateLimitError};

/// Operations a period-limiter implementation must provide, bound to one
/// `kind` (an empty kind is permitted — see the toolkit's unification of
/// the kind-less and kind-bearing variants).
///
/// Every operation takes a caller-supplied `deadline`: `None` runs the
/// underlying store call to completion, `Some(d)` bounds it (§5).
#[async_trait]
pub trait PeriodLimiterDriver: Send + Sync {
    async fn take(&self, key: &str, deadline: Option<Duration>) -> Result<PeriodStatus, RateLimitError>;

    /// Forces the counter to quota, creating it (with TTL) if absent.
    async fn set_quota_full(&self, key: &str, deadline: Option<Duration>) -> Result<(), RateLimitError>;

    /// Returns `true` if the key existed.
    async fn del(&self, key: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError>;

    /// Store TTL semantics: `-2` absent, `-1` no TTL set.
    async fn ttl(&self, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError>;

    async fn get_int(&self, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError>;
}

/// A driver whose every operation fails with [`RateLimitError::UnsupportedDriver`].
///
/// Returned by a [`crate::registry::DriverRegistry`] for an unregistered
/// kind, so callers never observe a null handle.
pub struct UnsupportedPeriodLimiterDriver {
    kind: String,
}

impl UnsupportedPeriodLimiterDriver {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    fn err(&self) -> RateLimitError {
        RateLimitError::UnsupportedDriver {
            kind: self.kind.clone(),
        }
    }
}

#[async_trait]
impl PeriodLimiterDriver for UnsupportedPeriodLimiterDriver {
    async fn take(&self, _key: &str, _deadline: Option<Duration>) -> Result<PeriodStatus, RateLimitError> {
        Err(self.err())
    }

    async fn set_quota_full(&self, _key: &str, _deadline: Option<Duration>) -> Result<(), RateLimitError> {
        Err(self.err())
    }

    async fn del(&self, _key: &str, _deadline: Option<Duration>) -> Result<bool, RateLimitError> {
        Err(self.err())
    }

    async fn ttl(&self, _key: &str, _deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        Err(self.err())
    }

    async fn get_int(&self, _key: &str, _deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        Err(self.err())
    }
}
