use std::time::Duration;

use async_trait::async_trait;
use ratelimit_core::{PeriodFailureStatus, RateLimitError};

/// Operations a period-failure-limiter implementation must provide, bound
/// to one `kind` (empty permitted).
///
/// Every operation takes a caller-supplied `deadline`, as
/// [`crate::period::PeriodLimiterDriver`] does.
#[async_trait]
pub trait PeriodFailureLimiterDriver: Send + Sync {
    async fn check(
        &self,
        key: &str,
        success: bool,
        deadline: Option<Duration>,
    ) -> Result<PeriodFailureStatus, RateLimitError>;

    /// Convenience wrapper: `err.is_none()` reports a success, `Some(_)`
    /// reports a failure (§4.2's `CheckErr`). Takes a trait object
    /// rather than a generic parameter so the trait stays object-safe.
    async fn check_err(
        &self,
        key: &str,
        err: Option<&(dyn std::error::Error + Send + Sync)>,
        deadline: Option<Duration>,
    ) -> Result<PeriodFailureStatus, RateLimitError> {
        self.check(key, err.is_none(), deadline).await
    }

    async fn set_quota_full(&self, key: &str, deadline: Option<Duration>) -> Result<(), RateLimitError>;
    async fn del(&self, key: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError>;
    async fn ttl(&self, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError>;
    async fn get_int(&self, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError>;
}

pub struct UnsupportedPeriodFailureLimiterDriver {
    kind: String,
}

impl UnsupportedPeriodFailureLimiterDriver {
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
impl PeriodFailureLimiterDriver for UnsupportedPeriodFailureLimiterDriver {
    async fn check(&self, _key: &str, _success: bool, _deadline: Option<Duration>) -> Result<PeriodFailureStatus, RateLimitError> {
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
