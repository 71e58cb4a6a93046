use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::Script;
use tracing::{debug, instrument};

use ratelimit_core::{PeriodFailureCallOptions, PeriodFailureOptions, PeriodFailureStatus, RateLimitError};
use ratelimit_driver::PeriodFailureLimiterDriver;

use crate::pool::{get_conn, with_deadline};
use crate::scripts;

/// Redis-backed period-failure limiter (§4.2): a success report clears the
/// window only while strictly under quota ("success-clears"); once the cap
/// is reached, a later success no longer un-locks it.
pub struct RedisPeriodFailureLimiter {
    pool: Pool,
    options: PeriodFailureOptions,
}

impl RedisPeriodFailureLimiter {
    #[must_use]
    pub fn new(pool: Pool, options: PeriodFailureOptions) -> Self {
        Self {
            pool,
            options: options.normalized(),
        }
    }

    fn format_key(&self, kind: &str, key: &str) -> String {
        if kind.is_empty() {
            format!("{}{key}", self.options.key_prefix)
        } else {
            format!("{}{kind}:{key}", self.options.key_prefix)
        }
    }

    #[instrument(skip(self), fields(kind = %kind, key = %key))]
    pub async fn check(
        &self,
        kind: &str,
        key: &str,
        success: bool,
    ) -> Result<PeriodFailureStatus, RateLimitError> {
        self.check_with(kind, key, success, &PeriodFailureCallOptions::default(), None)
            .await
    }

    /// Convenience wrapper mirroring §4.2's `CheckErr`: `err.is_none()`
    /// reports a success, `Some(_)` reports a failure.
    pub async fn check_err(
        &self,
        kind: &str,
        key: &str,
        err: Option<&(dyn std::error::Error + Send + Sync)>,
    ) -> Result<PeriodFailureStatus, RateLimitError> {
        self.check(kind, key, err.is_none()).await
    }

    pub async fn check_with(
        &self,
        kind: &str,
        key: &str,
        success: bool,
        overrides: &PeriodFailureCallOptions,
        deadline: Option<Duration>,
    ) -> Result<PeriodFailureStatus, RateLimitError> {
        let (period_secs, quota) = overrides.resolve(&self.options);
        let redis_key = self.format_key(kind, key);

        let code: i64 = with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            Script::new(scripts::PERIOD_FAILURE_CHECK)
                .key(&redis_key)
                .arg(i64::from(success))
                .arg(quota)
                .arg(period_secs)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))
        })
        .await?;

        let status = PeriodFailureStatus::try_from(code)?;
        debug!(?status, "period-failure check");
        Ok(status)
    }

    #[instrument(skip(self), fields(kind = %kind, key = %key))]
    pub async fn set_quota_full(&self, kind: &str, key: &str, deadline: Option<Duration>) -> Result<(), RateLimitError> {
        let redis_key = self.format_key(kind, key);
        with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            let _: i64 = Script::new(scripts::PERIOD_FAILURE_SET_QUOTA_FULL)
                .key(&redis_key)
                .arg(self.options.period.as_secs().max(1))
                .arg(self.options.quota)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn del(&self, kind: &str, key: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError> {
        let redis_key = self.format_key(kind, key);
        with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            let deleted: i64 = redis::cmd("DEL")
                .arg(&redis_key)
                .query_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))?;
            Ok(deleted > 0)
        })
        .await
    }

    pub async fn ttl(&self, kind: &str, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        let redis_key = self.format_key(kind, key);
        with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            let ttl: i64 = redis::cmd("TTL")
                .arg(&redis_key)
                .query_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))?;
            Ok(ttl)
        })
        .await
    }

    pub async fn get_int(&self, kind: &str, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        let redis_key = self.format_key(kind, key);
        with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            let value: Option<i64> = redis::cmd("GET")
                .arg(&redis_key)
                .query_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))?;
            Ok(value.unwrap_or(0))
        })
        .await
    }
}

/// Binds a [`RedisPeriodFailureLimiter`] to one `kind` for registry hosting.
pub struct BoundPeriodFailureLimiter {
    limiter: Arc<RedisPeriodFailureLimiter>,
    kind: String,
}

impl BoundPeriodFailureLimiter {
    #[must_use]
    pub fn new(limiter: Arc<RedisPeriodFailureLimiter>, kind: impl Into<String>) -> Self {
        Self {
            limiter,
            kind: kind.into(),
        }
    }
}

#[async_trait]
impl PeriodFailureLimiterDriver for BoundPeriodFailureLimiter {
    async fn check(&self, key: &str, success: bool, deadline: Option<Duration>) -> Result<PeriodFailureStatus, RateLimitError> {
        self.limiter
            .check_with(&self.kind, key, success, &PeriodFailureCallOptions::default(), deadline)
            .await
    }

    async fn set_quota_full(&self, key: &str, deadline: Option<Duration>) -> Result<(), RateLimitError> {
        self.limiter.set_quota_full(&self.kind, key, deadline).await
    }

    async fn del(&self, key: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError> {
        self.limiter.del(&self.kind, key, deadline).await
    }

    async fn ttl(&self, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        self.limiter.ttl(&self.kind, key, deadline).await
    }

    async fn get_int(&self, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        self.limiter.get_int(&self.kind, key, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format_matches_spec_shape() {
        let limiter = RedisPeriodFailureLimiter {
            pool: deadpool_redis::Config::from_url("redis://127.0.0.1:1")
                .builder()
                .expect("valid config")
                .build()
                .expect("pool builds without connecting"),
            options: PeriodFailureOptions::default().normalized(),
        };
        assert_eq!(limiter.format_key("login", "u"), "LIMIT:PERIOD:FAILURE:login:u");
        assert_eq!(limiter.format_key("", "u"), "LIMIT:PERIOD:FAILURE:u");
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_limiter(quota: i64, period: Duration) -> RedisPeriodFailureLimiter {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let pool = crate::pool::build_pool(&crate::config::RedisConfig {
            url,
            ..crate::config::RedisConfig::default()
        })
        .expect("pool should build");
        RedisPeriodFailureLimiter::new(
            pool,
            PeriodFailureOptions {
                key_prefix: format!("ratelimit-test-period-failure-{}:", uuid::Uuid::new_v4()),
                period,
                quota,
            },
        )
    }

    /// Scenario B: two failures then a success clears the window.
    #[tokio::test]
    async fn scenario_b_failure_recovery() {
        let limiter = test_limiter(3, Duration::from_secs(60));
        limiter.check("", "u", false).await.unwrap();
        limiter.check("", "u", false).await.unwrap();
        assert_eq!(limiter.check("", "u", true).await.unwrap(), PeriodFailureStatus::Success);
        assert_eq!(limiter.get_int("", "u", None).await.unwrap(), 0);
    }

    /// Scenario C: four failures (one past quota), then success cannot clear.
    #[tokio::test]
    async fn scenario_c_failure_sticky_over_quota() {
        let limiter = test_limiter(3, Duration::from_secs(60));
        assert_eq!(limiter.check("", "u", false).await.unwrap(), PeriodFailureStatus::InQuota);
        assert_eq!(limiter.check("", "u", false).await.unwrap(), PeriodFailureStatus::InQuota);
        assert_eq!(limiter.check("", "u", false).await.unwrap(), PeriodFailureStatus::InQuota);
        assert_eq!(limiter.check("", "u", false).await.unwrap(), PeriodFailureStatus::OverQuota);
        assert_eq!(limiter.check("", "u", true).await.unwrap(), PeriodFailureStatus::OverQuota);
        assert_eq!(limiter.get_int("", "u", None).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn success_on_absent_key_is_a_no_op_success() {
        let limiter = test_limiter(3, Duration::from_secs(60));
        assert_eq!(limiter.check("", "never-failed", true).await.unwrap(), PeriodFailureStatus::Success);
    }

    #[tokio::test]
    async fn set_quota_full_seeds_with_ttl() {
        let limiter = test_limiter(3, Duration::from_secs(30));
        limiter.set_quota_full("", "u", None).await.unwrap();
        assert_eq!(limiter.get_int("", "u", None).await.unwrap(), 3);
        assert!(limiter.ttl("", "u", None).await.unwrap() > 0);
    }

    #[tokio::test]
    async fn check_err_maps_none_to_success_and_some_to_failure() {
        let limiter = test_limiter(3, Duration::from_secs(60));
        let io_err = std::io::Error::other("bad password");
        assert_eq!(
            limiter.check_err("", "u", Some(&io_err)).await.unwrap(),
            PeriodFailureStatus::InQuota
        );
        assert_eq!(
            limiter.check_err("", "u", None).await.unwrap(),
            PeriodFailureStatus::Success
        );
        assert_eq!(limiter.get_int("", "u", None).await.unwrap(), 0);
    }
}
