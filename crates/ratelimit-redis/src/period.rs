use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::Script;
use tracing::{debug, instrument};

use ratelimit_core::time::{expire_seconds, local_tz_offset_secs, now_unix};
use ratelimit_core::{PeriodCallOptions, PeriodOptions, PeriodStatus, RateLimitError};
use ratelimit_driver::PeriodLimiterDriver;

use crate::pool::{get_conn, with_deadline};
use crate::scripts;

/// Redis-backed period limiter (§4.1). Unifies the two near-duplicate
/// period-limiter shapes found upstream behind one type: `kind` is always
/// accepted and an empty string is permitted, matching a kind-less call.
pub struct RedisPeriodLimiter {
    pool: Pool,
    options: PeriodOptions,
}

impl RedisPeriodLimiter {
    #[must_use]
    pub fn new(pool: Pool, options: PeriodOptions) -> Self {
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
    pub async fn take(&self, kind: &str, key: &str) -> Result<PeriodStatus, RateLimitError> {
        self.take_with(kind, key, &PeriodCallOptions::default(), None).await
    }

    pub async fn take_with(
        &self,
        kind: &str,
        key: &str,
        overrides: &PeriodCallOptions,
        deadline: Option<Duration>,
    ) -> Result<PeriodStatus, RateLimitError> {
        let (period_secs, quota) = overrides.resolve(&self.options);
        let window_secs = expire_seconds(period_secs, self.options.align, now_unix(), local_tz_offset_secs());
        let redis_key = self.format_key(kind, key);

        let code: i64 = with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            Script::new(scripts::PERIOD_TAKE)
                .key(&redis_key)
                .arg(window_secs)
                .arg(quota)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))
        })
        .await?;

        let status = PeriodStatus::try_from(code)?;
        debug!(?status, "period take");
        Ok(status)
    }

    #[instrument(skip(self), fields(kind = %kind, key = %key))]
    pub async fn set_quota_full(&self, kind: &str, key: &str, deadline: Option<Duration>) -> Result<(), RateLimitError> {
        let redis_key = self.format_key(kind, key);
        let window_secs = expire_seconds(
            self.options.period.as_secs().max(1) as i64,
            self.options.align,
            now_unix(),
            local_tz_offset_secs(),
        );
        with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            let _: i64 = Script::new(scripts::PERIOD_SET_QUOTA_FULL)
                .key(&redis_key)
                .arg(window_secs)
                .arg(self.options.quota)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(kind = %kind, key = %key))]
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

/// Binds a [`RedisPeriodLimiter`] to one `kind` so it can be hosted behind a
/// [`ratelimit_driver::DriverRegistry`], whose driver trait methods take
/// only `key`.
pub struct BoundPeriodLimiter {
    limiter: Arc<RedisPeriodLimiter>,
    kind: String,
}

impl BoundPeriodLimiter {
    #[must_use]
    pub fn new(limiter: Arc<RedisPeriodLimiter>, kind: impl Into<String>) -> Self {
        Self {
            limiter,
            kind: kind.into(),
        }
    }
}

#[async_trait]
impl PeriodLimiterDriver for BoundPeriodLimiter {
    async fn take(&self, key: &str, deadline: Option<Duration>) -> Result<PeriodStatus, RateLimitError> {
        self.limiter
            .take_with(&self.kind, key, &PeriodCallOptions::default(), deadline)
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
