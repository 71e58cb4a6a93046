use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use ratelimit_core::{ChallengeOptions, GenerateOptions, RateLimitError};
use ratelimit_driver::provider::{RefluxProvider, UnsupportedRefluxProvider};
use ratelimit_driver::DriverRegistry;

use crate::challenge_engine;
use deadpool_redis::Pool;

/// Redis-backed reflux limiter (§4.4, reflux variant): structurally
/// identical to [`crate::challenge::RedisChallengeLimiter`], but the stored
/// "answer" is a server-generated opaque id rather than a human-solvable
/// question's answer, and the key is `<prefix><kind>:<key>` where `key` is
/// a caller-chosen correlation token — not a driver-generated id. Supports
/// double-submit patterns: the caller hands back the id it was given at
/// generation time.
pub struct RedisRefluxLimiter {
    pool: Pool,
    options: ChallengeOptions,
    drivers: DriverRegistry<dyn RefluxProvider>,
}

impl RedisRefluxLimiter {
    #[must_use]
    pub fn new(pool: Pool, options: ChallengeOptions) -> Self {
        let sentinel: Arc<dyn RefluxProvider> =
            Arc::new(UnsupportedRefluxProvider::new("__unsupported_verified_reflux_kind__"));
        Self {
            pool,
            options: options.normalized(),
            drivers: DriverRegistry::new("verified_reflux", sentinel),
        }
    }

    /// Register a [`RefluxProvider`] for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::DuplicateDriver`] if `kind` is already
    /// registered.
    pub fn register_driver(&self, kind: impl Into<String>, driver: Arc<dyn RefluxProvider>) -> Result<(), RateLimitError> {
        self.drivers.register(kind, driver)
    }

    fn format_key(&self, kind: &str, key: &str) -> String {
        format!("{}{kind}:{key}", self.options.key_prefix)
    }

    /// Ask the driver bound to `kind` for a unique id, store it as the
    /// entry's answer under the caller's correlation `key`, and return the
    /// id for the caller to hand back at verify time (double-submit).
    #[instrument(skip(self), fields(kind = %kind, key = %key))]
    pub async fn generate(
        &self,
        kind: &str,
        key: &str,
        overrides: GenerateOptions,
        deadline: Option<Duration>,
    ) -> Result<String, RateLimitError> {
        let driver = self.drivers.acquire(kind);
        let id = driver.generate_unique_id().await?;
        let redis_key = self.format_key(kind, key);
        let expires = overrides.resolve_expires(&self.options);

        match overrides.resolve_max_err_quota(&self.options) {
            Some(quota) => challenge_engine::write_bounded(&self.pool, &redis_key, &id, quota, expires, deadline).await?,
            None => challenge_engine::write_one_time(&self.pool, &redis_key, &id, expires, deadline).await?,
        }

        Ok(id)
    }

    /// Verify `id` against the entry for `(kind, key)`, consuming it on a
    /// terminal outcome.
    #[instrument(skip(self, id), fields(kind = %kind, key = %key))]
    pub async fn verify(&self, kind: &str, key: &str, id: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError> {
        let redis_key = self.format_key(kind, key);
        let status = match self.options.max_err_quota {
            Some(_) => challenge_engine::verify_bounded(&self.pool, &redis_key, id, deadline).await?,
            None => challenge_engine::match_one_time(&self.pool, &redis_key, id, true, deadline).await?,
        };
        Ok(status.is_success())
    }

    pub async fn del(&self, kind: &str, key: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError> {
        challenge_engine::del(&self.pool, &self.format_key(kind, key), deadline).await
    }

    pub async fn ttl(&self, kind: &str, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        challenge_engine::ttl(&self.pool, &self.format_key(kind, key), deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_err_quota: Option<i64>) -> RedisRefluxLimiter {
        RedisRefluxLimiter::new(
            deadpool_redis::Config::from_url("redis://127.0.0.1:1")
                .builder()
                .expect("valid config")
                .build()
                .expect("pool builds without connecting"),
            ChallengeOptions {
                key_prefix: "limit:verified:reflux:".to_string(),
                max_err_quota,
                ..ChallengeOptions::default()
            },
        )
    }

    #[test]
    fn key_uses_caller_correlation_token() {
        let limiter = limiter(None);
        assert_eq!(limiter.format_key("double-submit", "csrf-abc"), "limit:verified:reflux:double-submit:csrf-abc");
    }

    #[tokio::test]
    async fn unregistered_kind_fails_generate() {
        let limiter = limiter(Some(3));
        let err = limiter
            .generate("missing", "token", GenerateOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RateLimitError::UnsupportedDriver { .. }));
    }
}
