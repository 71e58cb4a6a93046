use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use ratelimit_core::{ChallengeOptions, GenerateOptions, MatchStatus, RateLimitError};
use ratelimit_driver::provider::{CaptchaDriver, UnsupportedCaptchaDriver};
use ratelimit_driver::DriverRegistry;

use crate::challenge_engine;
use deadpool_redis::Pool;

/// Redis-backed verified-challenge limiter (§4.4): generate/match against a
/// per-kind [`CaptchaDriver`] looked up through a [`DriverRegistry`]. Modes
/// (one-time vs. bounded-retry) are selected once, at construction, by the
/// presence of `options.max_err_quota`.
pub struct RedisChallengeLimiter {
    pool: Pool,
    options: ChallengeOptions,
    drivers: DriverRegistry<dyn CaptchaDriver>,
}

impl RedisChallengeLimiter {
    #[must_use]
    pub fn new(pool: Pool, options: ChallengeOptions) -> Self {
        let sentinel: Arc<dyn CaptchaDriver> =
            Arc::new(UnsupportedCaptchaDriver::new("__unsupported_verified_captcha_kind__"));
        Self {
            pool,
            options: options.normalized(),
            drivers: DriverRegistry::new("verified_captcha", sentinel),
        }
    }

    /// Register a [`CaptchaDriver`] for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::DuplicateDriver`] if `kind` is already
    /// registered.
    pub fn register_driver(&self, kind: impl Into<String>, driver: Arc<dyn CaptchaDriver>) -> Result<(), RateLimitError> {
        self.drivers.register(kind, driver)
    }

    fn format_key(&self, kind: &str, id: &str) -> String {
        format!("{}{kind}:{id}", self.options.key_prefix)
    }

    /// Ask the driver bound to `kind` for a question/answer pair, store the
    /// answer, and return `(id, question)` to present to the user.
    ///
    /// `deadline` bounds only the store write; the driver call itself runs
    /// to completion regardless (§5 scopes the deadline to store
    /// round-trips, not to provider-plugin code).
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn generate(
        &self,
        kind: &str,
        overrides: GenerateOptions,
        deadline: Option<Duration>,
    ) -> Result<(String, String), RateLimitError> {
        let driver = self.drivers.acquire(kind);
        let qa = driver.generate_question_answer().await?;
        let key = self.format_key(kind, &qa.id);
        let expires = overrides.resolve_expires(&self.options);

        match overrides.resolve_max_err_quota(&self.options) {
            Some(quota) => challenge_engine::write_bounded(&self.pool, &key, &qa.answer, quota, expires, deadline).await?,
            None => challenge_engine::write_one_time(&self.pool, &key, &qa.answer, expires, deadline).await?,
        }

        Ok((qa.id, qa.question))
    }

    /// Verify `answer` against the entry for `(kind, id)`, consuming it on
    /// a terminal outcome.
    #[instrument(skip(self, answer), fields(kind = %kind, id = %id))]
    pub async fn verify(&self, kind: &str, id: &str, answer: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError> {
        let key = self.format_key(kind, id);
        let status = match self.options.max_err_quota {
            Some(_) => challenge_engine::verify_bounded(&self.pool, &key, answer, deadline).await?,
            None => challenge_engine::match_one_time(&self.pool, &key, answer, true, deadline).await?,
        };
        Ok(status.is_success())
    }

    /// One-time-mode-only: verify without necessarily clearing the key.
    ///
    /// In bounded-retry mode the entry is a Redis hash, not a plain string;
    /// calling this against one would surface a raw `WRONGTYPE` backend
    /// error, so the mode mismatch is rejected up front with
    /// [`RateLimitError::UnsupportedOperationMode`] instead.
    #[instrument(skip(self, answer), fields(kind = %kind, id = %id))]
    pub async fn match_answer(
        &self,
        kind: &str,
        id: &str,
        answer: &str,
        clear: bool,
        deadline: Option<Duration>,
    ) -> Result<bool, RateLimitError> {
        if self.options.max_err_quota.is_some() {
            return Err(RateLimitError::UnsupportedOperationMode {
                operation: "match_answer",
                required_mode: "one-time",
            });
        }
        let key = self.format_key(kind, id);
        let status: MatchStatus = challenge_engine::match_one_time(&self.pool, &key, answer, clear, deadline).await?;
        Ok(status.is_success())
    }

    pub async fn del(&self, kind: &str, id: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError> {
        challenge_engine::del(&self.pool, &self.format_key(kind, id), deadline).await
    }

    pub async fn ttl(&self, kind: &str, id: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError> {
        challenge_engine::ttl(&self.pool, &self.format_key(kind, id), deadline).await
    }
}


#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use async_trait::async_trait;

    use ratelimit_driver::provider::QuestionAnswer;

    use super::*;

    struct FixedCaptcha;

    #[async_trait]
    impl CaptchaDriver for FixedCaptcha {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate_question_answer(&self) -> Result<QuestionAnswer, RateLimitError> {
            Ok(QuestionAnswer {
                id: uuid::Uuid::new_v4().to_string(),
                question: "1+1".to_string(),
                answer: "2".to_string(),
            })
        }
    }

    fn test_limiter(max_err_quota: Option<i64>) -> RedisChallengeLimiter {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let pool = crate::pool::build_pool(&crate::config::RedisConfig {
            url,
            ..crate::config::RedisConfig::default()
        })
        .expect("pool should build");
        let limiter = RedisChallengeLimiter::new(
            pool,
            ChallengeOptions {
                key_prefix: format!("ratelimit-test-captcha-{}:", uuid::Uuid::new_v4()),
                max_err_quota,
                ..ChallengeOptions::default()
            },
        );
        limiter.register_driver("default", Arc::new(FixedCaptcha)).unwrap();
        limiter
    }

    /// Scenario F: `maxErrQuota = 3`; two wrong verifies, then a correct one
    /// succeeds, and a further attempt against the now-deleted key fails.
    #[tokio::test]
    async fn scenario_f_bounded_retry_budget() {
        let limiter = test_limiter(Some(3));
        let (id, question) = limiter.generate("default", GenerateOptions::default(), None).await.unwrap();
        assert_eq!(question, "1+1");

        assert!(!limiter.verify("default", &id, "3", None).await.unwrap());
        assert!(!limiter.verify("default", &id, "3", None).await.unwrap());
        assert!(limiter.verify("default", &id, "2", None).await.unwrap());
        assert!(!limiter.verify("default", &id, "2", None).await.unwrap());
    }

    /// Property 9: `q` wrong verifies exhaust the budget and delete the key.
    #[tokio::test]
    async fn bounded_retry_budget_exhaustion_deletes_key() {
        let limiter = test_limiter(Some(2));
        let (id, _) = limiter.generate("default", GenerateOptions::default(), None).await.unwrap();

        assert!(!limiter.verify("default", &id, "wrong", None).await.unwrap());
        assert!(!limiter.verify("default", &id, "wrong", None).await.unwrap());
        assert_eq!(limiter.ttl("default", &id, None).await.unwrap(), -2);
        // The key is gone; even the correct answer now fails.
        assert!(!limiter.verify("default", &id, "2", None).await.unwrap());
    }

    #[tokio::test]
    async fn one_time_mode_match_preserves_key_when_not_clearing() {
        let limiter = test_limiter(None);
        let (id, _) = limiter.generate("default", GenerateOptions::default(), None).await.unwrap();

        assert!(limiter.match_answer("default", &id, "2", false, None).await.unwrap());
        // Not cleared: a second speculative match still succeeds.
        assert!(limiter.match_answer("default", &id, "2", false, None).await.unwrap());
        // Verify is always destructive.
        assert!(limiter.verify("default", &id, "2", None).await.unwrap());
        assert!(!limiter.verify("default", &id, "2", None).await.unwrap());
    }

    #[tokio::test]
    async fn deadline_elapses_before_a_slow_del_call_completes() {
        let limiter = test_limiter(None);
        let result = limiter.del("default", "never-generated", Some(Duration::from_nanos(0))).await;
        assert!(matches!(result, Err(RateLimitError::Timeout(_))));
    }

    #[tokio::test]
    async fn match_answer_rejects_bounded_retry_mode() {
        let limiter = test_limiter(Some(3));
        let (id, _) = limiter.generate("default", GenerateOptions::default(), None).await.unwrap();
        let err = limiter.match_answer("default", &id, "2", false, None).await.unwrap_err();
        assert!(matches!(err, RateLimitError::UnsupportedOperationMode { .. }));
    }

    /// A per-call `max_err_quota` override raises a single entry's budget
    /// above the limiter's construction-time default.
    #[tokio::test]
    async fn generate_override_raises_quota_above_the_default() {
        let limiter = test_limiter(Some(3));
        let (id, _) = limiter
            .generate(
                "default",
                GenerateOptions {
                    max_err_quota: Some(6),
                    ..GenerateOptions::default()
                },
                None,
            )
            .await
            .unwrap();

        for _ in 0..6 {
            assert!(!limiter.verify("default", &id, "3", None).await.unwrap());
        }
        // The 6-error budget is now exhausted and the entry gone, even
        // though the limiter's default quota is only 3.
        assert!(!limiter.verify("default", &id, "2", None).await.unwrap());
    }
}
