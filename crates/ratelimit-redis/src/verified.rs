use std::time::Duration;

use deadpool_redis::Pool;
use redis::Script;
use tracing::{debug, instrument, warn};

use ratelimit_core::time::now_unix;
use ratelimit_core::{RateLimitError, SendCodeParams, SendStatus, VerifiedCodeOptions, VerifyStatus};
use ratelimit_driver::provider::{CodeProvider, SendCodeRequest};

use crate::pool::{get_conn, with_deadline};
use crate::scripts;

/// Redis-backed verified-code limiter (§4.3): coordinates the per-target
/// global send bucket (§3.3) and the per-(target,kind) code entry (§3.4).
pub struct RedisVerifiedCodeLimiter {
    pool: Pool,
    options: VerifiedCodeOptions,
}

impl RedisVerifiedCodeLimiter {
    #[must_use]
    pub fn new(pool: Pool, options: VerifiedCodeOptions) -> Self {
        Self {
            pool,
            options: options.normalized(),
        }
    }

    fn global_key(&self, target: &str) -> String {
        format!("{}{target}", self.options.key_prefix)
    }

    fn entry_key(&self, target: &str, kind: &str) -> String {
        format!("{}{target}:_entry_:{{{kind}}}", self.options.key_prefix)
    }

    /// Runs the send script only — does not invoke any provider. Prefer
    /// [`RedisVerifiedCodeLimiter::send_code`] unless the caller is
    /// implementing its own compensation policy.
    #[instrument(skip(self, code), fields(target = %target, kind = %kind))]
    pub async fn send_code_script(
        &self,
        target: &str,
        kind: &str,
        code: &str,
        params: &SendCodeParams,
    ) -> Result<(SendStatus, i64), RateLimitError> {
        self.send_code_script_with_deadline(target, kind, code, params, None).await
    }

    pub async fn send_code_script_with_deadline(
        &self,
        target: &str,
        kind: &str,
        code: &str,
        params: &SendCodeParams,
        deadline: Option<Duration>,
    ) -> Result<(SendStatus, i64), RateLimitError> {
        let resolved = params.resolve(&self.options);
        let now = now_unix();
        let global_key = self.global_key(target);
        let entry_key = self.entry_key(target, kind);

        let status_code: i64 = with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            Script::new(scripts::VERIFIED_SEND_CODE)
                .key(&global_key)
                .key(&entry_key)
                .arg(resolved.max_send_per_day)
                .arg(resolved.code_max_send_per_day)
                .arg(resolved.global_expires_second)
                .arg(code)
                .arg(resolved.code_max_error_quota)
                .arg(now)
                .arg(resolved.code_resend_interval_second)
                .arg(resolved.code_avail_window_second)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))
        })
        .await?;

        let status = SendStatus::try_from(status_code)?;
        debug!(?status, "verified send_code");
        Ok((status, now))
    }

    /// Send a code and, on script success, hand it to `provider` for
    /// delivery. If delivery fails, runs the compensating rollback
    /// (§4.3.1) and returns the provider's error — the rollback's own
    /// errors are swallowed, since a failed compensation only leaves a
    /// slightly inflated counter and a stale entry that expires naturally.
    pub async fn send_code(
        &self,
        target: &str,
        kind: &str,
        code: &str,
        params: &SendCodeParams,
        provider: &dyn CodeProvider,
    ) -> Result<(), RateLimitError> {
        let (status, lasted) = self.send_code_script(target, kind, code, params).await?;
        if let Some(err) = status.into_error() {
            return Err(err);
        }

        let request = SendCodeRequest { target, kind, code };
        if let Err(err) = provider.send_code(&request).await {
            if let Err(rollback_err) = self.rollback(target, kind, code, lasted, None).await {
                warn!(error = %rollback_err, "compensating rollback failed after delivery failure");
            }
            return Err(err);
        }
        Ok(())
    }

    #[instrument(skip(self, code), fields(target = %target, kind = %kind))]
    async fn rollback(
        &self,
        target: &str,
        kind: &str,
        code: &str,
        lasted: i64,
        deadline: Option<Duration>,
    ) -> Result<(), RateLimitError> {
        let global_key = self.global_key(target);
        let entry_key = self.entry_key(target, kind);
        with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            let _: i64 = Script::new(scripts::VERIFIED_ROLLBACK)
                .key(&global_key)
                .key(&entry_key)
                .arg(code)
                .arg(lasted)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))?;
            Ok(())
        })
        .await?;
        warn!("ran compensating rollback");
        Ok(())
    }

    #[instrument(skip(self, code), fields(target = %target, kind = %kind))]
    pub async fn verify_code(
        &self,
        target: &str,
        kind: &str,
        code: &str,
    ) -> Result<VerifyStatus, RateLimitError> {
        self.verify_code_with_deadline(target, kind, code, None).await
    }

    pub async fn verify_code_with_deadline(
        &self,
        target: &str,
        kind: &str,
        code: &str,
        deadline: Option<Duration>,
    ) -> Result<VerifyStatus, RateLimitError> {
        let entry_key = self.entry_key(target, kind);
        let status_code: i64 = with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            Script::new(scripts::VERIFIED_VERIFY_CODE)
                .key(&entry_key)
                .arg(code)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))
        })
        .await?;
        let status = VerifyStatus::try_from(status_code)?;
        debug!(?status, "verified verify_code");
        Ok(status)
    }

    /// Charges a send-attempt against the global bucket without writing a
    /// code entry (e.g. a pre-provider reservation).
    #[instrument(skip(self), fields(target = %target))]
    pub async fn incr(&self, target: &str, deadline: Option<Duration>) -> Result<SendStatus, RateLimitError> {
        let global_key = self.global_key(target);
        let status_code: i64 = with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            Script::new(scripts::VERIFIED_INCR)
                .key(&global_key)
                .arg(self.options.max_send_per_day)
                .arg(self.options.key_expires.as_secs().max(1))
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))
        })
        .await?;
        // Only Success/MaxSendPerDay are reachable here; ResendTooFrequently
        // never occurs on the bare-counter path.
        SendStatus::try_from(status_code)
    }

    #[instrument(skip(self), fields(target = %target))]
    pub async fn decr(&self, target: &str, deadline: Option<Duration>) -> Result<(), RateLimitError> {
        let global_key = self.global_key(target);
        with_deadline(deadline, async {
            let mut conn = get_conn(&self.pool).await?;
            let _: i64 = Script::new(scripts::VERIFIED_DECR)
                .key(&global_key)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| RateLimitError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
    }
}


#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn test_limiter(options: VerifiedCodeOptions) -> Arc<RedisVerifiedCodeLimiter> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let pool = crate::pool::build_pool(&crate::config::RedisConfig {
            url,
            ..crate::config::RedisConfig::default()
        })
        .expect("pool should build");
        Arc::new(RedisVerifiedCodeLimiter::new(
            pool,
            VerifiedCodeOptions {
                key_prefix: format!("ratelimit-test-verified-{}:", uuid::Uuid::new_v4()),
                ..options
            },
        ))
    }

    /// Scenario D: `maxSendPerDay = 1`; a second send after the cooldown
    /// has elapsed still hits the daily cap.
    #[tokio::test]
    async fn scenario_d_max_send_per_day_outlasts_the_cooldown() {
        let limiter = test_limiter(VerifiedCodeOptions {
            max_send_per_day: 1,
            code_resend_interval_second: 1,
            ..VerifiedCodeOptions::default()
        });
        let (status, _) = limiter
            .send_code_script("T", "login", "123456", &SendCodeParams::default())
            .await
            .unwrap();
        assert_eq!(status, SendStatus::Success);

        tokio::time::sleep(Duration::from_millis(1_010)).await;
        let (status, _) = limiter
            .send_code_script("T", "login", "654321", &SendCodeParams::default())
            .await
            .unwrap();
        assert_eq!(status, SendStatus::MaxSendPerDay);
    }

    /// Property 6: within the cooldown window a second send is rejected and
    /// the global counter is left unchanged.
    #[tokio::test]
    async fn resend_within_cooldown_is_rejected_and_counter_unchanged() {
        let limiter = test_limiter(VerifiedCodeOptions {
            max_send_per_day: 10,
            code_resend_interval_second: 60,
            ..VerifiedCodeOptions::default()
        });
        limiter
            .send_code_script("T", "login", "123456", &SendCodeParams::default())
            .await
            .unwrap();
        let (status, _) = limiter
            .send_code_script("T", "login", "654321", &SendCodeParams::default())
            .await
            .unwrap();
        assert_eq!(status, SendStatus::ResendTooFrequently);
    }

    /// Scenario E: `codeMaxErrorQuota = 3`; three wrong verifies, then the
    /// budget is exhausted without consulting the stored code.
    #[tokio::test]
    async fn scenario_e_verify_budget_exhausts_before_consulting_code() {
        let limiter = test_limiter(VerifiedCodeOptions {
            code_max_error_quota: 3,
            ..VerifiedCodeOptions::default()
        });
        limiter
            .send_code_script("T", "login", "123456", &SendCodeParams::default())
            .await
            .unwrap();

        for _ in 0..3 {
            assert_eq!(
                limiter.verify_code("T", "login", "000000").await.unwrap(),
                VerifyStatus::VerificationFailure
            );
        }
        assert_eq!(
            limiter.verify_code("T", "login", "000000").await.unwrap(),
            VerifyStatus::ReachMaxError
        );
        // Even the correct code is rejected once the budget is exhausted.
        assert_eq!(
            limiter.verify_code("T", "login", "123456").await.unwrap(),
            VerifyStatus::ReachMaxError
        );
    }

    /// Property 8: a correct verify consumes the entry one-shot.
    #[tokio::test]
    async fn verify_consumes_entry_on_success() {
        let limiter = test_limiter(VerifiedCodeOptions::default());
        limiter
            .send_code_script("T", "login", "123456", &SendCodeParams::default())
            .await
            .unwrap();
        assert_eq!(
            limiter.verify_code("T", "login", "123456").await.unwrap(),
            VerifyStatus::Success
        );
        assert_eq!(
            limiter.verify_code("T", "login", "123456").await.unwrap(),
            VerifyStatus::RequiredOrExpired
        );
    }

    /// Property 5: with `maxSendPerDay = 1`, `W` concurrent sends to the
    /// same target yield exactly one success.
    #[tokio::test]
    async fn concurrent_sends_cap_at_one_success() {
        let limiter = test_limiter(VerifiedCodeOptions {
            max_send_per_day: 1,
            ..VerifiedCodeOptions::default()
        });

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            tasks.push(tokio::spawn(async move {
                limiter
                    .send_code_script("concurrent-target", "login", "code", &SendCodeParams::default())
                    .await
                    .unwrap()
                    .0
            }));
        }

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap() == SendStatus::Success {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn rollback_is_guarded_by_code_and_lasted_match() {
        let limiter = test_limiter(VerifiedCodeOptions {
            code_resend_interval_second: 0,
            ..VerifiedCodeOptions::default()
        });
        let (status, lasted) = limiter
            .send_code_script("T", "login", "123456", &SendCodeParams::default())
            .await
            .unwrap();
        assert_eq!(status, SendStatus::Success);

        // A concurrent re-issue overwrites the entry before the (delayed)
        // rollback for the first send runs; the rollback must not clobber
        // the newer entry because its `code` no longer matches.
        let (status, _) = limiter
            .send_code_script("T", "login", "999999", &SendCodeParams::default())
            .await
            .unwrap();
        assert_eq!(status, SendStatus::Success);

        limiter.rollback("T", "login", "123456", lasted, None).await.unwrap();
        assert_eq!(
            limiter.verify_code("T", "login", "999999").await.unwrap(),
            VerifyStatus::Success
        );
    }

    #[tokio::test]
    async fn incr_charges_the_global_bucket_without_an_entry() {
        let limiter = test_limiter(VerifiedCodeOptions {
            max_send_per_day: 2,
            ..VerifiedCodeOptions::default()
        });
        assert_eq!(limiter.incr("T", None).await.unwrap(), SendStatus::Success);
        assert_eq!(limiter.incr("T", None).await.unwrap(), SendStatus::Success);
        assert_eq!(limiter.incr("T", None).await.unwrap(), SendStatus::MaxSendPerDay);

        // No code entry was ever written, so a verify against any kind sees
        // nothing to consume.
        assert_eq!(
            limiter.verify_code("T", "login", "000000").await.unwrap(),
            VerifyStatus::RequiredOrExpired
        );
    }

    #[tokio::test]
    async fn decr_undoes_an_incr_and_is_guarded_against_going_negative() {
        let limiter = test_limiter(VerifiedCodeOptions {
            max_send_per_day: 1,
            ..VerifiedCodeOptions::default()
        });
        assert_eq!(limiter.incr("T", None).await.unwrap(), SendStatus::Success);
        assert_eq!(limiter.incr("T", None).await.unwrap(), SendStatus::MaxSendPerDay);

        limiter.decr("T", None).await.unwrap();
        assert_eq!(limiter.incr("T", None).await.unwrap(), SendStatus::Success);

        // Decrementing an already-absent counter must not drive it negative.
        let fresh_target = "never-incremented";
        limiter.decr(fresh_target, None).await.unwrap();
        limiter.decr(fresh_target, None).await.unwrap();
        assert_eq!(limiter.incr(fresh_target, None).await.unwrap(), SendStatus::Success);
    }

    #[tokio::test]
    async fn deadline_elapses_before_a_slow_verify_code_call_completes() {
        let limiter = test_limiter(VerifiedCodeOptions::default());
        let result = limiter
            .verify_code_with_deadline("T", "login", "123456", Some(Duration::from_nanos(0)))
            .await;
        assert!(matches!(result, Err(RateLimitError::Timeout(_))));
    }
}
