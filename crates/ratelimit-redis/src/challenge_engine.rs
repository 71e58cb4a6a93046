//! Shared one-time / bounded-retry entry logic (§4.4), reused by the
//! captcha-backed [`crate::challenge::RedisChallengeLimiter`] and the
//! id-correlation [`crate::reflux::RedisRefluxLimiter`] — both reduce to
//! "store an answer, verify it atomically, clear on a terminal outcome."

use std::time::Duration;

use deadpool_redis::Pool;
use redis::Script;

use ratelimit_core::MatchStatus;
use ratelimit_core::RateLimitError;

use crate::pool::{get_conn, with_deadline};
use crate::scripts;

/// Write a one-time answer (plain string, TTL only).
pub async fn write_one_time(
    pool: &Pool,
    key: &str,
    answer: &str,
    expires_secs: i64,
    deadline: Option<Duration>,
) -> Result<(), RateLimitError> {
    with_deadline(deadline, async {
        let mut conn = get_conn(pool).await?;
        redis::cmd("SET")
            .arg(key)
            .arg(answer)
            .arg("EX")
            .arg(expires_secs.max(1))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))
    })
    .await
}

/// Write a bounded-retry entry (`{answer, quota, err:=0}`, TTL) atomically,
/// so a concurrent verify never observes the hash half-written.
pub async fn write_bounded(
    pool: &Pool,
    key: &str,
    answer: &str,
    quota: i64,
    expires_secs: i64,
    deadline: Option<Duration>,
) -> Result<(), RateLimitError> {
    with_deadline(deadline, async {
        let mut conn = get_conn(pool).await?;
        let _: i64 = Script::new(scripts::CHALLENGE_WRITE_BOUNDED)
            .key(key)
            .arg(answer)
            .arg(quota)
            .arg(expires_secs.max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;
        Ok(())
    })
    .await
}

/// One-time match: reads-and-optionally-deletes. `clear = false` supports
/// speculative checking (`Match`); `clear = true` is `Verify`.
pub async fn match_one_time(
    pool: &Pool,
    key: &str,
    answer: &str,
    clear: bool,
    deadline: Option<Duration>,
) -> Result<MatchStatus, RateLimitError> {
    let code: i64 = with_deadline(deadline, async {
        let mut conn = get_conn(pool).await?;
        Script::new(scripts::CHALLENGE_MATCH_ONE_TIME)
            .key(key)
            .arg(answer)
            .arg(i64::from(clear))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))
    })
    .await?;
    MatchStatus::try_from(code)
}

/// Bounded-retry verify: always destructive on a terminal outcome.
pub async fn verify_bounded(pool: &Pool, key: &str, answer: &str, deadline: Option<Duration>) -> Result<MatchStatus, RateLimitError> {
    let code: i64 = with_deadline(deadline, async {
        let mut conn = get_conn(pool).await?;
        Script::new(scripts::CHALLENGE_VERIFY_BOUNDED_RETRY)
            .key(key)
            .arg(answer)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))
    })
    .await?;
    MatchStatus::try_from(code)
}

pub async fn del(pool: &Pool, key: &str, deadline: Option<Duration>) -> Result<bool, RateLimitError> {
    with_deadline(deadline, async {
        let mut conn = get_conn(pool).await?;
        let deleted: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))?;
        Ok(deleted > 0)
    })
    .await
}

pub async fn ttl(pool: &Pool, key: &str, deadline: Option<Duration>) -> Result<i64, RateLimitError> {
    with_deadline(deadline, async {
        let mut conn = get_conn(pool).await?;
        redis::cmd("TTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| RateLimitError::Backend(e.to_string()))
    })
    .await
}
