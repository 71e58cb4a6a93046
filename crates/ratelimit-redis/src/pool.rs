use std::future::Future;
use std::time::Duration;

use deadpool_redis::{Config, Pool, Runtime};
use ratelimit_core::RateLimitError;

use crate::config::RedisConfig;

/// Build a `deadpool-redis` pool from a [`RedisConfig`].
///
/// # Errors
///
/// Returns [`RateLimitError::Connection`] if the pool cannot be built.
pub fn build_pool(config: &RedisConfig) -> Result<Pool, RateLimitError> {
    let cfg = Config::from_url(config.effective_url());
    cfg.builder()
        .map(|b| {
            b.max_size(config.pool_size)
                .wait_timeout(Some(config.connection_timeout))
                .runtime(Runtime::Tokio1)
                .build()
        })
        .map_err(|e| RateLimitError::Connection(e.to_string()))?
        .map_err(|e| RateLimitError::Connection(e.to_string()))
}

/// Obtain a connection from the pool, mapping pool errors uniformly.
///
/// # Errors
///
/// Returns [`RateLimitError::Connection`] if the pool is exhausted or the
/// connection cannot be established.
pub async fn get_conn(pool: &Pool) -> Result<deadpool_redis::Connection, RateLimitError> {
    pool.get()
        .await
        .map_err(|e| RateLimitError::Connection(e.to_string()))
}

/// Bound `fut` by `deadline`, if the caller supplied one.
///
/// Every suspension point in this crate (a pool checkout or a script/command
/// round-trip) is bounded per call rather than threaded as a single
/// end-to-end timeout (§5). Cancellation never compensates in-flight writes:
/// a script either completed (the store applied it) or the future was
/// dropped before the response arrived, in which case the caller cannot tell
/// which happened and must treat the call as a candidate for retry.
pub async fn with_deadline<F, T>(deadline: Option<Duration>, fut: F) -> Result<T, RateLimitError>
where
    F: Future<Output = Result<T, RateLimitError>>,
{
    match deadline {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| RateLimitError::Timeout(d))?,
        None => fut.await,
    }
}
