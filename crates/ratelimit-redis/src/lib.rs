//! Redis-backed implementations of the distributed rate-limiting and
//! verification-code toolkit's four primitives.
//!
//! - [`period::RedisPeriodLimiter`] — fixed-window request counting.
//! - [`period_failure::RedisPeriodFailureLimiter`] — fixed-window failure
//!   counting with success-clears-under-quota.
//! - [`verified::RedisVerifiedCodeLimiter`] — send/verify state machine
//!   with daily caps, resend cooldown, and rollback-on-delivery-failure.
//! - [`challenge::RedisChallengeLimiter`] / [`reflux::RedisRefluxLimiter`] —
//!   one-time or bounded-retry challenge generate/match.
//!
//! Every primitive's correctness-bearing logic lives in exactly one atomic
//! Lua script (see [`scripts`]); the types in this crate marshal
//! parameters, dispatch the script, and decode its integer status into the
//! typed outcomes declared in `ratelimit-core`.
//!
//! # Example
//!
//! ```ignore
//! use ratelimit_redis::{RedisConfig, pool::build_pool, period::RedisPeriodLimiter};
//! use ratelimit_core::PeriodOptions;
//!
//! let pool = build_pool(&RedisConfig::default())?;
//! let limiter = RedisPeriodLimiter::new(pool, PeriodOptions::default());
//! let status = limiter.take("login", "user-42").await?;
//! ```

pub mod challenge;
mod challenge_engine;
pub mod config;
pub mod period;
pub mod period_failure;
pub mod pool;
pub mod reflux;
mod scripts;
pub mod verified;

pub use challenge::RedisChallengeLimiter;
pub use config::RedisConfig;
pub use period::RedisPeriodLimiter;
pub use period_failure::RedisPeriodFailureLimiter;
pub use reflux::RedisRefluxLimiter;
pub use verified::RedisVerifiedCodeLimiter;
