//! Shared types for the distributed rate-limiting and verification-code
//! toolkit: the error taxonomy, the closed outcome enum per primitive, and
//! the construction-time / per-call option records.
//!
//! Nothing here talks to a store — that's `ratelimit-redis`'s job. This
//! crate is the vocabulary both `ratelimit-driver` and `ratelimit-redis`
//! share.

pub mod challenge;
pub mod error;
pub mod period;
pub mod period_failure;
pub mod time;
pub mod verified;

pub use challenge::{ChallengeOptions, GenerateOptions, MatchStatus};
pub use error::RateLimitError;
pub use period::{PeriodCallOptions, PeriodOptions, PeriodStatus};
pub use period_failure::{PeriodFailureCallOptions, PeriodFailureOptions, PeriodFailureStatus};
pub use verified::{ResolvedSendParams, SendCodeParams, SendStatus, VerifiedCodeOptions, VerifyStatus};
