//! Async driver interfaces for each limiter family, a generic kind-keyed
//! registry shared across all three families, and the provider plug-point
//! traits an application implements (code delivery, question generation,
//! unique-id generation).
//!
//! `ratelimit-redis` supplies the concrete, Redis-backed implementations of
//! the driver traits declared here; this crate only declares the seams.

pub mod period;
pub mod period_failure;
pub mod provider;
pub mod registry;

pub use period::{PeriodLimiterDriver, UnsupportedPeriodLimiterDriver};
pub use period_failure::{PeriodFailureLimiterDriver, UnsupportedPeriodFailureLimiterDriver};
pub use provider::{
    CaptchaDriver, CodeProvider, QuestionAnswer, RefluxProvider, SendCodeRequest, UnsupportedCaptchaDriver,
    UnsupportedRefluxProvider,
};
pub use registry::DriverRegistry;
