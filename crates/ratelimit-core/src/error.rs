use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by every public operation in `ratelimit-driver` and
/// `ratelimit-redis`.
///
/// The store's own "null on missing" read is absence, not an error — it
/// never produces one of these variants, it produces an outcome (see
/// [`crate::period::PeriodStatus`] and friends).
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("script returned an unrecognized status code")]
    UnknownCode,

    #[error("driver already registered for kind: {kind}")]
    DuplicateDriver { kind: String },

    #[error("no driver registered for kind: {kind}")]
    UnsupportedDriver { kind: String },

    #[error("{operation} is only supported in {required_mode} mode")]
    UnsupportedOperationMode { operation: &'static str, required_mode: &'static str },

    #[error("max sends per day reached")]
    MaxSendPerDay,

    #[error("resend requested too frequently")]
    ResendTooFrequently,

    #[error("code required or expired")]
    CodeRequiredOrExpired,

    #[error("max verification error quota reached")]
    CodeMaxErrorQuota,

    #[error("code verification failed")]
    CodeVerification,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("operation did not complete within the caller-supplied deadline of {0:?}")]
    Timeout(Duration),
}
