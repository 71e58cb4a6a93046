use std::time::Duration;

use crate::error::RateLimitError;

/// Outcome of a [verified-code limiter](crate) `send_code` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Unknown,
    Success,
    /// Global daily send cap (or code-bearing-send cap) reached; rolled back.
    MaxSendPerDay,
    /// An existing entry is still within its resend cooldown; rolled back.
    ResendTooFrequently,
}

impl SendStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl TryFrom<i64> for SendStatus {
    type Error = RateLimitError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Success),
            1 => Ok(Self::MaxSendPerDay),
            2 => Ok(Self::ResendTooFrequently),
            _ => Err(RateLimitError::UnknownCode),
        }
    }
}

impl SendStatus {
    #[must_use]
    pub fn into_error(self) -> Option<RateLimitError> {
        match self {
            Self::Success => None,
            Self::MaxSendPerDay => Some(RateLimitError::MaxSendPerDay),
            Self::ResendTooFrequently => Some(RateLimitError::ResendTooFrequently),
            Self::Unknown => Some(RateLimitError::UnknownCode),
        }
    }
}

/// Outcome of a [verified-code limiter](crate) `verify_code` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Unknown,
    Success,
    /// No entry: never sent, or the availability window / a prior success
    /// already consumed it.
    RequiredOrExpired,
    /// The error budget was already exhausted; `code` was never consulted.
    ReachMaxError,
    /// Wrong code; one more error was charged against the budget.
    VerificationFailure,
}

impl VerifyStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    #[must_use]
    pub fn into_error(self) -> Option<RateLimitError> {
        match self {
            Self::Success => None,
            Self::RequiredOrExpired => Some(RateLimitError::CodeRequiredOrExpired),
            Self::ReachMaxError => Some(RateLimitError::CodeMaxErrorQuota),
            Self::VerificationFailure => Some(RateLimitError::CodeVerification),
            Self::Unknown => Some(RateLimitError::UnknownCode),
        }
    }
}

impl TryFrom<i64> for VerifyStatus {
    type Error = RateLimitError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Success),
            1 => Ok(Self::RequiredOrExpired),
            2 => Ok(Self::ReachMaxError),
            3 => Ok(Self::VerificationFailure),
            _ => Err(RateLimitError::UnknownCode),
        }
    }
}

/// Construction-time defaults for a verified-code limiter.
#[derive(Debug, Clone)]
pub struct VerifiedCodeOptions {
    pub key_prefix: String,
    /// TTL on the per-target global bucket (§3.3).
    pub key_expires: Duration,
    pub max_send_per_day: i64,
    /// Clamped to `<= max_send_per_day` by [`VerifiedCodeOptions::normalized`].
    pub code_max_send_per_day: i64,
    pub code_max_error_quota: i64,
    pub code_avail_window_second: i64,
    pub code_resend_interval_second: i64,
}

impl Default for VerifiedCodeOptions {
    fn default() -> Self {
        Self {
            key_prefix: "limit:verified:".to_string(),
            key_expires: Duration::from_secs(24 * 3_600),
            max_send_per_day: 10,
            code_max_send_per_day: 10,
            code_max_error_quota: 3,
            code_avail_window_second: 180,
            code_resend_interval_second: 60,
        }
    }
}

impl VerifiedCodeOptions {
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.key_prefix.ends_with(':') {
            self.key_prefix.push(':');
        }
        if self.code_max_send_per_day > self.max_send_per_day {
            self.code_max_send_per_day = self.max_send_per_day;
        }
        self
    }
}

/// Per-call override for a `send_code` invocation.
#[derive(Debug, Clone, Default)]
pub struct SendCodeParams {
    pub max_send_per_day: Option<i64>,
    pub code_max_send_per_day: Option<i64>,
    pub code_max_error_quota: Option<i64>,
    pub code_avail_window_second: Option<i64>,
    pub code_resend_interval_second: Option<i64>,
}

/// Resolved parameters passed to the send script, after merging defaults and
/// per-call overrides.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSendParams {
    pub max_send_per_day: i64,
    pub code_max_send_per_day: i64,
    pub code_max_error_quota: i64,
    pub code_avail_window_second: i64,
    pub code_resend_interval_second: i64,
    pub global_expires_second: i64,
}

impl SendCodeParams {
    #[must_use]
    pub fn resolve(&self, defaults: &VerifiedCodeOptions) -> ResolvedSendParams {
        let max_send_per_day = self.max_send_per_day.unwrap_or(defaults.max_send_per_day);
        let code_max_send_per_day = self
            .code_max_send_per_day
            .unwrap_or(defaults.code_max_send_per_day)
            .min(max_send_per_day);
        ResolvedSendParams {
            max_send_per_day,
            code_max_send_per_day,
            code_max_error_quota: self
                .code_max_error_quota
                .unwrap_or(defaults.code_max_error_quota),
            code_avail_window_second: self
                .code_avail_window_second
                .unwrap_or(defaults.code_avail_window_second),
            code_resend_interval_second: self
                .code_resend_interval_second
                .unwrap_or(defaults.code_resend_interval_second),
            global_expires_second: defaults.key_expires.as_secs().max(1) as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_code_cap_to_global_cap() {
        let opts = VerifiedCodeOptions {
            max_send_per_day: 5,
            code_max_send_per_day: 10,
            ..Default::default()
        }
        .normalized();
        assert_eq!(opts.code_max_send_per_day, 5);
    }

    #[test]
    fn send_status_roundtrip() {
        assert_eq!(SendStatus::try_from(0).unwrap(), SendStatus::Success);
        assert!(SendStatus::try_from(0).unwrap().into_error().is_none());
        assert!(matches!(
            SendStatus::try_from(1).unwrap().into_error(),
            Some(RateLimitError::MaxSendPerDay)
        ));
    }

    #[test]
    fn verify_status_roundtrip() {
        assert_eq!(VerifyStatus::try_from(3).unwrap(), VerifyStatus::VerificationFailure);
        assert!(matches!(
            VerifyStatus::try_from(2).unwrap().into_error(),
            Some(RateLimitError::CodeMaxErrorQuota)
        ));
    }
}
