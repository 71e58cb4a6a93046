use std::time::Duration;

use crate::error::RateLimitError;

/// Outcome of a `verify` / `match` call against a challenge entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Unknown,
    Success,
    Failure,
}

impl MatchStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl TryFrom<i64> for MatchStatus {
    type Error = RateLimitError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Success),
            1 => Ok(Self::Failure),
            _ => Err(RateLimitError::UnknownCode),
        }
    }
}

/// Construction-time defaults shared by the captcha and reflux challenge
/// limiters.
///
/// Presence of `max_err_quota` switches the primitive from one-time mode
/// (§4.4.1) into bounded-retry mode (§4.4.2).
#[derive(Debug, Clone)]
pub struct ChallengeOptions {
    pub key_prefix: String,
    pub key_expires: Duration,
    pub max_err_quota: Option<i64>,
}

impl Default for ChallengeOptions {
    fn default() -> Self {
        Self {
            key_prefix: "limit:verified:captcha:".to_string(),
            key_expires: Duration::from_secs(300),
            max_err_quota: None,
        }
    }
}

impl ChallengeOptions {
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.key_prefix.ends_with(':') {
            self.key_prefix.push(':');
        }
        self
    }

    #[must_use]
    pub fn is_bounded_retry(&self) -> bool {
        self.max_err_quota.is_some()
    }
}

/// Per-call override applied to a single `generate` invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub key_expires: Option<Duration>,
    /// Raises or lowers the error budget for this one entry. `verify` and
    /// `match_answer` still dispatch on the limiter's construction-time
    /// mode, so an override is only safe to use without also changing
    /// `Some`-ness relative to that default.
    pub max_err_quota: Option<i64>,
}

impl GenerateOptions {
    #[must_use]
    pub fn resolve_expires(self, defaults: &ChallengeOptions) -> i64 {
        self.key_expires
            .unwrap_or(defaults.key_expires)
            .as_secs()
            .max(1) as i64
    }

    #[must_use]
    pub fn resolve_max_err_quota(self, defaults: &ChallengeOptions) -> Option<i64> {
        self.max_err_quota.or(defaults.max_err_quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_time_mode() {
        assert!(!ChallengeOptions::default().is_bounded_retry());
    }

    #[test]
    fn presence_of_err_quota_switches_mode() {
        let opts = ChallengeOptions {
            max_err_quota: Some(3),
            ..Default::default()
        };
        assert!(opts.is_bounded_retry());
    }

    #[test]
    fn match_status_roundtrip() {
        assert_eq!(MatchStatus::try_from(0).unwrap(), MatchStatus::Success);
        assert_eq!(MatchStatus::try_from(1).unwrap(), MatchStatus::Failure);
        assert!(MatchStatus::try_from(2).is_err());
    }
}
