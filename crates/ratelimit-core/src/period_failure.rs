use std::time::Duration;

use crate::error::RateLimitError;

/// Outcome of a [period-failure limiter](crate) `check` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodFailureStatus {
    Unknown,
    /// A success was reported and cleared the window (or there was nothing
    /// to clear).
    Success,
    /// A failure was recorded and the window is still under quota.
    InQuota,
    /// The window is at or past quota; a success cannot clear it.
    OverQuota,
}

impl PeriodFailureStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    #[must_use]
    pub fn is_over_quota(self) -> bool {
        matches!(self, Self::OverQuota)
    }
}

impl TryFrom<i64> for PeriodFailureStatus {
    type Error = RateLimitError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Success),
            1 => Ok(Self::InQuota),
            2 => Ok(Self::OverQuota),
            _ => Err(RateLimitError::UnknownCode),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeriodFailureOptions {
    pub key_prefix: String,
    pub period: Duration,
    pub quota: i64,
}

impl Default for PeriodFailureOptions {
    fn default() -> Self {
        Self {
            key_prefix: "LIMIT:PERIOD:FAILURE:".to_string(),
            period: Duration::from_secs(24 * 3_600),
            quota: 6,
        }
    }
}

impl PeriodFailureOptions {
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.key_prefix.ends_with(':') {
            self.key_prefix.push(':');
        }
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PeriodFailureCallOptions {
    pub period: Option<Duration>,
    pub quota: Option<i64>,
}

impl PeriodFailureCallOptions {
    #[must_use]
    pub fn resolve(&self, defaults: &PeriodFailureOptions) -> (i64, i64) {
        let period_secs = self
            .period
            .unwrap_or(defaults.period)
            .as_secs()
            .max(1) as i64;
        let quota = self.quota.unwrap_or(defaults.quota);
        (period_secs, quota)
    }
}
