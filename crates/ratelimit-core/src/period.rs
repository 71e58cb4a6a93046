use std::time::Duration;

use crate::error::RateLimitError;

/// Outcome of a [period limiter](crate) `take` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodStatus {
    /// The store returned something outside the stable `{0,1,2}` contract.
    Unknown,
    /// Strictly under quota.
    Allowed,
    /// Exactly at quota — the last call that will be let through this window.
    HitQuota,
    /// Past quota.
    OverQuota,
}

impl PeriodStatus {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed | Self::HitQuota)
    }

    #[must_use]
    pub fn is_hit_quota(self) -> bool {
        matches!(self, Self::HitQuota)
    }

    #[must_use]
    pub fn is_over_quota(self) -> bool {
        matches!(self, Self::OverQuota)
    }
}

impl TryFrom<i64> for PeriodStatus {
    type Error = RateLimitError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Allowed),
            1 => Ok(Self::HitQuota),
            2 => Ok(Self::OverQuota),
            _ => Err(RateLimitError::UnknownCode),
        }
    }
}

/// Construction-time defaults for a period limiter.
///
/// Per-call overrides ([`PeriodCallOptions`]) are applied by copying these
/// defaults and overwriting the fields the caller actually supplied — never
/// by threading a builder through the call path.
#[derive(Debug, Clone)]
pub struct PeriodOptions {
    /// Appended with a trailing `:` if the caller didn't include one.
    pub key_prefix: String,
    /// Quantized down to whole seconds; must be `>= 1s`.
    pub period: Duration,
    pub quota: i64,
    /// Align the window to local-day start using the current UTC offset.
    pub align: bool,
}

impl Default for PeriodOptions {
    fn default() -> Self {
        Self {
            key_prefix: "LIMIT:PERIOD:".to_string(),
            period: Duration::from_secs(24 * 3_600),
            quota: 6,
            align: false,
        }
    }
}

impl PeriodOptions {
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.key_prefix.ends_with(':') {
            self.key_prefix.push(':');
        }
        self
    }
}

/// Per-call override of a subset of [`PeriodOptions`]. `None` fields fall
/// back to the limiter's construction-time defaults.
#[derive(Debug, Clone, Default)]
pub struct PeriodCallOptions {
    pub period: Option<Duration>,
    pub quota: Option<i64>,
}

impl PeriodCallOptions {
    #[must_use]
    pub fn resolve(&self, defaults: &PeriodOptions) -> (i64, i64) {
        let period_secs = self
            .period
            .unwrap_or(defaults.period)
            .as_secs()
            .max(1) as i64;
        let quota = self.quota.unwrap_or(defaults.quota);
        (period_secs, quota)
    }
}
