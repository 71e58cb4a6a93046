//! Window-alignment math shared by the period and period-failure limiters.

/// Current epoch-seconds, as observed by this process.
///
/// Per the toolkit's design notes, `now` fed to a script must be a
/// caller-observed value, never the store's own clock — replicas can drift.
#[must_use]
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The local timezone's current UTC offset, in seconds.
#[must_use]
pub fn local_tz_offset_secs() -> i64 {
    i64::from(chrono::Local::now().offset().local_minus_utc())
}

/// Seconds remaining until the end of the current aligned window.
///
/// When `align` is set, the window boundary is anchored to local-day start
/// (or, more generally, to multiples of `period_secs` since the epoch,
/// shifted by `tz_offset_secs`) rather than rolling from the first request.
/// Mirrors `period - ((now + tz_offset) mod period)`.
///
/// `period_secs` must be `>= 1`; callers enforce this at option-construction
/// time, not here.
#[must_use]
pub fn expire_seconds(period_secs: i64, align: bool, now_unix: i64, tz_offset_secs: i64) -> i64 {
    if !align {
        return period_secs;
    }
    let shifted = now_unix + tz_offset_secs;
    period_secs - shifted.rem_euclid(period_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaligned_returns_full_period() {
        assert_eq!(expire_seconds(60, false, 1_700_000_123, 0), 60);
    }

    #[test]
    fn aligned_to_day_start() {
        // 1970-01-02T00:00:00Z minus one second, UTC offset 0.
        let now = 86_400 + 86_400 - 1;
        assert_eq!(expire_seconds(86_400, true, now, 0), 1);
    }

    #[test]
    fn aligned_at_exact_boundary_returns_full_period() {
        assert_eq!(expire_seconds(86_400, true, 172_800, 0), 86_400);
    }

    #[test]
    fn aligned_honors_negative_tz_offset() {
        // UTC-5: local midnight is 5h after UTC midnight.
        let tz_offset = -5 * 3_600;
        let utc_midnight_minus_offset = 86_400 - tz_offset;
        assert_eq!(
            expire_seconds(86_400, true, utc_midnight_minus_offset, tz_offset),
            86_400
        );
    }
}
