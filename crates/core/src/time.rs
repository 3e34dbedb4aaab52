use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

//
// ─── ELAPSED TIME ──────────────────────────────────────────────────────────────
//

/// Whole seconds from `since` to `now`, floored and clamped at zero.
///
/// A clock that steps backwards yields `0`, never a negative span.
#[must_use]
pub fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = now.signed_duration_since(since).num_milliseconds();
    u64::try_from(millis.div_euclid(1000)).unwrap_or(0)
}

/// [`elapsed_secs`] saturated into the `u32` carried by answer records.
#[must_use]
pub fn elapsed_secs_u32(since: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    u32::try_from(elapsed_secs(since, now)).unwrap_or(u32::MAX)
}

/// Formats seconds as `"{m}m {s}s"`, e.g. `92 -> "1m 32s"`.
#[must_use]
pub fn format_elapsed(secs: u64) -> String {
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(5));
        assert!(clock.is_fixed());
    }

    #[test]
    fn default_clock_ignores_advance() {
        let mut clock = Clock::default_clock();
        clock.advance(Duration::days(1));
        assert!(!clock.is_fixed());
    }

    #[test]
    fn elapsed_is_floored() {
        let start = fixed_now();
        assert_eq!(elapsed_secs(start, start + Duration::milliseconds(1999)), 1);
        assert_eq!(elapsed_secs(start, start + Duration::milliseconds(999)), 0);
        assert_eq!(elapsed_secs(start, start), 0);
    }

    #[test]
    fn elapsed_never_negative() {
        let start = fixed_now();
        assert_eq!(elapsed_secs(start, start - Duration::milliseconds(1)), 0);
        assert_eq!(elapsed_secs(start, start - Duration::hours(3)), 0);
        assert_eq!(elapsed_secs_u32(start, start - Duration::seconds(10)), 0);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "0m 0s");
        assert_eq!(format_elapsed(92), "1m 32s");
        assert_eq!(format_elapsed(3600), "60m 0s");
    }
}
