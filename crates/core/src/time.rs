use chrono::{DateTime, Duration, Utc};

/// Source of "now" for progress timestamps.
///
/// Services take a `Clock` by value so tests can pin `last_accessed` to a
/// known instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }

    /// Returns a copy moved forward by `delta`. A system clock is returned
    /// unchanged.
    #[must_use]
    pub fn advanced_by(self, delta: Duration) -> Self {
        match self {
            Clock::System => Clock::System,
            Clock::Fixed(at) => Clock::Fixed(at + delta),
        }
    }
}

/// Seconds since epoch used by `fixed_now` (2025-01-10T12:00:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_736_510_400;

/// Deterministic instant for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-10T12:00:00+00:00");
    }

    #[test]
    fn advancing_moves_fixed_clock_only() {
        let clock = fixed_clock().advanced_by(Duration::seconds(30));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(30));
        assert_eq!(Clock::system().advanced_by(Duration::days(1)), Clock::System);
    }
}
