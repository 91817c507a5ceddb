//! Wall-clock collaborator

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Seconds since the Unix epoch, clamped at zero
    fn unix_seconds(&self) -> u64 {
        self.now().timestamp().max(0) as u64
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Useful for deterministic callers and tests that need to land on a
/// particular TOTP step.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { millis: AtomicI64::new(start.timestamp_millis()) }
    }

    /// Start at a Unix timestamp in seconds
    pub fn at_unix(seconds: i64) -> Self {
        Self { millis: AtomicI64::new(seconds.saturating_mul(1000)) }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.millis.store(time.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at_unix(1_700_000_000);
        assert_eq!(clock.unix_seconds(), 1_700_000_000);

        clock.advance(Duration::seconds(30));
        assert_eq!(clock.unix_seconds(), 1_700_000_030);

        clock.set(Utc.timestamp_opt(59, 0).unwrap());
        assert_eq!(clock.unix_seconds(), 59);
    }

    #[test]
    fn test_negative_time_clamps() {
        let clock = ManualClock::at_unix(-100);
        assert_eq!(clock.unix_seconds(), 0);
    }

    #[test]
    fn test_system_clock_is_recent() {
        let now = SystemClock.unix_seconds();
        assert!(now > 1_600_000_000);
    }
}
