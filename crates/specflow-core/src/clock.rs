use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of the current time for debounce checks.
///
/// Injected into the workflow so tests can pin or step the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::milliseconds(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

/// Tracks the last accepted invocation of one operation.
#[derive(Debug, Clone, Default)]
pub struct Debounce {
    window_ms: u64,
    last: Option<DateTime<Utc>>,
}

impl Debounce {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last: None,
        }
    }

    /// Returns true and records `now` if the window since the last accepted
    /// call has elapsed. A rejected call leaves the timestamp untouched.
    pub fn try_enter(&mut self, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last {
            let elapsed = now.signed_duration_since(last).num_milliseconds();
            if elapsed >= 0 && (elapsed as u64) < self.window_ms {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(t0());
        clock.advance_ms(1500);
        assert_eq!(clock.now(), t0() + Duration::milliseconds(1500));
    }

    #[test]
    fn system_clock_is_current() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }

    #[test]
    fn debounce_rejects_within_window() {
        let mut d = Debounce::new(1000);
        assert!(d.try_enter(t0()));
        assert!(!d.try_enter(t0() + Duration::milliseconds(999)));
        assert!(d.try_enter(t0() + Duration::milliseconds(1000)));
    }

    #[test]
    fn rejected_call_does_not_extend_window() {
        let mut d = Debounce::new(1000);
        assert!(d.try_enter(t0()));
        assert!(!d.try_enter(t0() + Duration::milliseconds(600)));
        assert!(d.try_enter(t0() + Duration::milliseconds(1100)));
    }
}
