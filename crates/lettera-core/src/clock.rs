use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time, in the user's local offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    /// Local calendar date as `YYYY-MM-DD`.
    fn today_key(&self) -> String {
        self.now().date_naive().format("%Y-%m-%d").to_string()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<FixedOffset>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rome() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn today_key_uses_local_date() {
        // 23:30 UTC is already the next day at +01:00.
        let clock = ManualClock::new(rome().with_ymd_and_hms(2026, 1, 6, 0, 30, 0).unwrap());
        assert_eq!(clock.today_key(), "2026-01-06");
        assert_eq!(clock.now_utc().format("%Y-%m-%d").to_string(), "2026-01-05");
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(rome().with_ymd_and_hms(2026, 1, 5, 23, 0, 0).unwrap());
        clock.advance(Duration::hours(2));
        assert_eq!(clock.today_key(), "2026-01-06");
    }

    #[test]
    fn system_clock_is_close_to_utc_now() {
        let diff = (SystemClock.now_utc() - Utc::now()).num_seconds().abs();
        assert!(diff < 5);
    }
}
