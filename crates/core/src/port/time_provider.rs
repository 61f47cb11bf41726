// Time Provider Port (for testability)

use chrono::{DateTime, NaiveDate, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Current UTC calendar day
    fn today_utc(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp_millis(self.now_millis())
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that only moves when told to (each read advances by `step_ms`)
    pub struct FixedTimeProvider {
        now: AtomicI64,
        step_ms: i64,
    }

    impl FixedTimeProvider {
        pub fn new(start_millis: i64) -> Self {
            Self::with_step(start_millis, 0)
        }

        pub fn with_step(start_millis: i64, step_ms: i64) -> Self {
            Self {
                now: AtomicI64::new(start_millis),
                step_ms,
            }
        }

        /// Clock pinned to midnight UTC of the given day
        pub fn at_date(date: NaiveDate) -> Self {
            let millis = date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis())
                .unwrap_or_default();
            Self::new(millis)
        }

        pub fn advance(&self, ms: i64) {
            self.now.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.fetch_add(self.step_ms, Ordering::SeqCst)
        }
    }

}
