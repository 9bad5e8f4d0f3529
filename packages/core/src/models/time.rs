//! Time Provider Abstraction
//!
//! Note timestamps (`created_at`, `updated_at`) are read through
//! [`TimeProvider`] so services can be driven by a fixed clock in tests.
//!
//! # Examples
//!
//! ```rust
//! use decknote_core::models::time::{FixedTimeProvider, TimeProvider};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
//! let clock = FixedTimeProvider::new(start);
//! clock.advance(Duration::minutes(5));
//! assert_eq!(clock.now() - start, Duration::minutes(5));
//! ```

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Source of the current UTC time
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Shared behind `Arc<dyn TimeProvider>`, so it advances through `&self`.
#[derive(Debug)]
pub struct FixedTimeProvider {
    current: Mutex<DateTime<Utc>>,
}

impl FixedTimeProvider {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(time),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.lock() = time;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        *self.lock() += duration;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned clock still holds a valid timestamp
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_system_time_provider() {
        let now1 = SystemTimeProvider.now();
        let now2 = Utc::now();
        assert!((now2 - now1).num_milliseconds().abs() < 1000);
    }

    #[test]
    fn test_fixed_time_provider_set_and_advance() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedTimeProvider::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(2));
        assert_eq!(clock.now() - start, Duration::hours(2));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
