//! # Clocks
//!
//! Expiry is "derived from the clock at query time", which makes the clock
//! an input like any other. Registries take an `Arc<dyn Clock>` so tests
//! can move time forward without sleeping.
//!
//! Timestamps are truncated to whole seconds. Credential hashes encode
//! `issued_at` as Unix seconds, and a stored timestamp with sub-second
//! precision would no longer recompute to the same hash.

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Truncate to whole seconds.
pub fn truncate_to_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0).single().unwrap_or(t)
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        truncate_to_seconds(Utc::now())
    }
}

/// A clock that only moves when told to.
///
/// ```
/// use attest_protocol::time::{Clock, ManualClock};
/// use chrono::Duration;
///
/// let clock = ManualClock::at_unix(1_700_000_000);
/// let before = clock.now();
/// clock.advance(Duration::days(30));
/// assert_eq!(clock.now() - before, Duration::days(30));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(truncate_to_seconds(start)),
        }
    }

    /// Start at a Unix timestamp. Out-of-range values fall back to the epoch.
    pub fn at_unix(secs: i64) -> Self {
        let start = Utc
            .timestamp_opt(secs, 0)
            .single()
            .unwrap_or_default();
        Self::new(start)
    }

    pub fn set(&self, t: DateTime<Utc>) {
        *self.now.lock() = truncate_to_seconds(t);
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = truncate_to_seconds(*now + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
