//! Wall-clock abstraction.
//!
//! The poller reads time only through [`Clock`], so tests can pin the
//! service-hours gate and snapshot timestamps with
//! [`MockClock`](crate::mock::MockClock).

use chrono::{DateTime, Utc};

/// Time source.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current time in whole epoch seconds.
    fn epoch_secs(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Real system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
