//! Network operating hours.
//!
//! The metro runs from early morning until shortly after midnight, so the
//! open window usually wraps past midnight: it opens at `open_minute` and
//! closes at a smaller `close_minute` the next day. Times are local to the
//! network's timezone, so DST shifts move the window with the wall clock.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use metro_live::service_hours::{ServiceHours, ServiceStatus};
//!
//! let hours = ServiceHours::default(); // Europe/Lisbon, 06:30 - 00:30
//!
//! // 12:00 UTC in January is 12:00 in Lisbon
//! let noon = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
//! assert_eq!(hours.status(noon), ServiceStatus::Open);
//!
//! // 05:30 local: one hour until opening
//! let early = Utc.with_ymd_and_hms(2024, 1, 15, 5, 30, 0).unwrap();
//! assert_eq!(hours.status(early), ServiceStatus::Closed { ms_until_open: 3_600_000 });
//! ```

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::config::ServiceHoursConfig;
use crate::error::ConfigError;

const MINUTES_PER_DAY: u32 = 24 * 60;
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Result of a service-hours check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Trains are running.
    Open,
    /// Trains are not running.
    Closed {
        /// Milliseconds until the next opening (at most one day)
        ms_until_open: u64,
    },
}

impl ServiceStatus {
    /// Whether the network is open.
    pub fn is_open(self) -> bool {
        matches!(self, ServiceStatus::Open)
    }
}

/// Timezone-anchored daily service window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceHours {
    tz: Tz,
    open_minute: u32,
    close_minute: u32,
}

impl Default for ServiceHours {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Lisbon, 6 * 60 + 30, 30)
    }
}

impl ServiceHours {
    /// Create a window. Minutes are minute-of-day, reduced modulo one day.
    pub fn new(tz: Tz, open_minute: u32, close_minute: u32) -> Self {
        Self {
            tz,
            open_minute: open_minute % MINUTES_PER_DAY,
            close_minute: close_minute % MINUTES_PER_DAY,
        }
    }

    /// Build from configuration, resolving the timezone name.
    pub fn from_config(config: &ServiceHoursConfig) -> Result<Self, ConfigError> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(config.timezone.clone()))?;
        Ok(Self::new(tz, config.open_minute, config.close_minute))
    }

    /// Timezone the window is anchored to.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local minute-of-day at which service opens.
    pub fn open_minute(&self) -> u32 {
        self.open_minute
    }

    /// Local minute-of-day at which service closes.
    pub fn close_minute(&self) -> u32 {
        self.close_minute
    }

    /// Service status at `now`.
    pub fn status(&self, now: DateTime<Utc>) -> ServiceStatus {
        let local = now.with_timezone(&self.tz);
        let minute = local.hour() * 60 + local.minute();

        if self.is_open_at(minute) {
            return ServiceStatus::Open;
        }

        // Leap-second nanos can exceed 1e9; cap at the last millisecond.
        let millis = (local.nanosecond() / 1_000_000).min(999);
        let now_ms = i64::from(local.num_seconds_from_midnight()) * 1000 + i64::from(millis);
        let open_ms = i64::from(self.open_minute) * 60_000;
        let ms_until_open = (open_ms - now_ms).rem_euclid(MS_PER_DAY);

        ServiceStatus::Closed {
            ms_until_open: ms_until_open as u64,
        }
    }

    fn is_open_at(&self, minute: u32) -> bool {
        if self.close_minute <= self.open_minute {
            minute >= self.open_minute || minute < self.close_minute
        } else {
            minute >= self.open_minute && minute < self.close_minute
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lisbon(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        // January: Lisbon is UTC+0
        chrono_tz::Europe::Lisbon
            .with_ymd_and_hms(2024, 1, 15, h, m, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_closed_before_opening() {
        let hours = ServiceHours::default();
        let expected = ((6 * 60 + 30) - 59) as u64 * 60_000;
        assert_eq!(
            hours.status(lisbon(0, 59, 0)),
            ServiceStatus::Closed {
                ms_until_open: expected
            }
        );
    }

    #[test]
    fn test_open_exactly_at_opening() {
        assert_eq!(ServiceHours::default().status(lisbon(6, 30, 0)), ServiceStatus::Open);
    }

    #[test]
    fn test_one_second_before_opening() {
        assert_eq!(
            ServiceHours::default().status(lisbon(6, 29, 59)),
            ServiceStatus::Closed { ms_until_open: 1000 }
        );
    }

    #[test]
    fn test_open_after_midnight_until_close() {
        let hours = ServiceHours::default();
        assert!(hours.status(lisbon(0, 0, 0)).is_open());
        assert!(hours.status(lisbon(0, 29, 59)).is_open());
        assert!(!hours.status(lisbon(0, 30, 0)).is_open());
        assert!(hours.status(lisbon(23, 59, 0)).is_open());
    }

    #[test]
    fn test_summer_time_uses_local_clock() {
        // July: Lisbon is UTC+1, so 05:45 UTC is 06:45 local
        let hours = ServiceHours::default();
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 5, 45, 0).unwrap();
        assert!(hours.status(now).is_open());

        let now = Utc.with_ymd_and_hms(2024, 7, 1, 5, 15, 0).unwrap();
        assert_eq!(
            hours.status(now),
            ServiceStatus::Closed { ms_until_open: 15 * 60_000 }
        );
    }

    #[test]
    fn test_non_wrapping_window() {
        let hours = ServiceHours::new(chrono_tz::UTC, 8 * 60, 20 * 60);
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        assert!(hours.status(at(12)).is_open());
        assert_eq!(
            hours.status(at(21)),
            ServiceStatus::Closed {
                ms_until_open: 11 * 3_600_000
            }
        );
    }

    #[test]
    fn test_from_config_rejects_unknown_zone() {
        let config = ServiceHoursConfig::default().with_timezone("Mars/Olympus");
        assert!(matches!(
            ServiceHours::from_config(&config),
            Err(ConfigError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn test_from_config_defaults() {
        let hours = ServiceHours::from_config(&ServiceHoursConfig::default()).unwrap();
        assert_eq!(hours, ServiceHours::default());
    }
}
