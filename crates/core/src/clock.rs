//! Source of "now" for timestamps written to the store.

use time::OffsetDateTime;
use time::macros::format_description;

/// Supplies the current time. Swap in [`FixedClock`] for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Formats `at` in UTC as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    at.to_offset(time::UtcOffset::UTC).format(format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(datetime!(2024-03-05 07:08:09 UTC)), "2024-03-05 07:08:09");
    }

    #[test]
    fn test_format_timestamp_converts_to_utc() {
        assert_eq!(format_timestamp(datetime!(2024-03-05 09:00:00 +02:00)), "2024-03-05 07:00:00");
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(datetime!(2020-01-01 00:00:00 UTC));
        assert_eq!(clock.now(), clock.now());
        assert!(SystemClock.now() > clock.now());
    }
}
