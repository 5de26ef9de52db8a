use chrono::{DateTime, Local};

/// Local wall-clock reading, as written into exports.
pub type WallStamp = DateTime<Local>;

/// Wall-clock markers for session metadata. Monotonic measurement goes
/// through [`crate::Timer`]; this is only for human-readable output.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl WallClock {
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn now(&self) -> WallStamp {
        Local::now()
    }

    pub fn format(stamp: &WallStamp) -> String {
        stamp.format(Self::FORMAT).to_string()
    }

    /// Milliseconds from `begin` to `end`, zero if `end` precedes `begin`.
    pub fn span_ms(begin: &WallStamp, end: &WallStamp) -> u64 {
        u64::try_from((*end - *begin).num_milliseconds()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_seconds_resolution() {
        let stamp = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(WallClock::format(&stamp), "2024-03-07 09:05:01");
    }

    #[test]
    fn span_is_never_negative() {
        let a = Local.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap();
        let b = Local.with_ymd_and_hms(2024, 3, 7, 9, 2, 30).unwrap();
        assert_eq!(WallClock::span_ms(&a, &b), 150_000);
        assert_eq!(WallClock::span_ms(&b, &a), 0);
    }
}
