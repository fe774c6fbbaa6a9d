use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use tracing::{debug, warn};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── MonthKey ──────────────────────────────────────────────────────────────────

/// A calendar month, used as the monthly bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    /// `1..=12`.
    pub month: u32,
}

impl MonthKey {
    /// The month immediately before this one, wrapping across years.
    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Parses timestamps and assigns them to calendar buckets in the single
/// server timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    default_tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { default_tz: Tz::UTC }
    }
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    ///
    /// If `tz_name` is not recognised, falls back to UTC and logs a warning.
    pub fn new(tz_name: &str) -> Self {
        let tz = tz_name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                tz_name
            );
            Tz::UTC
        });
        Self { default_tz: tz }
    }

    /// Parse an RFC 3339 or naive timestamp string into a UTC [`DateTime`].
    ///
    /// Naive timestamps (no offset) are interpreted in the server timezone.
    /// Returns `None` for empty strings or unrecognised formats.
    pub fn parse_timestamp(&self, s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        const FMTS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];
        for fmt in FMTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return self.localize(naive).map(|dt| dt.with_timezone(&Utc));
            }
        }

        debug!("TimezoneHandler: could not parse timestamp \"{}\"", s);
        None
    }

    /// Resolve a server-local wall-clock time to an instant.
    ///
    /// A time repeated by a fall-back transition takes its first occurrence.
    /// A time skipped by a spring-forward transition is moved past the gap.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
        match self.default_tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => self
                .default_tz
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest(),
        }
    }

    /// Convert a UTC instant to server-local time.
    pub fn local(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.default_tz)
    }

    /// Calendar month containing `dt` in the server timezone.
    pub fn month_key(&self, dt: DateTime<Utc>) -> MonthKey {
        let local = self.local(dt);
        MonthKey {
            year: local.year(),
            month: local.month(),
        }
    }

    /// Calendar day containing `dt` in the server timezone.
    pub fn local_date(&self, dt: DateTime<Utc>) -> NaiveDate {
        self.local(dt).date_naive()
    }

    /// Daily bucket key, `"%Y-%m-%d"`.
    pub fn day_key(&self, dt: DateTime<Utc>) -> String {
        self.local_date(dt).format("%Y-%m-%d").to_string()
    }

    /// Hour of day (`0..=23`) in the server timezone.
    pub fn hour_of_day(&self, dt: DateTime<Utc>) -> u32 {
        self.local(dt).hour()
    }

    /// The `days` calendar days ending with today (inclusive), oldest first.
    pub fn trailing_days(&self, now: DateTime<Utc>, days: u32) -> Vec<NaiveDate> {
        let today = self.local_date(now);
        (0..i64::from(days))
            .rev()
            .map(|offset| today - Duration::days(offset))
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── new ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_new_valid_timezone() {
        let handler = TimezoneHandler::new("America/New_York");
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(handler.local(dt).timezone(), Tz::America__New_York);
        assert_eq!(handler.hour_of_day(dt), 7);
    }

    #[test]
    fn test_new_invalid_timezone_falls_back_to_utc() {
        let handler = TimezoneHandler::new("Invalid/Timezone");
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(handler.local(dt).timezone(), Tz::UTC);
        assert_eq!(handler.hour_of_day(dt), 12);
    }

    // ── parse_timestamp ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_timestamp_z_suffix() {
        let handler = TimezoneHandler::default();
        let dt = handler.parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let handler = TimezoneHandler::default();
        let dt = handler
            .parse_timestamp("2024-01-15T12:00:00+02:00")
            .unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_parse_timestamp_naive_uses_server_timezone() {
        let handler = TimezoneHandler::new("Europe/Berlin");
        // 12:00 in Berlin winter time (UTC+1) is 11:00 UTC.
        let dt = handler.parse_timestamp("2024-01-15 12:00:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_fall_back_hour_takes_first_occurrence() {
        let handler = TimezoneHandler::new("America/New_York");
        // 01:30 happens twice on 2024-11-03; the first is still EDT (UTC-4).
        let dt = handler.parse_timestamp("2024-11-03 01:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_spring_forward_gap_moves_past_gap() {
        let handler = TimezoneHandler::new("America/New_York");
        // 02:30 does not exist on 2024-03-10; it reads as 03:30 EDT.
        let dt = handler.parse_timestamp("2024-03-10 02:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_empty_returns_none() {
        assert!(TimezoneHandler::default().parse_timestamp("").is_none());
        assert!(TimezoneHandler::default().parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_parse_timestamp_garbage_returns_none() {
        assert!(TimezoneHandler::default()
            .parse_timestamp("not-a-date")
            .is_none());
    }

    // ── MonthKey ─────────────────────────────────────────────────────────────

    #[test]
    fn test_month_key_previous_same_year() {
        let key = MonthKey {
            year: 2024,
            month: 6,
        };
        assert_eq!(
            key.previous(),
            MonthKey {
                year: 2024,
                month: 5
            }
        );
    }

    #[test]
    fn test_month_key_previous_wraps_year() {
        let key = MonthKey {
            year: 2024,
            month: 1,
        };
        assert_eq!(
            key.previous(),
            MonthKey {
                year: 2023,
                month: 12
            }
        );
    }

    #[test]
    fn test_month_key_respects_server_timezone() {
        // 2024-02-01 03:00 UTC is still January 31st in New York.
        let dt = Utc.with_ymd_and_hms(2024, 2, 1, 3, 0, 0).unwrap();
        let utc = TimezoneHandler::default().month_key(dt);
        let ny = TimezoneHandler::new("America/New_York").month_key(dt);
        assert_eq!(utc.month, 2);
        assert_eq!(ny.month, 1);
    }

    // ── day_key / hour_of_day ────────────────────────────────────────────────

    #[test]
    fn test_day_key_format() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 0).unwrap();
        assert_eq!(TimezoneHandler::default().day_key(dt), "2024-03-05");
        // Tokyo is UTC+9, so this is already the 6th.
        assert_eq!(TimezoneHandler::new("Asia/Tokyo").day_key(dt), "2024-03-06");
    }

    #[test]
    fn test_hour_of_day() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(TimezoneHandler::default().hour_of_day(dt), 12);
        // New York is UTC-4 in summer.
        assert_eq!(TimezoneHandler::new("America/New_York").hour_of_day(dt), 8);
    }

    // ── trailing_days ────────────────────────────────────────────────────────

    #[test]
    fn test_trailing_days_count_and_order() {
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let days = TimezoneHandler::default().trailing_days(now, 30);
        assert_eq!(days.len(), 30);
        assert_eq!(days[29], NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        // 2024 is a leap year: 29 days back from March 2nd is February 2nd.
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_trailing_days_zero() {
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        assert!(TimezoneHandler::default().trailing_days(now, 0).is_empty());
    }

    // ── get_system_timezone ──────────────────────────────────────────────────

    #[test]
    fn test_get_system_timezone_returns_nonempty_string() {
        assert!(!get_system_timezone().is_empty());
    }
}
