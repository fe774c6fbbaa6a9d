use chrono::NaiveDate;

/// Format a count with thousands separators.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234), "1,234");
/// assert_eq!(format_count(1234567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

/// Render a reading-time estimate, e.g. `"3 min read"`.
pub fn format_read_time(minutes: u32) -> String {
    format!("{} min read", minutes)
}

/// Render the one-hour window starting at `hour` on a 12-hour clock.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::format_hour_range;
///
/// assert_eq!(format_hour_range(0), "12:00 AM - 1:00 AM");
/// assert_eq!(format_hour_range(11), "11:00 AM - 12:00 PM");
/// assert_eq!(format_hour_range(23), "11:00 PM - 12:00 AM");
/// ```
pub fn format_hour_range(hour: u32) -> String {
    let start = hour % 24;
    let end = (start + 1) % 24;
    format!("{} - {}", twelve_hour(start), twelve_hour(end))
}

/// Short month-and-day label used by the digest, e.g. `"Oct 11"`.
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn twelve_hour(hour: u32) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:00 {}", display, suffix)
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
