use std::sync::OnceLock;

use regex::Regex;

use crate::formatting::percentage;
use crate::models::{Direction, Trend};

/// Reading speed used for the read-time estimate.
pub const WORDS_PER_MINUTE: u32 = 250;

// ── TrendCalculator ───────────────────────────────────────────────────────────

/// Stateless month-over-month comparison.
pub struct TrendCalculator;

impl TrendCalculator {
    /// Compare the current month's count against the previous month's.
    ///
    /// * `previous == 0`: `"0"` when `current` is also zero, else `"100"`.
    /// * otherwise: `|current - previous| / previous * 100`, rounded.
    ///
    /// Direction is `Up` when `current >= previous`, except that two zero
    /// months report `Down`.
    pub fn month_over_month(current: u64, previous: u64) -> Trend {
        if current == 0 && previous == 0 {
            return Trend {
                direction: Direction::Down,
                percentage: "0".to_string(),
            };
        }

        let pct = if previous == 0 {
            100
        } else {
            let delta = current.abs_diff(previous);
            percentage(delta as f64, previous as f64, 0) as u64
        };

        let direction = if current >= previous {
            Direction::Up
        } else {
            Direction::Down
        };

        Trend {
            direction,
            percentage: pct.to_string(),
        }
    }
}

// ── Read time ─────────────────────────────────────────────────────────────────

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("regex is valid"))
}

fn word_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{L}[\p{L}'\-]*").expect("regex is valid"))
}

/// Count the words in an HTML fragment.
///
/// Tags are stripped first; a word is a run of letters, apostrophes and
/// hyphens starting with a letter. Digits and punctuation do not count.
pub fn count_words(html: &str) -> usize {
    let text = tag_pattern().replace_all(html, " ");
    word_pattern().find_iter(&text).count()
}

/// Estimated reading time in whole minutes.
///
/// Rounds up and never returns less than 1, so an empty or missing body
/// still reads as one minute.
pub fn estimate_read_time(body: Option<&str>, words_per_minute: u32) -> u32 {
    let words = body.map(count_words).unwrap_or(0) as u64;
    let wpm = u64::from(words_per_minute.max(1));
    let minutes = words.div_ceil(wpm).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
