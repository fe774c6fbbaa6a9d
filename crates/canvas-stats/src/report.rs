//! JSON and plain-text rendering of computed statistics.

use std::fmt::Write;

use chrono::NaiveDate;
use stats_core::formatting::{format_count, format_read_time, format_short_date};
use stats_core::models::{Digest, Direction, PostStats, ScopeStats, StatsSummary, Trend};

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("text") {
            Self::Text
        } else {
            Self::Json
        }
    }
}

/// One computed result, ready to render.
#[derive(Debug, Clone)]
pub enum Report {
    Post(Box<PostStats>),
    Scope { label: String, stats: ScopeStats },
    Digest { owner_id: String, digest: Digest },
}

impl Report {
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Json => self.to_json(),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_json(&self) -> anyhow::Result<String> {
        let json = match self {
            Report::Post(stats) => serde_json::to_string_pretty(stats)?,
            Report::Scope { stats, .. } => serde_json::to_string_pretty(stats)?,
            Report::Digest { digest, .. } => serde_json::to_string_pretty(digest)?,
        };
        Ok(json)
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        match self {
            Report::Post(stats) => {
                let _ = writeln!(out, "{} ({})", display_title(&stats.post.title), stats.post.id);
                let _ = writeln!(out, "{}", format_read_time(stats.read_time));
                out.push('\n');
                write_summary(&mut out, &stats.summary);
            }
            Report::Scope { label, stats } => {
                let _ = writeln!(out, "{}", label);
                out.push('\n');
                write_summary(&mut out, &stats.summary);
            }
            Report::Digest { owner_id, digest } => write_digest(&mut out, owner_id, digest),
        }
        out
    }
}

// ── Text sections ─────────────────────────────────────────────────────────────

fn write_summary(out: &mut String, s: &StatsSummary) {
    let _ = writeln!(
        out,
        "Views   {:>10} total  {:>8} this month  {}",
        format_count(s.total_views),
        format_count(s.monthly_views),
        describe_trend(&s.month_over_month_views)
    );
    let _ = writeln!(
        out,
        "Visits  {:>10} total  {:>8} this month  {}",
        format_count(s.total_visits),
        format_count(s.monthly_visits),
        describe_trend(&s.month_over_month_visits)
    );

    out.push_str("\nTop referrers\n");
    if s.top_referers.is_empty() {
        out.push_str("  (none)\n");
    }
    for r in &s.top_referers {
        let _ = writeln!(out, "  {:<40} {:>8}", r.referer, format_count(r.count));
    }

    out.push_str("\nPopular reading times\n");
    let mut busiest: Vec<_> = s.popular_reading_times.iter().filter(|b| b.views > 0).collect();
    busiest.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.hour.cmp(&b.hour)));
    if busiest.is_empty() {
        out.push_str("  (none)\n");
    }
    for bucket in busiest.into_iter().take(5) {
        let _ = writeln!(
            out,
            "  {:<22} {:>8} {:>7}%",
            bucket.label,
            format_count(bucket.views),
            bucket.percentage
        );
    }

    let points = s.graph.points();
    let _ = writeln!(out, "\nLast {} days", points.len());
    for point in points {
        let _ = writeln!(
            out,
            "  {:<8} {:>6} views {:>6} visits",
            day_label(&point.period_label),
            format_count(point.view_count),
            format_count(point.visit_count)
        );
    }
}

fn write_digest(out: &mut String, owner_id: &str, digest: &Digest) {
    let _ = writeln!(
        out,
        "Weekly digest for {}: {} - {}",
        owner_id, digest.start_date, digest.end_date
    );
    out.push('\n');
    for post in &digest.posts {
        let _ = writeln!(
            out,
            "  {:<40} {:>8} views {:>8} visits",
            display_title(&post.title),
            format_count(post.views_count),
            format_count(post.visits_count)
        );
    }
    let _ = writeln!(
        out,
        "\nTotal: {} views, {} visits",
        format_count(digest.totals.views),
        format_count(digest.totals.visits)
    );
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn describe_trend(trend: &Trend) -> String {
    let arrow = match trend.direction {
        Direction::Up => "up",
        Direction::Down => "down",
    };
    format!("({} {}% vs last month)", arrow, trend.percentage)
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() {
        "(untitled)"
    } else {
        title
    }
}

/// `"2024-06-15"` → `"Jun 15"`; anything else is shown as is.
fn day_label(key: &str) -> String {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map(format_short_date)
        .unwrap_or_else(|_| key.to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
