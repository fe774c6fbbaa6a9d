use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Events ────────────────────────────────────────────────────────────────────

/// Common read access to captured traffic events.
///
/// The aggregator is generic over this so views and visits share every
/// bucketing path.
pub trait TrafficEvent {
    /// Identifier of the content item the event belongs to.
    fn content_item_id(&self) -> &str;
    /// UTC instant the event was captured.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// One page render of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEvent {
    /// Content item this view belongs to.
    pub content_item_id: String,
    /// UTC timestamp of the render.
    pub occurred_at: DateTime<Utc>,
    /// Opaque session identifier recorded by the capture listener.
    #[serde(default)]
    pub session_fingerprint: String,
}

impl TrafficEvent for ViewEvent {
    fn content_item_id(&self) -> &str {
        &self.content_item_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// One unique-visitor touch of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    /// Content item this visit belongs to.
    pub content_item_id: String,
    /// UTC timestamp of the visit.
    pub occurred_at: DateTime<Utc>,
    /// Raw `Referer` header, if the browser sent one.
    #[serde(default)]
    pub referrer: Option<String>,
    /// Visitor IP as captured.
    #[serde(default)]
    pub originating_ip: String,
    /// Opaque session identifier recorded by the capture listener.
    #[serde(default)]
    pub session_fingerprint: String,
}

impl TrafficEvent for VisitEvent {
    fn content_item_id(&self) -> &str {
        &self.content_item_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

// ── Content ───────────────────────────────────────────────────────────────────

/// A post as seen by the statistics engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub title: String,
    /// HTML body; `None` for posts that were never written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `None` for drafts.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// Whether the item is publicly visible at `now`.
    ///
    /// Drafts (`published_at == None`) and scheduled posts
    /// (`published_at > now`) are not.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        matches!(self.published_at, Some(at) if at <= now)
    }
}

/// Which items a dashboard-level summary covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Items owned by one user.
    User(String),
    /// Every item.
    All,
}

impl Scope {
    /// Whether `item` falls inside this scope.
    pub fn contains(&self, item: &ContentItem) -> bool {
        match self {
            Scope::User(owner_id) => item.owner_id == *owner_id,
            Scope::All => true,
        }
    }
}

// ── Summary pieces ────────────────────────────────────────────────────────────

/// Direction of a month-over-month change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Month-over-month change for one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: Direction,
    /// Non-negative whole-number percentage, e.g. `"100"`.
    pub percentage: String,
}

/// A referrer and the number of visits it sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefererCount {
    pub referer: String,
    pub count: u64,
}

/// Views that fell into one hour of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBucket {
    /// Hour of day, `0..=23`, in the server timezone.
    pub hour: u32,
    /// Display range, e.g. `"9:00 AM - 10:00 AM"`.
    pub label: String,
    pub views: u64,
    /// Share of all views, two decimals, e.g. `"12.50"`.
    pub percentage: String,
}

/// One row of the combined daily series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPoint {
    pub period_label: String,
    pub view_count: u64,
    pub visit_count: u64,
}

/// Dense daily series keyed by `"%Y-%m-%d"`.
///
/// `BTreeMap` keeps the keys in calendar order when serialised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSeries {
    pub views: BTreeMap<String, u64>,
    pub visits: BTreeMap<String, u64>,
}

impl GraphSeries {
    /// Combine both series into one ordered sequence of rows.
    ///
    /// Days present in only one series get a zero for the other.
    pub fn points(&self) -> Vec<GraphPoint> {
        let mut labels: Vec<&String> = self.views.keys().chain(self.visits.keys()).collect();
        labels.sort();
        labels.dedup();

        labels
            .into_iter()
            .map(|label| GraphPoint {
                period_label: label.clone(),
                view_count: self.views.get(label).copied().unwrap_or(0),
                visit_count: self.visits.get(label).copied().unwrap_or(0),
            })
            .collect()
    }
}

/// Aggregated statistics for one item or a scope of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_views: u64,
    pub total_visits: u64,
    pub monthly_views: u64,
    pub monthly_visits: u64,
    pub previous_month_views: u64,
    pub previous_month_visits: u64,
    pub month_over_month_views: Trend,
    pub month_over_month_visits: Trend,
    pub top_referers: Vec<RefererCount>,
    pub popular_reading_times: Vec<HourBucket>,
    pub graph: GraphSeries,
}

/// Per-post statistics as returned to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub post: ContentItem,
    /// Estimated reading time in whole minutes, at least 1.
    pub read_time: u32,
    #[serde(flatten)]
    pub summary: StatsSummary,
}

/// Scope-level statistics for the dashboard.
///
/// `views` and `visits` repeat the totals at the top level next to the
/// flattened summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeStats {
    pub views: u64,
    pub visits: u64,
    #[serde(flatten)]
    pub summary: StatsSummary,
}

impl From<StatsSummary> for ScopeStats {
    fn from(summary: StatsSummary) -> Self {
        Self {
            views: summary.total_views,
            visits: summary.total_visits,
            summary,
        }
    }
}

// ── Digest ────────────────────────────────────────────────────────────────────

/// Traffic for one post over the digest window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestPost {
    pub id: String,
    pub title: String,
    pub views_count: u64,
    pub visits_count: u64,
}

/// Sums across every post in a digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestTotals {
    pub views: u64,
    pub visits: u64,
}

/// Weekly per-author traffic roll-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub posts: Vec<DigestPost>,
    pub totals: DigestTotals,
    /// Window start, e.g. `"Oct 11"`.
    pub start_date: String,
    /// Window end, e.g. `"Oct 18"`.
    pub end_date: String,
}
