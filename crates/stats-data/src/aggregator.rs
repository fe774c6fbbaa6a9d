//! Traffic aggregation for single posts and scopes of posts.
//!
//! Everything here is a pure function of the events passed in plus an
//! explicit `now`; nothing is cached between calls.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use stats_core::calculations::{estimate_read_time, TrendCalculator, WORDS_PER_MINUTE};
use stats_core::formatting::{format_hour_range, percentage};
use stats_core::models::{
    ContentItem, GraphSeries, HourBucket, PostStats, Scope, StatsSummary, TrafficEvent, ViewEvent,
    VisitEvent,
};
use stats_core::time_utils::TimezoneHandler;
use stats_core::{Result, StatsError};
use tracing::debug;

use crate::referrer::top_referrers;

/// Referrers reported per summary unless configured otherwise.
pub const DEFAULT_TOP_REFERERS: usize = 5;
/// Days covered by the daily graph unless configured otherwise.
pub const DEFAULT_GRAPH_DAYS: u32 = 30;

// ── AggregatorConfig ──────────────────────────────────────────────────────────

/// Fixed parameters shared by every aggregation.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Server timezone for day, month and hour boundaries.
    pub timezone: TimezoneHandler,
    pub top_referers: usize,
    pub graph_days: u32,
    pub words_per_minute: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            timezone: TimezoneHandler::default(),
            top_referers: DEFAULT_TOP_REFERERS,
            graph_days: DEFAULT_GRAPH_DAYS,
            words_per_minute: WORDS_PER_MINUTE,
        }
    }
}

// ── StatsAggregator ───────────────────────────────────────────────────────────

/// Stateless engine that turns view and visit events into summaries.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    config: AggregatorConfig,
}

impl StatsAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Statistics for a single published post.
    ///
    /// Fails with [`StatsError::NotFound`] when the post is a draft or is
    /// scheduled after `now`, whatever the events contain. Events belonging
    /// to other posts are ignored.
    pub fn compute_for_item(
        &self,
        item: &ContentItem,
        views: &[ViewEvent],
        visits: &[VisitEvent],
        now: DateTime<Utc>,
    ) -> Result<PostStats> {
        if !item.is_published(now) {
            debug!("Post {} is not published at {}; hiding stats", item.id, now);
            return Err(StatsError::NotFound(item.id.clone()));
        }

        let views: Vec<&ViewEvent> = views
            .iter()
            .filter(|v| v.content_item_id == item.id)
            .collect();
        let visits: Vec<&VisitEvent> = visits
            .iter()
            .filter(|v| v.content_item_id == item.id)
            .collect();

        let summary = self.summarize(&views, &visits, now);
        let read_time = estimate_read_time(item.body.as_deref(), self.config.words_per_minute);

        debug!(
            "Post {}: {} views, {} visits, {} min read",
            item.id, summary.total_views, summary.total_visits, read_time
        );

        Ok(PostStats {
            post: item.clone(),
            read_time,
            summary,
        })
    }

    /// Statistics over the union of every in-scope item's events.
    ///
    /// Items are expected to be filtered for publication state already; only
    /// the ownership implied by `scope` is applied here.
    pub fn compute_for_scope(
        &self,
        scope: &Scope,
        items: &[ContentItem],
        views: &[ViewEvent],
        visits: &[VisitEvent],
        now: DateTime<Utc>,
    ) -> StatsSummary {
        let ids: HashSet<&str> = items
            .iter()
            .filter(|item| scope.contains(item))
            .map(|item| item.id.as_str())
            .collect();

        let views: Vec<&ViewEvent> = views
            .iter()
            .filter(|v| ids.contains(v.content_item_id.as_str()))
            .collect();
        let visits: Vec<&VisitEvent> = visits
            .iter()
            .filter(|v| ids.contains(v.content_item_id.as_str()))
            .collect();

        debug!(
            "Scope {:?}: {} posts, {} views, {} visits",
            scope,
            ids.len(),
            views.len(),
            visits.len()
        );

        self.summarize(&views, &visits, now)
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn summarize(
        &self,
        views: &[&ViewEvent],
        visits: &[&VisitEvent],
        now: DateTime<Utc>,
    ) -> StatsSummary {
        let tz = &self.config.timezone;

        let (monthly_views, previous_month_views) = monthly_counts(views, tz, now);
        let (monthly_visits, previous_month_visits) = monthly_counts(visits, tz, now);

        StatsSummary {
            total_views: views.len() as u64,
            total_visits: visits.len() as u64,
            monthly_views,
            monthly_visits,
            previous_month_views,
            previous_month_visits,
            month_over_month_views: TrendCalculator::month_over_month(
                monthly_views,
                previous_month_views,
            ),
            month_over_month_visits: TrendCalculator::month_over_month(
                monthly_visits,
                previous_month_visits,
            ),
            top_referers: top_referrers(visits.iter().copied(), self.config.top_referers),
            popular_reading_times: reading_times(views, tz),
            graph: GraphSeries {
                views: daily_series(views, tz, now, self.config.graph_days),
                visits: daily_series(visits, tz, now, self.config.graph_days),
            },
        }
    }
}

// ── Bucketing helpers ─────────────────────────────────────────────────────────

/// Events in the calendar month of `now` and in the month before it.
fn monthly_counts<E: TrafficEvent>(
    events: &[&E],
    tz: &TimezoneHandler,
    now: DateTime<Utc>,
) -> (u64, u64) {
    let current = tz.month_key(now);
    let previous = current.previous();

    events.iter().fold((0, 0), |(cur, prev), event| {
        let key = tz.month_key(event.occurred_at());
        if key == current {
            (cur + 1, prev)
        } else if key == previous {
            (cur, prev + 1)
        } else {
            (cur, prev)
        }
    })
}

/// Dense per-day counts for the `days` days ending today.
///
/// Every day in the window is present; events outside it are dropped.
fn daily_series<E: TrafficEvent>(
    events: &[&E],
    tz: &TimezoneHandler,
    now: DateTime<Utc>,
    days: u32,
) -> BTreeMap<String, u64> {
    let mut series: BTreeMap<String, u64> = tz
        .trailing_days(now, days)
        .into_iter()
        .map(|day| (day.format("%Y-%m-%d").to_string(), 0))
        .collect();

    for event in events {
        if let Some(count) = series.get_mut(&tz.day_key(event.occurred_at())) {
            *count += 1;
        }
    }

    series
}

/// Views per hour of day, always 24 buckets.
fn reading_times(views: &[&ViewEvent], tz: &TimezoneHandler) -> Vec<HourBucket> {
    let mut counts = [0u64; 24];
    for view in views {
        counts[tz.hour_of_day(view.occurred_at) as usize] += 1;
    }

    let total = views.len() as f64;
    (0u32..24)
        .zip(counts)
        .map(|(hour, count)| HourBucket {
            hour,
            label: format_hour_range(hour),
            views: count,
            percentage: format!("{:.2}", percentage(count as f64, total, 2)),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
