//! Weekly per-author traffic digest.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use stats_core::formatting::format_short_date;
use stats_core::models::{
    ContentItem, Digest, DigestPost, DigestTotals, TrafficEvent, ViewEvent, VisitEvent,
};
use tracing::debug;

use crate::aggregator::StatsAggregator;

/// Length of the digest window in days.
pub const DIGEST_WINDOW_DAYS: i64 = 7;

impl StatsAggregator {
    /// Roll up the last week of traffic for every published post owned by
    /// `owner_id`.
    ///
    /// Posts without traffic in the window are listed with zero counts.
    pub fn compute_digest(
        &self,
        owner_id: &str,
        items: &[ContentItem],
        views: &[ViewEvent],
        visits: &[VisitEvent],
        now: DateTime<Utc>,
    ) -> Digest {
        let start = now - Duration::days(DIGEST_WINDOW_DAYS);
        let view_counts = counts_in_window(views, start, now);
        let visit_counts = counts_in_window(visits, start, now);

        let mut posts: Vec<DigestPost> = items
            .iter()
            .filter(|item| item.owner_id == owner_id && item.is_published(now))
            .map(|item| DigestPost {
                id: item.id.clone(),
                title: item.title.clone(),
                views_count: view_counts.get(item.id.as_str()).copied().unwrap_or(0),
                visits_count: visit_counts.get(item.id.as_str()).copied().unwrap_or(0),
            })
            .collect();

        posts.sort_by(|a, b| {
            b.views_count
                .cmp(&a.views_count)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });

        let totals = posts.iter().fold(DigestTotals::default(), |acc, post| DigestTotals {
            views: acc.views + post.views_count,
            visits: acc.visits + post.visits_count,
        });

        debug!(
            "Digest for {}: {} posts, {} views, {} visits",
            owner_id,
            posts.len(),
            totals.views,
            totals.visits
        );

        let tz = &self.config().timezone;
        Digest {
            posts,
            totals,
            start_date: format_short_date(tz.local_date(start)),
            end_date: format_short_date(tz.local_date(now)),
        }
    }
}

fn counts_in_window<E: TrafficEvent>(
    events: &[E],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> HashMap<&str, u64> {
    let mut counts = HashMap::new();
    for event in events {
        let at = event.occurred_at();
        if at >= start && at <= end {
            *counts.entry(event.content_item_id()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregatorConfig;
    use chrono::TimeZone;
    use stats_core::time_utils::TimezoneHandler;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 18, 12, 0, 0).unwrap()
    }

    fn post(id: &str, owner: &str, title: &str) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: title.to_string(),
            body: None,
            published_at: Some(now() - Duration::days(30)),
        }
    }

    fn view(item: &str, at: DateTime<Utc>) -> ViewEvent {
        ViewEvent {
            content_item_id: item.to_string(),
            occurred_at: at,
            session_fingerprint: String::new(),
        }
    }

    fn visit(item: &str, at: DateTime<Utc>) -> VisitEvent {
        VisitEvent {
            content_item_id: item.to_string(),
            occurred_at: at,
            referrer: None,
            originating_ip: String::new(),
            session_fingerprint: String::new(),
        }
    }

    #[test]
    fn test_digest_totals_two_posts() {
        let agg = StatsAggregator::default();
        let items = vec![post("p1", "u1", "First"), post("p2", "u1", "Second")];
        let recent = now() - Duration::days(1);
        let mut views = Vec::new();
        let mut visits = Vec::new();
        for id in ["p1", "p2"] {
            views.push(view(id, recent));
            views.push(view(id, recent));
            visits.push(visit(id, recent));
        }

        let digest = agg.compute_digest("u1", &items, &views, &visits, now());
        assert_eq!(digest.posts.len(), 2);
        assert_eq!(digest.totals, DigestTotals { views: 4, visits: 2 });
        assert!(digest.posts.iter().all(|p| p.views_count == 2 && p.visits_count == 1));
    }

    #[test]
    fn test_digest_excludes_events_outside_window() {
        let agg = StatsAggregator::default();
        let items = vec![post("p1", "u1", "First")];
        let views = vec![
            view("p1", now() - Duration::days(8)),
            view("p1", now() - Duration::days(6)),
            view("p1", now() + Duration::hours(1)),
        ];

        let digest = agg.compute_digest("u1", &items, &views, &[], now());
        assert_eq!(digest.totals.views, 1);
    }

    #[test]
    fn test_digest_only_owned_published_posts() {
        let agg = StatsAggregator::default();
        let mut draft = post("p3", "u1", "Draft");
        draft.published_at = None;
        let items = vec![post("p1", "u1", "Mine"), post("p2", "u2", "Theirs"), draft];
        let views = vec![view("p2", now()), view("p3", now())];

        let digest = agg.compute_digest("u1", &items, &views, &[], now());
        assert_eq!(digest.posts.len(), 1);
        assert_eq!(digest.posts[0].id, "p1");
        assert_eq!(digest.posts[0].views_count, 0);
        assert_eq!(digest.totals, DigestTotals::default());
    }

    #[test]
    fn test_digest_ordering() {
        let agg = StatsAggregator::default();
        let items = vec![
            post("p1", "u1", "Bravo"),
            post("p2", "u1", "Alpha"),
            post("p3", "u1", "Charlie"),
        ];
        let views = vec![view("p3", now()), view("p3", now())];

        let digest = agg.compute_digest("u1", &items, &views, &[], now());
        let titles: Vec<&str> = digest.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Charlie", "Alpha", "Bravo"]);
    }

    #[test]
    fn test_digest_date_labels() {
        let agg = StatsAggregator::default();
        let digest = agg.compute_digest("u1", &[], &[], &[], now());
        assert_eq!(digest.start_date, "Oct 11");
        assert_eq!(digest.end_date, "Oct 18");
        assert!(digest.posts.is_empty());
    }

    #[test]
    fn test_digest_dates_use_server_timezone() {
        let config = AggregatorConfig {
            timezone: TimezoneHandler::new("Asia/Tokyo"),
            ..Default::default()
        };
        let agg = StatsAggregator::new(config);
        // 20:00 UTC is already the next day in Tokyo.
        let late = Utc.with_ymd_and_hms(2024, 10, 18, 20, 0, 0).unwrap();

        let digest = agg.compute_digest("u1", &[], &[], &[], late);
        assert_eq!(digest.start_date, "Oct 12");
        assert_eq!(digest.end_date, "Oct 19");
    }

    #[test]
    fn test_digest_serialised_keys() {
        let agg = StatsAggregator::default();
        let items = vec![post("p1", "u1", "First")];
        let json = serde_json::to_value(agg.compute_digest("u1", &items, &[], &[], now())).unwrap();

        assert!(json.get("posts").is_some());
        assert!(json.get("totals").is_some());
        assert!(json.get("startDate").is_some());
        assert!(json.get("endDate").is_some());
        assert_eq!(json["posts"][0]["views_count"], 0);
        assert_eq!(json["posts"][0]["visits_count"], 0);
    }
}
