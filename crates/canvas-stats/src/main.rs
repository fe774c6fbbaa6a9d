mod bootstrap;
mod report;

use anyhow::Result;
use chrono::{DateTime, Utc};
use stats_core::calculations::WORDS_PER_MINUTE;
use stats_core::models::{Scope, ScopeStats};
use stats_core::settings::Settings;
use stats_core::time_utils::TimezoneHandler;
use stats_core::StatsError;
use stats_data::reader::{load_event_store, EventStore};
use stats_data::{AggregatorConfig, StatsAggregator};

use crate::report::{OutputFormat, Report};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Canvas stats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Timezone: {}, Output: {}",
        settings.view,
        settings.timezone,
        settings.output
    );

    let timezone = TimezoneHandler::new(&settings.timezone);
    let aggregator = StatsAggregator::new(AggregatorConfig {
        timezone,
        top_referers: settings.top_referers as usize,
        graph_days: settings.graph_days,
        words_per_minute: WORDS_PER_MINUTE,
    });

    let data_path = settings.data_path();
    tracing::info!("Loading data from {}", data_path.display());
    let store = load_event_store(&data_path, &timezone)?;

    let report = build_report(&settings, &aggregator, &store, Utc::now())?;
    println!("{}", report.render(OutputFormat::from_name(&settings.output))?);

    Ok(())
}

/// Run the aggregation selected by `--view`.
fn build_report(
    settings: &Settings,
    aggregator: &StatsAggregator,
    store: &EventStore,
    now: DateTime<Utc>,
) -> Result<Report> {
    let report = match settings.view.as_str() {
        "post" => {
            let id = required(settings.post.as_deref(), "--post")?;
            let post = store
                .find_post(id)
                .ok_or_else(|| StatsError::NotFound(id.to_string()))?;
            let stats = aggregator.compute_for_item(post, &store.views, &store.visits, now)?;
            Report::Post(Box::new(stats))
        }
        "user" => {
            let user = required(settings.user.as_deref(), "--user")?;
            let summary = aggregator.compute_for_scope(
                &Scope::User(user.to_string()),
                &store.published_posts(now),
                &store.views,
                &store.visits,
                now,
            );
            Report::Scope {
                label: format!("Posts by {}", user),
                stats: ScopeStats::from(summary),
            }
        }
        "all" => {
            let summary = aggregator.compute_for_scope(
                &Scope::All,
                &store.published_posts(now),
                &store.views,
                &store.visits,
                now,
            );
            Report::Scope {
                label: "All posts".to_string(),
                stats: ScopeStats::from(summary),
            }
        }
        "digest" => {
            let user = required(settings.user.as_deref(), "--user")?;
            let digest =
                aggregator.compute_digest(user, &store.posts, &store.views, &store.visits, now);
            Report::Digest {
                owner_id: user.to_string(),
                digest,
            }
        }
        unknown => {
            return Err(StatsError::Config(format!("Unknown view mode: {}", unknown)).into());
        }
    };

    Ok(report)
}

fn required<'a>(value: Option<&'a str>, flag: &str) -> Result<&'a str, StatsError> {
    value.ok_or_else(|| StatsError::MissingArgument(flag.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use clap::Parser;
    use stats_core::models::{ContentItem, ViewEvent};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn settings(args: &[&str]) -> Settings {
        let mut argv = vec!["canvas-stats"];
        argv.extend_from_slice(args);
        Settings::parse_from(argv)
    }

    fn store() -> EventStore {
        let post = |id: &str, owner: &str, published: bool| ContentItem {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: id.to_uppercase(),
            body: None,
            published_at: published.then(|| now() - Duration::days(60)),
        };
        let view = |id: &str| ViewEvent {
            content_item_id: id.to_string(),
            occurred_at: now() - Duration::hours(1),
            session_fingerprint: String::new(),
        };

        EventStore {
            posts: vec![post("p1", "u1", true), post("p2", "u2", true), post("d1", "u1", false)],
            views: vec![view("p1"), view("p1"), view("p2"), view("d1")],
            visits: Vec::new(),
        }
    }

    #[test]
    fn test_post_view() {
        let report = build_report(
            &settings(&["--view", "post", "--post", "p1"]),
            &StatsAggregator::default(),
            &store(),
            now(),
        )
        .unwrap();
        match report {
            Report::Post(stats) => assert_eq!(stats.summary.total_views, 2),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_post_view_draft_is_not_found() {
        let err = build_report(
            &settings(&["--view", "post", "--post", "d1"]),
            &StatsAggregator::default(),
            &store(),
            now(),
        )
        .unwrap_err();
        let stats_err = err.downcast_ref::<StatsError>().unwrap();
        assert!(stats_err.is_not_found());
    }

    #[test]
    fn test_post_view_unknown_id_is_not_found() {
        let err = build_report(
            &settings(&["--view", "post", "--post", "nope"]),
            &StatsAggregator::default(),
            &store(),
            now(),
        )
        .unwrap_err();
        assert!(err.downcast_ref::<StatsError>().unwrap().is_not_found());
    }

    #[test]
    fn test_post_view_requires_post_flag() {
        let err = build_report(
            &settings(&["--view", "post"]),
            &StatsAggregator::default(),
            &store(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StatsError>(),
            Some(StatsError::MissingArgument(flag)) if flag == "--post"
        ));
    }

    #[test]
    fn test_user_view_skips_drafts_and_other_owners() {
        let report = build_report(
            &settings(&["--view", "user", "--user", "u1"]),
            &StatsAggregator::default(),
            &store(),
            now(),
        )
        .unwrap();
        match report {
            Report::Scope { stats, .. } => assert_eq!(stats.views, 2),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_all_view() {
        let report = build_report(
            &settings(&["--view", "all"]),
            &StatsAggregator::default(),
            &store(),
            now(),
        )
        .unwrap();
        match report {
            Report::Scope { stats, .. } => assert_eq!(stats.views, 3),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_digest_view() {
        let report = build_report(
            &settings(&["--view", "digest", "--user", "u1"]),
            &StatsAggregator::default(),
            &store(),
            now(),
        )
        .unwrap();
        match report {
            Report::Digest { digest, .. } => {
                assert_eq!(digest.posts.len(), 1);
                assert_eq!(digest.totals.views, 2);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }
}
