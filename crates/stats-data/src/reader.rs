//! JSONL file discovery and loading for Canvas statistics.
//!
//! A data directory holds `posts.jsonl` plus rotated event logs under
//! `views/` and `visits/`. Every line is one JSON object; lines that do not
//! parse are skipped rather than failing the whole load.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use stats_core::models::{ContentItem, TrafficEvent, ViewEvent, VisitEvent};
use stats_core::time_utils::TimezoneHandler;
use stats_core::{Result, StatsError};
use tracing::{debug, warn};

pub const POSTS_FILE: &str = "posts.jsonl";
pub const VIEWS_DIR: &str = "views";
pub const VISITS_DIR: &str = "visits";

// ── EventStore ────────────────────────────────────────────────────────────────

/// Everything loaded from one data directory.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    pub posts: Vec<ContentItem>,
    /// Sorted by `occurred_at`.
    pub views: Vec<ViewEvent>,
    /// Sorted by `occurred_at`.
    pub visits: Vec<VisitEvent>,
}

impl EventStore {
    pub fn find_post(&self, id: &str) -> Option<&ContentItem> {
        self.posts.iter().find(|post| post.id == id)
    }

    /// Posts that are visible at `now`.
    pub fn published_posts(&self, now: DateTime<Utc>) -> Vec<ContentItem> {
        self.posts
            .iter()
            .filter(|post| post.is_published(now))
            .cloned()
            .collect()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.jsonl` files recursively under `data_path`, sorted by path.
pub fn find_jsonl_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        debug!("Directory does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load posts, views and visits from `data_path`.
///
/// Fails when `posts.jsonl` is missing or unreadable. Missing event
/// directories yield no events.
pub fn load_event_store(data_path: &Path, tz: &TimezoneHandler) -> Result<EventStore> {
    let posts = load_posts(&data_path.join(POSTS_FILE), tz)?;
    let views = load_views(&data_path.join(VIEWS_DIR), tz);
    let visits = load_visits(&data_path.join(VISITS_DIR), tz);

    debug!(
        "Loaded {} posts, {} views, {} visits from {}",
        posts.len(),
        views.len(),
        visits.len(),
        data_path.display()
    );

    Ok(EventStore {
        posts,
        views,
        visits,
    })
}

/// Parse `posts.jsonl`.
///
/// A post whose `published_at` cannot be parsed is kept as a draft.
pub fn load_posts(path: &Path, tz: &TimezoneHandler) -> Result<Vec<ContentItem>> {
    if !path.exists() {
        return Err(StatsError::DataPathNotFound(path.to_path_buf()));
    }

    let file = std::fs::File::open(path).map_err(|source| StatsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut posts = Vec::new();
    for data in json_lines(std::io::BufReader::new(file), path) {
        match map_to_post(&data, tz) {
            Some(post) => posts.push(post),
            None => debug!("Skipping post without id in {}", path.display()),
        }
    }

    Ok(posts)
}

/// Load every view under `dir`, oldest first.
pub fn load_views(dir: &Path, tz: &TimezoneHandler) -> Vec<ViewEvent> {
    load_events(dir, tz, map_to_view)
}

/// Load every visit under `dir`, oldest first.
pub fn load_visits(dir: &Path, tz: &TimezoneHandler) -> Vec<VisitEvent> {
    load_events(dir, tz, map_to_visit)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn load_events<E, F>(dir: &Path, tz: &TimezoneHandler, map: F) -> Vec<E>
where
    E: TrafficEvent,
    F: Fn(&Value, &TimezoneHandler) -> Option<E>,
{
    let mut events = Vec::new();

    for file_path in find_jsonl_files(dir) {
        let file = match std::fs::File::open(&file_path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to read file {}: {}", file_path.display(), e);
                continue;
            }
        };

        let mut read = 0u64;
        let mut mapped = 0u64;
        for data in json_lines(std::io::BufReader::new(file), &file_path) {
            read += 1;
            if let Some(event) = map(&data, tz) {
                mapped += 1;
                events.push(event);
            }
        }

        debug!(
            "File {}: {} read, {} mapped",
            file_path.display(),
            read,
            mapped
        );
    }

    events.sort_by_key(|e| e.occurred_at());
    events
}

/// Non-empty lines of `reader` that parse as JSON.
fn json_lines<R: BufRead>(reader: R, source: &Path) -> Vec<Value> {
    let mut values = Vec::new();

    for line_result in reader.lines() {
        let line = match line_result {
            Ok(l) => l,
            Err(_) => continue,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str(trimmed) {
            Ok(v) => values.push(v),
            Err(e) => {
                debug!("Failed to parse JSON line in {}: {}", source.display(), e);
            }
        }
    }

    values
}

/// First of `keys` holding a string or number, as a non-empty string.
fn id_field(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match data.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First of `keys` holding a string.
fn str_field(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn timestamp_field(data: &Value, keys: &[&str], tz: &TimezoneHandler) -> Option<DateTime<Utc>> {
    str_field(data, keys).and_then(|s| tz.parse_timestamp(&s))
}

fn map_to_post(data: &Value, tz: &TimezoneHandler) -> Option<ContentItem> {
    let id = id_field(data, &["id"])?;
    let owner_id = id_field(data, &["owner_id", "user_id"]).unwrap_or_default();

    let published_at = match str_field(data, &["published_at"]) {
        Some(raw) => {
            let parsed = tz.parse_timestamp(&raw);
            if parsed.is_none() {
                warn!("Post {} has malformed published_at; treating as draft", id);
            }
            parsed
        }
        None => None,
    };

    Some(ContentItem {
        id,
        owner_id,
        title: str_field(data, &["title"]).unwrap_or_default(),
        body: str_field(data, &["body"]),
        published_at,
    })
}

fn map_to_view(data: &Value, tz: &TimezoneHandler) -> Option<ViewEvent> {
    Some(ViewEvent {
        content_item_id: id_field(data, &["content_item_id", "post_id"])?,
        occurred_at: timestamp_field(data, &["occurred_at", "created_at"], tz)?,
        session_fingerprint: str_field(data, &["session_fingerprint", "session_id"])
            .unwrap_or_default(),
    })
}

fn map_to_visit(data: &Value, tz: &TimezoneHandler) -> Option<VisitEvent> {
    Some(VisitEvent {
        content_item_id: id_field(data, &["content_item_id", "post_id"])?,
        occurred_at: timestamp_field(data, &["occurred_at", "created_at"], tz)?,
        referrer: str_field(data, &["referrer", "referer"]).filter(|r| !r.trim().is_empty()),
        originating_ip: str_field(data, &["originating_ip", "ip"]).unwrap_or_default(),
        session_fingerprint: str_field(data, &["session_fingerprint", "session_id"])
            .unwrap_or_default(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
