use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Post and author traffic statistics for Canvas
#[derive(Parser, Debug, Clone)]
#[command(
    name = "canvas-stats",
    about = "Post and author traffic statistics for Canvas",
    version
)]
pub struct Settings {
    /// Report to produce
    #[arg(long, default_value = "user", value_parser = ["post", "user", "all", "digest"])]
    pub view: String,

    /// Post id (required for the post view)
    #[arg(long)]
    pub post: Option<String>,

    /// Owner id (required for the user and digest views)
    #[arg(long)]
    pub user: Option<String>,

    /// Directory holding posts.jsonl, views/ and visits/
    #[arg(long, env = "CANVAS_STATS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Server timezone used for day and month buckets (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Number of referrers to report
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top_referers: u32,

    /// Days covered by the daily graph
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=366))]
    pub graph_days: u32,

    /// Output format
    #[arg(long, default_value = "json", value_parser = ["json", "text"])]
    pub output: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.canvas-stats/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_referers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_days: Option<u32>,
}

/// Root of the per-user state directory, `~/.canvas-stats`.
pub fn state_dir() -> PathBuf {
    state_dir_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// State directory rooted at `base_dir` (used for testing).
pub fn state_dir_in(base_dir: &std::path::Path) -> PathBuf {
    base_dir.join(".canvas-stats")
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        state_dir().join("last_used.json")
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        state_dir_in(base_dir).join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. The view and the post/user ids are per-run and
        // never loaded from last-used.
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "data_dir") && settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "output") {
            if let Some(v) = last.output {
                settings.output = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top_referers") {
            if let Some(v) = last.top_referers {
                settings.top_referers = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "graph_days") {
            if let Some(v) = last.graph_days {
                settings.graph_days = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Directory the loader reads from, defaulting to `~/.canvas-stats/data`.
    pub fn data_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| state_dir().join("data"))
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            timezone: Some(s.timezone.clone()),
            data_dir: s.data_dir.clone(),
            output: Some(s.output.clone()),
            top_referers: Some(s.top_referers),
            graph_days: Some(s.graph_days),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
