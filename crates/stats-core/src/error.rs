use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the statistics engine and its loaders.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The content item does not exist or is not visible yet.
    ///
    /// Drafts, scheduled posts and missing posts all map here so callers
    /// cannot tell them apart.
    #[error("Post not found: {0}")]
    NotFound(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The expected data directory or posts file does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A view was requested without the identifier it needs.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StatsError {
    /// Whether this error should be surfaced as an absence rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StatsError::NotFound(_))
    }
}

/// Convenience alias used throughout the stats crates.
pub type Result<T> = std::result::Result<T, StatsError>;
