//! Statistics layer for Canvas.
//!
//! Loads posts and traffic events from JSONL files, normalises referrers and
//! turns event collections into per-post, per-scope and weekly digest
//! summaries.

pub mod aggregator;
pub mod digest;
pub mod reader;
pub mod referrer;

pub use aggregator::{AggregatorConfig, StatsAggregator};
pub use stats_core as core;
