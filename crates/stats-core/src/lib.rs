//! Core types and pure helpers for the Canvas statistics engine.
//!
//! Holds the event and summary data model, the error type, timezone-aware
//! bucketing helpers, trend and read-time maths, display formatting and the
//! CLI settings layer.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, StatsError};
