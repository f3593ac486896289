//! Core error types for dayplan-core.
//!
//! This module defines the error hierarchy using thiserror. Only two kinds of
//! failure abort a run: configuration errors (the downstream invariants cannot
//! hold) and genuinely malformed API usage. Everything else -- malformed input
//! items, unplaceable items, availability lookup timeouts -- is represented in
//! the returned `Schedule` as data.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Core error type for dayplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors. Fatal: the run aborts before allocation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors for individual input items.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Availability lookup errors.
    #[error("Availability error: {0}")]
    Availability(#[from] AvailabilityError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
///
/// Any of these aborts a run before allocation starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Two protected blocks materialize to overlapping intervals on the same day
    #[error("Protected blocks '{first}' and '{second}' overlap on the target day")]
    OverlappingBlocks { first: String, second: String },

    /// A block or segment definition produced an empty or inverted interval
    #[error("Invalid time range for '{name}': {message}")]
    InvalidRange { name: String, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors for input items.
///
/// These never abort a run: the offending item is dropped and counted in the
/// schedule's dropped-items report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Flexible window bounds are inverted
    #[error("Invalid window bounds: earliest ({earliest}) is after latest ({latest})")]
    InvalidBounds {
        earliest: DateTime<Utc>,
        latest: DateTime<Utc>,
    },

    /// Flexible window cannot hold the requested duration
    #[error("Window of {window_minutes} minutes cannot hold a {duration_minutes} minute item")]
    WindowTooSmall {
        duration_minutes: i64,
        window_minutes: i64,
    },

    /// Required temporal field missing on a raw input item
    #[error("Missing required field '{field}' on item '{item_id}'")]
    MissingField { item_id: String, field: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors from attendee availability lookups.
///
/// Always non-fatal: the caller falls back to "assume busy" for the whole
/// queried window.
#[derive(Error, Debug)]
pub enum AvailabilityError {
    /// Lookup did not complete within the configured timeout
    #[error("Availability lookup for '{attendee_id}' timed out after {timeout_secs}s")]
    Timeout {
        attendee_id: String,
        timeout_secs: u64,
    },

    /// Provider-side failure
    #[error("Availability lookup for '{attendee_id}' failed: {message}")]
    LookupFailed {
        attendee_id: String,
        message: String,
    },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
