//! Error types for portfolio analytics.
//!
//! This module defines [`AnalyticsError`] which covers every failure the
//! analysis pipeline can surface. An empty selection is not an error (it is an
//! empty frame), and an unrecognised study type is not an error either (it
//! falls back to the distribution study).

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that can occur while retrieving or analysing portfolio metrics.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A read against the metrics store failed. Fatal to the current analysis.
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// A metric column the caller asked for is absent from the retrieved frame.
    #[error("Missing metric column '{column}' (available: {available:?})")]
    MissingMetricColumn {
        /// The column that was requested.
        column: String,
        /// The columns the frame actually carries.
        available: Vec<String>,
    },

    /// An invalid parameter or parameter combination was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A DataFrame operation failed.
    #[error("Frame error: {0}")]
    Frame(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<PolarsError> for AnalyticsError {
    fn from(e: PolarsError) -> Self {
        Self::Frame(e.to_string())
    }
}

/// Result type alias using [`AnalyticsError`].
pub type Result<T> = std::result::Result<T, AnalyticsError>;
