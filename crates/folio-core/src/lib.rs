#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for portfolio analytics.
//!
//! This crate provides the foundational abstractions shared by the engine and
//! the metrics stores:
//!
//! - [`MetricsSource`](provider::MetricsSource) - Read interface over daily per-stock metrics
//! - [`StockDirectory`](provider::StockDirectory) - Symbol to stock resolution
//! - [`resolve_fields`](field::resolve_fields) - Minimal column set for a study
//! - [`AnalysisRequest`](study::AnalysisRequest) - Typed analysis configuration
//! - [`PortfolioFrame`](frame::PortfolioFrame) / [`AlignedFrame`](frame::AlignedFrame) - Pipeline frames

/// Error types for analytics operations.
pub mod error;
/// Metric columns and field resolution.
pub mod field;
/// Long and wide frames.
pub mod frame;
/// Collaborator traits.
pub mod provider;
/// Study types and analysis parameters.
pub mod study;
/// Core data types (Symbol, Stock, Portfolio, MetricsRow, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{AnalyticsError, Result};
pub use field::{BASE_FIELDS, MetricField, resolve_fields};
pub use frame::{AlignedFrame, DatedSeries, LabeledSeries, Observation, PortfolioFrame};
pub use provider::{DataSource, MetricsSource, StockDirectory};
pub use study::{
    AnalysisRequest, DividendKind, DividendParams, MarketValueChart, MarketValueParams,
    ProfitabilityParams, ReturnDisplay, StudyParams, StudyType, TimePeriod, ViewType,
};
pub use types::{
    DividendFilter, HoldingActivity, MetricsRow, Portfolio, PortfolioId, Stock, StockId, Symbol,
};
