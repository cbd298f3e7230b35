#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Portfolio analytics over precomputed daily metrics.
//!
//! This crate re-exports the core types and the metrics stores, and provides a
//! [`StudyEngine`] that runs the analysis pipeline for one portfolio:
//! fetch, align, calculate and summarise.
//!
//! # Features
//!
//! - `store-sqlite` - SQLite-backed metrics store (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use folio::{AnalysisRequest, SqliteMetricsStore, StudyEngine};
//!
//! #[tokio::main]
//! async fn main() -> folio::Result<()> {
//!     let store = SqliteMetricsStore::new("portfolio.db")?;
//!     let portfolio = store.load_portfolio(1, "Main")?;
//!     let engine = StudyEngine::new(Arc::new(store), portfolio);
//!
//!     let request = AnalysisRequest::from_json(r#"{
//!         "selected_stocks": ["CBA.AX", "BHP.AX"],
//!         "start_date": "2024-01-01",
//!         "end_date": "2024-06-30",
//!         "study": { "study_type": "market_value", "view_type": "portfolio_total" }
//!     }"#)?;
//!
//!     let analysis = engine.analyse(&request).await?;
//!     for (label, value) in analysis.stats.iter() {
//!         println!("{label}: {value}");
//!     }
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use folio_core::*;

// Store implementations
#[cfg(feature = "store-sqlite")]
pub use folio_store::SqliteMetricsStore;
pub use folio_store::InMemoryMetricsStore;

/// Active-holdings query.
pub mod active;
/// Time alignment of long frames.
pub mod align;
/// Allocation snapshots.
pub mod distribution;
/// Dividend series.
pub mod dividends;
/// Analysis engine.
pub mod engine;
/// Concurrent per-stock retrieval.
pub mod fetcher;
/// Display formatting.
pub mod format;
/// Return aggregation.
pub mod returns;
/// Summary statistics.
pub mod stats;
/// Study dispatch.
pub mod strategy;

pub use engine::{Analysis, StudyEngine};
pub use stats::SummaryStats;
pub use strategy::{Calculation, StudySeries};
