#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Metrics store implementations for the folio analytics engine.
//!
//! This crate provides implementations of the [`MetricsSource`] trait from `folio-core`:
//!
//! - [`SqliteMetricsStore`] - Persistent SQLite-based store (default, requires `sqlite` feature)
//! - [`InMemoryMetricsStore`] - Simple in-memory store for testing

/// In-memory metrics store.
pub mod memory;

/// SQLite-based metrics store.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use folio_core::MetricsSource;

// Re-export implementations
pub use memory::InMemoryMetricsStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMetricsStore;
