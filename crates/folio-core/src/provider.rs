//! Collaborator traits consumed by the analytics engine.
//!
//! - [`DataSource`] - Base trait for every metrics store
//! - [`MetricsSource`] - Field-projected, date-bounded reads plus the
//!   per-stock activity aggregate
//! - [`StockDirectory`] - Symbol to stock resolution

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::fmt::Debug;

use crate::{
    error::Result,
    field::MetricField,
    types::{DividendFilter, HoldingActivity, Portfolio, PortfolioId, Stock, StockId, Symbol},
};

/// Base trait for all metrics stores.
pub trait DataSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "SQLite").
    fn name(&self) -> &str;

    /// Returns a description of this source.
    fn description(&self) -> &str;
}

/// Read interface over the per-stock daily metrics records.
#[async_trait]
pub trait MetricsSource: DataSource {
    /// Fetches one stock's rows within `[start, end]`, ordered by date.
    ///
    /// The returned DataFrame has exactly the columns in `fields`, in the same
    /// order; `date` is a Date column and every other field is Float64 with
    /// nulls for unset values. A stock with no rows in range yields a frame
    /// of height zero.
    async fn fetch_rows(
        &self,
        fields: &[MetricField],
        stock_id: StockId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame>;

    /// Aggregates per-stock activity for the portfolio's members within `[start, end]`.
    ///
    /// Only stocks with at least one qualifying day are returned, ordered by
    /// symbol. With a `dividend_filter`, qualifying days are days with that
    /// dividend activity; otherwise they are days with a positive market value.
    async fn holding_activity(
        &self,
        portfolio_id: PortfolioId,
        start: NaiveDate,
        end: NaiveDate,
        dividend_filter: Option<DividendFilter>,
    ) -> Result<Vec<HoldingActivity>>;
}

/// Resolves symbols to stock identities.
pub trait StockDirectory: Send + Sync {
    /// Identifier of the portfolio this directory describes.
    fn portfolio_id(&self) -> PortfolioId;

    /// Looks up a stock by symbol.
    fn get_stock(&self, symbol: &Symbol) -> Option<&Stock>;

    /// All member stocks.
    fn all_stocks(&self) -> Vec<&Stock>;
}

impl StockDirectory for Portfolio {
    fn portfolio_id(&self) -> PortfolioId {
        self.id
    }

    fn get_stock(&self, symbol: &Symbol) -> Option<&Stock> {
        Self::get_stock(self, symbol)
    }

    fn all_stocks(&self) -> Vec<&Stock> {
        self.stocks().collect()
    }
}
