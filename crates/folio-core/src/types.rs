//! Core data types for portfolio analytics.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Yahoo-style ticker identifying a holding
//! - [`Stock`] - A resolved stock identity
//! - [`Portfolio`] - The authoritative set of holdings
//! - [`MetricsRow`] - One stock's precomputed metrics for one date
//! - [`DividendFilter`] - Dividend activity selector for the active-holdings query
//! - [`HoldingActivity`] - Per-stock activity aggregate over a date range

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::field::MetricField;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation, including when deserialised.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Storage identifier of a stock.
pub type StockId = i64;

/// Storage identifier of a portfolio.
pub type PortfolioId = i64;

/// A stock identity as resolved by the portfolio directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    /// Storage identifier.
    pub id: StockId,
    /// Yahoo ticker.
    pub yahoo_symbol: Symbol,
    /// Display name.
    pub name: Option<String>,
}

impl Stock {
    /// Creates a stock identity without a display name.
    #[must_use]
    pub fn new(id: StockId, yahoo_symbol: impl Into<Symbol>) -> Self {
        Self {
            id,
            yahoo_symbol: yahoo_symbol.into(),
            name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A portfolio and its member stocks keyed by symbol.
///
/// The portfolio's membership is authoritative: anything the store reports
/// that is not in here is ignored by the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Storage identifier.
    pub id: PortfolioId,
    /// Display name.
    pub name: String,
    stocks: BTreeMap<Symbol, Stock>,
}

impl Portfolio {
    /// Creates an empty portfolio.
    #[must_use]
    pub fn new(id: PortfolioId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            stocks: BTreeMap::new(),
        }
    }

    /// Adds a stock, replacing any stock with the same symbol.
    #[must_use]
    pub fn with_stock(mut self, stock: Stock) -> Self {
        self.add_stock(stock);
        self
    }

    /// Adds a stock, replacing any stock with the same symbol.
    pub fn add_stock(&mut self, stock: Stock) {
        self.stocks.insert(stock.yahoo_symbol.clone(), stock);
    }

    /// Looks up a stock by symbol.
    #[must_use]
    pub fn get_stock(&self, symbol: &Symbol) -> Option<&Stock> {
        self.stocks.get(symbol)
    }

    /// Iterates the member stocks in symbol order.
    pub fn stocks(&self) -> impl Iterator<Item = &Stock> {
        self.stocks.values()
    }

    /// Returns the number of member stocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    /// Returns true if the portfolio has no stocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}

/// One stock's precomputed metrics for one date.
///
/// Every metric is optional; a `None` is stored as `NULL` and surfaces as a
/// missing value in frames.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    /// Trading date.
    pub date: NaiveDate,
    /// Market value of the holding.
    pub market_value: Option<f64>,
    /// Total dollar return to date.
    pub total_return: Option<f64>,
    /// Dollar profit/loss for the day.
    pub daily_pl: Option<f64>,
    /// Daily profit/loss as a percentage of invested capital.
    pub daily_pl_pct: Option<f64>,
    /// Total return as a percentage of invested capital.
    pub total_return_pct: Option<f64>,
    /// Time-weighted cumulative return percentage.
    pub cumulative_return_pct: Option<f64>,
    /// Cash dividend paid on the day.
    pub cash_dividend: Option<f64>,
    /// Running total of cash dividends.
    pub cash_dividends_total: Option<f64>,
    /// Shares received through the dividend reinvestment plan on the day.
    pub drp_share: Option<f64>,
    /// Running total of DRP shares.
    pub drp_shares_total: Option<f64>,
    /// Closing price.
    pub close_price: Option<f64>,
    /// Shares held at the close.
    pub total_shares_owned: Option<f64>,
    /// Cost basis of the holding.
    pub cost_basis: Option<f64>,
    /// Realised profit/loss to date.
    pub realised_pl: Option<f64>,
    /// Unrealised profit/loss.
    pub unrealised_pl: Option<f64>,
}

impl MetricsRow {
    /// Creates a row with every metric unset.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }

    /// Sets a metric by field. Setting [`MetricField::Date`] is ignored.
    #[must_use]
    pub fn with(mut self, field: MetricField, value: f64) -> Self {
        if let Some(slot) = self.slot_mut(field) {
            *slot = Some(value);
        }
        self
    }

    /// Returns a metric by field. [`MetricField::Date`] has no numeric value.
    #[must_use]
    pub fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::Date => None,
            MetricField::MarketValue => self.market_value,
            MetricField::TotalReturn => self.total_return,
            MetricField::DailyPl => self.daily_pl,
            MetricField::DailyPlPct => self.daily_pl_pct,
            MetricField::TotalReturnPct => self.total_return_pct,
            MetricField::CumulativeReturnPct => self.cumulative_return_pct,
            MetricField::CashDividend => self.cash_dividend,
            MetricField::CashDividendsTotal => self.cash_dividends_total,
            MetricField::DrpShare => self.drp_share,
            MetricField::DrpSharesTotal => self.drp_shares_total,
            MetricField::ClosePrice => self.close_price,
            MetricField::TotalSharesOwned => self.total_shares_owned,
            MetricField::CostBasis => self.cost_basis,
            MetricField::RealisedPl => self.realised_pl,
            MetricField::UnrealisedPl => self.unrealised_pl,
        }
    }

    fn slot_mut(&mut self, field: MetricField) -> Option<&mut Option<f64>> {
        let slot = match field {
            MetricField::Date => return None,
            MetricField::MarketValue => &mut self.market_value,
            MetricField::TotalReturn => &mut self.total_return,
            MetricField::DailyPl => &mut self.daily_pl,
            MetricField::DailyPlPct => &mut self.daily_pl_pct,
            MetricField::TotalReturnPct => &mut self.total_return_pct,
            MetricField::CumulativeReturnPct => &mut self.cumulative_return_pct,
            MetricField::CashDividend => &mut self.cash_dividend,
            MetricField::CashDividendsTotal => &mut self.cash_dividends_total,
            MetricField::DrpShare => &mut self.drp_share,
            MetricField::DrpSharesTotal => &mut self.drp_shares_total,
            MetricField::ClosePrice => &mut self.close_price,
            MetricField::TotalSharesOwned => &mut self.total_shares_owned,
            MetricField::CostBasis => &mut self.cost_basis,
            MetricField::RealisedPl => &mut self.realised_pl,
            MetricField::UnrealisedPl => &mut self.unrealised_pl,
        };
        Some(slot)
    }
}

/// Dividend activity that qualifies a holding as active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendFilter {
    /// Positive cash dividend.
    Cash,
    /// Positive DRP share allotment.
    Drp,
    /// Either of the above.
    Combined,
}

impl DividendFilter {
    /// Returns true if a row's dividend values qualify under this filter.
    #[must_use]
    pub fn qualifies(&self, cash_dividend: Option<f64>, drp_share: Option<f64>) -> bool {
        let cash = cash_dividend.is_some_and(|v| v > 0.0);
        let drp = drp_share.is_some_and(|v| v > 0.0);
        match self {
            Self::Cash => cash,
            Self::Drp => drp,
            Self::Combined => cash || drp,
        }
    }
}

/// Per-stock activity aggregated over a date range by the metrics store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldingActivity {
    /// Storage identifier of the stock.
    pub stock_id: StockId,
    /// Yahoo ticker as recorded by the store.
    pub yahoo_symbol: Symbol,
    /// Display name as recorded by the store.
    pub name: Option<String>,
    /// Rows in range.
    pub total_days: u32,
    /// Rows in range with a positive market value.
    pub active_days: u32,
    /// Largest market value in range.
    pub max_value: Option<f64>,
    /// Rows in range with qualifying dividend activity, when a filter was given.
    pub dividend_days: Option<u32>,
}

impl HoldingActivity {
    /// Returns true if the holding had at least one qualifying day.
    ///
    /// With a dividend filter only dividend days count; otherwise days with a
    /// positive market value do.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self.dividend_days {
            Some(days) => days > 0,
            None => self.active_days > 0,
        }
    }
}
