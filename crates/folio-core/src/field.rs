//! Metric columns and field resolution.
//!
//! [`MetricField`] names every column of the metrics store the engine may
//! project. [`resolve_fields`] determines the minimal, ordered, deduplicated
//! column list an analysis needs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::study::StudyType;

/// A column of the per-stock daily metrics table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    /// Trading date.
    Date,
    /// Market value of the holding.
    MarketValue,
    /// Total dollar return to date.
    TotalReturn,
    /// Dollar profit/loss for the day.
    DailyPl,
    /// Daily profit/loss percentage.
    DailyPlPct,
    /// Total return percentage of invested capital.
    TotalReturnPct,
    /// Time-weighted cumulative return percentage.
    CumulativeReturnPct,
    /// Cash dividend paid on the day.
    CashDividend,
    /// Running total of cash dividends.
    CashDividendsTotal,
    /// DRP shares allotted on the day.
    DrpShare,
    /// Running total of DRP shares.
    DrpSharesTotal,
    /// Closing price.
    ClosePrice,
    /// Shares held at the close.
    TotalSharesOwned,
    /// Cost basis of the holding.
    CostBasis,
    /// Realised profit/loss to date.
    RealisedPl,
    /// Unrealised profit/loss.
    UnrealisedPl,
}

impl MetricField {
    /// Every field, in storage column order.
    pub const ALL: [Self; 16] = [
        Self::Date,
        Self::MarketValue,
        Self::TotalReturn,
        Self::DailyPl,
        Self::DailyPlPct,
        Self::TotalReturnPct,
        Self::CumulativeReturnPct,
        Self::CashDividend,
        Self::CashDividendsTotal,
        Self::DrpShare,
        Self::DrpSharesTotal,
        Self::ClosePrice,
        Self::TotalSharesOwned,
        Self::CostBasis,
        Self::RealisedPl,
        Self::UnrealisedPl,
    ];

    /// Returns the storage column name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::MarketValue => "market_value",
            Self::TotalReturn => "total_return",
            Self::DailyPl => "daily_pl",
            Self::DailyPlPct => "daily_pl_pct",
            Self::TotalReturnPct => "total_return_pct",
            Self::CumulativeReturnPct => "cumulative_return_pct",
            Self::CashDividend => "cash_dividend",
            Self::CashDividendsTotal => "cash_dividends_total",
            Self::DrpShare => "drp_share",
            Self::DrpSharesTotal => "drp_shares_total",
            Self::ClosePrice => "close_price",
            Self::TotalSharesOwned => "total_shares_owned",
            Self::CostBasis => "cost_basis",
            Self::RealisedPl => "realised_pl",
            Self::UnrealisedPl => "unrealised_pl",
        }
    }

    /// Columns a study type always needs on top of the base columns.
    #[must_use]
    pub const fn study_columns(study: StudyType) -> &'static [Self] {
        match study {
            StudyType::MarketValue => &[Self::MarketValue],
            StudyType::Profitability => &[
                Self::TotalReturn,
                Self::MarketValue,
                Self::DailyPl,
                Self::DailyPlPct,
                Self::TotalReturnPct,
                Self::CumulativeReturnPct,
            ],
            StudyType::DividendPerformance => &[
                Self::CashDividend,
                Self::CashDividendsTotal,
                Self::DrpShare,
                Self::DrpSharesTotal,
                Self::ClosePrice,
            ],
            StudyType::Distribution => &[],
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for MetricField {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for MetricField {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| AnalyticsError::InvalidParameter(format!("Unknown metric: {s}")))
    }
}

/// Columns every query starts with.
pub const BASE_FIELDS: [MetricField; 2] = [MetricField::Date, MetricField::MarketValue];

/// Resolves the ordered, deduplicated list of columns to retrieve.
///
/// The list always starts with `date` and `market_value`, followed by the
/// study's fixed columns, the caller's single metric and then the caller's
/// metric list. First occurrence wins, so query results map positionally onto
/// the returned list.
#[must_use]
pub fn resolve_fields(
    study: StudyType,
    metric: Option<MetricField>,
    metrics: &[MetricField],
) -> Vec<MetricField> {
    let candidates = BASE_FIELDS
        .iter()
        .chain(MetricField::study_columns(study))
        .chain(metric.iter())
        .chain(metrics);

    let mut fields = Vec::with_capacity(BASE_FIELDS.len() + metrics.len() + 6);
    for field in candidates {
        if !fields.contains(field) {
            fields.push(*field);
        }
    }

    debug!(?study, fields = ?fields, "Resolved query fields");
    fields
}
