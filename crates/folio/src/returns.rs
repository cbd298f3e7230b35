//! Return calculations.
//!
//! Three return definitions are in play and they do not mix:
//!
//! - Dollar returns (`daily_pl`, `total_return`) sum directly across stocks.
//! - Percentage of capital (`daily_pl_pct`, `total_return_pct`) per stock; the
//!   portfolio figure is the value-weighted `sum(dollar) / sum(market_value) * 100`,
//!   never a sum or mean of per-stock percentages.
//! - Time-weighted (`cumulative_return_pct`) is precomputed per stock and used as is.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use folio_core::{
    AlignedFrame, DatedSeries, LabeledSeries, MetricField, PortfolioFrame, Result,
};

/// Value-weighted percentage: `sum(returns) / sum(values) * 100`.
///
/// Unset entries are skipped in both sums. Returns `None` when the total
/// value is zero.
#[must_use]
pub fn weighted_percentage(returns: &[Option<f64>], values: &[Option<f64>]) -> Option<f64> {
    let total_return: f64 = returns.iter().flatten().sum();
    let total_value: f64 = values.iter().flatten().sum();
    (total_value != 0.0).then(|| total_return / total_value * 100.0)
}

/// Group a column by date, collecting each date's values.
fn by_date(frame: &PortfolioFrame, column: &str) -> Result<BTreeMap<NaiveDate, Vec<Option<f64>>>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for obs in frame.observations(column)? {
        grouped.entry(obs.date).or_default().push(obs.value);
    }
    Ok(grouped)
}

/// Per-date sum of a column across stocks, unset values skipped.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if the column is absent.
pub fn per_date_sum(frame: &PortfolioFrame, column: MetricField) -> Result<DatedSeries> {
    let (dates, values) = by_date(frame, column.as_str())?
        .into_iter()
        .map(|(date, values)| (date, Some(values.into_iter().flatten().sum::<f64>())))
        .unzip();
    Ok(DatedSeries::new(dates, values))
}

/// Per-date value-weighted percentage return of the portfolio.
///
/// For each date: `sum(metric) / sum(market_value) * 100` over the stocks
/// with a row on that date. Dates with zero total value are unset.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if `metric` or
/// `market_value` is absent.
pub fn portfolio_return_totals(frame: &PortfolioFrame, metric: MetricField) -> Result<DatedSeries> {
    let returns = by_date(frame, metric.as_str())?;
    let values = by_date(frame, MetricField::MarketValue.as_str())?;

    let (dates, totals) = returns
        .into_iter()
        .map(|(date, r)| {
            let v = values.get(&date).map(Vec::as_slice).unwrap_or_default();
            (date, weighted_percentage(&r, v))
        })
        .unzip();
    Ok(DatedSeries::new(dates, totals))
}

/// Row-wise value-weighted percentage over two aligned frames.
///
/// Both frames must share the same date axis, as two metrics aligned from
/// the same long frame do.
#[must_use]
pub fn aligned_weighted_percentage(returns: &AlignedFrame, values: &AlignedFrame) -> DatedSeries {
    let totals = (0..returns.height().min(values.height()))
        .map(|i| weighted_percentage(&returns.row(i), &values.row(i)))
        .collect();
    DatedSeries::new(returns.dates().to_vec(), totals)
}

/// One raw series per stock, in the frame's stock order.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if the column is absent.
pub fn stock_series(frame: &PortfolioFrame, column: MetricField) -> Result<Vec<LabeledSeries>> {
    let mut series: Vec<LabeledSeries> = Vec::new();
    for obs in frame.observations(column)? {
        match series.iter_mut().find(|s| s.label == obs.stock) {
            Some(existing) => {
                existing.series.dates.push(obs.date);
                existing.series.values.push(obs.value);
            }
            None => series.push(LabeledSeries::new(
                obs.stock,
                DatedSeries::new(vec![obs.date], vec![obs.value]),
            )),
        }
    }
    Ok(series)
}

/// Day-over-day change against the immediately preceding point.
///
/// The first point has no predecessor and is unset, as is any point whose
/// own value or predecessor is unset.
#[must_use]
pub fn calculate_deltas(series: &DatedSeries) -> DatedSeries {
    let values = series
        .values
        .iter()
        .enumerate()
        .map(|(i, current)| {
            let previous = i.checked_sub(1).and_then(|p| series.values[p]);
            Some((*current)? - previous?)
        })
        .collect();
    DatedSeries::new(series.dates.clone(), values)
}

/// Shift a series so it starts at zero.
///
/// The offset is the first set value; unset points stay unset. An empty
/// series is returned unchanged.
#[must_use]
pub fn zero_at_start(series: &DatedSeries) -> DatedSeries {
    let Some(start) = series.values.iter().flatten().next().copied() else {
        return series.clone();
    };
    let values = series.values.iter().map(|v| v.map(|v| v - start)).collect();
    DatedSeries::new(series.dates.clone(), values)
}
