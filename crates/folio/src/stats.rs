//! Summary statistics for each study.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use folio_core::{
    DividendKind, DividendParams, MetricField, PortfolioFrame, ProfitabilityParams, Result,
    ReturnDisplay, StudyParams,
};
use serde::Serialize;

use crate::dividends::{DRP_VALUE, DRP_VALUE_TOTAL, with_drp_values};
use crate::format::{currency, fixed, or_na, percent};

/// Ordered label to display-value pairs for one analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    entries: Vec<(String, String)>,
}

impl SummaryStats {
    /// Create an empty set of statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statistic, replacing any existing value under the same label.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    /// Look up a statistic by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate `(label, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Number of statistics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no statistics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the statistics for a study from the retrieved long frame.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if the frame
/// lacks a column the study reads.
pub fn summarize(frame: &PortfolioFrame, study: &StudyParams) -> Result<SummaryStats> {
    match study {
        StudyParams::MarketValue(_) => market_value_stats(frame),
        StudyParams::Profitability(params) => profitability_stats(frame, params),
        StudyParams::DividendPerformance(params) => dividend_stats(frame, params),
        StudyParams::Distribution => distribution_stats(frame),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation; undefined below two points.
fn std_dev(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values
        .iter()
        .map(|x| {
            let d = x - m;
            d * d
        })
        .sum::<f64>()
        / (n as f64 - 1.0);
    Some(var.sqrt())
}

fn max(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().reduce(f64::max)
}

fn min(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    values.into_iter().reduce(f64::min)
}

/// Largest and smallest entries by value; the first wins ties.
fn extremes(values: &[(String, f64)]) -> Option<(&(String, f64), &(String, f64))> {
    let mut iter = values.iter();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(hi, lo), entry| {
        (
            if entry.1 > hi.1 { entry } else { hi },
            if entry.1 < lo.1 { entry } else { lo },
        )
    }))
}

/// Each stock's last set value of a column, in symbol order.
fn last_values(frame: &PortfolioFrame, column: MetricField) -> Result<Vec<(String, f64)>> {
    let mut last: BTreeMap<String, Option<f64>> = BTreeMap::new();
    for obs in frame.observations(column)? {
        let entry = last.entry(obs.stock).or_insert(None);
        if obs.value.is_some() {
            *entry = obs.value;
        }
    }
    Ok(last
        .into_iter()
        .filter_map(|(stock, value)| value.map(|v| (stock, v)))
        .collect())
}

/// Market value: total of each stock's last known value, count and extremes.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if
/// `market_value` is absent.
pub fn market_value_stats(frame: &PortfolioFrame) -> Result<SummaryStats> {
    let latest = last_values(frame, MetricField::MarketValue)?;
    let holding = |entry: &(String, f64)| format!("{} ({})", entry.0, currency(entry.1));

    let mut stats = SummaryStats::new();
    stats.insert(
        "Total Portfolio Value",
        currency(latest.iter().map(|(_, v)| v).sum()),
    );
    stats.insert("Number of Holdings", frame.distinct_stocks()?.len().to_string());
    let bounds = extremes(&latest);
    stats.insert(
        "Largest Holding",
        bounds.map_or_else(|| "N/A".to_string(), |(hi, _)| holding(hi)),
    );
    stats.insert(
        "Smallest Holding",
        bounds.map_or_else(|| "N/A".to_string(), |(_, lo)| holding(lo)),
    );
    Ok(stats)
}

/// Profitability: mean, best, worst and volatility of the selected return metric.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if the metric
/// column is absent.
pub fn profitability_stats(
    frame: &PortfolioFrame,
    params: &ProfitabilityParams,
) -> Result<SummaryStats> {
    let values: Vec<f64> = frame.values(params.metric())?.into_iter().flatten().collect();
    let format: fn(f64) -> String = match params.chart_type {
        ReturnDisplay::DollarValue => currency,
        ReturnDisplay::Percentage | ReturnDisplay::AggregatedPercentage => |v| percent(v, 2),
    };

    let mut stats = SummaryStats::new();
    stats.insert("Average Return", or_na(mean(&values), format));
    stats.insert("Best Return", or_na(max(values.iter().copied()), format));
    stats.insert("Worst Return", or_na(min(values.iter().copied()), format));
    stats.insert("Volatility", or_na(std_dev(&values), format));
    Ok(stats)
}

/// Dividend performance: total received, average and largest payment, payment count.
///
/// Cash figures are dollars from the cash columns, DRP figures are share
/// counts from the DRP columns, and combined figures are dollars from cash
/// plus DRP value. The total is the largest running total in the frame.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if a dividend
/// column is absent.
pub fn dividend_stats(frame: &PortfolioFrame, params: &DividendParams) -> Result<SummaryStats> {
    let (totals, payments, format): (Vec<Option<f64>>, Vec<Option<f64>>, fn(f64) -> String) =
        match params.chart_type {
            DividendKind::Cash => (
                frame.values(MetricField::CashDividendsTotal)?,
                frame.values(MetricField::CashDividend)?,
                currency,
            ),
            DividendKind::Drp => (
                frame.values(MetricField::DrpSharesTotal)?,
                frame.values(MetricField::DrpShare)?,
                fixed,
            ),
            DividendKind::Combined => {
                let valued = with_drp_values(frame)?;
                let sum = |a: Vec<Option<f64>>, b: Vec<Option<f64>>| -> Vec<Option<f64>> {
                    a.into_iter()
                        .zip(b)
                        .map(|(a, b)| match (a, b) {
                            (None, None) => None,
                            (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
                        })
                        .collect()
                };
                (
                    sum(
                        valued.values(MetricField::CashDividendsTotal)?,
                        valued.values(DRP_VALUE_TOTAL)?,
                    ),
                    sum(
                        valued.values(MetricField::CashDividend)?,
                        valued.values(DRP_VALUE)?,
                    ),
                    currency,
                )
            }
        };

    let paid: Vec<f64> = payments.into_iter().flatten().filter(|v| *v > 0.0).collect();

    let mut stats = SummaryStats::new();
    stats.insert(
        "Total Received",
        or_na(max(totals.into_iter().flatten()), format),
    );
    stats.insert("Average Per Period", or_na(mean(&paid), format));
    stats.insert(
        "Largest Single Payment",
        or_na(max(paid.iter().copied()), format),
    );
    stats.insert("Number of Payments", paid.len().to_string());
    Ok(stats)
}

/// Distribution: holdings as of the latest date with allocation shares.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if
/// `market_value` is absent.
pub fn distribution_stats(frame: &PortfolioFrame) -> Result<SummaryStats> {
    let observations = frame.observations(MetricField::MarketValue)?;
    let latest: Option<NaiveDate> = observations.iter().map(|o| o.date).max();

    let mut holdings: BTreeMap<String, f64> = BTreeMap::new();
    for obs in observations.into_iter().filter(|o| Some(o.date) == latest) {
        *holdings.entry(obs.stock).or_insert(0.0) += obs.value.unwrap_or(0.0);
    }
    let holdings: Vec<(String, f64)> = holdings.into_iter().collect();
    let total: f64 = holdings.iter().map(|(_, v)| v).sum();

    let allocation = |entry: &(String, f64)| {
        if total > 0.0 {
            format!("{} ({})", entry.0, percent(entry.1 / total * 100.0, 1))
        } else {
            format!("{} (N/A)", entry.0)
        }
    };

    let mut stats = SummaryStats::new();
    stats.insert("Number of Holdings", holdings.len().to_string());
    stats.insert("Total Portfolio Value", currency(total));
    let bounds = extremes(&holdings);
    stats.insert(
        "Largest Allocation",
        bounds.map_or_else(|| "N/A".to_string(), |(hi, _)| allocation(hi)),
    );
    stats.insert(
        "Smallest Allocation",
        bounds.map_or_else(|| "N/A".to_string(), |(_, lo)| allocation(lo)),
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{TimePeriod, ViewType};
    use polars::prelude::{Column, DataFrame};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn frame() -> PortfolioFrame {
        let df = DataFrame::new(vec![
            Column::new("date".into(), vec![date(1), date(2), date(1), date(2), date(1)]),
            Column::new(
                "market_value".into(),
                vec![Some(1000.0), Some(1500.0), Some(400.0), None, Some(100.0)],
            ),
            Column::new(
                "total_return".into(),
                vec![Some(10.0), Some(20.0), Some(-5.0), Some(15.0), Some(0.0)],
            ),
            Column::new(
                "cash_dividend".into(),
                vec![Some(0.0), Some(25.0), Some(10.0), Some(0.0), None],
            ),
            Column::new(
                "cash_dividends_total".into(),
                vec![Some(0.0), Some(25.0), Some(10.0), Some(10.0), None],
            ),
            Column::new(
                "drp_share".into(),
                vec![None, None, Some(0.0), Some(2.0), None],
            ),
            Column::new(
                "drp_shares_total".into(),
                vec![None, None, Some(0.0), Some(2.0), None],
            ),
            Column::new(
                "close_price".into(),
                vec![Some(50.0), Some(50.0), Some(20.0), Some(20.0), Some(5.0)],
            ),
            Column::new("stock".into(), vec!["CBA", "CBA", "BHP", "BHP", "WES"]),
        ])
        .unwrap();
        PortfolioFrame::new(df)
    }

    #[test]
    fn test_summary_stats_order_and_replace() {
        let mut stats = SummaryStats::new();
        stats.insert("b", "1");
        stats.insert("a", "2");
        stats.insert("b", "3");
        let pairs: Vec<_> = stats.iter().collect();
        assert_eq!(pairs, vec![("b", "3"), ("a", "2")]);
        assert_eq!(stats.get("a"), Some("2"));
        assert_eq!(stats.get("c"), None);
    }

    #[test]
    fn test_market_value_stats() {
        let stats = market_value_stats(&frame()).unwrap();
        // CBA 1500 + BHP 400 (last set value) + WES 100
        assert_eq!(stats.get("Total Portfolio Value"), Some("$2,000.00"));
        assert_eq!(stats.get("Number of Holdings"), Some("3"));
        assert_eq!(stats.get("Largest Holding"), Some("CBA ($1,500.00)"));
        assert_eq!(stats.get("Smallest Holding"), Some("WES ($100.00)"));
    }

    #[test]
    fn test_profitability_stats() {
        let params = ProfitabilityParams {
            view_type: ViewType::IndividualStocks,
            chart_type: ReturnDisplay::DollarValue,
            calculation_type: TimePeriod::Cumulative,
            zero_at_start: false,
            deltas: false,
        };
        let stats = profitability_stats(&frame(), &params).unwrap();
        assert_eq!(stats.get("Average Return"), Some("$8.00"));
        assert_eq!(stats.get("Best Return"), Some("$20.00"));
        assert_eq!(stats.get("Worst Return"), Some("-$5.00"));
        assert_eq!(stats.len(), 4);
    }

    #[test]
    fn test_profitability_requires_metric_column() {
        let params = ProfitabilityParams {
            chart_type: ReturnDisplay::Percentage,
            ..Default::default()
        };
        assert!(profitability_stats(&frame(), &params).is_err());
    }

    #[test]
    fn test_cash_dividend_stats() {
        let params = DividendParams {
            chart_type: DividendKind::Cash,
            ..Default::default()
        };
        let stats = dividend_stats(&frame(), &params).unwrap();
        assert_eq!(stats.get("Total Received"), Some("$25.00"));
        assert_eq!(stats.get("Average Per Period"), Some("$17.50"));
        assert_eq!(stats.get("Largest Single Payment"), Some("$25.00"));
        assert_eq!(stats.get("Number of Payments"), Some("2"));
    }

    #[test]
    fn test_drp_dividend_stats_are_shares() {
        let params = DividendParams {
            chart_type: DividendKind::Drp,
            ..Default::default()
        };
        let stats = dividend_stats(&frame(), &params).unwrap();
        assert_eq!(stats.get("Total Received"), Some("2.00"));
        assert_eq!(stats.get("Number of Payments"), Some("1"));
    }

    #[test]
    fn test_combined_dividend_stats_are_dollars() {
        let params = DividendParams {
            chart_type: DividendKind::Combined,
            ..Default::default()
        };
        let stats = dividend_stats(&frame(), &params).unwrap();
        // BHP on the 2nd: 10 cash total + 2 shares * $20
        assert_eq!(stats.get("Total Received"), Some("$50.00"));
        assert_eq!(stats.get("Largest Single Payment"), Some("$40.00"));
        assert_eq!(stats.get("Number of Payments"), Some("3"));
    }

    #[test]
    fn test_distribution_stats_use_latest_date() {
        let stats = distribution_stats(&frame()).unwrap();
        // Only CBA has a set value on the 2nd; BHP's row is null.
        assert_eq!(stats.get("Number of Holdings"), Some("2"));
        assert_eq!(stats.get("Total Portfolio Value"), Some("$1,500.00"));
        assert_eq!(stats.get("Largest Allocation"), Some("CBA (100.0%)"));
        assert_eq!(stats.get("Smallest Allocation"), Some("BHP (0.0%)"));
    }

    #[test]
    fn test_empty_frame_stats() {
        let stats = summarize(&PortfolioFrame::empty(), &StudyParams::Distribution).unwrap();
        assert_eq!(stats.get("Number of Holdings"), Some("0"));
        assert_eq!(stats.get("Largest Allocation"), Some("N/A"));
    }

    #[test]
    fn test_std_dev_needs_two_points() {
        assert_eq!(std_dev(&[1.0]), None);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138_089_935).abs() < 1e-6);
    }
}
