//! Study dispatch: which calculation a study configuration runs.
//!
//! Every recognised combination of study, chart and view maps to exactly one
//! [`Calculation`]; combinations without a defined calculation are rejected
//! when the lookup is made.

use folio_core::{
    AlignedFrame, AnalyticsError, DividendKind, DividendParams, LabeledSeries, MarketValueChart,
    MarketValueParams, MetricField, PortfolioFrame, ProfitabilityParams, Result, ReturnDisplay,
    StudyParams, Symbol, TimePeriod, ViewType,
};
use serde::Serialize;
use tracing::debug;

use crate::align::{align, row_totals, stacked};
use crate::distribution::{DistributionSnapshot, timeline};
use crate::dividends::dividend_frame;
use crate::returns::{
    aligned_weighted_percentage, calculate_deltas, per_date_sum, portfolio_return_totals,
    stock_series, zero_at_start,
};

/// Legend label of the market value portfolio total.
pub const TOTAL_PORTFOLIO: &str = "Total Portfolio";

/// Legend label of return and single-stream dividend portfolio totals.
pub const PORTFOLIO_TOTAL: &str = "Portfolio Total";

/// Legend label of the combined dividend portfolio total.
pub const TOTAL_DIVIDENDS: &str = "Total Dividends";

/// Computed series handed to presentation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum StudySeries {
    /// The selection produced no rows.
    NoData,
    /// Labelled lines: one per stock or a single portfolio total.
    Lines(Vec<LabeledSeries>),
    /// Aligned values for a stacked area chart, zero-filled, columns by symbol.
    Stacked(AlignedFrame),
    /// Daily allocation snapshots.
    Distribution(Vec<DistributionSnapshot>),
}

impl StudySeries {
    /// The lines, if this is a line result.
    #[must_use]
    pub fn lines(&self) -> Option<&[LabeledSeries]> {
        match self {
            Self::Lines(lines) => Some(lines.as_slice()),
            _ => None,
        }
    }
}

/// How a return series is totalled across the portfolio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnTotal {
    /// Sum of aligned `total_return`.
    DollarCumulative,
    /// Per-date sum of `daily_pl`.
    DollarDaily,
    /// Per-date `sum(daily_pl) / sum(market_value) * 100`.
    PercentDaily,
    /// Aligned `sum(total_return) / sum(market_value) * 100`.
    PercentCumulative,
}

/// A calculation strategy for one study configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Calculation {
    /// One aligned market value line per selected stock.
    MarketValueLines,
    /// Sum of aligned market values.
    MarketValueTotal,
    /// Aligned market values for stacking.
    MarketValueStacked,
    /// Raw per-stock return series.
    ReturnLines {
        /// Column read.
        metric: MetricField,
        /// Shift each line to start at zero.
        zero: bool,
        /// Replace each line by its day-over-day changes.
        deltas: bool,
    },
    /// A portfolio return total.
    ReturnTotal {
        /// Aggregation.
        total: ReturnTotal,
        /// Shift the total to start at zero.
        zero: bool,
        /// Replace the total by its day-over-day changes.
        deltas: bool,
    },
    /// One dividend line per stock.
    DividendLines(DividendKind, TimePeriod),
    /// Portfolio dividend total.
    DividendTotal(DividendKind, TimePeriod),
    /// Daily allocation snapshots.
    Distribution,
}

impl Calculation {
    /// Look up the calculation for a study configuration.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::InvalidParameter`] for a per-stock stacked
    /// area chart or a portfolio total of the time-weighted return, with the
    /// message [`StudyParams::validate`] reports for it.
    pub fn for_study(study: &StudyParams) -> Result<Self> {
        let calculation = match *study {
            StudyParams::MarketValue(MarketValueParams {
                view_type,
                chart_type,
            }) => match (view_type, chart_type) {
                (ViewType::IndividualStocks, MarketValueChart::LineChart) => Self::MarketValueLines,
                (ViewType::PortfolioTotal, MarketValueChart::LineChart) => Self::MarketValueTotal,
                (ViewType::PortfolioTotal, MarketValueChart::StackedArea) => {
                    Self::MarketValueStacked
                }
                (ViewType::IndividualStocks, MarketValueChart::StackedArea) => {
                    return Err(Self::rejected(study));
                }
            },
            StudyParams::Profitability(params) => match Self::for_returns(&params) {
                Some(calculation) => calculation,
                None => return Err(Self::rejected(study)),
            },
            StudyParams::DividendPerformance(DividendParams {
                view_type,
                chart_type,
                time_period,
            }) => match view_type {
                ViewType::IndividualStocks => Self::DividendLines(chart_type, time_period),
                ViewType::PortfolioTotal => Self::DividendTotal(chart_type, time_period),
            },
            StudyParams::Distribution => Self::Distribution,
        };
        debug!(?calculation, "Selected calculation");
        Ok(calculation)
    }

    /// The error for a combination without a calculation, as reported by
    /// [`StudyParams::validate`].
    fn rejected(study: &StudyParams) -> AnalyticsError {
        study.validate().err().unwrap_or_else(|| {
            AnalyticsError::InvalidParameter(format!("no calculation for {study:?}"))
        })
    }

    fn for_returns(params: &ProfitabilityParams) -> Option<Self> {
        let zero = params.zeroes_at_start();
        let deltas = params.deltas;
        let total = match (params.view_type, params.chart_type, params.calculation_type) {
            (ViewType::IndividualStocks, _, _) => {
                return Some(Self::ReturnLines {
                    metric: params.metric(),
                    zero,
                    deltas,
                });
            }
            (ViewType::PortfolioTotal, ReturnDisplay::DollarValue, TimePeriod::Cumulative) => {
                ReturnTotal::DollarCumulative
            }
            (ViewType::PortfolioTotal, ReturnDisplay::DollarValue, TimePeriod::Daily) => {
                ReturnTotal::DollarDaily
            }
            (ViewType::PortfolioTotal, ReturnDisplay::Percentage, TimePeriod::Daily) => {
                ReturnTotal::PercentDaily
            }
            (ViewType::PortfolioTotal, ReturnDisplay::Percentage, TimePeriod::Cumulative) => {
                ReturnTotal::PercentCumulative
            }
            (ViewType::PortfolioTotal, ReturnDisplay::AggregatedPercentage, _) => return None,
        };
        Some(Self::ReturnTotal {
            total,
            zero,
            deltas,
        })
    }

    /// Run the calculation over a non-empty long frame.
    ///
    /// `selected` orders the per-stock market value lines; stocks without
    /// data are left out.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::MissingMetricColumn`] if the frame lacks a
    /// column the calculation reads.
    pub fn compute(&self, frame: &PortfolioFrame, selected: &[Symbol]) -> Result<StudySeries> {
        let market_value = MetricField::MarketValue.as_str();
        let series = match *self {
            Self::MarketValueLines => {
                let aligned = align(frame, market_value)?;
                let lines = selected
                    .iter()
                    .filter_map(|symbol| {
                        aligned
                            .series(symbol.as_str())
                            .map(|s| LabeledSeries::new(symbol.as_str(), s))
                    })
                    .collect();
                StudySeries::Lines(lines)
            }
            Self::MarketValueTotal => {
                let aligned = align(frame, market_value)?;
                StudySeries::Lines(vec![LabeledSeries::new(
                    TOTAL_PORTFOLIO,
                    row_totals(&aligned),
                )])
            }
            Self::MarketValueStacked => StudySeries::Stacked(stacked(&align(frame, market_value)?)),
            Self::ReturnLines {
                metric,
                zero,
                deltas,
            } => {
                let lines = stock_series(frame, metric)?
                    .into_iter()
                    .map(|line| {
                        let series = if zero {
                            zero_at_start(&line.series)
                        } else {
                            line.series
                        };
                        let series = if deltas {
                            calculate_deltas(&series)
                        } else {
                            series
                        };
                        LabeledSeries::new(line.label, series)
                    })
                    .collect();
                StudySeries::Lines(lines)
            }
            Self::ReturnTotal {
                total,
                zero,
                deltas,
            } => {
                let mut series = match total {
                    ReturnTotal::DollarCumulative => {
                        row_totals(&align(frame, MetricField::TotalReturn.as_str())?)
                    }
                    ReturnTotal::DollarDaily => per_date_sum(frame, MetricField::DailyPl)?,
                    ReturnTotal::PercentDaily => {
                        portfolio_return_totals(frame, MetricField::DailyPl)?
                    }
                    ReturnTotal::PercentCumulative => aligned_weighted_percentage(
                        &align(frame, MetricField::TotalReturn.as_str())?,
                        &align(frame, market_value)?,
                    ),
                };
                if zero {
                    series = zero_at_start(&series);
                }
                if deltas {
                    series = calculate_deltas(&series);
                }
                StudySeries::Lines(vec![LabeledSeries::new(PORTFOLIO_TOTAL, series)])
            }
            Self::DividendLines(kind, period) => {
                let wide = dividend_frame(frame, kind, period)?;
                let lines = wide
                    .stocks()
                    .iter()
                    .filter_map(|stock| {
                        wide.series(stock)
                            .map(|s| LabeledSeries::new(stock.as_str(), s))
                    })
                    .collect();
                StudySeries::Lines(lines)
            }
            Self::DividendTotal(kind, period) => {
                let wide = dividend_frame(frame, kind, period)?;
                let label = match kind {
                    DividendKind::Combined => TOTAL_DIVIDENDS,
                    DividendKind::Cash | DividendKind::Drp => PORTFOLIO_TOTAL,
                };
                StudySeries::Lines(vec![LabeledSeries::new(label, row_totals(&wide))])
            }
            Self::Distribution => StudySeries::Distribution(timeline(&align(frame, market_value)?)),
        };
        Ok(series)
    }
}
