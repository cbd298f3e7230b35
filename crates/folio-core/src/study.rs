//! Study types and analysis parameters.
//!
//! An analysis is configured by an [`AnalysisRequest`]: which stocks, which
//! date range, and one [`StudyParams`] variant carrying exactly the options
//! that study understands. Requests deserialise from JSON with the study
//! selected by its `study_type` tag.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AnalyticsError, Result};
use crate::field::{MetricField, resolve_fields};
use crate::types::Symbol;

/// The kind of study being run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyType {
    /// Market value over time.
    MarketValue,
    /// Returns over time.
    Profitability,
    /// Dividend income over time.
    DividendPerformance,
    /// Allocation across holdings.
    Distribution,
}

impl StudyType {
    /// Parses a study type name leniently.
    ///
    /// Accepts snake case (`market_value`) and display names (`Market Value`).
    /// Unrecognised names fall back to [`StudyType::Distribution`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "market_value" => Self::MarketValue,
            "profitability" => Self::Profitability,
            "dividend_performance" | "dividends" => Self::DividendPerformance,
            "distribution" | "portfolio_distribution" => Self::Distribution,
            _ => {
                warn!(study_type = name, "Unrecognised study type, using distribution");
                Self::Distribution
            }
        }
    }
}

/// Whether series are shown per stock or aggregated across the portfolio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    /// One series per selected stock.
    IndividualStocks,
    /// One aggregated series.
    #[default]
    PortfolioTotal,
}

/// Daily values or running totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    /// Per-day values.
    Daily,
    /// Running totals.
    #[default]
    Cumulative,
}

/// Chart style for market value studies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketValueChart {
    /// Line chart.
    #[default]
    LineChart,
    /// Stacked area of all holdings.
    StackedArea,
}

/// Which of the three return definitions to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnDisplay {
    /// Dollar profit/loss.
    #[default]
    DollarValue,
    /// Percentage of invested capital.
    Percentage,
    /// Time-weighted (geometric) percentage.
    AggregatedPercentage,
}

impl ReturnDisplay {
    /// Selects the metric column for this display and time period.
    #[must_use]
    pub const fn metric(&self, period: TimePeriod) -> MetricField {
        match (self, period) {
            (Self::DollarValue, TimePeriod::Daily) => MetricField::DailyPl,
            (Self::DollarValue, TimePeriod::Cumulative) => MetricField::TotalReturn,
            (Self::Percentage, TimePeriod::Daily) => MetricField::DailyPlPct,
            (Self::Percentage, TimePeriod::Cumulative) => MetricField::TotalReturnPct,
            (Self::AggregatedPercentage, _) => MetricField::CumulativeReturnPct,
        }
    }
}

/// Which dividend stream to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendKind {
    /// Cash dividends.
    Cash,
    /// DRP shares valued at the closing price.
    Drp,
    /// Cash plus DRP dollar value.
    #[default]
    Combined,
}

/// Options for a market value study.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketValueParams {
    /// Per stock or portfolio total.
    #[serde(default)]
    pub view_type: ViewType,
    /// Line or stacked area. Stacked area requires the portfolio total view.
    #[serde(default)]
    pub chart_type: MarketValueChart,
}

/// Options for a profitability study.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityParams {
    /// Per stock or portfolio total.
    #[serde(default)]
    pub view_type: ViewType,
    /// Return definition.
    #[serde(default)]
    pub chart_type: ReturnDisplay,
    /// Daily or cumulative.
    #[serde(default)]
    pub calculation_type: TimePeriod,
    /// Subtract the first value so cumulative series start at zero.
    #[serde(default)]
    pub zero_at_start: bool,
    /// Replace each series by its day-over-day differences.
    #[serde(default)]
    pub deltas: bool,
}

impl ProfitabilityParams {
    /// The metric column this configuration reads.
    #[must_use]
    pub const fn metric(&self) -> MetricField {
        self.chart_type.metric(self.calculation_type)
    }

    /// Returns true if zeroing applies (requested and cumulative).
    #[must_use]
    pub fn zeroes_at_start(&self) -> bool {
        self.zero_at_start && self.calculation_type == TimePeriod::Cumulative
    }
}

/// Options for a dividend performance study.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendParams {
    /// Per stock or portfolio total.
    #[serde(default)]
    pub view_type: ViewType,
    /// Cash, DRP or combined.
    #[serde(default)]
    pub chart_type: DividendKind,
    /// Daily or cumulative.
    #[serde(default)]
    pub time_period: TimePeriod,
}

/// Study selection with the options each study recognises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "study_type", rename_all = "snake_case")]
pub enum StudyParams {
    /// Market value study.
    MarketValue(MarketValueParams),
    /// Profitability study.
    Profitability(ProfitabilityParams),
    /// Dividend performance study.
    DividendPerformance(DividendParams),
    /// Distribution study; also the fallback for unrecognised study types.
    #[serde(other)]
    Distribution,
}

impl StudyParams {
    /// The study type of these parameters.
    #[must_use]
    pub const fn study_type(&self) -> StudyType {
        match self {
            Self::MarketValue(_) => StudyType::MarketValue,
            Self::Profitability(_) => StudyType::Profitability,
            Self::DividendPerformance(_) => StudyType::DividendPerformance,
            Self::Distribution => StudyType::Distribution,
        }
    }

    /// Rejects option combinations that have no defined calculation.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::InvalidParameter`] for a per-stock stacked
    /// area chart, or for a portfolio total of the time-weighted return.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::MarketValue(MarketValueParams {
                view_type: ViewType::IndividualStocks,
                chart_type: MarketValueChart::StackedArea,
            }) => Err(AnalyticsError::InvalidParameter(
                "stacked area charts require the portfolio total view".to_string(),
            )),
            Self::Profitability(ProfitabilityParams {
                view_type: ViewType::PortfolioTotal,
                chart_type: ReturnDisplay::AggregatedPercentage,
                ..
            }) => Err(AnalyticsError::InvalidParameter(
                "time-weighted returns are per stock only".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// A complete analysis request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Symbols to analyse; symbols not in the portfolio are skipped.
    pub selected_stocks: Vec<Symbol>,
    /// First date, inclusive.
    pub start_date: NaiveDate,
    /// Last date, inclusive.
    pub end_date: NaiveDate,
    /// Study and its options.
    pub study: StudyParams,
    /// Extra metric to retrieve.
    #[serde(default)]
    pub metric: Option<MetricField>,
    /// Extra metrics to retrieve.
    #[serde(default)]
    pub metrics: Vec<MetricField>,
}

impl AnalysisRequest {
    /// Creates and validates a request.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::InvalidParameter`] if the date range is
    /// inverted or the study options are inconsistent.
    pub fn new(
        selected_stocks: impl IntoIterator<Item = impl Into<Symbol>>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        study: StudyParams,
    ) -> Result<Self> {
        let request = Self {
            selected_stocks: selected_stocks.into_iter().map(Into::into).collect(),
            start_date,
            end_date,
            study,
            metric: None,
            metrics: Vec::new(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Loads and validates a request from JSON.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::InvalidParameter`] on malformed JSON or an
    /// invalid request.
    pub fn from_json(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json)
            .map_err(|e| AnalyticsError::InvalidParameter(e.to_string()))?;
        request.validate()?;
        Ok(request)
    }

    /// Sets the extra single metric.
    #[must_use]
    pub fn with_metric(mut self, metric: MetricField) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Sets the extra metric list.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Vec<MetricField>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Checks the date range and study options.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::InvalidParameter`] on an inverted range or
    /// inconsistent study options.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(AnalyticsError::InvalidParameter(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        self.study.validate()
    }

    /// The study type requested.
    #[must_use]
    pub const fn study_type(&self) -> StudyType {
        self.study.study_type()
    }

    /// The columns this request needs.
    #[must_use]
    pub fn fields(&self) -> Vec<MetricField> {
        resolve_fields(self.study_type(), self.metric, &self.metrics)
    }
}
