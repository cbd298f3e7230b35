//! Frames flowing through the analysis pipeline.
//!
//! - [`PortfolioFrame`] - long format rows of every requested stock, tagged
//!   with the stock symbol, backed by a polars [`DataFrame`]
//! - [`AlignedFrame`] - wide format, one row per date and one column per stock
//! - [`DatedSeries`] / [`LabeledSeries`] - a single computed line

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use crate::error::{AnalyticsError, Result};
use crate::field::MetricField;

/// Name of the symbol column added to every fetched frame.
pub const STOCK_COLUMN: &str = "stock";

/// Name of the date column.
pub const DATE_COLUMN: &str = "date";

/// One observation of one column for one stock on one date.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Observation date.
    pub date: NaiveDate,
    /// Stock symbol.
    pub stock: String,
    /// Observed value, `None` when stored as null.
    pub value: Option<f64>,
}

/// Long-format merge of per-stock metric rows.
///
/// Columns are `date`, the projected metric columns, and `stock`. Rows of a
/// stock keep their chronological order; stocks appear in request order. An
/// empty frame means the selection produced no data.
#[derive(Clone, Debug)]
pub struct PortfolioFrame {
    df: DataFrame,
}

impl Default for PortfolioFrame {
    fn default() -> Self {
        Self::empty()
    }
}

impl PortfolioFrame {
    /// Wraps a DataFrame.
    #[must_use]
    pub const fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// A frame with no rows and no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            df: DataFrame::empty(),
        }
    }

    /// The underlying DataFrame.
    #[must_use]
    pub const fn data(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Column names in frame order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// Returns true if the frame carries the named column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_index(name).is_some()
    }

    fn require(&self, name: &str) -> Result<&Column> {
        self.df
            .column(name)
            .map_err(|_| AnalyticsError::MissingMetricColumn {
                column: name.to_string(),
                available: self.column_names(),
            })
    }

    /// The date of every row.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::MissingMetricColumn`] if the frame has rows
    /// but no date column, or a frame error if a date cannot be read.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let dates = self.require(DATE_COLUMN)?.cast(&DataType::String)?;
        dates
            .str()?
            .into_iter()
            .map(|d| {
                let d = d.ok_or_else(|| AnalyticsError::Frame("Missing date".to_string()))?;
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|e| AnalyticsError::Frame(format!("Invalid date '{d}': {e}")))
            })
            .collect()
    }

    /// The stock symbol of every row.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::MissingMetricColumn`] if the frame has rows
    /// but no stock column.
    pub fn stocks(&self) -> Result<Vec<String>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let stocks = self.require(STOCK_COLUMN)?.str()?;
        Ok(stocks
            .into_iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect())
    }

    /// The values of a numeric column, nulls as `None`.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::MissingMetricColumn`] if the column is absent.
    pub fn values(&self, column: impl AsRef<str>) -> Result<Vec<Option<f64>>> {
        let column = column.as_ref();
        if self.is_empty() && !self.has_column(column) {
            return Ok(Vec::new());
        }
        let values = self.require(column)?.cast(&DataType::Float64)?;
        Ok(values.f64()?.into_iter().collect())
    }

    /// Every row as an observation of one column.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::MissingMetricColumn`] if the column is absent.
    pub fn observations(&self, column: impl AsRef<str>) -> Result<Vec<Observation>> {
        let values = self.values(column)?;
        let dates = self.dates()?;
        let stocks = self.stocks()?;
        Ok(dates
            .into_iter()
            .zip(stocks)
            .zip(values)
            .map(|((date, stock), value)| Observation { date, stock, value })
            .collect())
    }

    /// Distinct stock symbols in first-seen order.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::MissingMetricColumn`] if the frame has rows
    /// but no stock column.
    pub fn distinct_stocks(&self) -> Result<Vec<String>> {
        let mut distinct: Vec<String> = Vec::new();
        for stock in self.stocks()? {
            if !distinct.contains(&stock) {
                distinct.push(stock);
            }
        }
        Ok(distinct)
    }

    /// Returns a copy of the frame with a derived numeric column appended or replaced.
    ///
    /// # Errors
    /// Returns a frame error if `values` does not match the frame height.
    pub fn with_derived(&self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        let mut df = self.df.clone();
        df.with_column(Column::new(name.into(), values))?;
        Ok(Self { df })
    }

    /// Returns true if the frame carries every listed metric column.
    #[must_use]
    pub fn has_fields(&self, fields: &[MetricField]) -> bool {
        fields.iter().all(|f| self.has_column(f.as_str()))
    }
}

/// A single dated series of optional values.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DatedSeries {
    /// Dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// One value per date; `None` is a missing point.
    pub values: Vec<Option<f64>>,
}

impl DatedSeries {
    /// Builds a series from parallel vectors.
    #[must_use]
    pub const fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Self {
        Self { dates, values }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Returns true if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// A series with the label presentation shows for it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabeledSeries {
    /// Legend label: a stock symbol or a portfolio total label.
    pub label: String,
    /// The points.
    pub series: DatedSeries,
}

impl LabeledSeries {
    /// Creates a labeled series.
    #[must_use]
    pub fn new(label: impl Into<String>, series: DatedSeries) -> Self {
        Self {
            label: label.into(),
            series,
        }
    }
}

/// Wide-format table: one row per date, one column per stock.
///
/// Columns are kept in ascending symbol order. A `None` cell is unset, which
/// is distinct from zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AlignedFrame {
    dates: Vec<NaiveDate>,
    stocks: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl AlignedFrame {
    /// Builds a frame from its parts.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::InvalidParameter`] if the stock and column
    /// counts differ or a column's length differs from the number of dates.
    pub fn from_parts(
        dates: Vec<NaiveDate>,
        stocks: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if stocks.len() != columns.len() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "{} stocks but {} columns",
                stocks.len(),
                columns.len()
            )));
        }
        if let Some((stock, _)) = stocks
            .iter()
            .zip(&columns)
            .find(|(_, c)| c.len() != dates.len())
        {
            return Err(AnalyticsError::InvalidParameter(format!(
                "column {stock} does not have {} rows",
                dates.len()
            )));
        }
        Ok(Self {
            dates,
            stocks,
            columns,
        })
    }

    /// The date axis.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The stock columns, in order.
    #[must_use]
    pub fn stocks(&self) -> &[String] {
        &self.stocks
    }

    /// Number of date rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    /// Returns true if there are no date rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// A stock's column.
    #[must_use]
    pub fn column(&self, stock: &str) -> Option<&[Option<f64>]> {
        self.stocks
            .iter()
            .position(|s| s == stock)
            .map(|i| self.columns[i].as_slice())
    }

    /// A stock's value on a date; `None` if unset or not present.
    #[must_use]
    pub fn value(&self, stock: &str, date: NaiveDate) -> Option<f64> {
        let row = self.dates.iter().position(|d| *d == date)?;
        self.column(stock).and_then(|c| c[row])
    }

    /// Iterates `(stock, column)` pairs.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> + '_ {
        self.stocks
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// A row's cells in column order.
    #[must_use]
    pub fn row(&self, index: usize) -> Vec<Option<f64>> {
        self.columns.iter().map(|c| c[index]).collect()
    }

    /// A stock's column as a dated series.
    #[must_use]
    pub fn series(&self, stock: &str) -> Option<DatedSeries> {
        self.column(stock)
            .map(|c| DatedSeries::new(self.dates.clone(), c.to_vec()))
    }

    /// Exports the frame as a DataFrame with a `date` column and one column per stock.
    ///
    /// # Errors
    /// Returns a frame error if the DataFrame cannot be built.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.stocks.len() + 1);
        columns.push(Column::new(DATE_COLUMN.into(), self.dates.clone()));
        for (stock, values) in self.stocks.iter().zip(&self.columns) {
            columns.push(Column::new(stock.as_str().into(), values.clone()));
        }
        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn frame() -> PortfolioFrame {
        let df = DataFrame::new(vec![
            Column::new("date".into(), vec![date(1), date(2), date(1)]),
            Column::new(
                "market_value".into(),
                vec![Some(100.0), Some(110.0), None] as Vec<Option<f64>>,
            ),
            Column::new("stock".into(), vec!["A", "A", "B"]),
        ])
        .unwrap();
        PortfolioFrame::new(df)
    }

    #[test]
    fn frame_accessors() {
        let frame = frame();
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.dates().unwrap(), vec![date(1), date(2), date(1)]);
        assert_eq!(frame.stocks().unwrap(), vec!["A", "A", "B"]);
        assert_eq!(
            frame.values(MetricField::MarketValue).unwrap(),
            vec![Some(100.0), Some(110.0), None]
        );
        assert_eq!(frame.distinct_stocks().unwrap(), vec!["A", "B"]);
        assert!(frame.has_fields(&[MetricField::Date, MetricField::MarketValue]));
    }

    #[test]
    fn missing_column_is_reported_explicitly() {
        let err = frame().values(MetricField::DailyPl).unwrap_err();
        match err {
            AnalyticsError::MissingMetricColumn { column, available } => {
                assert_eq!(column, "daily_pl");
                assert!(available.contains(&"market_value".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn empty_frame_yields_no_values() {
        let frame = PortfolioFrame::empty();
        assert!(frame.is_empty());
        assert!(frame.dates().unwrap().is_empty());
        assert!(frame.values(MetricField::MarketValue).unwrap().is_empty());
    }

    #[test]
    fn derived_column_is_appended() {
        let frame = frame()
            .with_derived("doubled", vec![Some(200.0), Some(220.0), None])
            .unwrap();
        assert_eq!(frame.values("doubled").unwrap()[1], Some(220.0));
    }

    #[test]
    fn aligned_frame_rejects_ragged_columns() {
        let result = AlignedFrame::from_parts(
            vec![date(1), date(2)],
            vec!["A".to_string()],
            vec![vec![Some(1.0)]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn aligned_frame_exports_dataframe() {
        let aligned = AlignedFrame::from_parts(
            vec![date(1), date(2)],
            vec!["A".to_string(), "B".to_string()],
            vec![vec![Some(1.0), Some(2.0)], vec![None, Some(3.0)]],
        )
        .unwrap();
        assert_eq!(aligned.value("B", date(2)), Some(3.0));
        assert_eq!(aligned.value("B", date(1)), None);

        let df = aligned.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
    }
}
