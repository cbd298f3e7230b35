//! Time alignment of long frames onto a contiguous daily calendar.
//!
//! Stocks trade on different calendars and no stock has rows for weekends or
//! holidays. Aligning pivots one metric into a date by stock table, reindexes
//! it to every calendar day between the first and last observed date, and
//! forward-fills each stock column independently. Cells before a stock's
//! first observation stay unset.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use folio_core::{AlignedFrame, DatedSeries, PortfolioFrame, Result};
use polars::prelude::{Column, DataFrame};
use tracing::{debug, warn};

use folio_core::frame::{DATE_COLUMN, STOCK_COLUMN};

/// Pivot `column` into one column per stock over the observed dates.
///
/// Stock columns are ordered by symbol and the date axis holds every date
/// that appears in the frame, ascending. A null observation leaves its cell
/// unset. When a (date, stock) pair occurs more than once the last row wins.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if `column`
/// is absent from a non-empty frame.
pub fn pivot(frame: &PortfolioFrame, column: &str) -> Result<AlignedFrame> {
    let mut dates = BTreeSet::new();
    let mut cells: BTreeMap<String, BTreeMap<NaiveDate, Option<f64>>> = BTreeMap::new();
    let mut duplicates = 0usize;

    for obs in frame.observations(column)? {
        dates.insert(obs.date);
        if cells
            .entry(obs.stock)
            .or_default()
            .insert(obs.date, obs.value)
            .is_some()
        {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(column, duplicates, "Duplicate (date, stock) rows, keeping the last");
    }

    let dates: Vec<NaiveDate> = dates.into_iter().collect();
    let (stocks, columns): (Vec<String>, Vec<Vec<Option<f64>>>) = cells
        .into_iter()
        .map(|(stock, values)| {
            let column = dates
                .iter()
                .map(|d| values.get(d).copied().flatten())
                .collect();
            (stock, column)
        })
        .unzip();

    AlignedFrame::from_parts(dates, stocks, columns)
}

/// Reindex the date axis to every calendar day from the first to the last date.
///
/// Inserted days are unset in every column.
///
/// # Errors
/// Only fails if the rebuilt frame is inconsistent, which cannot happen for a
/// valid input.
pub fn reindex_daily(frame: &AlignedFrame) -> Result<AlignedFrame> {
    let (Some(first), Some(last)) = (frame.dates().first(), frame.dates().last()) else {
        return Ok(frame.clone());
    };

    let calendar: Vec<NaiveDate> = first.iter_days().take_while(|d| d <= last).collect();
    let positions: BTreeMap<NaiveDate, usize> = frame
        .dates()
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .collect();

    let columns = frame
        .iter_columns()
        .map(|(_, values)| {
            calendar
                .iter()
                .map(|d| positions.get(d).and_then(|&i| values[i]))
                .collect()
        })
        .collect();

    AlignedFrame::from_parts(calendar, frame.stocks().to_vec(), columns)
}

/// Carry each stock's last known value forward over unset cells.
///
/// Leading unset cells have nothing to carry and remain unset.
#[must_use]
pub fn forward_fill(frame: &AlignedFrame) -> AlignedFrame {
    let columns: Vec<Vec<Option<f64>>> = frame
        .iter_columns()
        .map(|(_, values)| {
            let mut last = None;
            values
                .iter()
                .map(|v| {
                    if v.is_some() {
                        last = *v;
                    }
                    last
                })
                .collect()
        })
        .collect();

    // Shapes are unchanged, so this cannot fail.
    AlignedFrame::from_parts(frame.dates().to_vec(), frame.stocks().to_vec(), columns)
        .unwrap_or_else(|_| frame.clone())
}

/// Reindex to a daily calendar and forward-fill an already pivoted frame.
///
/// Re-aligning an aligned frame returns it unchanged.
///
/// # Errors
/// See [`reindex_daily`].
pub fn align_wide(frame: &AlignedFrame) -> Result<AlignedFrame> {
    Ok(forward_fill(&reindex_daily(frame)?))
}

/// Align one metric of a long frame: pivot, reindex daily, forward-fill.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if `column`
/// is absent from a non-empty frame.
pub fn align(frame: &PortfolioFrame, column: &str) -> Result<AlignedFrame> {
    let aligned = align_wide(&pivot(frame, column)?)?;
    debug!(
        column,
        days = aligned.height(),
        stocks = aligned.stocks().len(),
        "Aligned frame"
    );
    Ok(aligned)
}

/// Sum every row, treating unset cells as zero.
#[must_use]
pub fn row_totals(frame: &AlignedFrame) -> DatedSeries {
    let values = (0..frame.height())
        .map(|i| Some(frame.row(i).into_iter().flatten().sum::<f64>()))
        .collect();
    DatedSeries::new(frame.dates().to_vec(), values)
}

/// A copy for stacking: columns by symbol with unset cells as zero.
#[must_use]
pub fn stacked(frame: &AlignedFrame) -> AlignedFrame {
    let mut columns: Vec<(String, Vec<Option<f64>>)> = frame
        .iter_columns()
        .map(|(stock, values)| {
            (
                stock.to_string(),
                values.iter().map(|v| Some(v.unwrap_or(0.0))).collect(),
            )
        })
        .collect();
    columns.sort_by(|a, b| a.0.cmp(&b.0));
    let (stocks, columns) = columns.into_iter().unzip();

    AlignedFrame::from_parts(frame.dates().to_vec(), stocks, columns)
        .unwrap_or_else(|_| frame.clone())
}

/// Melt a wide frame back into a long frame with one row per cell.
///
/// Unset cells become null observations of `column`.
///
/// # Errors
/// Returns a frame error if the DataFrame cannot be built.
pub fn to_long(frame: &AlignedFrame, column: &str) -> Result<PortfolioFrame> {
    let mut dates = Vec::new();
    let mut values = Vec::new();
    let mut stocks = Vec::new();
    for (stock, cells) in frame.iter_columns() {
        for (date, value) in frame.dates().iter().zip(cells) {
            dates.push(*date);
            values.push(*value);
            stocks.push(stock);
        }
    }

    let df = DataFrame::new(vec![
        Column::new(DATE_COLUMN.into(), dates),
        Column::new(column.into(), values),
        Column::new(STOCK_COLUMN.into(), stocks),
    ])?;
    Ok(PortfolioFrame::new(df))
}
