//! Dividend calculations: DRP dollar values and combined dividend series.

use std::collections::{BTreeMap, BTreeSet};

use folio_core::{AlignedFrame, DividendKind, MetricField, PortfolioFrame, Result, TimePeriod};

use crate::align::{align_wide, pivot};

/// Derived column: DRP shares allotted on the day, valued at the close.
pub const DRP_VALUE: &str = "drp_value";

/// Derived column: running DRP share total valued at the current close.
pub const DRP_VALUE_TOTAL: &str = "drp_value_total";

/// Value a share quantity at a price; unset if either side is unset.
#[must_use]
pub fn share_value(shares: Option<f64>, price: Option<f64>) -> Option<f64> {
    Some(shares? * price?)
}

/// Append [`DRP_VALUE`] and [`DRP_VALUE_TOTAL`] to a long frame.
///
/// The running total is valued at each row's own closing price, not at the
/// prices the shares were allotted at.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if any of
/// `drp_share`, `drp_shares_total` or `close_price` is absent.
pub fn with_drp_values(frame: &PortfolioFrame) -> Result<PortfolioFrame> {
    let close = frame.values(MetricField::ClosePrice)?;
    let shares = frame.values(MetricField::DrpShare)?;
    let shares_total = frame.values(MetricField::DrpSharesTotal)?;

    let value = shares
        .iter()
        .zip(&close)
        .map(|(s, c)| share_value(*s, *c))
        .collect();
    let value_total = shares_total
        .iter()
        .zip(&close)
        .map(|(s, c)| share_value(*s, *c))
        .collect();

    frame
        .with_derived(DRP_VALUE, value)?
        .with_derived(DRP_VALUE_TOTAL, value_total)
}

/// Cash plus DRP value per cell over the union of both frames' dates and stocks.
///
/// Unset cells count as zero on either side, so every cell of the result is
/// set. The inputs are left untouched.
///
/// # Errors
/// Only fails if the rebuilt frame is inconsistent, which cannot happen for
/// valid inputs.
pub fn combine(cash: &AlignedFrame, drp: &AlignedFrame) -> Result<AlignedFrame> {
    let dates: Vec<_> = cash
        .dates()
        .iter()
        .chain(drp.dates())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let stocks: Vec<String> = cash
        .stocks()
        .iter()
        .chain(drp.stocks())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let cash_rows: BTreeMap<_, _> = cash.dates().iter().enumerate().map(|(i, d)| (*d, i)).collect();
    let drp_rows: BTreeMap<_, _> = drp.dates().iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let columns = stocks
        .iter()
        .map(|stock| {
            let cash_col = cash.column(stock);
            let drp_col = drp.column(stock);
            dates
                .iter()
                .map(|d| {
                    let c = cash_col
                        .zip(cash_rows.get(d))
                        .and_then(|(col, &i)| col[i])
                        .unwrap_or(0.0);
                    let r = drp_col
                        .zip(drp_rows.get(d))
                        .and_then(|(col, &i)| col[i])
                        .unwrap_or(0.0);
                    Some(c + r)
                })
                .collect()
        })
        .collect();

    AlignedFrame::from_parts(dates, stocks, columns)
}

/// The long-frame column a dividend view reads.
///
/// Combined views read two columns and are handled by [`dividend_frame`].
#[must_use]
pub const fn dividend_column(kind: DividendKind, period: TimePeriod) -> &'static str {
    match (kind, period) {
        (DividendKind::Cash, TimePeriod::Daily) => MetricField::CashDividend.as_str(),
        (DividendKind::Cash, TimePeriod::Cumulative) => MetricField::CashDividendsTotal.as_str(),
        (DividendKind::Drp | DividendKind::Combined, TimePeriod::Daily) => DRP_VALUE,
        (DividendKind::Drp | DividendKind::Combined, TimePeriod::Cumulative) => DRP_VALUE_TOTAL,
    }
}

/// Build the wide dividend table for a view.
///
/// Daily views are pivoted on the observed dates only. Cumulative views are
/// reindexed to a daily calendar and forward-filled like market value; for
/// the combined view both running totals are filled before they are summed.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::MissingMetricColumn`] if a needed
/// dividend column is absent.
pub fn dividend_frame(
    frame: &PortfolioFrame,
    kind: DividendKind,
    period: TimePeriod,
) -> Result<AlignedFrame> {
    let frame = match kind {
        DividendKind::Cash => frame.clone(),
        DividendKind::Drp | DividendKind::Combined => with_drp_values(frame)?,
    };

    let wide = |column: &str| -> Result<AlignedFrame> {
        let pivoted = pivot(&frame, column)?;
        match period {
            TimePeriod::Daily => Ok(pivoted),
            TimePeriod::Cumulative => align_wide(&pivoted),
        }
    };

    match kind {
        DividendKind::Cash | DividendKind::Drp => wide(dividend_column(kind, period)),
        DividendKind::Combined => combine(
            &wide(dividend_column(DividendKind::Cash, period))?,
            &wide(dividend_column(DividendKind::Drp, period))?,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::row_totals;
    use chrono::NaiveDate;
    use polars::prelude::{Column, DataFrame};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn frame() -> PortfolioFrame {
        let df = DataFrame::new(vec![
            Column::new("date".into(), vec![date(3), date(5), date(3), date(4)]),
            Column::new(
                "cash_dividend".into(),
                vec![Some(5.0), Some(2.0), None, Some(0.0)],
            ),
            Column::new(
                "cash_dividends_total".into(),
                vec![Some(5.0), Some(7.0), None, Some(0.0)],
            ),
            Column::new("drp_share".into(), vec![None, None, Some(0.5), Some(1.0)]),
            Column::new(
                "drp_shares_total".into(),
                vec![None, None, Some(0.5), Some(1.5)],
            ),
            Column::new(
                "close_price".into(),
                vec![Some(10.0), Some(11.0), Some(4.0), Some(6.0)],
            ),
            Column::new("stock".into(), vec!["A", "A", "B", "B"]),
        ])
        .unwrap();
        PortfolioFrame::new(df)
    }

    #[test]
    fn test_drp_values() {
        let frame = with_drp_values(&frame()).unwrap();
        assert_eq!(
            frame.values(DRP_VALUE).unwrap(),
            vec![None, None, Some(2.0), Some(6.0)]
        );
        // Running share total at the current close.
        assert_eq!(
            frame.values(DRP_VALUE_TOTAL).unwrap(),
            vec![None, None, Some(2.0), Some(9.0)]
        );
    }

    #[test]
    fn test_combine_fills_zero_pointwise() {
        let days = vec![date(1), date(2), date(3)];
        let cash = AlignedFrame::from_parts(
            days.clone(),
            vec!["A".to_string()],
            vec![vec![Some(5.0), Some(0.0), Some(5.0)]],
        )
        .unwrap();
        let drp = AlignedFrame::from_parts(
            days,
            vec!["A".to_string()],
            vec![vec![Some(0.0), Some(2.0), None]],
        )
        .unwrap();

        let combined = combine(&cash, &drp).unwrap();
        assert_eq!(combined.column("A").unwrap(), &[Some(5.0), Some(2.0), Some(5.0)]);
        assert_eq!(drp.column("A").unwrap()[2], None);
    }

    #[test]
    fn test_combine_unions_stocks_and_dates() {
        let cash = AlignedFrame::from_parts(
            vec![date(1)],
            vec!["A".to_string()],
            vec![vec![Some(1.0)]],
        )
        .unwrap();
        let drp = AlignedFrame::from_parts(
            vec![date(2)],
            vec!["B".to_string()],
            vec![vec![Some(3.0)]],
        )
        .unwrap();

        let combined = combine(&cash, &drp).unwrap();
        assert_eq!(combined.dates(), &[date(1), date(2)]);
        assert_eq!(combined.column("A").unwrap(), &[Some(1.0), Some(0.0)]);
        assert_eq!(combined.column("B").unwrap(), &[Some(0.0), Some(3.0)]);
    }

    #[test]
    fn test_daily_cash_is_not_calendar_filled() {
        let wide = dividend_frame(&frame(), DividendKind::Cash, TimePeriod::Daily).unwrap();
        assert_eq!(wide.dates(), &[date(3), date(4), date(5)]);
        assert_eq!(wide.column("A").unwrap(), &[Some(5.0), None, Some(2.0)]);
    }

    #[test]
    fn test_daily_drp_values() {
        let wide = dividend_frame(&frame(), DividendKind::Drp, TimePeriod::Daily).unwrap();
        assert_eq!(wide.dates(), &[date(3), date(4), date(5)]);
        // Day 5 only has a row for A, so B stays unset there.
        assert_eq!(wide.column("B").unwrap(), &[Some(2.0), Some(6.0), None]);
        assert_eq!(wide.column("A").unwrap(), &[None, None, None]);
        assert_eq!(
            row_totals(&wide).values,
            vec![Some(2.0), Some(6.0), Some(0.0)]
        );
    }

    #[test]
    fn test_cumulative_drp_values() {
        let wide = dividend_frame(&frame(), DividendKind::Drp, TimePeriod::Cumulative).unwrap();
        assert_eq!(wide.dates(), &[date(3), date(4), date(5)]);
        assert_eq!(wide.column("B").unwrap(), &[Some(2.0), Some(9.0), Some(9.0)]);
        assert_eq!(
            row_totals(&wide).values,
            vec![Some(2.0), Some(9.0), Some(9.0)]
        );
    }

    #[test]
    fn test_cumulative_combined() {
        let wide =
            dividend_frame(&frame(), DividendKind::Combined, TimePeriod::Cumulative).unwrap();
        assert_eq!(wide.dates(), &[date(3), date(4), date(5)]);
        // A: cash total carried over the day without a row.
        assert_eq!(wide.column("A").unwrap(), &[Some(5.0), Some(5.0), Some(7.0)]);
        // B: 0.5 * 4 then 1.5 * 6, carried forward.
        assert_eq!(wide.column("B").unwrap(), &[Some(2.0), Some(9.0), Some(9.0)]);
    }
}
