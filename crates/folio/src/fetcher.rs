//! Series fetching: per-stock reads merged into one long frame.

use chrono::NaiveDate;
use folio_core::frame::STOCK_COLUMN;
use folio_core::{
    AnalyticsError, MetricField, MetricsSource, PortfolioFrame, Result, Stock, StockDirectory,
    Symbol,
};
use futures::future::try_join_all;
use polars::prelude::*;
use tracing::{debug, instrument};

/// Fetch the selected stocks' rows for `[start, end]` and merge them.
///
/// Symbols without a backing stock in `directory` are skipped, as are stocks
/// with no rows in range. Reads run concurrently; results are concatenated in
/// request order with a `stock` symbol column appended. If nothing produced
/// rows the result is [`PortfolioFrame::empty`].
///
/// # Errors
/// The first failed read aborts the fetch and is returned; partial results
/// are discarded.
#[instrument(skip_all, fields(stocks = selected.len(), start = %start, end = %end))]
pub async fn fetch_portfolio_frame(
    source: &dyn MetricsSource,
    directory: &dyn StockDirectory,
    selected: &[Symbol],
    start: NaiveDate,
    end: NaiveDate,
    fields: &[MetricField],
) -> Result<PortfolioFrame> {
    let mut stocks: Vec<&Stock> = Vec::with_capacity(selected.len());
    for symbol in selected {
        match directory.get_stock(symbol) {
            Some(stock) if !stocks.iter().any(|s| s.id == stock.id) => stocks.push(stock),
            Some(_) => {}
            None => debug!(symbol = %symbol, "No stock for symbol, skipping"),
        }
    }

    if stocks.is_empty() {
        return Ok(PortfolioFrame::empty());
    }

    let reads = stocks.iter().map(|stock| async move {
        debug!(
            symbol = %stock.yahoo_symbol,
            stock_id = stock.id,
            "Fetching metrics"
        );
        let df = source.fetch_rows(fields, stock.id, start, end).await?;
        Ok::<_, AnalyticsError>((*stock, df))
    });
    let results = try_join_all(reads).await?;

    let mut frames = Vec::with_capacity(results.len());
    for (stock, mut df) in results {
        if df.height() == 0 {
            debug!(symbol = %stock.yahoo_symbol, "No rows in range");
            continue;
        }
        let symbol_col = Column::new(
            STOCK_COLUMN.into(),
            vec![stock.yahoo_symbol.as_str(); df.height()],
        );
        df.with_column(symbol_col)?;
        frames.push(df);
    }

    if frames.is_empty() {
        return Ok(PortfolioFrame::empty());
    }

    let combined = concat(
        frames.into_iter().map(IntoLazy::lazy).collect::<Vec<_>>(),
        UnionArgs::default(),
    )?
    .collect()?;

    debug!(rows = combined.height(), "Merged portfolio frame");
    Ok(PortfolioFrame::new(combined))
}
