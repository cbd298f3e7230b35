//! Active-holdings query.

use chrono::NaiveDate;
use folio_core::{DividendFilter, MetricsSource, Result, Stock, StockDirectory};
use tracing::{debug, instrument, warn};

/// Stocks with at least one qualifying day in `[start, end]`, ordered by symbol.
///
/// A qualifying day has a positive market value, or with `dividend_filter`
/// the selected dividend activity. The directory decides membership: stocks
/// the store reports but the directory does not know are dropped with a
/// warning.
///
/// # Errors
/// Returns [`folio_core::AnalyticsError::DataAccess`] if the store query fails.
#[instrument(skip(source, directory))]
pub async fn active_stocks(
    source: &dyn MetricsSource,
    directory: &dyn StockDirectory,
    start: NaiveDate,
    end: NaiveDate,
    dividend_filter: Option<DividendFilter>,
) -> Result<Vec<Stock>> {
    let activity = source
        .holding_activity(directory.portfolio_id(), start, end, dividend_filter)
        .await?;

    let mut stocks = Vec::with_capacity(activity.len());
    for entry in activity.into_iter().filter(|a| a.is_active()) {
        match directory.get_stock(&entry.yahoo_symbol) {
            Some(stock) => stocks.push(stock.clone()),
            None => warn!(
                symbol = %entry.yahoo_symbol,
                stock_id = entry.stock_id,
                "Active stock not found in portfolio"
            ),
        }
    }
    stocks.sort_by(|a, b| a.yahoo_symbol.cmp(&b.yahoo_symbol));

    debug!(count = stocks.len(), "Active stocks");
    Ok(stocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{MetricField, MetricsRow, Portfolio};
    use folio_store::InMemoryMetricsStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    async fn store() -> InMemoryMetricsStore {
        let store = InMemoryMetricsStore::new();
        for (id, symbol) in [(1, "WES.AX"), (2, "CBA.AX"), (3, "OLD.AX")] {
            store.add_stock(Stock::new(id, symbol)).await;
            store.add_stock_to_portfolio(9, id).await;
        }
        store
            .insert_metrics(
                1,
                vec![
                    MetricsRow::new(date(1)).with(MetricField::MarketValue, 10.0),
                    MetricsRow::new(date(2))
                        .with(MetricField::MarketValue, 10.0)
                        .with(MetricField::CashDividend, 0.4),
                ],
            )
            .await;
        store
            .insert_metrics(2, vec![MetricsRow::new(date(1)).with(MetricField::MarketValue, 20.0)])
            .await;
        store
            .insert_metrics(3, vec![MetricsRow::new(date(1)).with(MetricField::MarketValue, 5.0)])
            .await;
        store
    }

    fn portfolio() -> Portfolio {
        // OLD.AX has been removed from the live portfolio.
        Portfolio::new(9, "Main")
            .with_stock(Stock::new(1, "WES.AX"))
            .with_stock(Stock::new(2, "CBA.AX"))
    }

    #[tokio::test]
    async fn test_active_by_market_value() {
        let store = store().await;
        let active = active_stocks(&store, &portfolio(), date(1), date(30), None)
            .await
            .unwrap();
        let symbols: Vec<_> = active.iter().map(|s| s.yahoo_symbol.as_str()).collect();
        assert_eq!(symbols, vec!["CBA.AX", "WES.AX"]);
    }

    #[tokio::test]
    async fn test_active_by_dividend() {
        let store = store().await;
        let active = active_stocks(
            &store,
            &portfolio(),
            date(1),
            date(30),
            Some(DividendFilter::Cash),
        )
        .await
        .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);

        let none = active_stocks(&store, &portfolio(), date(2), date(30), Some(DividendFilter::Drp))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
