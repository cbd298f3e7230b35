//! In-memory metrics store.

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_core::{
    AnalyticsError, DataSource, DividendFilter, HoldingActivity, MetricField, MetricsRow,
    MetricsSource, Portfolio, PortfolioId, Result, Stock, StockId,
};
use polars::prelude::{Column, DataFrame};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory metrics store for testing and development.
///
/// Rows are kept per stock in date order inside `RwLock`-protected maps and
/// are lost when the store is dropped. Reads follow the same projection and
/// range rules as the SQLite store.
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    stocks: RwLock<HashMap<StockId, Stock>>,
    memberships: RwLock<HashMap<PortfolioId, BTreeSet<StockId>>>,
    rows: RwLock<HashMap<StockId, BTreeMap<NaiveDate, MetricsRow>>>,
}

impl InMemoryMetricsStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a stock.
    pub async fn add_stock(&self, stock: Stock) {
        self.stocks.write().await.insert(stock.id, stock);
    }

    /// Link a stock to a portfolio.
    pub async fn add_stock_to_portfolio(&self, portfolio_id: PortfolioId, stock_id: StockId) {
        self.memberships
            .write()
            .await
            .entry(portfolio_id)
            .or_default()
            .insert(stock_id);
    }

    /// Insert or replace a stock's metrics rows, keyed by date.
    ///
    /// Returns the number of rows written.
    pub async fn insert_metrics(&self, stock_id: StockId, rows: Vec<MetricsRow>) -> usize {
        let count = rows.len();
        let mut all = self.rows.write().await;
        let stock_rows = all.entry(stock_id).or_default();
        for row in rows {
            stock_rows.insert(row.date, row);
        }
        debug!(stock_id, "Stored {} metrics rows", count);
        count
    }

    /// Build a portfolio from the stocks linked to `portfolio_id`.
    pub async fn load_portfolio(&self, portfolio_id: PortfolioId, name: &str) -> Portfolio {
        let stocks = self.stocks.read().await;
        let memberships = self.memberships.read().await;

        let mut portfolio = Portfolio::new(portfolio_id, name);
        for stock_id in memberships.get(&portfolio_id).into_iter().flatten() {
            if let Some(stock) = stocks.get(stock_id) {
                portfolio.add_stock(stock.clone());
            }
        }
        portfolio
    }
}

impl DataSource for InMemoryMetricsStore {
    fn name(&self) -> &str {
        "InMemory"
    }

    fn description(&self) -> &str {
        "Per-stock daily metrics held in memory"
    }
}

#[async_trait]
impl MetricsSource for InMemoryMetricsStore {
    #[instrument(skip(self, fields))]
    async fn fetch_rows(
        &self,
        fields: &[MetricField],
        stock_id: StockId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame> {
        if fields.is_empty() {
            return Err(AnalyticsError::InvalidParameter(
                "At least one field must be requested".to_string(),
            ));
        }

        let all = self.rows.read().await;
        let selected: Vec<&MetricsRow> = all
            .get(&stock_id)
            .map(|rows| rows.range(start..=end).map(|(_, row)| row).collect())
            .unwrap_or_default();

        let columns = fields
            .iter()
            .map(|field| match field {
                MetricField::Date => Column::new(
                    field.as_str().into(),
                    selected.iter().map(|row| row.date).collect::<Vec<_>>(),
                ),
                _ => Column::new(
                    field.as_str().into(),
                    selected.iter().map(|row| row.get(*field)).collect::<Vec<_>>(),
                ),
            })
            .collect::<Vec<_>>();

        let df = DataFrame::new(columns)?;
        debug!("Found {} metrics rows", df.height());
        Ok(df)
    }

    #[instrument(skip(self))]
    async fn holding_activity(
        &self,
        portfolio_id: PortfolioId,
        start: NaiveDate,
        end: NaiveDate,
        dividend_filter: Option<DividendFilter>,
    ) -> Result<Vec<HoldingActivity>> {
        let stocks = self.stocks.read().await;
        let memberships = self.memberships.read().await;
        let all = self.rows.read().await;

        let mut activity = Vec::new();
        for stock_id in memberships.get(&portfolio_id).into_iter().flatten() {
            let (Some(stock), Some(rows)) = (stocks.get(stock_id), all.get(stock_id)) else {
                continue;
            };

            let in_range: Vec<&MetricsRow> = rows.range(start..=end).map(|(_, r)| r).collect();
            if in_range.is_empty() {
                continue;
            }

            let active_days = in_range
                .iter()
                .filter(|r| r.market_value.is_some_and(|v| v > 0.0))
                .count() as u32;
            let max_value = in_range
                .iter()
                .filter_map(|r| r.market_value)
                .reduce(f64::max);
            let dividend_days = dividend_filter.map(|filter| {
                in_range
                    .iter()
                    .filter(|r| filter.qualifies(r.cash_dividend, r.drp_share))
                    .count() as u32
            });

            let entry = HoldingActivity {
                stock_id: *stock_id,
                yahoo_symbol: stock.yahoo_symbol.clone(),
                name: stock.name.clone(),
                total_days: in_range.len() as u32,
                active_days,
                max_value,
                dividend_days,
            };
            if entry.is_active() {
                activity.push(entry);
            }
        }

        activity.sort_by(|a, b| a.yahoo_symbol.cmp(&b.yahoo_symbol));
        debug!("Found {} active holdings", activity.len());
        Ok(activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn seeded() -> InMemoryMetricsStore {
        let store = InMemoryMetricsStore::new();
        store.add_stock(Stock::new(1, "CBA.AX")).await;
        store.add_stock(Stock::new(2, "BHP.AX")).await;
        store.add_stock_to_portfolio(1, 1).await;
        store.add_stock_to_portfolio(1, 2).await;

        store
            .insert_metrics(
                1,
                vec![
                    MetricsRow::new(date(4)).with(MetricField::MarketValue, 100.0),
                    MetricsRow::new(date(5))
                        .with(MetricField::MarketValue, 120.0)
                        .with(MetricField::DrpShare, 2.0),
                    MetricsRow::new(date(6)).with(MetricField::MarketValue, 130.0),
                ],
            )
            .await;
        store
            .insert_metrics(2, vec![MetricsRow::new(date(4)).with(MetricField::MarketValue, 0.0)])
            .await;
        store
    }

    #[tokio::test]
    async fn test_fetch_projects_requested_columns() {
        let store = seeded().await;
        let df = store
            .fetch_rows(&[MetricField::Date, MetricField::DrpShare], 1, date(5), date(6))
            .await
            .unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
        let drp: Vec<Option<f64>> = df.column("drp_share").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(drp, vec![Some(2.0), None]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_stock_is_empty() {
        let store = seeded().await;
        let df = store
            .fetch_rows(&[MetricField::Date, MetricField::MarketValue], 99, date(1), date(31))
            .await
            .unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
    }

    #[tokio::test]
    async fn test_fetch_requires_fields() {
        let store = seeded().await;
        let result = store.fetch_rows(&[], 1, date(1), date(31)).await;
        assert!(matches!(result, Err(AnalyticsError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_holding_activity() {
        let store = seeded().await;

        let held = store.holding_activity(1, date(1), date(31), None).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].stock_id, 1);
        assert_eq!(held[0].total_days, 3);
        assert_eq!(held[0].max_value, Some(130.0));

        let drp = store
            .holding_activity(1, date(1), date(31), Some(DividendFilter::Drp))
            .await
            .unwrap();
        assert_eq!(drp.len(), 1);
        assert_eq!(drp[0].dividend_days, Some(1));

        let cash = store
            .holding_activity(1, date(1), date(31), Some(DividendFilter::Cash))
            .await
            .unwrap();
        assert!(cash.is_empty());
    }

    #[tokio::test]
    async fn test_load_portfolio() {
        let store = seeded().await;
        let portfolio = store.load_portfolio(1, "Main").await;
        assert_eq!(portfolio.len(), 2);
        assert!(store.load_portfolio(2, "Other").await.is_empty());
    }
}
