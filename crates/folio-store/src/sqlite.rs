//! SQLite-backed metrics store.

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_core::{
    AnalyticsError, DataSource, DividendFilter, HoldingActivity, MetricField, MetricsRow,
    MetricsSource, Portfolio, PortfolioId, Result, Stock, StockId, Symbol,
};
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// SQLite-backed store of per-stock daily metrics.
///
/// Holds the `stocks`, `portfolio_stocks` and `final_metrics` tables. Reads
/// project exactly the requested columns.
#[derive(Debug)]
pub struct SqliteMetricsStore {
    conn: Mutex<Connection>,
}

impl SqliteMetricsStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS stocks (
                id INTEGER PRIMARY KEY,
                yahoo_symbol TEXT NOT NULL UNIQUE,
                name TEXT
            )",
            [],
        )
        .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS portfolio_stocks (
                portfolio_id INTEGER NOT NULL,
                stock_id INTEGER NOT NULL REFERENCES stocks(id),
                PRIMARY KEY (portfolio_id, stock_id)
            )",
            [],
        )
        .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        let metric_columns = metric_fields()
            .map(|f| format!("{} REAL", f.as_str()))
            .collect::<Vec<_>>()
            .join(",\n                ");
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS final_metrics (
                stock_id INTEGER NOT NULL REFERENCES stocks(id),
                date TEXT NOT NULL,
                {metric_columns},
                PRIMARY KEY (stock_id, date)
            )"
            ),
            [],
        )
        .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_final_metrics_stock_date
             ON final_metrics(stock_id, date)",
            [],
        )
        .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        debug!("SQLite metrics schema initialized");
        Ok(())
    }

    /// Insert or replace a stock.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::DataAccess`] if the write fails.
    pub fn add_stock(&self, stock: &Stock) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO stocks (id, yahoo_symbol, name) VALUES (?1, ?2, ?3)",
            params![stock.id, stock.yahoo_symbol.as_str(), stock.name],
        )
        .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        Ok(())
    }

    /// Link a stock to a portfolio.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::DataAccess`] if the write fails.
    pub fn add_stock_to_portfolio(&self, portfolio_id: PortfolioId, stock_id: StockId) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO portfolio_stocks (portfolio_id, stock_id) VALUES (?1, ?2)",
            params![portfolio_id, stock_id],
        )
        .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        Ok(())
    }

    /// Insert or replace a stock's metrics rows.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::DataAccess`] if any write fails; nothing is
    /// committed in that case.
    #[instrument(skip(self, rows), fields(count = rows.len()))]
    pub fn insert_metrics(&self, stock_id: StockId, rows: &[MetricsRow]) -> Result<usize> {
        let columns: Vec<&str> = metric_fields().map(|f| f.as_str()).collect();
        let placeholders = (1..=columns.len() + 2)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO final_metrics (stock_id, date, {}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        for row in rows {
            let mut values = vec![Value::Integer(stock_id), Value::Text(row.date.to_string())];
            values.extend(metric_fields().map(|f| match row.get(f) {
                Some(v) => Value::Real(v),
                None => Value::Null,
            }));
            tx.execute(&sql, params_from_iter(values.iter()))
                .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        debug!("Stored {} metrics rows", rows.len());
        Ok(rows.len())
    }

    /// Load a portfolio and its member stocks.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::DataAccess`] if the read fails.
    pub fn load_portfolio(&self, portfolio_id: PortfolioId, name: &str) -> Result<Portfolio> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT s.id, s.yahoo_symbol, s.name
                 FROM stocks s
                 JOIN portfolio_stocks ps ON s.id = ps.stock_id
                 WHERE ps.portfolio_id = ?1",
            )
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        let rows = stmt
            .query_map(params![portfolio_id], |row| {
                Ok(Stock {
                    id: row.get(0)?,
                    yahoo_symbol: Symbol::new(row.get::<_, String>(1)?),
                    name: row.get(2)?,
                })
            })
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        let mut portfolio = Portfolio::new(portfolio_id, name);
        for stock in rows {
            portfolio.add_stock(stock.map_err(|e| AnalyticsError::DataAccess(e.to_string()))?);
        }
        Ok(portfolio)
    }
}

/// Every numeric metric column, in storage order.
fn metric_fields() -> impl Iterator<Item = MetricField> {
    MetricField::ALL
        .into_iter()
        .filter(|f| *f != MetricField::Date)
}

/// SQL counting the days a dividend filter qualifies.
fn dividend_days_sql(filter: Option<DividendFilter>) -> &'static str {
    match filter {
        None => "NULL",
        Some(DividendFilter::Cash) => "SUM(CASE WHEN fm.cash_dividend > 0 THEN 1 ELSE 0 END)",
        Some(DividendFilter::Drp) => "SUM(CASE WHEN fm.drp_share > 0 THEN 1 ELSE 0 END)",
        Some(DividendFilter::Combined) => {
            "SUM(CASE WHEN fm.cash_dividend > 0 OR fm.drp_share > 0 THEN 1 ELSE 0 END)"
        }
    }
}

impl DataSource for SqliteMetricsStore {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn description(&self) -> &str {
        "Per-stock daily metrics stored in SQLite"
    }
}

#[async_trait]
impl MetricsSource for SqliteMetricsStore {
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

        let projection = fields
            .iter()
            .map(MetricField::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {projection}
             FROM final_metrics
             WHERE stock_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY date"
        );
        debug!(sql = %sql, "Fetching metrics rows");

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        let mut rows = stmt
            .query(params![stock_id, start.to_string(), end.to_string()])
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        let mut dates: Vec<String> = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); fields.len()];

        while let Some(row) = rows
            .next()
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?
        {
            for (i, field) in fields.iter().enumerate() {
                if *field == MetricField::Date {
                    dates.push(
                        row.get::<_, String>(i)
                            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?,
                    );
                } else {
                    values[i].push(
                        row.get::<_, Option<f64>>(i)
                            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?,
                    );
                }
            }
        }

        let columns = fields
            .iter()
            .zip(values)
            .map(|(field, column)| {
                if *field == MetricField::Date {
                    Column::new(field.as_str().into(), dates.clone())
                } else {
                    Column::new(field.as_str().into(), column)
                }
            })
            .collect::<Vec<_>>();
        let df = DataFrame::new(columns)?;

        let df = if fields.contains(&MetricField::Date) {
            df.lazy()
                .with_column(col(MetricField::Date.as_str()).cast(DataType::Date))
                .collect()?
        } else {
            df
        };

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
        let dividend_days = dividend_days_sql(dividend_filter);
        let qualifying = match dividend_filter {
            Some(_) => dividend_days,
            None => "SUM(CASE WHEN fm.market_value > 0 THEN 1 ELSE 0 END)",
        };
        let sql = format!(
            "SELECT
                s.id,
                s.yahoo_symbol,
                s.name,
                COUNT(*) AS total_days,
                SUM(CASE WHEN fm.market_value > 0 THEN 1 ELSE 0 END) AS active_days,
                MAX(fm.market_value) AS max_value,
                {dividend_days} AS dividend_days
             FROM stocks s
             JOIN portfolio_stocks ps ON s.id = ps.stock_id
             JOIN final_metrics fm ON s.id = fm.stock_id
             WHERE fm.date BETWEEN ?1 AND ?2
               AND ps.portfolio_id = ?3
             GROUP BY s.id, s.yahoo_symbol, s.name
             HAVING {qualifying} > 0
             ORDER BY s.yahoo_symbol"
        );

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        let rows = stmt
            .query_map(
                params![start.to_string(), end.to_string(), portfolio_id],
                |row| {
                    Ok(HoldingActivity {
                        stock_id: row.get(0)?,
                        yahoo_symbol: Symbol::new(row.get::<_, String>(1)?),
                        name: row.get(2)?,
                        total_days: row.get::<_, i64>(3)? as u32,
                        active_days: row.get::<_, i64>(4)? as u32,
                        max_value: row.get(5)?,
                        dividend_days: row.get::<_, Option<i64>>(6)?.map(|d| d as u32),
                    })
                },
            )
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;

        let activity = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AnalyticsError::DataAccess(e.to_string()))?;
        debug!("Found {} active holdings", activity.len());
        Ok(activity)
    }
}
