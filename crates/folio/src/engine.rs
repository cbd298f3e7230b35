//! The analysis engine.

use std::sync::Arc;

use chrono::NaiveDate;
use folio_core::{
    AnalysisRequest, DividendFilter, MetricField, MetricsSource, Portfolio, PortfolioFrame,
    Result, Stock, Symbol,
};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::active::active_stocks;
use crate::fetcher::fetch_portfolio_frame;
use crate::stats::{SummaryStats, summarize};
use crate::strategy::{Calculation, StudySeries};

/// The result of one analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    /// Computed series for presentation.
    pub series: StudySeries,
    /// Display-ready summary statistics.
    pub stats: SummaryStats,
}

impl Analysis {
    /// An analysis of a selection with no data.
    #[must_use]
    pub fn no_data() -> Self {
        Self {
            series: StudySeries::NoData,
            stats: SummaryStats::new(),
        }
    }

    /// Returns true if the selection produced no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.series, StudySeries::NoData)
    }
}

/// What a retained frame was fetched for.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FrameKey {
    stocks: Vec<Symbol>,
    start: NaiveDate,
    end: NaiveDate,
    fields: Vec<MetricField>,
}

impl FrameKey {
    fn for_request(request: &AnalysisRequest) -> Self {
        Self {
            stocks: request.selected_stocks.clone(),
            start: request.start_date,
            end: request.end_date,
            fields: request.fields(),
        }
    }
}

#[derive(Debug)]
struct RetainedFrame {
    key: FrameKey,
    frame: PortfolioFrame,
}

/// Runs analyses for one portfolio against a metrics source.
///
/// The last fetched frame is retained and reused when the next request asks
/// for the same stocks, range and fields. Analyses on one engine are
/// serialised: the retained frame's lock is held from fetch to statistics.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use folio::{AnalysisRequest, InMemoryMetricsStore, StudyEngine, StudyParams};
///
/// let store = Arc::new(InMemoryMetricsStore::new());
/// let portfolio = store.load_portfolio(1, "Main").await;
/// let engine = StudyEngine::new(store, portfolio);
///
/// let request = AnalysisRequest::new(["CBA.AX"], start, end, StudyParams::Distribution)?;
/// let analysis = engine.analyse(&request).await?;
/// ```
pub struct StudyEngine {
    source: Arc<dyn MetricsSource>,
    portfolio: Portfolio,
    retained: Mutex<Option<RetainedFrame>>,
}

impl std::fmt::Debug for StudyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyEngine")
            .field("source", &self.source.name())
            .field("portfolio", &self.portfolio.name)
            .field("stocks", &self.portfolio.len())
            .finish()
    }
}

impl StudyEngine {
    /// Create an engine for a portfolio.
    #[must_use]
    pub fn new(source: Arc<dyn MetricsSource>, portfolio: Portfolio) -> Self {
        debug!(
            source = source.name(),
            portfolio = %portfolio.name,
            "Creating study engine"
        );
        Self {
            source,
            portfolio,
            retained: Mutex::new(None),
        }
    }

    /// The current portfolio.
    #[must_use]
    pub const fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Switch to another portfolio, discarding the retained frame.
    pub fn set_portfolio(&mut self, portfolio: Portfolio) {
        debug!(portfolio = %portfolio.name, "Switching portfolio");
        self.portfolio = portfolio;
        *self.retained.get_mut() = None;
    }

    /// The most recently fetched frame, if any.
    pub async fn last_frame(&self) -> Option<PortfolioFrame> {
        self.retained.lock().await.as_ref().map(|r| r.frame.clone())
    }

    /// Fetch the long frame for a request.
    ///
    /// An empty selection, or one with no rows in range, yields an empty frame.
    ///
    /// # Errors
    /// Returns [`folio_core::AnalyticsError::InvalidParameter`] for an invalid
    /// request and [`folio_core::AnalyticsError::DataAccess`] if a read fails.
    pub async fn get_portfolio_data(&self, request: &AnalysisRequest) -> Result<PortfolioFrame> {
        request.validate()?;
        let mut retained = self.retained.lock().await;
        self.load(&mut retained, request).await
    }

    /// Run the full pipeline for a request.
    ///
    /// # Errors
    /// Returns [`folio_core::AnalyticsError::InvalidParameter`] for an invalid
    /// request, [`folio_core::AnalyticsError::DataAccess`] if a read fails and
    /// [`folio_core::AnalyticsError::MissingMetricColumn`] if a column the
    /// study reads was not retrieved.
    #[instrument(skip_all, fields(study = ?request.study_type()))]
    pub async fn analyse(&self, request: &AnalysisRequest) -> Result<Analysis> {
        request.validate()?;
        let calculation = Calculation::for_study(&request.study)?;

        let mut retained = self.retained.lock().await;
        let frame = self.load(&mut retained, request).await?;
        if frame.is_empty() {
            debug!("No data for selection");
            return Ok(Analysis::no_data());
        }

        let series = calculation.compute(&frame, &request.selected_stocks)?;
        let stats = summarize(&frame, &request.study)?;
        Ok(Analysis { series, stats })
    }

    /// Portfolio stocks with activity in `[start, end]`.
    ///
    /// # Errors
    /// Returns [`folio_core::AnalyticsError::DataAccess`] if the store query fails.
    pub async fn active_stocks_for_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        dividend_filter: Option<DividendFilter>,
    ) -> Result<Vec<Stock>> {
        active_stocks(
            self.source.as_ref(),
            &self.portfolio,
            start,
            end,
            dividend_filter,
        )
        .await
    }

    async fn load(
        &self,
        retained: &mut Option<RetainedFrame>,
        request: &AnalysisRequest,
    ) -> Result<PortfolioFrame> {
        let key = FrameKey::for_request(request);
        if let Some(existing) = retained.as_ref().filter(|r| r.key == key) {
            debug!(rows = existing.frame.height(), "Reusing retained frame");
            return Ok(existing.frame.clone());
        }

        let frame = fetch_portfolio_frame(
            self.source.as_ref(),
            &self.portfolio,
            &key.stocks,
            key.start,
            key.end,
            &key.fields,
        )
        .await?;
        *retained = Some(RetainedFrame {
            key,
            frame: frame.clone(),
        });
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_core::{
        AnalyticsError, DataSource, DividendKind, DividendParams, HoldingActivity,
        MarketValueChart, MarketValueParams, MetricsRow, PortfolioId, ProfitabilityParams,
        ReturnDisplay, StockId, StudyParams, TimePeriod, ViewType,
    };
    use folio_store::InMemoryMetricsStore;
    use polars::prelude::DataFrame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    /// Wraps the in-memory store and counts reads.
    #[derive(Debug, Default)]
    struct CountingSource {
        inner: InMemoryMetricsStore,
        reads: AtomicUsize,
    }

    impl DataSource for CountingSource {
        fn name(&self) -> &str {
            "Counting"
        }

        fn description(&self) -> &str {
            "Counts reads"
        }
    }

    #[async_trait]
    impl MetricsSource for CountingSource {
        async fn fetch_rows(
            &self,
            fields: &[MetricField],
            stock_id: StockId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<DataFrame> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_rows(fields, stock_id, start, end).await
        }

        async fn holding_activity(
            &self,
            portfolio_id: PortfolioId,
            start: NaiveDate,
            end: NaiveDate,
            dividend_filter: Option<DividendFilter>,
        ) -> Result<Vec<HoldingActivity>> {
            self.inner
                .holding_activity(portfolio_id, start, end, dividend_filter)
                .await
        }
    }

    async fn source() -> Arc<CountingSource> {
        let source = CountingSource::default();
        for (id, symbol) in [(1, "A"), (2, "B")] {
            source.inner.add_stock(Stock::new(id, symbol)).await;
            source.inner.add_stock_to_portfolio(1, id).await;
        }
        source
            .inner
            .insert_metrics(
                1,
                vec![
                    MetricsRow::new(date(1))
                        .with(MetricField::MarketValue, 100.0)
                        .with(MetricField::TotalReturn, 10.0)
                        .with(MetricField::DailyPl, 1.0)
                        .with(MetricField::CashDividend, 5.0)
                        .with(MetricField::CashDividendsTotal, 5.0)
                        .with(MetricField::ClosePrice, 10.0),
                    MetricsRow::new(date(2))
                        .with(MetricField::MarketValue, 110.0)
                        .with(MetricField::TotalReturn, 15.0)
                        .with(MetricField::DailyPl, 5.0)
                        .with(MetricField::CashDividend, 0.0)
                        .with(MetricField::CashDividendsTotal, 5.0)
                        .with(MetricField::DrpShare, 0.2)
                        .with(MetricField::DrpSharesTotal, 0.2)
                        .with(MetricField::ClosePrice, 10.0),
                    MetricsRow::new(date(3))
                        .with(MetricField::MarketValue, 120.0)
                        .with(MetricField::TotalReturn, 20.0)
                        .with(MetricField::DailyPl, 5.0)
                        .with(MetricField::CashDividend, 5.0)
                        .with(MetricField::CashDividendsTotal, 10.0)
                        .with(MetricField::DrpSharesTotal, 0.2)
                        .with(MetricField::ClosePrice, 10.0),
                ],
            )
            .await;
        source
            .inner
            .insert_metrics(
                2,
                vec![MetricsRow::new(date(1))
                    .with(MetricField::MarketValue, 50.0)
                    .with(MetricField::TotalReturn, 5.0)],
            )
            .await;
        Arc::new(source)
    }

    async fn engine() -> (StudyEngine, Arc<CountingSource>) {
        let source = source().await;
        let portfolio = source.inner.load_portfolio(1, "Main").await;
        (StudyEngine::new(source.clone(), portfolio), source)
    }

    fn request(study: StudyParams) -> AnalysisRequest {
        AnalysisRequest::new(["A", "B"], date(1), date(31), study).unwrap()
    }

    fn single_line(analysis: &Analysis) -> Vec<Option<f64>> {
        let lines = analysis.series.lines().unwrap();
        assert_eq!(lines.len(), 1);
        lines[0].series.values.clone()
    }

    #[tokio::test]
    async fn test_market_value_total() {
        let (engine, _) = engine().await;
        let study = StudyParams::MarketValue(MarketValueParams {
            view_type: ViewType::PortfolioTotal,
            chart_type: MarketValueChart::LineChart,
        });
        let analysis = engine.analyse(&request(study)).await.unwrap();

        assert_eq!(
            single_line(&analysis),
            vec![Some(150.0), Some(160.0), Some(170.0)]
        );
        assert_eq!(analysis.stats.get("Total Portfolio Value"), Some("$170.00"));
        assert_eq!(analysis.stats.get("Number of Holdings"), Some("2"));
    }

    #[tokio::test]
    async fn test_zeroed_cumulative_dollar_returns() {
        let (engine, _) = engine().await;
        let study = StudyParams::Profitability(ProfitabilityParams {
            view_type: ViewType::IndividualStocks,
            chart_type: ReturnDisplay::DollarValue,
            calculation_type: TimePeriod::Cumulative,
            zero_at_start: true,
            deltas: false,
        });
        let request = AnalysisRequest::new(["A"], date(1), date(31), study).unwrap();
        let analysis = engine.analyse(&request).await.unwrap();

        assert_eq!(single_line(&analysis), vec![Some(0.0), Some(5.0), Some(10.0)]);
        assert_eq!(analysis.stats.get("Best Return"), Some("$20.00"));
    }

    #[tokio::test]
    async fn test_combined_daily_dividends() {
        let (engine, _) = engine().await;
        let study = StudyParams::DividendPerformance(DividendParams {
            view_type: ViewType::IndividualStocks,
            chart_type: DividendKind::Combined,
            time_period: TimePeriod::Daily,
        });
        let request = AnalysisRequest::new(["A"], date(1), date(31), study).unwrap();
        let analysis = engine.analyse(&request).await.unwrap();

        // Cash [5, 0, 5] plus DRP value [-, 0.2 * 10, -].
        assert_eq!(single_line(&analysis), vec![Some(5.0), Some(2.0), Some(5.0)]);
        assert_eq!(analysis.stats.get("Number of Payments"), Some("3"));
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let (engine, source) = engine().await;
        let empty: [&str; 0] = [];
        let request =
            AnalysisRequest::new(empty, date(1), date(31), StudyParams::Distribution).unwrap();

        assert!(engine.get_portfolio_data(&request).await.unwrap().is_empty());
        assert!(engine.analyse(&request).await.unwrap().is_empty());
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retained_frame_is_reused() {
        let (mut engine, source) = engine().await;
        let request = request(StudyParams::Distribution);

        engine.analyse(&request).await.unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
        engine.analyse(&request).await.unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
        assert_eq!(engine.last_frame().await.unwrap().height(), 4);

        let narrower = AnalysisRequest::new(["A"], date(1), date(31), StudyParams::Distribution)
            .unwrap();
        engine.get_portfolio_data(&narrower).await.unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 3);

        let portfolio = engine.portfolio().clone();
        engine.set_portfolio(portfolio);
        assert!(engine.last_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_metric_column_is_explicit() {
        let (engine, _) = engine().await;
        // Cumulative percentage statistics read total_return_pct, which no row sets,
        // but the column is retrieved, so this succeeds with N/A values.
        let study = StudyParams::Profitability(ProfitabilityParams {
            view_type: ViewType::IndividualStocks,
            chart_type: ReturnDisplay::Percentage,
            ..Default::default()
        });
        let analysis = engine.analyse(&request(study)).await.unwrap();
        assert_eq!(analysis.stats.get("Average Return"), Some("N/A"));

        let frame = engine
            .get_portfolio_data(&request(StudyParams::Distribution))
            .await
            .unwrap();
        let err = frame.values(MetricField::DailyPl).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingMetricColumn { .. }));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let (engine, source) = engine().await;
        let mut request = request(StudyParams::Distribution);
        request.start_date = date(31);
        request.end_date = date(1);

        let result = engine.analyse(&request).await;
        assert!(matches!(result, Err(AnalyticsError::InvalidParameter(_))));
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_active_stocks_for_range() {
        let (engine, _) = engine().await;
        let active = engine
            .active_stocks_for_range(date(2), date(31), None)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].yahoo_symbol.as_str(), "A");

        let drp = engine
            .active_stocks_for_range(date(1), date(31), Some(DividendFilter::Drp))
            .await
            .unwrap();
        assert_eq!(drp.len(), 1);
    }
}
