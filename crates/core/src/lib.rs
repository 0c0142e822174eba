pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use models::{
    analytics::{FundHolding, HoldingState, PortfolioSummary},
    dividend::{Dividend, NewDividend, ReinvestmentDetails},
    fund::DividendType,
    history::{FundHistoryPoint, PortfolioHistoryDay},
    ingestion::{BatchUpdateSummary, PriceUpdate},
    settings::Settings,
    transaction::{NewTransaction, Transaction},
};
use providers::{registry::QuoteSourceRegistry, traits::QuoteSource};
use services::{
    analytics_service::AnalyticsService,
    dividend_service::{classify_dividend, Classification, DividendService},
    ingestion_service::IngestionService,
    ledger_service::{LedgerService, RecordedTransaction},
    valuation_service::ValuationService,
};
use std::sync::Arc;
use storage::memory::InMemoryStore;
use storage::traits::{HistoryCache, LedgerStore, PriceStore};
use uuid::Uuid;

use errors::CoreError;

/// Main entry point for the portfolio tracker core library.
/// Wires the stores, the quote source and all services together.
#[must_use]
pub struct PortfolioTracker {
    settings: Settings,
    ledger_service: LedgerService,
    dividend_service: DividendService,
    ingestion_service: IngestionService,
    valuation_service: ValuationService,
    analytics_service: AnalyticsService,
    quote_source_name: String,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("settings", &self.settings)
            .field("quote_source", &self.quote_source_name)
            .finish()
    }
}

impl PortfolioTracker {
    /// Build a tracker over arbitrary store implementations.
    pub fn with_stores(
        ledger: Arc<dyn LedgerStore>,
        prices: Arc<dyn PriceStore>,
        cache: Arc<dyn HistoryCache>,
        quotes: Arc<dyn QuoteSource>,
        settings: Settings,
    ) -> Self {
        Self {
            ledger_service: LedgerService::new(ledger.clone(), cache.clone()),
            dividend_service: DividendService::new(ledger.clone(), cache.clone()),
            ingestion_service: IngestionService::new(
                ledger.clone(),
                prices.clone(),
                cache.clone(),
                quotes.clone(),
            ),
            valuation_service: ValuationService::new(
                ledger.clone(),
                prices.clone(),
                cache,
                settings.write_through_cache,
            ),
            analytics_service: AnalyticsService::new(ledger, prices),
            quote_source_name: quotes.name().to_string(),
            settings,
        }
    }

    /// Build a tracker backed entirely by one in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, quotes: Arc<dyn QuoteSource>, settings: Settings) -> Self {
        Self::with_stores(store.clone(), store.clone(), store, quotes, settings)
    }

    /// In-memory tracker using the default quote sources for the configured API keys.
    pub fn in_memory_with_default_sources(store: Arc<InMemoryStore>, settings: Settings) -> Self {
        let registry = QuoteSourceRegistry::new_with_defaults(&settings.api_keys);
        Self::in_memory(store, Arc::new(registry), settings)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Dividends ───────────────────────────────────────────────────

    /// Classify a dividend's reinvestment outcome without recording anything.
    pub fn classify_dividend(
        &self,
        dividend_type: DividendType,
        total_amount: f64,
        details: &ReinvestmentDetails,
    ) -> Result<Classification, CoreError> {
        classify_dividend(dividend_type, total_amount, details)
    }

    /// Create a dividend. Rejected for funds whose dividend type is NONE.
    pub fn create_dividend(&self, input: NewDividend) -> Result<Dividend, CoreError> {
        self.dividend_service.create_dividend(input)
    }

    /// Re-classify a pending or partial stock dividend with new reinvestment details.
    pub fn record_reinvestment_fulfillment(
        &self,
        dividend_id: Uuid,
        details: ReinvestmentDetails,
    ) -> Result<Dividend, CoreError> {
        self.dividend_service
            .record_reinvestment_fulfillment(dividend_id, details)
    }

    pub fn get_dividends(&self, portfolio_fund_id: Uuid) -> Result<Vec<Dividend>, CoreError> {
        self.dividend_service.get_dividends(portfolio_fund_id)
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Record a buy, sell or reinvestment. Sells return their realized gain record.
    pub fn record_transaction(&self, input: NewTransaction) -> Result<RecordedTransaction, CoreError> {
        self.ledger_service.record_transaction(input)
    }

    pub fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), CoreError> {
        self.ledger_service.delete_transaction(transaction_id)
    }

    pub fn get_transactions(&self, portfolio_fund_id: Uuid) -> Result<Vec<Transaction>, CoreError> {
        self.ledger_service.get_transactions(portfolio_fund_id)
    }

    pub fn get_holding_state(
        &self,
        portfolio_fund_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<HoldingState, CoreError> {
        self.ledger_service.get_holding_state(portfolio_fund_id, as_of)
    }

    // ── History ─────────────────────────────────────────────────────

    pub fn get_fund_history(
        &self,
        fund_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FundHistoryPoint>, CoreError> {
        self.validate_range(start, end)?;
        self.valuation_service.get_fund_history(fund_id, start, end)
    }

    /// History of one portfolio, or of every active portfolio when `portfolio_id` is `None`.
    pub fn get_portfolio_history(
        &self,
        portfolio_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioHistoryDay>, CoreError> {
        self.validate_range(start, end)?;
        self.valuation_service
            .get_portfolio_history(portfolio_id, start, end)
    }

    /// Recompute and store a portfolio's history. Returns the number of rows written.
    pub fn materialize_portfolio_history(
        &self,
        portfolio_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, CoreError> {
        self.validate_range(start, end)?;
        self.valuation_service
            .materialize_portfolio_history(portfolio_id, start, end)
    }

    /// Portfolio history serialized as pretty-printed JSON.
    pub fn export_portfolio_history_json(
        &self,
        portfolio_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String, CoreError> {
        let history = self.get_portfolio_history(portfolio_id, start, end)?;
        serde_json::to_string_pretty(&history)
            .map_err(|e| CoreError::Serialization(format!("Failed to export history: {e}")))
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Summaries of all active portfolios.
    pub fn get_portfolio_summary(&self, as_of: NaiveDate) -> Result<Vec<PortfolioSummary>, CoreError> {
        self.analytics_service.get_portfolio_summary(as_of)
    }

    pub fn get_portfolio_summary_by_id(
        &self,
        portfolio_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<PortfolioSummary, CoreError> {
        self.analytics_service
            .get_portfolio_summary_by_id(portfolio_id, as_of)
    }

    pub fn get_portfolio_holdings(
        &self,
        portfolio_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Vec<FundHolding>, CoreError> {
        self.analytics_service
            .get_portfolio_holdings(portfolio_id, as_of)
    }

    // ── Price Ingestion ─────────────────────────────────────────────

    pub async fn update_fund_price_today(&self, fund_id: Uuid) -> Result<PriceUpdate, CoreError> {
        self.ingestion_service.update_today(fund_id).await
    }

    pub async fn update_fund_price_today_as_of(
        &self,
        fund_id: Uuid,
        today: NaiveDate,
    ) -> Result<PriceUpdate, CoreError> {
        self.ingestion_service
            .update_today_as_of(fund_id, today)
            .await
    }

    pub async fn update_fund_price_historical(&self, fund_id: Uuid) -> Result<PriceUpdate, CoreError> {
        self.ingestion_service.update_historical(fund_id).await
    }

    pub async fn update_fund_price_historical_as_of(
        &self,
        fund_id: Uuid,
        today: NaiveDate,
    ) -> Result<PriceUpdate, CoreError> {
        self.ingestion_service
            .update_historical_as_of(fund_id, today)
            .await
    }

    pub async fn update_all_fund_prices(&self) -> Result<BatchUpdateSummary, CoreError> {
        self.ingestion_service.update_all_fund_history().await
    }

    pub async fn update_all_fund_prices_as_of(
        &self,
        today: NaiveDate,
    ) -> Result<BatchUpdateSummary, CoreError> {
        self.ingestion_service
            .update_all_fund_history_as_of(today)
            .await
    }

    // ── Internal ────────────────────────────────────────────────────

    fn validate_range(&self, start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
        if start > end {
            return Err(CoreError::ValidationError(format!(
                "'start' date ({start}) must not be after 'end' date ({end})"
            )));
        }
        let range_days = (end - start).num_days();
        let max = self.settings.max_history_range_days;
        if range_days > max {
            return Err(CoreError::ValidationError(format!(
                "History range of {range_days} days exceeds maximum of {max} days"
            )));
        }
        Ok(())
    }
}
