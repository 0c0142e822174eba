use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::fund::Fund;
use crate::models::history::HistoryScope;
use crate::models::ingestion::{BatchUpdateSummary, FundUpdateError, FundUpdateResult, PriceUpdate};
use crate::models::price::{FundPrice, PricePoint};
use crate::providers::traits::QuoteSource;
use crate::storage::traits::{HistoryCache, LedgerStore, PriceStore};

/// The most recent day a daily close can exist for, seen from `today`.
pub fn target_date(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

/// Pulls daily closes from the quote source into the price store.
///
/// Ingestion strategy:
/// - **Today**: one price for yesterday. Skipped without an external call when
///   it is already stored.
/// - **Historical**: every day from the fund's first transaction to yesterday.
///   Only the span of missing days is requested, in a single call, and a source
///   answering with fewer days than asked is accepted.
/// - Nothing is retried here; callers may repeat the whole operation.
pub struct IngestionService {
    ledger: Arc<dyn LedgerStore>,
    prices: Arc<dyn PriceStore>,
    cache: Arc<dyn HistoryCache>,
    quotes: Arc<dyn QuoteSource>,
}

impl IngestionService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        prices: Arc<dyn PriceStore>,
        cache: Arc<dyn HistoryCache>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Self {
        Self {
            ledger,
            prices,
            cache,
            quotes,
        }
    }

    pub async fn update_today(&self, fund_id: Uuid) -> Result<PriceUpdate, CoreError> {
        self.update_today_as_of(fund_id, Utc::now().date_naive()).await
    }

    /// Store yesterday's close (relative to `today`) for one fund.
    pub async fn update_today_as_of(
        &self,
        fund_id: Uuid,
        today: NaiveDate,
    ) -> Result<PriceUpdate, CoreError> {
        let fund = self.fund(fund_id)?;
        let target = target_date(today);

        if !self.prices.get_range(fund_id, target, target)?.is_empty() {
            debug!("Price for '{}' on {target} already stored, skipping fetch", fund.name);
            return Ok(PriceUpdate::unchanged(fund_id));
        }

        let symbol = require_symbol(&fund)?;
        let points = self.quotes.get_daily_closes(symbol, target, target).await?;
        let point = points
            .into_iter()
            .find(|p| p.date == target && is_valid_price(p))
            .ok_or_else(|| CoreError::ExternalSourceFailure {
                provider: self.quotes.name().to_string(),
                message: format!("No price returned for {symbol} on {target}"),
            })?;

        self.invalidate_fund(fund_id, target)?;
        self.prices.upsert(FundPrice::new(fund_id, point.date, point.price))?;
        info!("Stored {symbol} close {} for {target}", point.price);

        Ok(PriceUpdate::added(fund_id, 1))
    }

    pub async fn update_historical(&self, fund_id: Uuid) -> Result<PriceUpdate, CoreError> {
        self.update_historical_as_of(fund_id, Utc::now().date_naive()).await
    }

    /// Backfill every missing day from the fund's first transaction up to
    /// yesterday (relative to `today`).
    pub async fn update_historical_as_of(
        &self,
        fund_id: Uuid,
        today: NaiveDate,
    ) -> Result<PriceUpdate, CoreError> {
        let fund = self.fund(fund_id)?;
        let start = self.first_transaction_date(&fund)?;
        let end = target_date(today);

        if start > end {
            debug!("'{}' has no history before {end}, nothing to backfill", fund.name);
            return Ok(PriceUpdate::unchanged(fund_id));
        }

        let stored: HashSet<NaiveDate> = self
            .prices
            .get_range(fund_id, start, end)?
            .into_iter()
            .map(|p| p.date)
            .collect();
        let missing: Vec<NaiveDate> = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !stored.contains(d))
            .collect();

        let (Some(&first_missing), Some(&last_missing)) = (missing.first(), missing.last()) else {
            debug!("Prices for '{}' complete over {start}..={end}", fund.name);
            return Ok(PriceUpdate::unchanged(fund_id));
        };

        let symbol = require_symbol(&fund)?;
        debug!(
            "Fetching {symbol} for {} missing days in {first_missing}..={last_missing}",
            missing.len()
        );
        let points = self
            .quotes
            .get_daily_closes(symbol, first_missing, last_missing)
            .await?;
        if points.is_empty() {
            return Err(CoreError::ExternalSourceFailure {
                provider: self.quotes.name().to_string(),
                message: format!("No prices returned for {symbol} in {first_missing}..={last_missing}"),
            });
        }

        let mut wanted: HashSet<NaiveDate> = missing.into_iter().collect();
        let fresh: Vec<PricePoint> = points
            .into_iter()
            .filter(|p| is_valid_price(p) && wanted.remove(&p.date))
            .collect();

        let Some(earliest) = fresh.iter().map(|p| p.date).min() else {
            debug!("Source returned nothing new for {symbol}");
            return Ok(PriceUpdate::unchanged(fund_id));
        };

        self.invalidate_fund(fund_id, earliest)?;
        for point in &fresh {
            self.prices.upsert(FundPrice::new(fund_id, point.date, point.price))?;
        }
        info!(
            "Backfilled {} prices for {symbol} ({} days still missing)",
            fresh.len(),
            wanted.len()
        );

        Ok(PriceUpdate::added(fund_id, fresh.len()))
    }

    pub async fn update_all_fund_history(&self) -> Result<BatchUpdateSummary, CoreError> {
        self.update_all_fund_history_as_of(Utc::now().date_naive()).await
    }

    /// Run a historical backfill for every fund, one after another.
    ///
    /// A failing fund is recorded in the summary and the rest still run.
    pub async fn update_all_fund_history_as_of(
        &self,
        today: NaiveDate,
    ) -> Result<BatchUpdateSummary, CoreError> {
        let funds = self.ledger.list_funds()?;
        if funds.is_empty() {
            return Err(CoreError::not_found("Funds", "none registered"));
        }

        let mut outcomes = Vec::with_capacity(funds.len());
        for fund in &funds {
            let outcome = match self.update_historical_as_of(fund.id, today).await {
                Ok(update) => Ok(FundUpdateResult {
                    fund_id: fund.id,
                    fund_name: fund.name.clone(),
                    prices_added: update.prices_added,
                }),
                Err(e) => {
                    warn!("Price update for '{}' failed: {e}", fund.name);
                    Err(FundUpdateError {
                        fund_id: fund.id,
                        fund_name: fund.name.clone(),
                        message: e.to_string(),
                    })
                }
            };
            outcomes.push(outcome);
        }

        let summary = BatchUpdateSummary::from_outcomes(outcomes);
        info!(
            "Batch price update: {} updated, {} failed, {} prices added",
            summary.total_updated,
            summary.total_errors,
            summary.total_prices_added()
        );
        Ok(summary)
    }

    fn fund(&self, fund_id: Uuid) -> Result<Fund, CoreError> {
        self.ledger
            .get_fund(fund_id)?
            .ok_or_else(|| CoreError::not_found("Fund", fund_id))
    }

    fn first_transaction_date(&self, fund: &Fund) -> Result<NaiveDate, CoreError> {
        let holdings = self.ledger.portfolio_funds_for_fund(fund.id)?;
        if holdings.is_empty() {
            return Err(CoreError::not_found("Portfolio holding of fund", fund.id));
        }

        let mut earliest: Option<NaiveDate> = None;
        for holding in &holdings {
            let first = self
                .ledger
                .list_transactions(holding.id)?
                .iter()
                .map(|t| t.date)
                .min();
            earliest = earliest.into_iter().chain(first).min();
        }
        earliest.ok_or_else(|| CoreError::not_found("Transactions of fund", fund.id))
    }

    /// Prices feed every portfolio holding the fund, so all of their
    /// histories go stale from `from` onwards.
    fn invalidate_fund(&self, fund_id: Uuid, from: NaiveDate) -> Result<(), CoreError> {
        let mut dropped = self.cache.invalidate_from(HistoryScope::Fund(fund_id), from)?;
        for holding in self.ledger.portfolio_funds_for_fund(fund_id)? {
            dropped += self
                .cache
                .invalidate_from(HistoryScope::Portfolio(holding.portfolio_id), from)?;
        }
        if dropped > 0 {
            debug!("Invalidated {dropped} cached history rows from {from} for fund {fund_id}");
        }
        Ok(())
    }
}

fn require_symbol(fund: &Fund) -> Result<&str, CoreError> {
    fund.symbol
        .as_deref()
        .ok_or_else(|| CoreError::not_found("Symbol for fund", &fund.name))
}

fn is_valid_price(point: &PricePoint) -> bool {
    point.price.is_finite() && point.price >= 0.0
}
