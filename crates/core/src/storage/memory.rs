use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::Dividend;
use crate::models::fund::Fund;
use crate::models::history::{HistoryRow, HistoryScope};
use crate::models::portfolio::{Portfolio, PortfolioFund};
use crate::models::price::{FundPrice, PriceHistory};
use crate::models::transaction::{RealizedGainLoss, Transaction};

use super::traits::{HistoryCache, LedgerStore, PriceStore};

/// Everything the in-memory store holds. This is what snapshots serialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub funds: HashMap<Uuid, Fund>,
    pub portfolios: HashMap<Uuid, Portfolio>,
    pub portfolio_funds: HashMap<Uuid, PortfolioFund>,

    /// Insertion order is preserved; same-day transactions replay in this order.
    pub transactions: Vec<Transaction>,
    pub dividends: Vec<Dividend>,
    pub realized_gains: Vec<RealizedGainLoss>,

    pub prices: PriceHistory,

    #[serde(default)]
    pub history: HashMap<HistoryScope, BTreeMap<NaiveDate, HistoryRow>>,
}

/// Reference store keeping the ledger, prices and materialized history in
/// memory. Implements all three store traits, so one `Arc<InMemoryStore>`
/// can back a whole `PortfolioTracker`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Clone of the full state, for snapshots.
    pub fn snapshot(&self) -> Result<StoreState, CoreError> {
        Ok(self.read()?.clone())
    }

    // ── Metadata registration ───────────────────────────────────────

    pub fn add_fund(&self, fund: Fund) -> Result<Uuid, CoreError> {
        let id = fund.id;
        self.write()?.funds.insert(id, fund);
        Ok(id)
    }

    pub fn add_portfolio(&self, portfolio: Portfolio) -> Result<Uuid, CoreError> {
        let id = portfolio.id;
        self.write()?.portfolios.insert(id, portfolio);
        Ok(id)
    }

    /// Link a fund into a portfolio. A portfolio holds a given fund through one link only.
    pub fn add_portfolio_fund(
        &self,
        portfolio_id: Uuid,
        fund_id: Uuid,
    ) -> Result<PortfolioFund, CoreError> {
        let mut state = self.write()?;
        if !state.portfolios.contains_key(&portfolio_id) {
            return Err(CoreError::not_found("Portfolio", portfolio_id));
        }
        if !state.funds.contains_key(&fund_id) {
            return Err(CoreError::not_found("Fund", fund_id));
        }
        if state
            .portfolio_funds
            .values()
            .any(|pf| pf.portfolio_id == portfolio_id && pf.fund_id == fund_id)
        {
            return Err(CoreError::InvalidState(format!(
                "Portfolio {portfolio_id} already holds fund {fund_id}"
            )));
        }
        let link = PortfolioFund::new(portfolio_id, fund_id);
        state.portfolio_funds.insert(link.id, link);
        Ok(link)
    }

    pub fn set_portfolio_archived(&self, portfolio_id: Uuid, archived: bool) -> Result<(), CoreError> {
        let mut state = self.write()?;
        let portfolio = state
            .portfolios
            .get_mut(&portfolio_id)
            .ok_or_else(|| CoreError::not_found("Portfolio", portfolio_id))?;
        portfolio.is_archived = archived;
        Ok(())
    }

    pub fn set_exclude_from_overview(&self, portfolio_id: Uuid, exclude: bool) -> Result<(), CoreError> {
        let mut state = self.write()?;
        let portfolio = state
            .portfolios
            .get_mut(&portfolio_id)
            .ok_or_else(|| CoreError::not_found("Portfolio", portfolio_id))?;
        portfolio.exclude_from_overview = exclude;
        Ok(())
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub fn price_count(&self) -> Result<usize, CoreError> {
        Ok(self.read()?.prices.total_entries())
    }

    pub fn cached_row_count(&self, scope: HistoryScope) -> Result<usize, CoreError> {
        Ok(self.read()?.history.get(&scope).map_or(0, |rows| rows.len()))
    }

    // ── Internal ────────────────────────────────────────────────────

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, CoreError> {
        self.state
            .read()
            .map_err(|_| CoreError::Storage("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, CoreError> {
        self.state
            .write()
            .map_err(|_| CoreError::Storage("in-memory store lock poisoned".into()))
    }
}

impl PriceStore for InMemoryStore {
    fn get_range(
        &self,
        fund_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FundPrice>, CoreError> {
        Ok(self
            .read()?
            .prices
            .get_price_range(fund_id, from, to)
            .into_iter()
            .map(|p| FundPrice::new(fund_id, p.date, p.price))
            .collect())
    }

    fn get_latest(
        &self,
        fund_id: Uuid,
        on_or_before: NaiveDate,
    ) -> Result<Option<FundPrice>, CoreError> {
        Ok(self
            .read()?
            .prices
            .latest_on_or_before(fund_id, on_or_before)
            .map(|p| FundPrice::new(fund_id, p.date, p.price)))
    }

    fn upsert(&self, price: FundPrice) -> Result<(), CoreError> {
        self.write()?
            .prices
            .set_price(price.fund_id, price.date, price.price);
        Ok(())
    }
}

impl LedgerStore for InMemoryStore {
    fn get_fund(&self, fund_id: Uuid) -> Result<Option<Fund>, CoreError> {
        Ok(self.read()?.funds.get(&fund_id).cloned())
    }

    fn list_funds(&self) -> Result<Vec<Fund>, CoreError> {
        let mut funds: Vec<Fund> = self.read()?.funds.values().cloned().collect();
        funds.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(funds)
    }

    fn get_portfolio(&self, portfolio_id: Uuid) -> Result<Option<Portfolio>, CoreError> {
        Ok(self.read()?.portfolios.get(&portfolio_id).cloned())
    }

    fn list_portfolios(&self) -> Result<Vec<Portfolio>, CoreError> {
        let mut portfolios: Vec<Portfolio> = self.read()?.portfolios.values().cloned().collect();
        portfolios.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(portfolios)
    }

    fn get_portfolio_fund(&self, portfolio_fund_id: Uuid) -> Result<Option<PortfolioFund>, CoreError> {
        Ok(self.read()?.portfolio_funds.get(&portfolio_fund_id).copied())
    }

    fn list_portfolio_funds(&self, portfolio_id: Uuid) -> Result<Vec<PortfolioFund>, CoreError> {
        Ok(self
            .read()?
            .portfolio_funds
            .values()
            .filter(|pf| pf.portfolio_id == portfolio_id)
            .copied()
            .collect())
    }

    fn portfolio_funds_for_fund(&self, fund_id: Uuid) -> Result<Vec<PortfolioFund>, CoreError> {
        Ok(self
            .read()?
            .portfolio_funds
            .values()
            .filter(|pf| pf.fund_id == fund_id)
            .copied()
            .collect())
    }

    fn list_transactions(&self, portfolio_fund_id: Uuid) -> Result<Vec<Transaction>, CoreError> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .filter(|t| t.portfolio_fund_id == portfolio_fund_id)
            .cloned()
            .collect())
    }

    fn get_transaction(&self, transaction_id: Uuid) -> Result<Option<Transaction>, CoreError> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned())
    }

    fn insert_transaction(&self, transaction: Transaction) -> Result<(), CoreError> {
        self.write()?.transactions.push(transaction);
        Ok(())
    }

    fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), CoreError> {
        let mut state = self.write()?;
        let idx = state
            .transactions
            .iter()
            .position(|t| t.id == transaction_id)
            .ok_or_else(|| CoreError::not_found("Transaction", transaction_id))?;
        state.transactions.remove(idx);
        Ok(())
    }

    fn list_dividends(&self, portfolio_fund_id: Uuid) -> Result<Vec<Dividend>, CoreError> {
        Ok(self
            .read()?
            .dividends
            .iter()
            .filter(|d| d.portfolio_fund_id == portfolio_fund_id)
            .cloned()
            .collect())
    }

    fn get_dividend(&self, dividend_id: Uuid) -> Result<Option<Dividend>, CoreError> {
        Ok(self
            .read()?
            .dividends
            .iter()
            .find(|d| d.id == dividend_id)
            .cloned())
    }

    fn insert_dividend(&self, dividend: Dividend) -> Result<(), CoreError> {
        self.write()?.dividends.push(dividend);
        Ok(())
    }

    fn update_dividend(&self, dividend: Dividend) -> Result<(), CoreError> {
        let mut state = self.write()?;
        let slot = state
            .dividends
            .iter_mut()
            .find(|d| d.id == dividend.id)
            .ok_or_else(|| CoreError::not_found("Dividend", dividend.id))?;
        *slot = dividend;
        Ok(())
    }

    fn insert_realized_gain(&self, record: RealizedGainLoss) -> Result<(), CoreError> {
        let mut state = self.write()?;
        if state
            .realized_gains
            .iter()
            .any(|r| r.sell_transaction_id == record.sell_transaction_id)
        {
            return Err(CoreError::InvalidState(format!(
                "Realized gain already recorded for transaction {}",
                record.sell_transaction_id
            )));
        }
        state.realized_gains.push(record);
        Ok(())
    }

    fn list_realized_gains(&self, portfolio_id: Uuid) -> Result<Vec<RealizedGainLoss>, CoreError> {
        Ok(self
            .read()?
            .realized_gains
            .iter()
            .filter(|r| r.portfolio_id == portfolio_id)
            .cloned()
            .collect())
    }

    fn realized_gain_for_transaction(
        &self,
        sell_transaction_id: Uuid,
    ) -> Result<Option<RealizedGainLoss>, CoreError> {
        Ok(self
            .read()?
            .realized_gains
            .iter()
            .find(|r| r.sell_transaction_id == sell_transaction_id)
            .cloned())
    }
}

impl HistoryCache for InMemoryStore {
    fn get_rows(
        &self,
        scope: HistoryScope,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HistoryRow>, CoreError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .read()?
            .history
            .get(&scope)
            .map(|rows| rows.range(from..=to).map(|(_, row)| row.clone()).collect())
            .unwrap_or_default())
    }

    fn put_rows(&self, rows: &[HistoryRow]) -> Result<(), CoreError> {
        let mut state = self.write()?;
        for row in rows {
            state
                .history
                .entry(row.scope)
                .or_default()
                .insert(row.date, row.clone());
        }
        Ok(())
    }

    fn invalidate_from(&self, scope: HistoryScope, from: NaiveDate) -> Result<usize, CoreError> {
        let mut state = self.write()?;
        let Some(rows) = state.history.get_mut(&scope) else {
            return Ok(0);
        };
        let dropped = rows.split_off(&from);
        if rows.is_empty() {
            state.history.remove(&scope);
        }
        Ok(dropped.len())
    }
}
