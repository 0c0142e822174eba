use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::Dividend;
use crate::models::fund::Fund;
use crate::models::history::{HistoryRow, HistoryScope};
use crate::models::portfolio::{Portfolio, PortfolioFund};
use crate::models::price::FundPrice;
use crate::models::transaction::{RealizedGainLoss, Transaction};

/// Persistence for fund prices: one price per fund per date.
pub trait PriceStore: Send + Sync {
    /// Prices for `fund_id` in `[from, to]`, ascending by date.
    fn get_range(
        &self,
        fund_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FundPrice>, CoreError>;

    /// Most recent price on or before `on_or_before`.
    fn get_latest(
        &self,
        fund_id: Uuid,
        on_or_before: NaiveDate,
    ) -> Result<Option<FundPrice>, CoreError>;

    /// Insert or overwrite the price for `(fund_id, date)`.
    fn upsert(&self, price: FundPrice) -> Result<(), CoreError>;
}

/// Persistence for the ledger: holdings metadata, transactions, dividends and
/// realized gains.
pub trait LedgerStore: Send + Sync {
    fn get_fund(&self, fund_id: Uuid) -> Result<Option<Fund>, CoreError>;
    fn list_funds(&self) -> Result<Vec<Fund>, CoreError>;

    fn get_portfolio(&self, portfolio_id: Uuid) -> Result<Option<Portfolio>, CoreError>;
    fn list_portfolios(&self) -> Result<Vec<Portfolio>, CoreError>;

    fn get_portfolio_fund(&self, portfolio_fund_id: Uuid) -> Result<Option<PortfolioFund>, CoreError>;
    fn list_portfolio_funds(&self, portfolio_id: Uuid) -> Result<Vec<PortfolioFund>, CoreError>;
    fn portfolio_funds_for_fund(&self, fund_id: Uuid) -> Result<Vec<PortfolioFund>, CoreError>;

    /// Transactions of one holding in insertion order.
    fn list_transactions(&self, portfolio_fund_id: Uuid) -> Result<Vec<Transaction>, CoreError>;
    fn get_transaction(&self, transaction_id: Uuid) -> Result<Option<Transaction>, CoreError>;
    fn insert_transaction(&self, transaction: Transaction) -> Result<(), CoreError>;
    fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), CoreError>;

    fn list_dividends(&self, portfolio_fund_id: Uuid) -> Result<Vec<Dividend>, CoreError>;
    fn get_dividend(&self, dividend_id: Uuid) -> Result<Option<Dividend>, CoreError>;
    fn insert_dividend(&self, dividend: Dividend) -> Result<(), CoreError>;
    fn update_dividend(&self, dividend: Dividend) -> Result<(), CoreError>;

    fn insert_realized_gain(&self, record: RealizedGainLoss) -> Result<(), CoreError>;
    fn list_realized_gains(&self, portfolio_id: Uuid) -> Result<Vec<RealizedGainLoss>, CoreError>;
    fn realized_gain_for_transaction(
        &self,
        sell_transaction_id: Uuid,
    ) -> Result<Option<RealizedGainLoss>, CoreError>;
}

/// Materialized daily history, keyed by `(scope, date)`.
pub trait HistoryCache: Send + Sync {
    /// Cached rows for `scope` in `[from, to]`, ascending by date.
    fn get_rows(
        &self,
        scope: HistoryScope,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HistoryRow>, CoreError>;

    /// Insert or overwrite rows.
    fn put_rows(&self, rows: &[HistoryRow]) -> Result<(), CoreError>;

    /// Drop every row of `scope` dated `from` or later. Returns how many were dropped.
    fn invalidate_from(&self, scope: HistoryScope, from: NaiveDate) -> Result<usize, CoreError>;
}

/// Coverage predicate: `rows` cover every calendar day of `[from, to]`.
pub fn covers_range(rows: &[HistoryRow], from: NaiveDate, to: NaiveDate) -> bool {
    if from > to {
        return true;
    }
    let expected = (to - from).num_days() + 1;
    if rows.len() as i64 != expected {
        return false;
    }
    rows.iter()
        .zip(from.iter_days())
        .all(|(row, day)| row.date == day)
}
