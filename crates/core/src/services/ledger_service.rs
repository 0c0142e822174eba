use chrono::NaiveDate;
use log::{debug, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::analytics::HoldingState;
use crate::models::history::HistoryScope;
use crate::models::portfolio::PortfolioFund;
use crate::models::transaction::{NewTransaction, RealizedGainLoss, Transaction};
use crate::storage::traits::{HistoryCache, LedgerStore};

/// Share counts below this are treated as zero.
pub const SHARE_EPSILON: f64 = 1e-9;

/// Largest drift allowed between a stored realized gain's cost basis and a replay.
const COST_TOLERANCE: f64 = 1e-6;

/// What a single sell did to a holding.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleOutcome {
    pub transaction_id: Uuid,
    pub date: NaiveDate,
    pub shares: f64,
    /// Cost basis removed from the holding
    pub cost_basis: f64,
    pub sale_proceeds: f64,
}

impl SaleOutcome {
    pub fn realized_gain(&self) -> f64 {
        self.sale_proceeds - self.cost_basis
    }
}

/// Result of replaying a holding's transactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerReplay {
    pub state: HoldingState,
    pub sales: Vec<SaleOutcome>,
}

/// Apply one transaction to a holding under the average-cost method.
///
/// Buys and reinvestments add `shares` and `shares × cost_per_share`.
/// A sell removes `sell / held` of the cost basis and yields a [`SaleOutcome`].
pub fn apply_transaction(
    state: HoldingState,
    transaction: &Transaction,
) -> Result<(HoldingState, Option<SaleOutcome>), CoreError> {
    if transaction.transaction_type.adds_shares() {
        let next = HoldingState {
            shares_held: state.shares_held + transaction.shares,
            cost_basis: state.cost_basis + transaction.total_amount(),
        };
        return Ok((next, None));
    }

    if state.shares_held < SHARE_EPSILON || transaction.shares > state.shares_held + SHARE_EPSILON {
        return Err(CoreError::InvalidState(format!(
            "Cannot sell {} shares on {}: only {:.8} held",
            transaction.shares, transaction.date, state.shares_held
        )));
    }

    let proportion = (transaction.shares / state.shares_held).min(1.0);
    let removed_cost = proportion * state.cost_basis;
    let remaining_shares = state.shares_held - transaction.shares;

    let next = if remaining_shares.abs() < SHARE_EPSILON {
        HoldingState::default()
    } else {
        HoldingState {
            shares_held: remaining_shares,
            cost_basis: (state.cost_basis - removed_cost).max(0.0),
        }
    };

    let sale = SaleOutcome {
        transaction_id: transaction.id,
        date: transaction.date,
        shares: transaction.shares,
        cost_basis: removed_cost,
        sale_proceeds: transaction.total_amount(),
    };
    Ok((next, Some(sale)))
}

/// Transactions in replay order: ascending by date, same-day ties keep their
/// recorded order.
pub fn chronological(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| t.date);
    ordered
}

/// Replay every transaction dated on or before `as_of`.
pub fn replay(transactions: &[Transaction], as_of: NaiveDate) -> Result<LedgerReplay, CoreError> {
    chronological(transactions)
        .into_iter()
        .take_while(|t| t.date <= as_of)
        .try_fold(LedgerReplay::default(), |mut acc, t| {
            let (state, sale) = apply_transaction(acc.state, t)?;
            acc.state = state;
            acc.sales.extend(sale);
            Ok(acc)
        })
}

/// Replay the full history of a holding.
pub fn replay_all(transactions: &[Transaction]) -> Result<LedgerReplay, CoreError> {
    replay(transactions, NaiveDate::MAX)
}

/// Reject malformed transaction input before it reaches the ledger.
pub fn validate_new_transaction(input: &NewTransaction) -> Result<(), CoreError> {
    if !input.shares.is_finite() || input.shares <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Transaction shares must be positive, got {}",
            input.shares
        )));
    }
    if !input.cost_per_share.is_finite() || input.cost_per_share < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Cost per share must be non-negative, got {}",
            input.cost_per_share
        )));
    }
    Ok(())
}

/// Drop cached history of the portfolio and fund a holding belongs to, from `from` onwards.
pub(crate) fn invalidate_holding(
    cache: &dyn HistoryCache,
    holding: &PortfolioFund,
    from: NaiveDate,
) -> Result<(), CoreError> {
    let dropped = cache.invalidate_from(HistoryScope::Portfolio(holding.portfolio_id), from)?
        + cache.invalidate_from(HistoryScope::Fund(holding.fund_id), from)?;
    if dropped > 0 {
        debug!(
            "Invalidated {dropped} cached history rows from {from} for holding {}",
            holding.id
        );
    }
    Ok(())
}

/// A transaction as recorded, plus the realized gain it produced (sells only).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    pub realized_gain: Option<RealizedGainLoss>,
}

/// Records transactions against the ledger and answers holding-state queries.
pub struct LedgerService {
    ledger: Arc<dyn LedgerStore>,
    cache: Arc<dyn HistoryCache>,
}

impl LedgerService {
    pub fn new(ledger: Arc<dyn LedgerStore>, cache: Arc<dyn HistoryCache>) -> Self {
        Self { ledger, cache }
    }

    /// Shares held and cost basis of a holding at the end of `as_of`.
    pub fn get_holding_state(
        &self,
        portfolio_fund_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<HoldingState, CoreError> {
        self.holding(portfolio_fund_id)?;
        let transactions = self.ledger.list_transactions(portfolio_fund_id)?;
        Ok(replay(&transactions, as_of)?.state)
    }

    /// Record a buy, sell or reinvestment.
    ///
    /// The full history including the new transaction is replayed first, so a
    /// back-dated sell that would push any later point below zero shares is
    /// rejected, as is a back-dated buy that would restate the cost basis of a
    /// sell whose realized gain is already recorded. Sells get their realized
    /// gain record written alongside.
    pub fn record_transaction(&self, input: NewTransaction) -> Result<RecordedTransaction, CoreError> {
        validate_new_transaction(&input)?;
        let holding = self.holding(input.portfolio_fund_id)?;

        let transaction = Transaction::new(
            input.portfolio_fund_id,
            input.transaction_type,
            input.date,
            input.shares,
            input.cost_per_share,
        );

        let mut candidate = self.ledger.list_transactions(holding.id)?;
        candidate.push(transaction.clone());
        let replayed = replay_all(&candidate)?;
        self.ensure_recorded_sales_unchanged(&replayed.sales, Some(transaction.id))?;

        let realized_gain = replayed
            .sales
            .iter()
            .find(|s| s.transaction_id == transaction.id)
            .map(|sale| RealizedGainLoss {
                id: Uuid::new_v4(),
                portfolio_id: holding.portfolio_id,
                fund_id: holding.fund_id,
                sell_transaction_id: transaction.id,
                transaction_date: sale.date,
                shares: sale.shares,
                cost_basis: sale.cost_basis,
                sale_proceeds: sale.sale_proceeds,
            });

        invalidate_holding(self.cache.as_ref(), &holding, transaction.date)?;
        self.ledger.insert_transaction(transaction.clone())?;
        if let Some(record) = &realized_gain {
            if let Err(e) = self.ledger.insert_realized_gain(record.clone()) {
                if let Err(rollback) = self.ledger.delete_transaction(transaction.id) {
                    warn!("Failed to roll back sell {} after realized gain write failed: {rollback}", transaction.id);
                }
                return Err(e);
            }
        }

        debug!(
            "Recorded {} of {} shares @ {} on {} for holding {}",
            transaction.transaction_type,
            transaction.shares,
            transaction.cost_per_share,
            transaction.date,
            holding.id
        );

        Ok(RecordedTransaction {
            transaction,
            realized_gain,
        })
    }

    /// Delete a transaction nothing else refers to.
    ///
    /// Sells with a realized gain record and reinvestments linked from a
    /// dividend are immutable.
    pub fn delete_transaction(&self, transaction_id: Uuid) -> Result<(), CoreError> {
        let transaction = self
            .ledger
            .get_transaction(transaction_id)?
            .ok_or_else(|| CoreError::not_found("Transaction", transaction_id))?;

        if self.ledger.realized_gain_for_transaction(transaction_id)?.is_some() {
            return Err(CoreError::InvalidState(format!(
                "Transaction {transaction_id} has a realized gain record and cannot be removed"
            )));
        }

        let referenced_by_dividend = self
            .ledger
            .list_dividends(transaction.portfolio_fund_id)?
            .iter()
            .any(|d| d.reinvestment_transaction_id == Some(transaction_id));
        if referenced_by_dividend {
            return Err(CoreError::InvalidState(format!(
                "Transaction {transaction_id} is a dividend reinvestment and cannot be removed directly"
            )));
        }

        self.remove_transaction(&transaction)
    }

    /// Remove a transaction after checking the remaining history still replays.
    pub(crate) fn remove_transaction(&self, transaction: &Transaction) -> Result<(), CoreError> {
        let holding = self.holding(transaction.portfolio_fund_id)?;

        let remaining: Vec<Transaction> = self
            .ledger
            .list_transactions(holding.id)?
            .into_iter()
            .filter(|t| t.id != transaction.id)
            .collect();

        let replayed = match replay_all(&remaining) {
            Ok(replayed) => replayed,
            Err(e) => {
                return Err(CoreError::InvalidState(format!(
                    "Removing {} transaction {} would leave an invalid ledger: {e}",
                    transaction.transaction_type, transaction.id
                )))
            }
        };
        self.ensure_recorded_sales_unchanged(&replayed.sales, None)?;

        invalidate_holding(self.cache.as_ref(), &holding, transaction.date)?;
        self.ledger.delete_transaction(transaction.id)
    }

    /// All transactions of a holding in replay order.
    pub fn get_transactions(&self, portfolio_fund_id: Uuid) -> Result<Vec<Transaction>, CoreError> {
        self.holding(portfolio_fund_id)?;
        let mut transactions = self.ledger.list_transactions(portfolio_fund_id)?;
        transactions.sort_by_key(|t| t.date);
        Ok(transactions)
    }

    /// A sell with a stored realized gain is final; its cost basis must survive
    /// any change to the transactions before it.
    fn ensure_recorded_sales_unchanged(&self, sales: &[SaleOutcome], skip: Option<Uuid>) -> Result<(), CoreError> {
        for sale in sales.iter().filter(|s| Some(s.transaction_id) != skip) {
            let Some(recorded) = self.ledger.realized_gain_for_transaction(sale.transaction_id)? else {
                continue;
            };
            if (recorded.cost_basis - sale.cost_basis).abs() > COST_TOLERANCE {
                return Err(CoreError::InvalidState(format!(
                    "Change would restate the cost basis of sell {} on {} from {:.2} to {:.2}",
                    sale.transaction_id, sale.date, recorded.cost_basis, sale.cost_basis
                )));
            }
        }
        Ok(())
    }

    fn holding(&self, portfolio_fund_id: Uuid) -> Result<PortfolioFund, CoreError> {
        self.ledger
            .get_portfolio_fund(portfolio_fund_id)?
            .ok_or_else(|| CoreError::not_found("Portfolio fund", portfolio_fund_id))
    }
}
