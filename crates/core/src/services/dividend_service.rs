use chrono::NaiveDate;
use log::{debug, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::dividend::{Dividend, NewDividend, ReinvestmentDetails, ReinvestmentStatus};
use crate::models::fund::{DividendType, Fund};
use crate::models::transaction::{NewTransaction, TransactionType};
use crate::storage::traits::{HistoryCache, LedgerStore};

use super::ledger_service::{invalidate_holding, LedgerService, SHARE_EPSILON};

/// Reinvested amounts within this of the dividend total count as fully reinvested.
pub const AMOUNT_TOLERANCE: f64 = 1e-6;

/// An executed reinvestment order, to be booked as a dividend-reinvestment transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReinvestmentOrder {
    pub date: NaiveDate,
    pub shares: f64,
    pub price: f64,
}

impl ReinvestmentOrder {
    pub fn amount(&self) -> f64 {
        self.shares * self.price
    }
}

/// Status of a dividend plus the reinvestment transaction it calls for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub status: ReinvestmentStatus,
    pub reinvestment: Option<ReinvestmentOrder>,
}

impl Classification {
    fn without_order(status: ReinvestmentStatus) -> Self {
        Self {
            status,
            reinvestment: None,
        }
    }
}

/// Decide a dividend's reinvestment status from its fields.
///
/// - `NONE` funds cannot have dividends at all.
/// - Cash dividends are always `COMPLETED`.
/// - Stock dividends are `PENDING` until an order date and its execution
///   (shares and price) are known, then `COMPLETED` when the reinvested
///   amount covers `total_amount` and `PARTIAL` otherwise.
pub fn classify_dividend(
    dividend_type: DividendType,
    total_amount: f64,
    details: &ReinvestmentDetails,
) -> Result<Classification, CoreError> {
    match dividend_type {
        DividendType::None => {
            return Err(CoreError::InvalidState(
                "Fund dividend type is NONE: it does not pay dividends".into(),
            ))
        }
        DividendType::Cash => return Ok(Classification::without_order(ReinvestmentStatus::Completed)),
        DividendType::Stock => {}
    }

    let Some(date) = details.buy_order_date else {
        return Ok(Classification::without_order(ReinvestmentStatus::Pending));
    };
    let (Some(shares), Some(price)) = (details.reinvestment_shares, details.reinvestment_price) else {
        return Ok(Classification::without_order(ReinvestmentStatus::Pending));
    };

    if !shares.is_finite() || shares < 0.0 || !price.is_finite() || price < 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Reinvestment shares and price must be non-negative, got {shares} @ {price}"
        )));
    }

    let order = ReinvestmentOrder {
        date,
        shares,
        price,
    };
    let reinvested = order.amount();
    if reinvested <= 0.0 {
        return Ok(Classification::without_order(ReinvestmentStatus::Pending));
    }

    let status = if reinvested + AMOUNT_TOLERANCE >= total_amount {
        ReinvestmentStatus::Completed
    } else {
        ReinvestmentStatus::Partial
    };
    Ok(Classification {
        status,
        reinvestment: Some(order),
    })
}

/// Creates dividends and books their reinvestments.
pub struct DividendService {
    ledger: Arc<dyn LedgerStore>,
    cache: Arc<dyn HistoryCache>,
    ledger_service: LedgerService,
}

impl DividendService {
    pub fn new(ledger: Arc<dyn LedgerStore>, cache: Arc<dyn HistoryCache>) -> Self {
        Self {
            ledger_service: LedgerService::new(ledger.clone(), cache.clone()),
            ledger,
            cache,
        }
    }

    /// Create a dividend for one holding and ex-dividend date.
    ///
    /// `shares_owned` is taken from the ledger on the record date. When the
    /// reinvestment is already executed, the matching reinvestment transaction
    /// is recorded and linked.
    pub fn create_dividend(&self, input: NewDividend) -> Result<Dividend, CoreError> {
        if !input.dividend_per_share.is_finite() || input.dividend_per_share <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Dividend per share must be positive, got {}",
                input.dividend_per_share
            )));
        }

        let fund = self.fund(input.fund_id)?;
        let holding = self
            .ledger
            .get_portfolio_fund(input.portfolio_fund_id)?
            .ok_or_else(|| CoreError::not_found("Portfolio fund", input.portfolio_fund_id))?;
        if holding.fund_id != fund.id {
            return Err(CoreError::ValidationError(format!(
                "Portfolio fund {} does not hold fund {}",
                holding.id, fund.id
            )));
        }
        if fund.dividend_type == DividendType::None {
            return Err(CoreError::InvalidState(format!(
                "Fund '{}' has dividend type NONE and does not pay dividends",
                fund.name
            )));
        }

        let duplicate = self
            .ledger
            .list_dividends(holding.id)?
            .iter()
            .any(|d| d.ex_dividend_date == input.ex_dividend_date);
        if duplicate {
            return Err(CoreError::InvalidState(format!(
                "A dividend with ex-dividend date {} already exists for holding {}",
                input.ex_dividend_date, holding.id
            )));
        }

        let shares_owned = self
            .ledger_service
            .get_holding_state(holding.id, input.record_date)?
            .shares_held;
        if shares_owned < SHARE_EPSILON {
            return Err(CoreError::ValidationError(format!(
                "No shares of '{}' held on record date {}",
                fund.name, input.record_date
            )));
        }

        let total_amount = shares_owned * input.dividend_per_share;
        let classification = classify_dividend(fund.dividend_type, total_amount, &input.reinvestment)?;
        debug!(
            "Dividend of {total_amount} on '{}' ({}) classified {}",
            fund.name, fund.dividend_type, classification.status
        );

        invalidate_holding(self.cache.as_ref(), &holding, input.record_date)?;
        let reinvestment_transaction_id = self.book_reinvestment(holding.id, &classification)?;

        let dividend = Dividend {
            id: Uuid::new_v4(),
            fund_id: fund.id,
            portfolio_fund_id: holding.id,
            record_date: input.record_date,
            ex_dividend_date: input.ex_dividend_date,
            dividend_per_share: input.dividend_per_share,
            shares_owned,
            total_amount,
            buy_order_date: input.reinvestment.buy_order_date,
            reinvestment_shares: input.reinvestment.reinvestment_shares,
            reinvestment_price: input.reinvestment.reinvestment_price,
            reinvestment_transaction_id,
            reinvestment_status: classification.status,
        };
        if let Err(e) = self.ledger.insert_dividend(dividend.clone()) {
            self.discard_reinvestment(reinvestment_transaction_id);
            return Err(e);
        }
        Ok(dividend)
    }

    /// Re-classify a stock dividend once (more of) its reinvestment is known.
    ///
    /// Any previously linked reinvestment transaction is replaced by one
    /// matching the new details.
    pub fn record_reinvestment_fulfillment(
        &self,
        dividend_id: Uuid,
        details: ReinvestmentDetails,
    ) -> Result<Dividend, CoreError> {
        let mut dividend = self
            .ledger
            .get_dividend(dividend_id)?
            .ok_or_else(|| CoreError::not_found("Dividend", dividend_id))?;
        let fund = self.fund(dividend.fund_id)?;

        if fund.dividend_type != DividendType::Stock {
            return Err(CoreError::InvalidState(format!(
                "Dividend {dividend_id} belongs to a {} fund and has nothing to reinvest",
                fund.dividend_type
            )));
        }
        if dividend.reinvestment_status == ReinvestmentStatus::Completed {
            return Err(CoreError::InvalidState(format!(
                "Dividend {dividend_id} is already fully reinvested"
            )));
        }

        let classification = classify_dividend(fund.dividend_type, dividend.total_amount, &details)?;

        let previous = match dividend.reinvestment_transaction_id {
            Some(previous_id) => self.ledger.get_transaction(previous_id)?,
            None => None,
        };

        // Replacement is booked before the old purchase is removed
        let reinvestment_transaction_id =
            self.book_reinvestment(dividend.portfolio_fund_id, &classification)?;
        if let Some(previous) = &previous {
            if let Err(e) = self.ledger_service.remove_transaction(previous) {
                self.discard_reinvestment(reinvestment_transaction_id);
                return Err(e);
            }
        }

        debug!(
            "Dividend {dividend_id} moved from {} to {}",
            dividend.reinvestment_status, classification.status
        );

        dividend.buy_order_date = details.buy_order_date;
        dividend.reinvestment_shares = details.reinvestment_shares;
        dividend.reinvestment_price = details.reinvestment_price;
        dividend.reinvestment_transaction_id = reinvestment_transaction_id;
        dividend.reinvestment_status = classification.status;
        if let Err(e) = self.ledger.update_dividend(dividend.clone()) {
            self.discard_reinvestment(reinvestment_transaction_id);
            if let Some(previous) = previous {
                let previous_id = previous.id;
                if let Err(restore) = self.ledger.insert_transaction(previous) {
                    warn!("Failed to restore reinvestment {previous_id} of dividend {dividend_id}: {restore}");
                }
            }
            return Err(e);
        }
        Ok(dividend)
    }

    /// Dividends of a holding ordered by ex-dividend date.
    pub fn get_dividends(&self, portfolio_fund_id: Uuid) -> Result<Vec<Dividend>, CoreError> {
        let mut dividends = self.ledger.list_dividends(portfolio_fund_id)?;
        dividends.sort_by_key(|d| d.ex_dividend_date);
        Ok(dividends)
    }

    fn book_reinvestment(
        &self,
        portfolio_fund_id: Uuid,
        classification: &Classification,
    ) -> Result<Option<Uuid>, CoreError> {
        let Some(order) = classification.reinvestment else {
            return Ok(None);
        };
        let recorded = self.ledger_service.record_transaction(NewTransaction {
            portfolio_fund_id,
            transaction_type: TransactionType::DividendReinvestment,
            date: order.date,
            shares: order.shares,
            cost_per_share: order.price,
        })?;
        Ok(Some(recorded.transaction.id))
    }

    fn discard_reinvestment(&self, transaction_id: Option<Uuid>) {
        let Some(transaction_id) = transaction_id else {
            return;
        };
        if let Err(e) = self.ledger.delete_transaction(transaction_id) {
            warn!("Failed to discard reinvestment {transaction_id}: {e}");
        }
    }

    fn fund(&self, fund_id: Uuid) -> Result<Fund, CoreError> {
        self.ledger
            .get_fund(fund_id)?
            .ok_or_else(|| CoreError::not_found("Fund", fund_id))
    }
}
