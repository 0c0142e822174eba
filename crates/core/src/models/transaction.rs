use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Buy,
    Sell,
    /// Shares bought with the proceeds of a dividend
    DividendReinvestment,
}

impl TransactionType {
    /// Buys and reinvestments add shares; sells remove them.
    pub fn adds_shares(&self) -> bool {
        !matches!(self, TransactionType::Sell)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "buy"),
            TransactionType::Sell => write!(f, "sell"),
            TransactionType::DividendReinvestment => write!(f, "dividend_reinvestment"),
        }
    }
}

/// A single buy/sell/reinvestment on a portfolio-fund holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,

    pub portfolio_fund_id: Uuid,

    /// Trade date (daily granularity)
    pub date: NaiveDate,

    pub transaction_type: TransactionType,

    /// Number of shares, always positive
    pub shares: f64,

    /// Price per share paid (buy/reinvestment) or received (sell)
    pub cost_per_share: f64,
}

impl Transaction {
    pub fn new(
        portfolio_fund_id: Uuid,
        transaction_type: TransactionType,
        date: NaiveDate,
        shares: f64,
        cost_per_share: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            portfolio_fund_id,
            date,
            transaction_type,
            shares,
            cost_per_share,
        }
    }

    /// `shares × cost_per_share`
    pub fn total_amount(&self) -> f64 {
        self.shares * self.cost_per_share
    }
}

/// Input for recording a new transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub portfolio_fund_id: Uuid,
    pub transaction_type: TransactionType,
    pub date: NaiveDate,
    pub shares: f64,
    pub cost_per_share: f64,
}

/// Realized result of one sell transaction. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedGainLoss {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub fund_id: Uuid,
    pub sell_transaction_id: Uuid,

    /// Date of the sell transaction
    pub transaction_date: NaiveDate,

    pub shares: f64,

    /// Portion of the holding's cost basis removed by the sale
    pub cost_basis: f64,

    /// `shares × sell price`
    pub sale_proceeds: f64,
}

impl RealizedGainLoss {
    /// `sale_proceeds − cost_basis`
    pub fn realized_gain(&self) -> f64 {
        self.sale_proceeds - self.cost_basis
    }
}
