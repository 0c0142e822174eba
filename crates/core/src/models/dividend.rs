use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a dividend stands with respect to being reinvested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReinvestmentStatus {
    /// Reinvestment intended but not (fully) known yet
    Pending,
    /// Some, but not all, of the dividend was reinvested
    Partial,
    /// Nothing left to reinvest (or a cash dividend)
    Completed,
}

impl std::fmt::Display for ReinvestmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReinvestmentStatus::Pending => write!(f, "PENDING"),
            ReinvestmentStatus::Partial => write!(f, "PARTIAL"),
            ReinvestmentStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// One ex-dividend event on one holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub portfolio_fund_id: Uuid,
    pub record_date: NaiveDate,
    pub ex_dividend_date: NaiveDate,
    pub dividend_per_share: f64,

    /// Shares held on the record date
    pub shares_owned: f64,

    /// `shares_owned × dividend_per_share`
    pub total_amount: f64,

    pub buy_order_date: Option<NaiveDate>,
    pub reinvestment_shares: Option<f64>,
    pub reinvestment_price: Option<f64>,

    /// The dividend-reinvestment transaction created for this dividend, if any
    pub reinvestment_transaction_id: Option<Uuid>,

    pub reinvestment_status: ReinvestmentStatus,
}

/// Input for creating a dividend. Reinvestment details are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDividend {
    pub fund_id: Uuid,
    pub portfolio_fund_id: Uuid,
    pub record_date: NaiveDate,
    pub ex_dividend_date: NaiveDate,
    pub dividend_per_share: f64,
    #[serde(default)]
    pub reinvestment: ReinvestmentDetails,
}

/// Reinvestment fields as supplied by the caller, any of which may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReinvestmentDetails {
    pub buy_order_date: Option<NaiveDate>,
    pub reinvestment_shares: Option<f64>,
    pub reinvestment_price: Option<f64>,
}

impl ReinvestmentDetails {
    /// Details of an executed reinvestment order.
    pub fn executed(buy_order_date: NaiveDate, shares: f64, price: f64) -> Self {
        Self {
            buy_order_date: Some(buy_order_date),
            reinvestment_shares: Some(shares),
            reinvestment_price: Some(price),
        }
    }

    /// An order was placed but its execution is not yet known.
    pub fn ordered(buy_order_date: NaiveDate) -> Self {
        Self {
            buy_order_date: Some(buy_order_date),
            ..Self::default()
        }
    }
}
