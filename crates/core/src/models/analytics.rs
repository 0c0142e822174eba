use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shares and cost basis of one holding at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingState {
    pub shares_held: f64,
    pub cost_basis: f64,
}

impl HoldingState {
    /// Blended cost per share under the average-cost method.
    pub fn average_cost(&self) -> f64 {
        if self.shares_held > 0.0 {
            self.cost_basis / self.shares_held
        } else {
            0.0
        }
    }
}

/// Summary of one portfolio at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub portfolio_id: Uuid,

    pub name: String,

    /// Date this summary was computed for
    pub as_of_date: NaiveDate,

    /// Market value of all holdings
    pub total_value: f64,

    /// Remaining cost basis of all holdings
    pub total_cost: f64,

    /// Cash value of all dividends received, reinvested or not
    pub total_dividends: f64,

    /// `total_value − total_cost` over priced holdings
    pub total_unrealized_gain_loss: f64,

    /// Sum of realized gain/loss records for sells up to `as_of_date`
    pub total_realized_gain_loss: f64,

    /// `total_realized_gain_loss + total_unrealized_gain_loss`
    pub total_gain_loss: f64,
}

/// Per-fund breakdown of a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundHolding {
    pub portfolio_fund_id: Uuid,
    pub fund_id: Uuid,
    pub fund_name: String,
    pub shares: f64,
    pub average_cost: f64,

    /// Latest known price on or before the evaluation date
    pub latest_price: Option<f64>,

    pub current_value: f64,
    pub cost_basis: f64,
    pub dividends: f64,
    pub realized_gain_loss: f64,
    pub unrealized_gain_loss: f64,
}
