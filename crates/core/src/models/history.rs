use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a materialized history row aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HistoryScope {
    /// Every holding of one portfolio
    Portfolio(Uuid),
    /// Every holding of one fund, across all portfolios
    Fund(Uuid),
}

impl std::fmt::Display for HistoryScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryScope::Portfolio(id) => write!(f, "portfolio:{id}"),
            HistoryScope::Fund(id) => write!(f, "fund:{id}"),
        }
    }
}

/// One day of valuation for one scope. This is the unit the history cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub scope: HistoryScope,

    /// Market value of all shares held at the end of the day
    pub value: f64,

    /// Remaining cost basis of the shares held
    pub cost: f64,

    /// Cumulative dividends received up to and including this day
    pub dividends: f64,

    /// Cumulative realized gain/loss up to and including this day
    pub realized_gain: f64,

    /// `value − cost` over priced holdings
    pub unrealized_gain: f64,
}

/// A point in a single fund's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHistoryPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub cost: f64,
}

impl From<&HistoryRow> for FundHistoryPoint {
    fn from(row: &HistoryRow) -> Self {
        Self {
            date: row.date,
            value: row.value,
            cost: row.cost,
        }
    }
}

/// Valuation of one portfolio on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub portfolio_id: Uuid,
    pub name: String,
    pub value: f64,
    pub cost: f64,
    pub dividends: f64,
    pub realized_gain: f64,
    pub unrealized_gain: f64,
}

impl PortfolioValuation {
    pub fn from_row(portfolio_id: Uuid, name: &str, row: &HistoryRow) -> Self {
        Self {
            portfolio_id,
            name: name.to_string(),
            value: row.value,
            cost: row.cost,
            dividends: row.dividends,
            realized_gain: row.realized_gain,
            unrealized_gain: row.unrealized_gain,
        }
    }
}

/// All portfolio valuations for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHistoryDay {
    pub date: NaiveDate,
    pub portfolios: Vec<PortfolioValuation>,
}
