use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named collection of fund holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Uuid,

    pub name: String,

    /// Archived portfolios stay retrievable by ID but drop out of overviews.
    #[serde(default)]
    pub is_archived: bool,

    /// Explicitly hidden from aggregate views (summary, unscoped history).
    #[serde(default)]
    pub exclude_from_overview: bool,
}

impl Portfolio {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_archived: false,
            exclude_from_overview: false,
        }
    }

    /// Whether this portfolio takes part in aggregate views.
    pub fn is_in_overview(&self) -> bool {
        !self.is_archived && !self.exclude_from_overview
    }
}

/// Link between a portfolio and a fund it holds. Transactions and dividends
/// hang off this link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortfolioFund {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub fund_id: Uuid,
}

impl PortfolioFund {
    pub fn new(portfolio_id: Uuid, fund_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            portfolio_id,
            fund_id,
        }
    }
}
