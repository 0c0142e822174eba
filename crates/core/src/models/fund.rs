use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a fund distributes its dividends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DividendType {
    /// The fund pays no dividends at all.
    None,
    /// Dividends are paid out in cash.
    Cash,
    /// Dividends are meant to be reinvested into additional shares.
    Stock,
}

impl std::fmt::Display for DividendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DividendType::None => write!(f, "NONE"),
            DividendType::Cash => write!(f, "CASH"),
            DividendType::Stock => write!(f, "STOCK"),
        }
    }
}

/// A tradeable fund.
///
/// Only the fields the valuation engine reads are modelled here; the rest of
/// the fund metadata lives with whatever owns fund CRUD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub id: Uuid,

    /// Display name (e.g., "Vanguard FTSE All-World")
    pub name: String,

    /// Quote symbol, uppercased (e.g., "VWRL.AS"). Funds without a symbol
    /// cannot be priced from a quote source.
    pub symbol: Option<String>,

    /// ISO currency code the fund is quoted in
    pub currency: String,

    pub dividend_type: DividendType,
}

impl Fund {
    pub fn new(
        name: impl Into<String>,
        currency: impl Into<String>,
        dividend_type: DividendType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            symbol: None,
            currency: currency.into().to_uppercase(),
            dividend_type,
        }
    }

    /// Attach a quote symbol. Blank symbols are treated as absent.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into().trim().to_uppercase();
        self.symbol = if symbol.is_empty() { None } else { Some(symbol) };
        self
    }
}
