use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a single-fund price update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub fund_id: Uuid,

    /// `true` when at least one new price row was stored
    pub inserted: bool,

    pub prices_added: usize,
}

impl PriceUpdate {
    pub fn unchanged(fund_id: Uuid) -> Self {
        Self {
            fund_id,
            inserted: false,
            prices_added: 0,
        }
    }

    pub fn added(fund_id: Uuid, prices_added: usize) -> Self {
        Self {
            fund_id,
            inserted: prices_added > 0,
            prices_added,
        }
    }
}

/// A fund that was processed successfully in a batch update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundUpdateResult {
    pub fund_id: Uuid,
    pub fund_name: String,
    pub prices_added: usize,
}

/// A fund that failed in a batch update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundUpdateError {
    pub fund_id: Uuid,
    pub fund_name: String,
    pub message: String,
}

/// Aggregated result of `update_all_fund_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateSummary {
    /// `true` iff at least one fund succeeded
    pub success: bool,
    pub total_updated: usize,
    pub total_errors: usize,
    pub updated_funds: Vec<FundUpdateResult>,
    pub errors: Vec<FundUpdateError>,
}

impl BatchUpdateSummary {
    /// Fold per-fund outcomes into a summary. The verdict depends only on the
    /// multiset of outcomes.
    pub fn from_outcomes(
        outcomes: impl IntoIterator<Item = Result<FundUpdateResult, FundUpdateError>>,
    ) -> Self {
        let mut updated_funds = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => updated_funds.push(result),
                Err(error) => errors.push(error),
            }
        }
        Self {
            success: !updated_funds.is_empty(),
            total_updated: updated_funds.len(),
            total_errors: errors.len(),
            updated_funds,
            errors,
        }
    }

    /// Total number of price rows added across all funds.
    pub fn total_prices_added(&self) -> usize {
        self.updated_funds.iter().map(|f| f.prices_added).sum()
    }

    /// A `PartialFailure` error describing the failed items, if any failed.
    pub fn partial_failure(&self) -> Option<crate::errors::CoreError> {
        (self.total_errors > 0).then(|| crate::errors::CoreError::PartialFailure {
            failed: self.total_errors,
            total: self.total_errors + self.total_updated,
        })
    }
}
