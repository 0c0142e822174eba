use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::analytics::{FundHolding, PortfolioSummary};
use crate::models::portfolio::Portfolio;
use crate::storage::traits::{LedgerStore, PriceStore};

use super::valuation_service::{value_holding, DayFigures};

/// Point-in-time portfolio analytics: totals and per-fund breakdowns.
///
/// Values use the latest known price on or before the evaluation date.
/// Realized gains come from the stored realized gain records of sells up to
/// that date; dividends count by record date.
pub struct AnalyticsService {
    ledger: Arc<dyn LedgerStore>,
    prices: Arc<dyn PriceStore>,
}

impl AnalyticsService {
    pub fn new(ledger: Arc<dyn LedgerStore>, prices: Arc<dyn PriceStore>) -> Self {
        Self { ledger, prices }
    }

    /// Summaries of every portfolio shown in the overview (not archived, not excluded).
    pub fn get_portfolio_summary(&self, as_of: NaiveDate) -> Result<Vec<PortfolioSummary>, CoreError> {
        self.ledger
            .list_portfolios()?
            .iter()
            .filter(|p| p.is_in_overview())
            .map(|p| self.summarize(p, as_of))
            .collect()
    }

    /// Summary of one portfolio, archived or not.
    pub fn get_portfolio_summary_by_id(
        &self,
        portfolio_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<PortfolioSummary, CoreError> {
        let portfolio = self.portfolio(portfolio_id)?;
        self.summarize(&portfolio, as_of)
    }

    /// Per-fund breakdown of a portfolio, sorted by fund name.
    pub fn get_portfolio_holdings(
        &self,
        portfolio_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Vec<FundHolding>, CoreError> {
        self.portfolio(portfolio_id)?;

        let mut holdings = Vec::new();
        for link in self.ledger.list_portfolio_funds(portfolio_id)? {
            let fund = self
                .ledger
                .get_fund(link.fund_id)?
                .ok_or_else(|| CoreError::not_found("Fund", link.fund_id))?;
            let valuation = value_holding(self.ledger.as_ref(), self.prices.as_ref(), &link, as_of)?;

            holdings.push(FundHolding {
                portfolio_fund_id: link.id,
                fund_id: fund.id,
                fund_name: fund.name,
                shares: valuation.state.shares_held,
                average_cost: valuation.state.average_cost(),
                latest_price: valuation.price,
                current_value: valuation.figures.value,
                cost_basis: valuation.figures.cost,
                dividends: valuation.figures.dividends,
                realized_gain_loss: valuation.figures.realized_gain,
                unrealized_gain_loss: valuation.figures.unrealized_gain,
            });
        }

        holdings.sort_by(|a, b| a.fund_name.cmp(&b.fund_name));
        Ok(holdings)
    }

    fn summarize(&self, portfolio: &Portfolio, as_of: NaiveDate) -> Result<PortfolioSummary, CoreError> {
        let mut totals = DayFigures::default();
        for link in self.ledger.list_portfolio_funds(portfolio.id)? {
            totals += value_holding(self.ledger.as_ref(), self.prices.as_ref(), &link, as_of)?.figures;
        }

        Ok(PortfolioSummary {
            portfolio_id: portfolio.id,
            name: portfolio.name.clone(),
            as_of_date: as_of,
            total_value: totals.value,
            total_cost: totals.cost,
            total_dividends: totals.dividends,
            total_unrealized_gain_loss: totals.unrealized_gain,
            total_realized_gain_loss: totals.realized_gain,
            total_gain_loss: totals.realized_gain + totals.unrealized_gain,
        })
    }

    fn portfolio(&self, portfolio_id: Uuid) -> Result<Portfolio, CoreError> {
        self.ledger
            .get_portfolio(portfolio_id)?
            .ok_or_else(|| CoreError::not_found("Portfolio", portfolio_id))
    }
}
