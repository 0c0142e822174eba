use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::analytics::HoldingState;
use crate::models::dividend::Dividend;
use crate::models::history::{
    FundHistoryPoint, HistoryRow, HistoryScope, PortfolioHistoryDay, PortfolioValuation,
};
use crate::models::portfolio::{Portfolio, PortfolioFund};
use crate::models::price::FundPrice;
use crate::models::transaction::{RealizedGainLoss, Transaction};
use crate::storage::traits::{covers_range, HistoryCache, LedgerStore, PriceStore};

use super::ledger_service::apply_transaction;

/// Valuation figures of one holding (or a sum of holdings) on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayFigures {
    pub value: f64,
    pub cost: f64,
    pub dividends: f64,
    pub realized_gain: f64,
    pub unrealized_gain: f64,
}

impl std::ops::AddAssign for DayFigures {
    fn add_assign(&mut self, other: Self) {
        self.value += other.value;
        self.cost += other.cost;
        self.dividends += other.dividends;
        self.realized_gain += other.realized_gain;
        self.unrealized_gain += other.unrealized_gain;
    }
}

/// One holding valued at a single date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingValuation {
    pub state: HoldingState,
    pub figures: DayFigures,
    /// Latest known price on or before the date, if any
    pub price: Option<f64>,
}

/// Everything needed to value one holding over `[from, to]`.
pub(crate) struct HoldingInputs {
    /// Full history, in replay order
    transactions: Vec<Transaction>,
    /// Ordered by record date
    dividends: Vec<Dividend>,
    /// Ordered by sell date
    realized: Vec<RealizedGainLoss>,
    /// Stored prices in `[from, to]`, ascending
    prices: Vec<FundPrice>,
    /// Latest price before `from`
    seed_price: Option<f64>,
}

impl HoldingInputs {
    pub(crate) fn load(
        ledger: &dyn LedgerStore,
        prices: &dyn PriceStore,
        holding: &PortfolioFund,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Self, CoreError> {
        let mut transactions = ledger.list_transactions(holding.id)?;
        transactions.sort_by_key(|t| t.date);

        let mut dividends = ledger.list_dividends(holding.id)?;
        dividends.sort_by_key(|d| d.record_date);

        let mut realized: Vec<RealizedGainLoss> = ledger
            .list_realized_gains(holding.portfolio_id)?
            .into_iter()
            .filter(|r| r.fund_id == holding.fund_id)
            .collect();
        realized.sort_by_key(|r| r.transaction_date);

        let seed_price = match from.pred_opt() {
            Some(before) => prices.get_latest(holding.fund_id, before)?.map(|p| p.price),
            None => None,
        };

        Ok(Self {
            transactions,
            dividends,
            realized,
            prices: prices.get_range(holding.fund_id, from, to)?,
            seed_price,
        })
    }

    fn first_activity(&self) -> Option<NaiveDate> {
        self.transactions.first().map(|t| t.date)
    }

    /// Value the holding on each of `days` (ascending).
    ///
    /// Transactions, dividends, realized gains and prices are each walked
    /// once, so this is O(days + events). A day without a stored price uses
    /// the most recent earlier one; a holding never priced is worth zero.
    fn series(&self, days: &[NaiveDate]) -> Result<Vec<HoldingValuation>, CoreError> {
        let mut state = HoldingState::default();
        let mut dividends = 0.0;
        let mut realized_gain = 0.0;
        let mut price = self.seed_price;

        let mut transactions = self.transactions.iter().peekable();
        let mut dividend_events = self.dividends.iter().peekable();
        let mut sales = self.realized.iter().peekable();
        let mut quotes = self.prices.iter().peekable();

        let mut out = Vec::with_capacity(days.len());
        for &day in days {
            while let Some(tx) = transactions.next_if(|t| t.date <= day) {
                state = apply_transaction(state, tx)?.0;
            }
            while let Some(d) = dividend_events.next_if(|d| d.record_date <= day) {
                dividends += d.total_amount;
            }
            while let Some(r) = sales.next_if(|r| r.transaction_date <= day) {
                realized_gain += r.realized_gain();
            }
            while let Some(p) = quotes.next_if(|p| p.date <= day) {
                price = Some(p.price);
            }

            let (value, unrealized_gain) = match price {
                Some(p) => {
                    let value = state.shares_held * p;
                    (value, value - state.cost_basis)
                }
                None => (0.0, 0.0),
            };

            out.push(HoldingValuation {
                state,
                figures: DayFigures {
                    value,
                    cost: state.cost_basis,
                    dividends,
                    realized_gain,
                    unrealized_gain,
                },
                price,
            });
        }
        Ok(out)
    }
}

/// Value a single holding at the end of `as_of`.
pub(crate) fn value_holding(
    ledger: &dyn LedgerStore,
    prices: &dyn PriceStore,
    holding: &PortfolioFund,
    as_of: NaiveDate,
) -> Result<HoldingValuation, CoreError> {
    let inputs = HoldingInputs::load(ledger, prices, holding, as_of, as_of)?;
    let mut series = inputs.series(&[as_of])?;
    Ok(series.pop().unwrap_or(HoldingValuation {
        state: HoldingState::default(),
        figures: DayFigures::default(),
        price: None,
    }))
}

/// Produces daily valuation series for funds and portfolios.
///
/// Reads go to the history cache first. When its rows do not cover every day
/// of the requested range, the series is recomputed from the ledger and price
/// store, and the result is optionally written back. Recomputation never
/// depends on what the cache holds.
pub struct ValuationService {
    ledger: Arc<dyn LedgerStore>,
    prices: Arc<dyn PriceStore>,
    cache: Arc<dyn HistoryCache>,
    write_through: bool,
}

impl ValuationService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        prices: Arc<dyn PriceStore>,
        cache: Arc<dyn HistoryCache>,
        write_through: bool,
    ) -> Self {
        Self {
            ledger,
            prices,
            cache,
            write_through,
        }
    }

    /// Daily value and cost of one fund across every portfolio holding it.
    pub fn get_fund_history(
        &self,
        fund_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FundHistoryPoint>, CoreError> {
        if self.ledger.get_fund(fund_id)?.is_none() {
            return Err(CoreError::not_found("Fund", fund_id));
        }
        let holdings = self.ledger.portfolio_funds_for_fund(fund_id)?;
        let rows = self.scope_history(HistoryScope::Fund(fund_id), &holdings, start, end)?;
        Ok(rows.iter().map(FundHistoryPoint::from).collect())
    }

    /// Daily valuations of one portfolio, or of every active portfolio when
    /// `portfolio_id` is `None`.
    ///
    /// Archived and overview-excluded portfolios only appear when asked for by id.
    pub fn get_portfolio_history(
        &self,
        portfolio_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioHistoryDay>, CoreError> {
        let portfolios = match portfolio_id {
            Some(id) => vec![self.portfolio(id)?],
            None => self
                .ledger
                .list_portfolios()?
                .into_iter()
                .filter(Portfolio::is_in_overview)
                .collect(),
        };

        let mut days: BTreeMap<NaiveDate, Vec<PortfolioValuation>> = BTreeMap::new();
        for portfolio in &portfolios {
            let holdings = self.ledger.list_portfolio_funds(portfolio.id)?;
            let rows =
                self.scope_history(HistoryScope::Portfolio(portfolio.id), &holdings, start, end)?;
            for row in &rows {
                days.entry(row.date)
                    .or_default()
                    .push(PortfolioValuation::from_row(portfolio.id, &portfolio.name, row));
            }
        }

        Ok(days
            .into_iter()
            .map(|(date, portfolios)| PortfolioHistoryDay { date, portfolios })
            .collect())
    }

    /// Recompute a portfolio's history over `[start, end]` and store it,
    /// replacing whatever the cache held. Returns the number of rows written.
    pub fn materialize_portfolio_history(
        &self,
        portfolio_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, CoreError> {
        self.portfolio(portfolio_id)?;
        let holdings = self.ledger.list_portfolio_funds(portfolio_id)?;
        let scope = HistoryScope::Portfolio(portfolio_id);
        let rows = self.recompute(scope, &holdings, start, end)?;
        self.cache.put_rows(&rows)?;
        debug!("Materialized {} rows for {scope}", rows.len());
        Ok(rows.len())
    }

    fn scope_history(
        &self,
        scope: HistoryScope,
        holdings: &[PortfolioFund],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoryRow>, CoreError> {
        let Some(from) = self.effective_start(holdings, start)? else {
            return Ok(Vec::new());
        };
        if from > end {
            return Ok(Vec::new());
        }

        match self.cache.get_rows(scope, from, end) {
            Ok(cached) if covers_range(&cached, from, end) => {
                debug!("History cache hit for {scope} {from}..={end}");
                return Ok(cached);
            }
            Ok(cached) => debug!(
                "History cache miss for {scope} {from}..={end} ({} rows cached)",
                cached.len()
            ),
            Err(e) => warn!("History cache read for {scope} failed, recomputing: {e}"),
        }

        let rows = self.recompute(scope, holdings, from, end)?;
        if self.write_through {
            if let Err(e) = self.cache.put_rows(&rows) {
                warn!("History cache write for {scope} failed: {e}");
            }
        }
        Ok(rows)
    }

    /// The later of `start` and the first transaction of any holding, or
    /// `None` when nothing was ever traded.
    fn effective_start(
        &self,
        holdings: &[PortfolioFund],
        start: NaiveDate,
    ) -> Result<Option<NaiveDate>, CoreError> {
        let mut first: Option<NaiveDate> = None;
        for holding in holdings {
            let earliest = self
                .ledger
                .list_transactions(holding.id)?
                .iter()
                .map(|t| t.date)
                .min();
            first = first.into_iter().chain(earliest).min();
        }
        Ok(first.map(|d| d.max(start)))
    }

    /// Pure recomputation from the ledger and price store, one row per day.
    fn recompute(
        &self,
        scope: HistoryScope,
        holdings: &[PortfolioFund],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HistoryRow>, CoreError> {
        let inputs = holdings
            .iter()
            .map(|h| HoldingInputs::load(self.ledger.as_ref(), self.prices.as_ref(), h, start, end))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(first) = inputs.iter().filter_map(HoldingInputs::first_activity).min() else {
            return Ok(Vec::new());
        };
        let from = first.max(start);
        let days: Vec<NaiveDate> = from.iter_days().take_while(|d| *d <= end).collect();
        debug!("Recomputing {scope} over {} days from {from}", days.len());

        let mut totals = vec![DayFigures::default(); days.len()];
        for holding in &inputs {
            for (total, day) in totals.iter_mut().zip(holding.series(&days)?) {
                *total += day.figures;
            }
        }

        Ok(days
            .into_iter()
            .zip(totals)
            .map(|(date, f)| HistoryRow {
                date,
                scope,
                value: f.value,
                cost: f.cost,
                dividends: f.dividends,
                realized_gain: f.realized_gain,
                unrealized_gain: f.unrealized_gain,
            })
            .collect())
    }

    fn portfolio(&self, portfolio_id: Uuid) -> Result<Portfolio, CoreError> {
        self.ledger
            .get_portfolio(portfolio_id)?
            .ok_or_else(|| CoreError::not_found("Portfolio", portfolio_id))
    }
}
