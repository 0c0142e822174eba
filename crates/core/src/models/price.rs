use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A single daily close as delivered by a quote source (date → price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// A stored fund price: one row per fund per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPrice {
    pub fund_id: Uuid,
    pub date: NaiveDate,
    pub price: f64,
}

impl FundPrice {
    pub fn new(fund_id: Uuid, date: NaiveDate, price: f64) -> Self {
        Self {
            fund_id,
            date,
            price,
        }
    }
}

/// Date-sorted price series for every fund.
///
/// Each fund's points are kept in ascending date order so lookups and
/// inserts are binary searches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    pub entries: HashMap<Uuid, Vec<PricePoint>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-date lookup.
    pub fn get_price(&self, fund_id: Uuid, date: NaiveDate) -> Option<f64> {
        let entries = self.entries.get(&fund_id)?;
        entries
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| entries[idx].price)
    }

    /// Insert or overwrite the price for one date.
    /// Returns `true` when the date had no price before.
    pub fn set_price(&mut self, fund_id: Uuid, date: NaiveDate, price: f64) -> bool {
        let entries = self.entries.entry(fund_id).or_default();
        match entries.binary_search_by_key(&date, |p| p.date) {
            Ok(idx) => {
                entries[idx].price = price;
                false
            }
            Err(idx) => {
                entries.insert(idx, PricePoint { date, price });
                true
            }
        }
    }

    /// Most recent price on or before `date`.
    pub fn latest_on_or_before(&self, fund_id: Uuid, date: NaiveDate) -> Option<PricePoint> {
        let entries = self.entries.get(&fund_id)?;
        let idx = match entries.binary_search_by_key(&date, |p| p.date) {
            Ok(idx) => idx,
            Err(0) => return None,
            Err(pos) => pos - 1,
        };
        entries.get(idx).cloned()
    }

    /// All points for a fund in `[from, to]`, ascending.
    pub fn get_price_range(&self, fund_id: Uuid, from: NaiveDate, to: NaiveDate) -> Vec<PricePoint> {
        if from > to {
            return Vec::new();
        }
        self.entries
            .get(&fund_id)
            .map(|entries| {
                let start = entries
                    .binary_search_by_key(&from, |p| p.date)
                    .unwrap_or_else(|pos| pos);
                let end = entries
                    .binary_search_by_key(&to, |p| p.date)
                    .map(|pos| pos + 1)
                    .unwrap_or_else(|pos| pos);
                entries[start..end].to_vec()
            })
            .unwrap_or_default()
    }

    /// Total number of stored price points across all funds.
    pub fn total_entries(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }
}
