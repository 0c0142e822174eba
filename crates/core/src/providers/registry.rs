use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::price::PricePoint;

use super::alphavantage::AlphaVantageQuoteSource;
use super::traits::QuoteSource;
use super::yahoo_finance::YahooFinanceQuoteSource;

/// Ordered chain of quote sources.
///
/// Each request goes to the first registered source; the next one is asked
/// only when the previous one errors or has nothing for the range. A source
/// is never asked twice for the same request.
pub struct QuoteSourceRegistry {
    sources: Vec<Box<dyn QuoteSource>>,
}

impl QuoteSourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Create a registry with all default sources pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance — no API key needed (primary)
        match YahooFinanceQuoteSource::new() {
            Ok(yahoo) => registry.register(Box::new(yahoo)),
            Err(e) => warn!("Yahoo Finance quote source unavailable: {e}"),
        }

        // Alpha Vantage — requires API key (fallback)
        if let Some(key) = api_keys.get("alphavantage") {
            registry.register(Box::new(AlphaVantageQuoteSource::new(key.clone())));
        }

        registry
    }

    /// Register a new quote source at the end of the chain.
    pub fn register(&mut self, source: Box<dyn QuoteSource>) {
        self.sources.push(source);
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Names of registered sources, in priority order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }
}

impl Default for QuoteSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for QuoteSourceRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        if self.sources.is_empty() {
            return Err(CoreError::ExternalSourceFailure {
                provider: self.name().to_string(),
                message: "No quote source registered".into(),
            });
        }

        let mut last_error = None;
        let mut answered_empty = false;

        for source in &self.sources {
            match source.get_daily_closes(symbol, from, to).await {
                Ok(points) => {
                    let points = sanitize(points, from, to);
                    if !points.is_empty() {
                        debug!(
                            "{} returned {} closes for {symbol} in {from}..={to}",
                            source.name(),
                            points.len()
                        );
                        return Ok(points);
                    }
                    answered_empty = true;
                }
                Err(e) => {
                    warn!("{} failed for {symbol}: {e}", source.name());
                    last_error = Some(e);
                }
            }
        }

        if answered_empty {
            return Ok(Vec::new());
        }
        Err(last_error.unwrap_or_else(|| CoreError::ExternalSourceFailure {
            provider: self.name().to_string(),
            message: format!("No data for {symbol}"),
        }))
    }
}

/// Keep only finite, non-negative prices inside the requested range, sorted
/// and with one point per date.
fn sanitize(mut points: Vec<PricePoint>, from: NaiveDate, to: NaiveDate) -> Vec<PricePoint> {
    points.retain(|p| p.price.is_finite() && p.price >= 0.0 && p.date >= from && p.date <= to);
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    points
}
