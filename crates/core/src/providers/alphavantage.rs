use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use super::traits::QuoteSource;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage daily closes.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set via settings as "alphavantage").
///
/// Every call downloads the full daily series once and slices it locally,
/// so a backfill of any length costs a single request.
pub struct AlphaVantageQuoteSource {
    client: Client,
    api_key: String,
}

impl AlphaVantageQuoteSource {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    /// Keep the closes inside `[from, to]`, sorted ascending. Unparseable rows are skipped.
    pub fn closes_in_range(
        series: &HashMap<String, DailyData>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<PricePoint> {
        let mut points: Vec<PricePoint> = series
            .iter()
            .filter_map(|(date_str, data)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                if date < from || date > to {
                    return None;
                }
                let price: f64 = data.close.parse().ok()?;
                Some(PricePoint { date, price })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        points
    }

    async fn fetch_daily_series(
        &self,
        symbol: &str,
    ) -> Result<HashMap<String, DailyData>, CoreError> {
        let resp: TimeSeriesResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "full"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::ExternalSourceFailure {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {symbol}: {e}"),
            })?;

        resp.time_series.ok_or_else(|| CoreError::ExternalSourceFailure {
            provider: PROVIDER.into(),
            message: format!("No time series data for {symbol}. API limit may be exceeded."),
        })
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyData {
    #[serde(rename = "4. close")]
    pub close: String,
}

#[async_trait]
impl QuoteSource for AlphaVantageQuoteSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let series = self.fetch_daily_series(symbol).await?;
        Ok(Self::closes_in_range(&series, from, to))
    }
}
