use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use super::traits::QuoteSource;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance daily closes for funds, ETFs and equities.
///
/// Free and keyless (unofficial public API). Prices come back in the
/// instrument's quote currency.
pub struct YahooFinanceQuoteSource {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceQuoteSource {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| {
            CoreError::ExternalSourceFailure {
                provider: PROVIDER.into(),
                message: format!("Failed to create connector: {e}"),
            }
        })?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: String| CoreError::ExternalSourceFailure {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        };
        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(e.to_string()))?;
        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(e.to_string()))?
            .with_hms(0, 0, 0)
            .map_err(|e| invalid(e.to_string()))?
            .assume_utc();
        Ok(odt)
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl QuoteSource for YahooFinanceQuoteSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        // end is exclusive on Yahoo's side
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::ExternalSourceFailure {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol} ({from}..={to}): {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::ExternalSourceFailure {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp as i64)?;
                (date >= from && date <= to).then_some(PricePoint {
                    date,
                    price: q.close,
                })
            })
            .collect();

        Ok(points)
    }
}
