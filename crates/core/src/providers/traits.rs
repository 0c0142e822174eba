use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::PricePoint;

/// Abstraction over any source of daily fund closes.
///
/// Implementations may return fewer days than requested (weekends, holidays,
/// short listings) or nothing at all; callers decide what an empty answer means.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Daily closes for `symbol` in `[from, to]`, sorted by date.
    async fn get_daily_closes(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;
}
