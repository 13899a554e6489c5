use crate::domain::errors::OracleError;
use crate::domain::trading::types::PriceType;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Price lookup capability injected into the portfolio service.
///
/// Implementations own credentials, endpoints and pacing; callers only see
/// resolved ticker codes and prices.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Resolve a free-form company name or code to a ticker code.
    async fn resolve_ticker(&self, query: &str) -> Result<String, OracleError>;

    /// Quote for `ticker` on exactly `date`; `NoData` when the provider has none.
    async fn lookup(
        &self,
        ticker: &str,
        date: NaiveDate,
        price_type: PriceType,
    ) -> Result<Decimal, OracleError>;
}
