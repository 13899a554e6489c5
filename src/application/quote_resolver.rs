use crate::domain::errors::OracleError;
use crate::domain::ports::PriceOracle;
use crate::domain::trading::types::PriceType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, warn};

pub const DEFAULT_FALLBACK_DAYS: u32 = 10;

/// A price together with the trading day it was actually found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedQuote {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// Finds the nearest trading day with data, searching forward from the
/// requested date for at most `max_forward_days` extra calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteResolver {
    max_forward_days: u32,
}

impl Default for QuoteResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_DAYS)
    }
}

impl QuoteResolver {
    pub fn new(max_forward_days: u32) -> Self {
        Self { max_forward_days }
    }

    pub fn max_forward_days(&self) -> u32 {
        self.max_forward_days
    }

    /// Only `NoData` triggers the forward search; every other error is
    /// returned immediately. Exhaustion reports `NoData` for `date`.
    pub async fn resolve(
        &self,
        oracle: &dyn PriceOracle,
        ticker: &str,
        date: NaiveDate,
        price_type: PriceType,
    ) -> Result<ResolvedQuote, OracleError> {
        let mut candidate = date;

        for attempt in 0..=self.max_forward_days {
            match oracle.lookup(ticker, candidate, price_type).await {
                Ok(price) => {
                    if attempt > 0 {
                        debug!(
                            "QuoteResolver: {} has no quote on {}, using {} ({} day(s) later)",
                            ticker, date, candidate, attempt
                        );
                    }
                    return Ok(ResolvedQuote {
                        date: candidate,
                        price,
                    });
                }
                Err(OracleError::NoData { .. }) => match candidate.succ_opt() {
                    Some(next) => candidate = next,
                    None => break,
                },
                Err(e) => return Err(e),
            }
        }

        warn!(
            "QuoteResolver: no quote for {} within {} day(s) after {}",
            ticker, self.max_forward_days, date
        );
        Err(OracleError::NoData {
            ticker: ticker.to_string(),
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockPriceOracle;
    use rust_decimal_macros::dec;

    fn nov(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 11, day).unwrap()
    }

    #[tokio::test]
    async fn test_exact_date_hit() {
        let oracle = MockPriceOracle::new().with_price("MSFT", nov(8), dec!(109.56));
        let quote = QuoteResolver::default()
            .resolve(&oracle, "MSFT", nov(8), PriceType::Open)
            .await
            .unwrap();

        assert_eq!(quote, ResolvedQuote { date: nov(8), price: dec!(109.56) });
        assert_eq!(oracle.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_weekend_rolls_forward_to_monday() {
        // 2018-11-10 is a Saturday
        let oracle = MockPriceOracle::new().with_price("MSFT", nov(12), dec!(109.42));
        let quote = QuoteResolver::default()
            .resolve(&oracle, "MSFT", nov(10), PriceType::Open)
            .await
            .unwrap();

        assert_eq!(quote.date, nov(12));
        assert_eq!(oracle.lookup_count(), 3);
    }

    #[tokio::test]
    async fn test_search_is_bounded() {
        let oracle = MockPriceOracle::new().with_price("MSFT", nov(20), dec!(100));
        let result = QuoteResolver::new(3)
            .resolve(&oracle, "MSFT", nov(8), PriceType::Open)
            .await;

        assert_eq!(
            result,
            Err(OracleError::NoData {
                ticker: "MSFT".into(),
                date: nov(8)
            })
        );
        // the requested day plus three more
        assert_eq!(oracle.lookup_count(), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let oracle = MockPriceOracle::new().with_price("MSFT", nov(8), dec!(100));
        oracle.set_unavailable(true);

        let result = QuoteResolver::default()
            .resolve(&oracle, "MSFT", nov(8), PriceType::Open)
            .await;
        assert!(matches!(result, Err(OracleError::Unavailable { .. })));
    }
}
