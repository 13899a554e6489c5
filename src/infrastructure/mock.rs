use crate::domain::errors::OracleError;
use crate::domain::ports::PriceOracle;
use crate::domain::trading::types::{DailyQuote, PriceType};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Deterministic in-memory price oracle for tests and demos.
///
/// Tickers resolve from registered aliases (case-insensitive) or from any
/// ticker that has quotes. Lookups are counted so callers can assert how
/// many provider round-trips an operation cost.
#[derive(Default)]
pub struct MockPriceOracle {
    aliases: RwLock<HashMap<String, String>>,
    quotes: RwLock<HashMap<String, BTreeMap<NaiveDate, DailyQuote>>>,
    lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl MockPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `query` (any case) as resolving to `ticker`.
    pub fn with_alias(mut self, query: &str, ticker: &str) -> Self {
        self.aliases
            .get_mut()
            .insert(query.trim().to_lowercase(), ticker.to_string());
        self
    }

    /// Quote with every price field set to `price`.
    pub fn with_price(self, ticker: &str, date: NaiveDate, price: Decimal) -> Self {
        self.with_quote(
            ticker,
            DailyQuote {
                date,
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 0,
            },
        )
    }

    pub fn with_quote(mut self, ticker: &str, quote: DailyQuote) -> Self {
        self.quotes
            .get_mut()
            .entry(ticker.to_string())
            .or_default()
            .insert(quote.date, quote);
        self
    }

    /// Simulate the provider going away (every call fails with `Unavailable`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), OracleError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable {
                reason: "mock provider switched off".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn resolve_ticker(&self, query: &str) -> Result<String, OracleError> {
        self.check_available()?;

        let key = query.trim();
        if key.is_empty() {
            return Err(OracleError::TickerNotFound {
                query: query.to_string(),
            });
        }

        if let Some(ticker) = self.aliases.read().await.get(&key.to_lowercase()) {
            return Ok(ticker.clone());
        }

        let upper = key.to_uppercase();
        if self.quotes.read().await.contains_key(&upper) {
            return Ok(upper);
        }

        Err(OracleError::TickerNotFound {
            query: query.to_string(),
        })
    }

    async fn lookup(
        &self,
        ticker: &str,
        date: NaiveDate,
        price_type: PriceType,
    ) -> Result<Decimal, OracleError> {
        self.check_available()?;
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let quotes = self.quotes.read().await;
        let price = quotes
            .get(ticker)
            .and_then(|series| series.get(&date))
            .map(|quote| quote.price(price_type));

        debug!(
            "MockPriceOracle: {} {} {} -> {:?}",
            ticker, date, price_type, price
        );

        price.ok_or_else(|| OracleError::NoData {
            ticker: ticker.to_string(),
            date,
        })
    }
}
