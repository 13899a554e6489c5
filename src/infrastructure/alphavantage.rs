//! Alpha Vantage backed [`PriceOracle`].
//!
//! Ticker search uses `SYMBOL_SEARCH`; quotes come from the full
//! `TIME_SERIES_DAILY` series, both requested as csv. A fetched series is
//! kept in memory and written to `<cache_dir>/<TICKER>.csv` verbatim, so
//! later lookups (and later runs) cost no request budget. In offline mode
//! only the on-disk cache is consulted.

use crate::domain::errors::OracleError;
use crate::domain::ports::PriceOracle;
use crate::domain::trading::types::{DailyQuote, PriceType};
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query,
};
use crate::infrastructure::core::rate_limiter::RateLimiter;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Free-tier guidance: a rate-limit notice means wait about a minute
const RATE_LIMIT_BACKOFF_SECS: u64 = 60;

type DailySeries = BTreeMap<NaiveDate, DailyQuote>;

#[derive(Debug, Clone)]
pub struct AlphaVantageSettings {
    pub base_url: String,
    pub api_key: String,
    /// Directory holding `<TICKER>.csv` series files
    pub cache_dir: PathBuf,
    pub offline: bool,
    pub max_requests_per_minute: u32,
    pub http: HttpClientSettings,
}

impl Default for AlphaVantageSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            cache_dir: PathBuf::from("stocks"),
            offline: false,
            max_requests_per_minute: 5,
            http: HttpClientSettings::default(),
        }
    }
}

pub struct AlphaVantagePriceOracle {
    client: ClientWithMiddleware,
    settings: AlphaVantageSettings,
    limiter: RateLimiter,
    tickers: RwLock<HashMap<String, String>>,
    series: RwLock<HashMap<String, Arc<DailySeries>>>,
    /// Tickers downloaded during this run (never refetched)
    fetched: RwLock<HashSet<String>>,
}

impl AlphaVantagePriceOracle {
    pub fn new(settings: AlphaVantageSettings) -> Self {
        info!(
            "AlphaVantagePriceOracle: {} mode, cache {:?}",
            if settings.offline { "offline" } else { "online" },
            settings.cache_dir
        );
        Self {
            client: HttpClientFactory::create_client(settings.http),
            limiter: RateLimiter::per_minute(settings.max_requests_per_minute),
            settings,
            tickers: RwLock::new(HashMap::new()),
            series: RwLock::new(HashMap::new()),
            fetched: RwLock::new(HashSet::new()),
        }
    }

    fn cache_path(&self, ticker: &str) -> PathBuf {
        self.settings.cache_dir.join(format!("{}.csv", ticker))
    }

    fn ensure_online(&self, what: &str) -> Result<(), OracleError> {
        if self.settings.offline {
            return Err(OracleError::Unavailable {
                reason: format!("offline mode: {} is not cached", what),
            });
        }
        if self.settings.api_key.is_empty() {
            return Err(OracleError::Unavailable {
                reason: "ALPHAVANTAGE_API_KEY is not set".to_string(),
            });
        }
        Ok(())
    }

    /// One rate-limited GET against `/query`, bounded by the request timeout.
    async fn query(&self, params: &[(&str, &str)]) -> Result<String, OracleError> {
        let mut params = params.to_vec();
        params.push(("apikey", self.settings.api_key.as_str()));
        params.push(("datatype", "csv"));
        let url = build_url_with_query(&self.settings.base_url, "query", &params).map_err(|e| {
            OracleError::Unavailable {
                reason: format!("{:#}", e),
            }
        })?;

        self.limiter.acquire().await;

        let timeout = self.settings.http.request_timeout;
        let request = async {
            let response = match self.client.get(url.as_str()).send().await {
                Ok(response) => response,
                Err(reqwest_middleware::Error::Reqwest(e)) if e.is_timeout() => {
                    return Err(timeout_error(timeout));
                }
                Err(e) => {
                    return Err(OracleError::Unavailable {
                        reason: e.to_string(),
                    });
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(OracleError::RateLimited {
                    retry_after_secs: RATE_LIMIT_BACKOFF_SECS,
                });
            }
            if !status.is_success() {
                return Err(OracleError::Unavailable {
                    reason: format!("HTTP {}", status),
                });
            }
            response.text().await.map_err(|e| {
                if e.is_timeout() {
                    timeout_error(timeout)
                } else {
                    OracleError::Unavailable {
                        reason: e.to_string(),
                    }
                }
            })
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| timeout_error(timeout))?
    }

    async fn series_for(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<Arc<DailySeries>, OracleError> {
        let cached = self.series.read().await.get(ticker).cloned();
        let cached = match cached {
            Some(series) => Some(series),
            None => self.read_disk_cache(ticker).await,
        };

        if let Some(series) = cached {
            let stale = series.keys().next_back().is_some_and(|last| *last < date);
            let refreshable = !self.settings.offline
                && !self.fetched.read().await.contains(ticker);
            if !(stale && refreshable) {
                return Ok(series);
            }
            debug!(
                "AlphaVantagePriceOracle: cached {} ends before {}, refreshing",
                ticker, date
            );
        }

        self.ensure_online(&format!("daily series for {}", ticker))?;
        let body = self
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("outputsize", "full"),
                ("symbol", ticker),
            ])
            .await?;
        let series = Arc::new(parse_daily_series(&body, ticker)?);
        info!(
            "AlphaVantagePriceOracle: fetched {} daily quotes for {}",
            series.len(),
            ticker
        );

        self.write_disk_cache(ticker, &body).await;
        self.fetched.write().await.insert(ticker.to_string());
        self.series
            .write()
            .await
            .insert(ticker.to_string(), series.clone());
        Ok(series)
    }

    async fn read_disk_cache(&self, ticker: &str) -> Option<Arc<DailySeries>> {
        let path = self.cache_path(ticker);
        let body = tokio::fs::read_to_string(&path).await.ok()?;
        match parse_daily_series(&body, ticker) {
            Ok(series) => {
                debug!("AlphaVantagePriceOracle: loaded {} from {:?}", ticker, path);
                let series = Arc::new(series);
                self.series
                    .write()
                    .await
                    .insert(ticker.to_string(), series.clone());
                Some(series)
            }
            Err(e) => {
                warn!(
                    "AlphaVantagePriceOracle: ignoring unreadable cache {:?}: {}",
                    path, e
                );
                None
            }
        }
    }

    async fn write_disk_cache(&self, ticker: &str, body: &str) {
        let path = self.cache_path(ticker);
        let result = async {
            tokio::fs::create_dir_all(&self.settings.cache_dir).await?;
            let temp_path = path.with_extension("csv.tmp");
            tokio::fs::write(&temp_path, body).await?;
            tokio::fs::rename(&temp_path, &path).await
        }
        .await;

        if let Err(e) = result {
            warn!(
                "AlphaVantagePriceOracle: could not cache {} at {:?}: {}",
                ticker, path, e
            );
        }
    }
}

#[async_trait]
impl PriceOracle for AlphaVantagePriceOracle {
    async fn resolve_ticker(&self, query: &str) -> Result<String, OracleError> {
        let key = query.trim();
        if key.is_empty() {
            return Err(OracleError::TickerNotFound {
                query: query.to_string(),
            });
        }
        let cache_key = key.to_lowercase();
        if let Some(ticker) = self.tickers.read().await.get(&cache_key) {
            return Ok(ticker.clone());
        }

        // A code whose series is already on disk resolves without a request
        let upper = key.to_uppercase();
        if self.series.read().await.contains_key(&upper) || self.cache_path(&upper).exists() {
            self.tickers.write().await.insert(cache_key, upper.clone());
            return Ok(upper);
        }

        if self.settings.offline {
            return Err(OracleError::TickerNotFound {
                query: query.to_string(),
            });
        }
        self.ensure_online("ticker search")?;

        let body = self
            .query(&[("function", "SYMBOL_SEARCH"), ("keywords", key)])
            .await?;
        let ticker = parse_symbol_search(&body, query)?;
        info!("AlphaVantagePriceOracle: '{}' resolved to {}", key, ticker);

        self.tickers.write().await.insert(cache_key, ticker.clone());
        Ok(ticker)
    }

    async fn lookup(
        &self,
        ticker: &str,
        date: NaiveDate,
        price_type: PriceType,
    ) -> Result<Decimal, OracleError> {
        let series = self.series_for(ticker, date).await?;
        series
            .get(&date)
            .map(|quote| quote.price(price_type))
            .ok_or_else(|| OracleError::NoData {
                ticker: ticker.to_string(),
                date,
            })
    }
}

#[derive(Debug, Deserialize)]
struct SeriesRow {
    timestamp: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    close: Decimal,
    volume: u64,
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    symbol: String,
}

fn timeout_error(timeout: Duration) -> OracleError {
    OracleError::Timeout {
        duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Alpha Vantage reports errors and throttling as a JSON object even when
/// csv was requested.
fn provider_message(body: &str, query: &str) -> Option<OracleError> {
    if !body.trim_start().starts_with('{') {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return Some(OracleError::Unavailable {
                reason: format!("malformed provider response: {}", e),
            });
        }
    };

    let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
    if let Some(message) = text("Error Message") {
        debug!("AlphaVantage error for '{}': {}", query, message);
        return Some(OracleError::TickerNotFound {
            query: query.to_string(),
        });
    }
    if text("Note").is_some() {
        return Some(OracleError::RateLimited {
            retry_after_secs: RATE_LIMIT_BACKOFF_SECS,
        });
    }
    if let Some(message) = text("Information") {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("call frequency") {
            return Some(OracleError::RateLimited {
                retry_after_secs: RATE_LIMIT_BACKOFF_SECS,
            });
        }
        return Some(OracleError::Unavailable { reason: message });
    }
    Some(OracleError::Unavailable {
        reason: "unexpected JSON response".to_string(),
    })
}

/// Best match is the first data row.
pub(crate) fn parse_symbol_search(body: &str, query: &str) -> Result<String, OracleError> {
    if let Some(err) = provider_message(body, query) {
        return Err(err);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    reader
        .deserialize::<SearchRow>()
        .next()
        .and_then(|row| row.ok())
        .map(|row| row.symbol)
        .filter(|symbol| !symbol.is_empty())
        .ok_or_else(|| OracleError::TickerNotFound {
            query: query.to_string(),
        })
}

pub(crate) fn parse_daily_series(body: &str, ticker: &str) -> Result<DailySeries, OracleError> {
    if let Some(err) = provider_message(body, ticker) {
        return Err(err);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let mut series = DailySeries::new();
    for row in reader.deserialize::<SeriesRow>() {
        let row = row.map_err(|e| OracleError::Unavailable {
            reason: format!("bad series row for {}: {}", ticker, e),
        })?;
        series.insert(
            row.timestamp,
            DailyQuote {
                date: row.timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            },
        );
    }
    Ok(series)
}
