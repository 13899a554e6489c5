//! Configuration module for Rustfolio.
//!
//! Structured configuration loading from environment variables (and a
//! `.env` file when present), organized by concern: Oracle, Storage and
//! Trading.

mod oracle_config;
mod storage_config;
mod trading_config;

pub use oracle_config::{Mode, OracleEnvConfig};
pub use storage_config::StorageEnvConfig;
pub use trading_config::TradingEnvConfig;

use anyhow::{Context, Result};
use std::fmt::Display;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub oracle: OracleEnvConfig,
    pub storage: StorageEnvConfig,
    pub trading: TradingEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; real env vars still apply
        let _ = dotenvy::dotenv();

        Ok(Self {
            oracle: OracleEnvConfig::from_env().context("Failed to load oracle config")?,
            storage: StorageEnvConfig::from_env().context("Failed to load storage config")?,
            trading: TradingEnvConfig::from_env().context("Failed to load trading config")?,
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            oracle: OracleEnvConfig::from_lookup(&lookup).context("Failed to load oracle config")?,
            storage: StorageEnvConfig::from_lookup(&lookup)
                .context("Failed to load storage config")?,
            trading: TradingEnvConfig::from_lookup(&lookup)
                .context("Failed to load trading config")?,
        })
    }
}

/// Parse `key` with `FromStr`, falling back to `default` when unset or blank.
pub(crate) fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}={}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_from_lookup() {
        let config = Config::from_lookup(|k| match k {
            "MODE" => Some("offline".to_string()),
            "DATA_DIR" => Some("/tmp/rustfolio".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.oracle.mode, Mode::Offline);
        assert_eq!(config.storage.data_dir.to_str(), Some("/tmp/rustfolio"));
        assert_eq!(config.trading.quote_fallback_days, 10);
    }

    #[test]
    fn test_error_names_the_variable() {
        let err = Config::from_lookup(|k| (k == "QUOTE_FALLBACK_DAYS").then(|| "ten".to_string()))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("QUOTE_FALLBACK_DAYS"));
    }

    #[test]
    fn test_blank_value_uses_default() {
        let value: u32 = parse_var(&|_: &str| Some("  ".to_string()), "ANY", 7).unwrap();
        assert_eq!(value, 7);
    }
}
