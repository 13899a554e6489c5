//! Price oracle configuration parsing from environment variables.

use super::parse_var;
use crate::infrastructure::alphavantage::DEFAULT_BASE_URL;
use anyhow::Result;
use std::env;
use std::str::FromStr;

/// Where prices come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Live Alpha Vantage requests, cached on disk
    #[default]
    AlphaVantage,
    /// Cached series only, no network
    Offline,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alphavantage" => Ok(Mode::AlphaVantage),
            "offline" => Ok(Mode::Offline),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'alphavantage' or 'offline'", s),
        }
    }
}

/// Price oracle environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleEnvConfig {
    pub mode: Mode,
    pub api_key: String,
    pub base_url: String,
    pub max_requests_per_minute: u32,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl OracleEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            mode: parse_var(&lookup, "MODE", Mode::AlphaVantage)?,
            api_key: lookup("ALPHAVANTAGE_API_KEY").unwrap_or_default(),
            base_url: lookup("ALPHAVANTAGE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_requests_per_minute: parse_var(&lookup, "ORACLE_MAX_REQUESTS_PER_MINUTE", 5)?,
            request_timeout_secs: parse_var(&lookup, "ORACLE_REQUEST_TIMEOUT_SECS", 30)?,
            max_retries: parse_var(&lookup, "ORACLE_MAX_RETRIES", 3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = OracleEnvConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.mode, Mode::AlphaVantage);
        assert_eq!(config.base_url, "https://www.alphavantage.co");
        assert_eq!(config.max_requests_per_minute, 5);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("MODE", "Offline"),
            ("ALPHAVANTAGE_API_KEY", "demo"),
            ("ORACLE_MAX_REQUESTS_PER_MINUTE", "75"),
        ]
        .into_iter()
        .collect();
        let config = OracleEnvConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.mode, Mode::Offline);
        assert_eq!(config.api_key, "demo");
        assert_eq!(config.max_requests_per_minute, 75);

        assert!(OracleEnvConfig::from_lookup(|k| (k == "MODE").then(|| "yahoo".to_string())).is_err());
        assert!(
            OracleEnvConfig::from_lookup(|k| (k == "ORACLE_MAX_RETRIES").then(|| "-1".to_string()))
                .is_err()
        );
    }
}
