//! Storage locations under the data directory.

use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEnvConfig {
    /// Root holding `portfolios/`, `strategies/` and `stocks/`
    pub data_dir: PathBuf,
}

impl StorageEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| ".".to_string());
        Ok(Self {
            data_dir: PathBuf::from(data_dir),
        })
    }

    /// Cached daily series, one `<TICKER>.csv` per ticker
    pub fn stocks_dir(&self) -> PathBuf {
        self.data_dir.join("stocks")
    }
}
