//! Defaults applied to buys when the caller does not give them.

use super::parse_var;
use crate::application::quote_resolver::DEFAULT_FALLBACK_DAYS;
use crate::domain::trading::types::PriceType;
use anyhow::{Result, ensure};
use rust_decimal::Decimal;
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingEnvConfig {
    pub default_commission: Decimal,
    pub default_price_type: PriceType,
    /// Extra calendar days searched when a date has no quote
    pub quote_fallback_days: u32,
}

impl TradingEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_commission: Decimal = parse_var(&lookup, "DEFAULT_COMMISSION", Decimal::ZERO)?;
        ensure!(
            default_commission >= Decimal::ZERO,
            "DEFAULT_COMMISSION must not be negative"
        );

        Ok(Self {
            default_commission,
            default_price_type: parse_var(&lookup, "DEFAULT_PRICE_TYPE", PriceType::Open)?,
            quote_fallback_days: parse_var(&lookup, "QUOTE_FALLBACK_DAYS", DEFAULT_FALLBACK_DAYS)?,
        })
    }
}
