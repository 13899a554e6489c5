use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which daily quote field a transaction is priced at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    #[default]
    Open,
    High,
    Low,
    Close,
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceType::Open => write!(f, "open"),
            PriceType::High => write!(f, "high"),
            PriceType::Low => write!(f, "low"),
            PriceType::Close => write!(f, "close"),
        }
    }
}

impl FromStr for PriceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceType::Open),
            "high" => Ok(PriceType::High),
            "low" => Ok(PriceType::Low),
            "close" => Ok(PriceType::Close),
            _ => anyhow::bail!(
                "Invalid price type: {}. Must be 'open', 'high', 'low' or 'close'",
                s
            ),
        }
    }
}

/// One row of a provider's daily time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl DailyQuote {
    pub fn price(&self, price_type: PriceType) -> Decimal {
        match price_type {
            PriceType::Open => self.open,
            PriceType::High => self.high,
            PriceType::Low => self.low,
            PriceType::Close => self.close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_type_parse_is_case_insensitive() {
        assert_eq!(PriceType::from_str("OPEN").unwrap(), PriceType::Open);
        assert_eq!(PriceType::from_str(" close ").unwrap(), PriceType::Close);
        assert!(PriceType::from_str("mid").is_err());
    }

    #[test]
    fn test_quote_selects_field() {
        let quote = DailyQuote {
            date: NaiveDate::from_ymd_opt(2018, 11, 8).unwrap(),
            open: dec!(1755.0),
            high: dec!(1784.0),
            low: dec!(1725.11),
            close: dec!(1754.91),
            volume: 6_534_900,
        };

        assert_eq!(quote.price(PriceType::Open), dec!(1755.0));
        assert_eq!(quote.price(PriceType::Low), dec!(1725.11));
        assert_eq!(PriceType::default(), PriceType::Open);
    }
}
