use crate::domain::errors::AccountError;
use crate::domain::trading::ledger::{TransactionBucket, TransactionLog};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holdings of one resolved ticker inside a portfolio.
///
/// Construction is pure; transactions are applied afterwards with
/// [`Position::apply_buy`] so a position never performs lookups itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    ticker: String,
    log: TransactionLog,
}

impl Position {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            log: TransactionLog::new(),
        }
    }

    /// Rebuild a position from persisted date buckets.
    pub fn from_buckets(
        ticker: impl Into<String>,
        buckets: impl IntoIterator<Item = TransactionBucket>,
    ) -> Result<Self, AccountError> {
        let mut position = Self::new(ticker);
        for bucket in buckets {
            position.log.restore(bucket)?;
        }
        Ok(position)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Fails without mutating when the holding or its cost would overflow.
    pub fn apply_buy(
        &mut self,
        date: NaiveDate,
        commission: Decimal,
        price: Decimal,
        shares: i64,
    ) -> Result<(), AccountError> {
        self.log.record(date, commission, price, shares)
    }

    /// Reduce holdings by `shares`. Fails without mutating when more
    /// shares are requested than held.
    pub fn apply_sell(&mut self, shares: i64) -> Result<(), AccountError> {
        if shares <= 0 {
            return Err(AccountError::invalid(format!(
                "shares to sell must be positive, got {}",
                shares
            )));
        }

        let held = self.total_shares();
        if shares > held {
            return Err(AccountError::InsufficientShares {
                ticker: self.ticker.clone(),
                requested: shares,
                held,
            });
        }

        self.log.consume_fifo(shares);
        Ok(())
    }

    pub fn total_shares(&self) -> i64 {
        self.log.total_shares()
    }

    pub fn total_cost(&self) -> Decimal {
        self.log.total_cost()
    }

    pub fn is_flat(&self) -> bool {
        self.total_shares() == 0
    }

    /// Ticker line followed by one ISO date per bucket.
    pub fn log_summary(&self) -> String {
        let mut out = format!("{}\n", self.ticker);
        for bucket in self.log.buckets() {
            out.push_str(&format!("{}\n", bucket.date));
        }
        out
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\tTicker Symbol: {}\n\tTotal Shares Owned: {}\n\tTotal Running Cost of Stock: {:.2}\n\n",
            self.ticker,
            self.total_shares(),
            self.total_cost()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn nov(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 11, day).unwrap()
    }

    #[test]
    fn test_new_position_is_empty() {
        let position = Position::new("AMZN");
        assert_eq!(position.ticker(), "AMZN");
        assert!(position.is_flat());
        assert_eq!(position.total_cost(), Decimal::ZERO);
    }

    #[test]
    fn test_display_matches_account_view_layout() {
        let mut position = Position::new("AMZN");
        position.apply_buy(nov(8), dec!(20), dec!(1755), 10).unwrap();

        assert_eq!(
            position.to_string(),
            "\tTicker Symbol: AMZN\n\tTotal Shares Owned: 10\n\tTotal Running Cost of Stock: 17570.00\n\n"
        );
    }

    #[test]
    fn test_oversell_is_rejected_without_mutation() {
        let mut position = Position::new("AMD");
        position.apply_buy(nov(8), dec!(20), dec!(22.0), 10).unwrap();
        let before = position.clone();

        let err = position.apply_sell(11).unwrap_err();
        assert_eq!(
            err,
            AccountError::InsufficientShares {
                ticker: "AMD".to_string(),
                requested: 11,
                held: 10
            }
        );
        assert_eq!(position, before);
    }

    #[test]
    fn test_sell_everything_goes_flat() {
        let mut position = Position::new("AMD");
        position.apply_buy(nov(8), dec!(20), dec!(22.0), 10).unwrap();
        position.apply_buy(nov(13), dec!(20), dec!(20.5), 5).unwrap();

        position.apply_sell(15).unwrap();
        assert!(position.is_flat());
        assert!(position.log().is_empty());
    }

    #[test]
    fn test_log_summary_lists_dates() {
        let mut position = Position::new("MSFT");
        position.apply_buy(nov(8), dec!(0), dec!(109.0), 1).unwrap();
        position.apply_buy(nov(13), dec!(0), dec!(106.0), 1).unwrap();

        assert_eq!(position.log_summary(), "MSFT\n2018-11-08\n2018-11-13\n");
    }
}
