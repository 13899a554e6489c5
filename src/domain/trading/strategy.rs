use crate::domain::errors::AccountError;
use crate::domain::trading::account::validate_name;
use crate::domain::trading::allocation::AllocationWeights;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

/// When true the first periodic buy lands on the start date; otherwise one
/// interval after it. Either way `number_of_investments` buys are made.
pub const FIRST_BUY_AT_START: bool = true;

/// A recurring weighted investment ("dollar-cost averaging") definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub commission: Decimal,
    pub investment_amount: Decimal,
    pub portfolio: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub interval_days: i64,
    pub weights: AllocationWeights,
}

impl Strategy {
    pub fn validate(&self) -> Result<(), AccountError> {
        validate_name(&self.portfolio)?;
        if self.interval_days <= 0 {
            return Err(AccountError::invalid(format!(
                "interval must be a positive number of days, got {}",
                self.interval_days
            )));
        }
        if self.commission < Decimal::ZERO {
            return Err(AccountError::invalid("commission must not be negative"));
        }
        if self.investment_amount <= Decimal::ZERO {
            return Err(AccountError::invalid("investment amount must be positive"));
        }
        if self.weights.is_empty() {
            return Err(AccountError::invalid("at least one weight is required"));
        }
        Ok(())
    }

    /// floor(days(start, end) / interval); zero when end precedes start.
    pub fn number_of_investments(&self) -> u32 {
        if self.interval_days <= 0 {
            return 0;
        }
        let days = (self.end_date - self.start_date).num_days();
        if days <= 0 {
            return 0;
        }
        u32::try_from(days / self.interval_days).unwrap_or(u32::MAX)
    }

    pub fn buy_dates(&self) -> Vec<NaiveDate> {
        let step = Duration::days(self.interval_days.max(0));
        let mut date = if FIRST_BUY_AT_START {
            self.start_date
        } else {
            self.start_date + step
        };

        let mut dates = Vec::with_capacity(self.number_of_investments() as usize);
        for _ in 0..self.number_of_investments() {
            dates.push(date);
            date += step;
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn strategy(start: NaiveDate, end: NaiveDate, interval_days: i64) -> Strategy {
        Strategy {
            commission: dec!(20),
            investment_amount: dec!(2000),
            portfolio: "Technology".to_string(),
            start_date: start,
            end_date: end,
            interval_days,
            weights: AllocationWeights::positional(vec![10, 20, 50]),
        }
    }

    #[test]
    fn test_number_of_investments_floors() {
        let s = strategy(d(2018, 8, 5), d(2018, 11, 27), 20);
        // 114 days / 20
        assert_eq!(s.number_of_investments(), 5);
    }

    #[test]
    fn test_buy_dates_start_on_start_date() {
        let s = strategy(d(2018, 8, 5), d(2018, 11, 27), 20);
        assert_eq!(
            s.buy_dates(),
            vec![
                d(2018, 8, 5),
                d(2018, 8, 25),
                d(2018, 9, 14),
                d(2018, 10, 4),
                d(2018, 10, 24)
            ]
        );
    }

    #[test]
    fn test_end_before_start_schedules_nothing() {
        let s = strategy(d(2018, 11, 27), d(2018, 8, 5), 20);
        assert_eq!(s.number_of_investments(), 0);
        assert!(s.buy_dates().is_empty());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_non_positive_interval_is_invalid() {
        for interval in [0, -5] {
            let s = strategy(d(2018, 8, 5), d(2018, 11, 27), interval);
            assert!(matches!(
                s.validate(),
                Err(AccountError::InvalidArgument { .. })
            ));
            assert_eq!(s.number_of_investments(), 0);
        }
    }
}
