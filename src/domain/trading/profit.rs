//! Per-lot profit over a date window.
//!
//! Every date bucket strictly inside the window contributes
//! `end_price * shares - cost`; a ticker bought on several dates contributes
//! one line per date, each valued at the same end price.

use crate::domain::trading::position::Position;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Buckets dated exactly on the window start or end are left out.
pub const PROFIT_WINDOW_EXCLUSIVE: bool = true;

pub fn in_window(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    if PROFIT_WINDOW_EXCLUSIVE {
        start < date && date < end
    } else {
        start <= date && date <= end
    }
}

/// True when any bucket of `position` falls inside the window.
pub fn has_lots_in_window(position: &Position, start: NaiveDate, end: NaiveDate) -> bool {
    position
        .log()
        .buckets()
        .iter()
        .any(|b| in_window(b.date, start, end))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitLine {
    pub ticker: String,
    pub date: NaiveDate,
    pub shares: i64,
    pub cost: Decimal,
    pub end_price: Decimal,
    pub delta: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitReport {
    pub portfolio: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub lines: Vec<ProfitLine>,
    pub total: Decimal,
}

impl ProfitReport {
    pub fn new(portfolio: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            portfolio: portfolio.into(),
            start,
            end,
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Add one line per in-window bucket of `position`, valued at `end_price`.
    pub fn add_position(&mut self, position: &Position, end_price: Decimal) {
        for bucket in position.log().buckets() {
            if !in_window(bucket.date, self.start, self.end) {
                continue;
            }
            let delta = end_price * Decimal::from(bucket.shares) - bucket.cost;
            self.total += delta;
            self.lines.push(ProfitLine {
                ticker: position.ticker().to_string(),
                date: bucket.date,
                shares: bucket.shares,
                cost: bucket.cost,
                end_price,
                delta,
            });
        }
    }
}

impl fmt::Display for ProfitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Portfolio: {}", self.portfolio)?;
        let mut current: Option<&str> = None;
        for line in &self.lines {
            if current != Some(line.ticker.as_str()) {
                write!(f, "\n\t{}\n", line.ticker)?;
                current = Some(line.ticker.as_str());
            }
            writeln!(
                f,
                "\t\t{}: {} shares, cost {:.2}, value {:.2}, Current Profit: {:.2}",
                line.date,
                line.shares,
                line.cost,
                line.end_price * Decimal::from(line.shares),
                line.delta
            )?;
        }
        write!(f, "Total Portfolio Earnings: {:.2}\n\n", self.total)
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
    fn test_window_bounds_are_exclusive() {
        assert!(!in_window(nov(2), nov(2), nov(27)));
        assert!(!in_window(nov(27), nov(2), nov(27)));
        assert!(in_window(nov(3), nov(2), nov(27)));
        assert!(in_window(nov(26), nov(2), nov(27)));
    }

    #[test]
    fn test_one_line_per_bucket_same_end_price() {
        let mut position = Position::new("AAPL");
        position.apply_buy(nov(8), dec!(20), dec!(209.98), 10).unwrap();
        position.apply_buy(nov(13), dec!(20), dec!(191.63), 20).unwrap();
        position.apply_buy(nov(27), dec!(20), dec!(171.51), 5).unwrap();

        let mut report = ProfitReport::new("Technology", nov(2), nov(27));
        report.add_position(&position, dec!(171.51));

        assert_eq!(report.lines.len(), 2);
        assert!(report.lines.iter().all(|l| l.end_price == dec!(171.51)));
        let expected = (dec!(171.51) * dec!(10) - (dec!(2099.8) + dec!(20)))
            + (dec!(171.51) * dec!(20) - (dec!(3832.6) + dec!(20)));
        assert_eq!(report.total, expected);
        assert!(has_lots_in_window(&position, nov(2), nov(27)));
        assert!(!has_lots_in_window(&position, nov(13), nov(14)));
    }

    #[test]
    fn test_display_groups_by_ticker() {
        let mut position = Position::new("AMD");
        position.apply_buy(nov(8), dec!(20), dec!(22), 10).unwrap();

        let mut report = ProfitReport::new("Technology", nov(2), nov(27));
        report.add_position(&position, dec!(20));

        assert_eq!(
            report.to_string(),
            "Portfolio: Technology\n\n\tAMD\n\t\t2018-11-08: 10 shares, cost 240.00, value 200.00, Current Profit: -40.00\nTotal Portfolio Earnings: -40.00\n\n"
        );
    }
}
