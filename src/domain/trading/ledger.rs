//! Per-ticker transaction ledger.
//!
//! A [`TransactionLog`] holds one [`TransactionBucket`] per calendar date, in
//! insertion order. Repeated buys on the same date accumulate into the same
//! bucket; aggregate shares and cost are always derived from the buckets.

use crate::domain::errors::AccountError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cumulative totals for every transaction recorded on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBucket {
    pub date: NaiveDate,
    /// price * shares + commission, summed over the day's transactions
    pub cost: Decimal,
    pub shares: i64,
    pub commission: Decimal,
    /// Price of the last transaction recorded that day
    pub price: Decimal,
}

impl TransactionBucket {
    fn absorb(&mut self, other: &TransactionBucket) -> Option<()> {
        self.cost = self.cost.checked_add(other.cost)?;
        self.shares = self.shares.checked_add(other.shares)?;
        self.commission = self.commission.checked_add(other.commission)?;
        self.price = other.price;
        Some(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    buckets: Vec<TransactionBucket>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a buy of `shares` at `price` on `date`.
    pub fn record(
        &mut self,
        date: NaiveDate,
        commission: Decimal,
        price: Decimal,
        shares: i64,
    ) -> Result<(), AccountError> {
        let cost = price
            .checked_mul(Decimal::from(shares))
            .and_then(|cost| cost.checked_add(commission))
            .ok_or_else(|| {
                AccountError::invalid(format!("cost of {} shares at {} overflows", shares, price))
            })?;
        self.merge(TransactionBucket {
            date,
            cost,
            shares,
            commission,
            price,
        })
    }

    /// Re-insert a bucket read back from a snapshot. Cost is taken as stored.
    pub fn restore(&mut self, bucket: TransactionBucket) -> Result<(), AccountError> {
        self.merge(bucket)
    }

    /// Leaves the log untouched when the new totals would not fit.
    fn merge(&mut self, bucket: TransactionBucket) -> Result<(), AccountError> {
        let overflow = || {
            AccountError::invalid(format!(
                "adding {} shares on {} overflows the holding",
                bucket.shares, bucket.date
            ))
        };
        self.total_shares()
            .checked_add(bucket.shares)
            .ok_or_else(overflow)?;

        match self.buckets.iter().position(|b| b.date == bucket.date) {
            Some(index) => {
                let mut merged = self.buckets[index].clone();
                merged.absorb(&bucket).ok_or_else(overflow)?;
                self.buckets[index] = merged;
            }
            None => self.buckets.push(bucket),
        }
        Ok(())
    }

    pub fn buckets(&self) -> &[TransactionBucket] {
        &self.buckets
    }

    pub fn bucket(&self, date: NaiveDate) -> Option<&TransactionBucket> {
        self.buckets.iter().find(|b| b.date == date)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// `merge` refuses any bucket that would push this past `i64::MAX`.
    pub fn total_shares(&self) -> i64 {
        self.buckets.iter().map(|b| b.shares).sum()
    }

    pub fn total_cost(&self) -> Decimal {
        self.buckets.iter().map(|b| b.cost).sum()
    }

    pub fn total_commission(&self) -> Decimal {
        self.buckets.iter().map(|b| b.commission).sum()
    }

    /// Remove `shares` oldest-first. Each touched bucket keeps cost and
    /// commission in proportion to the shares it still holds; emptied
    /// buckets are dropped.
    ///
    /// Caller guarantees `0 < shares <= total_shares()`.
    pub(crate) fn consume_fifo(&mut self, shares: i64) {
        let mut remaining = shares;

        for bucket in self.buckets.iter_mut() {
            if remaining == 0 {
                break;
            }
            if bucket.shares <= 0 {
                continue;
            }

            let taken = remaining.min(bucket.shares);
            if taken == bucket.shares {
                bucket.shares = 0;
                bucket.cost = Decimal::ZERO;
                bucket.commission = Decimal::ZERO;
            } else {
                let kept = Decimal::from(bucket.shares - taken) / Decimal::from(bucket.shares);
                bucket.cost *= kept;
                bucket.commission *= kept;
                bucket.shares -= taken;
            }
            remaining -= taken;
        }

        self.buckets.retain(|b| b.shares > 0 || b.cost != Decimal::ZERO);
    }
}
