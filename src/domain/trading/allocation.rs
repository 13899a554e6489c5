//! Weighted split of one investment across a portfolio's positions.
//!
//! Weights are non-negative integers and need not sum to 100; each
//! position receives `total * weight / sum(weights)`.

use crate::domain::errors::AccountError;
use crate::domain::trading::portfolio::Portfolio;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationWeights {
    /// ticker -> weight, in the order given
    ByTicker(Vec<(String, u32)>),
    /// One weight per position, paired in position order
    Positional(Vec<u32>),
}

/// Dollar amount routed to one position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSlice {
    pub ticker: String,
    pub weight: u32,
    pub amount: Decimal,
}

impl AllocationWeights {
    pub fn by_ticker<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        AllocationWeights::ByTicker(items.into_iter().map(|(t, w)| (t.into(), w)).collect())
    }

    pub fn positional(weights: impl Into<Vec<u32>>) -> Self {
        AllocationWeights::Positional(weights.into())
    }

    pub fn len(&self) -> usize {
        match self {
            AllocationWeights::ByTicker(items) => items.len(),
            AllocationWeights::Positional(weights) => weights.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pair every weight with a held ticker.
    pub fn resolve(&self, portfolio: &Portfolio) -> Result<Vec<(String, u32)>, AccountError> {
        match self {
            AllocationWeights::Positional(weights) => {
                if weights.len() != portfolio.len() {
                    return Err(AccountError::invalid(format!(
                        "{} weights supplied for {} positions",
                        weights.len(),
                        portfolio.len()
                    )));
                }
                Ok(portfolio
                    .positions()
                    .iter()
                    .zip(weights.iter())
                    .map(|(p, w)| (p.ticker().to_string(), *w))
                    .collect())
            }
            AllocationWeights::ByTicker(items) => {
                let mut pairs: Vec<(String, u32)> = Vec::with_capacity(items.len());
                for (ticker, weight) in items {
                    let position = portfolio
                        .positions()
                        .iter()
                        .find(|p| p.ticker().eq_ignore_ascii_case(ticker.trim()))
                        .ok_or_else(|| AccountError::PositionNotFound {
                            ticker: ticker.clone(),
                        })?;
                    if pairs.iter().any(|(t, _)| t == position.ticker()) {
                        return Err(AccountError::invalid(format!(
                            "weight for {} given more than once",
                            position.ticker()
                        )));
                    }
                    pairs.push((position.ticker().to_string(), *weight));
                }
                Ok(pairs)
            }
        }
    }
}

impl fmt::Display for AllocationWeights {
    /// Pipe-separated, as stored in strategy files.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = match self {
            AllocationWeights::Positional(weights) => {
                weights.iter().map(|w| w.to_string()).collect()
            }
            AllocationWeights::ByTicker(items) => {
                items.iter().map(|(t, w)| format!("{}:{}", t, w)).collect()
            }
        };
        write!(f, "{}", parts.join("|"))
    }
}

impl FromStr for AllocationWeights {
    type Err = anyhow::Error;

    /// Accepts `20|10|50`, `20,10,50`, `AMZN:20|AMD:10` or `AMZN=20,AMD=10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(['|', ','])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            anyhow::bail!("No weights given");
        }

        if parts.iter().any(|p| p.contains([':', '='])) {
            let mut items = Vec::with_capacity(parts.len());
            for part in parts {
                let (ticker, weight) = part
                    .split_once([':', '='])
                    .ok_or_else(|| anyhow::anyhow!("Invalid weight entry: {}", part))?;
                let weight: u32 = weight
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid weight for {}: {}", ticker, weight))?;
                items.push((ticker.trim().to_string(), weight));
            }
            Ok(AllocationWeights::ByTicker(items))
        } else {
            let weights = parts
                .iter()
                .map(|p| {
                    p.parse::<u32>()
                        .map_err(|_| anyhow::anyhow!("Invalid weight: {}", p))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AllocationWeights::Positional(weights))
        }
    }
}

/// Split `total` across `pairs` proportionally to their weights.
///
/// Zero-weight entries receive nothing and are left out of the result.
pub fn split_investment(
    total: Decimal,
    pairs: &[(String, u32)],
) -> Result<Vec<AllocationSlice>, AccountError> {
    let weight_sum: u64 = pairs.iter().map(|(_, w)| u64::from(*w)).sum();
    if weight_sum == 0 {
        return Err(AccountError::invalid("weights must not sum to zero"));
    }
    let weight_sum = Decimal::from(weight_sum);

    Ok(pairs
        .iter()
        .filter(|(_, w)| *w > 0)
        .map(|(ticker, weight)| AllocationSlice {
            ticker: ticker.clone(),
            weight: *weight,
            amount: total * Decimal::from(*weight) / weight_sum,
        })
        .collect())
}
