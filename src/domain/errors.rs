use chrono::NaiveDate;
use thiserror::Error;

/// Errors surfaced by a price oracle (ticker search and daily quotes)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("No ticker found for '{query}'")]
    TickerNotFound { query: String },

    #[error("No quote for {ticker} on {date}")]
    NoData { ticker: String, date: NaiveDate },

    #[error("Price provider unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Price lookup timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Rate limit exceeded: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// Errors related to account, portfolio and position management
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Portfolio already exists: {name}")]
    DuplicateName { name: String },

    #[error("Portfolio does not exist: {name}")]
    PortfolioNotFound { name: String },

    #[error("Position not found: {ticker}")]
    PositionNotFound { ticker: String },

    #[error("Cannot sell {requested} shares of {ticker}: only {held} held")]
    InsufficientShares {
        ticker: String,
        requested: i64,
        held: i64,
    },

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Persistence failed: {reason}")]
    Persistence { reason: String },
}

impl AccountError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        AccountError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// True for the "not found" family (portfolio, position, ticker).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AccountError::PortfolioNotFound { .. }
                | AccountError::PositionNotFound { .. }
                | AccountError::Oracle(OracleError::TickerNotFound { .. })
        )
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        AccountError::Persistence {
            reason: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_shares_formatting() {
        let error = AccountError::InsufficientShares {
            ticker: "AAPL".to_string(),
            requested: 30,
            held: 20,
        };

        let msg = error.to_string();
        assert!(msg.contains("AAPL"));
        assert!(msg.contains("30"));
        assert!(msg.contains("20"));
    }

    #[test]
    fn test_oracle_error_is_transparent() {
        let date = NaiveDate::from_ymd_opt(2018, 11, 10).unwrap();
        let error: AccountError = OracleError::NoData {
            ticker: "MSFT".to_string(),
            date,
        }
        .into();

        assert_eq!(error.to_string(), "No quote for MSFT on 2018-11-10");
    }

    #[test]
    fn test_not_found_family() {
        assert!(
            AccountError::PortfolioNotFound {
                name: "Retirement".into()
            }
            .is_not_found()
        );
        assert!(AccountError::from(OracleError::TickerNotFound { query: "zzz".into() }).is_not_found());
        assert!(!AccountError::invalid("empty name").is_not_found());
    }

    #[test]
    fn test_anyhow_maps_to_persistence() {
        let err: AccountError = anyhow::anyhow!("disk full").context("Failed to write AMZN.csv").into();
        match err {
            AccountError::Persistence { reason } => {
                assert!(reason.contains("AMZN.csv"));
                assert!(reason.contains("disk full"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
