//! Repository Pattern Abstractions
//!
//! Persistence of account snapshots and periodic-investment strategies is
//! kept behind [`AccountRepository`], so the portfolio service never knows
//! the storage format.
//!
//! # Example
//!
//! ```rust,no_run
//! use rustfolio::domain::repositories::AccountRepository;
//! use rustfolio::infrastructure::persistence::CsvSnapshotRepository;
//!
//! # async {
//! let repo = CsvSnapshotRepository::new("data");
//! let account = repo.load_account().await?;
//! # anyhow::Ok(())
//! # };
//! ```

use crate::domain::trading::account::Account;
use crate::domain::trading::strategy::Strategy;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Load every persisted portfolio (an empty account when nothing is stored)
    async fn load_account(&self) -> Result<Account>;

    /// Replace the stored snapshot with the given account
    async fn save_account(&self, account: &Account) -> Result<()>;

    /// Store a strategy definition, replacing any earlier one for its portfolio
    async fn save_strategy(&self, strategy: &Strategy) -> Result<()>;

    /// Strategy previously stored for `portfolio`, if any
    async fn load_strategy(&self, portfolio: &str) -> Result<Option<Strategy>>;
}
