//! Plain-file account snapshots.
//!
//! Layout under the data root:
//!
//! ```text
//! portfolios/<portfolio>/<TICKER>.csv   one row per transaction date bucket
//! strategies/<portfolio>.csv            one periodic-investment definition
//! ```
//!
//! Every save rewrites the whole `portfolios/` tree and prunes files the
//! account no longer has, so the directory always mirrors the last account
//! saved.

use crate::domain::repositories::AccountRepository;
use crate::domain::trading::account::Account;
use crate::domain::trading::allocation::AllocationWeights;
use crate::domain::trading::ledger::TransactionBucket;
use crate::domain::trading::portfolio::Portfolio;
use crate::domain::trading::position::Position;
use crate::domain::trading::strategy::Strategy;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PORTFOLIOS_DIR: &str = "portfolios";
const STRATEGIES_DIR: &str = "strategies";
const POSITION_HEADER: [&str; 5] = ["transaction date", " cost", " shares", " commission", " price"];

#[derive(Debug, Serialize, Deserialize)]
struct BucketRecord {
    #[serde(rename = "transaction date")]
    date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    cost: Decimal,
    shares: i64,
    #[serde(with = "rust_decimal::serde::str")]
    commission: Decimal,
    /// Informational only
    #[serde(default, with = "rust_decimal::serde::str_option")]
    price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StrategyRecord {
    #[serde(with = "rust_decimal::serde::str")]
    commission: Decimal,
    #[serde(rename = "investment amount", with = "rust_decimal::serde::str")]
    investment_amount: Decimal,
    portfolio: String,
    #[serde(rename = "start date")]
    start_date: NaiveDate,
    #[serde(rename = "end date")]
    end_date: NaiveDate,
    interval: i64,
    weights: String,
}

impl From<&Strategy> for StrategyRecord {
    fn from(strategy: &Strategy) -> Self {
        Self {
            commission: strategy.commission,
            investment_amount: strategy.investment_amount,
            portfolio: strategy.portfolio.clone(),
            start_date: strategy.start_date,
            end_date: strategy.end_date,
            interval: strategy.interval_days,
            weights: strategy.weights.to_string(),
        }
    }
}

impl TryFrom<StrategyRecord> for Strategy {
    type Error = anyhow::Error;

    fn try_from(record: StrategyRecord) -> Result<Self> {
        let weights: AllocationWeights = record
            .weights
            .parse()
            .with_context(|| format!("Invalid weights '{}'", record.weights))?;
        Ok(Strategy {
            commission: record.commission,
            investment_amount: record.investment_amount,
            portfolio: record.portfolio,
            start_date: record.start_date,
            end_date: record.end_date,
            interval_days: record.interval,
            weights,
        })
    }
}

/// [`AccountRepository`] over csv files in a data directory
#[derive(Debug, Clone)]
pub struct CsvSnapshotRepository {
    root: PathBuf,
}

impl CsvSnapshotRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn portfolios_dir(&self) -> PathBuf {
        self.root.join(PORTFOLIOS_DIR)
    }

    fn strategy_path(&self, portfolio: &str) -> Result<PathBuf> {
        check_path_component(portfolio)?;
        Ok(self
            .root
            .join(STRATEGIES_DIR)
            .join(format!("{}.csv", portfolio)))
    }

    fn read_account(&self) -> Result<Account> {
        let dir = self.portfolios_dir();
        let mut account = Account::new();
        if !dir.exists() {
            debug!("CsvSnapshotRepository: no snapshot at {:?}", dir);
            return Ok(account);
        }

        for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {:?}", dir))? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("CsvSnapshotRepository: skipping non-UTF-8 directory {:?}", path);
                continue;
            };
            let portfolio = read_portfolio(&path)?;
            account.insert_portfolio(name, portfolio)?;
        }

        info!(
            "CsvSnapshotRepository: loaded {} portfolio(s) from {:?}",
            account.len(),
            dir
        );
        Ok(account)
    }

    fn write_account(&self, account: &Account) -> Result<()> {
        // Nothing is written unless every file name is usable
        for (name, portfolio) in account.portfolios() {
            check_path_component(name)?;
            for position in portfolio.positions() {
                check_path_component(position.ticker())?;
            }
        }

        let dir = self.portfolios_dir();
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

        let mut kept_dirs = HashSet::new();
        for (name, portfolio) in account.portfolios() {
            let portfolio_dir = dir.join(name);
            fs::create_dir_all(&portfolio_dir)
                .with_context(|| format!("Failed to create {:?}", portfolio_dir))?;

            let mut kept_files = HashSet::new();
            for position in portfolio.positions() {
                let file_name = format!("{}.csv", position.ticker());
                write_position(&portfolio_dir.join(&file_name), position)?;
                kept_files.insert(file_name);
            }
            prune(&portfolio_dir, &kept_files, false)?;
            kept_dirs.insert(name.to_string());
        }
        prune(&dir, &kept_dirs, true)?;

        info!(
            "CsvSnapshotRepository: saved {} portfolio(s) to {:?}",
            account.len(),
            dir
        );
        Ok(())
    }

    fn write_strategy(&self, strategy: &Strategy) -> Result<()> {
        let path = self.strategy_path(&strategy.portfolio)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(StrategyRecord::from(strategy))?;
        let bytes = writer.into_inner().context("Failed to flush strategy csv")?;
        write_atomic(&path, &bytes)?;

        info!(
            "CsvSnapshotRepository: saved strategy for '{}' to {:?}",
            strategy.portfolio, path
        );
        Ok(())
    }

    fn read_strategy(&self, portfolio: &str) -> Result<Option<Strategy>> {
        let path = self.strategy_path(portfolio)?;
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .with_context(|| format!("Failed to open {:?}", path))?;
        let record: StrategyRecord = match reader.deserialize().next() {
            Some(record) => record.with_context(|| format!("Failed to parse {:?}", path))?,
            None => bail!("Strategy file {:?} has no data row", path),
        };
        Ok(Some(Strategy::try_from(record)?))
    }
}

#[async_trait]
impl AccountRepository for CsvSnapshotRepository {
    async fn load_account(&self) -> Result<Account> {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.read_account())
            .await
            .context("Snapshot load task failed")?
    }

    async fn save_account(&self, account: &Account) -> Result<()> {
        let repo = self.clone();
        let account = account.clone();
        tokio::task::spawn_blocking(move || repo.write_account(&account))
            .await
            .context("Snapshot save task failed")?
    }

    async fn save_strategy(&self, strategy: &Strategy) -> Result<()> {
        let repo = self.clone();
        let strategy = strategy.clone();
        tokio::task::spawn_blocking(move || repo.write_strategy(&strategy))
            .await
            .context("Strategy save task failed")?
    }

    async fn load_strategy(&self, portfolio: &str) -> Result<Option<Strategy>> {
        let repo = self.clone();
        let portfolio = portfolio.to_string();
        tokio::task::spawn_blocking(move || repo.read_strategy(&portfolio))
            .await
            .context("Strategy load task failed")?
    }
}

/// Positions come back ordered by their earliest bucket date, then ticker.
fn read_portfolio(dir: &Path) -> Result<Portfolio> {
    let mut positions = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(ticker) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        positions.push(read_position(&path, ticker)?);
    }

    positions.sort_by(|a: &Position, b: &Position| {
        let first = |p: &Position| p.log().buckets().iter().map(|b| b.date).min();
        first(a)
            .cmp(&first(b))
            .then_with(|| a.ticker().cmp(b.ticker()))
    });

    let mut portfolio = Portfolio::new();
    for position in positions {
        portfolio.insert(position);
    }
    Ok(portfolio)
}

fn read_position(path: &Path, ticker: &str) -> Result<Position> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let mut buckets = Vec::new();
    for row in reader.deserialize() {
        let record: BucketRecord = row.with_context(|| format!("Failed to parse {:?}", path))?;
        buckets.push(TransactionBucket {
            date: record.date,
            cost: record.cost,
            shares: record.shares,
            commission: record.commission,
            price: record.price.unwrap_or_default(),
        });
    }
    Position::from_buckets(ticker, buckets)
        .with_context(|| format!("Inconsistent totals in {:?}", path))
}

fn write_position(path: &Path, position: &Position) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(POSITION_HEADER)?;
    for bucket in position.log().buckets() {
        writer.serialize(BucketRecord {
            date: bucket.date,
            cost: bucket.cost,
            shares: bucket.shares,
            commission: bucket.commission,
            price: Some(bucket.price),
        })?;
    }
    let bytes = writer.into_inner().context("Failed to flush position csv")?;
    write_atomic(path, &bytes)
}

/// Write to a temp file then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("csv.tmp");
    fs::write(&temp_path, bytes).with_context(|| format!("Failed to write {:?}", temp_path))?;
    fs::rename(&temp_path, path).with_context(|| format!("Failed to rename onto {:?}", path))?;
    Ok(())
}

/// Remove entries of `dir` not named in `keep`: directories when `dirs` is
/// set, csv files otherwise.
fn prune(dir: &Path, keep: &HashSet<String>, dirs: bool) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if keep.contains(name) {
            continue;
        }
        if dirs && path.is_dir() {
            fs::remove_dir_all(&path).with_context(|| format!("Failed to remove {:?}", path))?;
            debug!("CsvSnapshotRepository: pruned portfolio dir {:?}", path);
        } else if !dirs && path.extension().and_then(|e| e.to_str()) == Some("csv") {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
            debug!("CsvSnapshotRepository: pruned position file {:?}", path);
        }
    }
    Ok(())
}

fn check_path_component(name: &str) -> Result<()> {
    if name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        bail!("'{}' cannot be used as a file name", name);
    }
    Ok(())
}
