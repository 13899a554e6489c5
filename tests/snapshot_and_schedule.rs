use chrono::{Duration, NaiveDate};
use rust_decimal_macros::dec;
use rustfolio::application::portfolio_service::{PortfolioService, SharedPortfolioService};
use rustfolio::application::quote_resolver::QuoteResolver;
use rustfolio::domain::errors::{AccountError, OracleError};
use rustfolio::domain::repositories::AccountRepository;
use rustfolio::domain::trading::allocation::AllocationWeights;
use rustfolio::domain::trading::strategy::Strategy;
use rustfolio::domain::trading::types::PriceType;
use rustfolio::infrastructure::mock::MockPriceOracle;
use rustfolio::infrastructure::persistence::CsvSnapshotRepository;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_test::assert_ok;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, m, day).unwrap()
}

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("rustfolio-it-{}", uuid::Uuid::new_v4())))
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Weekday quotes only, so weekend buy dates roll to Monday
fn weekday_oracle() -> MockPriceOracle {
    use chrono::Datelike;
    let mut oracle = MockPriceOracle::new();
    let mut date = d(8, 1);
    while date <= d(12, 31) {
        if date.weekday().number_from_monday() <= 5 {
            oracle = oracle
                .with_price("MSFT", date, dec!(100))
                .with_price("AAPL", date, dec!(200));
        }
        date += Duration::days(1);
    }
    oracle
}

fn strategy() -> Strategy {
    Strategy {
        commission: dec!(20),
        investment_amount: dec!(2000),
        portfolio: "Technology".to_string(),
        start_date: d(8, 5),
        end_date: d(11, 27),
        interval_days: 20,
        weights: AllocationWeights::by_ticker([("MSFT", 50), ("AAPL", 50)]),
    }
}

async fn seeded(repo: Arc<CsvSnapshotRepository>) -> PortfolioService {
    let mut service = PortfolioService::new(Arc::new(weekday_oracle())).with_repository(repo);
    assert_ok!(service.add_portfolio("Technology"));
    // a snapshot restores positions by first buy date, then ticker
    for ticker in ["AAPL", "MSFT"] {
        assert_ok!(
            service
                .buy_by_shares(dec!(0), ticker, d(8, 1), PriceType::Open, 1, "Technology")
                .await
        );
    }
    service
}

#[tokio::test]
async fn test_dca_buys_persist_and_reload() {
    let dir = TempDir::new();
    let repo = Arc::new(CsvSnapshotRepository::new(&dir.0));
    let mut service = seeded(repo.clone()).await;

    let confirmations = service.periodic_investment(&strategy()).await.unwrap();
    // 2018-08-05 is a Sunday: the first buy lands on Monday the 6th
    let msft_dates: Vec<_> = confirmations
        .iter()
        .filter(|c| c.ticker == "MSFT")
        .map(|c| c.date)
        .collect();
    assert_eq!(
        msft_dates,
        vec![d(8, 6), d(8, 27), d(9, 14), d(10, 4), d(10, 24)]
    );

    assert_ok!(service.save().await);
    let reloaded = repo.load_account().await.unwrap();
    assert_eq!(&reloaded, service.account());

    let msft = reloaded.portfolio("Technology").unwrap().position("MSFT").unwrap();
    assert_eq!(msft.total_shares(), 1 + 5 * 10);
    assert_eq!(msft.total_cost(), dec!(100) + dec!(5) * dec!(1020));

    assert_eq!(repo.load_strategy("Technology").await.unwrap(), Some(strategy()));
}

#[tokio::test]
async fn test_snapshot_save_is_idempotent() {
    let dir = TempDir::new();
    let repo = Arc::new(CsvSnapshotRepository::new(&dir.0));
    let service = seeded(repo.clone()).await;

    assert_ok!(service.save().await);
    let first = repo.load_account().await.unwrap();

    let reloaded = PortfolioService::new(Arc::new(MockPriceOracle::new()))
        .with_repository(repo.clone())
        .with_account(first.clone());
    assert_ok!(reloaded.save().await);
    let second = repo.load_account().await.unwrap();

    assert_eq!(first, second);
    for (name, portfolio) in second.portfolios() {
        let original = service.account().portfolio(name).unwrap();
        for position in portfolio.positions() {
            let before = original.position(position.ticker()).unwrap();
            assert_eq!(position.total_shares(), before.total_shares());
            assert_eq!(position.total_cost(), before.total_cost());
        }
    }
}

#[tokio::test]
async fn test_replay_from_a_fresh_process() {
    let dir = TempDir::new();
    let repo = Arc::new(CsvSnapshotRepository::new(&dir.0));
    {
        let mut service = seeded(repo.clone()).await;
        assert_ok!(service.periodic_investment(&strategy()).await);
        assert_ok!(service.save().await);
    }

    let mut service = PortfolioService::new(Arc::new(weekday_oracle())).with_repository(repo);
    assert_ok!(service.load().await);
    let replayed = service.replay_strategy("Technology").await.unwrap();

    assert_eq!(replayed.len(), 10);
    let msft = service
        .account()
        .portfolio("Technology")
        .unwrap()
        .position("MSFT")
        .unwrap()
        .total_shares();
    assert_eq!(msft, 1 + 10 * 10);
}

#[tokio::test]
async fn test_profit_window_excludes_boundary_lots() {
    let dir = TempDir::new();
    let repo = Arc::new(CsvSnapshotRepository::new(&dir.0));
    let mut service = seeded(repo).await;
    assert_ok!(service.periodic_investment(&strategy()).await);

    // 08-06 and 10-24 sit on the window bounds
    let report = service
        .portfolio_profit("Technology", d(8, 6), d(10, 24))
        .await
        .unwrap();

    let msft_dates: Vec<_> = report
        .lines
        .iter()
        .filter(|l| l.ticker == "MSFT")
        .map(|l| l.date)
        .collect();
    assert_eq!(msft_dates, vec![d(8, 27), d(9, 14), d(10, 4)]);
    // flat prices: every lot loses exactly its commission
    assert_eq!(report.total, dec!(-20) * dec!(6));
}

#[tokio::test]
async fn test_fallback_search_is_bounded() {
    let oracle = MockPriceOracle::new().with_price("MSFT", d(12, 20), dec!(100));
    let mut service =
        PortfolioService::new(Arc::new(oracle)).with_resolver(QuoteResolver::new(5));
    assert_ok!(service.add_portfolio("Technology"));

    let err = service
        .buy_by_shares(dec!(0), "MSFT", d(12, 1), PriceType::Open, 1, "Technology")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AccountError::Oracle(OracleError::NoData {
            ticker: "MSFT".into(),
            date: d(12, 1)
        })
    );
    assert_eq!(service.stock_count("Technology").unwrap(), 0);
}

#[tokio::test]
async fn test_shared_service_serializes_concurrent_buys() {
    let mut service = PortfolioService::new(Arc::new(weekday_oracle()));
    assert_ok!(service.add_portfolio("Technology"));
    let shared: SharedPortfolioService = service.into_shared();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let shared = shared.clone();
        handles.push(tokio::spawn(async move {
            shared
                .lock()
                .await
                .buy_by_shares(dec!(1), "MSFT", d(9, 4), PriceType::Open, 3, "Technology")
                .await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let service = shared.lock().await;
    let position = service
        .account()
        .portfolio("Technology")
        .unwrap()
        .position("MSFT")
        .unwrap();
    assert_eq!(position.total_shares(), 24);
    assert_eq!(position.total_cost(), dec!(100) * dec!(24) + dec!(8));
}
