//! Portfolio store operations over an [`Account`].
//!
//! The service owns the account and borrows its collaborators: prices come
//! from an injected [`PriceOracle`], snapshots go through an optional
//! [`AccountRepository`]. Every mutation is logged at info level.

use crate::application::quote_resolver::QuoteResolver;
use crate::domain::errors::{AccountError, OracleError};
use crate::domain::ports::PriceOracle;
use crate::domain::repositories::AccountRepository;
use crate::domain::trading::account::Account;
use crate::domain::trading::types::PriceType;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Serializes every mutating call on one account.
pub type SharedPortfolioService = Arc<Mutex<PortfolioService>>;

/// What a single buy actually recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyConfirmation {
    pub portfolio: String,
    pub ticker: String,
    /// Trading day the quote was found on (may be later than requested)
    pub date: NaiveDate,
    pub price: Decimal,
    pub shares: i64,
    pub commission: Decimal,
}

pub struct PortfolioService {
    pub(crate) account: Account,
    pub(crate) oracle: Arc<dyn PriceOracle>,
    pub(crate) repository: Option<Arc<dyn AccountRepository>>,
    pub(crate) resolver: QuoteResolver,
}

impl PortfolioService {
    pub fn new(oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            account: Account::new(),
            oracle,
            repository: None,
            resolver: QuoteResolver::default(),
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn AccountRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_resolver(mut self, resolver: QuoteResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.account = account;
        self
    }

    pub fn into_shared(self) -> SharedPortfolioService {
        Arc::new(Mutex::new(self))
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn add_portfolio(&mut self, name: &str) -> Result<(), AccountError> {
        self.account.add_portfolio(name)?;
        info!("PortfolioService: created portfolio '{}'", name);
        Ok(())
    }

    pub fn remove_portfolio(&mut self, name: &str) -> Result<(), AccountError> {
        let removed = self.account.remove_portfolio(name)?;
        info!(
            "PortfolioService: removed portfolio '{}' ({} positions)",
            name,
            removed.len()
        );
        Ok(())
    }

    /// Buy a whole number of shares at the `price_type` quote for `date`,
    /// or the next trading day with data.
    pub async fn buy_by_shares(
        &mut self,
        commission: Decimal,
        ticker: &str,
        date: NaiveDate,
        price_type: PriceType,
        shares: i64,
        portfolio: &str,
    ) -> Result<BuyConfirmation, AccountError> {
        validate_commission(commission)?;
        if shares <= 0 {
            return Err(AccountError::invalid(format!(
                "shares to buy must be positive, got {}",
                shares
            )));
        }
        self.account.portfolio(portfolio)?;

        let ticker = self.oracle.resolve_ticker(ticker).await?;
        let quote = self
            .resolver
            .resolve(self.oracle.as_ref(), &ticker, date, price_type)
            .await?;

        self.record_buy(portfolio, ticker, quote.date, quote.price, shares, commission)
    }

    /// Buy `round(investment / price)` shares, rounding half away from zero.
    pub async fn buy_by_amount(
        &mut self,
        commission: Decimal,
        ticker: &str,
        date: NaiveDate,
        price_type: PriceType,
        investment: Decimal,
        portfolio: &str,
    ) -> Result<BuyConfirmation, AccountError> {
        validate_commission(commission)?;
        if investment <= Decimal::ZERO {
            return Err(AccountError::invalid(format!(
                "investment amount must be positive, got {}",
                investment
            )));
        }
        self.account.portfolio(portfolio)?;

        let ticker = self.oracle.resolve_ticker(ticker).await?;
        self.buy_resolved_amount(commission, ticker, date, price_type, investment, portfolio)
            .await
    }

    /// Dollar buy of an already resolved ticker. Arguments are validated
    /// by the caller.
    pub(crate) async fn buy_resolved_amount(
        &mut self,
        commission: Decimal,
        ticker: String,
        date: NaiveDate,
        price_type: PriceType,
        investment: Decimal,
        portfolio: &str,
    ) -> Result<BuyConfirmation, AccountError> {
        let quote = self
            .resolver
            .resolve(self.oracle.as_ref(), &ticker, date, price_type)
            .await?;
        if quote.price <= Decimal::ZERO {
            return Err(OracleError::Unavailable {
                reason: format!("non-positive price {} for {}", quote.price, ticker),
            }
            .into());
        }

        let shares = shares_for_amount(investment, quote.price)?;
        if shares == 0 {
            warn!(
                "PortfolioService: ${} buys no whole share of {} at {}; recording commission only",
                investment, ticker, quote.price
            );
        }

        self.record_buy(portfolio, ticker, quote.date, quote.price, shares, commission)
    }

    /// Sell from the oldest lots first. The position disappears once no
    /// shares remain.
    pub fn sell_shares(
        &mut self,
        ticker: &str,
        shares: i64,
        portfolio: &str,
    ) -> Result<(), AccountError> {
        let holdings = self.account.portfolio_mut(portfolio)?;
        let ticker = holdings
            .positions()
            .iter()
            .map(|p| p.ticker())
            .find(|t| t.eq_ignore_ascii_case(ticker.trim()))
            .map(str::to_string)
            .ok_or_else(|| AccountError::PositionNotFound {
                ticker: ticker.to_string(),
            })?;

        let position = holdings
            .position_mut(&ticker)
            .ok_or_else(|| AccountError::PositionNotFound {
                ticker: ticker.clone(),
            })?;
        position.apply_sell(shares)?;
        let remaining = position.total_shares();

        if position.is_flat() {
            holdings.remove(&ticker);
            info!(
                "PortfolioService: sold {} {} from '{}'; position closed",
                shares, ticker, portfolio
            );
        } else {
            info!(
                "PortfolioService: sold {} {} from '{}'; {} remaining",
                shares, ticker, portfolio, remaining
            );
        }
        Ok(())
    }

    pub fn view_account(&self) -> String {
        self.account.view_account()
    }

    pub fn view_portfolio(&self, name: &str) -> Result<String, AccountError> {
        self.account.view_portfolio(name)
    }

    pub fn check_portfolio_names(&self) -> String {
        self.account.check_portfolio_names()
    }

    pub fn view_stock_logs(&self, name: &str) -> Result<String, AccountError> {
        self.account.view_stock_logs(name)
    }

    pub fn stock_count(&self, name: &str) -> Result<usize, AccountError> {
        self.account.stock_count(name)
    }

    /// Replace the in-memory account with the stored snapshot. Without a
    /// repository this is a no-op.
    pub async fn load(&mut self) -> Result<(), AccountError> {
        if let Some(repository) = &self.repository {
            self.account = repository.load_account().await?;
            info!(
                "PortfolioService: loaded {} portfolio(s) from snapshot",
                self.account.len()
            );
        }
        Ok(())
    }

    pub async fn save(&self) -> Result<(), AccountError> {
        if let Some(repository) = &self.repository {
            repository.save_account(&self.account).await?;
            info!(
                "PortfolioService: saved {} portfolio(s) to snapshot",
                self.account.len()
            );
        }
        Ok(())
    }

    fn record_buy(
        &mut self,
        portfolio: &str,
        ticker: String,
        date: NaiveDate,
        price: Decimal,
        shares: i64,
        commission: Decimal,
    ) -> Result<BuyConfirmation, AccountError> {
        let holdings = self.account.portfolio_mut(portfolio)?;
        let opened = holdings.position(&ticker).is_none();
        if let Err(e) = holdings
            .position_or_insert(&ticker)
            .apply_buy(date, commission, price, shares)
        {
            if opened {
                holdings.remove(&ticker);
            }
            return Err(e);
        }

        info!(
            "PortfolioService: bought {} {} @ {} on {} into '{}' (commission {})",
            shares, ticker, price, date, portfolio, commission
        );

        Ok(BuyConfirmation {
            portfolio: portfolio.to_string(),
            ticker,
            date,
            price,
            shares,
            commission,
        })
    }
}

pub(crate) fn validate_commission(commission: Decimal) -> Result<(), AccountError> {
    if commission < Decimal::ZERO {
        return Err(AccountError::invalid(format!(
            "commission must not be negative, got {}",
            commission
        )));
    }
    Ok(())
}

pub(crate) fn shares_for_amount(investment: Decimal, price: Decimal) -> Result<i64, AccountError> {
    (investment / price)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            AccountError::invalid(format!(
                "{} / {} does not fit a share count",
                investment, price
            ))
        })
}
