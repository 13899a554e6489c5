use crate::application::portfolio_service::{BuyConfirmation, PortfolioService};
use crate::domain::errors::AccountError;
use crate::domain::trading::strategy::Strategy;
use tracing::{info, warn};

impl PortfolioService {
    /// Run a dollar-cost averaging strategy: one weighted buy on each of
    /// `strategy.buy_dates()`.
    ///
    /// The strategy is stored (when a repository is configured) before the
    /// first buy, so it survives a failed run. Buys already made are kept
    /// when a later date fails.
    pub async fn periodic_investment(
        &mut self,
        strategy: &Strategy,
    ) -> Result<Vec<BuyConfirmation>, AccountError> {
        strategy.validate()?;
        self.account.portfolio(&strategy.portfolio)?;

        if let Some(repository) = &self.repository {
            repository.save_strategy(strategy).await?;
        }

        let dates = strategy.buy_dates();
        info!(
            "PeriodicScheduler: {} buy(s) of {} into '{}' every {} day(s) from {}",
            dates.len(),
            strategy.investment_amount,
            strategy.portfolio,
            strategy.interval_days,
            strategy.start_date
        );

        let mut confirmations = Vec::new();
        for date in dates {
            let bought = self
                .buy_weighted(
                    strategy.commission,
                    strategy.investment_amount,
                    &strategy.portfolio,
                    date,
                    &strategy.weights,
                )
                .await
                .inspect_err(|e| {
                    warn!(
                        "PeriodicScheduler: buy on {} for '{}' failed: {}",
                        date, strategy.portfolio, e
                    )
                })?;
            confirmations.extend(bought);
        }
        Ok(confirmations)
    }

    /// Re-run the strategy last stored for `portfolio`.
    pub async fn replay_strategy(
        &mut self,
        portfolio: &str,
    ) -> Result<Vec<BuyConfirmation>, AccountError> {
        let repository = self.repository.clone().ok_or_else(|| {
            AccountError::invalid("no repository configured for stored strategies")
        })?;
        let strategy = repository
            .load_strategy(portfolio)
            .await?
            .ok_or_else(|| AccountError::invalid(format!("no stored strategy for '{}'", portfolio)))?;

        info!("PeriodicScheduler: replaying stored strategy for '{}'", portfolio);
        self.periodic_investment(&strategy).await
    }
}
