use crate::application::portfolio_service::{validate_commission, BuyConfirmation, PortfolioService};
use crate::domain::errors::AccountError;
use crate::domain::trading::allocation::{split_investment, AllocationWeights};
use crate::domain::trading::types::PriceType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

impl PortfolioService {
    /// Spread `total` over the portfolio's positions by `weights`, buying
    /// each share at the opening price.
    ///
    /// Weights are checked against the portfolio before anything is bought.
    /// Once buying starts there is no rollback: if one buy fails, the buys
    /// before it stay recorded and the error is returned.
    pub async fn buy_weighted(
        &mut self,
        commission: Decimal,
        total: Decimal,
        portfolio: &str,
        date: NaiveDate,
        weights: &AllocationWeights,
    ) -> Result<Vec<BuyConfirmation>, AccountError> {
        validate_commission(commission)?;
        if total <= Decimal::ZERO {
            return Err(AccountError::invalid(format!(
                "investment amount must be positive, got {}",
                total
            )));
        }

        let pairs = weights.resolve(self.account.portfolio(portfolio)?)?;
        let slices = split_investment(total, &pairs)?;

        info!(
            "AllocationEngine: investing {} into '{}' on {} across {} position(s) [{}]",
            total,
            portfolio,
            date,
            slices.len(),
            weights
        );

        let mut confirmations = Vec::with_capacity(slices.len());
        for slice in slices {
            let confirmation = self
                .buy_resolved_amount(
                    commission,
                    slice.ticker,
                    date,
                    PriceType::Open,
                    slice.amount,
                    portfolio,
                )
                .await?;
            confirmations.push(confirmation);
        }
        Ok(confirmations)
    }
}
