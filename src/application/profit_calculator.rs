use crate::application::portfolio_service::PortfolioService;
use crate::domain::errors::AccountError;
use crate::domain::trading::account::EMPTY_ACCOUNT_MESSAGE;
use crate::domain::trading::profit::{has_lots_in_window, ProfitReport};
use crate::domain::trading::types::PriceType;
use chrono::NaiveDate;
use tracing::{debug, info};

impl PortfolioService {
    /// Per-lot profit of `name` for buckets strictly between `start` and
    /// `end`, valued at the opening price on `end`.
    ///
    /// The end price is fetched once per position, and only for positions
    /// with at least one lot in the window. It is an exact-date lookup, so
    /// an `end` without a quote fails with `NoData`.
    pub async fn portfolio_profit(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ProfitReport, AccountError> {
        let portfolio = self.account.portfolio(name)?;
        let mut report = ProfitReport::new(name, start, end);

        for position in portfolio.positions() {
            if !has_lots_in_window(position, start, end) {
                debug!(
                    "ProfitCalculator: {} has no lots between {} and {}",
                    position.ticker(),
                    start,
                    end
                );
                continue;
            }
            let end_price = self
                .oracle
                .lookup(position.ticker(), end, PriceType::Open)
                .await?;
            report.add_position(position, end_price);
        }

        info!(
            "ProfitCalculator: '{}' {}..{} total {}",
            name, start, end, report.total
        );
        Ok(report)
    }

    /// Reports for every portfolio in name order.
    pub async fn account_profit(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ProfitReport>, AccountError> {
        let mut reports = Vec::with_capacity(self.account.len());
        for name in self.account.portfolio_names() {
            reports.push(self.portfolio_profit(&name, start, end).await?);
        }
        Ok(reports)
    }

    /// Printable account profit: every portfolio report concatenated, or the
    /// empty-account message.
    pub async fn view_account_profit(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String, AccountError> {
        if self.account.is_empty() {
            return Ok(EMPTY_ACCOUNT_MESSAGE.to_string());
        }
        Ok(self
            .account_profit(start, end)
            .await?
            .iter()
            .map(ToString::to_string)
            .collect())
    }
}
