use crate::domain::errors::AccountError;
use crate::domain::trading::portfolio::Portfolio;
use std::collections::BTreeMap;

pub const EMPTY_ACCOUNT_MESSAGE: &str = "User has no active portfolios.";

/// A user account: uniquely named portfolios, listed in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    portfolios: BTreeMap<String, Portfolio>,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_portfolio(&mut self, name: &str) -> Result<(), AccountError> {
        validate_name(name)?;
        if self.portfolios.contains_key(name) {
            return Err(AccountError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.portfolios.insert(name.to_string(), Portfolio::new());
        Ok(())
    }

    /// Discard a portfolio and every position in it.
    pub fn remove_portfolio(&mut self, name: &str) -> Result<Portfolio, AccountError> {
        validate_name(name)?;
        self.portfolios
            .remove(name)
            .ok_or_else(|| AccountError::PortfolioNotFound {
                name: name.to_string(),
            })
    }

    /// Put a restored portfolio back under `name`, replacing any existing one.
    pub fn insert_portfolio(
        &mut self,
        name: &str,
        portfolio: Portfolio,
    ) -> Result<(), AccountError> {
        validate_name(name)?;
        self.portfolios.insert(name.to_string(), portfolio);
        Ok(())
    }

    pub fn portfolio(&self, name: &str) -> Result<&Portfolio, AccountError> {
        self.portfolios
            .get(name)
            .ok_or_else(|| AccountError::PortfolioNotFound {
                name: name.to_string(),
            })
    }

    pub fn portfolio_mut(&mut self, name: &str) -> Result<&mut Portfolio, AccountError> {
        self.portfolios
            .get_mut(name)
            .ok_or_else(|| AccountError::PortfolioNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.portfolios.contains_key(name)
    }

    pub fn portfolios(&self) -> impl Iterator<Item = (&str, &Portfolio)> {
        self.portfolios.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn portfolio_names(&self) -> Vec<String> {
        self.portfolios.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    /// Number of positions held in a portfolio.
    pub fn stock_count(&self, name: &str) -> Result<usize, AccountError> {
        Ok(self.portfolio(name)?.len())
    }

    pub fn view_account(&self) -> String {
        if self.portfolios.is_empty() {
            return EMPTY_ACCOUNT_MESSAGE.to_string();
        }
        self.portfolios
            .iter()
            .map(|(name, portfolio)| render_portfolio(name, portfolio))
            .collect()
    }

    pub fn view_portfolio(&self, name: &str) -> Result<String, AccountError> {
        Ok(render_portfolio(name, self.portfolio(name)?))
    }

    pub fn check_portfolio_names(&self) -> String {
        let mut out = String::from("Portfolio Names: \n");
        for name in self.portfolios.keys() {
            out.push_str(name);
            out.push('\n');
        }
        out
    }

    pub fn view_stock_logs(&self, name: &str) -> Result<String, AccountError> {
        Ok(self
            .portfolio(name)?
            .positions()
            .iter()
            .map(|p| p.log_summary())
            .collect())
    }
}

fn render_portfolio(name: &str, portfolio: &Portfolio) -> String {
    let mut out = format!("Portfolio: {}\n", name);
    for position in portfolio.positions() {
        out.push_str(&position.to_string());
    }
    out
}

/// Names double as snapshot directory names.
pub(crate) fn validate_name(name: &str) -> Result<(), AccountError> {
    if name.trim().is_empty() {
        return Err(AccountError::invalid("Please name the portfolio"));
    }
    if name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(AccountError::invalid(format!(
            "'{}' cannot be a portfolio name (no leading '.', no '/', '\\' or NUL)",
            name
        )));
    }
    Ok(())
}
