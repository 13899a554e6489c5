//! Rustfolio command line front end.
//!
//! Each invocation loads the account snapshot from `DATA_DIR`, runs one
//! command and saves the snapshot back when the command changed it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rustfolio::application::portfolio_service::{BuyConfirmation, PortfolioService};
use rustfolio::application::quote_resolver::QuoteResolver;
use rustfolio::config::{Config, Mode};
use rustfolio::domain::ports::PriceOracle;
use rustfolio::domain::trading::allocation::AllocationWeights;
use rustfolio::domain::trading::strategy::Strategy;
use rustfolio::domain::trading::types::PriceType;
use rustfolio::infrastructure::core::HttpClientSettings;
use rustfolio::infrastructure::{AlphaVantagePriceOracle, AlphaVantageSettings, CsvSnapshotRepository};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Virtual stock portfolio manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty portfolio
    Create { name: String },

    /// Delete a portfolio and everything in it
    Remove { name: String },

    /// Buy a stock by share count or by dollar amount
    Buy {
        #[arg(short, long)]
        portfolio: String,

        /// Company name or ticker symbol
        #[arg(short, long)]
        ticker: String,

        /// Trade date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Whole shares to buy
        #[arg(long, conflicts_with = "amount", required_unless_present = "amount")]
        shares: Option<i64>,

        /// Dollars to invest (rounded to whole shares)
        #[arg(long)]
        amount: Option<Decimal>,

        /// Commission per transaction (defaults to DEFAULT_COMMISSION)
        #[arg(short, long)]
        commission: Option<Decimal>,

        /// open, high, low or close (defaults to DEFAULT_PRICE_TYPE)
        #[arg(long)]
        price_type: Option<PriceType>,
    },

    /// Sell shares, oldest lots first
    Sell {
        #[arg(short, long)]
        portfolio: String,

        #[arg(short, long)]
        ticker: String,

        #[arg(long)]
        shares: i64,
    },

    /// Split one investment across the portfolio's positions by weight
    Allocate {
        #[arg(short, long)]
        portfolio: String,

        /// Trade date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Total dollars to invest
        #[arg(short, long)]
        amount: Decimal,

        /// e.g. "AMZN:20,AMD:10" or positional "20|10"
        #[arg(short, long)]
        weights: AllocationWeights,

        #[arg(short, long)]
        commission: Option<Decimal>,
    },

    /// Invest on a fixed interval between two dates (dollar-cost averaging)
    Dca {
        #[arg(short, long)]
        portfolio: String,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        /// Days between buys
        #[arg(short, long)]
        interval: i64,

        /// Dollars invested on each buy date
        #[arg(short, long)]
        amount: Decimal,

        #[arg(short, long)]
        weights: AllocationWeights,

        #[arg(short, long)]
        commission: Option<Decimal>,
    },

    /// Re-run the strategy last stored for a portfolio
    Replay {
        #[arg(short, long)]
        portfolio: String,
    },

    /// Show one portfolio, or the whole account
    View {
        #[arg(short, long)]
        portfolio: Option<String>,
    },

    /// List portfolio names
    Names,

    /// Show the transaction dates of every position
    Logs {
        #[arg(short, long)]
        portfolio: String,
    },

    /// Number of positions in a portfolio
    Count {
        #[arg(short, long)]
        portfolio: String,
    },

    /// Per-lot profit between two dates (both exclusive)
    Profit {
        /// Omit for every portfolio
        #[arg(short, long)]
        portfolio: Option<String>,

        #[arg(long)]
        start: NaiveDate,

        #[arg(long)]
        end: NaiveDate,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Create { .. }
                | Commands::Remove { .. }
                | Commands::Buy { .. }
                | Commands::Sell { .. }
                | Commands::Allocate { .. }
                | Commands::Dca { .. }
                | Commands::Replay { .. }
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    let mut service = build_service(&config);
    service.load().await.context("Failed to load account snapshot")?;

    execute_and_save(&mut service, &config, cli.command).await
}

/// Run one command, then save the snapshot if the command can change the
/// account. The save also happens when the command fails partway, so buys
/// recorded before the failure are kept. The command's error is reported
/// ahead of a save error.
async fn execute_and_save(
    service: &mut PortfolioService,
    config: &Config,
    command: Commands,
) -> Result<()> {
    let mutates = command.mutates();
    let outcome = execute(service, config, command).await;
    if !mutates {
        return outcome;
    }

    let saved = service.save().await.context("Failed to save account snapshot");
    match (outcome, saved) {
        (Ok(()), saved) => saved,
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(save_error)) => {
            warn!("Rustfolio: {:#}", save_error);
            Err(e)
        }
    }
}

fn build_service(config: &Config) -> PortfolioService {
    let settings = AlphaVantageSettings {
        base_url: config.oracle.base_url.clone(),
        api_key: config.oracle.api_key.clone(),
        cache_dir: config.storage.stocks_dir(),
        offline: config.oracle.mode == Mode::Offline,
        max_requests_per_minute: config.oracle.max_requests_per_minute,
        http: HttpClientSettings {
            max_retries: config.oracle.max_retries,
            request_timeout: Duration::from_secs(config.oracle.request_timeout_secs),
            ..HttpClientSettings::default()
        },
    };
    let oracle: Arc<dyn PriceOracle> = Arc::new(AlphaVantagePriceOracle::new(settings));
    let repository = Arc::new(CsvSnapshotRepository::new(&config.storage.data_dir));

    info!(
        "Rustfolio: data in {:?}, {:?} mode",
        config.storage.data_dir, config.oracle.mode
    );

    PortfolioService::new(oracle)
        .with_repository(repository)
        .with_resolver(QuoteResolver::new(config.trading.quote_fallback_days))
}

async fn execute(service: &mut PortfolioService, config: &Config, command: Commands) -> Result<()> {
    let default_commission = config.trading.default_commission;

    match command {
        Commands::Create { name } => {
            service.add_portfolio(&name)?;
            println!("Created portfolio {}", name);
        }
        Commands::Remove { name } => {
            service.remove_portfolio(&name)?;
            println!("Removed portfolio {}", name);
        }
        Commands::Buy {
            portfolio,
            ticker,
            date,
            shares,
            amount,
            commission,
            price_type,
        } => {
            let commission = commission.unwrap_or(default_commission);
            let price_type = price_type.unwrap_or(config.trading.default_price_type);
            let confirmation = match (shares, amount) {
                (Some(shares), _) => {
                    service
                        .buy_by_shares(commission, &ticker, date, price_type, shares, &portfolio)
                        .await?
                }
                (None, Some(amount)) => {
                    service
                        .buy_by_amount(commission, &ticker, date, price_type, amount, &portfolio)
                        .await?
                }
                (None, None) => anyhow::bail!("Either --shares or --amount is required"),
            };
            print_confirmation(&confirmation);
        }
        Commands::Sell {
            portfolio,
            ticker,
            shares,
        } => {
            service.sell_shares(&ticker, shares, &portfolio)?;
            println!("Sold {} {} from {}", shares, ticker, portfolio);
        }
        Commands::Allocate {
            portfolio,
            date,
            amount,
            weights,
            commission,
        } => {
            let confirmations = service
                .buy_weighted(
                    commission.unwrap_or(default_commission),
                    amount,
                    &portfolio,
                    date,
                    &weights,
                )
                .await?;
            confirmations.iter().for_each(print_confirmation);
        }
        Commands::Dca {
            portfolio,
            start,
            end,
            interval,
            amount,
            weights,
            commission,
        } => {
            let strategy = Strategy {
                commission: commission.unwrap_or(default_commission),
                investment_amount: amount,
                portfolio,
                start_date: start,
                end_date: end,
                interval_days: interval,
                weights,
            };
            let confirmations = service.periodic_investment(&strategy).await?;
            confirmations.iter().for_each(print_confirmation);
            println!("{} buy(s) recorded", confirmations.len());
        }
        Commands::Replay { portfolio } => {
            let confirmations = service.replay_strategy(&portfolio).await?;
            confirmations.iter().for_each(print_confirmation);
            println!("{} buy(s) recorded", confirmations.len());
        }
        Commands::View { portfolio } => match portfolio {
            Some(name) => print!("{}", service.view_portfolio(&name)?),
            None => println!("{}", service.view_account()),
        },
        Commands::Names => print!("{}", service.check_portfolio_names()),
        Commands::Logs { portfolio } => print!("{}", service.view_stock_logs(&portfolio)?),
        Commands::Count { portfolio } => println!("{}", service.stock_count(&portfolio)?),
        Commands::Profit {
            portfolio,
            start,
            end,
            json,
        } => {
            let reports = match portfolio {
                Some(name) => vec![service.portfolio_profit(&name, start, end).await?],
                None if !json => {
                    print!("{}", service.view_account_profit(start, end).await?);
                    return Ok(());
                }
                None => service.account_profit(start, end).await?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                reports.iter().for_each(|report| print!("{}", report));
            }
        }
    }
    Ok(())
}

fn print_confirmation(confirmation: &BuyConfirmation) {
    println!(
        "{}: bought {} {} @ {:.2} on {} (commission {:.2})",
        confirmation.portfolio,
        confirmation.shares,
        confirmation.ticker,
        confirmation.price,
        confirmation.date,
        confirmation.commission
    );
}
