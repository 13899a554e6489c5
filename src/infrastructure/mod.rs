pub mod alphavantage;
pub mod core;
pub mod mock;
pub mod persistence;

pub use alphavantage::{AlphaVantagePriceOracle, AlphaVantageSettings};
pub use mock::MockPriceOracle;
pub use persistence::CsvSnapshotRepository;
