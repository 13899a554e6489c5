// Core trading domain entities and value objects
pub mod account;
pub mod allocation;
pub mod ledger;
pub mod portfolio;
pub mod position;
pub mod profit;
pub mod strategy;
pub mod types;
