// Trading-day lookup with bounded forward fallback
pub mod quote_resolver;

// Portfolio store: lifecycle, buys, sells and textual views
pub mod portfolio_service;

// Weighted multi-buy
pub mod allocation_engine;

// Dollar-cost averaging and strategy replay
pub mod periodic_scheduler;

// Per-lot profit over a date window
pub mod profit_calculator;
