//! Back/lay arbitrage scanner between a bookmaker odds feed and a
//! betting exchange.
//!
//! The bot polls bookmaker back prices, locates the matching
//! head-to-head market on the exchange, and flags outcomes that can be
//! backed at the bookmaker above the price they can be laid at on the
//! exchange.
//!
//! # Strategy
//!
//! Backing at 2.10 while laying at 2.05 covers both results:
//!
//! ```text
//! implied = 1/2.10 + 1/2.05 = 0.9640 < 1.00
//! margin  = 1/0.9640 - 1    = 3.73% guaranteed
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`odds`]: Bookmaker odds feed client
//! - [`exchange`]: Exchange session, gateway, and market lookup
//! - [`arbitrage`]: Margin math, detection, and the gate
//! - [`store`]: Key/value store with TTL semantics
//! - [`scanner`]: The scan loop
//! - [`notify`]: Opportunity notification
//! - [`api`]: HTTP API for health/metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod arbitrage;
pub mod config;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod notify;
pub mod odds;
pub mod scanner;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
