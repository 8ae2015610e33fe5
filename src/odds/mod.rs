//! Bookmaker odds feed: client and wire types.

pub mod client;
pub mod types;

pub use client::{OddsClient, ODDS_LOOKAHEAD};
pub use types::{bookmaker_url, OddsEvent, Quote, H2H_MARKET};
