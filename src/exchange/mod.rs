//! Betting exchange integration: session protocol, authenticated
//! gateway, and the wire/domain types behind them.

pub mod gateway;
pub mod session;
pub mod types;

pub use gateway::{ExchangeGateway, PlacementOutcome, MAX_SESSION_RETRIES};
pub use session::{SessionManager, SessionRecord, SESSION_REFRESH_MARGIN, SESSION_VALIDITY};
pub use types::{
    sport_mapping, AccountFunds, ExchangeMarket, ExchangeRunner, PriceLevel, SportMapping,
};
