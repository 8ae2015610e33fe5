//! Exchange wire types and the domain view built from them.
//!
//! Wire structs mirror the exchange's JSON-REST payloads, which carry
//! prices as JSON numbers. Conversion to [`Decimal`] happens once, at
//! the boundary, when a market book is merged into an
//! [`ExchangeMarket`].

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// === Sport mapping ===

/// How a feed sport key translates to exchange market filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SportMapping {
    pub event_type_id: &'static str,
    pub market_type_code: &'static str,
}

/// Map a feed sport key to the exchange event type and the market type
/// that carries its head-to-head prices. US sports price the moneyline,
/// the rest use match odds. Unknown sports map to `None` and are
/// skipped by the scanner.
pub fn sport_mapping(sport_key: &str) -> Option<SportMapping> {
    let (event_type_id, market_type_code) = if sport_key.starts_with("soccer") {
        ("1", "MATCH_ODDS")
    } else if sport_key.starts_with("tennis") {
        ("2", "MATCH_ODDS")
    } else if sport_key.starts_with("cricket") {
        ("4", "MATCH_ODDS")
    } else if sport_key.starts_with("boxing") {
        ("6", "MATCH_ODDS")
    } else if sport_key.starts_with("mma") {
        ("468328", "MATCH_ODDS")
    } else if sport_key.starts_with("basketball") {
        ("7522", "MONEYLINE")
    } else if sport_key.starts_with("icehockey") {
        ("7524", "MONEYLINE")
    } else if sport_key.starts_with("americanfootball") {
        ("6423", "MONEYLINE")
    } else {
        return None;
    };
    Some(SportMapping {
        event_type_id,
        market_type_code,
    })
}

// === Authentication ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub session_token: Option<String>,
    pub login_status: String,
}

// === Market catalogue ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCatalogueRequest {
    pub filter: MarketFilter,
    pub market_projection: Vec<String>,
    pub sort: String,
    pub max_results: u32,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_type_codes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_play_only: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCatalogue {
    pub market_id: String,
    pub market_name: String,
    #[serde(default)]
    pub runners: Vec<RunnerCatalogue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerCatalogue {
    pub selection_id: u64,
    pub runner_name: String,
}

// === Market book ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketBookRequest {
    pub market_ids: Vec<String>,
    pub price_projection: PriceProjection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceProjection {
    pub price_data: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketBook {
    pub market_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub runners: Vec<RunnerBook>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerBook {
    pub selection_id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ex: Option<ExchangePrices>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePrices {
    #[serde(default)]
    pub available_to_back: Vec<PriceSize>,
    #[serde(default)]
    pub available_to_lay: Vec<PriceSize>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PriceSize {
    pub price: f64,
    pub size: f64,
}

// === Order placement ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrdersRequest {
    pub market_id: String,
    pub instructions: Vec<PlaceInstruction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceInstruction {
    pub selection_id: u64,
    pub side: String,
    pub order_type: String,
    pub limit_order: LimitOrder,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrder {
    pub size: f64,
    pub price: f64,
    pub persistence_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrdersResponse {
    pub status: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub instruction_reports: Vec<InstructionReport>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionReport {
    pub status: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub bet_id: Option<String>,
    #[serde(default)]
    pub size_matched: Option<f64>,
    #[serde(default)]
    pub average_price_matched: Option<f64>,
}

// === Account ===

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFunds {
    pub available_to_bet_balance: f64,
    #[serde(default)]
    pub exposure: Option<f64>,
}

// === Domain view ===

/// One price rung: price and the size available at it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceSize {
    fn to_level(self) -> Option<PriceLevel> {
        Some(PriceLevel {
            price: Decimal::from_f64(self.price)?,
            size: Decimal::from_f64(self.size)?,
        })
    }
}

/// A tradeable selection with its visible price ladders, best first.
#[derive(Debug, Clone)]
pub struct ExchangeRunner {
    pub selection_id: u64,
    pub name: String,
    pub back_prices: Vec<PriceLevel>,
    pub lay_prices: Vec<PriceLevel>,
}

impl ExchangeRunner {
    pub fn best_back(&self) -> Option<&PriceLevel> {
        self.back_prices.first()
    }

    pub fn best_lay(&self) -> Option<&PriceLevel> {
        self.lay_prices.first()
    }
}

/// Catalogue and book merged into one market snapshot.
#[derive(Debug, Clone)]
pub struct ExchangeMarket {
    pub market_id: String,
    pub market_name: String,
    pub runners: Vec<ExchangeRunner>,
}

impl ExchangeMarket {
    /// Join catalogue runner names with book prices on selection id.
    /// A runner missing from the book keeps its name with empty
    /// ladders, so downstream matching still sees it.
    pub fn from_parts(catalogue: &MarketCatalogue, book: &MarketBook) -> Self {
        let runners = catalogue
            .runners
            .iter()
            .map(|entry| {
                let (back_prices, lay_prices) = book
                    .runners
                    .iter()
                    .find(|r| r.selection_id == entry.selection_id)
                    .and_then(|r| r.ex.as_ref())
                    .map(|ex| (levels(&ex.available_to_back), levels(&ex.available_to_lay)))
                    .unwrap_or_default();

                ExchangeRunner {
                    selection_id: entry.selection_id,
                    name: entry.runner_name.clone(),
                    back_prices,
                    lay_prices,
                }
            })
            .collect();

        Self {
            market_id: catalogue.market_id.clone(),
            market_name: catalogue.market_name.clone(),
            runners,
        }
    }
}

fn levels(sizes: &[PriceSize]) -> Vec<PriceLevel> {
    sizes.iter().filter_map(|ps| ps.to_level()).collect()
}
