//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;
use strum::{Display, EnumString};

/// Which detection strategy the scanner runs per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectionStrategy {
    /// Match every bookmaker quote against the runner list and keep all
    /// positive-margin pairs.
    PerOutcome,
    /// Compare the best bookmaker back price per side against the best
    /// exchange lay price.
    BestBack,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Odds Feed ===
    /// API key for the bookmaker odds feed.
    pub odds_api_key: String,

    /// Odds feed base URL.
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,

    /// Bookmaker regions requested from the feed (comma-separated).
    #[serde(default = "default_odds_regions")]
    pub odds_regions: String,

    // === Exchange Credentials ===
    /// Exchange application key (sent as X-Application).
    pub exchange_app_key: String,

    /// Exchange account username.
    pub exchange_username: String,

    /// Exchange account password.
    pub exchange_password: String,

    /// Exchange identity (login) endpoint.
    #[serde(default = "default_exchange_auth_url")]
    pub exchange_auth_url: String,

    /// Exchange betting API base URL.
    #[serde(default = "default_exchange_api_url")]
    pub exchange_api_url: String,

    /// Exchange account API base URL.
    #[serde(default = "default_exchange_account_url")]
    pub exchange_account_url: String,

    // === Detection Parameters ===
    /// Detection strategy: per_outcome or best_back.
    #[serde(default = "default_detection")]
    pub detection: DetectionStrategy,

    /// Minimum profit margin for the gate to admit an opportunity.
    #[serde(default = "default_min_profit_margin")]
    pub min_profit_margin: Decimal,

    /// Lower bound of the randomized stake range.
    #[serde(default = "default_stake_min")]
    pub stake_min: u32,

    /// Upper bound of the randomized stake range.
    #[serde(default = "default_stake_max")]
    pub stake_max: u32,

    // === Scanning ===
    /// Sport keys to scan (comma-separated feed keys).
    #[serde(default = "default_sports")]
    pub sports: String,

    /// Seconds between scan cycles in `run` mode.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    // === Order Placement (disabled by default) ===
    /// Place a covering lay order for accepted opportunities.
    #[serde(default)]
    pub auto_bet: bool,

    /// Target lay liability when auto betting.
    #[serde(default = "default_target_liability")]
    pub target_liability: Decimal,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_odds_api_url() -> String {
    "https://api.the-odds-api.com/v4".to_string()
}

fn default_odds_regions() -> String {
    "uk".to_string()
}

fn default_exchange_auth_url() -> String {
    "https://identitysso.betfair.com/api/login".to_string()
}

fn default_exchange_api_url() -> String {
    "https://api.betfair.com/exchange/betting/rest/v1.0".to_string()
}

fn default_exchange_account_url() -> String {
    "https://api.betfair.com/exchange/account/rest/v1.0".to_string()
}

fn default_detection() -> DetectionStrategy {
    DetectionStrategy::BestBack
}

fn default_min_profit_margin() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_stake_min() -> u32 {
    280
}

fn default_stake_max() -> u32 {
    420
}

fn default_sports() -> String {
    "soccer_epl,soccer_uefa_champs_league,basketball_nba".to_string()
}

fn default_scan_interval() -> u64 {
    300
}

fn default_target_liability() -> Decimal {
    Decimal::new(100, 0) // 100 units
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.odds_api_key.is_empty() {
            return Err("ODDS_API_KEY is required".to_string());
        }

        if self.exchange_app_key.is_empty() {
            return Err("EXCHANGE_APP_KEY is required".to_string());
        }

        if self.exchange_username.is_empty() || self.exchange_password.is_empty() {
            return Err("EXCHANGE_USERNAME and EXCHANGE_PASSWORD are required".to_string());
        }

        if self.stake_min == 0 {
            return Err("STAKE_MIN must be at least 1".to_string());
        }

        if self.stake_min > self.stake_max {
            return Err("STAKE_MIN must not exceed STAKE_MAX".to_string());
        }

        // A single round number leaves nothing for the stake randomizer.
        if self.stake_min == self.stake_max && self.stake_min % 50 == 0 {
            return Err("STAKE_MIN..STAKE_MAX contains no usable stake".to_string());
        }

        if self.min_profit_margin < Decimal::ZERO {
            return Err("MIN_PROFIT_MARGIN must not be negative".to_string());
        }

        if self.sport_keys().is_empty() {
            return Err("SPORTS must name at least one sport key".to_string());
        }

        Ok(())
    }

    /// Sport keys parsed from the comma-separated `sports` value.
    pub fn sport_keys(&self) -> Vec<String> {
        self.sports
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
