//! Unified error types for the arbitrage scanner.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the arbitrage scanner.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Odds feed error.
    #[error("odds feed error: {0}")]
    Odds(#[from] OddsError),

    /// Exchange session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Exchange API error.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// Key/value store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stake/margin calculation error.
    #[error("margin error: {0}")]
    Margin(#[from] MarginError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the bookmaker odds feed.
#[derive(Error, Debug)]
pub enum OddsError {
    /// The API reported an exhausted request allowance. The current
    /// sport's scan is abandoned and retried next cycle.
    #[error("odds feed quota exceeded: {message}")]
    QuotaExceeded {
        /// Upstream message describing the quota state.
        message: String,
    },

    /// Non-success response that is not a quota signal.
    #[error("odds feed returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or upstream message.
        message: String,
    },

    /// Failed to parse the feed response.
    #[error("failed to parse odds feed response: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Errors from the exchange login protocol.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The identity endpoint explicitly rejected the credentials.
    #[error("exchange login rejected: {status}")]
    LoginRejected {
        /// Upstream login status, e.g. "INVALID_USERNAME_OR_PASSWORD".
        status: String,
    },

    /// The login response was not the expected JSON shape (an HTML error
    /// page, a gateway error, ...). Treated as an authentication failure.
    #[error("unparseable login response: {0}")]
    MalformedResponse(String),

    /// Login reported success but carried no token.
    #[error("login succeeded but no session token returned")]
    MissingToken,

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Session record persistence failed.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from authenticated exchange calls.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The exchange rejected the session token. Internal signal; the
    /// gateway invalidates the cached session and retries once, so this
    /// only escapes when the retry budget is spent.
    #[error("exchange rejected the session token")]
    InvalidSession,

    /// Non-success response from the exchange API.
    #[error("exchange {endpoint} returned HTTP {status}: {body}")]
    Api {
        /// Endpoint name, e.g. "listMarketCatalogue".
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Failed to parse an exchange response.
    #[error("failed to parse exchange response: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Session acquisition failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors from the key/value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from stake and margin calculations.
#[derive(Error, Debug, PartialEq)]
pub enum MarginError {
    /// Lay stake is undefined for lay prices at or below 1.0.
    #[error("lay price {0} must be greater than 1.0")]
    LayPriceTooLow(Decimal),

    /// The stake range contains no integer that survives the
    /// round-number filter.
    #[error("stake range [{min}, {max}] contains no usable stake")]
    EmptyStakeRange {
        /// Lower bound of the requested range.
        min: u32,
        /// Upper bound of the requested range.
        max: u32,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
