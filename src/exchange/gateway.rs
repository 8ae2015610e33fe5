//! Authenticated exchange API calls: market lookup, funds, placement.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::arbitrage::lay_stake;
use crate::error::ExchangeError;
use crate::metrics;
use crate::utils::snippet;

use super::session::SessionManager;
use super::types::{
    sport_mapping, AccountFunds, ExchangeMarket, LimitOrder, MarketBook, MarketBookRequest,
    MarketCatalogue, MarketCatalogueRequest, MarketFilter, PlaceInstruction, PlaceOrdersRequest,
    PlaceOrdersResponse, PriceProjection,
};

/// Extra logins allowed within one API call after the exchange rejects
/// the session token.
pub const MAX_SESSION_RETRIES: usize = 1;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of a lay order attempt. Placement failures are data, not
/// errors: the scan loop reports them and moves on.
#[derive(Debug, Clone)]
pub enum PlacementOutcome {
    Placed {
        bet_id: Option<String>,
        size_matched: Decimal,
        average_price: Option<Decimal>,
    },
    Failed {
        reason: String,
    },
}

/// Authenticated client for the exchange betting and account APIs.
///
/// Every call fetches a token from the [`SessionManager`] first. When
/// the exchange rejects that token the gateway invalidates the cached
/// session and retries the call once with a fresh login; a second
/// rejection escapes as [`ExchangeError::InvalidSession`].
pub struct ExchangeGateway {
    client: Client,
    session: Arc<SessionManager>,
    api_url: String,
    account_url: String,
    app_key: String,
}

impl ExchangeGateway {
    pub fn new(
        session: Arc<SessionManager>,
        api_url: impl Into<String>,
        account_url: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            session,
            api_url: api_url.into(),
            account_url: account_url.into(),
            app_key: app_key.into(),
        })
    }

    /// Locate the head-to-head market for one event.
    ///
    /// Two-step lookup: `listMarketCatalogue` filtered by event type,
    /// market type, and the event name as a text query, then
    /// `listMarketBook` for the best offers on the single best match.
    /// No catalogue hit, no book, or an unmapped sport all come back as
    /// `Ok(None)`; only transport and API failures are errors.
    #[instrument(skip(self), fields(sport = %sport_key, query = %text_query))]
    pub async fn find_market(
        &self,
        sport_key: &str,
        text_query: &str,
    ) -> Result<Option<ExchangeMarket>, ExchangeError> {
        let Some(mapping) = sport_mapping(sport_key) else {
            debug!("no exchange mapping for sport");
            return Ok(None);
        };

        let request = MarketCatalogueRequest {
            filter: MarketFilter {
                event_type_ids: Some(vec![mapping.event_type_id.to_string()]),
                text_query: Some(text_query.to_string()),
                market_type_codes: Some(vec![mapping.market_type_code.to_string()]),
                in_play_only: Some(false),
            },
            market_projection: vec!["EVENT".to_string(), "RUNNER_DESCRIPTION".to_string()],
            sort: "FIRST_TO_START".to_string(),
            max_results: 1,
        };

        let catalogues: Vec<MarketCatalogue> = self
            .post_json(&self.api_url, "listMarketCatalogue", &request)
            .await?;
        let Some(catalogue) = catalogues.into_iter().next() else {
            debug!("no catalogue match");
            return Ok(None);
        };

        let book_request = MarketBookRequest {
            market_ids: vec![catalogue.market_id.clone()],
            price_projection: PriceProjection {
                price_data: vec!["EX_BEST_OFFERS".to_string()],
            },
        };

        let books: Vec<MarketBook> = self
            .post_json(&self.api_url, "listMarketBook", &book_request)
            .await?;
        let Some(book) = books.into_iter().next() else {
            debug!(market_id = %catalogue.market_id, "catalogue match has no book");
            return Ok(None);
        };

        Ok(Some(ExchangeMarket::from_parts(&catalogue, &book)))
    }

    /// Current account funds.
    pub async fn account_funds(&self) -> Result<AccountFunds, ExchangeError> {
        self.post_json(&self.account_url, "getAccountFunds", &serde_json::json!({}))
            .await
    }

    /// Lay a selection sized so the exposure equals `target_liability`.
    ///
    /// Computes the lay stake from the target liability, checks the
    /// account balance covers that liability, then submits one limit
    /// order that lapses if the market suspends. Every failure along
    /// the way, transport included, is folded into the returned
    /// [`PlacementOutcome`] so the caller never has to unwind a scan
    /// over a failed bet.
    #[instrument(skip(self), fields(market = %market_id, selection = selection_id))]
    pub async fn place_lay_order(
        &self,
        market_id: &str,
        selection_id: u64,
        lay_price: Decimal,
        target_liability: Decimal,
    ) -> PlacementOutcome {
        match self
            .try_place(market_id, selection_id, lay_price, target_liability)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => PlacementOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    async fn try_place(
        &self,
        market_id: &str,
        selection_id: u64,
        lay_price: Decimal,
        target_liability: Decimal,
    ) -> Result<PlacementOutcome, ExchangeError> {
        let size = match lay_stake(target_liability, lay_price) {
            Ok(stake) => stake.round_dp(2),
            Err(e) => {
                return Ok(PlacementOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        };

        let funds = self.account_funds().await?;
        let balance = Decimal::from_f64(funds.available_to_bet_balance).unwrap_or(Decimal::ZERO);
        if balance < target_liability {
            return Ok(PlacementOutcome::Failed {
                reason: format!("balance {balance} does not cover liability {target_liability}"),
            });
        }

        let request = PlaceOrdersRequest {
            market_id: market_id.to_string(),
            instructions: vec![PlaceInstruction {
                selection_id,
                side: "LAY".to_string(),
                order_type: "LIMIT".to_string(),
                limit_order: LimitOrder {
                    size: wire_f64(size, "lay size")?,
                    price: wire_f64(lay_price, "lay price")?,
                    persistence_type: "LAPSE".to_string(),
                },
            }],
        };

        let response: PlaceOrdersResponse = self
            .post_json(&self.api_url, "placeOrders", &request)
            .await?;

        if response.status != "SUCCESS" {
            let reason = response.error_code.unwrap_or(response.status);
            return Ok(PlacementOutcome::Failed { reason });
        }

        match response.instruction_reports.into_iter().next() {
            Some(report) if report.status == "SUCCESS" => {
                Ok(PlacementOutcome::Placed {
                    bet_id: report.bet_id,
                    size_matched: report
                        .size_matched
                        .and_then(Decimal::from_f64)
                        .unwrap_or(Decimal::ZERO),
                    average_price: report.average_price_matched.and_then(Decimal::from_f64),
                })
            }
            Some(report) => Ok(PlacementOutcome::Failed {
                reason: report.error_code.unwrap_or(report.status),
            }),
            None => Ok(PlacementOutcome::Failed {
                reason: "no instruction report".to_string(),
            }),
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        base: &str,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ExchangeError> {
        let url = format!("{base}/{endpoint}/");
        let mut attempts = 0;

        loop {
            let token = self.session.token().await?;
            let response = self
                .client
                .post(&url)
                .header("X-Application", &self.app_key)
                .header("X-Authentication", token)
                .header("Accept", "application/json")
                .json(body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;

            if is_invalid_session(status, &text) {
                if attempts < MAX_SESSION_RETRIES {
                    attempts += 1;
                    warn!(endpoint, "session rejected, retrying with fresh login");
                    metrics::inc_session_retries();
                    self.session.invalidate().await?;
                    continue;
                }
                return Err(ExchangeError::InvalidSession);
            }

            if !status.is_success() {
                return Err(ExchangeError::Api {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                    body: snippet(&text),
                });
            }

            return serde_json::from_str(&text)
                .map_err(|e| ExchangeError::ParseError(format!("{endpoint}: {e}")));
        }
    }
}

fn is_invalid_session(status: StatusCode, body: &str) -> bool {
    status == StatusCode::UNAUTHORIZED || body.contains("INVALID_SESSION_INFORMATION")
}

fn wire_f64(value: Decimal, what: &str) -> Result<f64, ExchangeError> {
    value
        .to_f64()
        .ok_or_else(|| ExchangeError::ParseError(format!("{what} {value} is not representable")))
}
