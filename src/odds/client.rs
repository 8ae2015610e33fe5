//! HTTP client for The Odds API v4.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::error::OddsError;
use crate::utils::snippet;

use super::types::{OddsEvent, H2H_MARKET};

const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Events further out than this are not worth scanning yet.
pub const ODDS_LOOKAHEAD: time::Duration = time::Duration::hours(24);

/// The feed rejects fractional seconds in time filters.
const COMMENCE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Client for the bookmaker odds feed.
pub struct OddsClient {
    client: Client,
    base_url: String,
    api_key: String,
    regions: String,
}

impl OddsClient {
    pub fn new(
        api_key: impl Into<String>,
        regions: impl Into<String>,
    ) -> Result<Self, OddsError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            regions: regions.into(),
        })
    }

    /// Override the feed base URL, mainly for tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base = base_url.into();
        while base.ends_with('/') {
            base.pop();
        }
        self.base_url = base;
        self
    }

    /// Fetch upcoming h2h odds for one sport, limited to events starting
    /// within [`ODDS_LOOKAHEAD`].
    ///
    /// Quota exhaustion surfaces as [`OddsError::QuotaExceeded`] whether
    /// the feed signals it with 429 or with a 401 usage message.
    #[instrument(skip(self))]
    pub async fn fetch_odds(&self, sport_key: &str) -> Result<Vec<OddsEvent>, OddsError> {
        let url = format!("{}/sports/{}/odds", self.base_url, sport_key);
        let commence_time_to = horizon(OffsetDateTime::now_utc())?;

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", self.regions.as_str()),
                ("markets", H2H_MARKET),
                ("oddsFormat", "decimal"),
                ("commenceTimeTo", commence_time_to.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let remaining = header_string(&response, "x-requests-remaining");
        let used = header_string(&response, "x-requests-used");
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OddsError::QuotaExceeded {
                message: snippet(&body),
            });
        }
        if status == StatusCode::UNAUTHORIZED && body.to_lowercase().contains("usage") {
            return Err(OddsError::QuotaExceeded {
                message: snippet(&body),
            });
        }
        if !status.is_success() {
            return Err(OddsError::Api {
                status: status.as_u16(),
                message: snippet(&body),
            });
        }

        if let Some(remaining) = remaining.as_deref() {
            debug!(
                remaining,
                used = used.as_deref().unwrap_or("?"),
                "feed request quota"
            );
        }

        let events: Vec<OddsEvent> = serde_json::from_str(&body)
            .map_err(|e| OddsError::ParseError(format!("odds response: {e}")))?;

        debug!(events = events.len(), "fetched odds");
        Ok(events)
    }
}

fn horizon(now: OffsetDateTime) -> Result<String, OddsError> {
    (now + ODDS_LOOKAHEAD)
        .format(&COMMENCE_TIME_FORMAT)
        .map_err(|e| OddsError::ParseError(format!("time filter: {e}")))
}

fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use time::macros::datetime;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OddsClient {
        OddsClient::new("test-key", "uk")
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn horizon_is_whole_seconds_utc() {
        let now = datetime!(2026-08-25 09:30:15.123 UTC);
        assert_eq!(horizon(now).unwrap(), "2026-08-26T09:30:15Z");
    }

    #[tokio::test]
    async fn fetches_and_parses_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .and(query_param("apiKey", "test-key"))
            .and(query_param("regions", "uk"))
            .and(query_param("markets", "h2h"))
            .and(query_param("oddsFormat", "decimal"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "e1",
                    "sport_key": "soccer_epl",
                    "sport_title": "EPL",
                    "commence_time": "2026-09-01T15:00:00Z",
                    "home_team": "Arsenal",
                    "away_team": "Chelsea",
                    "bookmakers": [
                        {
                            "key": "williamhill",
                            "title": "William Hill",
                            "markets": [
                                {
                                    "key": "h2h",
                                    "outcomes": [
                                        {"name": "Arsenal", "price": 2.50},
                                        {"name": "Chelsea", "price": 2.90},
                                        {"name": "Draw", "price": 3.40}
                                    ]
                                }
                            ]
                        }
                    ]
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let events = client_for(&server).fetch_odds("soccer_epl").await.unwrap();

        assert_eq!(events.len(), 1);
        let quotes = events[0].quotes();
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].back_price, dec!(2.50));
    }

    #[tokio::test]
    async fn too_many_requests_maps_to_quota_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"message": "Too many requests"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_odds("soccer_epl")
            .await
            .unwrap_err();
        assert!(matches!(err, OddsError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn unauthorized_usage_message_maps_to_quota_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "message": "Usage quota has been reached",
                "error_code": "EXCEEDED_FREQ_LIMIT"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_odds("soccer_epl")
            .await
            .unwrap_err();
        assert!(matches!(err, OddsError::QuotaExceeded { .. }));
    }

    #[tokio::test]
    async fn unauthorized_without_usage_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid api key"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_odds("soccer_epl")
            .await
            .unwrap_err();
        assert!(matches!(err, OddsError::Api { status: 401, .. }));
    }
}
