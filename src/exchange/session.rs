//! Exchange session lifecycle: login, caching, proactive refresh.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use crate::error::{SessionError, StoreError};
use crate::metrics;
use crate::store::KeyValueStore;

use super::types::LoginResponse;

/// Store key holding the serialized session record.
const SESSION_KEY: &str = "exchange:session";

/// How long a freshly issued session token is trusted.
pub const SESSION_VALIDITY: Duration = Duration::hours(8);

/// Cached sessions with less than this much validity left are not
/// reused; the next caller logs in again instead of risking mid-scan
/// expiry.
pub const SESSION_REFRESH_MARGIN: Duration = Duration::hours(1);

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// Persisted session: the token plus its absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    /// Usable only while more than [`SESSION_REFRESH_MARGIN`] remains.
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now + SESSION_REFRESH_MARGIN
    }
}

/// Interpret the identity endpoint response body.
///
/// The endpoint answers HTML for some failure modes (maintenance pages,
/// upstream proxies), so non-JSON bodies become
/// [`SessionError::MalformedResponse`] instead of a bare parse error.
pub fn parse_login(body: &str) -> Result<LoginResponse, SessionError> {
    if body.trim_start().starts_with('<') {
        return Err(SessionError::MalformedResponse(
            "HTML response from identity endpoint".to_string(),
        ));
    }

    let login: LoginResponse =
        serde_json::from_str(body).map_err(|e| SessionError::MalformedResponse(e.to_string()))?;

    if login.login_status != "SUCCESS" {
        return Err(SessionError::LoginRejected {
            status: login.login_status,
        });
    }

    Ok(login)
}

/// Owns the exchange credentials and hands out a valid session token,
/// logging in only when the cached session is missing or near expiry.
pub struct SessionManager {
    client: Client,
    store: Arc<dyn KeyValueStore>,
    auth_url: String,
    app_key: String,
    username: String,
    password: String,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        auth_url: impl Into<String>,
        app_key: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            store,
            auth_url: auth_url.into(),
            app_key: app_key.into(),
            username: username.into(),
            password: password.into(),
        })
    }

    /// Current session token. Reuses the cached session while it is
    /// fresh, otherwise performs a login.
    #[instrument(skip(self))]
    pub async fn token(&self) -> Result<String, SessionError> {
        if let Some(record) = self.cached().await? {
            if record.is_fresh(OffsetDateTime::now_utc()) {
                debug!("reusing cached session");
                return Ok(record.token);
            }
            debug!(expires_at = %record.expires_at, "cached session near expiry");
        }
        self.login().await
    }

    async fn cached(&self) -> Result<Option<SessionRecord>, SessionError> {
        let Some(raw) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Unreadable record forces a fresh login.
                warn!(error = %e, "discarding unreadable session record");
                self.store.delete(SESSION_KEY).await?;
                Ok(None)
            }
        }
    }

    /// Authenticate against the identity endpoint and cache the session.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<String, SessionError> {
        let response = self
            .client
            .post(&self.auth_url)
            .header("X-Application", &self.app_key)
            .header("Accept", "application/json")
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let body = response.text().await?;
        let login = parse_login(&body)?;
        let token = login.session_token.ok_or(SessionError::MissingToken)?;

        let expires_at = OffsetDateTime::now_utc() + SESSION_VALIDITY;
        let record = SessionRecord {
            token: token.clone(),
            expires_at,
        };
        let value = serde_json::to_string(&record)
            .map_err(|e| StoreError::Backend(format!("session serialization: {e}")))?;
        let ttl = std::time::Duration::from_secs(SESSION_VALIDITY.whole_seconds() as u64);
        self.store.set(SESSION_KEY, &value, ttl).await?;

        metrics::inc_exchange_logins();
        info!(expires_at = %expires_at, "exchange login succeeded");
        Ok(token)
    }

    /// Drop the cached session so the next call logs in again. Used when
    /// the exchange rejects a token before its expected expiry.
    pub async fn invalidate(&self) -> Result<(), SessionError> {
        self.store.delete(SESSION_KEY).await?;
        Ok(())
    }
}
