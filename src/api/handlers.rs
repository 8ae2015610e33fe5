//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

use crate::scanner::ScanStats;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the scan loop is up.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
    /// When the last scan cycle finished.
    pub last_scan: Arc<tokio::sync::RwLock<Option<OffsetDateTime>>>,
    /// Stats from the last scan cycle.
    pub stats: Arc<tokio::sync::RwLock<ScanStats>>,
    /// Prometheus render handle.
    pub prometheus: PrometheusHandle,
}

impl AppState {
    /// Create new app state.
    pub fn new(prometheus: PrometheusHandle) -> Self {
        Self {
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            last_scan: Arc::new(tokio::sync::RwLock::new(None)),
            stats: Arc::new(tokio::sync::RwLock::new(ScanStats::default())),
            prometheus,
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready
            .store(ready, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Publish the result of a finished scan cycle.
    pub async fn record_scan(&self, stats: ScanStats) {
        *self.last_scan.write().await = Some(OffsetDateTime::now_utc());
        *self.stats.write().await = stats;
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the scan loop is up.
    pub ready: bool,
    /// Last completed scan, if any.
    pub last_scan: Option<String>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Last completed scan, if any.
    pub last_scan: Option<String>,
    /// Stats from the last scan cycle.
    pub stats: ScanStats,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let last_scan = state.last_scan.read().await.as_ref().map(|t| t.to_string());

    let response = ReadyResponse {
        ready: is_ready,
        last_scan,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns scanner status and last-cycle statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let last_scan = state.last_scan.read().await.as_ref().map(|t| t.to_string());
    let stats = state.stats.read().await.clone();

    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        last_scan,
        stats,
    })
}

/// Prometheus scrape handler.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.prometheus.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn test_state() -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState::new(recorder.handle())
    }

    #[test]
    fn app_state_ready_toggle() {
        let state = test_state();
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn record_scan_updates_last_scan_and_stats() {
        let state = test_state();
        assert!(state.last_scan.read().await.is_none());

        let stats = ScanStats {
            events_scanned: 7,
            ..Default::default()
        };
        state.record_scan(stats).await;

        assert!(state.last_scan.read().await.is_some());
        assert_eq!(state.stats.read().await.events_scanned, 7);
    }
}
