//! Prometheus metrics for the scan loop and upstream calls.
//!
//! This module provides metrics for:
//! - Scan cycle latency
//! - Odds feed fetch latency
//! - Exchange market lookup latency
//! - Lay order submission latency
//! - Detection, gating, and placement counters

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Scan cycle latency metric name.
pub const METRIC_SCAN_CYCLE_LATENCY: &str = "scan_cycle_latency_ms";
/// Odds feed fetch latency metric name.
pub const METRIC_ODDS_FETCH_LATENCY: &str = "odds_fetch_latency_ms";
/// Exchange market lookup latency metric name.
pub const METRIC_MARKET_LOOKUP_LATENCY: &str = "market_lookup_latency_ms";
/// Lay order submission latency metric name.
pub const METRIC_ORDER_SUBMIT_LATENCY: &str = "order_submit_latency_ms";
/// Scan cycles counter metric name.
pub const METRIC_SCAN_CYCLES: &str = "scan_cycles_total";
/// Feed events seen counter metric name.
pub const METRIC_EVENTS_SCANNED: &str = "events_scanned_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Opportunities approved counter metric name.
pub const METRIC_OPPORTUNITIES_APPROVED: &str = "opportunities_approved_total";
/// Opportunities rejected counter metric name.
pub const METRIC_OPPORTUNITIES_REJECTED: &str = "opportunities_rejected_total";
/// Lay orders placed counter metric name.
pub const METRIC_ORDERS_PLACED: &str = "lay_orders_placed_total";
/// Lay orders failed counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "lay_orders_failed_total";
/// Feed quota exhaustion counter metric name.
pub const METRIC_QUOTA_EXHAUSTIONS: &str = "odds_quota_exhaustions_total";
/// Exchange logins counter metric name.
pub const METRIC_EXCHANGE_LOGINS: &str = "exchange_logins_total";
/// Session retry counter metric name.
pub const METRIC_SESSION_RETRIES: &str = "session_retries_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_SCAN_CYCLE_LATENCY,
        "Full scan cycle latency in milliseconds"
    );
    describe_histogram!(
        METRIC_ODDS_FETCH_LATENCY,
        "Odds feed fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_MARKET_LOOKUP_LATENCY,
        "Exchange market lookup latency in milliseconds"
    );
    describe_histogram!(
        METRIC_ORDER_SUBMIT_LATENCY,
        "Lay order submission latency in milliseconds"
    );

    // Counters
    describe_counter!(METRIC_SCAN_CYCLES, "Total number of scan cycles completed");
    describe_counter!(METRIC_EVENTS_SCANNED, "Total number of feed events scanned");
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_APPROVED,
        "Total number of opportunities that passed the gate"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_REJECTED,
        "Total number of opportunities rejected by the gate"
    );
    describe_counter!(METRIC_ORDERS_PLACED, "Total number of lay orders placed");
    describe_counter!(
        METRIC_ORDERS_FAILED,
        "Total number of lay orders that failed"
    );
    describe_counter!(
        METRIC_QUOTA_EXHAUSTIONS,
        "Total number of odds feed quota exhaustions"
    );
    describe_counter!(
        METRIC_EXCHANGE_LOGINS,
        "Total number of exchange logins performed"
    );
    describe_counter!(
        METRIC_SESSION_RETRIES,
        "Total number of calls retried after session invalidation"
    );

    debug!("Metrics initialized");
}

/// Record odds feed fetch latency.
pub fn record_odds_fetch_latency(start: Instant, sport: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_ODDS_FETCH_LATENCY, "sport" => sport.to_string()).record(latency_ms);
}

/// Record exchange market lookup latency.
pub fn record_market_lookup_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_MARKET_LOOKUP_LATENCY).record(latency_ms);
}

/// Record lay order submission latency.
pub fn record_order_submit_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_ORDER_SUBMIT_LATENCY).record(latency_ms);
}

/// Increment scan cycle counter.
pub fn inc_scan_cycles() {
    counter!(METRIC_SCAN_CYCLES).increment(1);
}

/// Increment events scanned counter.
pub fn inc_events_scanned(count: u64) {
    counter!(METRIC_EVENTS_SCANNED).increment(count);
}

/// Increment opportunities detected counter.
pub fn inc_opportunities_detected() {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(1);
}

/// Increment opportunities approved counter.
pub fn inc_opportunities_approved() {
    counter!(METRIC_OPPORTUNITIES_APPROVED).increment(1);
}

/// Increment opportunities rejected counter, labeled with the gate
/// decision.
pub fn inc_opportunities_rejected(reason: &str) {
    counter!(METRIC_OPPORTUNITIES_REJECTED, "reason" => reason.to_string()).increment(1);
}

/// Increment lay orders placed counter.
pub fn inc_orders_placed() {
    counter!(METRIC_ORDERS_PLACED).increment(1);
}

/// Increment lay orders failed counter.
pub fn inc_orders_failed() {
    counter!(METRIC_ORDERS_FAILED).increment(1);
}

/// Increment feed quota exhaustion counter.
pub fn inc_quota_exhaustions() {
    counter!(METRIC_QUOTA_EXHAUSTIONS).increment(1);
}

/// Increment exchange logins counter.
pub fn inc_exchange_logins() {
    counter!(METRIC_EXCHANGE_LOGINS).increment(1);
}

/// Increment session retry counter.
pub fn inc_session_retries() {
    counter!(METRIC_SESSION_RETRIES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a full scan cycle.
pub fn timer_scan_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_SCAN_CYCLE_LATENCY)
}

/// Create a latency timer for a market lookup.
pub fn timer_market_lookup() -> LatencyTimer {
    LatencyTimer::new(METRIC_MARKET_LOOKUP_LATENCY)
}
