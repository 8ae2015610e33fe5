//! Scan loop: odds feed in, gated opportunities out.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::arbitrage::{
    detect_best_back, detect_per_outcome, grey_man_stake, Opportunity, OpportunityGate,
};
use crate::config::{Config, DetectionStrategy};
use crate::error::{OddsError, Result};
use crate::exchange::{ExchangeGateway, PlacementOutcome};
use crate::metrics;
use crate::notify::Notifier;
use crate::odds::{OddsClient, OddsEvent};

/// Counters for one scan cycle, surfaced on the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub sports_scanned: usize,
    pub events_scanned: usize,
    pub markets_matched: usize,
    pub opportunities_detected: usize,
    pub opportunities_approved: usize,
    pub opportunities_rejected: usize,
    pub orders_placed: usize,
    pub errors: usize,
    pub quota_exhausted: bool,
}

/// Drives one full pass over the configured sports: fetch quotes, find
/// the exchange market per event, detect, gate, notify, and optionally
/// place the covering lay order.
pub struct Scanner {
    config: Arc<Config>,
    odds: OddsClient,
    gateway: ExchangeGateway,
    gate: OpportunityGate,
    notifier: Arc<dyn Notifier>,
}

impl Scanner {
    pub fn new(
        config: Arc<Config>,
        odds: OddsClient,
        gateway: ExchangeGateway,
        gate: OpportunityGate,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            odds,
            gateway,
            gate,
            notifier,
        }
    }

    /// Run one cycle over every configured sport.
    ///
    /// Failures are contained at the smallest useful scope: a broken
    /// event skips that event, a broken sport fetch skips that sport.
    /// The exception is feed quota exhaustion, which abandons the whole
    /// cycle since every further fetch would burn the same answer.
    #[instrument(skip(self))]
    pub async fn scan_cycle(&self) -> ScanStats {
        let _timer = metrics::timer_scan_cycle();
        let mut stats = ScanStats::default();

        for sport in self.config.sport_keys() {
            let start = Instant::now();
            let events = match self.odds.fetch_odds(&sport).await {
                Ok(events) => {
                    metrics::record_odds_fetch_latency(start, &sport);
                    events
                }
                Err(OddsError::QuotaExceeded { message }) => {
                    warn!(sport = %sport, %message, "feed quota exhausted, abandoning cycle");
                    metrics::inc_quota_exhaustions();
                    stats.quota_exhausted = true;
                    break;
                }
                Err(e) => {
                    warn!(sport = %sport, error = %e, "odds fetch failed");
                    stats.errors += 1;
                    continue;
                }
            };

            stats.sports_scanned += 1;
            metrics::inc_events_scanned(events.len() as u64);

            for event in &events {
                stats.events_scanned += 1;
                if let Err(e) = self.scan_event(&sport, event, &mut stats).await {
                    warn!(event = %event.event_name(), error = %e, "event scan failed");
                    stats.errors += 1;
                }
            }
        }

        metrics::inc_scan_cycles();
        info!(
            sports = stats.sports_scanned,
            events = stats.events_scanned,
            detected = stats.opportunities_detected,
            approved = stats.opportunities_approved,
            errors = stats.errors,
            "scan cycle finished"
        );
        stats
    }

    async fn scan_event(
        &self,
        sport: &str,
        event: &OddsEvent,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let quotes = event.quotes();
        if quotes.is_empty() {
            debug!(event = %event.event_name(), "no bookmaker quotes");
            return Ok(());
        }

        let market = {
            let _timer = metrics::timer_market_lookup();
            self.gateway.find_market(sport, &event.event_name()).await?
        };
        let Some(market) = market else {
            debug!(event = %event.event_name(), "no exchange market");
            return Ok(());
        };
        stats.markets_matched += 1;

        let opportunities = match self.config.detection {
            DetectionStrategy::PerOutcome => detect_per_outcome(&quotes, &market),
            DetectionStrategy::BestBack => {
                let mut found = Vec::new();
                for outcome in [event.home_team.as_str(), event.away_team.as_str()] {
                    if let Some(opp) = detect_best_back(&quotes, &market, outcome) {
                        found.push(opp);
                    }
                }
                found
            }
        };

        for mut opportunity in opportunities {
            stats.opportunities_detected += 1;
            metrics::inc_opportunities_detected();

            let stake = grey_man_stake(self.config.stake_min, self.config.stake_max)?;
            opportunity.set_stake(Decimal::from(stake));

            let decision = self.gate.evaluate(&opportunity).await?;
            if !decision.is_approved() {
                debug!(id = %opportunity.id, decision = %decision, "gate rejected opportunity");
                stats.opportunities_rejected += 1;
                metrics::inc_opportunities_rejected(&decision.to_string());
                continue;
            }

            stats.opportunities_approved += 1;
            metrics::inc_opportunities_approved();

            if let Err(e) = self.notifier.notify(&opportunity, "detected").await {
                warn!(id = %opportunity.id, error = %e, "notification failed");
            }

            if self.config.auto_bet {
                self.place_hedge(&opportunity, stats).await;
            }
        }

        Ok(())
    }

    /// Lay the opportunity's selection, sized so the liability matches
    /// the configured target. A failed placement is escalated through
    /// the notifier so the bet can be covered by hand.
    async fn place_hedge(&self, opportunity: &Opportunity, stats: &mut ScanStats) {
        let start = Instant::now();
        let outcome = self
            .gateway
            .place_lay_order(
                &opportunity.market_id,
                opportunity.selection_id,
                opportunity.lay_price,
                self.config.target_liability,
            )
            .await;
        metrics::record_order_submit_latency(start);

        match outcome {
            PlacementOutcome::Placed {
                bet_id,
                size_matched,
                ..
            } => {
                stats.orders_placed += 1;
                metrics::inc_orders_placed();
                info!(
                    id = %opportunity.id,
                    bet_id = bet_id.as_deref().unwrap_or("-"),
                    size_matched = %size_matched,
                    "lay order placed"
                );
            }
            PlacementOutcome::Failed { reason } => {
                metrics::inc_orders_failed();
                warn!(id = %opportunity.id, reason = %reason, "lay order failed");
                if let Err(e) = self
                    .notifier
                    .notify(opportunity, "manual action required")
                    .await
                {
                    warn!(id = %opportunity.id, error = %e, "notification failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::SessionManager;
    use crate::notify::LogNotifier;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> Config {
        Config {
            odds_api_key: "odds-key".to_string(),
            odds_api_url: server.uri(),
            odds_regions: "uk".to_string(),
            exchange_app_key: "app-key".to_string(),
            exchange_username: "alice".to_string(),
            exchange_password: "secret".to_string(),
            exchange_auth_url: format!("{}/api/login", server.uri()),
            exchange_api_url: format!("{}/betting", server.uri()),
            exchange_account_url: format!("{}/account", server.uri()),
            detection: DetectionStrategy::BestBack,
            min_profit_margin: dec!(0.02),
            stake_min: 280,
            stake_max: 420,
            sports: "soccer_epl".to_string(),
            scan_interval_secs: 300,
            auto_bet: false,
            target_liability: dec!(100),
            port: 0,
            rust_log: "info".to_string(),
            verbose: false,
        }
    }

    fn scanner(config: Config) -> Scanner {
        let config = Arc::new(config);
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(
            SessionManager::new(
                store.clone(),
                config.exchange_auth_url.clone(),
                config.exchange_app_key.clone(),
                config.exchange_username.clone(),
                config.exchange_password.clone(),
            )
            .unwrap(),
        );
        let gateway = ExchangeGateway::new(
            session,
            config.exchange_api_url.clone(),
            config.exchange_account_url.clone(),
            config.exchange_app_key.clone(),
        )
        .unwrap();
        let odds = OddsClient::new(config.odds_api_key.clone(), config.odds_regions.clone())
            .unwrap()
            .with_base_url(config.odds_api_url.clone());
        let gate = OpportunityGate::new(store, config.min_profit_margin);

        Scanner::new(config, odds, gateway, gate, Arc::new(LogNotifier))
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sessionToken": "tok-1",
                "loginStatus": "SUCCESS"
            })))
            .mount(server)
            .await;
    }

    fn odds_body() -> serde_json::Value {
        json!([{
            "id": "ev1",
            "sport_key": "soccer_epl",
            "sport_title": "EPL",
            "commence_time": "2026-09-01T15:00:00Z",
            "home_team": "Arsenal",
            "away_team": "Chelsea",
            "bookmakers": [{
                "key": "williamhill",
                "title": "William Hill",
                "markets": [{
                    "key": "h2h",
                    "outcomes": [
                        {"name": "Arsenal", "price": 2.50},
                        {"name": "Chelsea", "price": 2.90},
                        {"name": "Draw", "price": 3.40}
                    ]
                }]
            }]
        }])
    }

    #[tokio::test]
    async fn full_cycle_detects_gates_and_counts() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(odds_body()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/betting/listMarketCatalogue/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "marketId": "1.234",
                "marketName": "Match Odds",
                "runners": [
                    {"selectionId": 11, "runnerName": "Arsenal"},
                    {"selectionId": 22, "runnerName": "Chelsea"}
                ]
            }])))
            .mount(&server)
            .await;

        // Deep lay book so any stake in range is covered.
        Mock::given(method("POST"))
            .and(path("/betting/listMarketBook/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "marketId": "1.234",
                "status": "OPEN",
                "runners": [{
                    "selectionId": 11,
                    "status": "ACTIVE",
                    "ex": {
                        "availableToBack": [{"price": 2.28, "size": 100.0}],
                        "availableToLay": [{"price": 2.30, "size": 3000.0}]
                    }
                }]
            }])))
            .mount(&server)
            .await;

        let stats = scanner(test_config(&server)).scan_cycle().await;

        assert_eq!(stats.sports_scanned, 1);
        assert_eq!(stats.events_scanned, 1);
        assert_eq!(stats.markets_matched, 1);
        // Home side arbs (2.50 back over 2.30 lay); away side has no
        // lay book and is not detected.
        assert_eq!(stats.opportunities_detected, 1);
        assert_eq!(stats.opportunities_approved, 1);
        assert_eq!(stats.opportunities_rejected, 0);
        assert_eq!(stats.orders_placed, 0);
        assert!(!stats.quota_exhausted);
    }

    #[tokio::test]
    async fn second_cycle_is_deduplicated_by_the_gate() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(odds_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/betting/listMarketCatalogue/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "marketId": "1.234",
                "marketName": "Match Odds",
                "runners": [{"selectionId": 11, "runnerName": "Arsenal"}]
            }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/betting/listMarketBook/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "marketId": "1.234",
                "runners": [{
                    "selectionId": 11,
                    "ex": {
                        "availableToBack": [],
                        "availableToLay": [{"price": 2.30, "size": 3000.0}]
                    }
                }]
            }])))
            .mount(&server)
            .await;

        let scanner = scanner(test_config(&server));

        let first = scanner.scan_cycle().await;
        assert_eq!(first.opportunities_approved, 1);

        let second = scanner.scan_cycle().await;
        assert_eq!(second.opportunities_detected, 1);
        assert_eq!(second.opportunities_approved, 0);
        assert_eq!(second.opportunities_rejected, 1);
    }

    #[tokio::test]
    async fn quota_exhaustion_abandons_the_cycle() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        let mut config = test_config(&server);
        config.sports = "soccer_epl,basketball_nba".to_string();

        Mock::given(method("GET"))
            .and(path("/sports/soccer_epl/odds"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"message": "Too many requests"})),
            )
            .mount(&server)
            .await;

        // The second sport must never be fetched.
        Mock::given(method("GET"))
            .and(path("/sports/basketball_nba/odds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let stats = scanner(config).scan_cycle().await;

        assert!(stats.quota_exhausted);
        assert_eq!(stats.sports_scanned, 0);
        assert_eq!(stats.events_scanned, 0);
    }
}
