//! Pre-notification gate: dedup, margin floor, liquidity cover.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::store::KeyValueStore;

use super::detector::Opportunity;

/// How long a processed marker lingers before the same opportunity may
/// alert again.
pub const PROCESSED_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Outcome of a gate evaluation. Rejections carry the reason so the
/// scanner can log why nothing was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum GateDecision {
    Approved,
    AlreadyProcessed,
    MarginBelowThreshold,
    InsufficientLiquidity,
}

impl GateDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, GateDecision::Approved)
    }
}

/// Marker stored against a processed opportunity id.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessedMarker {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub processed_at: OffsetDateTime,
}

fn processed_key(id: &str) -> String {
    format!("processed:{id}")
}

/// Filters detected opportunities before they reach notification or
/// order placement.
pub struct OpportunityGate {
    store: Arc<dyn KeyValueStore>,
    min_profit_margin: Decimal,
}

impl OpportunityGate {
    pub fn new(store: Arc<dyn KeyValueStore>, min_profit_margin: Decimal) -> Self {
        Self {
            store,
            min_profit_margin,
        }
    }

    /// Run an opportunity through the gate checks in order: already
    /// processed, margin floor, lay liquidity cover. Approval writes the
    /// processed marker before returning.
    ///
    /// The processed check and the marker write are two store calls, not
    /// one atomic operation. A second scanner racing the same id between
    /// them would alert twice; the bot runs a single scan loop so the
    /// window never has a competitor.
    #[instrument(skip(self, opportunity), fields(id = %opportunity.id))]
    pub async fn evaluate(&self, opportunity: &Opportunity) -> Result<GateDecision, StoreError> {
        let key = processed_key(&opportunity.id);

        if self.store.get(&key).await?.is_some() {
            debug!("opportunity already processed");
            return Ok(GateDecision::AlreadyProcessed);
        }

        if opportunity.profit_margin < self.min_profit_margin {
            debug!(
                margin = %opportunity.profit_margin,
                threshold = %self.min_profit_margin,
                "margin below threshold"
            );
            return Ok(GateDecision::MarginBelowThreshold);
        }

        let required = opportunity.required_liquidity();
        if required > opportunity.lay_liquidity {
            debug!(
                required = %required,
                available = %opportunity.lay_liquidity,
                "insufficient lay liquidity"
            );
            return Ok(GateDecision::InsufficientLiquidity);
        }

        let marker = ProcessedMarker {
            id: opportunity.id.clone(),
            processed_at: OffsetDateTime::now_utc(),
        };
        let value = serde_json::to_string(&marker)
            .map_err(|e| StoreError::Backend(format!("marker serialization: {e}")))?;
        self.store.set(&key, &value, PROCESSED_TTL).await?;

        Ok(GateDecision::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    fn opportunity(margin: Decimal, stake: Option<Decimal>, liquidity: Decimal) -> Opportunity {
        Opportunity {
            id: "ev1_arsenal".to_string(),
            event_id: "ev1".to_string(),
            event_name: "Arsenal v Chelsea".to_string(),
            sport_key: "soccer_epl".to_string(),
            sport_title: "EPL".to_string(),
            start_time: datetime!(2026-09-01 15:00 UTC),
            outcome: "Arsenal".to_string(),
            bookmaker: "betuk".to_string(),
            back_price: dec!(2.50),
            bookmaker_url: None,
            suggested_stake: stake,
            market_id: "1.234".to_string(),
            selection_id: 11,
            lay_price: dec!(2.30),
            lay_liquidity: liquidity,
            profit_margin: margin,
            detected_at: OffsetDateTime::now_utc(),
        }
    }

    fn gate(store: Arc<MemoryStore>) -> OpportunityGate {
        OpportunityGate::new(store, dec!(0.02))
    }

    #[tokio::test]
    async fn approves_then_dedups_second_pass() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store.clone());
        let opp = opportunity(dec!(0.03), Some(dec!(300)), dec!(900));

        assert_eq!(gate.evaluate(&opp).await.unwrap(), GateDecision::Approved);
        assert_eq!(
            gate.evaluate(&opp).await.unwrap(),
            GateDecision::AlreadyProcessed
        );
    }

    #[tokio::test]
    async fn margin_at_threshold_passes() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store);
        let opp = opportunity(dec!(0.02), Some(dec!(300)), dec!(900));

        assert_eq!(gate.evaluate(&opp).await.unwrap(), GateDecision::Approved);
    }

    #[tokio::test]
    async fn rejection_leaves_no_processed_marker() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store.clone());
        let opp = opportunity(dec!(0.01), Some(dec!(300)), dec!(900));

        assert_eq!(
            gate.evaluate(&opp).await.unwrap(),
            GateDecision::MarginBelowThreshold
        );
        assert!(store.is_empty());

        // Not marked processed, so a later price improvement can pass.
        let better = opportunity(dec!(0.04), Some(dec!(300)), dec!(900));
        assert_eq!(gate.evaluate(&better).await.unwrap(), GateDecision::Approved);
    }

    #[tokio::test]
    async fn rejects_when_required_liquidity_exceeds_available() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store);
        // 400 * 2.50 = 1000 required against 900 available.
        let opp = opportunity(dec!(0.03), Some(dec!(400)), dec!(900));

        assert_eq!(
            gate.evaluate(&opp).await.unwrap(),
            GateDecision::InsufficientLiquidity
        );
    }

    #[tokio::test]
    async fn exact_liquidity_cover_passes() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store);
        // 360 * 2.50 = 900, exactly the available size.
        let opp = opportunity(dec!(0.03), Some(dec!(360)), dec!(900));

        assert_eq!(gate.evaluate(&opp).await.unwrap(), GateDecision::Approved);
    }
}
