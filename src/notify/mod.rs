//! Opportunity notification.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::arbitrage::{liability, Opportunity};
use crate::error::Result;

/// Sink for approved opportunities. `status` is a free-text label for
/// the stage being reported ("detected", "manual action required").
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, opportunity: &Opportunity, status: &str) -> Result<()>;
}

/// Writes the full alert to the log. The default sink, and the only
/// one the bot ships with.
pub struct LogNotifier;

/// Lay-side hedge for the suggested back stake: the lay stake that
/// equalizes payout across outcomes, and the liability it creates.
fn hedge_numbers(opportunity: &Opportunity) -> (Decimal, Decimal) {
    let stake = opportunity.suggested_stake.unwrap_or(Decimal::ZERO);
    let hedge_stake = if opportunity.lay_price > Decimal::ONE {
        (stake * opportunity.back_price / opportunity.lay_price).round_dp(2)
    } else {
        Decimal::ZERO
    };
    let hedge_liability = liability(hedge_stake, opportunity.lay_price).round_dp(2);
    (hedge_stake, hedge_liability)
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, opportunity: &Opportunity, status: &str) -> Result<()> {
        let (hedge_stake, hedge_liability) = hedge_numbers(opportunity);
        let margin_pct = (opportunity.profit_margin * Decimal::ONE_HUNDRED).round_dp(2);
        let stake = opportunity.suggested_stake.unwrap_or(Decimal::ZERO);

        info!(
            status = %status,
            id = %opportunity.id,
            event = %opportunity.event_name,
            sport = %opportunity.sport_title,
            start = %opportunity.start_time,
            outcome = %opportunity.outcome,
            bookmaker = %opportunity.bookmaker,
            back_price = %opportunity.back_price,
            back_stake = %stake,
            bookmaker_url = opportunity.bookmaker_url.as_deref().unwrap_or("-"),
            market_id = %opportunity.market_id,
            selection_id = opportunity.selection_id,
            lay_price = %opportunity.lay_price,
            lay_liquidity = %opportunity.lay_liquidity,
            hedge_stake = %hedge_stake,
            hedge_liability = %hedge_liability,
            margin_pct = %margin_pct,
            "arbitrage opportunity"
        );

        Ok(())
    }
}
