//! Opportunity detection between bookmaker quotes and an exchange market.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::OffsetDateTime;
use tracing::debug;

use crate::exchange::{ExchangeMarket, PriceLevel};
use crate::odds::{bookmaker_url, Quote};

use super::margin::{implied_probability, profit_margin};
use super::matcher::{match_runner, normalize_name};

/// Implied-probability ceiling for the best-back strategy.
pub const MAX_IMPLIED_PROBABILITY: Decimal = dec!(0.98);

/// Minimum size available at the best lay price, in currency units.
pub const MIN_LAY_LIQUIDITY: Decimal = dec!(20);

/// A detected back/lay arbitrage candidate.
///
/// `id` is a pure function of the event and the target outcome, so the
/// same arbitrage re-detected on a later poll collides in the dedup
/// gate. The bookmaker is payload, not identity: the best-back strategy
/// may surface the same arbitrage through a different bookmaker as
/// prices move.
#[derive(Debug, Clone)]
pub struct Opportunity {
    /// Stable identifier, `{event_id}_{normalized outcome}`.
    pub id: String,
    /// Feed event identifier.
    pub event_id: String,
    /// Event display name.
    pub event_name: String,
    /// Feed sport key, e.g. "soccer_epl".
    pub sport_key: String,
    /// Sport display title.
    pub sport_title: String,
    /// Event start time.
    pub start_time: OffsetDateTime,
    /// Outcome being backed.
    pub outcome: String,
    /// Bookmaker display name.
    pub bookmaker: String,
    /// Decimal back price at the bookmaker.
    pub back_price: Decimal,
    /// Deep link to the bookmaker, when one is known.
    pub bookmaker_url: Option<String>,
    /// Suggested stake, assigned after construction.
    pub suggested_stake: Option<Decimal>,
    /// Exchange market identifier.
    pub market_id: String,
    /// Exchange selection identifier.
    pub selection_id: u64,
    /// Best available lay price on the exchange.
    pub lay_price: Decimal,
    /// Size available at the best lay price.
    pub lay_liquidity: Decimal,
    /// Fractional profit margin, e.g. 0.04 for 4%.
    pub profit_margin: Decimal,
    /// When the opportunity was detected.
    pub detected_at: OffsetDateTime,
}

impl Opportunity {
    /// Deduplication identifier for an event/outcome pair.
    pub fn build_id(event_id: &str, outcome: &str) -> String {
        format!("{}_{}", event_id, normalize_name(outcome))
    }

    /// Assign the suggested stake. Never set at construction time and
    /// excluded from the deduplication identity.
    pub fn set_stake(&mut self, stake: Decimal) {
        self.suggested_stake = Some(stake);
    }

    /// Lay-side cover needed for the suggested stake.
    pub fn required_liquidity(&self) -> Decimal {
        self.suggested_stake.unwrap_or(Decimal::ZERO) * self.back_price
    }
}

fn build_opportunity(
    quote: &Quote,
    market: &ExchangeMarket,
    selection_id: u64,
    lay: &PriceLevel,
    profit_margin: Decimal,
) -> Opportunity {
    Opportunity {
        id: Opportunity::build_id(&quote.event_id, &quote.outcome),
        event_id: quote.event_id.clone(),
        event_name: quote.event_name.clone(),
        sport_key: quote.sport_key.clone(),
        sport_title: quote.sport_title.clone(),
        start_time: quote.start_time,
        outcome: quote.outcome.clone(),
        bookmaker: quote.bookmaker_title.clone(),
        back_price: quote.back_price,
        bookmaker_url: bookmaker_url(&quote.bookmaker_key).map(|u| u.to_string()),
        suggested_stake: None,
        market_id: market.market_id.clone(),
        selection_id,
        lay_price: lay.price,
        lay_liquidity: lay.size,
        profit_margin,
        detected_at: OffsetDateTime::now_utc(),
    }
}

/// Match every quote against the runner list and keep the pairs with a
/// strictly positive back-over-lay margin.
///
/// Unmatched outcomes and empty lay books are skipped silently; the
/// rest of the batch keeps scanning.
pub fn detect_per_outcome(quotes: &[Quote], market: &ExchangeMarket) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();

    for quote in quotes {
        let Some(runner) = match_runner(&quote.outcome, &market.runners) else {
            debug!(outcome = %quote.outcome, market = %market.market_id, "no runner match");
            continue;
        };

        let Some(lay) = runner.best_lay() else {
            debug!(runner = %runner.name, "empty lay book");
            continue;
        };

        let margin = profit_margin(quote.back_price, lay.price);
        if margin <= Decimal::ZERO {
            continue;
        }

        opportunities.push(build_opportunity(
            quote,
            market,
            runner.selection_id,
            lay,
            margin,
        ));
    }

    opportunities
}

/// Compare bookmaker back prices for one outcome against the best
/// exchange lay price.
///
/// Returns the first quote in iteration order that clears every check:
/// back above lay, combined implied probability under
/// [`MAX_IMPLIED_PROBABILITY`], and more than [`MIN_LAY_LIQUIDITY`]
/// available at the best lay. First acceptable wins, not best across
/// bookmakers; the running best price only feeds diagnostics.
pub fn detect_best_back(
    quotes: &[Quote],
    market: &ExchangeMarket,
    outcome: &str,
) -> Option<Opportunity> {
    let runner = match_runner(outcome, &market.runners)?;
    let lay = runner.best_lay()?;

    let sought = normalize_name(outcome);
    let mut best_back: Option<&Quote> = None;

    for quote in quotes {
        if normalize_name(&quote.outcome) != sought {
            continue;
        }

        // Highest back price wins; earlier bookmakers keep ties.
        if best_back.map_or(true, |best| quote.back_price > best.back_price) {
            best_back = Some(quote);
        }

        let implied = implied_probability(quote.back_price, lay.price);
        if quote.back_price > lay.price
            && implied < MAX_IMPLIED_PROBABILITY
            && lay.size > MIN_LAY_LIQUIDITY
        {
            let margin = Decimal::ONE / implied - Decimal::ONE;
            return Some(build_opportunity(
                quote,
                market,
                runner.selection_id,
                lay,
                margin,
            ));
        }
    }

    if let Some(best) = best_back {
        debug!(
            outcome = %outcome,
            best_back = %best.back_price,
            bookmaker = %best.bookmaker_title,
            lay = %lay.price,
            lay_size = %lay.size,
            "no qualifying back price"
        );
    }

    None
}
