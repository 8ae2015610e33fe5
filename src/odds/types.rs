//! Wire types for the odds feed and the flattened quote view.

use rust_decimal::Decimal;
use serde::Deserialize;
use time::OffsetDateTime;
use url::Url;

/// Market key carrying head-to-head (moneyline) prices.
pub const H2H_MARKET: &str = "h2h";

/// One event from the feed with per-bookmaker prices.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub id: String,
    pub sport_key: String,
    pub sport_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub commence_time: OffsetDateTime,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub bookmakers: Vec<BookmakerOdds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmakerOdds {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub markets: Vec<MarketOdds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketOdds {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<OutcomeOdds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeOdds {
    pub name: String,
    pub price: Decimal,
}

/// One bookmaker price for one outcome, flattened out of the nested
/// event payload. Everything downstream works on quotes.
#[derive(Debug, Clone)]
pub struct Quote {
    pub event_id: String,
    pub event_name: String,
    pub sport_key: String,
    pub sport_title: String,
    pub start_time: OffsetDateTime,
    pub bookmaker_key: String,
    pub bookmaker_title: String,
    pub outcome: String,
    pub back_price: Decimal,
}

impl OddsEvent {
    /// Display name, home side first.
    pub fn event_name(&self) -> String {
        format!("{} v {}", self.home_team, self.away_team)
    }

    /// Flatten every h2h outcome across all bookmakers into quotes.
    /// Other market keys in the payload are ignored.
    pub fn quotes(&self) -> Vec<Quote> {
        let event_name = self.event_name();
        let mut quotes = Vec::new();

        for bookmaker in &self.bookmakers {
            for market in &bookmaker.markets {
                if market.key != H2H_MARKET {
                    continue;
                }
                for outcome in &market.outcomes {
                    quotes.push(Quote {
                        event_id: self.id.clone(),
                        event_name: event_name.clone(),
                        sport_key: self.sport_key.clone(),
                        sport_title: self.sport_title.clone(),
                        start_time: self.commence_time,
                        bookmaker_key: bookmaker.key.clone(),
                        bookmaker_title: bookmaker.title.clone(),
                        outcome: outcome.name.clone(),
                        back_price: outcome.price,
                    });
                }
            }
        }

        quotes
    }
}

/// Landing page for a feed bookmaker key, for the alert deep link.
/// Unknown keys get no link rather than a guessed one.
pub fn bookmaker_url(key: &str) -> Option<Url> {
    let site = match key {
        "betfair_sb_uk" => "https://www.betfair.com/sport",
        "betvictor" => "https://www.betvictor.com",
        "betway" => "https://betway.com/en/sports",
        "boylesports" => "https://www.boylesports.com",
        "casumo" => "https://www.casumo.com/sports",
        "coral" => "https://sports.coral.co.uk",
        "grosvenor" => "https://www.grosvenorcasinos.com/sports",
        "ladbrokes_uk" => "https://sports.ladbrokes.com",
        "leovegas" => "https://www.leovegas.com/en-gb/sports",
        "livescorebet" => "https://www.livescorebet.com/uk",
        "matchbook" => "https://www.matchbook.com",
        "mrgreen" => "https://www.mrgreen.com/sports",
        "paddypower" => "https://www.paddypower.com",
        "skybet" => "https://m.skybet.com",
        "unibet_uk" => "https://www.unibet.co.uk",
        "virginbet" => "https://www.virginbet.com",
        "williamhill" => "https://sports.williamhill.com/betting/en-gb",
        _ => return None,
    };
    Url::parse(site).ok()
}
