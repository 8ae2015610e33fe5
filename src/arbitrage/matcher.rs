//! Matching bookmaker outcome names to exchange runners.
//!
//! The two feeds label the same team differently ("Lakers" vs
//! "Los Angeles Lakers"), so matching is by normalized equality or
//! substring containment in either direction. First match wins; no
//! fuzzy distance, no confidence score.

use crate::exchange::ExchangeRunner;

/// Normalize a name for comparison: trim and case-fold.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Find the first runner whose name matches the bookmaker outcome.
///
/// Candidate order decides ties; ambiguous partial matches ("United")
/// are accepted at face value. `None` is the expected result for
/// unmatched outcomes, not an error.
pub fn match_runner<'a>(
    outcome: &str,
    candidates: &'a [ExchangeRunner],
) -> Option<&'a ExchangeRunner> {
    let sought = normalize_name(outcome);
    if sought.is_empty() {
        return None;
    }

    candidates.iter().find(|runner| {
        let name = normalize_name(&runner.name);
        if name.is_empty() {
            return false;
        }
        name.contains(&sought) || sought.contains(&name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(selection_id: u64, name: &str) -> ExchangeRunner {
        ExchangeRunner {
            selection_id,
            name: name.to_string(),
            back_prices: vec![],
            lay_prices: vec![],
        }
    }

    #[test]
    fn exact_name_matches() {
        let runners = vec![runner(1, "Arsenal"), runner(2, "Chelsea")];
        let found = match_runner("Chelsea", &runners).unwrap();
        assert_eq!(found.selection_id, 2);
    }

    #[test]
    fn bookmaker_name_contained_in_runner_name() {
        let runners = vec![runner(1, "Los Angeles Lakers")];
        let found = match_runner("Lakers", &runners).unwrap();
        assert_eq!(found.selection_id, 1);
    }

    #[test]
    fn runner_name_contained_in_bookmaker_name() {
        let runners = vec![runner(1, "Lakers")];
        let found = match_runner("Los Angeles Lakers", &runners).unwrap();
        assert_eq!(found.selection_id, 1);
    }

    #[test]
    fn typo_does_not_match() {
        let runners = vec![runner(1, "Celtics")];
        assert!(match_runner("Celtis", &runners).is_none());
    }

    #[test]
    fn matching_ignores_case_and_whitespace() {
        let runners = vec![runner(1, "  Manchester City  ")];
        let found = match_runner("manchester city", &runners).unwrap();
        assert_eq!(found.selection_id, 1);
    }

    #[test]
    fn first_matching_candidate_wins() {
        let runners = vec![
            runner(1, "Manchester United"),
            runner(2, "Newcastle United"),
        ];
        let found = match_runner("United", &runners).unwrap();
        assert_eq!(found.selection_id, 1);
    }

    #[test]
    fn empty_inputs_never_match() {
        let runners = vec![runner(1, ""), runner(2, "Arsenal")];
        assert!(match_runner("", &runners).is_none());

        let found = match_runner("Arsenal", &runners).unwrap();
        assert_eq!(found.selection_id, 2);
    }
}
