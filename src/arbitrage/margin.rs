//! Pure back/lay margin and stake arithmetic.

use rand::Rng;
use rust_decimal::Decimal;

use crate::error::MarginError;

/// Fractional profit margin of backing at `back` and laying at `lay`.
///
/// `(back - lay) / lay`; zero when the lay price is not positive. A
/// result at or below zero means no arbitrage.
pub fn profit_margin(back: Decimal, lay: Decimal) -> Decimal {
    if lay > Decimal::ZERO {
        (back - lay) / lay
    } else {
        Decimal::ZERO
    }
}

/// Exchange-side loss exposure when laying `stake` at `lay`.
pub fn liability(stake: Decimal, lay: Decimal) -> Decimal {
    stake * (lay - Decimal::ONE)
}

/// Lay stake that produces `liability` at price `lay`.
///
/// Undefined at lay prices of 1.0 or below, where the denominator
/// vanishes or flips sign.
pub fn lay_stake(liability: Decimal, lay: Decimal) -> Result<Decimal, MarginError> {
    if lay <= Decimal::ONE {
        return Err(MarginError::LayPriceTooLow(lay));
    }
    Ok(liability / (lay - Decimal::ONE))
}

/// Combined implied probability `1/back + 1/lay`.
///
/// Below 1.0 the pair is a risk-free arbitrage. Prices must be
/// positive; non-positive inputs yield zero rather than dividing.
pub fn implied_probability(back: Decimal, lay: Decimal) -> Decimal {
    if back <= Decimal::ZERO || lay <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    Decimal::ONE / back + Decimal::ONE / lay
}

fn is_round(stake: u32) -> bool {
    stake % 50 == 0 || stake % 100 == 0
}

/// Uniformly sampled stake in `[min, max]` avoiding round numbers.
///
/// Round stakes (multiples of 50 or 100) are resampled away because
/// they pattern-match bookmaker bot-detection heuristics. Fails when
/// the range contains no qualifying integer, which can only happen for
/// an empty range or a single disqualified value.
pub fn grey_man_stake(min: u32, max: u32) -> Result<u32, MarginError> {
    if min > max || (min == max && is_round(min)) {
        return Err(MarginError::EmptyStakeRange { min, max });
    }

    let mut rng = rand::thread_rng();
    loop {
        let stake = rng.gen_range(min..=max);
        if !is_round(stake) {
            return Ok(stake);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn margin_positive_when_back_above_lay() {
        let margin = profit_margin(dec!(2.50), dec!(2.30));
        assert_eq!(margin.round_dp(4), dec!(0.0870));
    }

    #[test]
    fn margin_not_positive_when_back_at_or_below_lay() {
        assert_eq!(profit_margin(dec!(2.30), dec!(2.30)), Decimal::ZERO);
        assert!(profit_margin(dec!(2.10), dec!(2.30)) < Decimal::ZERO);
    }

    #[test]
    fn margin_zero_for_non_positive_lay() {
        assert_eq!(profit_margin(dec!(2.50), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(profit_margin(dec!(2.50), dec!(-1)), Decimal::ZERO);
    }

    #[test]
    fn liability_scales_with_lay_price() {
        assert_eq!(liability(dec!(100), dec!(3.0)), dec!(200.0));
        assert_eq!(liability(dec!(50), dec!(1.5)), dec!(25.0));
    }

    #[test]
    fn lay_stake_inverts_liability() {
        let stake = dec!(137.5);
        let lay = dec!(2.4);
        let exposure = liability(stake, lay);
        assert_eq!(lay_stake(exposure, lay).unwrap(), stake);
    }

    #[test]
    fn lay_stake_rejects_prices_at_or_below_one() {
        assert_eq!(
            lay_stake(dec!(100), dec!(1.0)),
            Err(MarginError::LayPriceTooLow(dec!(1.0)))
        );
        assert_eq!(
            lay_stake(dec!(100), dec!(0.8)),
            Err(MarginError::LayPriceTooLow(dec!(0.8)))
        );
    }

    #[test]
    fn implied_probability_sums_inverse_prices() {
        let implied = implied_probability(dec!(2.10), dec!(2.05));
        assert_eq!(implied.round_dp(4), dec!(0.9640));
        assert!(implied < Decimal::ONE);
    }

    #[test]
    fn implied_probability_guards_zero_prices() {
        assert_eq!(implied_probability(Decimal::ZERO, dec!(2.0)), Decimal::ZERO);
    }

    #[test]
    fn grey_man_stake_stays_in_range_and_off_round_numbers() {
        for _ in 0..200 {
            let stake = grey_man_stake(280, 420).unwrap();
            assert!((280..=420).contains(&stake));
            assert_ne!(stake % 50, 0);
            assert_ne!(stake % 100, 0);
        }
    }

    #[test]
    fn grey_man_stake_accepts_single_qualifying_value() {
        assert_eq!(grey_man_stake(281, 281).unwrap(), 281);
    }

    #[test]
    fn grey_man_stake_rejects_degenerate_ranges() {
        assert_eq!(
            grey_man_stake(300, 300),
            Err(MarginError::EmptyStakeRange { min: 300, max: 300 })
        );
        assert_eq!(
            grey_man_stake(420, 280),
            Err(MarginError::EmptyStakeRange { min: 420, max: 280 })
        );
    }
}
