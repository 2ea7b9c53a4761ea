//! American odds conversion.
//!
//! American odds quote the profit on a 100 stake for underdogs (`+150`) and
//! the stake needed to win 100 for favourites (`-110`). Both map to the
//! market-implied probability used as the baseline for edge.

use crate::error::{CalibrationError, Result};

/// Converts American odds to an implied probability.
///
/// ```text
/// odds >= 0:  100 / (odds + 100)
/// odds <  0:  |odds| / (|odds| + 100)
/// odds == 0:  0.5 (even-money fallback)
/// ```
///
/// # Errors
/// Returns `InvalidOdds` when the value is NaN or infinite.
///
/// # Examples
/// ```
/// use edgecal_core::odds::to_probability;
///
/// assert!((to_probability(100.0).unwrap() - 0.5).abs() < 1e-12);
/// assert!((to_probability(-100.0).unwrap() - 0.5).abs() < 1e-12);
/// ```
pub fn to_probability(american_odds: f64) -> Result<f64> {
    if !american_odds.is_finite() {
        return Err(CalibrationError::InvalidOdds(american_odds.to_string()));
    }

    if american_odds == 0.0 {
        return Ok(0.5);
    }

    if american_odds > 0.0 {
        Ok(100.0 / (american_odds + 100.0))
    } else {
        let magnitude = american_odds.abs();
        Ok(magnitude / (magnitude + 100.0))
    }
}

/// Parses a textual American odds quote such as `+150`, `-110` or `150`.
///
/// # Errors
/// Returns `InvalidOdds` for anything that is not a finite number.
pub fn parse_american(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let odds: f64 = unsigned
        .parse()
        .map_err(|_| CalibrationError::InvalidOdds(raw.to_string()))?;

    if !odds.is_finite() {
        return Err(CalibrationError::InvalidOdds(raw.to_string()));
    }
    Ok(odds)
}

/// Converts a probability back to American odds.
///
/// Favourites (p > 0.5) get negative odds, underdogs positive. Exactly 0.5
/// returns `+100`.
///
/// # Errors
/// Returns `InvalidOdds` when the probability is outside (0, 1).
pub fn to_american(probability: f64) -> Result<f64> {
    if !(probability > 0.0 && probability < 1.0) {
        return Err(CalibrationError::InvalidOdds(format!(
            "probability {probability} has no american quote"
        )));
    }

    if probability > 0.5 {
        Ok(-100.0 * probability / (1.0 - probability))
    } else {
        Ok(100.0 * (1.0 - probability) / probability)
    }
}

/// Net profit per unit staked on a winning bet at the given odds.
///
/// `+150` pays 1.5, `-200` pays 0.5, and 0 is treated as even money.
#[must_use]
pub fn payout_multiple(american_odds: f64) -> f64 {
    if american_odds == 0.0 || !american_odds.is_finite() {
        1.0
    } else if american_odds > 0.0 {
        american_odds / 100.0
    } else {
        100.0 / american_odds.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // to_probability Tests
    // ============================================

    #[test]
    fn plus_and_minus_100_are_even_money() {
        assert!((to_probability(100.0).unwrap() - 0.5).abs() < 1e-12);
        assert!((to_probability(-100.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_falls_back_to_even_money() {
        assert!((to_probability(0.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn favourite_and_underdog_probabilities() {
        // -110: 110 / 210
        assert!((to_probability(-110.0).unwrap() - 0.523_809_5).abs() < 1e-6);
        // +150: 100 / 250
        assert!((to_probability(150.0).unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn non_finite_odds_rejected() {
        assert!(matches!(
            to_probability(f64::NAN),
            Err(CalibrationError::InvalidOdds(_))
        ));
        assert!(to_probability(f64::INFINITY).is_err());
    }

    // ============================================
    // parse_american Tests
    // ============================================

    #[test]
    fn parses_signed_quotes() {
        assert!((parse_american("+150").unwrap() - 150.0).abs() < f64::EPSILON);
        assert!((parse_american("-110").unwrap() + 110.0).abs() < f64::EPSILON);
        assert!((parse_american(" 200 ").unwrap() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_quote_is_invalid_odds() {
        let err = parse_american("pick'em").unwrap_err();
        assert!(matches!(err, CalibrationError::InvalidOdds(ref s) if s == "pick'em"));
        assert!(parse_american("inf").is_err());
    }

    // ============================================
    // Inverse and payout Tests
    // ============================================

    #[test]
    fn to_american_inverts_to_probability() {
        for odds in [-250.0, -110.0, 120.0, 300.0] {
            let p = to_probability(odds).unwrap();
            let back = to_american(p).unwrap();
            assert!((back - odds).abs() < 1e-9, "{odds} -> {p} -> {back}");
        }
        assert!(to_american(1.0).is_err());
    }

    #[test]
    fn payout_multiple_by_side() {
        assert!((payout_multiple(150.0) - 1.5).abs() < 1e-12);
        assert!((payout_multiple(-200.0) - 0.5).abs() < 1e-12);
        assert!((payout_multiple(0.0) - 1.0).abs() < 1e-12);
    }
}
