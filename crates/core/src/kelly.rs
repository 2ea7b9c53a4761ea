//! Kelly staking policy for graded bets.
//!
//! The policy is both an input to backtest grading (when stakes are resized)
//! and part of the published calibration pack, so downstream sizing uses the
//! same fraction and caps the backtest was evaluated with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the Kelly fraction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KellyMethod {
    /// Full Kelly scaled by `fraction`.
    Fractional,
    /// Full Kelly, `fraction` ignored.
    Full,
}

/// Kelly staking policy.
///
/// For a bet at market-implied probability `m` with win probability `p`:
/// ```text
/// f* = (p - m) / (1 - m)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyPolicy {
    pub method: KellyMethod,
    /// Multiplier on full Kelly (0.25 = quarter Kelly).
    pub fraction: Decimal,
    /// Cap on any single stake.
    pub max_stake: Decimal,
    /// Stakes below this are not placed.
    pub min_stake: Decimal,
}

impl Default for KellyPolicy {
    fn default() -> Self {
        Self {
            method: KellyMethod::Fractional,
            fraction: Decimal::new(25, 2),
            max_stake: Decimal::new(500, 0),
            min_stake: Decimal::new(5, 0),
        }
    }
}

impl KellyPolicy {
    /// Full Kelly fraction of bankroll, zero when there is no positive edge.
    #[must_use]
    pub fn full_fraction(probability: Decimal, market_probability: Decimal) -> Decimal {
        if market_probability <= Decimal::ZERO
            || market_probability >= Decimal::ONE
            || probability <= market_probability
        {
            return Decimal::ZERO;
        }
        (probability - market_probability) / (Decimal::ONE - market_probability)
    }

    /// Stake for one bet against the given bankroll.
    ///
    /// Returns zero when the edge is non-positive, inputs are not valid
    /// probabilities, or the sized stake falls under `min_stake`.
    #[must_use]
    pub fn stake(&self, probability: f64, market_probability: f64, bankroll: Decimal) -> Decimal {
        let (Ok(p), Ok(m)) = (
            Decimal::try_from(probability),
            Decimal::try_from(market_probability),
        ) else {
            return Decimal::ZERO;
        };
        if p < Decimal::ZERO || p > Decimal::ONE || bankroll <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let full = Self::full_fraction(p, m);
        let fraction = match self.method {
            KellyMethod::Fractional => full * self.fraction,
            KellyMethod::Full => full,
        };

        let stake = (bankroll * fraction).min(self.max_stake).round_dp(2);
        if stake < self.min_stake || stake <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            stake
        }
    }
}
