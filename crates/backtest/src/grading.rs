//! Grading of historical observations into settled bets.
//!
//! A graded bet carries the probability it was evaluated with (raw or
//! recalibrated), the stake actually risked and the realized profit.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use edgecal_core::odds::payout_multiple;
use edgecal_core::{KellyPolicy, Observation, Outcome, StakingMode};

/// Stake sizing applied while grading.
#[derive(Debug, Clone, PartialEq)]
pub struct Staking {
    pub mode: StakingMode,
    pub policy: KellyPolicy,
}

impl Staking {
    /// Recorded stakes, no resizing.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            mode: StakingMode::Flat,
            policy: KellyPolicy::default(),
        }
    }
}

/// A settled bet ready for metric computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedBet {
    pub id: Uuid,
    pub date: NaiveDate,
    pub sport: String,
    pub bet_category: String,
    /// Probability the bet was evaluated with.
    pub probability: f64,
    pub market_probability: f64,
    /// `probability - market_probability`.
    pub edge: f64,
    pub outcome: Outcome,
    pub stake: Decimal,
    /// Net profit: positive on a win, `-stake` on a loss, zero on a push.
    pub profit: Decimal,
}

impl GradedBet {
    /// Profit per unit staked.
    #[must_use]
    pub fn unit_return(&self) -> f64 {
        if self.stake <= Decimal::ZERO {
            return 0.0;
        }
        (self.profit / self.stake).to_f64().unwrap_or(0.0)
    }

    /// `(probability, label)` for scoring rules; `None` for pushes.
    #[must_use]
    pub fn scoring_pair(&self) -> Option<(f64, f64)> {
        self.outcome.label().map(|y| (self.probability, y))
    }
}

/// Net profit per unit staked if the observation wins.
///
/// Uses the quoted American odds when present, otherwise the fair payout at
/// the market-implied probability, `(1 - m) / m`.
#[must_use]
pub fn win_multiple(observation: &Observation) -> f64 {
    match observation.american_odds {
        Some(odds) => payout_multiple(odds),
        None => {
            let m = edgecal_core::clip_probability(observation.probability_market);
            (1.0 - m) / m
        }
    }
}

/// Grades one observation at the given probability.
///
/// Returns `None` when the staking mode sizes the bet to zero (not placed).
#[must_use]
pub fn grade(observation: &Observation, probability: f64, staking: &Staking) -> Option<GradedBet> {
    let stake = match staking.mode {
        StakingMode::Flat => observation.stake,
        StakingMode::Kelly { bankroll } => {
            staking
                .policy
                .stake(probability, observation.probability_market, bankroll)
        }
    };
    if stake <= Decimal::ZERO {
        return None;
    }

    let multiple = Decimal::try_from(win_multiple(observation)).unwrap_or(Decimal::ONE);
    let profit = match observation.outcome {
        Outcome::Win => (stake * multiple).round_dp(4),
        Outcome::Loss => -stake,
        Outcome::Push => Decimal::ZERO,
    };

    Some(GradedBet {
        id: observation.id,
        date: observation.date,
        sport: observation.sport.clone(),
        bet_category: observation.bet_category.clone(),
        probability,
        market_probability: observation.probability_market,
        edge: probability - observation.probability_market,
        outcome: observation.outcome,
        stake,
        profit,
    })
}
