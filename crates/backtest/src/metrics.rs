//! Performance metrics for graded bets.
//!
//! Hit rate, ROI, drawdown and profit factor describe the betting result;
//! Brier score and log loss describe the probabilities behind it.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use edgecal_core::stats::{clip_probability, mean, sample_variance, wilson_ci};
use edgecal_core::Outcome;

use crate::grading::GradedBet;

/// Gross wins over gross losses, with an explicit no-loss case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProfitFactor {
    Finite(f64),
    /// Winning profit with no losing profit at all.
    Infinite,
}

impl ProfitFactor {
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Plain float view; `Infinite` becomes `f64::INFINITY`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Finite(v) => *v,
            Self::Infinite => f64::INFINITY,
        }
    }
}

impl std::fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(v) => write!(f, "{v:.3}"),
            Self::Infinite => write!(f, "inf"),
        }
    }
}

/// Aggregate metrics over a chronologically ordered set of graded bets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_bets: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    /// wins / (wins + losses); pushes are in neither count.
    pub hit_rate: f64,
    /// Wilson 95% interval on the hit rate.
    pub hit_rate_ci: (f64, f64),
    pub total_staked: Decimal,
    pub total_profit: Decimal,
    /// total_profit / total_staked.
    pub roi: f64,
    /// total_profit / total_bets.
    pub expected_value: f64,
    pub profit_factor: ProfitFactor,
    /// Largest fractional fall from a cumulative-profit peak. Not capped at 1.
    pub max_drawdown: f64,
    /// Mean over sample standard deviation of per-bet returns.
    pub sharpe: f64,
    pub brier_score: f64,
    pub log_loss: f64,
    pub max_consecutive_losses: u32,
}

impl PerformanceMetrics {
    /// All-zero metrics for an empty bet set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_bets: 0,
            wins: 0,
            losses: 0,
            pushes: 0,
            hit_rate: 0.0,
            hit_rate_ci: (0.0, 0.0),
            total_staked: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            roi: 0.0,
            expected_value: 0.0,
            profit_factor: ProfitFactor::Finite(0.0),
            max_drawdown: 0.0,
            sharpe: 0.0,
            brier_score: 0.0,
            log_loss: 0.0,
            max_consecutive_losses: 0,
        }
    }
}

/// Computes [`PerformanceMetrics`] from graded bets.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Computes metrics. Bets are assumed to be in chronological order.
    #[must_use]
    pub fn compute(bets: &[GradedBet]) -> PerformanceMetrics {
        if bets.is_empty() {
            return PerformanceMetrics::empty();
        }

        let count = |outcome: Outcome| bets.iter().filter(|b| b.outcome == outcome).count() as u32;
        let wins = count(Outcome::Win);
        let losses = count(Outcome::Loss);
        let pushes = count(Outcome::Push);
        let total_bets = bets.len() as u32;

        let decided = wins + losses;
        let hit_rate = if decided > 0 {
            f64::from(wins) / f64::from(decided)
        } else {
            0.0
        };
        let hit_rate_ci = wilson_ci(wins as usize, decided as usize, 1.96);

        let total_staked: Decimal = bets.iter().map(|b| b.stake).sum();
        let total_profit: Decimal = bets.iter().map(|b| b.profit).sum();
        let roi = if total_staked > Decimal::ZERO {
            (total_profit / total_staked).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };
        let expected_value = (total_profit / Decimal::from(total_bets))
            .to_f64()
            .unwrap_or(0.0);

        let profits: Vec<f64> = bets.iter().map(|b| b.profit.to_f64().unwrap_or(0.0)).collect();
        let returns: Vec<f64> = bets.iter().map(GradedBet::unit_return).collect();
        let pairs: Vec<(f64, f64)> = bets.iter().filter_map(GradedBet::scoring_pair).collect();

        PerformanceMetrics {
            total_bets,
            wins,
            losses,
            pushes,
            hit_rate,
            hit_rate_ci,
            total_staked,
            total_profit,
            roi,
            expected_value,
            profit_factor: profit_factor(&profits),
            max_drawdown: max_drawdown(&profits),
            sharpe: sharpe(&returns),
            brier_score: brier_score(&pairs),
            log_loss: log_loss(&pairs),
            max_consecutive_losses: max_consecutive_losses(bets),
        }
    }
}

/// Sum of positive profits over the magnitude of the sum of negative ones.
///
/// No losses with some wins is `Infinite`; neither is `Finite(0.0)`.
#[must_use]
pub fn profit_factor(profits: &[f64]) -> ProfitFactor {
    let gross_win: f64 = profits.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = profits.iter().filter(|p| **p < 0.0).sum::<f64>().abs();

    if gross_loss > 0.0 {
        ProfitFactor::Finite(gross_win / gross_loss)
    } else if gross_win > 0.0 {
        ProfitFactor::Infinite
    } else {
        ProfitFactor::Finite(0.0)
    }
}

/// Maximum drawdown as a fraction of the running cumulative-profit peak.
///
/// The peak starts at zero; while it is not positive the drawdown is zero.
/// A cumulative profit that turns negative after a peak yields values above 1.
///
/// ```
/// use edgecal_backtest::metrics::max_drawdown;
///
/// // Running totals 10, 15, -5, -2: peak 15, trough -5.
/// let dd = max_drawdown(&[10.0, 5.0, -20.0, 3.0]);
/// assert!((dd - 20.0 / 15.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn max_drawdown(profits: &[f64]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = 0.0_f64;
    let mut worst = 0.0_f64;

    for profit in profits {
        cumulative += profit;
        peak = peak.max(cumulative);
        let drawdown = if peak > 0.0 {
            (peak - cumulative) / peak
        } else {
            0.0
        };
        worst = worst.max(drawdown);
    }

    worst
}

/// Mean squared error of probability against the binary label.
#[must_use]
pub fn brier_score(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    pairs
        .iter()
        .map(|(p, y)| (clip_probability(*p) - y).powi(2))
        .sum::<f64>()
        / pairs.len() as f64
}

/// Mean negative log-likelihood of the labels.
#[must_use]
pub fn log_loss(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    pairs
        .iter()
        .map(|(p, y)| {
            let p = clip_probability(*p);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / pairs.len() as f64
}

/// Per-bet Sharpe ratio; zero when undefined.
#[must_use]
pub fn sharpe(returns: &[f64]) -> f64 {
    let std_dev = sample_variance(returns).sqrt();
    if std_dev > 0.0 {
        mean(returns) / std_dev
    } else {
        0.0
    }
}

fn max_consecutive_losses(bets: &[GradedBet]) -> u32 {
    let mut current = 0u32;
    let mut longest = 0u32;
    for bet in bets {
        match bet.outcome {
            Outcome::Loss => {
                current += 1;
                longest = longest.max(current);
            }
            Outcome::Win => current = 0,
            Outcome::Push => {}
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn bet(outcome: Outcome, probability: f64, profit: Decimal) -> GradedBet {
        GradedBet {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            sport: "basketball".to_string(),
            bet_category: "points".to_string(),
            probability,
            market_probability: 0.5,
            edge: probability - 0.5,
            outcome,
            stake: dec!(100),
            profit,
        }
    }

    fn win() -> GradedBet {
        bet(Outcome::Win, 0.6, dec!(100))
    }

    fn loss() -> GradedBet {
        bet(Outcome::Loss, 0.6, dec!(-100))
    }

    fn push() -> GradedBet {
        bet(Outcome::Push, 0.6, Decimal::ZERO)
    }

    // ============================================================
    // Counting
    // ============================================================

    #[test]
    fn empty_input_returns_empty_metrics() {
        assert_eq!(MetricsCalculator::compute(&[]), PerformanceMetrics::empty());
    }

    #[test]
    fn pushes_excluded_from_hit_rate() {
        let mut bets = Vec::new();
        bets.extend((0..50).map(|_| win()));
        bets.extend((0..40).map(|_| loss()));
        bets.extend((0..10).map(|_| push()));

        let metrics = MetricsCalculator::compute(&bets);

        assert_eq!(metrics.total_bets, 100);
        assert_eq!(metrics.pushes, 10);
        assert!((metrics.hit_rate - 50.0 / 90.0).abs() < 1e-12);
        assert!((metrics.hit_rate - 0.5556).abs() < 1e-4);
    }

    #[test]
    fn roi_and_expected_value() {
        let bets = vec![win(), win(), win(), loss(), loss()];
        let metrics = MetricsCalculator::compute(&bets);

        assert_eq!(metrics.total_staked, dec!(500));
        assert_eq!(metrics.total_profit, dec!(100));
        assert!((metrics.roi - 0.2).abs() < 1e-12);
        assert!((metrics.expected_value - 20.0).abs() < 1e-12);
        assert_eq!(metrics.profit_factor, ProfitFactor::Finite(1.5));
    }

    #[test]
    fn consecutive_losses_ignore_pushes() {
        let bets = vec![loss(), push(), loss(), win(), loss()];
        assert_eq!(MetricsCalculator::compute(&bets).max_consecutive_losses, 2);
    }

    // ============================================================
    // Profit factor
    // ============================================================

    #[test]
    fn all_winning_bets_give_infinite_profit_factor() {
        let metrics = MetricsCalculator::compute(&[win(), win()]);
        assert!(metrics.profit_factor.is_infinite());
        assert!(metrics.profit_factor.as_f64().is_infinite());
    }

    #[test]
    fn no_wins_no_losses_gives_zero_profit_factor() {
        assert_eq!(profit_factor(&[0.0, 0.0]), ProfitFactor::Finite(0.0));
        assert_eq!(profit_factor(&[]), ProfitFactor::Finite(0.0));
    }

    #[test]
    fn profit_factor_serializes_tagged() {
        let json = serde_json::to_string(&ProfitFactor::Infinite).unwrap();
        assert_eq!(json, r#"{"kind":"infinite"}"#);
        let back: ProfitFactor = serde_json::from_str(&json).unwrap();
        assert!(back.is_infinite());
    }

    // ============================================================
    // Drawdown
    // ============================================================

    #[test]
    fn drawdown_can_exceed_one() {
        let dd = max_drawdown(&[10.0, 5.0, -20.0, 3.0]);
        assert!((dd - 20.0 / 15.0).abs() < 1e-12);
        assert!(dd > 1.0);
    }

    #[test]
    fn drawdown_zero_while_peak_not_positive() {
        assert!(max_drawdown(&[-10.0, -5.0, 2.0]).abs() < f64::EPSILON);
        assert!(max_drawdown(&[5.0, 5.0, 5.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn drawdown_from_graded_bets() {
        let bets = vec![
            bet(Outcome::Win, 0.6, dec!(10)),
            bet(Outcome::Win, 0.6, dec!(5)),
            bet(Outcome::Loss, 0.6, dec!(-20)),
            bet(Outcome::Win, 0.6, dec!(3)),
        ];
        let metrics = MetricsCalculator::compute(&bets);
        assert!((metrics.max_drawdown - 4.0 / 3.0).abs() < 1e-12);
    }

    // ============================================================
    // Scoring rules
    // ============================================================

    #[test]
    fn brier_and_log_loss_reference_values() {
        let pairs = [(0.8, 1.0), (0.3, 0.0)];
        // ((0.2)^2 + (0.3)^2) / 2
        assert!((brier_score(&pairs) - 0.065).abs() < 1e-12);
        let expected = -(0.8_f64.ln() + 0.7_f64.ln()) / 2.0;
        assert!((log_loss(&pairs) - expected).abs() < 1e-12);
    }

    #[test]
    fn scoring_rules_clip_certain_forecasts() {
        let pairs = [(1.0, 0.0), (0.0, 1.0)];
        assert!(log_loss(&pairs).is_finite());
        assert!(brier_score(&pairs) < 1.0);
    }

    #[test]
    fn sharpe_zero_for_constant_returns() {
        assert!(sharpe(&[0.1, 0.1, 0.1]).abs() < f64::EPSILON);
        assert!(sharpe(&[1.0, -1.0, 1.0]) > 0.0);
    }
}
