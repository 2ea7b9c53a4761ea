//! Edge and calibration-bias diagnostics.

use serde::{Deserialize, Serialize};

use edgecal_core::stats::mean;

use crate::grading::GradedBet;

/// Bias band inside which probabilities count as well calibrated.
pub const BIAS_THRESHOLD: f64 = 0.02;

/// Direction of systematic probability error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasLabel {
    /// Predicted probabilities exceed realized win rates.
    Overconfidence,
    Underconfidence,
    WellCalibrated,
}

impl BiasLabel {
    #[must_use]
    pub fn from_bias(bias: f64) -> Self {
        if bias > BIAS_THRESHOLD {
            Self::Overconfidence
        } else if bias < -BIAS_THRESHOLD {
            Self::Underconfidence
        } else {
            Self::WellCalibrated
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overconfidence => "overconfidence",
            Self::Underconfidence => "underconfidence",
            Self::WellCalibrated => "well_calibrated",
        }
    }
}

/// Rank correlation of edge with outcome, plus calibration bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDiagnostics {
    pub bet_count: usize,
    /// `None` when undefined (fewer than two bets or a constant series).
    pub spearman_correlation: Option<f64>,
    pub mean_implied_prob: f64,
    pub mean_outcome: f64,
    /// mean_implied_prob - mean_outcome.
    pub bias: f64,
    pub bias_label: BiasLabel,
}

pub struct DiagnosticsAnalyzer;

impl DiagnosticsAnalyzer {
    /// Analyzes win/loss bets; pushes carry no outcome and are skipped.
    #[must_use]
    pub fn analyze_edge_correlation(bets: &[GradedBet]) -> EdgeDiagnostics {
        let decided: Vec<(f64, f64, f64)> = bets
            .iter()
            .filter_map(|b| b.outcome.label().map(|y| (b.edge, b.probability, y)))
            .collect();

        let edges: Vec<f64> = decided.iter().map(|(e, _, _)| *e).collect();
        let implied: Vec<f64> = decided.iter().map(|(_, p, _)| *p).collect();
        let outcomes: Vec<f64> = decided.iter().map(|(_, _, y)| *y).collect();

        let mean_implied_prob = mean(&implied);
        let mean_outcome = mean(&outcomes);
        let bias = mean_implied_prob - mean_outcome;

        EdgeDiagnostics {
            bet_count: decided.len(),
            spearman_correlation: spearman(&edges, &outcomes),
            mean_implied_prob,
            mean_outcome,
            bias,
            bias_label: BiasLabel::from_bias(bias),
        }
    }
}

/// Average ranks, 1-based; tied values share the mean of their positions.
#[must_use]
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // Positions start..=end hold ranks start+1..=end+1.
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = rank;
        }
        start = end + 1;
    }
    ranks
}

/// Pearson correlation, `None` if undefined.
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let (mx, my) = (mean(x), mean(y));
    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some((covariance / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Spearman rank correlation: Pearson correlation of average ranks.
#[must_use]
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use edgecal_core::Outcome;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn bet(edge: f64, probability: f64, outcome: Outcome) -> GradedBet {
        GradedBet {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            sport: "football".to_string(),
            bet_category: "total".to_string(),
            probability,
            market_probability: probability - edge,
            edge,
            outcome,
            stake: Decimal::ONE_HUNDRED,
            profit: Decimal::ZERO,
        }
    }

    #[test]
    fn ranks_average_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
        assert_eq!(average_ranks(&[1.0, 1.0, 1.0]), vec![2.0, 2.0, 2.0]);
        assert!(average_ranks(&[]).is_empty());
    }

    #[test]
    fn spearman_perfect_monotone() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [10.0, 40.0, 90.0, 160.0];
        assert!((spearman(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        let rev = [4.0, 3.0, 2.0, 1.0];
        assert!((spearman(&x, &rev).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn spearman_zero_variance_edge_is_none() {
        let bets = vec![
            bet(0.05, 0.6, Outcome::Win),
            bet(0.05, 0.6, Outcome::Loss),
            bet(0.05, 0.6, Outcome::Win),
        ];
        let diagnostics = DiagnosticsAnalyzer::analyze_edge_correlation(&bets);
        assert_eq!(diagnostics.spearman_correlation, None);
        assert_eq!(diagnostics.bet_count, 3);
    }

    #[test]
    fn spearman_needs_two_points() {
        let diagnostics =
            DiagnosticsAnalyzer::analyze_edge_correlation(&[bet(0.1, 0.6, Outcome::Win)]);
        assert_eq!(diagnostics.spearman_correlation, None);
    }

    #[test]
    fn edge_correlated_with_wins() {
        let bets = vec![
            bet(0.01, 0.55, Outcome::Loss),
            bet(0.02, 0.55, Outcome::Loss),
            bet(0.08, 0.6, Outcome::Win),
            bet(0.09, 0.6, Outcome::Win),
            bet(0.03, 0.55, Outcome::Push),
        ];
        let diagnostics = DiagnosticsAnalyzer::analyze_edge_correlation(&bets);
        assert_eq!(diagnostics.bet_count, 4);
        assert!(diagnostics.spearman_correlation.unwrap() > 0.8);
    }

    #[test]
    fn bias_labels_use_fixed_threshold() {
        let over = vec![bet(0.0, 0.7, Outcome::Win), bet(0.0, 0.7, Outcome::Loss)];
        let d = DiagnosticsAnalyzer::analyze_edge_correlation(&over);
        assert!((d.bias - 0.2).abs() < 1e-12);
        assert_eq!(d.bias_label, BiasLabel::Overconfidence);

        let under = vec![bet(0.0, 0.3, Outcome::Win), bet(0.0, 0.3, Outcome::Loss)];
        assert_eq!(
            DiagnosticsAnalyzer::analyze_edge_correlation(&under).bias_label,
            BiasLabel::Underconfidence
        );

        assert_eq!(BiasLabel::from_bias(0.02), BiasLabel::WellCalibrated);
        assert_eq!(BiasLabel::from_bias(-0.019), BiasLabel::WellCalibrated);
    }

    #[test]
    fn bias_label_serializes_snake_case() {
        let json = serde_json::to_string(&BiasLabel::WellCalibrated).unwrap();
        assert_eq!(json, "\"well_calibrated\"");
    }
}
