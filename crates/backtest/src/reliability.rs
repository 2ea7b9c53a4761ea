//! Reliability curves and variance scalars for calibrated probabilities.

use serde::{Deserialize, Serialize};

/// One bucket of a reliability diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub observed_rate: f64,
}

/// Buckets `(probability, label)` pairs into `n_bins` equal-width bins.
///
/// Only non-empty bins are returned. A probability of exactly 1.0 lands in
/// the last bin.
#[must_use]
pub fn reliability_bins(pairs: &[(f64, f64)], n_bins: usize) -> Vec<ReliabilityBin> {
    if n_bins == 0 {
        return Vec::new();
    }

    let mut counts = vec![0_usize; n_bins];
    let mut predicted = vec![0.0; n_bins];
    let mut observed = vec![0.0; n_bins];

    for &(p, y) in pairs {
        if !p.is_finite() {
            continue;
        }
        let idx = ((p.clamp(0.0, 1.0) * n_bins as f64).floor() as usize).min(n_bins - 1);
        counts[idx] += 1;
        predicted[idx] += p;
        observed[idx] += y;
    }

    let width = 1.0 / n_bins as f64;
    (0..n_bins)
        .filter(|&i| counts[i] > 0)
        .map(|i| {
            let n = counts[i] as f64;
            ReliabilityBin {
                lower: i as f64 * width,
                upper: (i + 1) as f64 * width,
                count: counts[i],
                mean_predicted: predicted[i] / n,
                observed_rate: observed[i] / n,
            }
        })
        .collect()
}

/// Realized over expected Bernoulli variance: `mean((y - p)^2) / mean(p(1 - p))`.
///
/// 1.0 when there is no data or the expected variance is zero.
#[must_use]
pub fn variance_scalar(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 1.0;
    }

    let n = pairs.len() as f64;
    let realized: f64 = pairs.iter().map(|(p, y)| (y - p).powi(2)).sum::<f64>() / n;
    let expected: f64 = pairs.iter().map(|(p, _)| p * (1.0 - p)).sum::<f64>() / n;

    if expected <= f64::EPSILON {
        return 1.0;
    }
    realized / expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_skip_empty_buckets() {
        let pairs = [(0.12, 0.0), (0.18, 1.0), (0.75, 1.0)];
        let bins = reliability_bins(&pairs, 10);

        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 2);
        assert!((bins[0].lower - 0.1).abs() < 1e-12);
        assert!((bins[0].mean_predicted - 0.15).abs() < 1e-12);
        assert!((bins[0].observed_rate - 0.5).abs() < 1e-12);
        assert!((bins[1].upper - 0.8).abs() < 1e-12);
    }

    #[test]
    fn probability_one_lands_in_last_bin() {
        let bins = reliability_bins(&[(1.0, 1.0), (0.0, 0.0)], 4);
        assert_eq!(bins.len(), 2);
        assert!((bins[1].lower - 0.75).abs() < 1e-12);
        assert!((bins[0].lower).abs() < 1e-12);
    }

    #[test]
    fn zero_bins_is_empty() {
        assert!(reliability_bins(&[(0.5, 1.0)], 0).is_empty());
    }

    #[test]
    fn variance_scalar_near_one_for_calibrated_coin() {
        // p = 0.5, half wins: realized 0.25, expected 0.25
        let pairs: Vec<(f64, f64)> = (0..100_i32).map(|i| (0.5, f64::from(i % 2))).collect();
        assert!((variance_scalar(&pairs) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn variance_scalar_flags_overconfidence() {
        // Confident at 0.9 but only half win
        let pairs: Vec<(f64, f64)> = (0..100_i32).map(|i| (0.9, f64::from(i % 2))).collect();
        // realized = (0.01 + 0.81) / 2 = 0.41, expected = 0.09
        assert!((variance_scalar(&pairs) - 0.41 / 0.09).abs() < 1e-9);
    }

    #[test]
    fn variance_scalar_degenerate_inputs() {
        assert!((variance_scalar(&[]) - 1.0).abs() < f64::EPSILON);
        assert!((variance_scalar(&[(0.0, 0.0), (1.0, 1.0)]) - 1.0).abs() < f64::EPSILON);
    }
}
