//! Statistical significance of sweep results.
//!
//! Bootstrap percentile intervals for a sample mean, Welch's two-sample t
//! test, and Cohen's d. Bootstrap draws are i.i.d., so a fixed seed makes
//! intervals reproducible without affecting their validity.
//!
//! # Example
//!
//! ```ignore
//! use edgecal_backtest::significance::SignificanceTester;
//!
//! let tester = SignificanceTester::new(config.bootstrap.clone());
//! let ci = tester.bootstrap_ci(&returns, 0.95, 2_000);
//! println!("ROI per bet: {:.3} [{:.3}, {:.3}]", ci.point_estimate, ci.lower, ci.upper);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use edgecal_core::stats::{mean, sample_variance, student_t_two_tailed};
use edgecal_core::BootstrapConfig;

/// Percentile bootstrap interval for a mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapInterval {
    /// Mean of the original sample.
    pub point_estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// Standard deviation of the bootstrap distribution.
    pub standard_error: f64,
}

impl BootstrapInterval {
    #[must_use]
    pub fn zero() -> Self {
        Self {
            point_estimate: 0.0,
            lower: 0.0,
            upper: 0.0,
            standard_error: 0.0,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// True if zero lies outside the interval.
    #[must_use]
    pub fn excludes_zero(&self) -> bool {
        self.lower > 0.0 || self.upper < 0.0
    }
}

/// Result of a two-sample mean comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoSampleTest {
    pub statistic: f64,
    pub p_value: f64,
    /// Welch-Satterthwaite degrees of freedom.
    pub degrees_of_freedom: f64,
}

impl TwoSampleTest {
    fn inconclusive() -> Self {
        Self {
            statistic: 0.0,
            p_value: 1.0,
            degrees_of_freedom: 0.0,
        }
    }
}

/// Bootstrap and hypothesis tests over per-bet samples.
#[derive(Debug, Clone)]
pub struct SignificanceTester {
    config: BootstrapConfig,
}

impl SignificanceTester {
    #[must_use]
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BootstrapConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Interval at the configured confidence and iteration count.
    #[must_use]
    pub fn bootstrap(&self, sample: &[f64]) -> BootstrapInterval {
        self.bootstrap_ci(sample, self.config.confidence_level, self.config.iterations)
    }

    /// Resamples with replacement at the original size `iterations` times and
    /// returns the `(alpha/2, 1 - alpha/2)` percentiles of the resample means.
    #[must_use]
    pub fn bootstrap_ci(
        &self,
        sample: &[f64],
        confidence: f64,
        iterations: usize,
    ) -> BootstrapInterval {
        if sample.is_empty() || iterations == 0 {
            return BootstrapInterval::zero();
        }

        let n = sample.len();
        let point_estimate = mean(sample);
        let mut rng = self.rng();

        let mut distribution: Vec<f64> = (0..iterations)
            .map(|_| {
                let total: f64 = (0..n).map(|_| sample[rng.gen_range(0..n)]).sum();
                total / n as f64
            })
            .collect();
        distribution.sort_by(|a, b| a.total_cmp(b));

        let (lower, upper) = percentile_ci(&distribution, confidence);

        BootstrapInterval {
            point_estimate,
            lower,
            upper,
            standard_error: sample_variance(&distribution).sqrt(),
        }
    }
}

/// Welch's unequal-variance two-sample t test, two-tailed.
///
/// Fewer than two points in either group is inconclusive (p = 1). With zero
/// variance in both groups the means either match (p = 1) or differ with
/// certainty (p = 0).
#[must_use]
pub fn two_sample_test(group_a: &[f64], group_b: &[f64]) -> TwoSampleTest {
    if group_a.len() < 2 || group_b.len() < 2 {
        return TwoSampleTest::inconclusive();
    }

    let (n_a, n_b) = (group_a.len() as f64, group_b.len() as f64);
    let (mean_a, mean_b) = (mean(group_a), mean(group_b));
    let se_a = sample_variance(group_a) / n_a;
    let se_b = sample_variance(group_b) / n_b;
    let se = (se_a + se_b).sqrt();

    if se <= f64::EPSILON {
        if (mean_a - mean_b).abs() <= f64::EPSILON {
            return TwoSampleTest::inconclusive();
        }
        let statistic = if mean_a > mean_b {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        return TwoSampleTest {
            // Keep the statistic finite so packs stay serializable.
            statistic: statistic.clamp(f64::MIN, f64::MAX),
            p_value: 0.0,
            degrees_of_freedom: n_a + n_b - 2.0,
        };
    }

    let statistic = (mean_a - mean_b) / se;
    let df = (se_a + se_b).powi(2)
        / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));

    TwoSampleTest {
        statistic,
        p_value: student_t_two_tailed(statistic, df),
        degrees_of_freedom: df,
    }
}

/// Cohen's d with the pooled, degrees-of-freedom-corrected standard deviation.
///
/// Zero when the pooled deviation is zero or there are too few points.
#[must_use]
pub fn effect_size(group_a: &[f64], group_b: &[f64]) -> f64 {
    let (n_a, n_b) = (group_a.len(), group_b.len());
    if n_a == 0 || n_b == 0 || n_a + n_b < 3 {
        return 0.0;
    }

    let pooled_variance = ((n_a as f64 - 1.0) * sample_variance(group_a)
        + (n_b as f64 - 1.0) * sample_variance(group_b))
        / (n_a + n_b - 2) as f64;
    let pooled_std = pooled_variance.sqrt();

    if pooled_std <= f64::EPSILON {
        return 0.0;
    }
    (mean(group_a) - mean(group_b)) / pooled_std
}

/// Extracts a percentile interval from a sorted distribution.
#[must_use]
pub fn percentile_ci(distribution: &[f64], confidence_level: f64) -> (f64, f64) {
    if distribution.is_empty() {
        return (0.0, 0.0);
    }
    if distribution.len() == 1 {
        return (distribution[0], distribution[0]);
    }

    let alpha = 1.0 - confidence_level;
    let n = distribution.len();

    // Nudge away from representation error in alpha before rounding.
    let lower_idx = ((alpha / 2.0) * n as f64 + 1e-9).floor() as usize;
    let upper_idx = ((1.0 - alpha / 2.0) * n as f64 - 1e-9).ceil() as usize;

    let lower_idx = lower_idx.min(n - 1);
    let upper_idx = upper_idx.saturating_sub(1).min(n - 1).max(lower_idx);

    (distribution[lower_idx], distribution[upper_idx])
}
