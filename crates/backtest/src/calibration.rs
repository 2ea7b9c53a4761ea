//! Platt-scaling probability recalibration.
//!
//! Fits `p' = sigmoid(a * logit(p) + b)` by Newton-Raphson logistic regression
//! of realized outcomes on the log-odds of the model probability. Scoped fits
//! give each (sport, category) segment with enough history its own transform.
//!
//! # Degenerate inputs
//!
//! - Empty input or a single outcome class: identity `(a = 1, b = 0)`.
//! - Singular Hessian or non-finite step: stop and keep the last valid θ.
//! - Iteration budget exhausted: keep the current θ.
//!
//! None of these are errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use edgecal_core::stats::{clip_probability, logit, sigmoid};
use edgecal_core::{Observation, Scope};

const MAX_ITER: usize = 100;
const TOLERANCE: f64 = 1e-6;
const MIN_WEIGHT: f64 = 1e-6;
const SINGULAR_DET: f64 = 1e-12;

/// Slope and intercept of a Platt transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCoefficients {
    pub a: f64,
    pub b: f64,
}

impl Default for CalibrationCoefficients {
    fn default() -> Self {
        Self::identity()
    }
}

impl CalibrationCoefficients {
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// `(1, 0)`: leaves probabilities unchanged apart from clipping.
    #[must_use]
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0 }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        (self.a - 1.0).abs() < f64::EPSILON && self.b.abs() < f64::EPSILON
    }
}

/// Why a fit stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitTermination {
    Converged,
    IterationBudget,
    SingularHessian,
    /// Empty input or a single outcome class; no regression was run.
    Degenerate,
}

/// Coefficients plus fit bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub coefficients: CalibrationCoefficients,
    pub iterations: usize,
    pub samples: usize,
    pub termination: FitTermination,
}

/// Newton-Raphson Platt-scaling fitter.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationFitter {
    max_iter: usize,
    tolerance: f64,
}

impl Default for CalibrationFitter {
    fn default() -> Self {
        Self {
            max_iter: MAX_ITER,
            tolerance: TOLERANCE,
        }
    }
}

impl CalibrationFitter {
    #[must_use]
    pub fn new(max_iter: usize, tolerance: f64) -> Self {
        Self {
            max_iter,
            tolerance,
        }
    }

    /// Fits coefficients on training observations. Pushes are ignored.
    #[must_use]
    pub fn fit(&self, train: &[Observation]) -> CalibrationCoefficients {
        self.fit_report(train).coefficients
    }

    /// Fits coefficients and reports how the optimisation ended.
    #[must_use]
    pub fn fit_report(&self, train: &[Observation]) -> FitReport {
        let samples: Vec<(f64, f64)> = train
            .iter()
            .filter_map(|o| o.outcome.label().map(|y| (o.probability_model, y)))
            .collect();
        self.fit_pairs(&samples)
    }

    /// Fits on raw `(probability, label)` pairs with labels in {0, 1}.
    #[must_use]
    pub fn fit_pairs(&self, samples: &[(f64, f64)]) -> FitReport {
        let positives = samples.iter().filter(|(_, y)| *y > 0.5).count();
        if samples.is_empty() || positives == 0 || positives == samples.len() {
            return FitReport {
                coefficients: CalibrationCoefficients::identity(),
                iterations: 0,
                samples: samples.len(),
                termination: FitTermination::Degenerate,
            };
        }

        let xs: Vec<f64> = samples.iter().map(|(p, _)| logit(*p)).collect();
        let mut theta = [1.0_f64, 0.0_f64];
        let mut termination = FitTermination::IterationBudget;
        let mut iterations = 0;

        while iterations < self.max_iter {
            iterations += 1;

            // Gradient g = X^T (y - p) and Hessian H = X^T W X for X = [x, 1].
            let (mut g0, mut g1) = (0.0, 0.0);
            let (mut h00, mut h01, mut h11) = (0.0, 0.0, 0.0);
            for (x, (_, y)) in xs.iter().zip(samples) {
                let predicted = sigmoid(theta[0] * x + theta[1]);
                let weight = (predicted * (1.0 - predicted)).max(MIN_WEIGHT);
                let residual = y - predicted;
                g0 += residual * x;
                g1 += residual;
                h00 += weight * x * x;
                h01 += weight * x;
                h11 += weight;
            }

            let det = h00 * h11 - h01 * h01;
            if !det.is_finite() || det.abs() < SINGULAR_DET {
                termination = FitTermination::SingularHessian;
                break;
            }

            let step = [(h11 * g0 - h01 * g1) / det, (h00 * g1 - h01 * g0) / det];
            if !step[0].is_finite() || !step[1].is_finite() {
                termination = FitTermination::SingularHessian;
                break;
            }

            theta[0] += step[0];
            theta[1] += step[1];

            if step[0].abs().max(step[1].abs()) < self.tolerance {
                termination = FitTermination::Converged;
                break;
            }
        }

        debug!(
            a = theta[0],
            b = theta[1],
            iterations,
            samples = samples.len(),
            ?termination,
            "Platt fit finished"
        );

        FitReport {
            coefficients: CalibrationCoefficients::new(theta[0], theta[1]),
            iterations,
            samples: samples.len(),
            termination,
        }
    }

    /// Fits a global transform plus one per (sport, category) segment that
    /// has at least `min_samples` win/loss observations.
    #[must_use]
    pub fn fit_scoped(
        &self,
        train: &[Observation],
        min_samples: usize,
    ) -> BTreeMap<Scope, FitReport> {
        let mut reports = BTreeMap::new();
        reports.insert(Scope::Global, self.fit_report(train));

        let mut segments: BTreeMap<Scope, Vec<Observation>> = BTreeMap::new();
        for observation in train {
            segments
                .entry(observation.scope())
                .or_default()
                .push(observation.clone());
        }

        for (scope, members) in segments {
            let graded = members.iter().filter(|o| o.outcome.label().is_some()).count();
            if graded < min_samples {
                debug!(%scope, graded, min_samples, "Segment below fit minimum, using global");
                continue;
            }
            reports.insert(scope, self.fit_report(&members));
        }

        reports
    }
}

/// Applies a transform to one probability.
#[must_use]
pub fn apply_one(probability: f64, coefficients: CalibrationCoefficients) -> f64 {
    let x = logit(probability);
    clip_probability(sigmoid(coefficients.a * x + coefficients.b))
}

/// Applies a transform to every probability.
#[must_use]
pub fn apply(probabilities: &[f64], coefficients: CalibrationCoefficients) -> Vec<f64> {
    probabilities
        .iter()
        .map(|p| apply_one(*p, coefficients))
        .collect()
}

/// Blends the model toward the market: `(1 - alpha) * model + alpha * market`.
///
/// `alpha` is clamped to `[0, 1]`; the result is clipped.
#[must_use]
pub fn shrink_toward_market(model: f64, market: f64, alpha: f64) -> f64 {
    let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
    clip_probability((1.0 - alpha) * model + alpha * market)
}

/// Resolves the transform for a segment: its own fit, else global, else
/// identity.
#[must_use]
pub fn coefficients_for(
    transforms: &BTreeMap<Scope, CalibrationCoefficients>,
    sport: &str,
    bet_category: &str,
) -> CalibrationCoefficients {
    transforms
        .get(&Scope::segment(sport, bet_category))
        .or_else(|| transforms.get(&Scope::Global))
        .copied()
        .unwrap_or_default()
}
