//! End-to-end calibration run.
//!
//! Split, fit on the training window, recalibrate the test window, sweep
//! thresholds on the recalibrated test bets, then grade the bets that pass
//! the recommended thresholds and assemble a pack. Nothing from the test
//! window is visible to the fit.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use tracing::info;

use edgecal_core::{CalibrationConfig, Observation, ObservationSet, Result, Scope};

use crate::calibration::{
    apply_one, coefficients_for, shrink_toward_market, CalibrationCoefficients, CalibrationFitter,
    FitReport,
};
use crate::diagnostics::DiagnosticsAnalyzer;
use crate::grading::{grade, GradedBet, Staking};
use crate::metrics::{brier_score, MetricsCalculator, PerformanceMetrics};
use crate::pack::{CalibrationPack, PackBuilder};
use crate::reliability::{reliability_bins, variance_scalar};
use crate::split::SplitValidator;
use crate::sweep::{qualifies, SweepConfig, SweepReport, ThresholdSweepEngine};

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub pack: CalibrationPack,
    pub fit_reports: BTreeMap<Scope, FitReport>,
    pub sweep: SweepReport,
    /// Test bets graded under the recommended thresholds, in date order.
    pub selected_bets: Vec<GradedBet>,
}

impl RunOutcome {
    #[must_use]
    pub fn metrics(&self) -> PerformanceMetrics {
        MetricsCalculator::compute(&self.selected_bets)
    }
}

/// One calibration run over a materialized observation set.
#[derive(Debug, Clone)]
pub struct CalibrationRun {
    config: CalibrationConfig,
    fitter: CalibrationFitter,
    version: Option<String>,
}

impl CalibrationRun {
    /// # Errors
    /// `InvalidConfig` if the configuration does not validate.
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitter: CalibrationFitter::default(),
            version: None,
        })
    }

    /// Pins the pack version instead of deriving it from the run time.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Runs the full calibration.
    ///
    /// # Errors
    /// `DataSufficiency` when either partition is empty; `InvalidConfig`
    /// for a bad split or pack.
    pub fn execute(&self, observations: &ObservationSet) -> Result<RunOutcome> {
        info!(
            league = %self.config.league,
            observations = observations.len(),
            "Starting calibration run"
        );

        let split = SplitValidator::new(self.config.train_fraction)?.split(observations)?;

        let fit_reports = self
            .fitter
            .fit_scoped(&split.train, self.config.min_fit_samples);
        let transforms: BTreeMap<Scope, CalibrationCoefficients> = fit_reports
            .iter()
            .map(|(scope, report)| (scope.clone(), report.coefficients))
            .collect();
        info!(scopes = transforms.len(), "Fitted probability transforms");

        let calibrated = self.recalibrate(&split.test, &transforms);

        let sweep = ThresholdSweepEngine::new(SweepConfig::from(&self.config)).run(&calibrated);
        let selected_bets = self.select_bets(&calibrated, &sweep.recommended);
        let metrics = MetricsCalculator::compute(&selected_bets);
        let diagnostics = DiagnosticsAnalyzer::analyze_edge_correlation(&selected_bets);

        let pairs = scoring_pairs(calibrated.iter());
        let bins = reliability_bins(&pairs, self.config.reliability_bins);
        let scalars = variance_scalars(&calibrated, &transforms);

        info!(
            selected = selected_bets.len(),
            roi = metrics.roi,
            hit_rate = metrics.hit_rate,
            brier = metrics.brier_score,
            "Graded test bets at recommended thresholds"
        );

        let range = observations
            .date_range()
            .unwrap_or(split.periods.train);
        let mut builder = PackBuilder::new(self.config.league.clone())
            .generated_at(Utc::now())
            .periods(range, split.train_period(), split.test_period())
            .edge_thresholds(sweep.recommended.clone())
            .variance_scalars(scalars)
            .kelly_policy(self.config.kelly_policy.clone())
            .transforms(transforms)
            .market_shrinkage(self.config.market_shrinkage)
            .metrics(&metrics)
            .reliability_bins(bins)
            .threshold_results(sweep.results.clone())
            .diagnostics(diagnostics);
        if let Some(version) = &self.version {
            builder = builder.version(version.clone());
        }
        for note in self.notes(observations, &split.train, &split.test, &calibrated, &sweep) {
            builder = builder.note(note);
        }

        let pack = builder.build()?;
        info!(version = %pack.version, "Calibration run complete");

        Ok(RunOutcome {
            pack,
            fit_reports,
            sweep,
            selected_bets,
        })
    }

    /// Test observations with `probability_model` replaced by the
    /// recalibrated (and optionally shrunk) probability.
    fn recalibrate(
        &self,
        test: &[Observation],
        transforms: &BTreeMap<Scope, CalibrationCoefficients>,
    ) -> Vec<Observation> {
        test.iter()
            .map(|o| {
                let coefficients = coefficients_for(transforms, &o.sport, &o.bet_category);
                let mut p = apply_one(o.probability_model, coefficients);
                if let Some(alpha) = self.config.market_shrinkage {
                    p = shrink_toward_market(p, o.probability_market, alpha);
                }
                let mut recalibrated = o.clone();
                recalibrated.probability_model = p;
                recalibrated
            })
            .collect()
    }

    fn select_bets(
        &self,
        calibrated: &[Observation],
        recommended: &BTreeMap<String, f64>,
    ) -> Vec<GradedBet> {
        let staking = Staking {
            mode: self.config.staking,
            policy: self.config.kelly_policy.clone(),
        };
        let mut seen = HashSet::new();

        calibrated
            .iter()
            .filter(|o| self.config.sports.contains(&o.sport))
            .filter(|o| {
                self.config
                    .taxonomy
                    .categories_for(&o.sport)
                    .contains(&o.bet_category)
            })
            .filter(|o| {
                recommended
                    .get(&o.bet_category)
                    .is_some_and(|&threshold| qualifies(o, threshold))
            })
            .filter(|o| seen.insert(o.id))
            .filter_map(|o| grade(o, o.probability_model, &staking))
            .collect()
    }

    fn notes(
        &self,
        all: &ObservationSet,
        train: &[Observation],
        test: &[Observation],
        calibrated: &[Observation],
        sweep: &SweepReport,
    ) -> Vec<String> {
        let raw_brier = brier_score(&scoring_pairs(test.iter()));
        let calibrated_brier = brier_score(&scoring_pairs(calibrated.iter()));

        let mut notes = vec![
            format!(
                "observations: {} total, {} train, {} test",
                all.len(),
                train.len(),
                test.len()
            ),
            format!("test brier score: {raw_brier:.4} raw, {calibrated_brier:.4} calibrated"),
        ];
        if !sweep.unresolved.is_empty() {
            notes.push(format!(
                "no threshold reached {} bets for: {}",
                self.config.min_bets_for_selection,
                sweep.unresolved.join(", ")
            ));
        }
        if let Some(alpha) = self.config.market_shrinkage {
            notes.push(format!("market shrinkage alpha {alpha:.3} applied after scaling"));
        }
        notes
    }
}

fn scoring_pairs<'a>(observations: impl Iterator<Item = &'a Observation>) -> Vec<(f64, f64)> {
    observations
        .filter_map(|o| o.outcome.label().map(|y| (o.probability_model, y)))
        .collect()
}

/// One scalar per fitted scope, over the recalibrated test bets it covers.
fn variance_scalars(
    calibrated: &[Observation],
    transforms: &BTreeMap<Scope, CalibrationCoefficients>,
) -> BTreeMap<Scope, f64> {
    transforms
        .keys()
        .map(|scope| {
            let pairs = match scope {
                Scope::Global => scoring_pairs(calibrated.iter()),
                Scope::Segment {
                    sport,
                    bet_category,
                } => scoring_pairs(calibrated.iter().filter(|o| o.matches(sport, bet_category))),
            };
            (scope.clone(), variance_scalar(&pairs))
        })
        .collect()
}
