//! Edge-threshold sweep over calibrated observations.
//!
//! For every `(threshold, sport, category)` cell the engine grades the bets
//! whose edge clears the threshold and reports their performance alongside
//! a bootstrap interval and a comparison against the bets that did not
//! qualify. A recommended threshold per category is chosen from the pooled
//! results across sports.
//!
//! Observations handed to [`ThresholdSweepEngine::run`] are expected to
//! carry their calibrated probability in `probability_model`.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use edgecal_core::{
    BootstrapConfig, CalibrationConfig, CategoryTaxonomy, KellyPolicy, Observation, StakingMode,
};

use crate::grading::{grade, GradedBet, Staking};
use crate::metrics::MetricsCalculator;
use crate::significance::{effect_size, two_sample_test, SignificanceTester};

/// Absorbs float error in `p_model - p_market` at threshold boundaries.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Edge thresholds in percentage points.
    pub thresholds: Vec<f64>,
    pub sports: Vec<String>,
    pub taxonomy: CategoryTaxonomy,
    /// Qualifying bets a threshold needs before it can be recommended.
    pub min_bets_for_selection: u32,
    pub bootstrap: BootstrapConfig,
    pub staking: StakingMode,
    pub kelly_policy: KellyPolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::from(&CalibrationConfig::default())
    }
}

impl From<&CalibrationConfig> for SweepConfig {
    fn from(config: &CalibrationConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            sports: config.sports.clone(),
            taxonomy: config.taxonomy.clone(),
            min_bets_for_selection: config.min_bets_for_selection,
            bootstrap: config.bootstrap.clone(),
            staking: config.staking,
            kelly_policy: config.kelly_policy.clone(),
        }
    }
}

/// Performance of one `(threshold, sport, category)` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    /// Edge threshold in percentage points.
    pub threshold: f64,
    pub sport: String,
    pub bet_category: String,
    /// Distinct observations in the scope before the edge filter.
    pub source_count: u32,
    pub num_bets: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub hit_rate: f64,
    pub roi: f64,
    pub max_drawdown: f64,
    pub confidence_lower: f64,
    pub confidence_upper: f64,
    pub p_value: f64,
    pub effect_size: f64,
}

impl ThresholdResult {
    fn empty(threshold: f64, sport: &str, bet_category: &str, source_count: u32) -> Self {
        Self {
            threshold,
            sport: sport.to_string(),
            bet_category: bet_category.to_string(),
            source_count,
            num_bets: 0,
            wins: 0,
            losses: 0,
            pushes: 0,
            hit_rate: 0.0,
            roi: 0.0,
            max_drawdown: 0.0,
            confidence_lower: 0.0,
            confidence_upper: 0.0,
            p_value: 1.0,
            effect_size: 0.0,
        }
    }
}

/// Output of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Threshold-major, then sport, then category, in configuration order.
    pub results: Vec<ThresholdResult>,
    /// Category to recommended threshold (percentage points).
    pub recommended: BTreeMap<String, f64>,
    /// Categories with no threshold meeting the selection minimum.
    pub unresolved: Vec<String>,
}

impl SweepReport {
    #[must_use]
    pub fn result_for(
        &self,
        threshold: f64,
        sport: &str,
        bet_category: &str,
    ) -> Option<&ThresholdResult> {
        self.results.iter().find(|r| {
            (r.threshold - threshold).abs() < f64::EPSILON
                && r.sport == sport
                && r.bet_category == bet_category
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Pooled {
    bets: u32,
    staked: Decimal,
    profit: Decimal,
}

impl Pooled {
    fn roi(&self) -> f64 {
        if self.staked <= Decimal::ZERO {
            return 0.0;
        }
        (self.profit / self.staked).to_f64().unwrap_or(0.0)
    }
}

/// True if the observation's edge clears `threshold` percentage points.
#[must_use]
pub fn qualifies(observation: &Observation, threshold: f64) -> bool {
    observation.edge() + EDGE_TOLERANCE >= threshold / 100.0
}

/// Grid search over edge thresholds.
#[derive(Debug, Clone)]
pub struct ThresholdSweepEngine {
    config: SweepConfig,
    tester: SignificanceTester,
}

impl ThresholdSweepEngine {
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        let tester = SignificanceTester::new(config.bootstrap.clone());
        Self { config, tester }
    }

    #[must_use]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    fn staking(&self) -> Staking {
        Staking {
            mode: self.config.staking,
            policy: self.config.kelly_policy.clone(),
        }
    }

    /// Runs every cell and selects recommended thresholds.
    #[must_use]
    pub fn run(&self, observations: &[Observation]) -> SweepReport {
        let staking = self.staking();
        let mut results = Vec::new();
        let mut pooled: BTreeMap<String, Vec<Pooled>> = BTreeMap::new();

        let scopes: Vec<(String, String, Vec<&Observation>)> = self
            .config
            .sports
            .iter()
            .flat_map(|sport| {
                self.config
                    .taxonomy
                    .categories_for(sport)
                    .into_iter()
                    .map(move |category| (sport.clone(), category))
            })
            .map(|(sport, category)| {
                let source = dedup_scope(observations, &sport, &category);
                (sport, category, source)
            })
            .collect();

        for (t_idx, &threshold) in self.config.thresholds.iter().enumerate() {
            for (sport, category, source) in &scopes {
                let (result, graded) = self.evaluate_cell(threshold, sport, category, source, &staking);

                let slots = pooled
                    .entry(category.clone())
                    .or_insert_with(|| vec![Pooled::default(); self.config.thresholds.len()]);
                let slot = &mut slots[t_idx];
                slot.bets += result.num_bets;
                slot.staked += graded.iter().map(|b| b.stake).sum::<Decimal>();
                slot.profit += graded.iter().map(|b| b.profit).sum::<Decimal>();

                results.push(result);
            }
        }

        let (recommended, unresolved) = self.select(&pooled);

        info!(
            cells = results.len(),
            recommended = recommended.len(),
            unresolved = unresolved.len(),
            "Threshold sweep complete"
        );

        SweepReport {
            results,
            recommended,
            unresolved,
        }
    }

    fn evaluate_cell(
        &self,
        threshold: f64,
        sport: &str,
        category: &str,
        source: &[&Observation],
        staking: &Staking,
    ) -> (ThresholdResult, Vec<GradedBet>) {
        let source_count = source.len() as u32;
        if source.is_empty() {
            debug!(threshold, sport, category, "No source observations");
            return (ThresholdResult::empty(threshold, sport, category, 0), Vec::new());
        }

        let (qualifying, rest): (Vec<&Observation>, Vec<&Observation>) =
            source.iter().copied().partition(|o| qualifies(o, threshold));

        let graded: Vec<GradedBet> = qualifying
            .iter()
            .filter_map(|o| grade(o, o.probability_model, staking))
            .collect();

        if graded.is_empty() {
            debug!(
                threshold,
                sport,
                category,
                source_count,
                "No qualifying bets"
            );
            return (
                ThresholdResult::empty(threshold, sport, category, source_count),
                graded,
            );
        }

        let metrics = MetricsCalculator::compute(&graded);
        let returns: Vec<f64> = graded.iter().map(GradedBet::unit_return).collect();
        let interval = self.tester.bootstrap(&returns);

        // Compare at flat stakes so the groups differ only by edge.
        let flat = Staking::flat();
        let baseline: Vec<f64> = rest
            .iter()
            .filter_map(|o| grade(o, o.probability_model, &flat))
            .map(|b| b.unit_return())
            .collect();
        let test = two_sample_test(&returns, &baseline);

        debug!(
            threshold,
            sport,
            category,
            source_count,
            bets = metrics.total_bets,
            roi = metrics.roi,
            p_value = test.p_value,
            "Evaluated sweep cell"
        );

        let result = ThresholdResult {
            threshold,
            sport: sport.to_string(),
            bet_category: category.to_string(),
            source_count,
            num_bets: metrics.total_bets,
            wins: metrics.wins,
            losses: metrics.losses,
            pushes: metrics.pushes,
            hit_rate: metrics.hit_rate,
            roi: metrics.roi,
            max_drawdown: metrics.max_drawdown,
            confidence_lower: interval.lower,
            confidence_upper: interval.upper,
            p_value: test.p_value,
            effect_size: effect_size(&returns, &baseline),
        };
        (result, graded)
    }

    /// Highest pooled ROI among thresholds with enough bets; ties keep the
    /// lower threshold.
    fn select(&self, pooled: &BTreeMap<String, Vec<Pooled>>) -> (BTreeMap<String, f64>, Vec<String>) {
        let mut recommended = BTreeMap::new();
        let mut unresolved = Vec::new();

        for (category, slots) in pooled {
            let best = self
                .config
                .thresholds
                .iter()
                .zip(slots)
                .filter(|(_, p)| p.bets >= self.config.min_bets_for_selection && p.bets > 0)
                .fold(None::<(f64, f64)>, |best, (&threshold, p)| {
                    let roi = p.roi();
                    match best {
                        Some((best_threshold, best_roi))
                            if best_roi > roi || (best_roi == roi && best_threshold <= threshold) =>
                        {
                            best
                        }
                        _ => Some((threshold, roi)),
                    }
                });

            match best {
                Some((threshold, roi)) => {
                    debug!(category = %category, threshold, roi, "Selected threshold");
                    recommended.insert(category.clone(), threshold);
                }
                None => {
                    warn!(
                        category = %category,
                        min_bets = self.config.min_bets_for_selection,
                        "No threshold met the selection minimum"
                    );
                    unresolved.push(category.clone());
                }
            }
        }

        (recommended, unresolved)
    }
}

/// Observations in scope with duplicate ids removed, first occurrence kept.
fn dedup_scope<'a>(
    observations: &'a [Observation],
    sport: &str,
    category: &str,
) -> Vec<&'a Observation> {
    let mut seen = HashSet::new();
    observations
        .iter()
        .filter(|o| o.matches(sport, category))
        .filter(|o| {
            let fresh = seen.insert(o.id);
            if !fresh {
                warn!(id = %o.id, sport, category, "Duplicate observation id, skipping");
            }
            fresh
        })
        .collect()
}
