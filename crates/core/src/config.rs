use std::collections::BTreeMap;
use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};
use crate::kelly::KellyPolicy;

/// Parameters for one calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// League label stamped on the pack (e.g. "nba").
    pub league: String,
    /// Fraction of the date range used for training.
    pub train_fraction: f64,
    /// Candidate edge thresholds, in percent.
    pub thresholds: Vec<f64>,
    pub sports: Vec<String>,
    pub taxonomy: CategoryTaxonomy,
    /// Graded observations needed before a segment gets its own fit.
    pub min_fit_samples: usize,
    /// Qualifying bets needed before a threshold can be recommended.
    pub min_bets_for_selection: u32,
    pub bootstrap: BootstrapConfig,
    pub kelly_policy: KellyPolicy,
    pub staking: StakingMode,
    /// Optional blend weight toward the market after Platt scaling.
    pub market_shrinkage: Option<f64>,
    pub reliability_bins: usize,
    pub output_dir: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            league: "nba".to_string(),
            train_fraction: 0.7,
            thresholds: vec![1.0, 2.0, 3.0, 4.0, 5.0, 7.5, 10.0],
            sports: vec!["basketball".to_string(), "football".to_string()],
            taxonomy: CategoryTaxonomy::default(),
            min_fit_samples: 200,
            min_bets_for_selection: 30,
            bootstrap: BootstrapConfig::default(),
            kelly_policy: KellyPolicy::default(),
            staking: StakingMode::Flat,
            market_shrinkage: None,
            reliability_bins: 10,
            output_dir: PathBuf::from("packs"),
        }
    }
}

impl CalibrationConfig {
    /// Rejects parameter combinations no run can use.
    ///
    /// # Errors
    /// Returns `InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.league.trim().is_empty() {
            return Err(invalid("league must not be empty"));
        }
        if self.thresholds.is_empty() {
            return Err(invalid("thresholds must not be empty"));
        }
        if self.thresholds.iter().any(|t| !t.is_finite()) {
            return Err(invalid("thresholds must be finite"));
        }
        if self.sports.is_empty() {
            return Err(invalid("sports must not be empty"));
        }
        if !self.train_fraction.is_finite() {
            return Err(invalid("train_fraction must be finite"));
        }
        let confidence = self.bootstrap.confidence_level;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(invalid("bootstrap.confidence_level must be in (0, 1)"));
        }
        if self.bootstrap.iterations == 0 {
            return Err(invalid("bootstrap.iterations must be positive"));
        }
        if self.reliability_bins == 0 {
            return Err(invalid("reliability_bins must be positive"));
        }
        if let Some(alpha) = self.market_shrinkage {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(invalid("market_shrinkage must be in [0, 1]"));
            }
        }
        if let StakingMode::Kelly { bankroll } = self.staking {
            if bankroll <= Decimal::ZERO {
                return Err(invalid("staking.bankroll must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> CalibrationError {
    CalibrationError::InvalidConfig(message.to_string())
}

/// Bet-category partition swept per sport.
///
/// Game-level markets apply to every sport; prop markets are sport specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTaxonomy {
    pub game: Vec<String>,
    pub props: BTreeMap<String, Vec<String>>,
}

impl Default for CategoryTaxonomy {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        let mut props = BTreeMap::new();
        props.insert(
            "basketball".to_string(),
            strings(&["points", "rebounds", "assists"]),
        );
        props.insert(
            "football".to_string(),
            strings(&["passing_yards", "rushing_yards", "touchdowns"]),
        );
        Self {
            game: strings(&["moneyline", "spread", "total"]),
            props,
        }
    }
}

impl CategoryTaxonomy {
    /// Game-level categories followed by the sport's prop categories.
    #[must_use]
    pub fn categories_for(&self, sport: &str) -> Vec<String> {
        let mut categories = self.game.clone();
        if let Some(props) = self.props.get(sport) {
            categories.extend(props.iter().cloned());
        }
        categories
    }
}

/// Bootstrap resampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub iterations: usize,
    pub confidence_level: f64,
    /// Fixed seed for reproducible intervals.
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: 2_000,
            confidence_level: 0.95,
            seed: Some(7),
        }
    }
}

/// How backtest stakes are determined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StakingMode {
    /// Use each observation's recorded stake.
    Flat,
    /// Resize every stake with the Kelly policy against a fixed bankroll.
    Kelly { bankroll: Decimal },
}
