//! Versioned calibration packs.
//!
//! A pack bundles everything a downstream consumer needs from one run:
//! per-scope Platt transforms, recommended edge thresholds, staking policy,
//! test-period metrics and the full sweep table. Packs are immutable; a new
//! run produces a new version.
//!
//! # Persistence
//!
//! Packs are pretty-printed JSON written to `<league>_<version>.json`. Writes
//! go to a hidden temp file in the target directory, are synced, then renamed
//! over the final path, so a failed write leaves nothing behind. Fields this
//! version does not know about are carried through parse and serialize.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use edgecal_core::{CalibrationError, KellyPolicy, Period, Result, Scope};

use crate::calibration::CalibrationCoefficients;
use crate::diagnostics::EdgeDiagnostics;
use crate::metrics::PerformanceMetrics;
use crate::reliability::ReliabilityBin;
use crate::sweep::ThresholdResult;

/// Test-period metrics as published in a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackMetrics {
    pub roi: f64,
    pub sharpe: f64,
    pub hit_rate: f64,
    pub total_bets: u32,
    pub brier_score: f64,
    pub log_loss: f64,
    pub max_drawdown: f64,
    pub winning_bets: u32,
    pub losing_bets: u32,
    pub push_bets: u32,
    pub total_staked: Decimal,
    pub total_profit: Decimal,
}

impl From<&PerformanceMetrics> for PackMetrics {
    fn from(m: &PerformanceMetrics) -> Self {
        Self {
            roi: m.roi,
            sharpe: m.sharpe,
            hit_rate: m.hit_rate,
            total_bets: m.total_bets,
            brier_score: m.brier_score,
            log_loss: m.log_loss,
            max_drawdown: m.max_drawdown,
            winning_bets: m.wins,
            losing_bets: m.losses,
            push_bets: m.pushes,
            total_staked: m.total_staked,
            total_profit: m.total_profit,
        }
    }
}

/// A complete calibration artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPack {
    pub version: String,
    pub league: String,
    pub generated_at: DateTime<Utc>,
    pub backtest_period: Period,
    pub train_period: Period,
    pub test_period: Period,
    /// Category to minimum edge, in percentage points.
    pub edge_thresholds: BTreeMap<String, f64>,
    pub variance_scalars: BTreeMap<Scope, f64>,
    pub kelly_policy: KellyPolicy,
    pub probability_transforms: BTreeMap<Scope, CalibrationCoefficients>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_shrinkage: Option<f64>,
    pub metrics: PackMetrics,
    #[serde(default)]
    pub reliability_bins: Vec<ReliabilityBin>,
    #[serde(default)]
    pub threshold_results: Vec<ThresholdResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<EdgeDiagnostics>,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Fields written by other versions.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CalibrationPack {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    /// `Serialization` if a value cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    /// `Serialization` on malformed or incomplete JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads a pack from disk.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `Serialization` if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// `<league>_<version>.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.league, self.version)
    }

    /// Transform for a segment, falling back to global then identity.
    #[must_use]
    pub fn transform_for(&self, sport: &str, bet_category: &str) -> CalibrationCoefficients {
        crate::calibration::coefficients_for(&self.probability_transforms, sport, bet_category)
    }
}

/// Collects run outputs into a [`CalibrationPack`].
#[derive(Debug, Clone, Default)]
pub struct PackBuilder {
    league: Option<String>,
    version: Option<String>,
    generated_at: Option<DateTime<Utc>>,
    backtest_period: Option<Period>,
    train_period: Option<Period>,
    test_period: Option<Period>,
    edge_thresholds: BTreeMap<String, f64>,
    variance_scalars: BTreeMap<Scope, f64>,
    kelly_policy: KellyPolicy,
    probability_transforms: BTreeMap<Scope, CalibrationCoefficients>,
    market_shrinkage: Option<f64>,
    metrics: Option<PackMetrics>,
    reliability_bins: Vec<ReliabilityBin>,
    threshold_results: Vec<ThresholdResult>,
    diagnostics: Option<EdgeDiagnostics>,
    notes: Vec<String>,
}

impl PackBuilder {
    #[must_use]
    pub fn new(league: impl Into<String>) -> Self {
        Self {
            league: Some(league.into()),
            ..Self::default()
        }
    }

    /// Overrides the timestamp-derived version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    #[must_use]
    pub fn periods(mut self, backtest: Period, train: Period, test: Period) -> Self {
        self.backtest_period = Some(backtest);
        self.train_period = Some(train);
        self.test_period = Some(test);
        self
    }

    #[must_use]
    pub fn edge_thresholds(mut self, thresholds: BTreeMap<String, f64>) -> Self {
        self.edge_thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn variance_scalars(mut self, scalars: BTreeMap<Scope, f64>) -> Self {
        self.variance_scalars = scalars;
        self
    }

    #[must_use]
    pub fn kelly_policy(mut self, policy: KellyPolicy) -> Self {
        self.kelly_policy = policy;
        self
    }

    #[must_use]
    pub fn transforms(mut self, transforms: BTreeMap<Scope, CalibrationCoefficients>) -> Self {
        self.probability_transforms = transforms;
        self
    }

    #[must_use]
    pub fn market_shrinkage(mut self, alpha: Option<f64>) -> Self {
        self.market_shrinkage = alpha;
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: &PerformanceMetrics) -> Self {
        self.metrics = Some(PackMetrics::from(metrics));
        self
    }

    #[must_use]
    pub fn reliability_bins(mut self, bins: Vec<ReliabilityBin>) -> Self {
        self.reliability_bins = bins;
        self
    }

    #[must_use]
    pub fn threshold_results(mut self, results: Vec<ThresholdResult>) -> Self {
        self.threshold_results = results;
        self
    }

    #[must_use]
    pub fn diagnostics(mut self, diagnostics: EdgeDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Validates and freezes the pack.
    ///
    /// # Errors
    /// `InvalidConfig` when the league or version is empty, a period is
    /// missing, or training does not end strictly before testing starts.
    pub fn build(self) -> Result<CalibrationPack> {
        let league = self.league.unwrap_or_default();
        if league.trim().is_empty() {
            return Err(CalibrationError::InvalidConfig("pack league is empty".into()));
        }

        let (Some(backtest_period), Some(train_period), Some(test_period)) =
            (self.backtest_period, self.train_period, self.test_period)
        else {
            return Err(CalibrationError::InvalidConfig("pack periods not set".into()));
        };
        if train_period.end >= test_period.start {
            return Err(CalibrationError::InvalidConfig(format!(
                "train period ends {} but test period starts {}",
                train_period.end, test_period.start
            )));
        }

        if let Some(scope) = self
            .probability_transforms
            .keys()
            .chain(self.variance_scalars.keys())
            .find(|scope| !scope.is_well_formed())
        {
            return Err(CalibrationError::InvalidConfig(format!(
                "scope {scope:?} cannot be written as a pack key"
            )));
        }

        let generated_at = self.generated_at.unwrap_or_else(Utc::now);
        let version = self
            .version
            .unwrap_or_else(|| generated_at.format("%Y%m%dT%H%M%S").to_string());
        if version.trim().is_empty() {
            return Err(CalibrationError::InvalidConfig("pack version is empty".into()));
        }

        Ok(CalibrationPack {
            version,
            league,
            generated_at,
            backtest_period,
            train_period,
            test_period,
            edge_thresholds: self.edge_thresholds,
            variance_scalars: self.variance_scalars,
            kelly_policy: self.kelly_policy,
            probability_transforms: self.probability_transforms,
            market_shrinkage: self.market_shrinkage,
            metrics: self
                .metrics
                .unwrap_or_else(|| PackMetrics::from(&PerformanceMetrics::empty())),
            reliability_bins: self.reliability_bins,
            threshold_results: self.threshold_results,
            diagnostics: self.diagnostics,
            notes: self.notes,
            extra: BTreeMap::new(),
        })
    }
}

/// All-or-nothing pack persistence.
pub struct PackWriter;

impl PackWriter {
    /// Writes `pack` into `dir`, creating the directory if needed.
    ///
    /// Returns the final path.
    ///
    /// # Errors
    /// `Serialization` or `Io`; no file is left behind in either case.
    pub fn write(pack: &CalibrationPack, dir: &Path) -> Result<PathBuf> {
        let json = pack.to_json()?;
        fs::create_dir_all(dir)?;

        let final_path = dir.join(pack.file_name());
        let tmp_path = dir.join(format!(".{}.tmp", pack.file_name()));

        if let Err(e) = write_synced(&tmp_path, json.as_bytes())
            .and_then(|()| fs::rename(&tmp_path, &final_path))
        {
            // Best effort; the original error is what matters.
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!(bytes = json.len(), "Pack bytes written");
        info!(
            league = %pack.league,
            version = %pack.version,
            path = %final_path.display(),
            "Calibration pack written"
        );
        Ok(final_path)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
