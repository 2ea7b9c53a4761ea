//! Calibrate command.
//!
//! Loads observations from CSV, runs a full calibration and writes the
//! resulting pack atomically.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use edgecal_backtest::{CalibrationRun, CsvObservationSource, PackWriter};
use edgecal_core::{ConfigLoader, ObservationSource};

use crate::report::ReportFormatter;

/// Arguments for the calibrate command.
#[derive(Args, Debug, Clone)]
pub struct CalibrateArgs {
    /// Observation CSV (date,sport,bet_category,probability_model,probability_market,outcome)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Calibration config file
    #[arg(short, long, default_value = "config/Calibration.toml")]
    pub config: PathBuf,

    /// Config profile overlay, e.g. `nfl` loads `Calibration.nfl.toml`
    #[arg(short, long, env = "EDGECAL_PROFILE")]
    pub profile: Option<String>,

    /// Output directory (overrides `output_dir` from config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Pack version (defaults to the run timestamp)
    #[arg(long)]
    pub pack_version: Option<String>,

    /// Run everything but skip writing the pack
    #[arg(long)]
    pub dry_run: bool,
}

/// Runs the calibrate command.
///
/// # Errors
/// Returns an error if the config is invalid, the input cannot be read, the
/// split leaves a partition empty, or the pack cannot be written.
pub async fn run_calibrate(args: CalibrateArgs) -> Result<()> {
    let config = match &args.profile {
        Some(profile) => ConfigLoader::load_with_profile(&args.config, profile)?,
        None => ConfigLoader::load(&args.config)?,
    };
    info!(league = %config.league, config = %args.config.display(), "Loaded configuration");

    let source = CsvObservationSource::new(&args.input);
    let observations = source
        .load()
        .await
        .with_context(|| format!("loading observations from {}", source.describe()))?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());

    let mut run = CalibrationRun::new(config).context("invalid calibration config")?;
    if let Some(version) = &args.pack_version {
        run = run.with_version(version.clone());
    }

    let outcome = run.execute(&observations).context("calibration run failed")?;

    println!("{}", ReportFormatter::format_run(&outcome));

    if args.dry_run {
        info!("Dry run, pack not written");
        return Ok(());
    }

    let path = PackWriter::write(&outcome.pack, &output_dir)
        .with_context(|| format!("writing pack to {}", output_dir.display()))?;
    println!("Pack written to {}", path.display());

    Ok(())
}
