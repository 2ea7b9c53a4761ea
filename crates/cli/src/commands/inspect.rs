use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use edgecal_backtest::CalibrationPack;

use crate::report::ReportFormatter;

/// Arguments for the inspect command.
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Pack JSON file
    #[arg(short, long)]
    pub pack: PathBuf,

    /// Print the pack as JSON instead of a text summary
    #[arg(long)]
    pub json: bool,
}

/// Runs the inspect command.
///
/// # Errors
/// Returns an error if the pack cannot be read or parsed.
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let pack = CalibrationPack::load(&args.pack)
        .with_context(|| format!("reading pack {}", args.pack.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pack)?);
    } else {
        println!("{}", ReportFormatter::format_pack(&pack));
    }
    Ok(())
}
