use clap::{Parser, Subcommand};

mod commands;
mod report;

use commands::{CalibrateArgs, InspectArgs};

#[derive(Parser)]
#[command(name = "edgecal")]
#[command(about = "Probability calibration and threshold backtests for sports wagering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit transforms, sweep thresholds and write a calibration pack
    Calibrate(CalibrateArgs),
    /// Print a summary of an existing calibration pack
    Inspect(InspectArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let result = match cli.command {
        Commands::Calibrate(args) => commands::run_calibrate(args).await,
        Commands::Inspect(args) => commands::run_inspect(&args),
    };

    if let Err(e) = result {
        tracing::error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
