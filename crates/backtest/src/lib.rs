pub mod calibration;
pub mod data_provider;
pub mod diagnostics;
pub mod grading;
pub mod metrics;
pub mod pack;
pub mod pipeline;
pub mod reliability;
pub mod significance;
pub mod split;
pub mod sweep;

pub use calibration::{
    apply, apply_one, coefficients_for, shrink_toward_market, CalibrationCoefficients,
    CalibrationFitter, FitReport, FitTermination,
};
pub use data_provider::CsvObservationSource;
pub use diagnostics::{BiasLabel, DiagnosticsAnalyzer, EdgeDiagnostics};
pub use grading::{grade, GradedBet, Staking};
pub use metrics::{MetricsCalculator, PerformanceMetrics, ProfitFactor};
pub use pack::{CalibrationPack, PackBuilder, PackMetrics, PackWriter};
pub use pipeline::{CalibrationRun, RunOutcome};
pub use reliability::{reliability_bins, variance_scalar, ReliabilityBin};
pub use significance::{effect_size, two_sample_test, BootstrapInterval, SignificanceTester, TwoSampleTest};
pub use split::{SplitPeriods, SplitValidator, ValidatedSplit};
pub use sweep::{SweepConfig, SweepReport, ThresholdResult, ThresholdSweepEngine};
