pub mod config;
pub mod config_loader;
pub mod error;
pub mod kelly;
pub mod observation;
pub mod odds;
pub mod stats;
pub mod traits;

pub use config::{BootstrapConfig, CalibrationConfig, CategoryTaxonomy, StakingMode};
pub use config_loader::ConfigLoader;
pub use error::{CalibrationError, Partition, Result};
pub use kelly::{KellyMethod, KellyPolicy};
pub use observation::{Observation, ObservationSet, Outcome, Period, Scope};
pub use stats::{clip_probability, logit, sigmoid, wilson_ci, PROB_EPSILON};
pub use traits::ObservationSource;
