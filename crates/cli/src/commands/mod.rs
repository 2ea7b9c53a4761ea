//! CLI commands for building and reading calibration packs.

pub mod calibrate;
pub mod inspect;

pub use calibrate::{run_calibrate, CalibrateArgs};
pub use inspect::{run_inspect, InspectArgs};
