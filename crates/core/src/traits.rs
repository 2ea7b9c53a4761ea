use crate::error::Result;
use crate::observation::ObservationSet;
use async_trait::async_trait;

/// Supplies the fully materialized observation set for one run.
///
/// Sourcing is I/O-bound and lives outside the calibration core; the core
/// only ever sees the finished set.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn load(&self) -> Result<ObservationSet>;

    /// Human-readable origin, used in logs and pack notes.
    fn describe(&self) -> String;
}
