//! Chronological train/test split validation.
//!
//! Splits a date range into a training window and a strictly later test
//! window, then checks both windows against the actual observations. An empty
//! partition is a hard stop: no fit runs and no pack is produced.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use edgecal_core::{CalibrationError, Observation, ObservationSet, Partition, Period, Result};

/// The two date windows of a split, before data is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPeriods {
    pub train: Period,
    pub test: Period,
}

/// A split whose partitions were confirmed non-empty.
#[derive(Debug, Clone)]
pub struct ValidatedSplit {
    pub periods: SplitPeriods,
    pub train: Vec<Observation>,
    pub test: Vec<Observation>,
}

impl ValidatedSplit {
    #[must_use]
    pub fn train_period(&self) -> Period {
        self.periods.train
    }

    #[must_use]
    pub fn test_period(&self) -> Period {
        self.periods.test
    }
}

/// Partitions observations into non-overlapping chronological windows.
#[derive(Debug, Clone, Copy)]
pub struct SplitValidator {
    train_fraction: f64,
}

impl SplitValidator {
    /// Creates a validator for the given train fraction.
    ///
    /// Fractions outside `[0, 1]` are clamped with a warning.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a NaN or infinite fraction.
    pub fn new(train_fraction: f64) -> Result<Self> {
        if !train_fraction.is_finite() {
            return Err(CalibrationError::InvalidConfig(format!(
                "train fraction {train_fraction} is not finite"
            )));
        }

        let clamped = train_fraction.clamp(0.0, 1.0);
        if (clamped - train_fraction).abs() > f64::EPSILON {
            warn!(
                requested = train_fraction,
                clamped, "Train fraction outside [0, 1], clamping"
            );
        }

        Ok(Self {
            train_fraction: clamped,
        })
    }

    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Computes the train and test windows for `[start, end]`.
    ///
    /// ```text
    /// train_end  = start + floor(f * (end - start) days)
    /// test_start = train_end + 1 day
    /// ```
    ///
    /// # Errors
    /// Returns `InvalidConfig` when `end` precedes `start`.
    pub fn periods(&self, start: NaiveDate, end: NaiveDate) -> Result<SplitPeriods> {
        if end < start {
            return Err(CalibrationError::InvalidConfig(format!(
                "split end {end} precedes start {start}"
            )));
        }

        let total_days = (end - start).num_days();
        let train_days = (self.train_fraction * total_days as f64).floor() as i64;
        let train_end = start + Duration::days(train_days);
        let test_start = train_end + Duration::days(1);

        Ok(SplitPeriods {
            train: Period::new(start, train_end),
            test: Period::new(test_start, end),
        })
    }

    /// Splits the observation set over its own date range.
    ///
    /// # Errors
    /// `DataSufficiency` when the set is empty or either partition is empty.
    pub fn split(&self, observations: &ObservationSet) -> Result<ValidatedSplit> {
        let Some(range) = observations.date_range() else {
            let today = chrono::Utc::now().date_naive();
            return Err(CalibrationError::DataSufficiency {
                partition: Partition::Train,
                start: today,
                end: today,
            });
        };
        self.split_range(observations, range.start, range.end)
    }

    /// Splits an explicit date range, confirming both partitions hold data.
    ///
    /// # Errors
    /// `InvalidConfig` for an inverted range, `DataSufficiency` for an empty
    /// partition.
    pub fn split_range(
        &self,
        observations: &ObservationSet,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ValidatedSplit> {
        let periods = self.periods(start, end)?;

        let train = observations.between(periods.train.start, periods.train.end);
        if train.is_empty() {
            return Err(CalibrationError::DataSufficiency {
                partition: Partition::Train,
                start: periods.train.start,
                end: periods.train.end,
            });
        }

        let test = if periods.test.start > periods.test.end {
            Vec::new()
        } else {
            observations.between(periods.test.start, periods.test.end)
        };
        if test.is_empty() {
            return Err(CalibrationError::DataSufficiency {
                partition: Partition::Test,
                start: periods.test.start,
                end: periods.test.end,
            });
        }

        info!(
            train_start = %periods.train.start,
            train_end = %periods.train.end,
            test_start = %periods.test.start,
            test_end = %periods.test.end,
            train_count = train.len(),
            test_count = test.len(),
            "Validated chronological split"
        );

        Ok(ValidatedSplit {
            periods,
            train,
            test,
        })
    }
}
