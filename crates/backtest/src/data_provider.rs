use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use edgecal_core::odds::{parse_american, to_probability};
use edgecal_core::traits::ObservationSource;
use edgecal_core::{CalibrationError, Observation, ObservationSet, Outcome, Result};

/// One CSV record. Columns not listed here are ignored.
#[derive(Debug, Deserialize)]
struct ObservationRow {
    date: NaiveDate,
    sport: String,
    bet_category: String,
    probability_model: f64,
    #[serde(default)]
    probability_market: Option<f64>,
    outcome: String,
    #[serde(default)]
    stake: Option<String>,
    #[serde(default)]
    american_odds: Option<String>,
    #[serde(default)]
    id: Option<Uuid>,
}

impl ObservationRow {
    fn into_observation(self) -> Result<Observation> {
        let odds = match self.american_odds.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_american(raw)?),
            _ => None,
        };

        let market = match (self.probability_market, odds) {
            (Some(p), _) => p,
            (None, Some(o)) => to_probability(o)?,
            (None, None) => {
                return Err(CalibrationError::InvalidObservation(
                    "needs probability_market or american_odds".into(),
                ))
            }
        };

        let outcome = Outcome::from_str(&self.outcome)?;
        let mut observation = Observation::new(
            self.date,
            self.sport.trim(),
            self.bet_category.trim(),
            self.probability_model,
            market,
            outcome,
        )?;

        if let Some(raw) = self.stake.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let stake = Decimal::from_str(raw).map_err(|e| {
                CalibrationError::InvalidObservation(format!("stake '{raw}': {e}"))
            })?;
            if stake <= Decimal::ZERO {
                return Err(CalibrationError::InvalidObservation(format!(
                    "stake {stake} must be positive"
                )));
            }
            observation = observation.with_stake(stake);
        }
        if let Some(o) = odds {
            observation = observation.with_odds(o);
        }
        if let Some(id) = self.id {
            observation.id = id;
        }
        Ok(observation)
    }
}

/// Loads labeled observations from a headed CSV file.
///
/// Required columns: `date,sport,bet_category,probability_model,outcome`
/// plus `probability_market` or `american_odds`.
pub struct CsvObservationSource {
    path: PathBuf,
}

impl CsvObservationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns `InvalidObservation` naming the 1-based data row when:
    /// - A required column is missing or unparseable
    /// - A probability is outside (0, 1)
    /// - The outcome is not win/loss/push
    ///
    /// Returns `InvalidOdds` for malformed American odds.
    pub fn parse<R: Read>(reader: R) -> Result<ObservationSet> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut observations = Vec::new();

        for (idx, row) in reader.deserialize::<ObservationRow>().enumerate() {
            let line = idx + 1;
            let row = row
                .map_err(|e| CalibrationError::InvalidObservation(format!("row {line}: {e}")))?;
            let observation = row.into_observation().map_err(|e| match e {
                CalibrationError::InvalidObservation(msg) => {
                    CalibrationError::InvalidObservation(format!("row {line}: {msg}"))
                }
                other => other,
            })?;
            observations.push(observation);
        }

        // ObservationSet sorts chronologically
        Ok(ObservationSet::new(observations))
    }
}

#[async_trait]
impl ObservationSource for CsvObservationSource {
    async fn load(&self) -> Result<ObservationSet> {
        let raw = tokio::fs::read(&self.path).await?;
        let set = Self::parse(raw.as_slice())?;

        info!(
            path = %self.path.display(),
            observations = set.len(),
            sports = set.sports().len(),
            "Loaded observations"
        );
        Ok(set)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const HEADER: &str =
        "date,sport,bet_category,probability_model,probability_market,outcome,stake,american_odds,id,notes\n";

    #[test]
    fn parses_and_sorts_rows() {
        let csv = format!(
            "{HEADER}\
             2024-01-03,basketball,points,0.61,0.55,win,,,,late line\n\
             2024-01-01,football,spread,0.58,0.52,loss,250,,,\n"
        );
        let set = CsvObservationSource::parse(csv.as_bytes()).unwrap();

        assert_eq!(set.len(), 2);
        let first = &set.as_slice()[0];
        assert_eq!(first.sport, "football");
        assert_eq!(first.stake, dec!(250));
        assert_eq!(set.as_slice()[1].stake, dec!(100));
        assert_eq!(set.as_slice()[1].outcome, Outcome::Win);
    }

    #[test]
    fn market_derived_from_odds_when_missing() {
        let csv = format!("{HEADER}2024-01-01,football,total,0.6,,push,,-150,,\n");
        let set = CsvObservationSource::parse(csv.as_bytes()).unwrap();
        let o = &set.as_slice()[0];

        assert!((o.probability_market - 0.6).abs() < 1e-12);
        assert_eq!(o.american_odds, Some(-150.0));
        assert_eq!(o.outcome, Outcome::Push);
    }

    #[test]
    fn explicit_id_is_kept() {
        let id = Uuid::new_v4();
        let csv = format!("{HEADER}2024-01-01,football,total,0.6,0.5,win,,,{id},\n");
        let set = CsvObservationSource::parse(csv.as_bytes()).unwrap();
        assert_eq!(set.as_slice()[0].id, id);
    }

    #[test]
    fn minimal_columns_are_enough() {
        let csv = "date,sport,bet_category,probability_model,probability_market,outcome\n\
                   2024-02-10,basketball,rebounds,0.57,0.5,W\n";
        let set = CsvObservationSource::parse(csv.as_bytes()).unwrap();
        assert_eq!(set.as_slice()[0].outcome, Outcome::Win);
    }

    #[test]
    fn missing_market_and_odds_rejected_with_row() {
        let csv = format!(
            "{HEADER}2024-01-01,football,total,0.6,0.5,win,,,,\n2024-01-02,football,total,0.6,,win,,,,\n"
        );
        let err = CsvObservationSource::parse(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
    }

    #[test]
    fn rows_with_unkeyable_names_rejected() {
        let slash = format!("{HEADER}2024-01-01,ncaa/football,spread,0.6,0.5,win,,,,\n");
        let err = CsvObservationSource::parse(slash.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 1"), "{err}");

        let blank = format!("{HEADER}2024-01-01,basketball,  ,0.6,0.5,win,,,,\n");
        assert!(CsvObservationSource::parse(blank.as_bytes()).is_err());
    }

    #[test]
    fn bad_odds_and_probabilities_rejected() {
        let odds = format!("{HEADER}2024-01-01,football,total,0.6,,win,,abc,,\n");
        assert!(matches!(
            CsvObservationSource::parse(odds.as_bytes()),
            Err(CalibrationError::InvalidOdds(_))
        ));

        let prob = format!("{HEADER}2024-01-01,football,total,1.2,0.5,win,,,,\n");
        assert!(matches!(
            CsvObservationSource::parse(prob.as_bytes()),
            Err(CalibrationError::InvalidObservation(_))
        ));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}2024-01-01,football,total,0.6,0.5,loss,,,,").unwrap();

        let source = CsvObservationSource::new(file.path());
        let set = source.load().await.unwrap();
        assert_eq!(set.len(), 1);
        assert!(source.describe().starts_with("csv:"));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = CsvObservationSource::new("/nonexistent/edgecal/input.csv");
        assert!(matches!(source.load().await, Err(CalibrationError::Io(_))));
    }
}
