//! Labeled historical bet observations.
//!
//! An observation pairs a model probability with the market-implied
//! probability at bet time and the realized outcome. Observations are
//! immutable once graded; the set keeps them in chronological order.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{CalibrationError, Result};

/// Realized result of a graded bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    /// Neither win nor loss; stake returned.
    Push,
}

impl Outcome {
    /// Binary label for scoring rules. Pushes carry no label.
    #[must_use]
    pub fn label(self) -> Option<f64> {
        match self {
            Self::Win => Some(1.0),
            Self::Loss => Some(0.0),
            Self::Push => None,
        }
    }
}

impl FromStr for Outcome {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "win" | "w" | "1" => Ok(Self::Win),
            "loss" | "l" | "0" => Ok(Self::Loss),
            "push" | "p" | "void" => Ok(Self::Push),
            other => Err(CalibrationError::InvalidObservation(format!(
                "unknown outcome '{other}'"
            ))),
        }
    }
}

/// A single historical bet with model and market probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub date: NaiveDate,
    pub sport: String,
    pub bet_category: String,
    /// Model probability of the bet winning, in (0, 1).
    pub probability_model: f64,
    /// Market-implied probability at bet time, in (0, 1).
    pub probability_market: f64,
    pub outcome: Outcome,
    pub stake: Decimal,
    /// Quoted American odds, when the source recorded them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub american_odds: Option<f64>,
}

impl Observation {
    /// Creates an observation with a fresh id and a 100 unit stake.
    ///
    /// # Errors
    /// Returns `InvalidObservation` when either probability is outside (0, 1)
    /// or the sport or category is not a valid scope name.
    pub fn new(
        date: NaiveDate,
        sport: impl Into<String>,
        bet_category: impl Into<String>,
        probability_model: f64,
        probability_market: f64,
        outcome: Outcome,
    ) -> Result<Self> {
        let sport = sport.into();
        let bet_category = bet_category.into();
        for (field, name) in [("sport", &sport), ("bet_category", &bet_category)] {
            if let Err(reason) = Scope::check_name(name) {
                return Err(CalibrationError::InvalidObservation(format!("{field}: {reason}")));
            }
        }
        for (name, p) in [("model", probability_model), ("market", probability_market)] {
            if !(p > 0.0 && p < 1.0) {
                return Err(CalibrationError::InvalidObservation(format!(
                    "{name} probability {p} outside (0, 1)"
                )));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            date,
            sport,
            bet_category,
            probability_model,
            probability_market,
            outcome,
            stake: Decimal::ONE_HUNDRED,
            american_odds: None,
        })
    }

    #[must_use]
    pub fn with_stake(mut self, stake: Decimal) -> Self {
        self.stake = stake;
        self
    }

    #[must_use]
    pub fn with_odds(mut self, american_odds: f64) -> Self {
        self.american_odds = Some(american_odds);
        self
    }

    /// Model probability minus market-implied probability.
    #[must_use]
    pub fn edge(&self) -> f64 {
        self.probability_model - self.probability_market
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::segment(&self.sport, &self.bet_category)
    }

    #[must_use]
    pub fn matches(&self, sport: &str, bet_category: &str) -> bool {
        self.sport == sport && self.bet_category == bet_category
    }
}

/// Inclusive calendar window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Fully materialized, chronologically ordered observations.
#[derive(Debug, Clone, Default)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    /// Builds a set, sorting by date. Ties keep their input order.
    #[must_use]
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        Self { observations }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    /// First and last observation dates, if any.
    #[must_use]
    pub fn date_range(&self) -> Option<Period> {
        let first = self.observations.first()?;
        let last = self.observations.last()?;
        Some(Period::new(first.date, last.date))
    }

    /// Observations dated within `[start, end]`.
    #[must_use]
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Observation> {
        self.observations
            .iter()
            .filter(|o| o.date >= start && o.date <= end)
            .cloned()
            .collect()
    }

    /// Observations for one (sport, category) scope.
    #[must_use]
    pub fn for_scope(&self, sport: &str, bet_category: &str) -> Vec<&Observation> {
        self.observations
            .iter()
            .filter(|o| o.matches(sport, bet_category))
            .collect()
    }

    /// Distinct sports present, sorted.
    #[must_use]
    pub fn sports(&self) -> BTreeSet<String> {
        self.observations.iter().map(|o| o.sport.clone()).collect()
    }
}

impl From<Vec<Observation>> for ObservationSet {
    fn from(observations: Vec<Observation>) -> Self {
        Self::new(observations)
    }
}

/// Key under which calibration artifacts are stored.
///
/// Renders as `global` or `<sport>/<category>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Global,
    Segment { sport: String, bet_category: String },
}

impl Scope {
    #[must_use]
    pub fn segment(sport: &str, bet_category: &str) -> Self {
        Self::Segment {
            sport: sport.to_string(),
            bet_category: bet_category.to_string(),
        }
    }

    /// Whether `name` can be a sport or category in a `sport/category` key.
    ///
    /// # Errors
    /// Returns the reason when the name is empty or contains `/`.
    pub fn check_name(name: &str) -> std::result::Result<(), String> {
        if name.is_empty() {
            Err("name is empty".to_string())
        } else if name.contains('/') {
            Err(format!("'{name}' contains '/'"))
        } else {
            Ok(())
        }
    }

    /// True when the rendered key parses back to the same scope.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Global => true,
            Self::Segment {
                sport,
                bet_category,
            } => Self::check_name(sport).is_ok() && Self::check_name(bet_category).is_ok(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Segment {
                sport,
                bet_category,
            } => write!(f, "{sport}/{bet_category}"),
        }
    }
}

impl FromStr for Scope {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "global" {
            return Ok(Self::Global);
        }
        match s.split_once('/') {
            Some((sport, category)) if !sport.is_empty() && !category.is_empty() => {
                Ok(Self::segment(sport, category))
            }
            _ => Err(CalibrationError::InvalidConfig(format!("malformed scope '{s}'"))),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
