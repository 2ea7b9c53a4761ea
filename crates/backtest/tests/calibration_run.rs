//! End-to-end calibration runs over synthetic observation sets.
//!
//! The synthetic model is deliberately overconfident: its log-odds are the
//! true log-odds stretched by 1.8, so a correct fit should shrink them.

use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use edgecal_backtest::{
    CalibrationPack, CalibrationRun, CsvObservationSource, FitTermination, PackWriter,
};
use edgecal_core::{
    logit, sigmoid, CalibrationConfig, Observation, ObservationSet, ObservationSource, Outcome,
    Scope,
};

// =============================================================================
// Helper Functions
// =============================================================================

const CATEGORIES: [(&str, &str); 4] = [
    ("basketball", "spread"),
    ("basketball", "points"),
    ("football", "total"),
    ("football", "spread"),
];

fn synthetic_set(seed: u64, days: i64, per_day: usize) -> ObservationSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap();
    let mut observations = Vec::new();

    for day in 0..days {
        for _ in 0..per_day {
            let (sport, category) = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
            let market: f64 = rng.gen_range(0.3..0.7);
            let p_true = (market + rng.gen_range(-0.05..0.10)).clamp(0.05, 0.95);
            let model = sigmoid(1.8 * logit(p_true)).clamp(0.01, 0.99);

            let outcome = if rng.gen_bool(0.04) {
                Outcome::Push
            } else if rng.gen_bool(p_true) {
                Outcome::Win
            } else {
                Outcome::Loss
            };

            observations.push(
                Observation::new(start + Duration::days(day), sport, category, model, market, outcome)
                    .unwrap(),
            );
        }
    }
    ObservationSet::new(observations)
}

fn config() -> CalibrationConfig {
    CalibrationConfig {
        league: "synthetic".to_string(),
        min_fit_samples: 120,
        min_bets_for_selection: 20,
        ..CalibrationConfig::default()
    }
}

// =============================================================================
// Full Run
// =============================================================================

#[test]
fn overconfident_model_is_shrunk() {
    let set = synthetic_set(3, 200, 5);
    let outcome = CalibrationRun::new(config()).unwrap().execute(&set).unwrap();

    let global = outcome.fit_reports.get(&Scope::Global).unwrap();
    assert_eq!(global.termination, FitTermination::Converged);
    assert!(
        global.coefficients.a > 0.3 && global.coefficients.a < 0.85,
        "slope {}",
        global.coefficients.a
    );

    let pack = &outcome.pack;
    assert!(pack.train_period.end < pack.test_period.start);
    assert_eq!(pack.backtest_period.start, set.date_range().unwrap().start);
    assert!(pack.probability_transforms.len() > 1, "segments should get their own fits");
}

#[test]
fn sweep_table_covers_every_cell() {
    let cfg = config();
    let expected_cells: usize = cfg.thresholds.len()
        * cfg
            .sports
            .iter()
            .map(|s| cfg.taxonomy.categories_for(s).len())
            .sum::<usize>();

    let outcome = CalibrationRun::new(cfg)
        .unwrap()
        .execute(&synthetic_set(5, 200, 5))
        .unwrap();

    assert_eq!(outcome.pack.threshold_results.len(), expected_cells);
    for result in &outcome.pack.threshold_results {
        assert!(result.num_bets <= result.source_count);
        assert_eq!(result.wins + result.losses + result.pushes, result.num_bets);
        assert!((0.0..=1.0).contains(&result.p_value));
    }
    // Categories with no data at all can never be recommended.
    assert!(outcome.sweep.unresolved.contains(&"moneyline".to_string()));
}

#[test]
fn selected_bets_respect_recommended_thresholds() {
    let cfg = CalibrationConfig {
        thresholds: vec![0.0, 2.0, 5.0],
        ..config()
    };
    let taxonomy = cfg.taxonomy.clone();

    // Points is a basketball prop; football/points rows are outside the sweep.
    let mut observations: Vec<Observation> = synthetic_set(8, 200, 5).iter().cloned().collect();
    let strays: Vec<Observation> = observations
        .iter()
        .filter(|o| o.sport == "basketball" && o.bet_category == "points")
        .map(|o| {
            Observation::new(
                o.date,
                "football",
                "points",
                o.probability_model,
                o.probability_market,
                o.outcome,
            )
            .unwrap()
        })
        .collect();
    assert!(!strays.is_empty());
    observations.extend(strays);

    let outcome = CalibrationRun::new(cfg)
        .unwrap()
        .execute(&ObservationSet::new(observations))
        .unwrap();

    let thresholds = &outcome.pack.edge_thresholds;
    assert!(thresholds.contains_key("points"));
    for bet in &outcome.selected_bets {
        let threshold = thresholds.get(&bet.bet_category).unwrap();
        assert!(bet.edge + 1e-9 >= threshold / 100.0);
        assert!(bet.date >= outcome.pack.test_period.start);
        assert!(
            taxonomy.categories_for(&bet.sport).contains(&bet.bet_category),
            "{}/{} selected without a sweep cell",
            bet.sport,
            bet.bet_category
        );
    }
    assert!(outcome
        .pack
        .threshold_results
        .iter()
        .all(|r| !(r.sport == "football" && r.bet_category == "points")));
    assert_eq!(outcome.pack.metrics.total_bets as usize, outcome.selected_bets.len());
}

// =============================================================================
// Leakage and Determinism
// =============================================================================

#[test]
fn test_window_outcomes_do_not_affect_fit() {
    let set = synthetic_set(13, 150, 4);
    let run = CalibrationRun::new(config()).unwrap();
    let baseline = run.execute(&set).unwrap();
    let train_end = baseline.pack.train_period.end;

    let flipped: Vec<Observation> = set
        .iter()
        .cloned()
        .map(|mut o| {
            if o.date > train_end {
                o.outcome = match o.outcome {
                    Outcome::Win => Outcome::Loss,
                    Outcome::Loss => Outcome::Win,
                    Outcome::Push => Outcome::Push,
                };
            }
            o
        })
        .collect();
    let perturbed = run.execute(&ObservationSet::new(flipped)).unwrap();

    assert_eq!(
        baseline.pack.probability_transforms,
        perturbed.pack.probability_transforms
    );
    assert_ne!(baseline.pack.metrics, perturbed.pack.metrics);
}

#[test]
fn seeded_runs_are_reproducible() {
    let set = synthetic_set(21, 120, 5);
    let run = CalibrationRun::new(config()).unwrap().with_version("repro");

    let first = run.execute(&set).unwrap();
    let second = run.execute(&set).unwrap();

    assert_eq!(first.pack.threshold_results, second.pack.threshold_results);
    assert_eq!(first.pack.edge_thresholds, second.pack.edge_thresholds);
    assert_eq!(first.pack.probability_transforms, second.pack.probability_transforms);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn written_pack_reloads_identically() {
    let outcome = CalibrationRun::new(config())
        .unwrap()
        .with_version("it1")
        .execute(&synthetic_set(34, 200, 5))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = PackWriter::write(&outcome.pack, dir.path()).unwrap();
    assert!(path.ends_with("synthetic_it1.json"));

    let reloaded = CalibrationPack::load(&path).unwrap();
    assert_eq!(reloaded, outcome.pack);
}

#[tokio::test]
async fn csv_source_feeds_a_run() {
    let set = synthetic_set(55, 120, 4);
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("observations.csv");

    let mut writer = csv::Writer::from_path(&csv_path).unwrap();
    writer
        .write_record([
            "date",
            "sport",
            "bet_category",
            "probability_model",
            "probability_market",
            "outcome",
            "id",
        ])
        .unwrap();
    for o in set.iter() {
        let outcome = match o.outcome {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Push => "push",
        };
        writer
            .write_record([
                o.date.to_string(),
                o.sport.clone(),
                o.bet_category.clone(),
                o.probability_model.to_string(),
                o.probability_market.to_string(),
                outcome.to_string(),
                o.id.to_string(),
            ])
            .unwrap();
    }
    writer.flush().unwrap();

    let loaded = CsvObservationSource::new(&csv_path).load().await.unwrap();
    assert_eq!(loaded.len(), set.len());

    let from_csv = CalibrationRun::new(config()).unwrap().execute(&loaded).unwrap();
    let direct = CalibrationRun::new(config()).unwrap().execute(&set).unwrap();
    assert_eq!(
        from_csv.pack.probability_transforms,
        direct.pack.probability_transforms
    );
}
