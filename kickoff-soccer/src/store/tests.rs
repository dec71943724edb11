use std::env;

use chrono::Utc;
use rayon::prelude::*;

use super::*;
use crate::domain::{Outcome, OutcomeProbs, Score, TeamId};
use crate::evaluation::{Decomposition, Status};
use crate::predictor::Confidence;
use crate::testing::{kickoff, LEAGUE};

fn epoch(day: i64) -> EpochId {
    EpochId {
        league: LEAGUE.into(),
        cutoff: kickoff(day),
    }
}

fn params(epoch: EpochId, rho: f64) -> ModelParameters {
    ModelParameters {
        epoch,
        model_version: "v1".into(),
        xi: 0.0065,
        home_advantage: 1.3,
        rho,
        log_base_rate: 0.1,
        ratings: vec![],
        training_matches: 0,
        log_likelihood: 0.0,
        steps: 0,
        fitted_at: kickoff(0),
    }
}

fn prediction(epoch: EpochId, fixture: u64, day: i64, home: f64) -> Prediction {
    Prediction {
        fixture: FixtureId(fixture),
        kickoff: kickoff(day),
        home: TeamId(0),
        away: TeamId(1),
        epoch,
        model_version: "v1".into(),
        probs: OutcomeProbs {
            home,
            draw: 0.25,
            away: 0.75 - home,
        },
        expected_goals: (1.5, 1.0),
        confidence: Confidence::Normal,
        most_likely: (Score::new(1, 0), 0.11),
        over_2_5: 0.5,
        both_teams_score: 0.5,
    }
}

fn score_record(model_version: &str, fixture: u64, brier: f64) -> ScoreRecord {
    ScoreRecord {
        fixture: FixtureId(fixture),
        epoch: epoch(0),
        model_version: model_version.into(),
        score: Score::new(1, 0),
        outcome: Outcome::Home,
        probs: OutcomeProbs::uniform(),
        brier,
        log_loss: 1.0,
        rolling_brier: brier,
        window: 1,
        decomposition: Decomposition::default(),
        status: Status::Healthy,
        scored_at: Utc::now(),
    }
}

#[test]
fn commit_advances_revision() {
    let repository = Repository::default();
    assert_eq!(0, repository.revision(&epoch(0)));
    assert_eq!(None, repository.epoch(&epoch(0)));

    assert_eq!(1, repository.commit(params(epoch(0), -0.1), 0).unwrap());
    assert_eq!(1, repository.revision(&epoch(0)));
    assert_eq!(2, repository.commit(params(epoch(0), -0.2), 1).unwrap());
    assert_eq!(-0.2, repository.epoch(&epoch(0)).unwrap().rho);
    assert_eq!(0, repository.revision(&epoch(7)));
}

#[test]
fn stale_commit_conflicts() {
    let repository = Repository::default();
    let observed = repository.revision(&epoch(0));
    repository.commit(params(epoch(0), -0.1), observed).unwrap();
    let err = repository.commit(params(epoch(0), -0.2), observed).unwrap_err();
    match err {
        StoreError::Conflict {
            epoch: conflicted,
            expected,
            actual,
        } => {
            assert_eq!(epoch(0), conflicted);
            assert_eq!(0, expected);
            assert_eq!(1, actual);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(-0.1, repository.epoch(&epoch(0)).unwrap().rho);
}

#[test]
fn concurrent_commits_admit_one_writer() {
    let repository = Repository::default();
    let observed = repository.revision(&epoch(0));
    let results = (0..8)
        .into_par_iter()
        .map(|writer| repository.commit(params(epoch(0), writer as f64 / 10.0), observed))
        .collect::<Vec<_>>();
    assert_eq!(1, results.iter().filter(|result| result.is_ok()).count());
    assert_eq!(
        7,
        results
            .iter()
            .filter(|result| matches!(result, Err(StoreError::Conflict { .. })))
            .count()
    );
    assert_eq!(1, repository.revision(&epoch(0)));
}

#[test]
fn predictions_overwrite() {
    let repository = Repository::default();
    assert!(repository.put_prediction(prediction(epoch(0), 2, 5, 0.5)).is_none());
    assert!(repository.put_prediction(prediction(epoch(0), 1, 6, 0.5)).is_none());
    let replaced = repository.put_prediction(prediction(epoch(0), 2, 5, 0.6)).unwrap();
    assert_eq!(0.5, replaced.probs.home);
    repository.put_prediction(prediction(epoch(7), 2, 5, 0.4));

    let predictions = repository.predictions(&epoch(0));
    assert_eq!(
        vec![FixtureId(2), FixtureId(1)],
        predictions.iter().map(|p| p.fixture).collect::<Vec<_>>()
    );
    assert_eq!(0.6, predictions[0].probs.home);
    assert_eq!(
        0.4,
        repository.prediction(&epoch(7), FixtureId(2)).unwrap().probs.home
    );
    assert_eq!((0, 3, 0), repository.counts());
}

#[test]
fn scores_overwrite_per_version() {
    let repository = Repository::default();
    repository.put_score(score_record("v1", 3, 0.5));
    repository.put_score(score_record("v1", 1, 0.4));
    repository.put_score(score_record("v2", 1, 0.3));
    let replaced = repository.put_score(score_record("v1", 3, 0.45)).unwrap();
    assert_eq!(0.5, replaced.brier);

    let scores = repository.scores("v1");
    assert_eq!(2, scores.len());
    assert_eq!(FixtureId(1), scores[0].fixture);
    assert_eq!(0.45, scores[1].brier);
    assert_eq!(1, repository.scores("v2").len());
}

#[test]
fn save_and_load() {
    let repository = Repository::default();
    repository.commit(params(epoch(7), -0.1), 0).unwrap();
    repository.commit(params(epoch(0), -0.1), 0).unwrap();
    repository.commit(params(epoch(0), -0.15), 1).unwrap();
    repository.put_prediction(prediction(epoch(0), 1, 3, 0.5));
    repository.put_score(score_record("v1", 1, 0.5));

    let path = env::temp_dir().join(format!("kickoff-repository-{}.json", std::process::id()));
    repository.save(&path).unwrap();
    let loaded = Repository::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(vec![epoch(0), epoch(7)], loaded.epochs());
    assert_eq!(2, loaded.revision(&epoch(0)));
    assert_eq!(repository.epoch(&epoch(0)), loaded.epoch(&epoch(0)));
    assert_eq!(repository.predictions(&epoch(0)), loaded.predictions(&epoch(0)));
    assert_eq!(1, loaded.scores("v1").len());
    assert_eq!((2, 1, 1), loaded.counts());
}

#[test]
fn load_missing_file() {
    let path = env::temp_dir().join("kickoff-no-such-repository.json");
    let err = Repository::load(path).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
}
