use assert_float_eq::*;
use chrono::Duration;

use super::*;
use crate::config::{EstimatorConfig, PredictorConfig};
use crate::domain::Match;
use crate::guard::{Fixture, History, TemporalGuard};
use crate::predictor::Predictor;
use crate::synthetic::{LeagueConfig, SyntheticLeague};
use crate::testing::{kickoff, played, scheduled, LEAGUE};

fn unweighted_config() -> EstimatorConfig {
    EstimatorConfig {
        xi: 0.0,
        ..EstimatorConfig::default()
    }
}

fn synthetic(seasons: usize) -> (SyntheticLeague, TemporalGuard) {
    let league = SyntheticLeague::generate(&LeagueConfig {
        seasons,
        ..LeagueConfig::default()
    })
    .unwrap();
    let now = league.matches.last().unwrap().kickoff + Duration::days(7);
    let guard = TemporalGuard::new(History::new(league.matches.clone()).unwrap(), now);
    (league, guard)
}

fn guard(matches: Vec<Match>) -> TemporalGuard {
    TemporalGuard::new(History::new(matches).unwrap(), kickoff(365))
}

fn mean_absolute_error(expected: &[f64], actual: impl Iterator<Item = f64>) -> f64 {
    expected
        .iter()
        .zip(actual)
        .map(|(expected, actual)| (expected - actual).abs())
        .sum::<f64>()
        / expected.len() as f64
}

#[test]
fn recency_weight_decays_per_day() {
    assert_eq!(1.0, recency_weight(0.0065, kickoff(10), kickoff(10)));
    assert_eq!(1.0, recency_weight(0.0, kickoff(0), kickoff(300)));
    assert_float_relative_eq!(
        f64::exp(-0.0065 * 100.0),
        recency_weight(0.0065, kickoff(0), kickoff(100)),
        1e-12
    );
    // fractional days
    assert_float_relative_eq!(
        f64::exp(-0.01 * 0.5),
        recency_weight(0.01, kickoff(0), kickoff(0) + Duration::hours(12)),
        1e-12
    );
}

#[test]
fn recovers_synthetic_ratings() {
    let (league, guard) = synthetic(4);
    let estimator = Estimator::try_from(unweighted_config()).unwrap();
    let params = estimator.fit(&guard.latest(), &league.league).unwrap();

    assert_eq!(4 * 20 * 19, params.training_matches);
    assert_eq!(20, params.ratings.len());
    assert!(params.attack_sum().abs() < 1e-9, "{}", params.attack_sum());
    assert!(params.defence_sum().abs() < 1e-9, "{}", params.defence_sum());
    assert!(params.ratings.iter().all(TeamRating::is_rated));

    let attack_error = mean_absolute_error(
        &league.attack,
        params.ratings.iter().map(|rating| rating.attack),
    );
    let defence_error = mean_absolute_error(
        &league.defence,
        params.ratings.iter().map(|rating| rating.defence),
    );
    assert!(attack_error < 0.1, "attack error: {attack_error}");
    assert!(defence_error < 0.1, "defence error: {defence_error}");
    assert_float_absolute_eq!(f64::ln(1.15), params.log_base_rate, 0.1);
    assert_float_absolute_eq!(-0.13, params.rho, 0.15);
    assert_float_relative_eq!(1.3, params.home_advantage, 1e-12);
}

#[test]
fn recovers_home_advantage() {
    let (league, guard) = synthetic(4);
    let estimator = Estimator::try_from(EstimatorConfig {
        home_advantage: HomeAdvantage::Fit,
        ..unweighted_config()
    })
    .unwrap();
    let params = estimator.fit(&guard.latest(), &league.league).unwrap();
    assert_float_absolute_eq!(1.3, params.home_advantage, 0.15);
    assert!(params.attack_sum().abs() < 1e-9);
    assert!(params.defence_sum().abs() < 1e-9);
}

#[test]
fn refit_is_deterministic() {
    let (league, guard) = synthetic(1);
    let estimator = Estimator::try_from(EstimatorConfig::default()).unwrap();
    let snapshot = guard.latest();
    let first = estimator.fit(&snapshot, &league.league).unwrap();
    let second = estimator.fit(&snapshot, &league.league).unwrap();
    assert_eq!(first.ratings, second.ratings);
    assert_eq!(first.rho, second.rho);
    assert_eq!(first.log_base_rate, second.log_base_rate);
    assert_eq!(first.steps, second.steps);
    assert_eq!(first.epoch, second.epoch);
}

#[test]
fn fixed_rho_without_dependence() {
    let (league, guard) = synthetic(1);
    let estimator = Estimator::try_from(EstimatorConfig {
        rho: Rho::Fixed(0.0),
        ..EstimatorConfig::default()
    })
    .unwrap();
    let params = estimator.fit(&guard.latest(), &league.league).unwrap();
    assert_eq!(0.0, params.rho);
    assert!(params.log_likelihood < 0.0);
}

#[test]
fn only_visible_results_are_trained_on() {
    let (league, guard) = synthetic(1);
    let estimator = Estimator::try_from(unweighted_config()).unwrap();
    // one round of 10 matches per week
    let cutoff = league.matches[0].kickoff + Duration::days(7 * 5);
    let params = estimator
        .fit(&guard.as_of(cutoff).unwrap(), &league.league)
        .unwrap();
    assert_eq!(50, params.training_matches);
    assert_eq!(cutoff, params.epoch.cutoff);
}

#[test]
fn fit_on_one_round_predicts_its_fixtures() {
    let (league, guard) = synthetic(1);
    let cutoff = league.matches[0].kickoff + Duration::days(1);
    let snapshot = guard.as_of(cutoff).unwrap();
    let played = snapshot.league(&league.league).played().collect::<Vec<_>>();
    assert_eq!(10, played.len());

    let estimator = Estimator::try_from(EstimatorConfig::default()).unwrap();
    let params = match estimator.fit(&snapshot, &league.league) {
        Ok(params) => params,
        Err(FitError::Convergence(err)) => {
            // thin data may exhaust the budget, but never yields unusable parameters
            println!("did not converge: {err}");
            return;
        }
        Err(err) => panic!("unexpected {err:?}"),
    };
    assert!((-1.0..=1.0).contains(&params.rho), "ρ: {}", params.rho);

    let predictor = Predictor::try_from(PredictorConfig::default()).unwrap();
    for played in &played {
        let rates = params.rates(played.home, played.away);
        assert_eq!(None, non_positive_tau(rates.lambda, rates.mu, params.rho));
        let prediction = predictor.predict(&params, &Fixture::from(played)).unwrap();
        let probs = prediction.probs;
        assert_float_absolute_eq!(1.0, probs.home + probs.draw + probs.away, 1e-9);
    }
}

#[test]
fn listed_team_without_results_is_neutral() {
    let guard = guard(vec![
        played(1, 0, 0, 1, (2, 1)),
        played(2, 7, 1, 2, (1, 1)),
        played(3, 14, 2, 0, (0, 2)),
        played(4, 21, 1, 0, (3, 2)),
        scheduled(5, 28, 9, 0),
    ]);
    let estimator = Estimator::try_from(EstimatorConfig {
        rho: Rho::Fixed(0.0),
        ..unweighted_config()
    })
    .unwrap();
    let params = estimator.fit(&guard.as_of(kickoff(25)).unwrap(), &LEAGUE.into()).unwrap();
    assert_eq!(4, params.ratings.len());
    let unrated = params.rating(TeamId(9)).unwrap();
    assert_eq!(&TeamRating::neutral(TeamId(9)), unrated);
    assert_eq!(2, params.ratings.iter().filter(|r| r.matches == 3).count());
    assert!(params.rating(TeamId(1)).unwrap().is_rated());
    assert!(params.attack_sum().abs() < 1e-9);
}

#[test]
fn no_data() {
    let guard = guard(vec![scheduled(1, 10, 0, 1), played(2, 5, 0, 1, (1, 0))]);
    let estimator = Estimator::try_from(EstimatorConfig::default()).unwrap();
    let err = estimator
        .fit(&guard.as_of(kickoff(5)).unwrap(), &LEAGUE.into())
        .unwrap_err();
    assert!(
        matches!(err, FitError::Convergence(ConvergenceError::NoData { .. })),
        "{err:?}"
    );
    assert_eq!(crate::error::ErrorKind::Convergence, err.kind());

    let err = estimator
        .fit(&guard.latest(), &"SP1".into())
        .unwrap_err();
    assert!(matches!(err, FitError::Convergence(ConvergenceError::NoData { .. })));
}

#[test]
fn fixed_rho_with_negative_tau() {
    let guard = guard(vec![
        played(1, 0, 0, 1, (0, 0)),
        played(2, 7, 1, 2, (3, 1)),
        played(3, 14, 2, 0, (2, 2)),
        played(4, 21, 1, 0, (1, 2)),
    ]);
    let estimator = Estimator::try_from(EstimatorConfig {
        rho: Rho::Fixed(0.9),
        ..unweighted_config()
    })
    .unwrap();
    let err = estimator.fit(&guard.latest(), &LEAGUE.into()).unwrap_err();
    match err {
        FitError::ParameterDomain(ParameterDomainError::NonPositiveTau {
            fixture,
            score,
            tau,
            rho,
            ..
        }) => {
            assert_eq!(FixtureId(1), fixture);
            assert_eq!(Score::nil_all(), score);
            assert!(tau <= 0.0);
            assert_eq!(0.9, rho);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn step_budget_exhausted() {
    let (league, guard) = synthetic(1);
    let mut config = EstimatorConfig::default();
    config.descent.max_steps = 1;
    let estimator = Estimator::try_from(config).unwrap();
    let err = estimator.fit(&guard.latest(), &league.league).unwrap_err();
    match err {
        FitError::Convergence(ConvergenceError::StepBudget { epoch, steps }) => {
            assert_eq!(1, steps);
            assert_eq!(league.league, epoch.league);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn time_budget_exhausted() {
    let (league, guard) = synthetic(1);
    let mut config = EstimatorConfig::default();
    config.descent.max_duration = Some(std::time::Duration::ZERO);
    let estimator = Estimator::try_from(config).unwrap();
    let err = estimator.fit(&guard.latest(), &league.league).unwrap_err();
    assert!(
        matches!(err, FitError::Convergence(ConvergenceError::TimeBudget { .. })),
        "{err:?}"
    );
}

#[test]
fn invalid_config() {
    let err = Estimator::try_from(EstimatorConfig {
        rho: Rho::Fixed(1.5),
        ..EstimatorConfig::default()
    })
    .unwrap_err();
    assert_eq!("ρ (1.5) outside of allowable range -1.0..=1.0", err.to_string());
}

#[test]
fn fit_all_isolates_failures() {
    let first = SyntheticLeague::generate(&LeagueConfig {
        league: "E0".into(),
        teams: 8,
        seasons: 2,
        ..LeagueConfig::default()
    })
    .unwrap();
    let second = SyntheticLeague::generate(&LeagueConfig {
        league: "E1".into(),
        teams: 8,
        seasons: 2,
        first_team: 100,
        first_fixture: 10_000,
        seed: 7,
        ..LeagueConfig::default()
    })
    .unwrap();
    let mut matches = first.matches.clone();
    matches.extend(second.matches.iter().cloned());
    let now = matches.iter().map(|m| m.kickoff).max().unwrap() + Duration::days(1);
    let guard = TemporalGuard::new(History::new(matches).unwrap(), now);

    let snapshot = guard.latest();
    let jobs = vec![
        FitJob {
            snapshot: snapshot.clone(),
            league: first.league.clone(),
        },
        FitJob {
            snapshot: snapshot.clone(),
            league: "SP1".into(),
        },
        FitJob {
            snapshot,
            league: second.league.clone(),
        },
    ];
    let estimator = Estimator::try_from(EstimatorConfig::default()).unwrap();
    let results = estimator.fit_all(&jobs);
    assert_eq!(3, results.len());

    let (epoch, result) = &results[0];
    assert_eq!(first.league, epoch.league);
    let params = result.as_ref().unwrap();
    assert_eq!(8, params.ratings.len());
    assert!(params.ratings.iter().all(|rating| rating.team.0 < 100));

    let (epoch, result) = &results[1];
    assert_eq!(LeagueId::from("SP1"), epoch.league);
    assert!(result.is_err());

    let (epoch, result) = &results[2];
    assert_eq!(second.league, epoch.league);
    let params = result.as_ref().unwrap();
    assert!(params.ratings.iter().all(|rating| rating.team.0 >= 100));
}
