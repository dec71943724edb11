use assert_float_eq::*;
use chrono::Utc;

use kickoff_testing::assert_distribution;

use super::*;
use crate::domain::LeagueId;
use crate::error::ErrorKind;
use crate::model::TeamRating;
use crate::testing::{kickoff, LEAGUE};

fn create_test_parameters(rho: f64) -> ModelParameters {
    let rating = |team, attack, defence| TeamRating {
        team: TeamId(team),
        attack,
        defence,
        matches: 20,
        weight: 20.0,
    };
    ModelParameters {
        epoch: EpochId {
            league: LEAGUE.into(),
            cutoff: kickoff(0),
        },
        model_version: "dixon-coles-v1".into(),
        xi: 0.0065,
        home_advantage: 1.3,
        rho,
        log_base_rate: f64::ln(1.1),
        ratings: vec![
            rating(0, 0.3, -0.2),
            rating(1, 0.0, 0.1),
            rating(2, -0.3, 0.1),
            TeamRating::neutral(TeamId(3)),
        ],
        training_matches: 30,
        log_likelihood: -80.0,
        steps: 40,
        fitted_at: Utc::now(),
    }
}

fn fixture(id: u64, home: u32, away: u32) -> Fixture {
    Fixture {
        id: FixtureId(id),
        league: LEAGUE.into(),
        kickoff: kickoff(3),
        home: TeamId(home),
        away: TeamId(away),
    }
}

fn predictor() -> Predictor {
    Predictor::try_from(PredictorConfig::default()).unwrap()
}

#[test]
fn probabilities_form_a_distribution() {
    let params = create_test_parameters(-0.13);
    let predictor = predictor();
    for (home, away) in [(0, 1), (1, 0), (0, 2), (2, 0), (1, 2), (3, 0)] {
        let prediction = predictor.predict(&params, &fixture(1, home, away)).unwrap();
        let probs = prediction.probs.to_array();
        assert_distribution(&probs, 1e-6);
        assert!(probs.iter().all(|prob| (0.0..=1.0).contains(prob)));
        assert!((0.0..=1.0).contains(&prediction.over_2_5));
        assert!((0.0..=1.0).contains(&prediction.both_teams_score));
    }
}

#[test]
fn stronger_home_side_is_favoured() {
    let params = create_test_parameters(-0.13);
    let prediction = predictor().predict(&params, &fixture(7, 0, 2)).unwrap();
    assert_eq!(FixtureId(7), prediction.fixture);
    assert_eq!(params.epoch, prediction.epoch);
    assert_eq!(Confidence::Normal, prediction.confidence);
    assert!(prediction.probs.home > prediction.probs.away);
    assert_eq!(crate::domain::Outcome::Home, prediction.probs.argmax());

    let (lambda, mu) = prediction.expected_goals;
    assert_float_relative_eq!(1.1 * 1.3 * f64::exp(0.3 + 0.1), lambda, 1e-12);
    assert_float_relative_eq!(1.1 * f64::exp(-0.3 - 0.2), mu, 1e-12);
}

#[test]
fn zero_rho_matches_independent_poisson() {
    let params = create_test_parameters(0.0);
    let predictor = predictor();
    let fixture = fixture(1, 1, 2);
    let prediction = predictor.predict(&params, &fixture).unwrap();

    let rates = params.rates(fixture.home, fixture.away);
    let mut independent = Matrix::square(11);
    scoregrid::from_univariate_poisson(rates.lambda, rates.mu, &mut independent);
    let total = independent.flatten().iter().sum::<f64>();
    let home = Selection::Win(crate::domain::Side::Home).gather(&independent) / total;
    let draw = Selection::Draw.gather(&independent) / total;
    assert_float_absolute_eq!(home, prediction.probs.home, 1e-12);
    assert_float_absolute_eq!(draw, prediction.probs.draw, 1e-12);
}

#[test]
fn unrated_team_lowers_confidence() {
    let params = create_test_parameters(-0.13);
    let prediction = predictor().predict(&params, &fixture(1, 3, 0)).unwrap();
    assert_eq!(
        Confidence::Low {
            unrated: vec![TeamId(3)]
        },
        prediction.confidence
    );
    assert!(prediction.confidence.is_low());
    assert_distribution(&prediction.probs.to_array(), 1e-6);

    let prediction = predictor().predict(&params, &fixture(2, 0, 11)).unwrap();
    assert_eq!(
        Confidence::Low {
            unrated: vec![TeamId(11)]
        },
        prediction.confidence
    );
}

#[test]
fn wrong_league() {
    let params = create_test_parameters(-0.13);
    let mut fixture = fixture(5, 0, 1);
    fixture.league = "SP1".into();
    let err = predictor().predict(&params, &fixture).unwrap_err();
    assert_eq!(ErrorKind::Data, err.kind());
    match err {
        PredictError::Data(DataError::WrongLeague {
            fixture,
            expected,
            actual,
        }) => {
            assert_eq!(FixtureId(5), fixture);
            assert_eq!(LeagueId::from(LEAGUE), expected);
            assert_eq!(LeagueId::from("SP1"), actual);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn non_positive_tau() {
    // λμ > 1 so that τ(0-0) = 1 − λμρ < 0 at ρ = 1
    let params = create_test_parameters(1.0);
    let err = predictor().predict(&params, &fixture(9, 0, 1)).unwrap_err();
    assert_eq!(ErrorKind::ParameterDomain, err.kind());
    match err {
        PredictError::ParameterDomain(ParameterDomainError::NonPositiveTau {
            fixture, score, ..
        }) => {
            assert_eq!(FixtureId(9), fixture);
            assert_eq!(Score::nil_all(), score);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn predict_all_preserves_order() {
    let params = create_test_parameters(-0.13);
    let mut fixtures = vec![fixture(1, 0, 1), fixture(2, 1, 2), fixture(3, 2, 0)];
    fixtures[1].league = "SP1".into();
    let predictions = predictor().predict_all(&params, &fixtures);
    assert_eq!(3, predictions.len());
    assert_eq!(FixtureId(1), predictions[0].as_ref().unwrap().fixture);
    assert!(predictions[1].is_err());
    assert_eq!(FixtureId(3), predictions[2].as_ref().unwrap().fixture);
}

#[test]
fn grid_size_follows_config() {
    let params = create_test_parameters(-0.13);
    let predictor = Predictor::try_from(PredictorConfig { max_goals: 4 }).unwrap();
    let scoregrid = predictor.scoregrid(&params, &fixture(1, 0, 1)).unwrap();
    assert_eq!(5, scoregrid.rows());
    assert_eq!(5, scoregrid.cols());

    let err = Predictor::try_from(PredictorConfig { max_goals: 0 }).unwrap_err();
    assert_eq!("max goals (0) must lie between 1 and 30", err.to_string());
}
