//! Scoreline probability grids, indexed by (home goals, away goals), and the selections they
//! resolve.

use serde::{Deserialize, Serialize};

use kickoff::linear::matrix::Matrix;
use kickoff::poisson;
use kickoff::probs::SliceExt;

use crate::domain::{OutcomeProbs, Score, Side};
use crate::model::{tau, LOW_SCORES};

/// A low scoreline whose dependence correction is not positive.
#[derive(Debug, Clone, PartialEq)]
pub struct NonPositiveTau {
    pub score: Score,
    pub tau: f64,
}

/// Independent Poisson probabilities of every scoreline in the grid.
pub fn from_univariate_poisson(home_rate: f64, away_rate: f64, scoregrid: &mut Matrix<f64>) {
    let mut home_probs = vec![0.0; scoregrid.rows()];
    let mut away_probs = vec![0.0; scoregrid.cols()];
    poisson::fill(home_rate, &mut home_probs);
    poisson::fill(away_rate, &mut away_probs);
    for (home_goals, &home_prob) in home_probs.iter().enumerate() {
        for (away_goals, &away_prob) in away_probs.iter().enumerate() {
            scoregrid[(home_goals, away_goals)] = home_prob * away_prob;
        }
    }
}

/// Multiplies the four lowest scorelines by their dependence correction. Every correction is
/// checked, whether or not its cell lies within the grid.
pub fn correct_low_scores(
    home_rate: f64,
    away_rate: f64,
    rho: f64,
    scoregrid: &mut Matrix<f64>,
) -> Result<(), NonPositiveTau> {
    for (home_goals, away_goals) in LOW_SCORES {
        let tau = tau(home_goals, away_goals, home_rate, away_rate, rho);
        if tau <= 0.0 {
            return Err(NonPositiveTau {
                score: Score::new(home_goals, away_goals),
                tau,
            });
        }
        let cell = (home_goals as usize, away_goals as usize);
        if cell.0 < scoregrid.rows() && cell.1 < scoregrid.cols() {
            scoregrid[cell] *= tau;
        }
    }
    Ok(())
}

/// The Dixon-Coles distribution truncated to the grid and renormalised to sum to one.
pub fn from_dixon_coles(
    home_rate: f64,
    away_rate: f64,
    rho: f64,
    scoregrid: &mut Matrix<f64>,
) -> Result<(), NonPositiveTau> {
    from_univariate_poisson(home_rate, away_rate, scoregrid);
    correct_low_scores(home_rate, away_rate, rho, scoregrid)?;
    scoregrid.flatten_mut().normalise(1.0);
    Ok(())
}

pub fn outcome_probs(scoregrid: &Matrix<f64>) -> OutcomeProbs {
    OutcomeProbs {
        home: Selection::Win(Side::Home).gather(scoregrid),
        draw: Selection::Draw.gather(scoregrid),
        away: Selection::Win(Side::Away).gather(scoregrid),
    }
}

/// The most probable scoreline, with its probability. Ties resolve to the fewest home goals and
/// then the fewest away goals.
pub fn most_likely(scoregrid: &Matrix<f64>) -> (Score, f64) {
    let mut best = (Score::nil_all(), f64::NEG_INFINITY);
    for ((home_goals, away_goals), &prob) in scoregrid.iter() {
        if prob > best.1 {
            best = (Score::new(home_goals as u8, away_goals as u8), prob);
        }
    }
    best
}

pub fn home_away_expectations(scoregrid: &Matrix<f64>) -> (f64, f64) {
    let (mut home_expectation, mut away_expectation) = (0.0, 0.0);
    for ((home_goals, away_goals), &prob) in scoregrid.iter() {
        home_expectation += home_goals as f64 * prob;
        away_expectation += away_goals as f64 * prob;
    }
    (home_expectation, away_expectation)
}

/// A proposition about the final score.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    Win(Side),
    Draw,
    /// More than the given number of total goals.
    Over(u8),
    /// Fewer than the given number of total goals.
    Under(u8),
    Score(Score),
    BothTeamsScore,
}
impl Selection {
    pub fn gather(&self, scoregrid: &Matrix<f64>) -> f64 {
        match self {
            Selection::Win(side) => Self::gather_win(side, scoregrid),
            Selection::Draw => Self::gather_draw(scoregrid),
            Selection::Over(goals) => Self::gather_goals_over(*goals, scoregrid),
            Selection::Under(goals) => Self::gather_goals_under(*goals, scoregrid),
            Selection::Score(score) => Self::gather_correct_score(score, scoregrid),
            Selection::BothTeamsScore => Self::gather_both_teams_score(scoregrid),
        }
    }

    fn gather_win(side: &Side, scoregrid: &Matrix<f64>) -> f64 {
        let mut prob = 0.0;
        match side {
            Side::Home => {
                for row in 1..scoregrid.rows() {
                    for col in 0..usize::min(row, scoregrid.cols()) {
                        prob += scoregrid[(row, col)];
                    }
                }
            }
            Side::Away => {
                for col in 1..scoregrid.cols() {
                    for row in 0..usize::min(col, scoregrid.rows()) {
                        prob += scoregrid[(row, col)];
                    }
                }
            }
        }
        prob
    }

    fn gather_draw(scoregrid: &Matrix<f64>) -> f64 {
        let mut prob = 0.0;
        for index in 0..usize::min(scoregrid.rows(), scoregrid.cols()) {
            prob += scoregrid[(index, index)];
        }
        prob
    }

    fn gather_goals_over(goals: u8, scoregrid: &Matrix<f64>) -> f64 {
        let goals = goals as usize;
        scoregrid
            .iter()
            .filter(|((row, col), _)| row + col > goals)
            .map(|(_, prob)| prob)
            .sum()
    }

    fn gather_goals_under(goals: u8, scoregrid: &Matrix<f64>) -> f64 {
        let goals = goals as usize;
        scoregrid
            .iter()
            .filter(|((row, col), _)| row + col < goals)
            .map(|(_, prob)| prob)
            .sum()
    }

    fn gather_correct_score(score: &Score, scoregrid: &Matrix<f64>) -> f64 {
        if (score.home as usize) < scoregrid.rows() && (score.away as usize) < scoregrid.cols() {
            scoregrid[(score.home as usize, score.away as usize)]
        } else {
            0.0
        }
    }

    fn gather_both_teams_score(scoregrid: &Matrix<f64>) -> f64 {
        scoregrid
            .iter()
            .filter(|((row, col), _)| *row > 0 && *col > 0)
            .map(|(_, prob)| prob)
            .sum()
    }
}
