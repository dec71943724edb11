//! Fitted Dixon-Coles parameters and the low-score dependence correction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EpochId, Score, TeamId};

pub mod fit;

/// Ratings of one team on the log scale. A team with no training matches keeps the neutral
/// rating of zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub team: TeamId,
    pub attack: f64,
    pub defence: f64,

    /// Number of training matches the team appeared in.
    pub matches: usize,

    /// Sum of the recency weights of those matches.
    pub weight: f64,
}
impl TeamRating {
    pub fn neutral(team: TeamId) -> Self {
        Self {
            team,
            attack: 0.0,
            defence: 0.0,
            matches: 0,
            weight: 0.0,
        }
    }

    pub fn is_rated(&self) -> bool {
        self.matches > 0
    }
}

/// One immutable fit of a league as of its cutoff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub epoch: EpochId,
    pub model_version: String,
    pub xi: f64,

    /// Multiplier on the home scoring rate.
    pub home_advantage: f64,

    pub rho: f64,

    /// Log of the scoring rate of an average away side against an average defence.
    pub log_base_rate: f64,

    /// In ascending team order.
    pub ratings: Vec<TeamRating>,

    pub training_matches: usize,

    /// Recency-weighted log-likelihood of the training matches under these parameters.
    pub log_likelihood: f64,

    pub steps: u64,
    pub fitted_at: DateTime<Utc>,
}

/// Expected goals of a pairing, before the dependence correction.
#[derive(Clone, Debug, PartialEq)]
pub struct Rates {
    pub lambda: f64,
    pub mu: f64,

    /// Teams of the pairing that carry the neutral rating.
    pub unrated: Vec<TeamId>,
}

impl ModelParameters {
    pub fn rating(&self, team: TeamId) -> Option<&TeamRating> {
        self.ratings
            .binary_search_by_key(&team, |rating| rating.team)
            .ok()
            .map(|index| &self.ratings[index])
    }

    /// λ = exp(c + ln h + attack_home + defence_away), μ = exp(c + attack_away + defence_home).
    pub fn rates(&self, home: TeamId, away: TeamId) -> Rates {
        let mut unrated = vec![];
        let mut lookup = |team| match self.rating(team) {
            Some(rating) if rating.is_rated() => (rating.attack, rating.defence),
            _ => {
                unrated.push(team);
                (0.0, 0.0)
            }
        };
        let (home_attack, home_defence) = lookup(home);
        let (away_attack, away_defence) = lookup(away);
        let ln_lambda = self.log_base_rate + self.home_advantage.ln() + home_attack + away_defence;
        let ln_mu = self.log_base_rate + away_attack + home_defence;
        Rates {
            lambda: ln_lambda.exp(),
            mu: ln_mu.exp(),
            unrated,
        }
    }

    pub fn attack_sum(&self) -> f64 {
        self.ratings.iter().map(|rating| rating.attack).sum()
    }

    pub fn defence_sum(&self) -> f64 {
        self.ratings.iter().map(|rating| rating.defence).sum()
    }
}

/// Dixon-Coles correction of the four lowest scorelines, for `home_goals` and `away_goals`
/// scored at rates `lambda` and `mu`.
#[inline]
pub fn tau(home_goals: u8, away_goals: u8, lambda: f64, mu: f64, rho: f64) -> f64 {
    match (home_goals, away_goals) {
        (0, 0) => 1.0 - lambda * mu * rho,
        (0, 1) => 1.0 + lambda * rho,
        (1, 0) => 1.0 + mu * rho,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

/// The scorelines that [tau] corrects, in the order they are checked.
pub const LOW_SCORES: [(u8, u8); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// The first low scoreline whose correction is not positive at rates `lambda` and `mu`.
///
/// A (λ, μ, ρ) triple defines a distribution only when this is `None`, that is, when
/// max(−1/λ, −1/μ) < ρ < min(1/(λμ), 1).
#[inline]
pub fn non_positive_tau(lambda: f64, mu: f64, rho: f64) -> Option<(Score, f64)> {
    LOW_SCORES.into_iter().find_map(|(home_goals, away_goals)| {
        let tau = tau(home_goals, away_goals, lambda, mu, rho);
        if tau > 0.0 {
            None
        } else {
            Some((Score::new(home_goals, away_goals), tau))
        }
    })
}

/// Partial derivatives of [tau] with respect to λ, μ and ρ.
#[inline]
pub(crate) fn tau_derivatives(
    home_goals: u8,
    away_goals: u8,
    lambda: f64,
    mu: f64,
    rho: f64,
) -> (f64, f64, f64) {
    match (home_goals, away_goals) {
        (0, 0) => (-mu * rho, -lambda * rho, -lambda * mu),
        (0, 1) => (rho, 0.0, lambda),
        (1, 0) => (0.0, rho, mu),
        (1, 1) => (0.0, 0.0, -1.0),
        _ => (0.0, 0.0, 0.0),
    }
}
