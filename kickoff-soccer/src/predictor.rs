//! Outcome probabilities of fixtures under a fitted epoch.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kickoff::linear::matrix::Matrix;

use crate::config::PredictorConfig;
use crate::domain::{EpochId, FixtureId, OutcomeProbs, Score, TeamId};
use crate::error::{DataError, ParameterDomainError, PredictError};
use crate::guard::Fixture;
use crate::model::ModelParameters;
use crate::scoregrid::{self, Selection};

/// Whether both sides of a fixture carry fitted ratings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Normal,
    /// The listed teams were rated neutrally for want of prior matches.
    Low { unrated: Vec<TeamId> },
}
impl Confidence {
    pub fn is_low(&self) -> bool {
        matches!(self, Confidence::Low { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub fixture: FixtureId,
    pub kickoff: DateTime<Utc>,
    pub home: TeamId,
    pub away: TeamId,
    pub epoch: EpochId,
    pub model_version: String,
    pub probs: OutcomeProbs,

    /// Expected home and away goals before the dependence correction.
    pub expected_goals: (f64, f64),

    pub confidence: Confidence,
    pub most_likely: (Score, f64),
    pub over_2_5: f64,
    pub both_teams_score: f64,
}

#[derive(Debug, Clone)]
pub struct Predictor {
    config: PredictorConfig,
}

impl TryFrom<PredictorConfig> for Predictor {
    type Error = anyhow::Error;

    fn try_from(config: PredictorConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Predictor {
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// The (M+1)² Dixon-Coles scoregrid of a fixture, renormalised over the grid.
    pub fn scoregrid(
        &self,
        params: &ModelParameters,
        fixture: &Fixture,
    ) -> Result<Matrix<f64>, PredictError> {
        if fixture.league != params.epoch.league {
            return Err(DataError::WrongLeague {
                fixture: fixture.id,
                expected: params.epoch.league.clone(),
                actual: fixture.league.clone(),
            }
            .into());
        }
        let rates = params.rates(fixture.home, fixture.away);
        if !valid_rate(rates.lambda) || !valid_rate(rates.mu) {
            return Err(ParameterDomainError::InvalidRate {
                epoch: params.epoch.clone(),
                fixture: fixture.id,
                lambda: rates.lambda,
                mu: rates.mu,
            }
            .into());
        }
        let mut scoregrid = Matrix::square(self.config.max_goals as usize + 1);
        scoregrid::from_dixon_coles(rates.lambda, rates.mu, params.rho, &mut scoregrid).map_err(
            |err| ParameterDomainError::NonPositiveTau {
                epoch: params.epoch.clone(),
                fixture: fixture.id,
                score: err.score,
                tau: err.tau,
                rho: params.rho,
            },
        )?;
        Ok(scoregrid)
    }

    pub fn predict(
        &self,
        params: &ModelParameters,
        fixture: &Fixture,
    ) -> Result<Prediction, PredictError> {
        let scoregrid = self.scoregrid(params, fixture)?;
        let rates = params.rates(fixture.home, fixture.away);
        let confidence = if rates.unrated.is_empty() {
            Confidence::Normal
        } else {
            warn!(
                "{} predicted under {} with neutral ratings for {:?}",
                fixture.id, params.epoch, rates.unrated
            );
            Confidence::Low {
                unrated: rates.unrated,
            }
        };
        let probs = scoregrid::outcome_probs(&scoregrid);
        debug!(
            "{}: λ: {:.3}, μ: {:.3}, probs: {probs:?}",
            fixture.id, rates.lambda, rates.mu
        );
        Ok(Prediction {
            fixture: fixture.id,
            kickoff: fixture.kickoff,
            home: fixture.home,
            away: fixture.away,
            epoch: params.epoch.clone(),
            model_version: params.model_version.clone(),
            probs,
            expected_goals: (rates.lambda, rates.mu),
            confidence,
            most_likely: scoregrid::most_likely(&scoregrid),
            over_2_5: Selection::Over(2).gather(&scoregrid),
            both_teams_score: Selection::BothTeamsScore.gather(&scoregrid),
        })
    }

    /// Predicts every fixture on the rayon pool, in the order given.
    pub fn predict_all(
        &self,
        params: &ModelParameters,
        fixtures: &[Fixture],
    ) -> Vec<Result<Prediction, PredictError>> {
        fixtures
            .par_iter()
            .map(|fixture| self.predict(params, fixture))
            .collect()
    }
}

#[inline]
fn valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

#[cfg(test)]
mod tests;
