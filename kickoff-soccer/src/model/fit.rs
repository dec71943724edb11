//! Maximum-likelihood estimation of Dixon-Coles parameters from recency-weighted history.
//!
//! The parameter vector holds, in order, the attack ratings of every team with at least one
//! training match, their defence ratings, the log base rate, the log home base rate (when home
//! advantage is fitted) and ρ (when fitted). The objective is the mean negative weighted
//! log-likelihood; the attack and defence blocks are kept at zero sum by projecting every search
//! direction.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info};

use kickoff::factorial;
use kickoff::lookup::Lookup;
use kickoff::opt::{descend, Objective, Termination};
use kickoff::poisson;
use kickoff::probs::SliceExt;
use kickoff::timed::Timed;

use crate::config::{EstimatorConfig, HomeAdvantage, Rho};
use crate::domain::{EpochId, FixtureId, LeagueId, Score, TeamId};
use crate::error::{ConvergenceError, FitError, ParameterDomainError};
use crate::guard::Snapshot;
use crate::model::{non_positive_tau, tau, tau_derivatives, ModelParameters, TeamRating};

/// Floor on the mean goals used to seed the base rates, so that goalless histories start from a
/// finite point.
const MIN_SEED_GOALS: f64 = 0.05;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

const RHO_RANGE: RangeInclusive<f64> = -1.0..=1.0;

/// exp(−ξ·Δ), for Δ the fractional number of days from `kickoff` to `cutoff`.
pub fn recency_weight(xi: f64, kickoff: DateTime<Utc>, cutoff: DateTime<Utc>) -> f64 {
    let days = (cutoff - kickoff).num_milliseconds() as f64 / MILLIS_PER_DAY;
    f64::exp(-xi * days)
}

#[derive(Debug, Clone)]
struct TrainingRow {
    fixture: FixtureId,
    home: usize,
    away: usize,
    score: Score,
    weight: f64,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    teams: usize,
    home_base: Option<usize>,
    rho: Option<usize>,
}
impl Layout {
    fn new(teams: usize, home_advantage: &HomeAdvantage, rho: &Rho) -> Self {
        let mut len = 2 * teams + 1;
        let home_base = match home_advantage {
            HomeAdvantage::Fixed(_) => None,
            HomeAdvantage::Fit => {
                len += 1;
                Some(len - 1)
            }
        };
        let rho = match rho {
            Rho::Fixed(_) => None,
            Rho::Fit { .. } => {
                len += 1;
                Some(len - 1)
            }
        };
        Self {
            teams,
            home_base,
            rho,
        }
    }

    #[inline]
    fn attack(&self, team: usize) -> usize {
        team
    }

    #[inline]
    fn defence(&self, team: usize) -> usize {
        self.teams + team
    }

    #[inline]
    fn base(&self) -> usize {
        2 * self.teams
    }

    fn len(&self) -> usize {
        2 * self.teams + 1 + self.home_base.map_or(0, |_| 1) + self.rho.map_or(0, |_| 1)
    }
}

#[derive(Debug, Clone, Copy)]
struct RowTerms {
    ln_lambda: f64,
    ln_mu: f64,
    lambda: f64,
    mu: f64,
    rho: f64,
    tau: f64,
}

struct DixonColesObjective<'a> {
    rows: &'a [TrainingRow],
    layout: Layout,
    ln_home_advantage: f64,
    fixed_rho: f64,
    total_weight: f64,
    factorial: factorial::Lookup,
}
impl<'a> DixonColesObjective<'a> {
    #[inline]
    fn unchecked_terms(&self, values: &[f64], row: &TrainingRow) -> RowTerms {
        let layout = &self.layout;
        let base = values[layout.base()];
        let home_base = layout
            .home_base
            .map_or(base + self.ln_home_advantage, |index| values[index]);
        let rho = layout.rho.map_or(self.fixed_rho, |index| values[index]);
        let ln_lambda =
            home_base + values[layout.attack(row.home)] + values[layout.defence(row.away)];
        let ln_mu = base + values[layout.attack(row.away)] + values[layout.defence(row.home)];
        let (lambda, mu) = (ln_lambda.exp(), ln_mu.exp());
        RowTerms {
            ln_lambda,
            ln_mu,
            lambda,
            mu,
            rho,
            tau: tau(row.score.home, row.score.away, lambda, mu, rho),
        }
    }

    /// The row's terms, provided its rates are valid and every low-score correction is positive
    /// at those rates, whichever scoreline was observed.
    #[inline]
    fn terms(&self, values: &[f64], row: &TrainingRow) -> Option<RowTerms> {
        let terms = self.unchecked_terms(values, row);
        if valid_rate(terms.lambda)
            && valid_rate(terms.mu)
            && RHO_RANGE.contains(&terms.rho)
            && non_positive_tau(terms.lambda, terms.mu, terms.rho).is_none()
        {
            Some(terms)
        } else {
            None
        }
    }

    #[inline]
    fn row_log_likelihood(&self, row: &TrainingRow, terms: &RowTerms) -> f64 {
        poisson::ln_univariate(row.score.home, terms.lambda, terms.ln_lambda, &self.factorial)
            + poisson::ln_univariate(row.score.away, terms.mu, terms.ln_mu, &self.factorial)
            + terms.tau.ln()
    }

    /// Reports the first training row whose rates, or any of whose low-score corrections, fall
    /// outside the model's domain.
    fn check_domain(&self, values: &[f64], epoch: &EpochId) -> Result<(), ParameterDomainError> {
        for row in self.rows {
            let terms = self.unchecked_terms(values, row);
            if !valid_rate(terms.lambda) || !valid_rate(terms.mu) {
                return Err(ParameterDomainError::InvalidRate {
                    epoch: epoch.clone(),
                    fixture: row.fixture,
                    lambda: terms.lambda,
                    mu: terms.mu,
                });
            }
            if let Some((score, tau)) = non_positive_tau(terms.lambda, terms.mu, terms.rho) {
                return Err(ParameterDomainError::NonPositiveTau {
                    epoch: epoch.clone(),
                    fixture: row.fixture,
                    score,
                    tau,
                    rho: terms.rho,
                });
            }
        }
        Ok(())
    }
}

#[inline]
fn valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

impl<'a> Objective for DixonColesObjective<'a> {
    fn loss(&mut self, values: &[f64]) -> Option<f64> {
        let mut log_likelihood = 0.0;
        for row in self.rows {
            let terms = self.terms(values, row)?;
            log_likelihood += row.weight * self.row_log_likelihood(row, &terms);
        }
        Some(-log_likelihood / self.total_weight)
    }

    fn gradient(
        &mut self,
        values: &[f64],
        gradient: &mut [f64],
        curvature: &mut [f64],
    ) -> Option<f64> {
        gradient.fill(0.0);
        curvature.fill(0.0);
        let layout = self.layout;
        let home_base = layout.home_base.unwrap_or(layout.base());
        let mut log_likelihood = 0.0;
        for row in self.rows {
            let terms = self.terms(values, row)?;
            log_likelihood += row.weight * self.row_log_likelihood(row, &terms);

            let weight = row.weight / self.total_weight;
            let (tau_lambda, tau_mu, tau_rho) =
                tau_derivatives(row.score.home, row.score.away, terms.lambda, terms.mu, terms.rho);

            let gradient_lambda = weight
                * (terms.lambda - row.score.home as f64 - terms.lambda * tau_lambda / terms.tau);
            let curvature_lambda = weight * terms.lambda;
            for index in [home_base, layout.attack(row.home), layout.defence(row.away)] {
                gradient[index] += gradient_lambda;
                curvature[index] += curvature_lambda;
            }

            let gradient_mu =
                weight * (terms.mu - row.score.away as f64 - terms.mu * tau_mu / terms.tau);
            let curvature_mu = weight * terms.mu;
            for index in [layout.base(), layout.attack(row.away), layout.defence(row.home)] {
                gradient[index] += gradient_mu;
                curvature[index] += curvature_mu;
            }

            if let Some(index) = layout.rho {
                let score = tau_rho / terms.tau;
                gradient[index] -= weight * score;
                curvature[index] += weight * score * score;
            }
        }
        Some(-log_likelihood / self.total_weight)
    }

    fn project(&self, direction: &mut [f64]) {
        let teams = self.layout.teams;
        direction[..teams].centre();
        direction[teams..2 * teams].centre();
    }
}

/// Fits [ModelParameters] for one league from everything visible in a snapshot.
#[derive(Debug, Clone)]
pub struct Estimator {
    config: EstimatorConfig,
}

impl TryFrom<EstimatorConfig> for Estimator {
    type Error = anyhow::Error;

    fn try_from(config: EstimatorConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}

/// One (league, cutoff) fit of a batch.
#[derive(Debug, Clone)]
pub struct FitJob<'a> {
    pub snapshot: Snapshot<'a>,
    pub league: LeagueId,
}

impl Estimator {
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn fit(&self, snapshot: &Snapshot, league: &LeagueId) -> Result<ModelParameters, FitError> {
        let snapshot = snapshot.league(league);
        let cutoff = snapshot.as_of();
        let epoch = EpochId {
            league: league.clone(),
            cutoff,
        };
        let teams = snapshot.teams();
        let played = snapshot.played().collect::<Vec<_>>();

        let mut rated_teams = played
            .iter()
            .flat_map(|played| [played.home, played.away])
            .collect::<Vec<_>>();
        rated_teams.sort();
        rated_teams.dedup();
        let mut rated = rated_teams.into_iter().collect::<Lookup<TeamId>>();

        let mut appearances = vec![(0_usize, 0.0); rated.len()];
        let rows = played
            .iter()
            .map(|played| {
                let weight = recency_weight(self.config.xi, played.kickoff, cutoff);
                let (home, away) = (rated.insert(played.home), rated.insert(played.away));
                for team in [home, away] {
                    appearances[team].0 += 1;
                    appearances[team].1 += weight;
                }
                TrainingRow {
                    fixture: played.id,
                    home,
                    away,
                    score: played.score,
                    weight,
                }
            })
            .collect::<Vec<_>>();

        let total_weight = rows.iter().map(|row| row.weight).sum::<f64>();
        if rows.is_empty() || !(total_weight > 0.0) {
            return Err(ConvergenceError::NoData { epoch }.into());
        }

        let layout = Layout::new(rated.len(), &self.config.home_advantage, &self.config.rho);
        let ln_home_advantage = match self.config.home_advantage {
            HomeAdvantage::Fixed(multiplier) => multiplier.ln(),
            HomeAdvantage::Fit => 0.0,
        };
        let mut objective = DixonColesObjective {
            rows: &rows,
            layout,
            ln_home_advantage,
            fixed_rho: self.config.rho.initial(),
            total_weight,
            factorial: factorial::Lookup::default(),
        };

        let init_values = self.init_values(&rows, total_weight, &layout, ln_home_advantage);
        objective.check_domain(&init_values, &epoch)?;
        debug!(
            "fitting {epoch} over {} matches, {} rated teams, {} parameters",
            rows.len(),
            layout.teams,
            layout.len()
        );

        let outcome =
            Timed::result(|| descend(&self.config.descent, &init_values, &mut objective))?;
        let elapsed = outcome.elapsed;
        let outcome = outcome.value;
        debug!(
            "{epoch}: {:?} after {} steps, residual: {}, gradient: {:e}",
            outcome.termination, outcome.steps, outcome.optimal_residual, outcome.gradient_norm
        );
        match outcome.termination {
            Termination::Converged => {}
            Termination::StepBudget => {
                return Err(ConvergenceError::StepBudget {
                    epoch,
                    steps: outcome.steps,
                }
                .into())
            }
            Termination::TimeBudget => {
                return Err(ConvergenceError::TimeBudget {
                    epoch,
                    elapsed: outcome.elapsed,
                }
                .into())
            }
            Termination::Stalled => {
                return Err(ConvergenceError::Stalled {
                    epoch,
                    gradient_norm: outcome.gradient_norm,
                }
                .into())
            }
            Termination::Infeasible => return Err(ConvergenceError::Infeasible { epoch }.into()),
        }

        let values = &outcome.optimal_values;
        objective.check_domain(values, &epoch)?;

        let ratings = teams
            .iter()
            .map(|&team| match rated.index_of(&team) {
                Some(index) => TeamRating {
                    team,
                    attack: values[layout.attack(index)],
                    defence: values[layout.defence(index)],
                    matches: appearances[index].0,
                    weight: appearances[index].1,
                },
                None => TeamRating::neutral(team),
            })
            .collect::<Vec<_>>();
        let log_base_rate = values[layout.base()];
        let home_advantage = layout
            .home_base
            .map_or(ln_home_advantage, |index| values[index] - log_base_rate)
            .exp();
        let rho = layout.rho.map_or(self.config.rho.initial(), |index| values[index]);

        info!(
            "fitted {epoch} in {elapsed:?}: {} matches, {} teams ({} unrated), \
             h: {home_advantage:.3}, ρ: {rho:.4}",
            rows.len(),
            ratings.len(),
            ratings.len().saturating_sub(layout.teams)
        );
        Ok(ModelParameters {
            epoch,
            model_version: self.config.model_version.clone(),
            xi: self.config.xi,
            home_advantage,
            rho,
            log_base_rate,
            ratings,
            training_matches: rows.len(),
            log_likelihood: -outcome.optimal_residual * total_weight,
            steps: outcome.steps,
            fitted_at: Utc::now(),
        })
    }

    /// Fits every job on the rayon pool. A failed job does not affect the others.
    pub fn fit_all(&self, jobs: &[FitJob]) -> Vec<(EpochId, Result<ModelParameters, FitError>)> {
        jobs.par_iter()
            .map(|job| {
                let epoch = EpochId {
                    league: job.league.clone(),
                    cutoff: job.snapshot.as_of(),
                };
                (epoch, self.fit(&job.snapshot, &job.league))
            })
            .collect()
    }

    /// Neutral ratings, base rates from the weighted mean goals and the configured initial ρ.
    fn init_values(
        &self,
        rows: &[TrainingRow],
        total_weight: f64,
        layout: &Layout,
        ln_home_advantage: f64,
    ) -> Vec<f64> {
        let mean_home = rows
            .iter()
            .map(|row| row.weight * row.score.home as f64)
            .sum::<f64>()
            / total_weight;
        let mean_away = rows
            .iter()
            .map(|row| row.weight * row.score.away as f64)
            .sum::<f64>()
            / total_weight;

        let mut values = vec![0.0; layout.len()];
        match layout.home_base {
            Some(index) => {
                values[index] = f64::max(mean_home, MIN_SEED_GOALS).ln();
                values[layout.base()] = f64::max(mean_away, MIN_SEED_GOALS).ln();
            }
            None => {
                let mean = (mean_home / ln_home_advantage.exp() + mean_away) / 2.0;
                values[layout.base()] = f64::max(mean, MIN_SEED_GOALS).ln();
            }
        }
        if let Some(index) = layout.rho {
            values[index] = self.config.rho.initial();
        }
        values
    }
}

#[cfg(test)]
mod tests;
