//! Walk-forward backtesting: at every cutoff, fit on what is visible, predict the fixtures up to
//! the next cutoff, and score those predictions once their results are visible. Leagues run in
//! parallel; the cutoffs of a league run in order.

use anyhow::bail;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{EpochId, LeagueId};
use crate::error::BacktestError;
use crate::evaluation::{summarise, Metrics, Monitor, Status};
use crate::guard::TemporalGuard;
use crate::model::fit::Estimator;
use crate::predictor::Predictor;
use crate::store::Repository;

/// Evenly spaced cutoffs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalkForward {
    pub first_cutoff: DateTime<Utc>,
    pub step_days: i64,
    pub cutoffs: usize,
}
impl WalkForward {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.step_days <= 0 {
            bail!("cutoffs must be at least a day apart");
        }
        if self.cutoffs == 0 {
            bail!("at least one cutoff is required");
        }
        Ok(())
    }

    pub fn step(&self) -> Duration {
        Duration::days(self.step_days)
    }

    pub fn cutoffs(&self) -> Vec<DateTime<Utc>> {
        (0..self.cutoffs)
            .map(|index| self.first_cutoff + Duration::days(self.step_days * index as i64))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpochSummary {
    pub epoch: EpochId,
    pub training_matches: usize,
    pub steps: u64,

    /// Fixtures kicking off before the next cutoff that were predicted.
    pub predicted: usize,

    /// Fixtures that could not be predicted.
    pub failed: usize,

    /// Predictions whose result was not yet visible at the end of the run.
    pub pending: usize,

    pub metrics: Metrics,

    /// Rolling Brier score and status of the model version after this epoch, across every league
    /// of the run, if anything has been scored.
    pub rolling: Option<(f64, Status)>,
}

#[derive(Debug)]
pub struct EpochReport {
    pub epoch: EpochId,
    pub result: Result<EpochSummary, BacktestError>,
}

pub struct Backtest<'a> {
    guard: &'a TemporalGuard,
    repository: &'a Repository,
    estimator: Estimator,
    predictor: Predictor,
    config: Config,
}
impl<'a> Backtest<'a> {
    pub fn new(
        guard: &'a TemporalGuard,
        repository: &'a Repository,
        config: Config,
    ) -> Result<Self, anyhow::Error> {
        config.validate()?;
        Ok(Self {
            guard,
            repository,
            estimator: Estimator::try_from(config.estimator.clone())?,
            predictor: Predictor::try_from(config.predictor.clone())?,
            config,
        })
    }

    /// Reports on every (league, cutoff) pair, ordered by league and then by cutoff. Scores of
    /// every league feed one monitor, so each model version has a single rolling window.
    pub fn run(
        &self,
        leagues: &[LeagueId],
        walk: &WalkForward,
    ) -> Result<Vec<EpochReport>, anyhow::Error> {
        walk.validate()?;
        let cutoffs = walk.cutoffs();
        let monitor = Mutex::new(Monitor::try_from(self.config.monitor.clone())?);
        let reports = leagues
            .par_iter()
            .map(|league| {
                cutoffs
                    .iter()
                    .map(|&cutoff| {
                        let epoch = EpochId {
                            league: league.clone(),
                            cutoff,
                        };
                        let result = self.run_epoch(&epoch, cutoff + walk.step(), &monitor);
                        if let Err(err) = &result {
                            warn!("{epoch} failed ({}): {err}", err.kind());
                        }
                        EpochReport { epoch, result }
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        Ok(reports.into_iter().flatten().collect())
    }

    fn run_epoch(
        &self,
        epoch: &EpochId,
        next_cutoff: DateTime<Utc>,
        monitor: &Mutex<Monitor>,
    ) -> Result<EpochSummary, BacktestError> {
        let snapshot = self.guard.as_of(epoch.cutoff)?.league(&epoch.league);
        let revision = self.repository.revision(epoch);
        let params = self.estimator.fit(&snapshot, &epoch.league)?;
        self.repository.commit(params.clone(), revision)?;

        let fixtures = snapshot
            .scheduled()
            .filter(|fixture| fixture.kickoff >= epoch.cutoff && fixture.kickoff < next_cutoff)
            .collect::<Vec<_>>();
        let mut predictions = vec![];
        let mut failed = 0;
        let results = self.predictor.predict_all(&params, &fixtures);
        for (fixture, result) in fixtures.iter().zip(results) {
            match result {
                Ok(prediction) => {
                    self.repository.put_prediction(prediction.clone());
                    predictions.push(prediction);
                }
                Err(err) => {
                    warn!("could not predict {} under {epoch}: {err}", fixture.id);
                    failed += 1;
                }
            }
        }

        let latest = self.guard.latest();
        let mut pairs = vec![];
        let mut pending = 0;
        let rolling = {
            let mut monitor = monitor.lock();
            for prediction in &predictions {
                if latest.result(prediction.fixture).is_err() {
                    pending += 1;
                    continue;
                }
                let record = monitor.score(&latest, prediction, self.guard.now())?;
                pairs.push((record.probs, record.outcome));
                self.repository.put_score(record);
            }
            monitor
                .rolling_brier(&params.model_version)
                .zip(monitor.status(&params.model_version))
        };

        let metrics = summarise(&pairs);
        debug!("{epoch}: {metrics:?}, rolling: {rolling:?}");
        info!(
            "{epoch}: predicted {}, scored {}, Brier {:.4}",
            predictions.len(),
            metrics.samples,
            metrics.brier
        );
        Ok(EpochSummary {
            epoch: epoch.clone(),
            training_matches: params.training_matches,
            steps: params.steps,
            predicted: predictions.len(),
            failed,
            pending,
            metrics,
            rolling,
        })
    }
}
