//! Scoring of predictions against realised outcomes: the multi-class Brier score, its Murphy
//! decomposition, summary metrics and the rolling degradation monitor.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::Display;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::domain::{EpochId, FixtureId, Outcome, OutcomeProbs, Score};
use crate::error::{DataError, EvaluationError};
use crate::guard::Snapshot;
use crate::predictor::Prediction;

/// Floor on the probability of the realised outcome in the log loss.
const MIN_LOG_LOSS_PROB: f64 = 1e-12;

/// Σ_k (p_k − o_k)² over the three outcomes, in [0, 2].
pub fn brier(probs: &OutcomeProbs, outcome: Outcome) -> f64 {
    Outcome::iter()
        .map(|candidate| {
            let observed = if candidate == outcome { 1.0 } else { 0.0 };
            (probs.get(candidate) - observed).powi(2)
        })
        .sum()
}

/// −ln p of the realised outcome, with p floored.
pub fn log_loss(probs: &OutcomeProbs, outcome: Outcome) -> f64 {
    -probs.get(outcome).clamp(MIN_LOG_LOSS_PROB, 1.0).ln()
}

/// Murphy decomposition of the mean Brier score, summed over the outcome classes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub reliability: f64,
    pub resolution: f64,
    pub uncertainty: f64,
}
impl Decomposition {
    /// Reliability − resolution + uncertainty. Equals the mean Brier score when the forecasts
    /// within each bin coincide.
    pub fn brier(&self) -> f64 {
        self.reliability - self.resolution + self.uncertainty
    }
}

#[inline]
fn bin_of(prob: f64, bins: usize) -> usize {
    ((prob * bins as f64).floor() as usize).min(bins - 1)
}

/// Decomposes the mean Brier score of `pairs`, binning each class's forecast probability into
/// `bins` equal-width bins.
pub fn decompose(pairs: &[(OutcomeProbs, Outcome)], bins: usize) -> Decomposition {
    if pairs.is_empty() || bins == 0 {
        return Decomposition::default();
    }
    let samples = pairs.len() as f64;
    let mut decomposition = Decomposition::default();
    for class in Outcome::iter() {
        // (count, sum of forecasts, sum of observations) per bin
        let mut tallies = vec![(0_usize, 0.0, 0.0); bins];
        let mut occurrences = 0.0;
        for (probs, outcome) in pairs {
            let prob = probs.get(class);
            let observed = if *outcome == class { 1.0 } else { 0.0 };
            let tally = &mut tallies[bin_of(prob, bins)];
            tally.0 += 1;
            tally.1 += prob;
            tally.2 += observed;
            occurrences += observed;
        }
        let base_rate = occurrences / samples;
        decomposition.uncertainty += base_rate * (1.0 - base_rate);
        for &(count, forecasts, observations) in tallies.iter().filter(|tally| tally.0 > 0) {
            let count = count as f64;
            let mean_forecast = forecasts / count;
            let observed_rate = observations / count;
            decomposition.reliability += count * (mean_forecast - observed_rate).powi(2) / samples;
            decomposition.resolution += count * (observed_rate - base_rate).powi(2) / samples;
        }
    }
    decomposition
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,

    /// Share of predictions whose most probable outcome was realised.
    pub accuracy: f64,
}

pub fn summarise(pairs: &[(OutcomeProbs, Outcome)]) -> Metrics {
    if pairs.is_empty() {
        return Metrics::default();
    }
    let mut metrics = Metrics {
        samples: pairs.len(),
        ..Metrics::default()
    };
    let mut correct = 0;
    for (probs, outcome) in pairs {
        metrics.brier += brier(probs, *outcome);
        metrics.log_loss += log_loss(probs, *outcome);
        if probs.argmax() == *outcome {
            correct += 1;
        }
    }
    let samples = pairs.len() as f64;
    metrics.brier /= samples;
    metrics.log_loss /= samples;
    metrics.accuracy = correct as f64 / samples;
    metrics
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

/// Reliability diagram of one outcome class.
pub fn calibration_bins(
    pairs: &[(OutcomeProbs, Outcome)],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    if bins == 0 {
        return vec![];
    }
    let mut tallies = vec![(0_usize, 0.0, 0.0); bins];
    for (probs, outcome) in pairs {
        let prob = probs.get(class);
        let tally = &mut tallies[bin_of(prob, bins)];
        tally.0 += 1;
        tally.1 += prob;
        if *outcome == class {
            tally.2 += 1.0;
        }
    }
    tallies
        .into_iter()
        .enumerate()
        .map(|(index, (count, forecasts, observations))| {
            let (avg_pred, actual_rate) = if count > 0 {
                (forecasts / count as f64, observations / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: index as f64 / bins as f64,
                bucket_end: (index + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

/// Health of a model version by its rolling Brier score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Status {
    Healthy,
    Warning,
    Critical,
}
impl Status {
    pub fn classify(rolling_brier: f64, config: &MonitorConfig) -> Self {
        if rolling_brier >= config.critical {
            Status::Critical
        } else if rolling_brier >= config.warning {
            Status::Warning
        } else {
            Status::Healthy
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub fixture: FixtureId,
    pub epoch: EpochId,
    pub model_version: String,
    pub score: Score,
    pub outcome: Outcome,
    pub probs: OutcomeProbs,
    pub brier: f64,
    pub log_loss: f64,

    /// Mean Brier score over the model version's window, this record included.
    pub rolling_brier: f64,

    /// Number of records in the window.
    pub window: usize,

    pub decomposition: Decomposition,
    pub status: Status,
    pub scored_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct Entry {
    fixture: FixtureId,
    probs: OutcomeProbs,
    outcome: Outcome,
    brier: f64,
}

/// Rolling windows of scored predictions, one per model version.
#[derive(Debug, Clone)]
pub struct Monitor {
    config: MonitorConfig,
    windows: FxHashMap<String, VecDeque<Entry>>,
}

impl TryFrom<MonitorConfig> for Monitor {
    type Error = anyhow::Error;

    fn try_from(config: MonitorConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            config,
            windows: FxHashMap::default(),
        })
    }
}

impl Monitor {
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Scores a prediction once its result is visible in `snapshot`. Scoring a fixture again
    /// under the same model version replaces its entry in the window.
    pub fn score(
        &mut self,
        snapshot: &Snapshot,
        prediction: &Prediction,
        at: DateTime<Utc>,
    ) -> Result<ScoreRecord, EvaluationError> {
        let fixture = snapshot.fixture(prediction.fixture)?;
        if fixture.league != prediction.epoch.league {
            return Err(DataError::WrongLeague {
                fixture: fixture.id,
                expected: prediction.epoch.league.clone(),
                actual: fixture.league,
            }
            .into());
        }
        let score = snapshot.result(prediction.fixture)?;
        let outcome = score.outcome();
        let brier = brier(&prediction.probs, outcome);
        let entry = Entry {
            fixture: prediction.fixture,
            probs: prediction.probs,
            outcome,
            brier,
        };

        let window = self
            .windows
            .entry(prediction.model_version.clone())
            .or_default();
        match window.iter_mut().find(|existing| existing.fixture == entry.fixture) {
            Some(existing) => *existing = entry,
            None => {
                window.push_back(entry);
                if window.len() > self.config.window {
                    window.pop_front();
                }
            }
        }

        let rolling_brier =
            window.iter().map(|entry| entry.brier).sum::<f64>() / window.len() as f64;
        let pairs = window
            .iter()
            .map(|entry| (entry.probs, entry.outcome))
            .collect::<Vec<_>>();
        let decomposition = decompose(&pairs, self.config.bins);
        let status = Status::classify(rolling_brier, &self.config);
        if status != Status::Healthy {
            warn!(
                "{} is {status}: rolling Brier {rolling_brier:.4} over {} predictions",
                prediction.model_version,
                window.len()
            );
        }
        debug!(
            "scored {} ({score}, {outcome}): Brier {brier:.4}, rolling {rolling_brier:.4}",
            prediction.fixture
        );
        Ok(ScoreRecord {
            fixture: prediction.fixture,
            epoch: prediction.epoch.clone(),
            model_version: prediction.model_version.clone(),
            score,
            outcome,
            probs: prediction.probs,
            brier,
            log_loss: log_loss(&prediction.probs, outcome),
            rolling_brier,
            window: window.len(),
            decomposition,
            status,
            scored_at: at,
        })
    }

    /// Status of a model version over its current window, if anything has been scored.
    pub fn status(&self, model_version: &str) -> Option<Status> {
        self.rolling_brier(model_version)
            .map(|rolling_brier| Status::classify(rolling_brier, &self.config))
    }

    pub fn rolling_brier(&self, model_version: &str) -> Option<f64> {
        self.windows
            .get(model_version)
            .filter(|window| !window.is_empty())
            .map(|window| window.iter().map(|entry| entry.brier).sum::<f64>() / window.len() as f64)
    }

    /// Per-class calibration of a model version's current window, indexed by [Outcome] ordinal.
    pub fn calibration(&self, model_version: &str) -> [Vec<CalibrationBin>; Outcome::COUNT] {
        let pairs = self
            .windows
            .get(model_version)
            .map(|window| {
                window
                    .iter()
                    .map(|entry| (entry.probs, entry.outcome))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let mut calibration: [Vec<CalibrationBin>; Outcome::COUNT] = Default::default();
        for class in Outcome::iter() {
            calibration[class.ordinal()] = calibration_bins(&pairs, class, self.config.bins);
        }
        calibration
    }
}
