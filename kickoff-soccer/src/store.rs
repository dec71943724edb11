//! Shared storage of fitted epochs, predictions and score records.
//!
//! Epoch commits are optimistic: a writer reads the epoch's revision before fitting and commits
//! against it, failing if another writer committed in the meantime. Predictions and score records
//! are keyed so that writing them again overwrites.

use std::path::Path;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kickoff::file::{read_json, write_json};

use crate::domain::{EpochId, FixtureId};
use crate::error::StoreError;
use crate::evaluation::ScoreRecord;
use crate::model::ModelParameters;
use crate::predictor::Prediction;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEpoch {
    revision: u64,
    params: ModelParameters,
}

#[derive(Debug, Default)]
struct State {
    epochs: FxHashMap<EpochId, StoredEpoch>,
    predictions: FxHashMap<(EpochId, FixtureId), Prediction>,
    scores: FxHashMap<(String, FixtureId), ScoreRecord>,
}

/// The on-disk form of a repository, with its maps flattened into sorted lists.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Persisted {
    epochs: Vec<StoredEpoch>,
    predictions: Vec<Prediction>,
    scores: Vec<ScoreRecord>,
}

#[derive(Debug, Default)]
pub struct Repository {
    state: RwLock<State>,
}

impl Repository {
    /// Current revision of an epoch; zero if it was never committed.
    pub fn revision(&self, epoch: &EpochId) -> u64 {
        self.state
            .read()
            .epochs
            .get(epoch)
            .map_or(0, |stored| stored.revision)
    }

    /// Stores `params` if its epoch is still at `expected_revision`, returning the new revision.
    pub fn commit(
        &self,
        params: ModelParameters,
        expected_revision: u64,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write();
        let actual = state
            .epochs
            .get(&params.epoch)
            .map_or(0, |stored| stored.revision);
        if actual != expected_revision {
            return Err(StoreError::Conflict {
                epoch: params.epoch,
                expected: expected_revision,
                actual,
            });
        }
        let revision = actual + 1;
        debug!("committing {} at revision {revision}", params.epoch);
        state.epochs.insert(
            params.epoch.clone(),
            StoredEpoch { revision, params },
        );
        Ok(revision)
    }

    pub fn epoch(&self, epoch: &EpochId) -> Option<ModelParameters> {
        self.state
            .read()
            .epochs
            .get(epoch)
            .map(|stored| stored.params.clone())
    }

    /// Committed epochs in ascending order.
    pub fn epochs(&self) -> Vec<EpochId> {
        let mut epochs = self.state.read().epochs.keys().cloned().collect::<Vec<_>>();
        epochs.sort();
        epochs
    }

    /// Stores a prediction under its epoch, returning the one it replaced.
    pub fn put_prediction(&self, prediction: Prediction) -> Option<Prediction> {
        let key = (prediction.epoch.clone(), prediction.fixture);
        self.state.write().predictions.insert(key, prediction)
    }

    pub fn prediction(&self, epoch: &EpochId, fixture: FixtureId) -> Option<Prediction> {
        self.state
            .read()
            .predictions
            .get(&(epoch.clone(), fixture))
            .cloned()
    }

    /// Predictions of an epoch in kickoff order.
    pub fn predictions(&self, epoch: &EpochId) -> Vec<Prediction> {
        let mut predictions = self
            .state
            .read()
            .predictions
            .values()
            .filter(|prediction| prediction.epoch == *epoch)
            .cloned()
            .collect::<Vec<_>>();
        predictions.sort_by_key(|prediction| (prediction.kickoff, prediction.fixture));
        predictions
    }

    /// Stores a score record under its model version, returning the one it replaced.
    pub fn put_score(&self, record: ScoreRecord) -> Option<ScoreRecord> {
        let key = (record.model_version.clone(), record.fixture);
        self.state.write().scores.insert(key, record)
    }

    /// Score records of a model version in fixture order.
    pub fn scores(&self, model_version: &str) -> Vec<ScoreRecord> {
        let mut scores = self
            .state
            .read()
            .scores
            .values()
            .filter(|record| record.model_version == model_version)
            .cloned()
            .collect::<Vec<_>>();
        scores.sort_by_key(|record| record.fixture);
        scores
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        let state = self.state.read();
        (state.epochs.len(), state.predictions.len(), state.scores.len())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let persisted = {
            let state = self.state.read();
            let mut persisted = Persisted {
                epochs: state.epochs.values().cloned().collect(),
                predictions: state.predictions.values().cloned().collect(),
                scores: state.scores.values().cloned().collect(),
            };
            persisted.epochs.sort_by(|a, b| a.params.epoch.cmp(&b.params.epoch));
            persisted
                .predictions
                .sort_by(|a, b| (&a.epoch, a.fixture).cmp(&(&b.epoch, b.fixture)));
            persisted
                .scores
                .sort_by(|a, b| (&a.model_version, a.fixture).cmp(&(&b.model_version, b.fixture)));
            persisted
        };
        write_json(path, &persisted)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let persisted: Persisted = read_json(path)?;
        let state = State {
            epochs: persisted
                .epochs
                .into_iter()
                .map(|stored| (stored.params.epoch.clone(), stored))
                .collect(),
            predictions: persisted
                .predictions
                .into_iter()
                .map(|prediction| ((prediction.epoch.clone(), prediction.fixture), prediction))
                .collect(),
            scores: persisted
                .scores
                .into_iter()
                .map(|record| ((record.model_version.clone(), record.fixture), record))
                .collect(),
        };
        Ok(Self {
            state: RwLock::new(state),
        })
    }
}

#[cfg(test)]
mod tests;
