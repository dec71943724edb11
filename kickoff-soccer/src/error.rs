//! Failure taxonomy of the engine. Every error names the identifiers it concerns.

use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};
use strum_macros::Display;
use thiserror::Error;

use crate::domain::{EpochId, FixtureId, LeagueId, Score, Side, TeamId};

/// A query that would observe information not yet available at its as-of instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporalViolation {
    #[error("as-of {requested} is in the future of {now}")]
    FutureQuery {
        requested: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("{fixture} is not listed as of {as_of}")]
    FixtureUnavailable {
        fixture: FixtureId,
        as_of: DateTime<Utc>,
    },

    #[error("result of {fixture} is not available as of {as_of}")]
    ResultUnavailable {
        fixture: FixtureId,
        as_of: DateTime<Utc>,
    },
}

/// A malformed or inconsistent record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("{fixture} has {team} on both sides")]
    SameTeam { fixture: FixtureId, team: TeamId },

    #[error("{0} was listed after its data became available")]
    ListedAfterAvailable(FixtureId),

    #[error("{0} became available after it was ingested")]
    AvailableAfterIngestion(FixtureId),

    #[error("result of {0} became available before kickoff")]
    ResultBeforeKickoff(FixtureId),

    #[error("{0} is played but has no score")]
    MissingScore(FixtureId),

    #[error("{0} is not played but has a score")]
    UnexpectedScore(FixtureId),

    #[error("{0} appears more than once")]
    DuplicateFixture(FixtureId),

    #[error("{fixture} belongs to league {actual}, expected {expected}")]
    WrongLeague {
        fixture: FixtureId,
        expected: LeagueId,
        actual: LeagueId,
    },
}

/// Fewer prior matches than a rolling window requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{team} has {available} prior {side:?} matches, {required} required")]
pub struct InsufficientHistory {
    pub team: TeamId,
    pub side: Side,
    pub available: usize,
    pub required: usize,
}
impl InsufficientHistory {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InsufficientHistory
    }
}

/// The optimiser did not reach a stationary point within its budget.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvergenceError {
    #[error("no played matches to fit {epoch}")]
    NoData { epoch: EpochId },

    #[error("fitting {epoch} exhausted the budget of {steps} steps")]
    StepBudget { epoch: EpochId, steps: u64 },

    #[error("fitting {epoch} exceeded the time budget after {elapsed:?}")]
    TimeBudget { epoch: EpochId, elapsed: Duration },

    #[error("fitting {epoch} stalled with a gradient of {gradient_norm:e}")]
    Stalled { epoch: EpochId, gradient_norm: f64 },

    #[error("fitting {epoch} reached an infeasible point")]
    Infeasible { epoch: EpochId },
}

/// Parameters outside the domain in which the model is a probability distribution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterDomainError {
    #[error("τ({score}) = {tau} ≤ 0 for {fixture} under {epoch} (ρ = {rho})")]
    NonPositiveTau {
        epoch: EpochId,
        fixture: FixtureId,
        score: Score,
        tau: f64,
        rho: f64,
    },

    #[error("invalid goal rates λ = {lambda}, μ = {mu} for {fixture} under {epoch}")]
    InvalidRate {
        epoch: EpochId,
        fixture: FixtureId,
        lambda: f64,
        mu: f64,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{epoch} is at revision {actual}, expected {expected}")]
    Conflict {
        epoch: EpochId,
        expected: u64,
        actual: u64,
    },

    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Data(#[from] DataError),

    #[error("{0}")]
    Pattern(#[from] regex::Error),
}
impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Io(_) => ErrorKind::Io,
            LoadError::Data(_) => ErrorKind::Data,
            LoadError::Pattern(_) => ErrorKind::Config,
        }
    }
}

/// Coarse classification of failures, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    TemporalViolation,
    Data,
    InsufficientHistory,
    Convergence,
    ParameterDomain,
    Conflict,
    Config,
    Io,
}

#[derive(Debug, Error)]
pub enum FitError {
    #[error("{0}")]
    Convergence(#[from] ConvergenceError),

    #[error("{0}")]
    ParameterDomain(#[from] ParameterDomainError),

    #[error("{0}")]
    Config(#[from] anyhow::Error),
}
impl FitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FitError::Convergence(_) => ErrorKind::Convergence,
            FitError::ParameterDomain(_) => ErrorKind::ParameterDomain,
            FitError::Config(_) => ErrorKind::Config,
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0}")]
    Data(#[from] DataError),

    #[error("{0}")]
    ParameterDomain(#[from] ParameterDomainError),
}
impl PredictError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictError::Data(_) => ErrorKind::Data,
            PredictError::ParameterDomain(_) => ErrorKind::ParameterDomain,
        }
    }
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("{0}")]
    TemporalViolation(#[from] TemporalViolation),

    #[error("{0}")]
    Data(#[from] DataError),
}
impl EvaluationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvaluationError::TemporalViolation(_) => ErrorKind::TemporalViolation,
            EvaluationError::Data(_) => ErrorKind::Data,
        }
    }
}

/// Failure of one epoch of a walk-forward run.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("{0}")]
    TemporalViolation(#[from] TemporalViolation),

    #[error("{0}")]
    Fit(#[from] FitError),

    #[error("{0}")]
    Predict(#[from] PredictError),

    #[error("{0}")]
    Evaluation(#[from] EvaluationError),

    #[error("{0}")]
    Store(#[from] StoreError),
}
impl BacktestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BacktestError::TemporalViolation(_) => ErrorKind::TemporalViolation,
            BacktestError::Fit(err) => err.kind(),
            BacktestError::Predict(err) => err.kind(),
            BacktestError::Evaluation(err) => err.kind(),
            BacktestError::Store(StoreError::Conflict { .. }) => ErrorKind::Conflict,
            BacktestError::Store(StoreError::Io(_)) => ErrorKind::Io,
        }
    }
}
