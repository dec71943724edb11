//! Match rows as supplied by the ingestion layer, keyed by team name.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use kickoff::file::read_json;

use crate::domain::{FixtureId, LeagueId, Match, MatchStatus, Score, TeamRegistry};
use crate::error::{DataError, LoadError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: u64,
    pub league: String,
    pub kickoff: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub status: MatchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_goals: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_goals: Option<u8>,

    /// When the fixture was published. Absent for sources that only timestamp their data, in
    /// which case the fixture is taken to be knowable no earlier than `available_at`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listed_at: Option<DateTime<Utc>>,

    pub available_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}
impl MatchRecord {
    /// Resolves the team names through `registry` and validates the resulting match.
    pub fn resolve(&self, registry: &mut TeamRegistry) -> Result<Match, DataError> {
        let id = FixtureId(self.id);
        let score = match (self.home_goals, self.away_goals) {
            (Some(home), Some(away)) => Some(Score::new(home, away)),
            (None, None) => None,
            _ if self.status == MatchStatus::Played => return Err(DataError::MissingScore(id)),
            _ => return Err(DataError::UnexpectedScore(id)),
        };
        let m = Match {
            id,
            league: LeagueId(self.league.clone()),
            kickoff: self.kickoff,
            home: registry.resolve(&self.home_team),
            away: registry.resolve(&self.away_team),
            status: self.status,
            score,
            listed_at: self.listed_at.unwrap_or(self.available_at),
            available_at: self.available_at,
            ingested_at: self.ingested_at,
        };
        m.validate()?;
        Ok(m)
    }

    /// The record of `m`, naming its teams as `registry` does.
    pub fn from_match(m: &Match, registry: &TeamRegistry) -> Self {
        Self {
            id: m.id.0,
            league: m.league.0.clone(),
            kickoff: m.kickoff,
            home_team: registry.name_of(m.home),
            away_team: registry.name_of(m.away),
            status: m.status,
            home_goals: m.score.map(|score| score.home),
            away_goals: m.score.map(|score| score.away),
            listed_at: Some(m.listed_at),
            available_at: m.available_at,
            ingested_at: m.ingested_at,
        }
    }
}

/// Validated matches and the registry their team ids were drawn from.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub registry: TeamRegistry,
    pub matches: Vec<Match>,
}
impl Dataset {
    pub fn from_records(records: &[MatchRecord]) -> Result<Self, LoadError> {
        let mut registry = TeamRegistry::new()?;
        let matches = records
            .iter()
            .map(|record| record.resolve(&mut registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { registry, matches })
    }

    /// Reads a JSON array of [MatchRecord]s.
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let records: Vec<MatchRecord> = read_json(path)?;
        let dataset = Self::from_records(&records)?;
        info!(
            "loaded {} matches of {} teams from {}",
            dataset.matches.len(),
            dataset.registry.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn records(&self) -> Vec<MatchRecord> {
        self.matches
            .iter()
            .map(|m| MatchRecord::from_match(m, &self.registry))
            .collect()
    }
}
