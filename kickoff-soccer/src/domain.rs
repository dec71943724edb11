//! Teams, fixtures, scores and outcomes.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use ordinalizer::Ordinal;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::error::DataError;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u32);

impl Display for TeamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "team {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixtureId(pub u64);

impl Display for FixtureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "fixture {}", self.0)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeagueId(pub String);

impl From<&str> for LeagueId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl Display for LeagueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One fit: a league trained on everything visible at `cutoff`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpochId {
    pub league: LeagueId,
    pub cutoff: DateTime<Utc>,
}

impl Display for EpochId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.league, self.cutoff.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}
impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }

    pub fn nil_all() -> Self {
        Self { home: 0, away: 0 }
    }

    pub fn total(&self) -> u16 {
        self.home as u16 + self.away as u16
    }

    pub fn outcome(&self) -> Outcome {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => Outcome::Home,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Away,
        }
    }

    /// Goals (scored, conceded) from the perspective of `side`.
    pub fn for_side(&self, side: Side) -> (u8, u8) {
        match side {
            Side::Home => (self.home, self.away),
            Side::Away => (self.away, self.home),
        }
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// Full-time result, from the home side's perspective.
#[derive(
    Clone,
    Copy,
    Debug,
    Hash,
    PartialEq,
    Eq,
    Ordinal,
    EnumCount,
    EnumIter,
    Display,
    Serialize,
    Deserialize,
)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

/// Probabilities of the three full-time outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}
impl OutcomeProbs {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Indexed by [Outcome] ordinal.
    pub fn to_array(&self) -> [f64; 3] {
        [self.home, self.draw, self.away]
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// The most probable outcome. Ties resolve in the order home, draw, away.
    pub fn argmax(&self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    Played,
    Cancelled,
}

/// A fixture as recorded by the ingestion layer, together with the instants at which its parts
/// became knowable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: FixtureId,
    pub league: LeagueId,
    pub kickoff: DateTime<Utc>,
    pub home: TeamId,
    pub away: TeamId,
    pub status: MatchStatus,
    pub score: Option<Score>,

    /// When the fixture itself (teams and kickoff) became public.
    pub listed_at: DateTime<Utc>,

    /// When the data of this record, including any score, became public.
    pub available_at: DateTime<Utc>,

    pub ingested_at: DateTime<Utc>,
}
impl Match {
    pub fn validate(&self) -> Result<(), DataError> {
        if self.home == self.away {
            return Err(DataError::SameTeam {
                fixture: self.id,
                team: self.home,
            });
        }
        if self.listed_at > self.available_at {
            return Err(DataError::ListedAfterAvailable(self.id));
        }
        if self.available_at > self.ingested_at {
            return Err(DataError::AvailableAfterIngestion(self.id));
        }
        match (self.status, &self.score) {
            (MatchStatus::Played, None) => Err(DataError::MissingScore(self.id)),
            (MatchStatus::Played, Some(_)) if self.available_at < self.kickoff => {
                Err(DataError::ResultBeforeKickoff(self.id))
            }
            (MatchStatus::Scheduled | MatchStatus::Cancelled, Some(_)) => {
                Err(DataError::UnexpectedScore(self.id))
            }
            _ => Ok(()),
        }
    }

    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub canonical: String,
}

/// Reduces club names to a form in which spellings from different sources coincide.
#[derive(Debug, Clone)]
pub struct Canonicaliser {
    separators: Regex,
    punctuation: Regex,
    affixes: Regex,
    whitespace: Regex,
}
impl Canonicaliser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            separators: Regex::new(r"[-_/]+")?,
            punctuation: Regex::new(r"[^\p{L}\p{N}\s]")?,
            affixes: Regex::new(r"\b(?:afc|fc|cf|sc)\b")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    pub fn canonicalise(&self, name: &str) -> String {
        let lower = name.to_lowercase();
        let separated = self.separators.replace_all(&lower, " ");
        let stripped = self.punctuation.replace_all(&separated, "");
        let unaffixed = self.affixes.replace_all(&stripped, " ");
        self.whitespace
            .replace_all(&unaffixed, " ")
            .trim()
            .to_string()
    }
}

/// Assigns one [TeamId] per canonical club name.
#[derive(Debug, Clone)]
pub struct TeamRegistry {
    canonicaliser: Canonicaliser,
    by_canonical: FxHashMap<String, TeamId>,
    teams: Vec<Team>,
}
impl TeamRegistry {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            canonicaliser: Canonicaliser::new()?,
            by_canonical: FxHashMap::default(),
            teams: vec![],
        })
    }

    /// Resolves `name` to an existing team with the same canonical name, registering a new team
    /// if there is none.
    pub fn resolve(&mut self, name: &str) -> TeamId {
        let canonical = self.canonicaliser.canonicalise(name);
        if let Some(&id) = self.by_canonical.get(&canonical) {
            return id;
        }
        let id = TeamId(self.teams.len() as u32);
        self.by_canonical.insert(canonical.clone(), id);
        self.teams.push(Team {
            id,
            name: name.into(),
            canonical,
        });
        id
    }

    pub fn find(&self, name: &str) -> Option<TeamId> {
        self.by_canonical
            .get(&self.canonicaliser.canonicalise(name))
            .copied()
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(id.0 as usize)
    }

    /// Display name of `id`, falling back to the id itself for unregistered teams.
    pub fn name_of(&self, id: TeamId) -> String {
        self.team(id)
            .map(|team| team.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}
