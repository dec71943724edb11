//! Point-in-time access to match history.
//!
//! [History] owns the match records and offers no way to read them. The only read path is a
//! [Snapshot] obtained from a [TemporalGuard], which exposes exactly what was knowable at its
//! as-of instant: a score is visible once the match has kicked off and its record has become
//! available; a fixture is visible once listed. Cancelled matches are never visible.

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::domain::{FixtureId, LeagueId, Match, MatchStatus, Score, Side, TeamId};
use crate::error::{DataError, TemporalViolation};

/// Validated match records, ordered by kickoff and then by id.
#[derive(Debug, Clone)]
pub struct History {
    matches: Vec<Match>,
    index: FxHashMap<FixtureId, usize>,
}
impl History {
    pub fn new(mut matches: Vec<Match>) -> Result<Self, DataError> {
        let mut ids = FxHashSet::with_capacity_and_hasher(matches.len(), Default::default());
        for m in &matches {
            m.validate()?;
            if !ids.insert(m.id) {
                return Err(DataError::DuplicateFixture(m.id));
            }
        }
        matches.sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then(a.id.cmp(&b.id)));
        let index = matches
            .iter()
            .enumerate()
            .map(|(position, m)| (m.id, position))
            .collect();
        debug!("history of {} matches", matches.len());
        Ok(Self { matches, index })
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// A match whose result is visible.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedMatch {
    pub id: FixtureId,
    pub league: LeagueId,
    pub kickoff: DateTime<Utc>,
    pub home: TeamId,
    pub away: TeamId,
    pub score: Score,
}
impl PlayedMatch {
    pub fn team(&self, side: Side) -> TeamId {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }
}

/// A listed match, without its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub id: FixtureId,
    pub league: LeagueId,
    pub kickoff: DateTime<Utc>,
    pub home: TeamId,
    pub away: TeamId,
}

impl From<&PlayedMatch> for Fixture {
    fn from(played: &PlayedMatch) -> Self {
        Self {
            id: played.id,
            league: played.league.clone(),
            kickoff: played.kickoff,
            home: played.home,
            away: played.away,
        }
    }
}

/// Hands out snapshots of a history no later than its configured "now".
#[derive(Debug, Clone)]
pub struct TemporalGuard {
    history: History,
    now: DateTime<Utc>,
}
impl TemporalGuard {
    pub fn new(history: History, now: DateTime<Utc>) -> Self {
        Self { history, now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn as_of(&self, as_of: DateTime<Utc>) -> Result<Snapshot, TemporalViolation> {
        if as_of > self.now {
            return Err(TemporalViolation::FutureQuery {
                requested: as_of,
                now: self.now,
            });
        }
        Ok(Snapshot {
            history: &self.history,
            as_of,
            league: None,
        })
    }

    /// The snapshot at the guard's "now".
    pub fn latest(&self) -> Snapshot {
        Snapshot {
            history: &self.history,
            as_of: self.now,
            league: None,
        }
    }
}

/// The read-only view of a history as of an instant, optionally narrowed to one league.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    history: &'a History,
    as_of: DateTime<Utc>,
    league: Option<LeagueId>,
}
impl<'a> Snapshot<'a> {
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// A snapshot at the same instant that sees only `league`.
    pub fn league(&self, league: &LeagueId) -> Snapshot<'a> {
        Snapshot {
            history: self.history,
            as_of: self.as_of,
            league: Some(league.clone()),
        }
    }

    /// Matches with a visible result, in ascending kickoff order.
    pub fn played(&self) -> impl Iterator<Item = PlayedMatch> + '_ {
        self.history
            .matches
            .iter()
            .filter(|m| self.in_scope(m) && self.result_visible(m))
            .filter_map(|m| {
                m.score.map(|score| PlayedMatch {
                    id: m.id,
                    league: m.league.clone(),
                    kickoff: m.kickoff,
                    home: m.home,
                    away: m.away,
                    score,
                })
            })
    }

    /// Listed matches whose result is not yet visible, in ascending kickoff order.
    pub fn scheduled(&self) -> impl Iterator<Item = Fixture> + '_ {
        self.history
            .matches
            .iter()
            .filter(|m| self.in_scope(m) && self.listed(m) && !self.result_visible(m))
            .map(to_fixture)
    }

    pub fn fixture(&self, id: FixtureId) -> Result<Fixture, TemporalViolation> {
        self.lookup(id)
            .filter(|m| self.listed(m))
            .map(to_fixture)
            .ok_or(TemporalViolation::FixtureUnavailable {
                fixture: id,
                as_of: self.as_of,
            })
    }

    pub fn result(&self, id: FixtureId) -> Result<Score, TemporalViolation> {
        self.lookup(id)
            .filter(|m| self.result_visible(m))
            .and_then(|m| m.score)
            .ok_or(TemporalViolation::ResultUnavailable {
                fixture: id,
                as_of: self.as_of,
            })
    }

    /// Teams of all listed fixtures, in ascending id order.
    pub fn teams(&self) -> Vec<TeamId> {
        let mut teams = self
            .history
            .matches
            .iter()
            .filter(|m| self.in_scope(m) && self.listed(m))
            .flat_map(|m| [m.home, m.away])
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        teams.sort();
        teams
    }

    /// Leagues of all listed fixtures, in ascending order.
    pub fn leagues(&self) -> Vec<LeagueId> {
        let mut leagues = self
            .history
            .matches
            .iter()
            .filter(|m| self.in_scope(m) && self.listed(m))
            .map(|m| &m.league)
            .collect::<FxHashSet<_>>()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        leagues.sort();
        leagues
    }

    fn lookup(&self, id: FixtureId) -> Option<&'a Match> {
        let history = self.history;
        history
            .index
            .get(&id)
            .map(|&position| &history.matches[position])
            .filter(|m| self.in_scope(m))
    }

    #[inline]
    fn in_scope(&self, m: &Match) -> bool {
        m.status != MatchStatus::Cancelled
            && self.league.as_ref().map_or(true, |league| *league == m.league)
    }

    #[inline]
    fn listed(&self, m: &Match) -> bool {
        m.listed_at <= self.as_of
    }

    #[inline]
    fn result_visible(&self, m: &Match) -> bool {
        m.status == MatchStatus::Played
            && m.kickoff <= self.as_of
            && m.available_at <= self.as_of
    }
}

fn to_fixture(m: &Match) -> Fixture {
    Fixture {
        id: m.id,
        league: m.league.clone(),
        kickoff: m.kickoff,
        home: m.home,
        away: m.away,
    }
}
