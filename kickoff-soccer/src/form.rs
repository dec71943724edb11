//! Trailing-window form of a team in one role (home or away).

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::domain::{FixtureId, Side, TeamId};
use crate::error::InsufficientHistory;
use crate::guard::{Fixture, Snapshot};

/// Aggregates over the N most recent prior matches of a team in one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormStats {
    pub matches: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: u32,
    pub avg_goals_for: f64,
    pub avg_goals_against: f64,
    pub win_pct: f64,
    pub unbeaten_pct: f64,

    /// Consecutive wins (positive) or losses (negative) ending with the most recent match; zero
    /// if that match was drawn.
    pub streak: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Insufficient(InsufficientHistory),
    Complete(FormStats),
}
impl Form {
    pub fn is_complete(&self) -> bool {
        matches!(self, Form::Complete(_))
    }

    /// Drops the marker, for callers that exclude such rows.
    pub fn or_exclude(self) -> Option<FormStats> {
        match self {
            Form::Insufficient(_) => None,
            Form::Complete(stats) => Some(stats),
        }
    }

    /// Imputes zeros in place of the marker.
    pub fn or_zero(self) -> FormStats {
        self.or_exclude().unwrap_or_default()
    }

    pub fn into_result(self) -> Result<FormStats, InsufficientHistory> {
        match self {
            Form::Insufficient(insufficient) => Err(insufficient),
            Form::Complete(stats) => Ok(stats),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Appearance {
    kickoff: DateTime<Utc>,
    goals_for: u8,
    goals_against: u8,
}

/// Every team's played matches per role, in ascending kickoff order.
#[derive(Debug, Default)]
pub struct Timelines {
    appearances: FxHashMap<(TeamId, Side), Vec<Appearance>>,
}
impl Timelines {
    pub fn new(snapshot: &Snapshot) -> Self {
        let mut appearances: FxHashMap<_, Vec<_>> = FxHashMap::default();
        for played in snapshot.played() {
            for side in [Side::Home, Side::Away] {
                let (goals_for, goals_against) = played.score.for_side(side);
                appearances
                    .entry((played.team(side), side))
                    .or_default()
                    .push(Appearance {
                        kickoff: played.kickoff,
                        goals_for,
                        goals_against,
                    });
            }
        }
        Self { appearances }
    }

    /// Form of `team` in role `side` over the `window` matches played strictly before `before`.
    pub fn form(&self, team: TeamId, side: Side, before: DateTime<Utc>, window: usize) -> Form {
        let appearances = self
            .appearances
            .get(&(team, side))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let visible = appearances.partition_point(|appearance| appearance.kickoff < before);
        let prior = &appearances[..visible];
        if prior.len() < window {
            return Form::Insufficient(InsufficientHistory {
                team,
                side,
                available: prior.len(),
                required: window,
            });
        }
        Form::Complete(aggregate(&prior[prior.len() - window..]))
    }
}

fn aggregate(appearances: &[Appearance]) -> FormStats {
    let mut stats = FormStats {
        matches: appearances.len(),
        ..FormStats::default()
    };
    for appearance in appearances {
        stats.goals_for += appearance.goals_for as u32;
        stats.goals_against += appearance.goals_against as u32;
        match verdict(appearance) {
            Verdict::Win => stats.wins += 1,
            Verdict::Draw => stats.draws += 1,
            Verdict::Loss => stats.losses += 1,
        }
    }
    stats.goal_difference = stats.goals_for as i32 - stats.goals_against as i32;
    stats.points = 3 * stats.wins as u32 + stats.draws as u32;

    let count = stats.matches as f64;
    stats.avg_goals_for = round(stats.goals_for as f64 / count, 2);
    stats.avg_goals_against = round(stats.goals_against as f64 / count, 2);
    stats.win_pct = round(stats.wins as f64 / count * 100.0, 1);
    stats.unbeaten_pct = round((stats.wins + stats.draws) as f64 / count * 100.0, 1);

    let run = |last| {
        appearances
            .iter()
            .rev()
            .take_while(|appearance| verdict(appearance) == last)
            .count() as i32
    };
    stats.streak = match appearances.last().map(verdict) {
        Some(Verdict::Win) => run(Verdict::Win),
        Some(Verdict::Loss) => -run(Verdict::Loss),
        _ => 0,
    };
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Win,
    Draw,
    Loss,
}

#[inline]
fn verdict(appearance: &Appearance) -> Verdict {
    match appearance.goals_for.cmp(&appearance.goals_against) {
        std::cmp::Ordering::Greater => Verdict::Win,
        std::cmp::Ordering::Equal => Verdict::Draw,
        std::cmp::Ordering::Less => Verdict::Loss,
    }
}

#[inline]
fn round(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

/// Form of `team` in role `side` ahead of a match kicking off at `before`.
pub fn form(
    snapshot: &Snapshot,
    team: TeamId,
    side: Side,
    before: DateTime<Utc>,
    window: usize,
) -> Form {
    Timelines::new(snapshot).form(team, side, before, window)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureForm {
    pub fixture: FixtureId,

    /// Home form of the home side.
    pub home: Form,

    /// Away form of the away side.
    pub away: Form,
}

/// Home form of the home side and away form of the away side, for every fixture.
pub fn form_table(snapshot: &Snapshot, fixtures: &[Fixture], window: usize) -> Vec<FixtureForm> {
    let timelines = Timelines::new(snapshot);
    fixtures
        .par_iter()
        .map(|fixture| FixtureForm {
            fixture: fixture.id,
            home: timelines.form(fixture.home, Side::Home, fixture.kickoff, window),
            away: timelines.form(fixture.away, Side::Away, fixture.kickoff, window),
        })
        .collect()
}

#[cfg(test)]
mod tests;
