//! Match records for tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{FixtureId, Match, MatchStatus, Score, TeamId};

pub const LEAGUE: &str = "E0";

/// 15:00 UTC on the `day`-th day after 1 August 2023.
pub fn kickoff(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 8, 1, 15, 0, 0).unwrap() + Duration::days(day)
}

/// A match listed well ahead of the season whose result became available two hours after kickoff.
pub fn played(id: u64, day: i64, home: u32, away: u32, score: (u8, u8)) -> Match {
    let kickoff = kickoff(day);
    Match {
        id: FixtureId(id),
        league: LEAGUE.into(),
        kickoff,
        home: TeamId(home),
        away: TeamId(away),
        status: MatchStatus::Played,
        score: Some(Score::new(score.0, score.1)),
        listed_at: self::kickoff(-60),
        available_at: kickoff + Duration::hours(2),
        ingested_at: kickoff + Duration::hours(3),
    }
}

pub fn scheduled(id: u64, day: i64, home: u32, away: u32) -> Match {
    Match {
        status: MatchStatus::Scheduled,
        score: None,
        available_at: kickoff(-60),
        ingested_at: kickoff(-60),
        ..played(id, day, home, away, (0, 0))
    }
}
