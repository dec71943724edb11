//! Seeded synthetic leagues: double round-robin seasons whose scores are drawn from a
//! Dixon-Coles model with known ratings.

use anyhow::bail;
use chrono::{DateTime, Duration, Utc};
use tinyrand::{Rand, Seeded, StdRand};
use tracing::debug;

use kickoff::linear::matrix::Matrix;
use kickoff::probs::SliceExt;

use crate::data::MatchRecord;
use crate::domain::{FixtureId, LeagueId, Match, MatchStatus, Score, TeamId};
use crate::scoregrid;

#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub league: LeagueId,
    pub teams: usize,

    /// Number of double round-robins.
    pub seasons: usize,

    pub start: DateTime<Utc>,
    pub days_between_rounds: i64,

    /// Scoring rate of an average away side against an average defence.
    pub base_rate: f64,

    /// Multiplier on the home scoring rate.
    pub home_advantage: f64,

    pub rho: f64,

    /// Ratings are drawn uniformly from ±`spread` and then centred.
    pub spread: f64,

    /// Ids are allocated upwards of these, so that several leagues can share one history.
    pub first_team: u32,
    pub first_fixture: u64,

    pub max_goals: u8,
    pub seed: u64,
}
impl LeagueConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.teams < 2 {
            bail!("at least two teams are required");
        }
        if self.seasons == 0 {
            bail!("at least one season is required");
        }
        if self.days_between_rounds <= 0 {
            bail!("rounds must be at least a day apart");
        }
        if self.base_rate <= 0.0 || self.home_advantage <= 0.0 {
            bail!("scoring rates must be positive");
        }
        if self.spread < 0.0 {
            bail!("rating spread cannot be negative");
        }
        if self.max_goals == 0 {
            bail!("max goals must be positive");
        }
        Ok(())
    }
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            league: "SYN".into(),
            teams: 20,
            seasons: 1,
            start: DateTime::<Utc>::UNIX_EPOCH + Duration::days(19_570),
            days_between_rounds: 7,
            base_rate: 1.15,
            home_advantage: 1.3,
            rho: -0.13,
            spread: 0.3,
            first_team: 0,
            first_fixture: 0,
            max_goals: 10,
            seed: 42,
        }
    }
}

/// The generated matches and the ratings that produced them.
#[derive(Debug, Clone)]
pub struct SyntheticLeague {
    pub league: LeagueId,
    pub matches: Vec<Match>,
    pub teams: Vec<TeamId>,
    pub attack: Vec<f64>,
    pub defence: Vec<f64>,
}
impl SyntheticLeague {
    pub fn generate(config: &LeagueConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let mut rand = StdRand::seed(config.seed);
        let teams = (0..config.teams)
            .map(|index| TeamId(config.first_team + index as u32))
            .collect::<Vec<_>>();
        let mut attack = draw_ratings(&mut rand, config.teams, config.spread);
        let mut defence = draw_ratings(&mut rand, config.teams, config.spread);
        attack.centre();
        defence.centre();

        let listed_at = config.start - Duration::days(30);
        let mut scoregrid = Matrix::square(config.max_goals as usize + 1);
        let mut matches = vec![];
        let rounds = round_robin(config.teams);
        for season in 0..config.seasons {
            for (leg, swap) in [(0, false), (1, true)] {
                for (round_index, round) in rounds.iter().enumerate() {
                    let round_number = (season * 2 + leg) * rounds.len() + round_index;
                    let kickoff = config.start
                        + Duration::days(round_number as i64 * config.days_between_rounds);
                    for &(first, second) in round {
                        let (home, away) = if swap { (second, first) } else { (first, second) };
                        let lambda = config.base_rate
                            * config.home_advantage
                            * f64::exp(attack[home] + defence[away]);
                        let mu = config.base_rate * f64::exp(attack[away] + defence[home]);
                        scoregrid::from_dixon_coles(lambda, mu, config.rho, &mut scoregrid)
                            .map_err(|err| {
                                anyhow::anyhow!("τ({}) = {} is not positive", err.score, err.tau)
                            })?;
                        let score = sample(&scoregrid, random_f64(&mut rand));
                        let available_at = kickoff + Duration::hours(2);
                        matches.push(Match {
                            id: FixtureId(config.first_fixture + matches.len() as u64),
                            league: config.league.clone(),
                            kickoff,
                            home: teams[home],
                            away: teams[away],
                            status: MatchStatus::Played,
                            score: Some(score),
                            listed_at,
                            available_at,
                            ingested_at: available_at + Duration::hours(1),
                        });
                    }
                }
            }
        }
        debug!(
            "generated {} matches of {} teams in {}",
            matches.len(),
            config.teams,
            config.league
        );
        Ok(Self {
            league: config.league.clone(),
            matches,
            teams,
            attack,
            defence,
        })
    }

    /// The matches as ingestion rows, naming each team after the league and its position.
    pub fn records(&self) -> Vec<MatchRecord> {
        let name_of = |team: TeamId| {
            let position = self
                .teams
                .iter()
                .position(|&other| other == team)
                .map_or(0, |index| index + 1);
            format!("{} {position}", self.league)
        };
        self.matches
            .iter()
            .map(|m| MatchRecord {
                id: m.id.0,
                league: m.league.0.clone(),
                kickoff: m.kickoff,
                home_team: name_of(m.home),
                away_team: name_of(m.away),
                status: m.status,
                home_goals: m.score.map(|score| score.home),
                away_goals: m.score.map(|score| score.away),
                listed_at: Some(m.listed_at),
                available_at: m.available_at,
                ingested_at: m.ingested_at,
            })
            .collect()
    }
}

fn draw_ratings(rand: &mut impl Rand, teams: usize, spread: f64) -> Vec<f64> {
    (0..teams)
        .map(|_| (2.0 * random_f64(rand) - 1.0) * spread)
        .collect()
}

/// Rounds of a single round-robin by the circle method; odd team counts sit one team out per
/// round.
fn round_robin(teams: usize) -> Vec<Vec<(usize, usize)>> {
    let slots = teams + teams % 2;
    let mut circle = (0..slots).collect::<Vec<_>>();
    let mut rounds = Vec::with_capacity(slots - 1);
    for round in 0..slots - 1 {
        let pairs = (0..slots / 2)
            .map(|index| (circle[index], circle[slots - 1 - index]))
            .filter(|&(first, second)| first < teams && second < teams)
            .map(|(first, second)| if round % 2 == 0 { (first, second) } else { (second, first) })
            .collect();
        rounds.push(pairs);
        circle[1..].rotate_right(1);
    }
    rounds
}

/// The scoreline at which the cumulative probability first reaches `random`.
fn sample(scoregrid: &Matrix<f64>, random: f64) -> Score {
    let mut cumulative = 0.0;
    let mut last = Score::nil_all();
    for ((home_goals, away_goals), &prob) in scoregrid.iter() {
        last = Score::new(home_goals as u8, away_goals as u8);
        cumulative += prob;
        if cumulative >= random {
            break;
        }
    }
    last
}

#[inline]
fn random_f64(rand: &mut impl Rand) -> f64 {
    rand.next_u64() as f64 / u64::MAX as f64
}
