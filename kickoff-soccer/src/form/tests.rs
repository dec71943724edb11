use super::*;
use crate::error::ErrorKind;
use crate::guard::{History, TemporalGuard};
use crate::testing::{kickoff, played, scheduled};

fn guard(matches: Vec<crate::domain::Match>) -> TemporalGuard {
    TemporalGuard::new(History::new(matches).unwrap(), kickoff(365))
}

#[test]
fn three_prior_home_matches() {
    let guard = guard(vec![
        played(1, 0, 0, 1, (2, 1)),
        played(2, 7, 0, 2, (1, 0)),
        played(3, 14, 0, 3, (1, 1)),
        // the current match and an away match of the same team must not count
        played(4, 21, 0, 1, (0, 5)),
        played(5, 10, 2, 0, (4, 0)),
    ]);
    let snapshot = guard.latest();
    let stats = form(&snapshot, TeamId(0), Side::Home, kickoff(21), 3)
        .into_result()
        .unwrap();
    assert_eq!(
        FormStats {
            matches: 3,
            wins: 2,
            draws: 1,
            losses: 0,
            goals_for: 4,
            goals_against: 2,
            goal_difference: 2,
            points: 7,
            avg_goals_for: 1.33,
            avg_goals_against: 0.67,
            win_pct: 66.7,
            unbeaten_pct: 100.0,
            streak: 0,
        },
        stats
    );
}

#[test]
fn insufficient_history_is_explicit() {
    let guard = guard(vec![played(1, 0, 0, 1, (2, 1)), played(2, 7, 0, 2, (1, 0))]);
    let snapshot = guard.latest();
    let form = form(&snapshot, TeamId(0), Side::Home, kickoff(14), 3);
    assert_eq!(
        Form::Insufficient(InsufficientHistory {
            team: TeamId(0),
            side: Side::Home,
            available: 2,
            required: 3,
        }),
        form
    );
    assert!(!form.is_complete());
    let err = form.clone().into_result().unwrap_err();
    assert_eq!(ErrorKind::InsufficientHistory, err.kind());
    assert_eq!(None, form.clone().or_exclude());
    assert_eq!(FormStats::default(), form.or_zero());
}

#[test]
fn roles_are_independent() {
    let guard = guard(vec![
        played(1, 0, 0, 1, (2, 1)),
        played(2, 7, 2, 0, (0, 3)),
        played(3, 14, 3, 0, (1, 1)),
    ]);
    let snapshot = guard.latest();
    let home = form(&snapshot, TeamId(0), Side::Home, kickoff(30), 1).into_result().unwrap();
    assert_eq!((1, 2, 1), (home.matches, home.goals_for, home.goals_against));

    let away = form(&snapshot, TeamId(0), Side::Away, kickoff(30), 2).into_result().unwrap();
    assert_eq!((1, 1, 0), (away.wins, away.draws, away.losses));
    assert_eq!((4, 1), (away.goals_for, away.goals_against));
    assert!(!form(&snapshot, TeamId(0), Side::Away, kickoff(30), 3).is_complete());
}

#[test]
fn window_takes_most_recent() {
    let guard = guard(vec![
        played(1, 0, 0, 1, (0, 4)),
        played(2, 7, 0, 2, (3, 0)),
        played(3, 14, 0, 3, (2, 0)),
        played(4, 21, 0, 4, (1, 0)),
    ]);
    let snapshot = guard.latest();
    let stats = form(&snapshot, TeamId(0), Side::Home, kickoff(28), 3).into_result().unwrap();
    assert_eq!(3, stats.wins);
    assert_eq!(0, stats.losses);
    assert_eq!(9, stats.points);
    assert_eq!(3, stats.streak);
    assert_eq!(2.0, stats.avg_goals_for);

    let stats = form(&snapshot, TeamId(0), Side::Home, kickoff(28), 4).into_result().unwrap();
    assert_eq!(75.0, stats.win_pct);
    assert_eq!(3, stats.streak);
}

#[test]
fn losing_streak() {
    let guard = guard(vec![
        played(1, 0, 1, 0, (0, 1)),
        played(2, 7, 2, 0, (2, 1)),
        played(3, 14, 3, 0, (3, 0)),
    ]);
    let snapshot = guard.latest();
    let stats = form(&snapshot, TeamId(0), Side::Away, kickoff(28), 3).into_result().unwrap();
    assert_eq!(-2, stats.streak);
    assert_eq!(33.3, stats.win_pct);
    assert_eq!(33.3, stats.unbeaten_pct);
    assert_eq!(-3, stats.goal_difference);
}

#[test]
fn unavailable_results_do_not_count() {
    let mut late = played(3, 14, 0, 3, (1, 1));
    late.available_at = kickoff(25);
    late.ingested_at = kickoff(25);
    let guard = guard(vec![played(1, 0, 0, 1, (2, 1)), played(2, 7, 0, 2, (1, 0)), late]);

    let snapshot = guard.as_of(kickoff(20)).unwrap();
    assert!(!form(&snapshot, TeamId(0), Side::Home, kickoff(21), 3).is_complete());

    let snapshot = guard.as_of(kickoff(25)).unwrap();
    assert!(form(&snapshot, TeamId(0), Side::Home, kickoff(26), 3).is_complete());
}

#[test]
fn table_of_fixtures() {
    let guard = guard(vec![
        played(1, 0, 0, 1, (2, 1)),
        played(2, 7, 1, 0, (1, 1)),
        played(3, 14, 0, 1, (0, 0)),
        scheduled(4, 21, 0, 1),
        scheduled(5, 28, 1, 0),
    ]);
    let snapshot = guard.as_of(kickoff(20)).unwrap();
    let fixtures = snapshot.scheduled().collect::<Vec<_>>();
    let table = form_table(&snapshot, &fixtures, 1);
    assert_eq!(2, table.len());

    assert_eq!(FixtureId(4), table[0].fixture);
    let home = table[0].home.clone().into_result().unwrap();
    assert_eq!(1, home.draws);
    let away = table[0].away.clone().into_result().unwrap();
    assert_eq!(1, away.draws);

    assert_eq!(FixtureId(5), table[1].fixture);
    let home = table[1].home.clone().into_result().unwrap();
    assert_eq!(1, home.draws);
    assert_eq!(1, home.goals_for);
    let away = table[1].away.clone().into_result().unwrap();
    assert_eq!(1, away.draws);
    assert_eq!(1, away.goals_against);
}
