use chrono::Duration;
use criterion::{criterion_group, criterion_main, Criterion};

use kickoff_soccer::config::EstimatorConfig;
use kickoff_soccer::guard::{History, TemporalGuard};
use kickoff_soccer::model::fit::Estimator;
use kickoff_soccer::synthetic::{LeagueConfig, SyntheticLeague};

fn criterion_benchmark(c: &mut Criterion) {
    let estimator = Estimator::try_from(EstimatorConfig::default()).unwrap();

    for teams in [10, 20] {
        let league = SyntheticLeague::generate(&LeagueConfig {
            teams,
            seasons: 2,
            ..LeagueConfig::default()
        })
        .unwrap();
        let now = league.matches.last().unwrap().ingested_at + Duration::days(1);
        let guard = TemporalGuard::new(History::new(league.matches.clone()).unwrap(), now);
        let snapshot = guard.as_of(now).unwrap();

        // sanity check
        {
            let params = estimator.fit(&snapshot, &league.league).unwrap();
            assert_eq!(league.matches.len(), params.training_matches);
            assert!((-1.0..=1.0).contains(&params.rho));
        }

        c.bench_function(&format!("cri_fit_dixon_coles_{teams}_teams"), |b| {
            b.iter(|| estimator.fit(&snapshot, &league.league));
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
