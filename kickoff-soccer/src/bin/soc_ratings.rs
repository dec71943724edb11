use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info, warn};

use kickoff::file::{read_json, write_json};
use kickoff::timed::Timed;
use kickoff_soccer::config::Config;
use kickoff_soccer::data::Dataset;
use kickoff_soccer::domain::LeagueId;
use kickoff_soccer::form::form_table;
use kickoff_soccer::guard::{History, TemporalGuard};
use kickoff_soccer::model::fit::{Estimator, FitJob};
use kickoff_soccer::predictor::Predictor;
use kickoff_soccer::print;
use kickoff_soccer::synthetic::{LeagueConfig, SyntheticLeague};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// JSON file of match records
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,

    /// generate a synthetic league with the given seed instead of reading a file
    #[clap(short = 's', long)]
    synthetic: Option<u64>,

    /// teams in the synthetic league
    #[clap(long, default_value = "20")]
    teams: usize,

    /// seasons of the synthetic league
    #[clap(long, default_value = "2")]
    seasons: usize,

    /// restrict to this league
    #[clap(short = 'l', long)]
    league: Option<String>,

    /// fit on what was visible at this instant (RFC 3339)
    #[clap(short = 'c', long)]
    cutoff: Option<DateTime<Utc>>,

    /// predict fixtures kicking off within this many days of the cutoff
    #[clap(long, default_value = "7")]
    horizon: i64,

    /// JSON file of engine configuration
    #[clap(long)]
    config: Option<PathBuf>,

    /// print the recent form of each side
    #[clap(long)]
    form: bool,

    /// write the fitted parameters to this JSON file
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.file.is_none() == self.synthetic.is_none() {
            bail!("either the -f or the -s flag must be specified");
        }
        if self.horizon <= 0 {
            bail!("horizon must be at least one day");
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let config = match &args.config {
        Some(path) => read_json::<Config>(path)?,
        None => Config::default(),
    };
    config.validate()?;

    let (dataset, now, default_cutoff) = load(&args)?;
    let cutoff = args.cutoff.unwrap_or(default_cutoff);
    let guard = TemporalGuard::new(History::new(dataset.matches)?, now);
    let snapshot = guard.as_of(cutoff)?;
    let leagues = match &args.league {
        Some(league) => vec![LeagueId::from(league.as_str())],
        None => snapshot.leagues(),
    };
    info!("fitting {} league(s) as of {cutoff}", leagues.len());

    let estimator = Estimator::try_from(config.estimator.clone())?;
    let predictor = Predictor::try_from(config.predictor.clone())?;
    let jobs = leagues
        .iter()
        .map(|league| FitJob {
            snapshot: snapshot.league(league),
            league: league.clone(),
        })
        .collect::<Vec<_>>();
    let fitted = Timed::result(|| Ok::<_, anyhow::Error>(estimator.fit_all(&jobs)))?;
    info!("fitted in {:?}", fitted.elapsed);

    let mut committed = vec![];
    for (job, (epoch, result)) in jobs.iter().zip(fitted.value) {
        let params = match result {
            Ok(params) => params,
            Err(err) => {
                warn!("could not fit {epoch} ({}): {err}", err.kind());
                continue;
            }
        };
        println!(
            "{epoch}: {} matches, home advantage: {:.3}, ρ: {:.4}, base rate: {:.3}, \
             ln L: {:.3}, steps: {}",
            params.training_matches,
            params.home_advantage,
            params.rho,
            params.log_base_rate.exp(),
            params.log_likelihood,
            params.steps
        );
        let table = print::tabulate_ratings(&params, &dataset.registry);
        println!("Ratings:\n{}", Console::default().render(&table));

        let fixtures = job
            .snapshot
            .scheduled()
            .filter(|fixture| {
                fixture.kickoff >= cutoff && fixture.kickoff < cutoff + Duration::days(args.horizon)
            })
            .collect::<Vec<_>>();
        let predictions = predictor
            .predict_all(&params, &fixtures)
            .into_iter()
            .filter_map(|result| match result {
                Ok(prediction) => Some(prediction),
                Err(err) => {
                    warn!("could not predict under {epoch}: {err}");
                    None
                }
            })
            .collect::<Vec<_>>();
        let table = print::tabulate_predictions(&predictions, &dataset.registry);
        println!("Predictions:\n{}", Console::default().render(&table));

        if args.form {
            let forms = form_table(&job.snapshot, &fixtures, config.form.window);
            let table = print::tabulate_form(&fixtures, &forms, &dataset.registry);
            println!(
                "Form over the last {} matches:\n{}",
                config.form.window,
                Console::default().render(&table)
            );
        }
        committed.push(params);
    }

    if let Some(path) = &args.out {
        write_json(path, &committed)?;
        info!("wrote {} epoch(s) to {}", committed.len(), path.display());
    }
    Ok(())
}

/// The dataset, the instant taken as "now", and the cutoff to use when none is given.
fn load(args: &Args) -> anyhow::Result<(Dataset, DateTime<Utc>, DateTime<Utc>)> {
    match (&args.file, args.synthetic) {
        (Some(path), _) => {
            let dataset = Dataset::read_json(path)?;
            let now = Utc::now();
            Ok((dataset, now, now))
        }
        (None, Some(seed)) => {
            let league = SyntheticLeague::generate(&LeagueConfig {
                teams: args.teams,
                seasons: args.seasons,
                seed,
                ..LeagueConfig::default()
            })?;
            let dataset = Dataset::from_records(&league.records())?;
            let Some(last) = dataset.matches.iter().map(|m| m.ingested_at).max() else {
                bail!("synthetic league has no matches");
            };
            let first = dataset.matches.iter().map(|m| m.kickoff).min().unwrap_or(last);
            Ok((dataset, last, first + (last - first) / 2))
        }
        (None, None) => bail!("no match source"),
    }
}
