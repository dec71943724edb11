use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::bail;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use kickoff::file::read_json;
use kickoff::timed::Timed;
use kickoff_soccer::backtest::{Backtest, WalkForward};
use kickoff_soccer::config::Config;
use kickoff_soccer::data::Dataset;
use kickoff_soccer::domain::{LeagueId, Match};
use kickoff_soccer::evaluation::summarise;
use kickoff_soccer::guard::{History, TemporalGuard};
use kickoff_soccer::print;
use kickoff_soccer::store::Repository;
use kickoff_soccer::synthetic::{LeagueConfig, SyntheticLeague};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// JSON file of match records
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,

    /// generate synthetic leagues with the given seed instead of reading a file
    #[clap(short = 's', long)]
    synthetic: Option<u64>,

    /// number of synthetic leagues
    #[clap(long, default_value = "1")]
    leagues: usize,

    /// seasons of each synthetic league
    #[clap(long, default_value = "3")]
    seasons: usize,

    /// restrict to this league
    #[clap(short = 'l', long)]
    league: Option<String>,

    /// first cutoff (RFC 3339); defaults to a season into the data
    #[clap(long)]
    first_cutoff: Option<DateTime<Utc>>,

    /// days between cutoffs
    #[clap(long, default_value = "28")]
    step_days: i64,

    /// number of cutoffs; defaults to as many as fit before the last result
    #[clap(long)]
    cutoffs: Option<usize>,

    /// JSON file of engine configuration
    #[clap(long)]
    config: Option<PathBuf>,

    /// load the repository from, and save it back to, this JSON file
    #[clap(short = 'r', long)]
    repository: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.file.is_none() == self.synthetic.is_none() {
            bail!("either the -f or the -s flag must be specified");
        }
        if self.leagues == 0 {
            bail!("at least one league is required");
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
    let dataset = load(&args)?;
    let Some(first_kickoff) = dataset.matches.iter().map(|m| m.kickoff).min() else {
        return Err("no matches to backtest".into());
    };
    let now = dataset
        .matches
        .iter()
        .map(|m| m.ingested_at)
        .max()
        .unwrap_or(first_kickoff);
    let last_kickoff = dataset
        .matches
        .iter()
        .map(|m| m.kickoff)
        .max()
        .unwrap_or(first_kickoff);

    let first_cutoff = args
        .first_cutoff
        .unwrap_or(first_kickoff + Duration::days(365));
    let cutoffs = args.cutoffs.unwrap_or_else(|| {
        let span = (last_kickoff - first_cutoff).num_days();
        (span / args.step_days.max(1) + 1).max(1) as usize
    });
    let walk = WalkForward {
        first_cutoff,
        step_days: args.step_days,
        cutoffs,
    };
    walk.validate()?;

    let leagues = match &args.league {
        Some(league) => vec![LeagueId::from(league.as_str())],
        None => distinct_leagues(&dataset.matches),
    };
    let repository = match &args.repository {
        Some(path) if path.exists() => Repository::load(path)?,
        _ => Repository::default(),
    };
    let model_version = config.estimator.model_version.clone();
    let guard = TemporalGuard::new(History::new(dataset.matches)?, now);
    let backtest = Backtest::new(&guard, &repository, config)?;
    info!(
        "backtesting {} league(s) over {} cutoff(s) from {first_cutoff}",
        leagues.len(),
        walk.cutoffs
    );
    let reports = Timed::result(|| backtest.run(&leagues, &walk))?;
    info!("backtested in {:?}", reports.elapsed);

    let table = print::tabulate_backtest(&reports.value);
    println!("Epochs:\n{}", Console::default().render(&table));

    let scores = repository
        .scores(&model_version)
        .into_iter()
        .map(|record| (record.probs, record.outcome))
        .collect::<Vec<_>>();
    let metrics = summarise(&scores);
    println!(
        "{model_version}: {} scored, Brier: {:.4}, log loss: {:.4}, accuracy: {:.1}%",
        metrics.samples,
        metrics.brier,
        metrics.log_loss,
        metrics.accuracy * 100.0
    );

    if let Some(path) = &args.repository {
        repository.save(path)?;
        let (epochs, predictions, scores) = repository.counts();
        info!(
            "saved {epochs} epoch(s), {predictions} prediction(s) and {scores} score(s) to {}",
            path.display()
        );
    }
    Ok(())
}

fn load(args: &Args) -> anyhow::Result<Dataset> {
    match (&args.file, args.synthetic) {
        (Some(path), _) => Ok(Dataset::read_json(path)?),
        (None, Some(seed)) => {
            let mut records = vec![];
            for index in 0..args.leagues {
                let league = SyntheticLeague::generate(&LeagueConfig {
                    league: LeagueId(format!("SYN{}", index + 1)),
                    seasons: args.seasons,
                    first_fixture: records.len() as u64,
                    seed: seed + index as u64,
                    ..LeagueConfig::default()
                })?;
                records.extend(league.records());
            }
            Ok(Dataset::from_records(&records)?)
        }
        (None, None) => bail!("no match source"),
    }
}

fn distinct_leagues(matches: &[Match]) -> Vec<LeagueId> {
    let mut leagues = matches.iter().map(|m| m.league.clone()).collect::<Vec<_>>();
    leagues.sort();
    leagues.dedup();
    leagues
}
