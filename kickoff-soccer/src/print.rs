use stanza::style::HAlign::Left;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::backtest::EpochReport;
use crate::domain::TeamRegistry;
use crate::form::{FixtureForm, Form};
use crate::guard::Fixture;
use crate::model::ModelParameters;
use crate::predictor::{Confidence, Prediction};

/// Ratings in descending order of attack minus defence.
pub fn tabulate_ratings(params: &ModelParameters, registry: &TeamRegistry) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Team".into(),
                "Attack".into(),
                "Defence".into(),
                "Matches".into(),
                "Weight".into(),
            ],
        ));
    let mut ratings = params.ratings.iter().collect::<Vec<_>>();
    ratings.sort_by(|a, b| (b.attack - b.defence).total_cmp(&(a.attack - a.defence)));
    for rating in ratings {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                registry.name_of(rating.team).into(),
                format!("{:+.3}", rating.attack).into(),
                format!("{:+.3}", rating.defence).into(),
                format!("{}", rating.matches).into(),
                format!("{:.1}", rating.weight).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_predictions(predictions: &[Prediction], registry: &TeamRegistry) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Home".into(),
                "Away".into(),
                "P(H)".into(),
                "P(D)".into(),
                "P(A)".into(),
                "xG".into(),
                "Likeliest".into(),
                "Note".into(),
            ],
        ));
    for prediction in predictions {
        let note = match &prediction.confidence {
            Confidence::Normal => String::new(),
            Confidence::Low { unrated } => format!("{} unrated", unrated.len()),
        };
        table.push_row(Row::new(
            Styles::default(),
            vec![
                registry.name_of(prediction.home).into(),
                registry.name_of(prediction.away).into(),
                format!("{:.3}", prediction.probs.home).into(),
                format!("{:.3}", prediction.probs.draw).into(),
                format!("{:.3}", prediction.probs.away).into(),
                format!(
                    "{:.2}-{:.2}",
                    prediction.expected_goals.0, prediction.expected_goals.1
                )
                .into(),
                format!("{}", prediction.most_likely.0).into(),
                note.into(),
            ],
        ));
    }
    table
}

/// Home form of the home side against away form of the away side, for fixtures paired with their
/// forms in the same order.
pub fn tabulate_form(
    fixtures: &[Fixture],
    forms: &[FixtureForm],
    registry: &TeamRegistry,
) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Home".into(),
                "W-D-L".into(),
                "Away".into(),
                "W-D-L".into(),
            ],
        ));
    let summarise = |form: &Form| match form {
        Form::Complete(stats) => format!("{}-{}-{}", stats.wins, stats.draws, stats.losses),
        Form::Insufficient(_) => "n/a".to_string(),
    };
    for (fixture, form) in fixtures.iter().zip(forms) {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                registry.name_of(fixture.home).into(),
                summarise(&form.home).into(),
                registry.name_of(fixture.away).into(),
                summarise(&form.away).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_backtest(reports: &[EpochReport]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(26)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Epoch".into(),
                "Trained".into(),
                "Scored".into(),
                "Brier".into(),
                "Log loss".into(),
                "Accuracy".into(),
                "Rolling".into(),
                "Status".into(),
            ],
        ));
    for report in reports {
        let cells = match &report.result {
            Ok(summary) => {
                let (rolling, status) = match summary.rolling {
                    Some((rolling, status)) => (format!("{rolling:.4}"), status.to_string()),
                    None => ("-".into(), "-".into()),
                };
                vec![
                    report.epoch.to_string().into(),
                    format!("{}", summary.training_matches).into(),
                    format!("{}", summary.metrics.samples).into(),
                    format!("{:.4}", summary.metrics.brier).into(),
                    format!("{:.4}", summary.metrics.log_loss).into(),
                    format!("{:.1}%", summary.metrics.accuracy * 100.0).into(),
                    rolling.into(),
                    status.into(),
                ]
            }
            Err(err) => vec![
                report.epoch.to_string().into(),
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
                err.kind().to_string().into(),
            ],
        };
        table.push_row(Row::new(Styles::default(), cells));
    }
    table
}
