//! The configuration bundle of the engine.

use std::ops::RangeInclusive;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use kickoff::opt::DescentConfig;

/// Largest supported per-side goal cap of the scoreline grid.
pub const MAX_GOALS_CAP: u8 = 30;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub estimator: EstimatorConfig,
    pub form: FormConfig,
    pub predictor: PredictorConfig,
    pub monitor: MonitorConfig,
}
impl Config {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.estimator.validate()?;
        self.form.validate()?;
        self.predictor.validate()?;
        self.monitor.validate()?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum HomeAdvantage {
    /// A fixed multiplier on the home scoring rate.
    Fixed(f64),
    /// Estimated jointly with the ratings.
    Fit,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Rho {
    Fixed(f64),
    Fit { init: f64 },
}
impl Rho {
    pub fn initial(&self) -> f64 {
        match self {
            Rho::Fixed(rho) => *rho,
            Rho::Fit { init } => *init,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Label of the model that fitted parameters are attributed to.
    pub model_version: String,

    /// Recency decay per day.
    pub xi: f64,

    pub home_advantage: HomeAdvantage,

    pub rho: Rho,

    pub descent: DescentConfig,
}
impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        const RHO_RANGE: RangeInclusive<f64> = -1.0..=1.0;
        if self.model_version.is_empty() {
            bail!("model version cannot be empty");
        }
        if !self.xi.is_finite() || self.xi < 0.0 {
            bail!("decay rate ({}) must be a non-negative number", self.xi);
        }
        if let HomeAdvantage::Fixed(multiplier) = self.home_advantage {
            if !multiplier.is_finite() || multiplier <= 0.0 {
                bail!("home advantage multiplier ({multiplier}) must be positive");
            }
        }
        let rho = self.rho.initial();
        if !RHO_RANGE.contains(&rho) {
            bail!("ρ ({rho}) outside of allowable range {RHO_RANGE:?}");
        }
        self.descent.validate()
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            model_version: "dixon-coles-v1".into(),
            xi: 0.0065,
            home_advantage: HomeAdvantage::Fixed(1.30),
            rho: Rho::Fit { init: -0.13 },
            descent: DescentConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Number of prior matches in a rolling window.
    pub window: usize,
}
impl FormConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.window == 0 {
            bail!("form window cannot be empty");
        }
        Ok(())
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self { window: 3 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Per-side goal cap of the scoreline grid.
    pub max_goals: u8,
}
impl PredictorConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_goals < 1 || self.max_goals > MAX_GOALS_CAP {
            bail!(
                "max goals ({}) must lie between 1 and {MAX_GOALS_CAP}",
                self.max_goals
            );
        }
        Ok(())
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self { max_goals: 10 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Number of most recent scored predictions in the rolling average.
    pub window: usize,

    /// Rolling Brier score at or above which the model is degraded.
    pub warning: f64,

    /// Rolling Brier score at or above which the model is no better than guessing.
    pub critical: f64,

    /// Probability bins of the reliability/resolution decomposition.
    pub bins: usize,
}
impl MonitorConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        const BRIER_RANGE: RangeInclusive<f64> = 0.0..=2.0;
        if self.window == 0 {
            bail!("monitor window cannot be empty");
        }
        if !BRIER_RANGE.contains(&self.warning) || !BRIER_RANGE.contains(&self.critical) {
            bail!("thresholds must lie in {BRIER_RANGE:?}");
        }
        if self.warning > self.critical {
            bail!(
                "warning threshold ({}) exceeds critical threshold ({})",
                self.warning,
                self.critical
            );
        }
        if self.bins < 2 {
            bail!("at least two probability bins are required");
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window: 100,
            warning: 0.62,
            critical: 0.667,
            bins: 10,
        }
    }
}
