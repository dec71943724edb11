//! Minimisation of smooth objectives, optionally subject to linear equality constraints that
//! the objective expresses as a projection of the search direction.

use std::time::{Duration, Instant};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Sufficient-decrease constant of the backtracking line search.
const ARMIJO: f64 = 1e-4;

/// Curvatures below this are treated as this, so that flat coordinates take bounded steps.
const MIN_CURVATURE: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DescentConfig {
    /// Converged once an accepted step improves the objective by less than this.
    pub tolerance: f64,

    /// A projected gradient with no component larger than this is stationary.
    pub gradient_tolerance: f64,

    pub max_steps: u64,

    pub max_duration: Option<Duration>,

    /// Upper bound on the change of any single coordinate in one step.
    pub max_coordinate_step: f64,

    /// Line search gives up on a direction once the step fraction drops below this.
    pub min_step_fraction: f64,
}
impl DescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.tolerance <= 0.0 {
            bail!("tolerance must be positive")
        }
        if self.gradient_tolerance <= 0.0 {
            bail!("gradient tolerance must be positive")
        }
        if self.max_steps == 0 {
            bail!("at least one step must be permitted")
        }
        if self.max_coordinate_step <= 0.0 {
            bail!("max coordinate step must be positive")
        }
        if self.min_step_fraction <= 0.0 || self.min_step_fraction >= 1.0 {
            bail!("min step fraction must lie in (0, 1)")
        }
        Ok(())
    }
}

impl Default for DescentConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            gradient_tolerance: 1e-6,
            max_steps: 5_000,
            max_duration: None,
            max_coordinate_step: 1.0,
            min_step_fraction: 1e-12,
        }
    }
}

/// A function to be minimised. Infeasible points are reported as `None`; the search never
/// accepts them.
pub trait Objective {
    fn loss(&mut self, values: &[f64]) -> Option<f64>;

    /// Evaluates the loss, its gradient and a positive estimate of the diagonal of its Hessian.
    fn gradient(
        &mut self,
        values: &[f64],
        gradient: &mut [f64],
        curvature: &mut [f64],
    ) -> Option<f64>;

    /// Projects a search direction onto the constraint subspace. Unconstrained by default.
    fn project(&self, _direction: &mut [f64]) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Converged,
    StepBudget,
    TimeBudget,
    Stalled,
    Infeasible,
}

#[derive(Debug, Clone)]
pub struct DescentOutcome {
    pub steps: u64,
    pub termination: Termination,
    pub optimal_values: Vec<f64>,
    pub optimal_residual: f64,
    pub gradient_norm: f64,
    pub elapsed: Duration,
}
impl DescentOutcome {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Diagonally preconditioned Newton descent with projection and backtracking line search.
///
/// Each step moves along `-g / h` (gradient over curvature), projected onto the constraint
/// subspace; the step fraction is halved until the Armijo condition holds at a feasible point.
/// If the preconditioned direction is not a descent direction, the projected gradient is used
/// instead.
pub fn descend(
    config: &DescentConfig,
    init_values: &[f64],
    objective: &mut impl Objective,
) -> Result<DescentOutcome, anyhow::Error> {
    config.validate()?;

    let start_time = Instant::now();
    let dimensions = init_values.len();
    let mut values = init_values.to_vec();
    let mut gradient = vec![0.0; dimensions];
    let mut curvature = vec![0.0; dimensions];
    let mut direction = vec![0.0; dimensions];
    let mut candidate = vec![0.0; dimensions];

    let Some(mut residual) = objective.gradient(&values, &mut gradient, &mut curvature) else {
        return Ok(DescentOutcome {
            steps: 0,
            termination: Termination::Infeasible,
            optimal_values: values,
            optimal_residual: f64::INFINITY,
            gradient_norm: f64::INFINITY,
            elapsed: start_time.elapsed(),
        });
    };

    let mut steps = 0;
    let termination = loop {
        if steps == config.max_steps {
            break Termination::StepBudget;
        }
        if let Some(max_duration) = config.max_duration {
            if start_time.elapsed() > max_duration {
                break Termination::TimeBudget;
            }
        }
        steps += 1;

        for ((direction, &gradient), &curvature) in
            direction.iter_mut().zip(&gradient).zip(&curvature)
        {
            *direction = -gradient / f64::max(curvature, MIN_CURVATURE);
        }
        objective.project(&mut direction);
        let mut slope = dot(&gradient, &direction);
        if !(slope < 0.0) {
            let norm = projected_gradient(&*objective, &gradient, &mut direction);
            if norm <= config.gradient_tolerance {
                break Termination::Converged;
            }
            slope = dot(&gradient, &direction);
        }
        let largest = inf_norm(&direction);
        if largest > config.max_coordinate_step {
            let factor = config.max_coordinate_step / largest;
            direction.iter_mut().for_each(|element| *element *= factor);
            slope *= factor;
        }

        let mut fraction = 1.0;
        let accepted = loop {
            for ((candidate, &value), &direction) in
                candidate.iter_mut().zip(&values).zip(&direction)
            {
                *candidate = value + fraction * direction;
            }
            if let Some(loss) = objective.loss(&candidate) {
                if loss <= residual + ARMIJO * fraction * slope {
                    break Some(loss);
                }
            }
            fraction *= 0.5;
            if fraction < config.min_step_fraction {
                break None;
            }
        };

        let Some(new_residual) = accepted else {
            let norm = projected_gradient(&*objective, &gradient, &mut direction);
            break if norm <= config.gradient_tolerance {
                Termination::Converged
            } else {
                Termination::Stalled
            };
        };

        let improvement = residual - new_residual;
        values.copy_from_slice(&candidate);
        match objective.gradient(&values, &mut gradient, &mut curvature) {
            Some(loss) => residual = loss,
            None => break Termination::Infeasible,
        }
        trace!(
            "step: {steps}, residual: {residual}, improvement: {improvement}, fraction: {fraction}"
        );

        if improvement < config.tolerance {
            break Termination::Converged;
        }
    };

    let gradient_norm = projected_gradient(&*objective, &gradient, &mut direction);
    Ok(DescentOutcome {
        steps,
        termination,
        optimal_values: values,
        optimal_residual: residual,
        gradient_norm,
        elapsed: start_time.elapsed(),
    })
}

/// Writes the negated, projected gradient into `direction`, returning its largest magnitude.
fn projected_gradient(objective: &impl Objective, gradient: &[f64], direction: &mut [f64]) -> f64 {
    for (direction, &gradient) in direction.iter_mut().zip(gradient) {
        *direction = -gradient;
    }
    objective.project(direction);
    inf_norm(direction)
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

#[inline]
fn inf_norm(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |max, value| f64::max(max, value.abs()))
}
