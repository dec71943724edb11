//! Numeric building blocks for scoreline models: factorial tables, Poisson probabilities,
//! a projected descent optimiser, dense matrices and probability slice helpers.

#![allow(clippy::too_many_arguments)]

pub mod factorial;
pub mod file;
pub mod linear;
pub mod lookup;
pub mod opt;
pub mod poisson;
pub mod probs;
pub mod timed;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
