//! Point-in-time Dixon-Coles prediction of football match outcomes.

pub mod backtest;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod form;
pub mod guard;
pub mod model;
pub mod predictor;
pub mod print;
pub mod scoregrid;
pub mod store;
pub mod synthetic;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
