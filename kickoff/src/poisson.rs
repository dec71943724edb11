//! Poisson probability mass.

use crate::factorial::Factorial;

/// P(K = k) for K ~ Poisson(`lambda`).
#[inline]
pub fn univariate(k: u8, lambda: f64, factorial: &impl Factorial) -> f64 {
    lambda.powi(k as i32) * f64::exp(-lambda) / factorial.get(k)
}

/// ln P(K = k) for K ~ Poisson(`lambda`), given the log-rate `ln_lambda`. Taking the log-rate
/// directly avoids an `exp`/`ln` round trip when the caller works in log space.
#[inline]
pub fn ln_univariate(k: u8, lambda: f64, ln_lambda: f64, factorial: &impl Factorial) -> f64 {
    k as f64 * ln_lambda - lambda - factorial.ln(k)
}

/// Populates `probs[k]` with P(K = k) for every `k` in `0..probs.len()`, using the recurrence
/// P(k) = P(k - 1) · λ / k.
pub fn fill(lambda: f64, probs: &mut [f64]) {
    if probs.is_empty() {
        return;
    }
    probs[0] = f64::exp(-lambda);
    for k in 1..probs.len() {
        probs[k] = probs[k - 1] * lambda / k as f64;
    }
}
