//! Factorials and log-factorials of small integers.

/// Largest `n` for which `n!` is representable as a finite `f64`.
pub const MAX_EXACT: u8 = 170;

pub trait Factorial {
    /// `n!`, for `n` up to [MAX_EXACT].
    fn get(&self, n: u8) -> f64;

    /// `ln(n!)`, for any `n`.
    fn ln(&self, n: u8) -> f64;
}

/// Computes factorials on demand.
#[derive(Default)]
pub struct Calculator;

impl Factorial for Calculator {
    #[inline]
    fn get(&self, n: u8) -> f64 {
        assert!(n <= MAX_EXACT, "{n}! overflows");
        (2..=n).fold(1.0, |product, i| product * i as f64)
    }

    #[inline]
    fn ln(&self, n: u8) -> f64 {
        (2..=n).map(|i| f64::ln(i as f64)).sum()
    }
}

const LN_ENTRIES: usize = u8::MAX as usize + 1;

/// Precomputed tables; the default choice wherever factorials sit in a hot loop.
pub struct Lookup {
    entries: Vec<f64>,
    ln_entries: Vec<f64>,
}

impl Factorial for Lookup {
    #[inline]
    fn get(&self, n: u8) -> f64 {
        assert!(n <= MAX_EXACT, "{n}! overflows");
        self.entries[n as usize]
    }

    #[inline]
    fn ln(&self, n: u8) -> f64 {
        self.ln_entries[n as usize]
    }
}

impl Default for Lookup {
    fn default() -> Self {
        let mut entries = vec![1.0; MAX_EXACT as usize + 1];
        for i in 2..entries.len() {
            entries[i] = i as f64 * entries[i - 1];
        }
        let mut ln_entries = vec![0.0; LN_ENTRIES];
        for i in 2..LN_ENTRIES {
            ln_entries[i] = ln_entries[i - 1] + f64::ln(i as f64);
        }
        Self {
            entries,
            ln_entries,
        }
    }
}
