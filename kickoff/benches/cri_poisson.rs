use criterion::{criterion_group, criterion_main, Criterion};

use kickoff::factorial::{Calculator, Lookup};
use kickoff::poisson;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("cri_poisson_univariate_calculator_11", |b| {
        b.iter(|| {
            (0..=10)
                .map(|k| poisson::univariate(k, 1.45, &Calculator))
                .sum::<f64>()
        });
    });

    c.bench_function("cri_poisson_univariate_lookup_11", |b| {
        let factorial = Lookup::default();
        b.iter(|| {
            (0..=10)
                .map(|k| poisson::univariate(k, 1.45, &factorial))
                .sum::<f64>()
        });
    });

    c.bench_function("cri_poisson_fill_11", |b| {
        let mut probs = [0.0; 11];
        b.iter(|| {
            poisson::fill(1.45, &mut probs);
            probs[10]
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
