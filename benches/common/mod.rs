//! Shared setup for benchmarks.

#![allow(dead_code)]

pub mod criterion_config {
    use std::time::Duration;

    use criterion::Criterion;

    /// Short warm-up and measurement windows for quick local comparisons.
    pub fn fast_criterion() -> Criterion {
        Criterion::default()
            .warm_up_time(Duration::from_millis(500))
            .measurement_time(Duration::from_secs(2))
            .sample_size(30)
    }
}

pub mod data {
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    /// A noisy monotone curve with `n` samples, rounded so that neighbours
    /// repeat now and then.
    pub fn noisy_curve(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut level = 0.0f64;
        (0..n)
            .map(|_| {
                level += rng.gen_range(0.0..0.01);
                let noisy = level + rng.gen_range(-0.002..0.002);
                (noisy * 1e3).round() / 1e3
            })
            .collect()
    }

    /// Uniform values in `[-range, range)`.
    pub fn uniform_values(n: usize, range: f64, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-range..range)).collect()
    }
}
