//! Fixture loading utilities for integration tests.
//!
//! Fixtures live under `tests/test-cases/`. For assertion helpers, use
//! `featbin::testing`.

#![allow(dead_code)]

use std::path::PathBuf;

use featbin::{BinOptimizer, BinTable, OptimizerConfig, WeightSeries};

// Re-export testing utilities for convenience
#[allow(unused_imports)]
pub use featbin::assert_approx_eq_f64;
#[allow(unused_imports)]
pub use featbin::testing::{assert_contiguous, assert_weights_approx_eq, DEFAULT_TOLERANCE};

// =============================================================================
// Fixture Loading
// =============================================================================

/// Base directory for fixtures.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases")
}

pub fn series_path(name: &str) -> PathBuf {
    test_cases_dir().join("series").join(name)
}

pub fn table_path(name: &str) -> PathBuf {
    test_cases_dir().join("tables").join(name)
}

pub fn records_path(name: &str) -> PathBuf {
    test_cases_dir().join("records").join(name)
}

pub fn load_series(name: &str) -> WeightSeries {
    let path = series_path(name);
    WeightSeries::from_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {e}", path.display()))
}

pub fn load_table(name: &str) -> BinTable {
    let path = table_path(name);
    BinTable::from_file(&path).unwrap_or_else(|e| panic!("Failed to load {}: {e}", path.display()))
}

pub fn load_records(name: &str) -> String {
    let path = records_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()))
}

// =============================================================================
// Builders
// =============================================================================

pub fn optimizer(beam_width: usize, max_bins: usize) -> BinOptimizer {
    BinOptimizer::new(
        OptimizerConfig::builder()
            .beam_width(beam_width)
            .max_bins(max_bins)
            .build()
            .expect("valid optimizer config"),
    )
}

/// Exhaustive minimum within-bin SSE over all partitions into `b` bins
/// (O(N² · b) DP), for checking the beam search on small inputs.
pub fn exact_min_cost(weights: &[f64], b: usize) -> f64 {
    let n = weights.len();
    let sse = |a: usize, e: usize| {
        let seg = &weights[a..=e];
        let mean = seg.iter().sum::<f64>() / seg.len() as f64;
        seg.iter().map(|w| (w - mean).powi(2)).sum::<f64>()
    };

    // best[k][j]: min cost of splitting weights[0..j) into k bins
    let mut best = vec![vec![f64::INFINITY; n + 1]; b + 1];
    best[0][0] = 0.0;
    for k in 1..=b {
        for j in k..=n {
            for i in (k - 1)..j {
                let prev = best[k - 1][i];
                if prev.is_finite() {
                    best[k][j] = best[k][j].min(prev + sse(i, j - 1));
                }
            }
        }
    }
    best[b][n]
}
