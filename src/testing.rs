//! Testing utilities for featbin.
//!
//! This module provides common assertion helpers and deterministic data
//! generators that can be used in unit tests, integration tests and benches.
//!
//! # Usage
//!
//! ```ignore
//! use featbin::assert_approx_eq_f64;
//! use featbin::testing::{staircase, assert_weights_approx_eq, DEFAULT_TOLERANCE};
//! ```

use approx::AbsDiffEq;

use crate::optimize::Binning;
use crate::table::BinTableEntry;

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for cost and weight comparisons.
///
/// Segment costs are computed from prefix sums, so exact zeros may come out
/// as tiny positive values.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Floating Point Assertions
// =============================================================================

/// Assert that two f64 values are approximately equal.
///
/// Uses absolute difference comparison with the given tolerance.
///
/// # Examples
///
/// ```
/// # use featbin::assert_approx_eq_f64;
/// assert_approx_eq_f64!(1.0f64, 1.0001f64, 0.001);
/// ```
///
/// # Panics
///
/// Panics if the absolute difference exceeds tolerance.
#[macro_export]
macro_rules! assert_approx_eq_f64 {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

/// Assert that two weight slices are approximately equal element-wise.
///
/// # Panics
///
/// Panics if lengths differ or any element differs by more than tolerance.
pub fn assert_weights_approx_eq(actual: &[f64], expected: &[f64], tolerance: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch - got {}, expected {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            a.abs_diff_eq(e, tolerance),
            "{context}[{i}]: {a} ≠ {e} (diff={}, tolerance={tolerance})",
            (a - e).abs()
        );
    }
}

/// Assert the contiguity invariant of a candidate: bins tile `[0, n)` in order
/// with no gaps or overlaps.
///
/// # Panics
///
/// Panics with the offending bin index if the invariant is broken.
pub fn assert_contiguous(binning: &Binning, n: usize) {
    let mut expected_start = 0;
    for (i, bin) in binning.bins().iter().enumerate() {
        assert_eq!(
            bin.start, expected_start,
            "{} bins: bin {i} starts at {} but previous bin ended at {}",
            binning.num_bins(),
            bin.start,
            expected_start
        );
        assert!(bin.end >= bin.start, "bin {i} is empty: {bin:?}");
        expected_start = bin.end + 1;
    }
    assert_eq!(
        expected_start,
        n,
        "{} bins cover [0, {expected_start}) instead of [0, {n})",
        binning.num_bins()
    );
}

// =============================================================================
// Deterministic Data Generators
// =============================================================================

/// A staircase weight curve: each level repeated `run_len` times.
pub fn staircase(levels: &[f64], run_len: usize) -> Vec<f64> {
    levels
        .iter()
        .flat_map(|&w| std::iter::repeat(w).take(run_len))
        .collect()
}

/// A smooth monotonic curve (logistic) sampled at `n` points in `[-6, 6]`.
///
/// Values are rounded to `decimals` places so that neighbouring samples
/// repeat, exercising the merge-on-equal path.
pub fn sigmoid_curve(n: usize, decimals: i32) -> Vec<f64> {
    let scale = 10f64.powi(decimals);
    (0..n)
        .map(|i| {
            let x = if n <= 1 {
                0.0
            } else {
                -6.0 + 12.0 * i as f64 / (n - 1) as f64
            };
            let y = 1.0 / (1.0 + (-x).exp());
            (y * scale).round() / scale
        })
        .collect()
}

/// Build half-open entries `[cuts[i], cuts[i+1])` named `<source>_<i>`.
pub fn contiguous_entries(source: &str, cuts: &[f64]) -> Vec<BinTableEntry> {
    cuts.windows(2)
        .enumerate()
        .map(|(i, w)| BinTableEntry::new(format!("{source}_{i}"), w[0], w[1]))
        .collect()
}
