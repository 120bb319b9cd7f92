//! Segment cost: sum of squared deviations from the segment mean.

/// Prefix sums over a weight series for O(1) segment statistics.
///
/// Weights are shifted by the first weight before accumulating, which keeps
/// `sum_sq - sum² / n` well conditioned for curves far from zero.
#[derive(Debug, Clone)]
pub struct SegmentCosts {
    shift: f64,
    /// `prefix_sum[i]` = sum of shifted weights `[0, i)`.
    prefix_sum: Vec<f64>,
    /// `prefix_sq[i]` = sum of squared shifted weights `[0, i)`.
    prefix_sq: Vec<f64>,
}

impl SegmentCosts {
    pub fn new(weights: &[f64]) -> Self {
        let shift = weights.first().copied().unwrap_or(0.0);
        let mut prefix_sum = Vec::with_capacity(weights.len() + 1);
        let mut prefix_sq = Vec::with_capacity(weights.len() + 1);
        prefix_sum.push(0.0);
        prefix_sq.push(0.0);

        let (mut sum, mut sq) = (0.0, 0.0);
        for &w in weights {
            let x = w - shift;
            sum += x;
            sq += x * x;
            prefix_sum.push(sum);
            prefix_sq.push(sq);
        }

        Self {
            shift,
            prefix_sum,
            prefix_sq,
        }
    }

    /// Number of weights covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.prefix_sum.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean weight of the inclusive segment `[a, b]`.
    #[inline]
    pub fn mean(&self, a: usize, b: usize) -> f64 {
        debug_assert!(a <= b && b < self.len(), "segment [{a}, {b}] out of range");
        let n = (b - a + 1) as f64;
        (self.prefix_sum[b + 1] - self.prefix_sum[a]) / n + self.shift
    }

    /// Sum of squared deviations from the mean over the inclusive segment `[a, b]`.
    ///
    /// A single-sample segment costs exactly 0.
    #[inline]
    pub fn cost(&self, a: usize, b: usize) -> f64 {
        debug_assert!(a <= b && b < self.len(), "segment [{a}, {b}] out of range");
        if a == b {
            return 0.0;
        }
        let n = (b - a + 1) as f64;
        let sum = self.prefix_sum[b + 1] - self.prefix_sum[a];
        let sq = self.prefix_sq[b + 1] - self.prefix_sq[a];
        (sq - sum * sum / n).max(0.0)
    }
}
