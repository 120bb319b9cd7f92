//! Bin optimizer: piecewise-constant approximation of an ordered weight curve.
//!
//! Given weights `w[0..N)` the optimizer searches, for every bin count
//! `b in 1..=max_bins`, the contiguous partition into `b` bins with the lowest
//! total cost, where a bin's cost is the sum of squared deviations of its
//! weights from their mean (1-D k-means on a line).
//!
//! The search is a beam-limited dynamic program (see [`search`]); with a beam
//! narrower than the series the result is near-optimal rather than exact.
//!
//! # Key Types
//!
//! - [`BinOptimizer`]: runs the search and backtraces candidates
//! - [`OptimizerConfig`]: beam width, maximum bin count, parallelism
//! - [`Binning`] / [`Bin`]: one candidate partition and its bins
//! - [`SearchLattice`]: the raw pruned beams, for inspection
//!
//! # Example
//!
//! ```
//! use featbin::{BinOptimizer, OptimizerConfig};
//!
//! let optimizer = BinOptimizer::new(OptimizerConfig::builder().max_bins(3).build().unwrap());
//! let candidates = optimizer.optimize(&[0.1, 0.2, 0.1, 0.1, 0.16, 0.2, 0.25, 0.25, 0.3, 0.25]);
//!
//! // One candidate per achievable bin count, never more bins than asked for
//! assert_eq!(candidates.len(), 3);
//! assert!(candidates[2].cost() <= candidates[0].cost());
//! ```

mod backtrace;
mod binning;
mod config;
mod cost;
mod refine;
pub mod search;

pub use binning::{Bin, Binning, BinningError, ValueRange};
pub use config::{ConfigError, OptimizerConfig};
pub use cost::SegmentCosts;
pub use search::{Backpointer, Hypothesis, SearchLattice};

use tracing::info;

use crate::series::WeightSeries;

/// Beam-search bin optimizer.
#[derive(Debug, Clone, Default)]
pub struct BinOptimizer {
    config: OptimizerConfig,
}

impl BinOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Best candidate for every achievable bin count, ascending by bin count.
    ///
    /// Costs never increase with the bin count: when pruning lost every good
    /// partition for some count, that candidate is replaced by the best single
    /// split of the one before it.
    ///
    /// Empty input yields no candidates. Runs of equal weights are never split,
    /// so a series with `r` runs yields at most `min(r, max_bins)` candidates;
    /// when `max_bins >= r` the largest candidate reproduces the input exactly
    /// at cost 0.
    pub fn optimize(&self, weights: &[f64]) -> Vec<Binning> {
        let costs = SegmentCosts::new(weights);
        let lattice = self.search_with(weights, &costs);

        let mut candidates: Vec<Binning> = lattice
            .achievable_bin_counts()
            .into_iter()
            .filter_map(|b| backtrace::backtrace(&lattice, &costs, b))
            .collect();
        refine::enforce_monotone(&mut candidates, weights, &costs);

        for candidate in &candidates {
            info!(
                bins = candidate.num_bins(),
                cost = candidate.cost(),
                "final cost"
            );
        }
        candidates
    }

    /// [`optimize`](Self::optimize) over the weights of a series.
    pub fn optimize_series(&self, series: &WeightSeries) -> Vec<Binning> {
        self.optimize(&series.weights())
    }

    /// The candidate of [`optimize`](Self::optimize) with exactly `num_bins`
    /// bins, if reachable.
    pub fn optimize_for(&self, weights: &[f64], num_bins: usize) -> Option<Binning> {
        self.optimize(weights)
            .into_iter()
            .find(|c| c.num_bins() == num_bins)
    }

    /// Run the search and return the raw lattice.
    pub fn search(&self, weights: &[f64]) -> SearchLattice {
        self.search_with(weights, &SegmentCosts::new(weights))
    }

    fn search_with(&self, weights: &[f64], costs: &SegmentCosts) -> SearchLattice {
        search::search(
            weights,
            costs,
            self.config.max_bins,
            self.config.beam_width,
            self.config.parallelism,
        )
    }
}

/// The candidate with `num_bins` bins, or the largest one when `None`.
pub fn choose_candidate(candidates: &[Binning], num_bins: Option<usize>) -> Option<&Binning> {
    match num_bins {
        Some(b) => candidates.iter().find(|c| c.num_bins() == b),
        None => candidates.last(),
    }
}
