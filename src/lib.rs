//! featbin: scalar quantization of weighted feature curves.
//!
//! This crate provides the two halves of a feature discretization pipeline:
//!
//! - An offline **bin optimizer** that approximates an ordered weight curve with
//!   a small number of contiguous, piecewise-constant bins (beam-limited DP).
//! - An online **bin assigner** that maps scalar feature values onto a table of
//!   (possibly overlapping) value intervals, emitting indicator or pass-through
//!   features.
//!
//! The two halves share one contract, the [`BinTable`], persisted in a
//! line-oriented text format (see [`table::text`]).
//!
//! # Key Types
//!
//! - [`BinOptimizer`] / [`OptimizerConfig`] - Training-time bin search
//! - [`Binning`] - One candidate partition with its total cost
//! - [`BinTable`] / [`BinTableEntry`] - Runtime interval table
//! - [`Assigner`] / [`AssignConfig`] - Runtime discretization of [`FeatureRecord`]s
//!
//! # Example
//!
//! ```
//! use featbin::{BinOptimizer, OptimizerConfig};
//!
//! let config = OptimizerConfig::builder().beam_width(4).max_bins(2).build().unwrap();
//! let weights = [0.1, 0.1, 0.5, 0.5, 0.5, 0.9];
//! let candidates = BinOptimizer::new(config).optimize(&weights);
//!
//! assert_eq!(candidates.len(), 2);
//! assert_eq!(candidates[1].num_bins(), 2);
//! ```

// Re-export approx traits for users who want to compare costs
pub use approx;

pub mod assign;
pub mod microbin;
pub mod optimize;
pub mod record;
pub mod series;
pub mod table;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use assign::{AssignConfig, AssignError, AssignStats, Assigner, OutputMode, UnmatchedPolicy};
pub use optimize::{Bin, BinOptimizer, Binning, BinningError, OptimizerConfig};
pub use record::{Feature, FeatureRecord, RecordError};
pub use series::{Sample, WeightSeries};
pub use table::{BinTable, BinTableEntry, Boundary};
pub use utils::{Parallelism, run_with_threads};
