//! Optimizer configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use featbin::OptimizerConfig;
//!
//! // All defaults: beam width 10, at most 10 bins
//! let config = OptimizerConfig::builder().build().unwrap();
//! assert_eq!(config.beam_width, 10);
//!
//! let config = OptimizerConfig::builder().beam_width(64).max_bins(32).build().unwrap();
//! assert_eq!(config.max_bins, 32);
//!
//! assert!(OptimizerConfig::builder().beam_width(0).build().is_err());
//! ```

use bon::Builder;

use crate::utils::Parallelism;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during optimizer configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The beam must keep at least one hypothesis per state.
    #[error("beam_width must be at least 1")]
    InvalidBeamWidth,
    /// At least one bin is always produced for non-empty input.
    #[error("max_bins must be at least 1")]
    InvalidMaxBins,
}

// =============================================================================
// OptimizerConfig
// =============================================================================

/// Configuration for [`BinOptimizer`](super::BinOptimizer).
///
/// `beam_width` (K) bounds the hypotheses kept per `(index, bin count)` state
/// and trades accuracy for time: the search costs `O(N · max_bins · K)`.
/// Results are exact once K reaches the series length.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct OptimizerConfig {
    /// Hypotheses retained per state. Default: 10.
    #[builder(default = 10)]
    pub beam_width: usize,

    /// Largest bin count searched. Default: 10.
    #[builder(default = 10)]
    pub max_bins: usize,

    /// Whether beam pruning across bin counts may run on rayon.
    /// Default: sequential.
    #[builder(default)]
    pub parallelism: Parallelism,
}

impl<S: optimizer_config_builder::IsComplete> OptimizerConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `beam_width == 0` or `max_bins == 0`.
    pub fn build(self) -> Result<OptimizerConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl OptimizerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.beam_width == 0 {
            return Err(ConfigError::InvalidBeamWidth);
        }
        if self.max_bins == 0 {
            return Err(ConfigError::InvalidMaxBins);
        }
        Ok(())
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}
