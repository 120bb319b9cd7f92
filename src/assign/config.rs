//! Assigner configuration.
//!
//! # Example
//!
//! ```
//! use featbin::{AssignConfig, OutputMode, UnmatchedPolicy};
//!
//! let config = AssignConfig::builder()
//!     .mode(OutputMode::Real)
//!     .unmatched(UnmatchedPolicy::Drop)
//!     .single_feature("MaxLexEGivenF")
//!     .build()
//!     .unwrap();
//! assert!(!config.keep_original);
//!
//! assert!(AssignConfig::builder().single_feature("").build().is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::table::{Boundary, UnknownVariant};
use crate::utils::Parallelism;

// =============================================================================
// ConfigError
// =============================================================================

/// Invalid assigner settings. Raised before any record is read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("single feature name must not be empty")]
    EmptySingleFeature,
    #[error("batch_size must be at least 1")]
    InvalidBatchSize,
    #[error("single feature {0:?} has no entries in the bin table")]
    UnknownSingleFeature(String),
}

// =============================================================================
// Enumerations
// =============================================================================

/// Value written for each destination feature that fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `dest=1`.
    #[default]
    Indicator,
    /// `dest=<original value text>`.
    Real,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Indicator => "indicator",
            OutputMode::Real => "real",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indicator" => Ok(OutputMode::Indicator),
            "real" => Ok(OutputMode::Real),
            _ => Err(UnknownVariant {
                kind: "mode",
                value: s.to_string(),
                expected: "indicator, real",
            }),
        }
    }
}

/// What to do with a recognized feature whose value matches no bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Abort the run with a coverage gap.
    #[default]
    Die,
    /// Keep the original feature unchanged.
    #[serde(rename = "pass")]
    PassThrough,
    /// Remove the feature.
    Drop,
}

impl UnmatchedPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            UnmatchedPolicy::Die => "die",
            UnmatchedPolicy::PassThrough => "pass",
            UnmatchedPolicy::Drop => "drop",
        }
    }
}

impl fmt::Display for UnmatchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnmatchedPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "die" => Ok(UnmatchedPolicy::Die),
            "pass" => Ok(UnmatchedPolicy::PassThrough),
            "drop" => Ok(UnmatchedPolicy::Drop),
            _ => Err(UnknownVariant {
                kind: "unmatched policy",
                value: s.to_string(),
                expected: "die, pass, drop",
            }),
        }
    }
}

// =============================================================================
// AssignConfig
// =============================================================================

/// Configuration for [`Assigner`](super::Assigner).
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct AssignConfig {
    /// Indicator or real-valued destination features. Default: indicator.
    #[builder(default)]
    pub mode: OutputMode,

    /// Keep the source feature ahead of its destination features.
    #[builder(default)]
    pub keep_original: bool,

    /// Pass features missing from the table through instead of aborting.
    #[builder(default)]
    pub allow_unrecognized: bool,

    /// Bin only this feature; every other feature passes through unchanged.
    #[builder(into)]
    pub single_feature: Option<String>,

    /// Interval convention used for matching. Default: half-open.
    #[builder(default)]
    pub boundary: Boundary,

    /// Handling of values that fall in no bin. Default: die.
    #[builder(default)]
    pub unmatched: UnmatchedPolicy,

    /// Whether record batches may be processed on rayon. Default: sequential.
    #[builder(default)]
    pub parallelism: Parallelism,

    /// Records read per batch by the stream driver. Default: 1024.
    #[builder(default = 1024)]
    pub batch_size: usize,
}

impl<S: assign_config_builder::IsComplete> AssignConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty single-feature name or a zero
    /// batch size.
    pub fn build(self) -> Result<AssignConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl AssignConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.single_feature.as_deref() == Some("") {
            return Err(ConfigError::EmptySingleFeature);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }
}

impl Default for AssignConfig {
    fn default() -> Self {
        Self::builder().__build_internal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let config = AssignConfig::default();
        assert_eq!(config.mode, OutputMode::Indicator);
        assert_eq!(config.boundary, Boundary::HalfOpen);
        assert_eq!(config.unmatched, UnmatchedPolicy::Die);
        assert!(!config.keep_original);
        assert!(!config.allow_unrecognized);
        assert!(config.single_feature.is_none());
        assert_eq!(config.batch_size, 1024);
    }

    #[test]
    fn rejects_bad_settings() {
        assert_eq!(
            AssignConfig::builder().single_feature("").build().unwrap_err(),
            ConfigError::EmptySingleFeature
        );
        assert_eq!(
            AssignConfig::builder().batch_size(0).build().unwrap_err(),
            ConfigError::InvalidBatchSize
        );
    }

    #[rstest]
    #[case("indicator", OutputMode::Indicator)]
    #[case("real", OutputMode::Real)]
    fn mode_spellings(#[case] text: &str, #[case] mode: OutputMode) {
        assert_eq!(text.parse::<OutputMode>().unwrap(), mode);
        assert_eq!(mode.to_string(), text);
    }

    #[rstest]
    #[case("die", UnmatchedPolicy::Die)]
    #[case("pass", UnmatchedPolicy::PassThrough)]
    #[case("drop", UnmatchedPolicy::Drop)]
    fn policy_spellings(#[case] text: &str, #[case] policy: UnmatchedPolicy) {
        assert_eq!(text.parse::<UnmatchedPolicy>().unwrap(), policy);
        assert_eq!(
            serde_json::to_string(&policy).unwrap(),
            format!("\"{text}\"")
        );
    }

    #[test]
    fn unknown_spelling_names_alternatives() {
        let err = "binary".parse::<OutputMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unrecognized mode: \"binary\" (expected one of indicator, real)"
        );
    }
}
