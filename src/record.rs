//! Feature records in the five-field `|||` form.
//!
//! ```text
//! [X] ||| le chat ||| the cat ||| EGivenF=0.25 Count=3 ||| 0-0 1-1
//! ```
//!
//! Fields are: left-hand side, source span, target span, space-separated
//! `name=value` features, and space-separated `source-target` alignment links.
//! Only the feature list is ever rewritten; the other fields are carried
//! through verbatim.

use std::fmt;

// =============================================================================
// Error types
// =============================================================================

/// Why a record line was rejected. Malformed records are skipped by the
/// stream driver, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("expected 5 fields separated by ' ||| ', found {found}")]
    FieldCount { found: usize },
    #[error("invalid feature {token:?} (expected name=value)")]
    InvalidFeature { token: String },
    #[error("invalid alignment link {token:?} (expected i-j)")]
    InvalidAlignment { token: String },
    #[error("alignment link {source_index}-{target_index} out of range for {source_len} source and {target_len} target tokens")]
    AlignmentOutOfRange {
        source_index: usize,
        target_index: usize,
        source_len: usize,
        target_len: usize,
    },
    #[error("record is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
}

const FIELD_SEPARATOR: &str = " ||| ";

// =============================================================================
// Feature
// =============================================================================

/// One `name=value` pair. The original text of the value is kept so that
/// pass-through features are written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    name: String,
    raw: String,
    value: f64,
}

impl Feature {
    /// A real-valued feature.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            raw: value.to_string(),
            value,
        }
    }

    /// An indicator feature (`name=1`).
    pub fn indicator(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: "1".to_string(),
            value: 1.0,
        }
    }

    /// Same value text under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: self.raw.clone(),
            value: self.value,
        }
    }

    /// Parse `name=value`.
    pub fn parse(token: &str) -> Result<Self, RecordError> {
        let invalid = || RecordError::InvalidFeature {
            token: token.to_string(),
        };
        let (name, raw) = token.split_once('=').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }
        let value = raw.parse::<f64>().map_err(|_| invalid())?;
        Ok(Self {
            name: name.to_string(),
            raw: raw.to_string(),
            value,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Value as it appeared in the input.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.raw)
    }
}

// =============================================================================
// Alignment
// =============================================================================

/// Link between a source token and a target token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentLink {
    pub source: usize,
    pub target: usize,
}

impl AlignmentLink {
    fn parse(token: &str) -> Result<Self, RecordError> {
        let invalid = || RecordError::InvalidAlignment {
            token: token.to_string(),
        };
        let (s, t) = token.split_once('-').ok_or_else(invalid)?;
        Ok(Self {
            source: s.parse().map_err(|_| invalid())?,
            target: t.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for AlignmentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

// =============================================================================
// FeatureRecord
// =============================================================================

/// One grammar rule with its features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub lhs: String,
    pub source: String,
    pub target: String,
    /// Insertion order is preserved on output.
    pub features: Vec<Feature>,
    pub alignment: Vec<AlignmentLink>,
}

impl FeatureRecord {
    /// Parse one line. A trailing newline is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the field count is wrong, a feature is not
    /// `name=value`, or an alignment link is malformed or points past the end
    /// of its span.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        let [lhs, source, target, features, alignment] = fields[..] else {
            return Err(RecordError::FieldCount {
                found: fields.len(),
            });
        };

        let features = features
            .split_whitespace()
            .map(Feature::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let source_len = source.split_whitespace().count();
        let target_len = target.split_whitespace().count();
        let alignment = alignment
            .split_whitespace()
            .map(|token| {
                let link = AlignmentLink::parse(token)?;
                if link.source >= source_len || link.target >= target_len {
                    return Err(RecordError::AlignmentOutOfRange {
                        source_index: link.source,
                        target_index: link.target,
                        source_len,
                        target_len,
                    });
                }
                Ok(link)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            lhs: lhs.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            features,
            alignment,
        })
    }

    /// Copy of this record with a new feature list.
    pub fn with_features(&self, features: Vec<Feature>) -> Self {
        Self {
            lhs: self.lhs.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            features,
            alignment: self.alignment.clone(),
        }
    }

    /// Look up the first feature with `name`.
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}", self.lhs, self.source, self.target)?;
        for (i, feature) in self.features.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{feature}")?;
        }
        f.write_str(FIELD_SEPARATOR)?;
        for (i, link) in self.alignment.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{link}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for FeatureRecord {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
