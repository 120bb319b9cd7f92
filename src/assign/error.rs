//! Assigner error types.

use crate::record::RecordError;

/// Errors raised while assigning bins.
///
/// [`SchemaMismatch`](Self::SchemaMismatch) and
/// [`CoverageGap`](Self::CoverageGap) are per-run errors and abort a stream.
/// [`Malformed`](Self::Malformed) is per-record: the stream driver skips the
/// record and keeps going, so it only surfaces from the single-record API.
#[derive(Debug, thiserror::Error)]
pub enum AssignError {
    #[error("unrecognized feature: {feature}")]
    SchemaMismatch { feature: String },

    #[error("value {value} of feature {feature} matches no bin")]
    CoverageGap { feature: String, value: f64 },

    #[error("malformed record: {0}")]
    Malformed(#[from] RecordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A per-run error with the 1-based input line that raised it.
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<AssignError>,
    },
}

impl AssignError {
    /// The error without any line context.
    pub fn innermost(&self) -> &AssignError {
        let mut err = self;
        while let AssignError::AtLine { source, .. } = err {
            err = source;
        }
        err
    }

    /// Input line, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            AssignError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub(crate) fn at_line(self, line: usize) -> Self {
        AssignError::AtLine {
            line,
            source: Box::new(self),
        }
    }
}
