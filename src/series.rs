//! Weight series: the ordered `(value, weight)` curve the optimizer approximates.
//!
//! Series are read from line-oriented text with a single header line followed
//! by one `value,weight` pair per line:
//!
//! ```text
//! MaxLexEGivenF,weight
//! 0.0125,0.31
//! 0.0250,0.29
//! ```
//!
//! Blank lines are ignored. The order of the samples is taken as given; the
//! optimizer only ever merges neighbours in this order.

use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while reading a weight series.
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected `value,weight`, got {content:?}")]
    Malformed { line: usize, content: String },

    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },
}

/// One observed point of the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Position on the generic axis (e.g. a feature magnitude).
    pub value: f64,
    /// The quantity being approximated (e.g. a learned weight).
    pub weight: f64,
}

impl Sample {
    #[inline]
    pub fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// An ordered series of samples plus the header line it was read with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightSeries {
    header: Option<String>,
    samples: Vec<Sample>,
}

impl WeightSeries {
    /// Build a series from samples, without a header.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            header: None,
            samples,
        }
    }

    /// Build a series from parallel value and weight slices.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    pub fn from_columns(values: &[f64], weights: &[f64]) -> Self {
        assert_eq!(
            values.len(),
            weights.len(),
            "values and weights must have the same length"
        );
        Self::new(
            values
                .iter()
                .zip(weights)
                .map(|(&v, &w)| Sample::new(v, w))
                .collect(),
        )
    }

    /// Read a series from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeriesError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Read a series: the first line is the header, the rest are samples.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SeriesError> {
        let mut lines = reader.lines();
        let header = lines.next().transpose()?.map(|h| h.trim_end().to_string());

        let mut samples = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            // header is line 1
            let line_no = idx + 2;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            samples.push(parse_sample(trimmed, line_no)?);
        }

        let series = Self { header, samples };
        if !series.is_monotonic() {
            tracing::warn!(
                samples = series.len(),
                "value series is not monotonic; bins will merge neighbours in input order"
            );
        }
        Ok(series)
    }

    /// Parse a series from a string (header line first).
    pub fn parse_str(content: &str) -> Result<Self, SeriesError> {
        Self::from_reader(content.as_bytes())
    }

    /// Header line, if the series was read from text.
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The weights, in series order.
    pub fn weights(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.weight).collect()
    }

    /// The values, in series order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// Whether values never decrease.
    pub fn is_non_decreasing(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].value <= w[1].value)
    }

    /// Whether values never increase.
    pub fn is_non_increasing(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].value >= w[1].value)
    }

    /// Whether values are sorted in either direction.
    pub fn is_monotonic(&self) -> bool {
        self.is_non_decreasing() || self.is_non_increasing()
    }

    /// Sorted strictly downwards somewhere and never upwards.
    pub(crate) fn is_descending(&self) -> bool {
        self.is_non_increasing() && !self.is_non_decreasing()
    }
}

fn parse_sample(line: &str, line_no: usize) -> Result<Sample, SeriesError> {
    let mut parts = line.split(',');
    let (Some(value), Some(weight), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(SeriesError::Malformed {
            line: line_no,
            content: line.to_string(),
        });
    };
    Ok(Sample::new(
        parse_number(value, line_no)?,
        parse_number(weight, line_no)?,
    ))
}

fn parse_number(token: &str, line_no: usize) -> Result<f64, SeriesError> {
    token
        .trim()
        .parse::<f64>()
        .map_err(|_| SeriesError::InvalidNumber {
            line: line_no,
            token: token.to_string(),
        })
}
