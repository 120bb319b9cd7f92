//! Microbins: fine-grained value grids derived from coarse bins.
//!
//! A macrobin series (`value,weight` pairs, as produced from a [`Binning`])
//! marks where each coarse bin starts. [`expand_macrobins`] resamples observed
//! feature values inside every macrobin into a finer grid of microbins that
//! inherit the macrobin weight. A [`MicrobinTable`] then snaps raw values onto
//! that grid, either to look up a weight or to name an indicator feature.
//!
//! [`Binning`]: crate::optimize::Binning

use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::record::{Feature, FeatureRecord};
use crate::series::{Sample, SeriesError, WeightSeries};

// =============================================================================
// MicrobinTable
// =============================================================================

/// Sorted microbin boundaries with their weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MicrobinTable {
    boundaries: Vec<f64>,
    weights: Vec<f64>,
}

impl MicrobinTable {
    /// Boundaries are taken in series order and expected to be ascending.
    pub fn from_series(series: &WeightSeries) -> Self {
        Self {
            boundaries: series.values(),
            weights: series.weights(),
        }
    }

    /// Load `value,weight` text with a header line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeriesError> {
        WeightSeries::from_file(path).map(|s| Self::from_series(&s))
    }

    pub fn parse_str(content: &str) -> Result<Self, SeriesError> {
        WeightSeries::parse_str(content).map(|s| Self::from_series(&s))
    }

    #[inline]
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Greatest boundary `<= value`; the first boundary when `value` lies
    /// below all of them. `None` for an empty table.
    pub fn floor(&self, value: f64) -> Option<f64> {
        let upper = self.boundaries.partition_point(|&b| b <= value);
        self.boundaries.get(upper.saturating_sub(1)).copied()
    }

    /// Weight of the first boundary `>= value`; the last weight when `value`
    /// exceeds every boundary. `None` for an empty table.
    pub fn weight_for(&self, value: f64) -> Option<f64> {
        let idx = self
            .boundaries
            .iter()
            .position(|&b| b >= value)
            .unwrap_or(self.boundaries.len().checked_sub(1)?);
        self.weights.get(idx).copied()
    }
}

// =============================================================================
// Macrobin expansion
// =============================================================================

/// Read one number per line after a header line. Blank lines are skipped.
pub fn read_values<R: BufRead>(reader: R) -> Result<Vec<f64>, SeriesError> {
    let mut values = Vec::new();
    for (idx, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let value = token.parse::<f64>().map_err(|_| SeriesError::InvalidNumber {
            line: idx + 1,
            token: token.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Resample `values` into microbins, about `per_bin` per macrobin.
///
/// Macrobin `i` spans `[low_i, low_{i+1}]` (the last one is open to `+inf`);
/// both ends are inclusive, so a value on a shared boundary is a candidate of
/// both neighbours. Candidates are taken in input order and thinned to evenly
/// spaced picks; every pick becomes a microbin carrying the macrobin weight.
/// A macrobin without candidates contributes nothing.
pub fn expand_macrobins(macrobins: &[Sample], values: &[f64], per_bin: usize) -> Vec<Sample> {
    let mut microbins = Vec::new();

    for (i, macrobin) in macrobins.iter().enumerate() {
        let low = macrobin.value;
        let high = macrobins.get(i + 1).map_or(f64::INFINITY, |next| next.value);
        let candidates: Vec<f64> = values
            .iter()
            .copied()
            .filter(|&x| x >= low && x <= high)
            .collect();
        if candidates.is_empty() {
            debug!(low, high, "macrobin has no candidates");
            continue;
        }

        let step = per_bin as f64 / candidates.len() as f64;
        let mut accum = 0.0_f64;
        let mut previous = None;
        let before = microbins.len();
        for x in candidates.iter().copied() {
            let slot = accum as usize;
            if previous != Some(slot) {
                previous = Some(slot);
                microbins.push(Sample::new(x, macrobin.weight));
            }
            accum += step;
        }

        info!(
            low,
            high,
            candidates = candidates.len(),
            selected = microbins.len() - before,
            "expanded macrobin"
        );
    }

    microbins
}

/// Write [`expand_macrobins`] output as `value,weight` lines with six
/// decimals, under the macrobin header (`value,weight` when there is none).
///
/// Returns the number of microbins written.
pub fn write_microbins<W: Write>(
    macrobins: &WeightSeries,
    values: &[f64],
    per_bin: usize,
    mut out: W,
) -> io::Result<usize> {
    writeln!(out, "{}", macrobins.header().unwrap_or("value,weight"))?;
    let microbins = expand_macrobins(macrobins.samples(), values, per_bin);
    for sample in &microbins {
        writeln!(out, "{:.6},{:.6}", sample.value, sample.weight)?;
    }
    Ok(microbins.len())
}

/// Look up a weight for every value line of `input` and write `value,weight`.
///
/// `header` is echoed first when given. The value text is written back as
/// read; blank lines are skipped. An empty table answers weight 0.
///
/// Returns the number of values answered.
pub fn write_lookups<R: BufRead, W: Write>(
    table: &MicrobinTable,
    header: Option<&str>,
    input: R,
    mut out: W,
) -> Result<usize, SeriesError> {
    if let Some(header) = header {
        writeln!(out, "{header}")?;
    }
    let mut answered = 0;
    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let value = text.parse::<f64>().map_err(|_| SeriesError::InvalidNumber {
            line: idx + 1,
            token: text.to_string(),
        })?;
        let weight = table.weight_for(value).unwrap_or_default();
        writeln!(out, "{text},{weight}")?;
        answered += 1;
    }
    Ok(answered)
}

// =============================================================================
// Real-valued features to indicators
// =============================================================================

/// How a real value is folded into an indicator feature name.
#[derive(Debug, Clone)]
pub enum IndicatorNaming {
    /// `name@<value with p decimals>`.
    Precision(usize),
    /// `name@<microbin floor in %.6e form>`.
    Microbins(MicrobinTable),
}

impl IndicatorNaming {
    pub fn name_for(&self, name: &str, value: f64) -> String {
        match self {
            IndicatorNaming::Precision(precision) => format!("{name}@{value:.precision$}"),
            IndicatorNaming::Microbins(table) => {
                let floor = table.floor(value).unwrap_or(value);
                format!("{name}@{}", format_exponent(floor, 6))
            }
        }
    }
}

/// Replace every feature of `record` with an indicator named after its value.
pub fn reals_to_indicators(record: &FeatureRecord, naming: &IndicatorNaming) -> FeatureRecord {
    let features = record
        .features
        .iter()
        .map(|f| Feature::indicator(naming.name_for(f.name(), f.value())))
        .collect();
    record.with_features(features)
}

/// Scientific notation with a signed, two-digit minimum exponent
/// (`1.500000e-03`), as printf's `%e` writes it.
fn format_exponent(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$e}");
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
