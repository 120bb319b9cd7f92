//! Training-time bins and the candidate partitions built from them.

use std::collections::HashSet;

use serde::Serialize;

use crate::series::{Sample, WeightSeries};
use crate::table::{BinTableEntry, EntryStats};

/// A candidate applied to a series it cannot describe.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BinningError {
    #[error("series has {found} samples but the binning covers {expected}")]
    SeriesMismatch { expected: usize, found: usize },
    #[error("bin {bin} maps to the inverted value range [{low}, {high}); series values are not monotonic")]
    InvertedRange { bin: usize, low: f64, high: f64 },
}

/// A contiguous run of samples `[start, end]` replaced by one weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub start: usize,
    /// Inclusive.
    pub end: usize,
    /// Arithmetic mean of the member weights.
    pub weight: f64,
}

impl Bin {
    /// Number of member samples (always at least 1).
    #[inline]
    pub fn span(&self) -> usize {
        self.end - self.start + 1
    }
}

/// A storage triple: samples with `low <= value < high` get `weight`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub low: f64,
    pub high: f64,
    pub weight: f64,
}

/// One candidate partition of the series with its total cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binning {
    num_bins: usize,
    cost: f64,
    bins: Vec<Bin>,
}

impl Binning {
    pub(crate) fn new(cost: f64, bins: Vec<Bin>) -> Self {
        Self {
            num_bins: bins.len(),
            cost,
            bins,
        }
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Sum over bins of squared deviations from the bin mean.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    #[inline]
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Number of samples covered.
    pub fn num_samples(&self) -> usize {
        self.bins.last().map_or(0, |b| b.end + 1)
    }

    /// One representative weight per original sample.
    pub fn binned_weights(&self) -> Vec<f64> {
        self.bins
            .iter()
            .flat_map(|b| std::iter::repeat(b.weight).take(b.span()))
            .collect()
    }

    /// The series with each weight replaced by its bin's weight.
    ///
    /// # Errors
    ///
    /// [`BinningError::SeriesMismatch`] if `series` has a different length
    /// than the series this candidate was fitted on.
    pub fn binned_series(&self, series: &WeightSeries) -> Result<Vec<Sample>, BinningError> {
        self.check_series(series)?;
        Ok(series
            .samples()
            .iter()
            .zip(self.binned_weights())
            .map(|(s, w)| Sample::new(s.value, w))
            .collect())
    }

    /// Run-length collapse into `(low, high, weight)` triples, one per bin.
    ///
    /// For ascending values `low` is the value of the first sample in the bin
    /// and `high` the value of the first sample of the next bin; the last bin
    /// is open to `+inf`. Descending series are mirrored: a bin starts at its
    /// last (smallest) value and the first bin is open to `+inf`.
    ///
    /// # Errors
    ///
    /// [`BinningError::SeriesMismatch`] on a length mismatch, and
    /// [`BinningError::InvertedRange`] when unsorted values would give a bin
    /// `low > high`.
    pub fn collapse(&self, series: &WeightSeries) -> Result<Vec<ValueRange>, BinningError> {
        self.check_series(series)?;
        let samples = series.samples();
        let bins = &self.bins;

        let ranges: Vec<ValueRange> = if series.is_descending() {
            bins.iter()
                .enumerate()
                .map(|(i, bin)| ValueRange {
                    low: samples[bin.end].value,
                    high: i
                        .checked_sub(1)
                        .map_or(f64::INFINITY, |prev| samples[bins[prev].end].value),
                    weight: bin.weight,
                })
                .collect()
        } else {
            bins.iter()
                .enumerate()
                .map(|(i, bin)| ValueRange {
                    low: samples[bin.start].value,
                    high: bins
                        .get(i + 1)
                        .map_or(f64::INFINITY, |next| samples[next.start].value),
                    weight: bin.weight,
                })
                .collect()
        };

        if let Some((bin, range)) = ranges.iter().enumerate().find(|(_, r)| r.low > r.high) {
            return Err(BinningError::InvertedRange {
                bin,
                low: range.low,
                high: range.high,
            });
        }
        Ok(ranges)
    }

    /// Half-open Bin Table entries for feature `source`, in bin order.
    ///
    /// Boundaries come from [`collapse`](Self::collapse); the lowest range is
    /// widened to `-inf` so that every value of a monotonic series fires
    /// exactly one entry. Entries carry observed min/max/count.
    ///
    /// Destination names are `<source>_<low>_<high>` with six decimals. Bounds
    /// too close to tell apart at that precision fall back to the shortest
    /// exact form, then to a bin index suffix.
    ///
    /// # Errors
    ///
    /// As for [`collapse`](Self::collapse).
    pub fn to_table_entries(&self, series: &WeightSeries, source: &str) -> Result<Vec<BinTableEntry>, BinningError> {
        let samples = series.samples();
        let ranges = self.collapse(series)?;
        let lowest = if series.is_descending() { ranges.len().saturating_sub(1) } else { 0 };

        let mut taken = HashSet::with_capacity(ranges.len());
        let entries = ranges
            .iter()
            .zip(&self.bins)
            .enumerate()
            .map(|(i, (range, bin))| {
                let low = if i == lowest { f64::NEG_INFINITY } else { range.low };
                let high = range.high;
                let members = &samples[bin.start..=bin.end];
                let stats = EntryStats {
                    min: members.iter().map(|s| s.value).fold(f64::INFINITY, f64::min),
                    max: members.iter().map(|s| s.value).fold(f64::NEG_INFINITY, f64::max),
                    count: members.len(),
                };

                let mut name = format!("{source}_{low:.6}_{high:.6}");
                if taken.contains(&name) {
                    name = format!("{source}_{low}_{high}");
                }
                if taken.contains(&name) {
                    name = format!("{source}_{low}_{high}_{i}");
                }
                taken.insert(name.clone());

                BinTableEntry::new(name, low, high).with_stats(stats)
            })
            .collect();
        Ok(entries)
    }

    fn check_series(&self, series: &WeightSeries) -> Result<(), BinningError> {
        if series.len() != self.num_samples() {
            return Err(BinningError::SeriesMismatch {
                expected: self.num_samples(),
                found: series.len(),
            });
        }
        Ok(())
    }
}
