//! Runtime bin entries, the boundary convention, and per-feature interval lookup.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Boundary
// ============================================================================

/// Which end of an entry's interval is closed.
///
/// Tables in the wild were applied with both conventions, so the choice is an
/// explicit setting rather than an assumption baked into the lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Boundary {
    /// `low <= value < high`.
    #[default]
    HalfOpen,
    /// `low < value <= high` (legacy).
    LeftOpen,
}

impl Boundary {
    /// Whether `value` lies in `[low, high)` or `(low, high]`.
    #[inline]
    pub fn contains(self, low: f64, high: f64, value: f64) -> bool {
        match self {
            Boundary::HalfOpen => low <= value && value < high,
            Boundary::LeftOpen => low < value && value <= high,
        }
    }

    /// Whether an interval starting at `low` may contain `value`.
    #[inline]
    fn admits_low(self, low: f64, value: f64) -> bool {
        match self {
            Boundary::HalfOpen => low <= value,
            Boundary::LeftOpen => low < value,
        }
    }

    /// Whether an interval ending at `high` may contain `value`.
    #[inline]
    fn admits_high(self, high: f64, value: f64) -> bool {
        match self {
            Boundary::HalfOpen => value < high,
            Boundary::LeftOpen => value <= high,
        }
    }

    /// Operators written around `x` in the persisted format.
    pub fn operators(self) -> (&'static str, &'static str) {
        match self {
            Boundary::HalfOpen => ("<=", "<"),
            Boundary::LeftOpen => ("<", "<="),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Boundary::HalfOpen => "half-open",
            Boundary::LeftOpen => "left-open",
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown spelling of a configuration enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind}: {value:?} (expected one of {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl FromStr for Boundary {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "half-open" => Ok(Boundary::HalfOpen),
            "left-open" => Ok(Boundary::LeftOpen),
            _ => Err(UnknownVariant {
                kind: "boundary",
                value: s.to_string(),
                expected: "half-open, left-open",
            }),
        }
    }
}

// ============================================================================
// BinTableEntry
// ============================================================================

/// Descriptive statistics carried alongside an entry. Not used for matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryStats {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// One destination feature and the value interval that fires it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinTableEntry {
    dest_name: String,
    low: f64,
    high: f64,
    stats: Option<EntryStats>,
}

impl BinTableEntry {
    /// `-inf` and `+inf` are legal bounds.
    pub fn new(dest_name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            dest_name: dest_name.into(),
            low,
            high,
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: EntryStats) -> Self {
        self.stats = Some(stats);
        self
    }

    #[inline]
    pub fn dest_name(&self) -> &str {
        &self.dest_name
    }

    #[inline]
    pub fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    pub fn stats(&self) -> Option<&EntryStats> {
        self.stats.as_ref()
    }

    #[inline]
    pub fn contains(&self, value: f64, boundary: Boundary) -> bool {
        boundary.contains(self.low, self.high, value)
    }

    /// Sort key: `(low, high)`.
    fn cmp_bounds(&self, other: &Self) -> Ordering {
        self.low
            .total_cmp(&other.low)
            .then(self.high.total_cmp(&other.high))
    }
}

// ============================================================================
// FeatureBins
// ============================================================================

/// All entries for one source feature, sorted by `(low, high)`, with an index
/// for lookup.
///
/// Entries may overlap. Lookup binary-searches the sorted lows for the last
/// entry whose low admits the value, then scans towards lower lows and stops
/// as soon as no earlier entry can reach the value:
///
/// ```text
/// lows:      [-inf, 0.0, 0.5, 1.0]
/// max_high:  [ 0.5, 1.0, 1.0, inf]   running max of `high` over [0..=k]
/// ```
///
/// For a partition the scan touches one entry; wide overlapping entries only
/// extend it as far back as they reach.
#[derive(Debug, Clone, Default)]
pub struct FeatureBins {
    entries: Vec<BinTableEntry>,
    lows: Vec<f64>,
    max_high: Vec<f64>,
}

impl FeatureBins {
    pub(crate) fn new(mut entries: Vec<BinTableEntry>) -> Self {
        entries.sort_by(BinTableEntry::cmp_bounds);
        let lows = entries.iter().map(|e| e.low).collect();
        let max_high = entries
            .iter()
            .scan(f64::NEG_INFINITY, |acc, e| {
                *acc = acc.max(e.high);
                Some(*acc)
            })
            .collect();
        Self {
            entries,
            lows,
            max_high,
        }
    }

    /// Entries in `(low, high)` order.
    #[inline]
    pub fn entries(&self) -> &[BinTableEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry firing for `value`, in table order.
    ///
    /// NaN never matches.
    pub fn matches(&self, value: f64, boundary: Boundary) -> Vec<&BinTableEntry> {
        let end = self.lows.partition_point(|&low| boundary.admits_low(low, value));

        let mut hits = Vec::new();
        for k in (0..end).rev() {
            if !boundary.admits_high(self.max_high[k], value) {
                break;
            }
            let entry = &self.entries[k];
            if entry.contains(value, boundary) {
                hits.push(entry);
            }
        }
        hits.reverse();
        hits
    }

    /// Whether the entries jointly cover `(-inf, +inf)` without gaps.
    pub fn covers_real_line(&self) -> bool {
        let Some(first) = self.entries.first() else {
            return false;
        };
        if first.low != f64::NEG_INFINITY {
            return false;
        }
        let mut reach = first.high;
        for entry in &self.entries[1..] {
            if entry.low > reach {
                return false;
            }
            reach = reach.max(entry.high);
        }
        reach == f64::INFINITY
    }
}
