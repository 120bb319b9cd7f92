//! Bin Table: the contract between the optimizer and the assigner.
//!
//! A [`BinTable`] maps each source feature name to the list of
//! [`BinTableEntry`]s that may fire for it. Entries under one name may overlap;
//! the table is a general interval multimap, not a partition.
//!
//! Tables are built once (from text via [`BinTable::from_file`] or from
//! entries via [`BinTable::from_entries`]) and are read-only afterwards, so a
//! single table can be shared across assigner threads.
//!
//! # Persistence
//!
//! See [`text`] for the line-oriented format.

mod entry;
pub mod text;

pub use entry::{BinTableEntry, Boundary, EntryStats, FeatureBins, UnknownVariant};
pub use text::{write_table, ParseError};

use std::collections::{BTreeMap, HashMap, HashSet};

/// Source feature name → sorted, indexed entries.
#[derive(Debug, Clone, Default)]
pub struct BinTable {
    features: BTreeMap<String, FeatureBins>,
    destinations: HashSet<String>,
}

impl BinTable {
    /// Build a table from `(source name, entry)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidInterval`] for a NaN bound or `low > high`.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (S, BinTableEntry)>,
        S: Into<String>,
    {
        let mut grouped: HashMap<String, Vec<BinTableEntry>> = HashMap::new();
        let mut destinations = HashSet::new();

        for (source, entry) in entries {
            if entry.low().is_nan() || entry.high().is_nan() || entry.low() > entry.high() {
                return Err(ParseError::InvalidInterval {
                    dest: entry.dest_name().to_string(),
                    low: entry.low(),
                    high: entry.high(),
                });
            }
            destinations.insert(entry.dest_name().to_string());
            grouped.entry(source.into()).or_default().push(entry);
        }

        let features = grouped
            .into_iter()
            .map(|(name, entries)| (name, FeatureBins::new(entries)))
            .collect();

        Ok(Self {
            features,
            destinations,
        })
    }

    /// Entries for one source feature, or `None` if the name is unknown.
    #[inline]
    pub fn feature(&self, name: &str) -> Option<&FeatureBins> {
        self.features.get(name)
    }

    #[inline]
    pub fn contains_feature(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Entries of `name` firing for `value`; `None` if `name` is not in the table.
    pub fn matches(&self, name: &str, value: f64, boundary: Boundary) -> Option<Vec<&BinTableEntry>> {
        self.feature(name).map(|bins| bins.matches(value, boundary))
    }

    /// Whether `name` is produced by some entry.
    #[inline]
    pub fn is_destination(&self, name: &str) -> bool {
        self.destinations.contains(name)
    }

    /// Source features in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureBins)> {
        self.features.iter().map(|(name, bins)| (name.as_str(), bins))
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn num_entries(&self) -> usize {
        self.features.values().map(FeatureBins::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
