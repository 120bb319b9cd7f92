//! Bin assigner: rewrite feature records through a [`BinTable`].
//!
//! Each feature of a record is looked up by name in the table. Every entry
//! whose interval contains the value fires a destination feature, written as
//! an indicator (`dest=1`) or with the original value (`dest=<value>`).
//! Overlapping entries all fire, in table order.
//!
//! # Per-feature rules
//!
//! | Situation | Result |
//! |---|---|
//! | `single_feature` set and name differs | feature passes through |
//! | name not in table, `allow_unrecognized` | feature passes through |
//! | name not in table | [`AssignError::SchemaMismatch`] |
//! | no entry matches | per [`UnmatchedPolicy`] |
//! | `keep_original` | source feature kept ahead of its destinations |
//!
//! # Streams
//!
//! [`Assigner::process`] reads records line by line in batches, assigns each
//! batch (on rayon when the config allows), and writes results in input order.
//! Malformed records are logged and skipped; schema and coverage errors stop
//! the stream.

mod config;
mod error;

pub use config::{AssignConfig, ConfigError, OutputMode, UnmatchedPolicy};
pub use error::AssignError;

use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::record::{Feature, FeatureRecord, RecordError};
use crate::table::BinTable;

/// Counters reported by [`Assigner::process`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignStats {
    /// Lines read.
    pub read: usize,
    /// Records written.
    pub written: usize,
    /// Malformed records skipped.
    pub skipped: usize,
}

/// Applies a read-only [`BinTable`] to feature records.
///
/// The assigner holds no mutable state, so one instance can serve any number
/// of threads.
#[derive(Debug, Clone)]
pub struct Assigner {
    table: BinTable,
    config: AssignConfig,
}

impl Assigner {
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSingleFeature`] when the configured single
    /// feature has no entries in `table`.
    pub fn new(table: BinTable, config: AssignConfig) -> Result<Self, ConfigError> {
        if let Some(name) = &config.single_feature {
            if !table.contains_feature(name) {
                return Err(ConfigError::UnknownSingleFeature(name.clone()));
            }
        }
        Ok(Self { table, config })
    }

    pub fn table(&self) -> &BinTable {
        &self.table
    }

    pub fn config(&self) -> &AssignConfig {
        &self.config
    }

    /// Features produced for a single input feature.
    pub fn assign_feature(&self, feature: &Feature) -> Result<Vec<Feature>, AssignError> {
        let mut out = Vec::new();
        self.extend_assigned(feature, &mut out)?;
        Ok(out)
    }

    /// Rewrite the feature list of `record`; other fields are copied.
    ///
    /// # Errors
    ///
    /// Returns the first [`AssignError::SchemaMismatch`] or
    /// [`AssignError::CoverageGap`] raised by any feature.
    pub fn assign_record(&self, record: &FeatureRecord) -> Result<FeatureRecord, AssignError> {
        let mut features = Vec::with_capacity(record.features.len());
        for feature in &record.features {
            self.extend_assigned(feature, &mut features)?;
        }
        Ok(record.with_features(features))
    }

    /// Parse, assign and format one line.
    pub fn assign_line(&self, line: &str) -> Result<String, AssignError> {
        let record = FeatureRecord::parse(line)?;
        Ok(self.assign_record(&record)?.to_string())
    }

    fn extend_assigned(&self, feature: &Feature, out: &mut Vec<Feature>) -> Result<(), AssignError> {
        let name = feature.name();
        if self
            .config
            .single_feature
            .as_deref()
            .is_some_and(|single| single != name)
        {
            out.push(feature.clone());
            return Ok(());
        }

        let Some(hits) = self.table.matches(name, feature.value(), self.config.boundary) else {
            if self.config.allow_unrecognized {
                out.push(feature.clone());
                return Ok(());
            }
            return Err(AssignError::SchemaMismatch {
                feature: name.to_string(),
            });
        };

        if self.config.keep_original {
            out.push(feature.clone());
        }

        if hits.is_empty() {
            match self.config.unmatched {
                UnmatchedPolicy::Die => {
                    return Err(AssignError::CoverageGap {
                        feature: name.to_string(),
                        value: feature.value(),
                    });
                }
                UnmatchedPolicy::PassThrough if !self.config.keep_original => {
                    out.push(feature.clone());
                }
                UnmatchedPolicy::PassThrough | UnmatchedPolicy::Drop => {}
            }
            return Ok(());
        }

        out.extend(hits.into_iter().map(|entry| match self.config.mode {
            OutputMode::Indicator => Feature::indicator(entry.dest_name()),
            OutputMode::Real => feature.renamed(entry.dest_name()),
        }));
        Ok(())
    }

    /// Assign every record of `input` and write the results to `output`.
    ///
    /// Output order matches input order whatever the parallelism setting.
    ///
    /// # Errors
    ///
    /// I/O failures, and schema or coverage errors wrapped in
    /// [`AssignError::AtLine`]. Records before the failing one have already
    /// been written. A line that is not valid UTF-8 is a malformed record and
    /// is skipped like any other.
    pub fn process<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<AssignStats, AssignError> {
        let mut stats = AssignStats::default();
        let mut buf = Vec::new();
        let mut batch: Vec<(usize, Result<String, RecordError>)> = Vec::with_capacity(self.config.batch_size);

        loop {
            batch.clear();
            while batch.len() < self.config.batch_size {
                buf.clear();
                if input.read_until(b'\n', &mut buf)? == 0 {
                    break;
                }
                stats.read += 1;
                batch.push((stats.read, decode_line(&mut buf)));
            }
            if batch.is_empty() {
                break;
            }

            let results = self
                .config
                .parallelism
                .maybe_par_map(&batch, |(_, line)| match line {
                    Ok(line) => self.assign_line(line),
                    Err(err) => Err(AssignError::Malformed(err.clone())),
                });

            for ((line_no, _), result) in batch.iter().zip(results) {
                match result {
                    Ok(text) => {
                        writeln!(output, "{text}")?;
                        stats.written += 1;
                    }
                    Err(AssignError::Malformed(err)) => {
                        warn!(line = *line_no, error = %err, "skipping malformed record");
                        stats.skipped += 1;
                    }
                    Err(err) => return Err(err.at_line(*line_no)),
                }
            }
            debug!(records = stats.read, "batch done");
        }

        output.flush()?;
        info!(
            read = stats.read,
            written = stats.written,
            skipped = stats.skipped,
            "assignment finished"
        );
        Ok(stats)
    }
}

/// Strip the line terminator and decode. Invalid UTF-8 is a malformed record,
/// not an I/O failure.
fn decode_line(buf: &mut Vec<u8>) -> Result<String, RecordError> {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    String::from_utf8(std::mem::take(buf)).map_err(|err| RecordError::InvalidUtf8 {
        valid_up_to: err.utf8_error().valid_up_to(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{BinTableEntry, Boundary};

    fn table() -> BinTable {
        BinTable::from_entries([
            ("Foo", BinTableEntry::new("Foo_lo", f64::NEG_INFINITY, 1.0)),
            ("Foo", BinTableEntry::new("Foo_hi", 1.0, f64::INFINITY)),
            ("Gap", BinTableEntry::new("Gap_a", 0.0, 1.0)),
        ])
        .unwrap()
    }

    fn assigner(config: AssignConfig) -> Assigner {
        Assigner::new(table(), config).unwrap()
    }

    fn names(features: &[Feature]) -> Vec<String> {
        features.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn indicator_and_real_modes() {
        let feature = Feature::parse("Foo=2.50").unwrap();
        let indicator = assigner(AssignConfig::default());
        assert_eq!(names(&indicator.assign_feature(&feature).unwrap()), ["Foo_hi=1"]);

        let real = assigner(AssignConfig::builder().mode(OutputMode::Real).build().unwrap());
        assert_eq!(names(&real.assign_feature(&feature).unwrap()), ["Foo_hi=2.50"]);
    }

    #[test]
    fn boundary_value_follows_convention() {
        let feature = Feature::new("Foo", 1.0);
        let half_open = assigner(AssignConfig::default());
        assert_eq!(names(&half_open.assign_feature(&feature).unwrap()), ["Foo_hi=1"]);

        let left_open = assigner(
            AssignConfig::builder()
                .boundary(Boundary::LeftOpen)
                .build()
                .unwrap(),
        );
        assert_eq!(names(&left_open.assign_feature(&feature).unwrap()), ["Foo_lo=1"]);
    }

    #[test]
    fn unrecognized_feature_is_fatal_unless_allowed() {
        let feature = Feature::new("Bar", 3.0);
        let err = assigner(AssignConfig::default())
            .assign_feature(&feature)
            .unwrap_err();
        assert!(matches!(err, AssignError::SchemaMismatch { ref feature } if feature == "Bar"));

        let lenient = assigner(AssignConfig::builder().allow_unrecognized(true).build().unwrap());
        assert_eq!(names(&lenient.assign_feature(&feature).unwrap()), ["Bar=3"]);
    }

    #[test]
    fn unmatched_policies() {
        let feature = Feature::parse("Gap=5").unwrap();
        let die = assigner(AssignConfig::default());
        assert!(matches!(
            die.assign_feature(&feature).unwrap_err(),
            AssignError::CoverageGap { value, .. } if value == 5.0
        ));

        let pass = assigner(
            AssignConfig::builder()
                .unmatched(UnmatchedPolicy::PassThrough)
                .build()
                .unwrap(),
        );
        assert_eq!(names(&pass.assign_feature(&feature).unwrap()), ["Gap=5"]);

        let dropping = assigner(AssignConfig::builder().unmatched(UnmatchedPolicy::Drop).build().unwrap());
        assert!(dropping.assign_feature(&feature).unwrap().is_empty());
    }

    #[test]
    fn keep_original_precedes_destinations() {
        let a = assigner(AssignConfig::builder().keep_original(true).build().unwrap());
        let out = a.assign_feature(&Feature::parse("Foo=0.5").unwrap()).unwrap();
        assert_eq!(names(&out), ["Foo=0.5", "Foo_lo=1"]);

        let pass = assigner(
            AssignConfig::builder()
                .keep_original(true)
                .unmatched(UnmatchedPolicy::PassThrough)
                .build()
                .unwrap(),
        );
        let out = pass.assign_feature(&Feature::parse("Gap=5").unwrap()).unwrap();
        assert_eq!(names(&out), ["Gap=5"]);
    }

    #[test]
    fn single_feature_mode_leaves_others_alone() {
        let a = assigner(AssignConfig::builder().single_feature("Foo").build().unwrap());
        let record = FeatureRecord::parse("[X] ||| a ||| b ||| Foo=3 Other=7 Gap=9 ||| 0-0").unwrap();
        let out = a.assign_record(&record).unwrap();
        assert_eq!(out.to_string(), "[X] ||| a ||| b ||| Foo_hi=1 Other=7 Gap=9 ||| 0-0");
    }

    #[test]
    fn single_feature_must_exist() {
        let err = Assigner::new(
            table(),
            AssignConfig::builder().single_feature("Nope").build().unwrap(),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownSingleFeature("Nope".into()));
    }

    #[test]
    fn stream_skips_malformed_and_keeps_order() {
        let a = assigner(AssignConfig::builder().batch_size(2).build().unwrap());
        let input = "\
[X] ||| a ||| b ||| Foo=0 ||| 0-0
not a record
[X] ||| a ||| b ||| Foo=2 ||| 0-0
";
        let mut out = Vec::new();
        let stats = a.process(input.as_bytes(), &mut out).unwrap();
        assert_eq!(
            stats,
            AssignStats {
                read: 3,
                written: 2,
                skipped: 1
            }
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[X] ||| a ||| b ||| Foo_lo=1 ||| 0-0\n[X] ||| a ||| b ||| Foo_hi=1 ||| 0-0\n"
        );
    }

    #[test]
    fn stream_aborts_with_line_number() {
        let a = assigner(AssignConfig::default());
        let input = "[X] ||| a ||| b ||| Foo=0 ||| 0-0\n[X] ||| a ||| b ||| Bar=3 ||| 0-0\n";
        let mut out = Vec::new();
        let err = a.process(input.as_bytes(), &mut out).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(matches!(err.innermost(), AssignError::SchemaMismatch { feature } if feature == "Bar"));
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 1);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let a = assigner(AssignConfig::builder().batch_size(8).build().unwrap());
        let mut input = b"[X] ||| a ||| b ||| Foo=0 ||| 0-0\n".to_vec();
        input.extend_from_slice(b"[X] ||| \xff\xfe ||| b ||| Foo=0 ||| 0-0\r\n");
        input.extend_from_slice(b"[X] ||| a ||| b ||| Foo=2 ||| 0-0");

        let mut out = Vec::new();
        let stats = a.process(input.as_slice(), &mut out).unwrap();
        assert_eq!(
            stats,
            AssignStats {
                read: 3,
                written: 2,
                skipped: 1
            }
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[X] ||| a ||| b ||| Foo_lo=1 ||| 0-0\n[X] ||| a ||| b ||| Foo_hi=1 ||| 0-0\n"
        );
    }

    #[test]
    fn line_terminators_are_stripped() {
        let mut buf = b"abc\r\n".to_vec();
        assert_eq!(decode_line(&mut buf), Ok("abc".to_string()));
        let mut buf = b"\xffx\n".to_vec();
        assert_eq!(decode_line(&mut buf), Err(RecordError::InvalidUtf8 { valid_up_to: 0 }));
    }
}
