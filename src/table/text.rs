//! Bin Table text format reader and writer.
//!
//! One entry per line, space separated:
//!
//! ```text
//! bin MaxLexEGivenF MaxLexEGivenF_-0.000000_0.916822 -inf <= x < 0.916942 [ -0.000000 - 0.916822 count=48950 ]
//! ```
//!
//! | Column | Meaning |
//! |---|---|
//! | 1 | tag (ignored) |
//! | 2 | source feature name |
//! | 3 | destination feature name |
//! | 4 | low bound (`-inf` allowed) |
//! | 5-7 | `op x op`, descriptive only |
//! | 8 | high bound (`inf` allowed) |
//! | 9.. | optional `[ min - max count=c ... ]` statistics |
//!
//! Only columns 2, 3, 4 and 8 are load-bearing. Trailing metadata is parsed
//! when it has the expected shape and ignored otherwise. Blank lines and lines
//! starting with `#` are skipped.

use std::io::{BufRead, Write};
use std::path::Path;

use super::entry::{BinTableEntry, Boundary, EntryStats};
use super::BinTable;

// =============================================================================
// Error types
// =============================================================================

/// Error type for Bin Table reading and construction.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected at least 8 columns, found {found}")]
    TooFewColumns { line: usize, found: usize },
    #[error("line {line}: invalid bound {token:?}")]
    InvalidBound { line: usize, token: String },
    #[error("invalid interval for {dest}: [{low}, {high}]")]
    InvalidInterval { dest: String, low: f64, high: f64 },
}

const TAG: &str = "bin";

// =============================================================================
// Reading
// =============================================================================

impl BinTable {
    /// Load a table from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Read a table from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ParseError> {
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(parsed) = parse_line(&line, idx + 1)? {
                entries.push(parsed);
            }
        }
        Self::from_entries(entries)
    }

    /// Parse a table from a string.
    pub fn parse_str(content: &str) -> Result<Self, ParseError> {
        Self::from_reader(content.as_bytes())
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<(String, BinTableEntry)>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let cols: Vec<&str> = trimmed.split_whitespace().collect();
    if cols.len() < 8 {
        return Err(ParseError::TooFewColumns {
            line: line_no,
            found: cols.len(),
        });
    }

    let low = parse_bound(cols[3], line_no)?;
    let high = parse_bound(cols[7], line_no)?;
    let mut entry = BinTableEntry::new(cols[2], low, high);
    if let Some(stats) = parse_stats(&cols[8..]) {
        entry = entry.with_stats(stats);
    }
    Ok(Some((cols[1].to_string(), entry)))
}

fn parse_bound(token: &str, line_no: usize) -> Result<f64, ParseError> {
    match token.parse::<f64>() {
        Ok(v) if !v.is_nan() => Ok(v),
        _ => Err(ParseError::InvalidBound {
            line: line_no,
            token: token.to_string(),
        }),
    }
}

/// `[ min - max count=c ... ]`, best effort.
fn parse_stats(tail: &[&str]) -> Option<EntryStats> {
    match tail {
        ["[", min, "-", max, count, ..] => Some(EntryStats {
            min: min.parse().ok()?,
            max: max.parse().ok()?,
            count: count.strip_prefix("count=")?.parse().ok()?,
        }),
        _ => None,
    }
}

// =============================================================================
// Writing
// =============================================================================

/// Write `table` in the text format, sources in name order.
///
/// `boundary` only selects the descriptive operators; readers ignore them.
pub fn write_table<W: Write>(table: &BinTable, boundary: Boundary, mut out: W) -> std::io::Result<()> {
    for (source, bins) in table.iter() {
        for entry in bins.entries() {
            write_entry(&mut out, source, entry, boundary)?;
        }
    }
    out.flush()
}

/// Write entries for one source, in the given order.
pub fn write_entries<W: Write>(
    source: &str,
    entries: &[BinTableEntry],
    boundary: Boundary,
    mut out: W,
) -> std::io::Result<()> {
    for entry in entries {
        write_entry(&mut out, source, entry, boundary)?;
    }
    out.flush()
}

fn write_entry<W: Write>(
    out: &mut W,
    source: &str,
    entry: &BinTableEntry,
    boundary: Boundary,
) -> std::io::Result<()> {
    let (op_low, op_high) = boundary.operators();
    write!(
        out,
        "{TAG} {source} {} {} {op_low} x {op_high} {}",
        entry.dest_name(),
        entry.low(),
        entry.high()
    )?;
    if let Some(stats) = entry.stats() {
        write!(out, " [ {} - {} count={} ]", stats.min, stats.max, stats.count)?;
    }
    writeln!(out)
}
