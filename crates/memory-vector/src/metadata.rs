//! Positional metadata table.
//!
//! Maps each vector position to the source path and summary it was built
//! from. Live inserts append at the next position and never replace a
//! record. A table restored from a damaged snapshot may have holes:
//! positions whose line could not be read. Holes stay empty rather than
//! shifting later records.
//!
//! On disk the table is a line-oriented text snapshot:
//!
//! ```text
//! #metadata v1
//! 0|/home/me/notes.txt|Content Snippet: 'quarterly review...'
//! 1|/home/me/log.txt|Content Snippet: 'boot ok\nnet up...'
//! ```
//!
//! Under the header, `\` is written as `\\` inside a field, `|` as `\p`,
//! newline as `\n` and carriage return as `\r`, so a record always occupies
//! exactly one line. Files without the header are read as raw
//! `position|path|summary` lines with no unescaping.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::VectorError;
use crate::format::write_atomic;

const DELIMITER: char = '|';

/// First line of a snapshot whose fields are escaped.
pub const FORMAT_HEADER: &str = "#metadata v1";

/// One stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Position of the matching vector
    pub position: u64,
    /// Canonical absolute source path
    pub path: String,
    /// Summary text that was embedded alongside the path
    pub summary: String,
}

/// Outcome of a tolerant snapshot load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records accepted
    pub loaded: usize,
    /// Lines skipped as malformed, duplicate path or taken position
    pub skipped: usize,
}

/// In-memory metadata table with a path lookup.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    records: BTreeMap<u64, MetadataRecord>,
    by_path: HashMap<String, u64>,
    // One past the highest position in use, holes included
    span: u64,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records present (holes excluded).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Next position `put` will accept.
    pub fn next_position(&self) -> u64 {
        self.span
    }

    /// Positions below `next_position` that hold no record.
    pub fn missing(&self) -> usize {
        usize::try_from(self.span)
            .unwrap_or(usize::MAX)
            .saturating_sub(self.records.len())
    }

    pub fn missing_positions(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.span).filter(|position| !self.records.contains_key(position))
    }

    /// Append a record. `position` must be the next unused position and
    /// `path` must not already be present.
    pub fn put(
        &mut self,
        position: u64,
        path: impl Into<String>,
        summary: impl Into<String>,
    ) -> Result<(), VectorError> {
        let expected = self.next_position();
        if position != expected {
            return Err(VectorError::OutOfSequence {
                expected,
                actual: position,
            });
        }
        self.restore(position, path, summary)
    }

    /// Place a record at its stated position, filling a hole or extending
    /// the table. Positions skipped over become holes.
    pub fn restore(
        &mut self,
        position: u64,
        path: impl Into<String>,
        summary: impl Into<String>,
    ) -> Result<(), VectorError> {
        if self.records.contains_key(&position) {
            return Err(VectorError::PositionTaken(position));
        }
        let path = path.into();
        if path.is_empty() {
            return Err(VectorError::InvalidPath("empty path".to_string()));
        }
        if self.by_path.contains_key(&path) {
            return Err(VectorError::DuplicatePath(path));
        }

        self.by_path.insert(path.clone(), position);
        self.records.insert(
            position,
            MetadataRecord {
                position,
                path,
                summary: summary.into(),
            },
        );
        self.span = self.span.max(position.saturating_add(1));
        debug!(position, "Stored metadata");
        Ok(())
    }

    /// Grow the table to `len` positions; new positions are holes.
    pub fn extend_to(&mut self, len: u64) {
        self.span = self.span.max(len);
    }

    pub fn get(&self, position: u64) -> Option<&MetadataRecord> {
        self.records.get(&position)
    }

    /// Position of the record with exactly this path.
    pub fn find_by_path(&self, path: &str) -> Option<u64> {
        self.by_path.get(path).copied()
    }

    /// Records in position order.
    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.values()
    }

    /// Write every record to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), VectorError> {
        write_atomic(path, |writer| {
            writer.write_all(FORMAT_HEADER.as_bytes())?;
            writer.write_all(b"\n")?;
            for record in self.records.values() {
                writer.write_all(encode_line(record).as_bytes())?;
                writer.write_all(b"\n")?;
            }
            Ok(())
        })?;
        info!(path = ?path, records = self.records.len(), "Saved metadata snapshot");
        Ok(())
    }

    /// Load a snapshot, skipping malformed lines.
    ///
    /// Each record lands at the position its line states, so a skipped line
    /// leaves a hole instead of displacing the lines after it. A missing
    /// file yields an empty table.
    pub fn load(path: &Path) -> Result<(Self, LoadReport), VectorError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Self::new(), LoadReport::default()))
            }
            Err(e) => return Err(e.into()),
        };

        // Invalid UTF-8 only damages the lines it appears on
        let content = String::from_utf8_lossy(&bytes);
        let mut lines = content.lines().enumerate().peekable();
        let escaped = lines
            .peek()
            .is_some_and(|(_, first)| first.trim_end() == FORMAT_HEADER);
        if escaped {
            lines.next();
        }
        let parse: fn(&str) -> Result<MetadataRecord, String> = if escaped {
            parse_line
        } else {
            parse_legacy_line
        };

        let mut table = Self::new();
        let mut report = LoadReport::default();

        for (line_no, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let record = match parse(line) {
                Ok(record) => record,
                Err(reason) => {
                    warn!(path = ?path, line = line_no + 1, %reason, "Skipping malformed metadata line");
                    report.skipped += 1;
                    continue;
                }
            };
            if let Err(e) = table.restore(record.position, record.path, record.summary) {
                warn!(path = ?path, line = line_no + 1, error = %e, "Skipping metadata line");
                report.skipped += 1;
                continue;
            }
            report.loaded += 1;
        }

        info!(
            path = ?path,
            escaped,
            loaded = report.loaded,
            skipped = report.skipped,
            "Loaded metadata snapshot"
        );
        Ok((table, report))
    }
}

/// Render one record as an escaped snapshot line (without the newline).
pub fn encode_line(record: &MetadataRecord) -> String {
    format!(
        "{}{DELIMITER}{}{DELIMITER}{}",
        record.position,
        escape_field(&record.path),
        escape_field(&record.summary)
    )
}

/// Parse one escaped snapshot line.
///
/// Splits on the delimiter at most twice, so a raw `|` in a summary stays
/// inside the summary.
pub fn parse_line(line: &str) -> Result<MetadataRecord, String> {
    let (position, path, summary) = split_fields(line)?;
    build_record(position, unescape_field(path)?, unescape_field(summary)?)
}

/// Parse one line of a snapshot written without escaping.
///
/// Fields are taken verbatim, backslashes included.
pub fn parse_legacy_line(line: &str) -> Result<MetadataRecord, String> {
    let (position, path, summary) = split_fields(line)?;
    build_record(position, path.to_string(), summary.to_string())
}

fn split_fields(line: &str) -> Result<(u64, &str, &str), String> {
    let mut fields = line.splitn(3, DELIMITER);
    let (Some(position), Some(path), Some(summary)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err("expected 3 fields".to_string());
    };
    let position = position
        .trim()
        .parse()
        .map_err(|_| format!("invalid position {:?}", position))?;
    Ok((position, path, summary))
}

fn build_record(position: u64, path: String, summary: String) -> Result<MetadataRecord, String> {
    if path.is_empty() {
        return Err("empty path".to_string());
    }
    Ok(MetadataRecord {
        position,
        path,
        summary,
    })
}

fn escape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            DELIMITER => out.push_str("\\p"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_field(field: &str) -> Result<String, String> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('p') => out.push(DELIMITER),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("invalid escape \\{}", other)),
            None => return Err("dangling escape".to_string()),
        }
    }
    Ok(out)
}
