#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crash record sources.
//!
//! Reads BITRE-style crash CSVs into [`RawCrashRecord`]s and the optional
//! population reference tables, normalizing header names on the way in.
//! Value-level interpretation is left to the conforming pass; the helpers
//! it uses live in [`parsing`].

pub mod parsing;
pub mod progress;
pub mod reference;

use std::io::Read;
use std::path::Path;

use crash_warehouse_models::RawCrashRecord;
use csv::StringRecord;

/// Errors that can occur while reading a source file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// CSV parsing failed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File being read.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error opening a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file has no header row after the skipped preamble.
    #[error("{path} has no header row")]
    MissingHeader {
        /// File being read.
        path: String,
    },

    /// A required column is absent from the header row.
    #[error("{path} is missing required column '{column}'")]
    MissingColumn {
        /// File being read.
        path: String,
        /// Normalized column name.
        column: String,
    },
}

/// Options for reading a crash CSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvOptions {
    /// Preamble rows before the header row.
    pub skip_rows: usize,
}

/// A data row the CSV layer could not decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    /// Zero-based position among the data rows after the header.
    pub index: usize,
    /// One-based line in the file where the row starts, when known.
    pub line: Option<u64>,
    pub message: String,
}

impl MalformedRow {
    /// `line N` when the line is known, otherwise `row N`.
    #[must_use]
    pub fn label(&self) -> String {
        self.line.map_or_else(
            || format!("row {}", self.index + 1),
            |line| format!("line {line}"),
        )
    }
}

/// Records read from one crash file.
#[derive(Debug, Clone, Default)]
pub struct CrashBatch {
    pub records: Vec<RawCrashRecord>,
    /// Rows that never reach conforming; the loader reports them as
    /// rejected.
    pub malformed: Vec<MalformedRow>,
}

/// Reads crash records from a CSV file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be opened or has no header.
pub fn read_crash_csv(path: &Path, options: CsvOptions) -> Result<CrashBatch, SourceError> {
    let label = path.display().to_string();
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| SourceError::Csv {
            path: label.clone(),
            source,
        })?;
    read_crash_records(reader, &label, options)
}

/// Reads crash records from any reader; `label` names the input in errors
/// and log lines.
///
/// # Errors
///
/// Returns [`SourceError`] if the input has no header row.
pub fn read_crash_reader(
    reader: impl Read,
    label: &str,
    options: CsvOptions,
) -> Result<CrashBatch, SourceError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    read_crash_records(reader, label, options)
}

fn read_crash_records<R: Read>(
    mut reader: csv::Reader<R>,
    label: &str,
    options: CsvOptions,
) -> Result<CrashBatch, SourceError> {
    let mut rows = reader.records();
    let headers = header_row(&mut rows, label, options.skip_rows)?;
    log::debug!("[{label}] columns: {:?}", headers.iter().collect::<Vec<_>>());

    let mut batch = CrashBatch::default();
    for (index, result) in rows.enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                let line = e.position().map(csv::Position::line);
                batch.malformed.push(malformed(label, index, line, &e));
                continue;
            }
        };
        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row = pad_to(row, headers.len());
        match row.deserialize::<RawCrashRecord>(Some(&headers)) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                let line = row.position().map(csv::Position::line);
                batch.malformed.push(malformed(label, index, line, &e));
            }
        }
    }

    log::info!(
        "[{label}] read {} crash records ({} malformed rows)",
        batch.records.len(),
        batch.malformed.len()
    );
    Ok(batch)
}

fn malformed(label: &str, index: usize, line: Option<u64>, error: &csv::Error) -> MalformedRow {
    let row = MalformedRow {
        index,
        line,
        message: error.to_string(),
    };
    log::warn!("[{label}] malformed {}: {error}", row.label());
    row
}

/// Extends a short row with empty fields so every header has a value.
fn pad_to(mut row: StringRecord, len: usize) -> StringRecord {
    while row.len() < len {
        row.push_field("");
    }
    row
}

/// Skips `skip_rows` preamble rows and returns the normalized header row.
///
/// Repeated header names get a numeric suffix so each column stays
/// addressable.
pub(crate) fn header_row<I>(
    rows: &mut I,
    label: &str,
    skip_rows: usize,
) -> Result<StringRecord, SourceError>
where
    I: Iterator<Item = Result<StringRecord, csv::Error>>,
{
    let raw = rows
        .nth(skip_rows)
        .ok_or_else(|| SourceError::MissingHeader {
            path: label.to_string(),
        })?
        .map_err(|source| SourceError::Csv {
            path: label.to_string(),
            source,
        })?;

    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw.iter().map(parsing::normalize_header) {
        let mut unique = name.clone();
        let mut n = 2;
        while seen.contains(&unique) {
            unique = format!("{name}_{n}");
            n += 1;
        }
        seen.push(unique);
    }
    if seen.iter().all(String::is_empty) {
        return Err(SourceError::MissingHeader {
            path: label.to_string(),
        });
    }
    Ok(StringRecord::from(seen))
}
