#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Load configuration, summary, and quality report types.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Options controlling one warehouse load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LoadOptions {
    /// Abort on the first row-level error instead of collecting it.
    pub strict: bool,
    /// Preamble rows before the CSV header.
    pub skip_rows: usize,
    /// Records before this year are filtered out.
    pub min_year: Option<i32>,
    /// Records after this year are filtered out.
    pub max_year: Option<i32>,
}

impl LoadOptions {
    /// Returns `true` if `year` falls inside the configured range. Records
    /// with no known year are always kept.
    #[must_use]
    pub fn accepts_year(&self, year: Option<i32>) -> bool {
        let Some(year) = year else {
            return true;
        };
        self.min_year.is_none_or(|min| year >= min) && self.max_year.is_none_or(|max| year <= max)
    }
}

/// Class of a row-level problem.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueKind {
    /// Malformed or unrecognized value.
    DataQuality,
    /// A fact referenced a dimension key that does not exist.
    ReferentialIntegrity,
}

/// A row-level problem, tied to the record it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    /// Zero-based position of the record in the input. Rows the CSV
    /// reader could not decode count among the file's data rows.
    pub index: usize,
    /// Crash id, `row N` when the record has none, or `line N` for a row
    /// that could not be decoded.
    pub record: String,
    pub kind: IssueKind,
    /// Attribute the problem concerns.
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) in record {}: {}",
            self.kind, self.field, self.record, self.message
        )
    }
}

/// Outcome of one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Records handed to the loader, undecodable CSV rows included.
    pub records_read: u64,
    /// Fact rows written.
    pub facts_inserted: u64,
    /// Records outside the configured year range.
    pub filtered: u64,
    /// Records excluded from the fact table, with the reason.
    pub rejected: Vec<RecordIssue>,
    /// Problems that were recovered by sentineling; the record was kept.
    pub sentineled: Vec<RecordIssue>,
    /// Row count per dimension table.
    pub dimension_rows: BTreeMap<String, usize>,
    pub duration: Duration,
}

impl LoadSummary {
    #[must_use]
    pub fn rejected_count(&self) -> u64 {
        self.rejected.len() as u64
    }

    /// Records accounted for: loaded, filtered, or rejected.
    #[must_use]
    pub fn accounted(&self) -> u64 {
        self.facts_inserted + self.filtered + self.rejected_count()
    }
}

/// Post-load data quality report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Rows per table, fact table included.
    pub table_rows: BTreeMap<String, usize>,
    /// Facts pointing at each dimension's unknown row.
    pub sentinel_references: BTreeMap<String, usize>,
    /// Facts whose key has no row in the dimension; always empty after a
    /// clean load.
    pub dangling_references: BTreeMap<String, usize>,
    /// Rejected records grouped by field.
    pub rejected_by_field: BTreeMap<String, usize>,
    /// Sentineled values grouped by field.
    pub sentineled_by_field: BTreeMap<String, usize>,
    /// Raw season labels and the clean label each maps to.
    pub season_labels: BTreeMap<String, String>,
}

impl QualityReport {
    /// Returns `true` when no fact has a dangling reference.
    #[must_use]
    pub fn referentially_intact(&self) -> bool {
        self.dangling_references.values().all(|&n| n == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_range_is_inclusive_and_open_ended() {
        let options = LoadOptions {
            min_year: Some(2001),
            max_year: Some(2023),
            ..LoadOptions::default()
        };
        assert!(options.accepts_year(Some(2001)));
        assert!(options.accepts_year(Some(2023)));
        assert!(!options.accepts_year(Some(2000)));
        assert!(!options.accepts_year(Some(2024)));
        assert!(options.accepts_year(None));
        assert!(LoadOptions::default().accepts_year(Some(1900)));
    }

    #[test]
    fn summary_accounts_for_every_record() {
        let issue = RecordIssue {
            index: 2,
            record: "3".to_string(),
            kind: IssueKind::DataQuality,
            field: "fatalities".to_string(),
            message: "not a count".to_string(),
        };
        let summary = LoadSummary {
            records_read: 5,
            facts_inserted: 3,
            filtered: 1,
            rejected: vec![issue.clone()],
            ..LoadSummary::default()
        };
        assert_eq!(summary.accounted(), summary.records_read);
        assert_eq!(
            issue.to_string(),
            "data_quality (fatalities) in record 3: not a count"
        );
    }
}
