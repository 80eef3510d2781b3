#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! ETL conforming pipeline.
//!
//! Loading runs in two phases. Conforming turns each raw record into
//! natural keys and is run on the `rayon` pool since records are
//! independent. Key assignment then walks the conformed records in input
//! order through a single [`LoadContext`], so the same input always
//! produces the same surrogate keys and no natural key can be registered
//! twice.

pub mod builder;
pub mod conform;
pub mod keys;
pub mod quality;
pub mod resolver;

use std::sync::Arc;
use std::time::Instant;

use crash_warehouse_etl_models::{IssueKind, LoadOptions, LoadSummary, RecordIssue};
use crash_warehouse_models::{DimensionKind, RawCrashRecord, Warehouse};
use crash_warehouse_source::progress::ProgressCallback;
use crash_warehouse_source::{CrashBatch, MalformedRow};
use rayon::prelude::*;

pub use conform::{ConformedRecord, conform};
pub use keys::KeyAllocator;
pub use resolver::{LoadContext, References};

/// Errors that stop a load.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Malformed or unrecognized value (strict mode only).
    #[error("data quality error in record {record} ({field}): {message}")]
    DataQuality {
        /// Crash id or row position.
        record: String,
        /// Offending attribute.
        field: String,
        /// What was wrong.
        message: String,
    },

    /// A fact referenced a missing dimension row (strict mode only).
    #[error("referential integrity error in record {record}: {message}")]
    ReferentialIntegrity {
        /// Crash id or row position.
        record: String,
        /// What was wrong.
        message: String,
    },

    /// The load options are inconsistent; nothing was processed.
    #[error("invalid load configuration: {0}")]
    Configuration(String),
}

impl From<RecordIssue> for EtlError {
    fn from(issue: RecordIssue) -> Self {
        match issue.kind {
            IssueKind::DataQuality => Self::DataQuality {
                record: issue.record,
                field: issue.field,
                message: issue.message,
            },
            IssueKind::ReferentialIntegrity => Self::ReferentialIntegrity {
                record: issue.record,
                message: issue.message,
            },
        }
    }
}

/// A loaded warehouse and how the load went.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub warehouse: Warehouse,
    pub summary: LoadSummary,
}

fn validate(options: &LoadOptions) -> Result<(), EtlError> {
    if let (Some(min), Some(max)) = (options.min_year, options.max_year)
        && min > max
    {
        return Err(EtlError::Configuration(format!(
            "min_year {min} is after max_year {max}"
        )));
    }
    Ok(())
}

/// Builds a warehouse from raw records.
///
/// Row-level problems are collected in the summary. In strict mode the
/// first one aborts the load instead.
///
/// # Errors
///
/// * [`EtlError::Configuration`] if the options are inconsistent
/// * [`EtlError::DataQuality`] or [`EtlError::ReferentialIntegrity`] for
///   the first row-level problem when `options.strict` is set
pub fn load(
    records: &[RawCrashRecord],
    options: &LoadOptions,
    references: &References,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadOutcome, EtlError> {
    validate(options)?;
    let start = Instant::now();
    let total = records.len() as u64;

    log::info!("Conforming {total} crash records...");
    progress.set_total(total * 2);
    progress.set_message("conforming".to_string());
    let conformed: Vec<ConformedRecord> = records
        .par_iter()
        .enumerate()
        .map(|(index, raw)| {
            let record = conform(index, raw);
            progress.inc(1);
            record
        })
        .collect();

    log::info!("Resolving dimension keys and building facts...");
    progress.set_message("building facts".to_string());
    let mut context = LoadContext::new(references);
    let mut summary = LoadSummary {
        records_read: total,
        ..LoadSummary::default()
    };

    for record in conformed {
        progress.inc(1);
        if !options.accepts_year(record.year) {
            summary.filtered += 1;
            continue;
        }
        if options.strict
            && let Some(issue) = record.sentineled.first()
        {
            return Err(issue.clone().into());
        }
        match context.build_fact(&record) {
            Ok(_) => {
                summary.facts_inserted += 1;
                summary.sentineled.extend(record.sentineled);
            }
            Err(issue) => {
                log::warn!("rejecting record {}: {}", issue.record, issue.message);
                if options.strict {
                    return Err(issue.into());
                }
                summary.rejected.push(issue);
            }
        }
    }

    let warehouse = context.into_warehouse();
    summary.dimension_rows = DimensionKind::all()
        .iter()
        .map(|&d| (d.table_name().to_string(), warehouse.dimension_len(d)))
        .collect();
    summary.duration = start.elapsed();

    log::info!(
        "Load complete: {} read, {} facts, {} filtered, {} rejected, {} sentineled values ({:.1}s)",
        summary.records_read,
        summary.facts_inserted,
        summary.filtered,
        summary.rejected_count(),
        summary.sentineled.len(),
        summary.duration.as_secs_f64()
    );
    progress.finish(format!("{} facts loaded", summary.facts_inserted));

    Ok(LoadOutcome { warehouse, summary })
}

fn unreadable_issue(row: &MalformedRow) -> RecordIssue {
    RecordIssue {
        index: row.index,
        record: row.label(),
        kind: IssueKind::DataQuality,
        field: "row".to_string(),
        message: row.message.clone(),
    }
}

/// Builds a warehouse from a CSV batch, counting rows the reader could not
/// decode as read and rejected.
///
/// # Errors
///
/// Same as [`load`]. In strict mode an undecodable row fails the load
/// before any record is conformed.
pub fn load_batch(
    batch: &CrashBatch,
    options: &LoadOptions,
    references: &References,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadOutcome, EtlError> {
    validate(options)?;
    let unreadable: Vec<RecordIssue> = batch.malformed.iter().map(unreadable_issue).collect();
    if options.strict
        && let Some(issue) = unreadable.first()
    {
        return Err(issue.clone().into());
    }

    let mut outcome = load(&batch.records, options, references, progress)?;
    if !unreadable.is_empty() {
        log::warn!("{} CSV rows could not be decoded", unreadable.len());
    }
    let summary = &mut outcome.summary;
    summary.records_read += unreadable.len() as u64;
    let mut rejected = unreadable;
    rejected.append(&mut summary.rejected);
    summary.rejected = rejected;
    Ok(outcome)
}
