//! Post-load data quality report.

use std::collections::BTreeMap;

use crash_warehouse_etl_models::{LoadSummary, QualityReport, RecordIssue};
use crash_warehouse_models::{DimensionKind, SENTINEL_KEY, Warehouse};

/// Name under which the fact table appears in reports.
pub const FACT_TABLE: &str = "fact_table";

/// Builds the quality report for a freshly loaded warehouse.
#[must_use]
pub fn quality_report(warehouse: &Warehouse, summary: &LoadSummary) -> QualityReport {
    let mut report = QualityReport::default();

    for &dimension in DimensionKind::all() {
        let table = dimension.table_name().to_string();
        report
            .table_rows
            .insert(table.clone(), warehouse.dimension_len(dimension));

        let mut sentinel = 0;
        let mut dangling = 0;
        for fact in warehouse.facts() {
            let key = fact.key_for(dimension);
            if key == SENTINEL_KEY {
                sentinel += 1;
            }
            if !warehouse.has_key(dimension, key) {
                dangling += 1;
            }
        }
        report.sentinel_references.insert(table.clone(), sentinel);
        report.dangling_references.insert(table, dangling);
    }
    report
        .table_rows
        .insert(FACT_TABLE.to_string(), warehouse.facts().len());

    report.rejected_by_field = count_by_field(&summary.rejected);
    report.sentineled_by_field = count_by_field(&summary.sentineled);
    report.season_labels = warehouse
        .season_clean
        .values()
        .map(|row| (row.raw_label.clone(), row.clean_label.clone()))
        .collect();

    report
}

fn count_by_field(issues: &[RecordIssue]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.field.clone()).or_insert(0) += 1;
    }
    counts
}

/// Logs a report at `info`, warning about anything that needs attention.
pub fn log_report(report: &QualityReport) {
    for (table, rows) in &report.table_rows {
        log::info!("{table}: {rows} rows");
    }
    for (table, count) in &report.sentinel_references {
        if *count > 0 {
            log::info!("{table}: {count} facts reference the unknown row");
        }
    }
    for (field, count) in &report.rejected_by_field {
        log::warn!("{count} records rejected for {field}");
    }
    for (field, count) in &report.sentineled_by_field {
        log::warn!("{count} values sentineled for {field}");
    }
    if report.referentially_intact() {
        log::info!("referential integrity check passed");
    } else {
        for (table, count) in &report.dangling_references {
            if *count > 0 {
                log::warn!("{count} facts have dangling keys into {table}");
            }
        }
    }
}
