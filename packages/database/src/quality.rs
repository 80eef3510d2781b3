//! Data quality scan of the stored warehouse.
//!
//! Mirrors the report built in memory after a load, but reads everything
//! back from the store so it can be run against an existing file.

use std::collections::BTreeMap;

use crash_warehouse_etl_models::QualityReport;
use crash_warehouse_models::{DimensionKind, SENTINEL_KEY};
use crash_warehouse_olap::sql::FACT_TABLE;
use duckdb::Connection;

use crate::DbError;
use crate::schema::LOAD_ISSUE_TABLE;

fn count(conn: &Connection, sql: &str) -> Result<usize, DbError> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    usize::try_from(n).map_err(|e| DbError::Conversion {
        message: format!("bad count {n}: {e}"),
    })
}

fn issues_by_field(conn: &Connection, outcome: &str) -> Result<BTreeMap<String, usize>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT field, COUNT(*) FROM {LOAD_ISSUE_TABLE} WHERE outcome = ? GROUP BY field"
    ))?;
    let rows = stmt
        .query_map([outcome], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .map(|(field, n)| (field, usize::try_from(n).unwrap_or(0)))
        .collect())
}

/// Scans the store: row counts, sentinel usage, dangling foreign keys,
/// recorded load issues and the season label mapping.
///
/// # Errors
///
/// Returns [`DbError`] if any table cannot be read.
pub fn quality_scan(conn: &Connection) -> Result<QualityReport, DbError> {
    let mut report = QualityReport::default();

    for &dimension in DimensionKind::all() {
        let table = dimension.table_name();
        let column = dimension.key_column();
        report.table_rows.insert(
            table.to_string(),
            count(conn, &format!("SELECT COUNT(*) FROM {table}"))?,
        );
        report.sentinel_references.insert(
            table.to_string(),
            count(
                conn,
                &format!(
                    "SELECT COUNT(*) FROM {FACT_TABLE} WHERE {column} = {}",
                    SENTINEL_KEY.0
                ),
            )?,
        );
        report.dangling_references.insert(
            table.to_string(),
            count(
                conn,
                &format!(
                    "SELECT COUNT(*) FROM {FACT_TABLE} f LEFT JOIN {table} x ON x.{column} = f.{column} WHERE x.{column} IS NULL"
                ),
            )?,
        );
    }
    report.table_rows.insert(
        FACT_TABLE.to_string(),
        count(conn, &format!("SELECT COUNT(*) FROM {FACT_TABLE}"))?,
    );

    report.rejected_by_field = issues_by_field(conn, "rejected")?;
    report.sentineled_by_field = issues_by_field(conn, "sentineled")?;

    let mut stmt = conn.prepare("SELECT raw_label, clean_label FROM season_dimension_clean")?;
    report.season_labels = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    if !report.referentially_intact() {
        log::warn!("stored fact table has dangling dimension references");
    }
    Ok(report)
}
