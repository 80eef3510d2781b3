//! Read paths over the stored warehouse.

use std::collections::BTreeSet;

use crash_warehouse_models::{Attribute, DimensionKind, DimensionValue};
use crash_warehouse_olap::models::{QueryResult, QuerySpec};
use crash_warehouse_olap::sql::{self, FACT_TABLE};
use crash_warehouse_olap::{finalize, sql::aggregate_row};
use duckdb::{Connection, params_from_iter};

use crate::DbError;

/// Runs an aggregate query against the store.
///
/// # Errors
///
/// Returns [`DbError::Query`] for an invalid query and
/// [`DbError::DuckDb`] if execution fails.
pub fn run_query(conn: &Connection, spec: &QuerySpec) -> Result<QueryResult, DbError> {
    let query = sql::render(spec)?;
    let mut stmt = conn.prepare(&query.sql)?;
    let width = query.group_columns;

    let rows = stmt
        .query_map(params_from_iter(query.params.iter()), |row| {
            let mut groups = Vec::with_capacity(width);
            for i in 0..width {
                groups.push(row.get::<_, Option<String>>(i)?);
            }
            let crashes: i64 = row.get(width)?;
            let fatalities: i64 = row.get(width + 1)?;
            let rate: Option<f64> = row.get(width + 2)?;
            Ok(aggregate_row(
                spec,
                groups,
                crashes,
                fatalities,
                rate.unwrap_or_default(),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("query returned {} groups", rows.len());
    Ok(finalize(spec, rows))
}

/// Reads `attributes` for every fact, in fact order, rendered the same
/// way the in-memory warehouse renders them.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn fetch_attribute_rows(
    conn: &Connection,
    attributes: &[Attribute],
) -> Result<Vec<Vec<DimensionValue>>, DbError> {
    if attributes.is_empty() {
        return Ok(Vec::new());
    }
    let columns: Vec<String> = attributes.iter().map(|&a| sql::value_sql(a)).collect();
    let dimensions: BTreeSet<DimensionKind> = attributes.iter().map(|a| a.dimension()).collect();
    let joins: Vec<String> = dimensions.into_iter().map(sql::join_sql).collect();
    let query = format!(
        "SELECT {} FROM {FACT_TABLE} f {} ORDER BY f.fact_id",
        columns.join(", "),
        joins.join(" ")
    );

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(attributes.len());
            for (i, &attribute) in attributes.iter().enumerate() {
                let text: String = row.get(i)?;
                values.push(attribute.value_from_text(&text));
            }
            Ok(values)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of stored facts.
///
/// # Errors
///
/// Returns [`DbError`] if the fact table cannot be read.
pub fn fact_count(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {FACT_TABLE}"), [], |row| {
        row.get(0)
    })?;
    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("negative fact count {count}: {e}"),
    })
}
