//! SQL rendering of [`QuerySpec`]s against the persisted star schema.
//!
//! Every grouped or filtered attribute is rendered as text, with missing
//! values spelled `Unknown` and flags spelled `Yes`/`No`, so SQL groups
//! line up with the in-memory [`DimensionValue`] rendering. Dimensions are
//! joined with `LEFT JOIN` so facts are never dropped by the join, and
//! filter values are bound as parameters.

use std::collections::BTreeSet;

use crash_warehouse_models::{Attribute, DimensionKind, DimensionValue, ValueKind};
use crash_warehouse_olap_models::{AggregateRow, FilterOp, QuerySpec};

use crate::{OlapError, validate};

/// Name of the persisted fact table.
pub const FACT_TABLE: &str = "fact_table";

/// Name of the persisted raw-to-clean season lookup.
pub const SEASON_CLEAN_TABLE: &str = "season_dimension_clean";

/// A rendered statement and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<String>,
    /// Number of leading grouping columns (`g0`, `g1`, ...) in the output.
    pub group_columns: usize,
}

/// Renders an attribute as a text-valued SQL expression.
#[must_use]
pub fn value_sql(attribute: Attribute) -> String {
    let expr = attribute.sql_expr();
    match attribute.kind() {
        ValueKind::Flag => {
            format!("CASE WHEN {expr} THEN 'Yes' WHEN NOT {expr} THEN 'No' ELSE 'Unknown' END")
        }
        ValueKind::Text | ValueKind::Integer => {
            format!("COALESCE(CAST({expr} AS VARCHAR), 'Unknown')")
        }
    }
}

/// Renders the join for one dimension.
#[must_use]
pub fn join_sql(dimension: DimensionKind) -> String {
    let alias = dimension.alias();
    let key = dimension.key_column();
    let source = match dimension {
        DimensionKind::Season => {
            format!("(SELECT DISTINCT season_id, clean_label FROM {SEASON_CLEAN_TABLE})")
        }
        _ => dimension.table_name().to_string(),
    };
    format!("LEFT JOIN {source} {alias} ON {alias}.{key} = f.{key}")
}

/// Renders `spec` as one aggregate statement over the fact table.
///
/// The statement yields columns `g0..gN` (one per grouped attribute, NULL
/// where rolled up) followed by `total_crashes`, `total_fatalities` and
/// `fatality_rate_per_100`. Ordering and limits are left to
/// [`crate::finalize`].
///
/// # Errors
///
/// * [`OlapError::Configuration`] if the query fails [`validate`]
pub fn render(spec: &QuerySpec) -> Result<SqlQuery, OlapError> {
    validate(spec)?;

    let dimensions: BTreeSet<DimensionKind> = spec
        .group_by
        .iter()
        .chain(spec.filters.iter().map(|f| &f.attribute))
        .map(|a| a.dimension())
        .collect();

    let group_exprs: Vec<String> = spec.group_by.iter().map(|&a| value_sql(a)).collect();

    let mut select: Vec<String> = group_exprs
        .iter()
        .enumerate()
        .map(|(i, expr)| format!("{expr} AS g{i}"))
        .collect();
    select.push("COUNT(*) AS total_crashes".to_string());
    select.push("CAST(COALESCE(SUM(f.fatalities), 0) AS BIGINT) AS total_fatalities".to_string());
    select.push(
        "ROUND(CAST(COALESCE(SUM(f.fatalities), 0) AS DOUBLE) * 100.0 / COUNT(*), 2) AS fatality_rate_per_100"
            .to_string(),
    );

    let mut sql = format!("SELECT {} FROM {FACT_TABLE} f", select.join(", "));
    for dimension in dimensions {
        sql.push(' ');
        sql.push_str(&join_sql(dimension));
    }

    let mut frags: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();
    for filter in &spec.filters {
        let placeholders: Vec<&str> = filter
            .values
            .iter()
            .map(|value| {
                params.push(value.trim().to_string());
                "LOWER(?)"
            })
            .collect();
        let op = match filter.op {
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT IN",
        };
        frags.push(format!(
            "LOWER({}) {op} ({})",
            value_sql(filter.attribute),
            placeholders.join(", ")
        ));
    }
    sql.push_str(&where_clause(&frags));

    if !group_exprs.is_empty() {
        let grouping = group_exprs.join(", ");
        if spec.rollup {
            sql.push_str(&format!(" GROUP BY ROLLUP ({grouping})"));
        } else {
            sql.push_str(&format!(" GROUP BY {grouping}"));
        }
    }

    log::debug!("rendered query: {sql}");

    Ok(SqlQuery {
        sql,
        params,
        group_columns: spec.group_by.len(),
    })
}

fn where_clause(frags: &[String]) -> String {
    if frags.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", frags.join(" AND "))
    }
}

/// Converts one result row of a rendered statement.
///
/// `groups` holds the `g0..gN` columns as read from the store.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn aggregate_row(
    spec: &QuerySpec,
    groups: Vec<Option<String>>,
    total_crashes: i64,
    total_fatalities: i64,
    fatality_rate_per_100: f64,
) -> AggregateRow {
    let values: Vec<Option<DimensionValue>> = spec
        .group_by
        .iter()
        .zip(groups)
        .map(|(&attribute, text)| text.map(|text| attribute.value_from_text(&text)))
        .collect();
    AggregateRow {
        values,
        total_crashes: total_crashes.max(0) as u64,
        total_fatalities: total_fatalities.max(0) as u64,
        fatality_rate_per_100,
    }
}
