#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregate queries over the crash star schema.
//!
//! A [`QuerySpec`] runs either in memory against a loaded [`Warehouse`]
//! ([`evaluate`]) or as SQL against the persisted store
//! ([`sql::render`]). Both paths hand their raw groups to [`finalize`], so
//! they agree on ordering, tie-breaking and limits.

pub mod sql;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crash_warehouse_models::{DimensionValue, Warehouse};
use crash_warehouse_olap_models::{AggregateRow, Measure, QueryResult, QuerySpec};
use itertools::Itertools as _;
use thiserror::Error;

pub use crash_warehouse_olap_models as models;

/// Errors that can occur while preparing a query.
#[derive(Debug, Error)]
pub enum OlapError {
    /// The query specification is not usable.
    #[error("invalid query: {0}")]
    Configuration(String),
}

/// Rejects specs that cannot be answered unambiguously.
///
/// # Errors
///
/// * [`OlapError::Configuration`] if an attribute is grouped twice or a
///   filter has no values
pub fn validate(spec: &QuerySpec) -> Result<(), OlapError> {
    if let Some(attribute) = spec.group_by.iter().duplicates().next() {
        return Err(OlapError::Configuration(format!(
            "attribute {attribute} is grouped more than once"
        )));
    }
    if let Some(filter) = spec.filters.iter().find(|f| f.values.is_empty()) {
        return Err(OlapError::Configuration(format!(
            "filter on {} has no values",
            filter.attribute
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    crashes: u64,
    fatalities: u64,
}

impl Totals {
    const fn add(&mut self, other: Self) {
        self.crashes += other.crashes;
        self.fatalities += other.fatalities;
    }
}

/// Runs a query against an in-memory warehouse.
///
/// # Errors
///
/// * [`OlapError::Configuration`] if the query fails [`validate`]
pub fn evaluate(warehouse: &Warehouse, spec: &QuerySpec) -> Result<QueryResult, OlapError> {
    validate(spec)?;

    let mut groups: BTreeMap<Vec<DimensionValue>, Totals> = BTreeMap::new();
    for fact in warehouse.facts() {
        let keep = spec
            .filters
            .iter()
            .all(|filter| filter.matches(&warehouse.value_of(fact, filter.attribute)));
        if !keep {
            continue;
        }
        let key = spec
            .group_by
            .iter()
            .map(|&attribute| warehouse.value_of(fact, attribute))
            .collect();
        groups.entry(key).or_default().add(Totals {
            crashes: 1,
            fatalities: u64::from(fact.fatalities),
        });
    }

    let width = spec.group_by.len();
    let levels: Vec<usize> = if spec.rollup {
        (0..=width).rev().collect()
    } else {
        vec![width]
    };

    let mut rows = Vec::new();
    for level in levels {
        let mut rolled: BTreeMap<Vec<Option<DimensionValue>>, Totals> = BTreeMap::new();
        for (key, totals) in &groups {
            let values = key
                .iter()
                .enumerate()
                .map(|(i, value)| (i < level).then(|| value.clone()))
                .collect();
            rolled.entry(values).or_default().add(*totals);
        }
        rows.extend(
            rolled
                .into_iter()
                .map(|(values, t)| AggregateRow::new(values, t.crashes, t.fatalities)),
        );
    }

    log::debug!(
        "evaluated query over {} facts: {} groups",
        warehouse.facts().len(),
        rows.len()
    );

    Ok(finalize(spec, rows))
}

/// Orders, limits and labels raw aggregate rows.
///
/// Groups with no crashes are dropped. Rows are ordered by the requested
/// measure, then by grouping values ascending; without a requested measure
/// only the grouping values are used. Rolled-up values sort after concrete
/// ones, so each subtotal follows the rows it summarizes.
#[must_use]
pub fn finalize(spec: &QuerySpec, mut rows: Vec<AggregateRow>) -> QueryResult {
    rows.retain(|row| row.total_crashes > 0);
    rows.sort_by(|a, b| {
        let by_measure = spec.order_by.map_or(Ordering::Equal, |order| {
            let ord = compare_measure(order.measure, a, b);
            if order.descending { ord.reverse() } else { ord }
        });
        by_measure.then_with(|| compare_values(&a.values, &b.values))
    });
    if let Some(limit) = spec.limit {
        rows.truncate(limit);
    }
    QueryResult {
        columns: spec.group_by.clone(),
        rows,
    }
}

fn compare_measure(measure: Measure, a: &AggregateRow, b: &AggregateRow) -> Ordering {
    match measure {
        Measure::TotalCrashes => a.total_crashes.cmp(&b.total_crashes),
        Measure::TotalFatalities => a.total_fatalities.cmp(&b.total_fatalities),
        Measure::FatalityRatePer100 => a.fatality_rate_per_100.total_cmp(&b.fatality_rate_per_100),
    }
}

fn compare_values(a: &[Option<DimensionValue>], b: &[Option<DimensionValue>]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = match (x, y) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use crash_warehouse_etl::{References, load};
    use crash_warehouse_etl_models::LoadOptions;
    use crash_warehouse_models::{Attribute, RawCrashRecord};
    use crash_warehouse_olap_models::Filter;
    use crash_warehouse_source::progress::null_progress;

    use super::*;

    fn raw(crash_id: usize, crash_type: &str, fatalities: u32) -> RawCrashRecord {
        RawCrashRecord {
            crash_id: Some(format!("2021{crash_id:04}")),
            state: Some("NT".to_string()),
            year: Some("2021".to_string()),
            month: Some("3".to_string()),
            crash_type: Some(crash_type.to_string()),
            number_fatalities: Some(fatalities.to_string()),
            ..RawCrashRecord::default()
        }
    }

    /// Ten single crashes with twelve deaths, three pedestrian crashes
    /// with three deaths.
    fn warehouse() -> Warehouse {
        let mut records = Vec::new();
        for i in 0..10 {
            records.push(raw(i, "Single", if i < 2 { 2 } else { 1 }));
        }
        for i in 10..13 {
            records.push(raw(i, "Pedestrian", 1));
        }
        load(
            &records,
            &LoadOptions::default(),
            &References::default(),
            &null_progress(),
        )
        .unwrap()
        .warehouse
    }

    #[test]
    fn duplicate_grouping_is_rejected() {
        let spec = QuerySpec::group_by([Attribute::State, Attribute::State]);
        assert!(matches!(
            evaluate(&Warehouse::new(), &spec),
            Err(OlapError::Configuration(_))
        ));
    }

    #[test]
    fn ordering_breaks_ties_on_group_values() {
        let rows = vec![
            AggregateRow::new(vec![Some(DimensionValue::text("b"))], 1, 1),
            AggregateRow::new(vec![Some(DimensionValue::text("a"))], 1, 1),
            AggregateRow::new(vec![Some(DimensionValue::text("c"))], 2, 1),
            AggregateRow::new(vec![None], 4, 3),
        ];
        let spec = QuerySpec::group_by([Attribute::State]).order_by(Measure::TotalFatalities, true);
        let result = finalize(&spec, rows);
        let labels: Vec<String> = result
            .rows
            .iter()
            .map(|row| row.values[0].as_ref().map_or("*".to_string(), ToString::to_string))
            .collect();
        assert_eq!(labels, ["*", "a", "b", "c"]);
    }

    #[test]
    fn empty_groups_are_dropped_and_limit_applies() {
        let rows = vec![
            AggregateRow::new(vec![], 0, 0),
            AggregateRow::new(vec![Some(DimensionValue::Integer(2))], 3, 1),
            AggregateRow::new(vec![Some(DimensionValue::Integer(1))], 3, 1),
        ];
        let spec = QuerySpec::group_by([Attribute::Year]).limit(1);
        let result = finalize(&spec, rows);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].values, vec![Some(DimensionValue::Integer(1))]);
    }

    #[test]
    fn rate_is_fatalities_per_hundred_crashes() {
        let spec = QuerySpec::group_by([Attribute::CrashType])
            .filter(Filter::eq(Attribute::CrashType, "single"));
        let result = evaluate(&warehouse(), &spec).unwrap();
        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.total_crashes, 10);
        assert_eq!(row.total_fatalities, 12);
        assert!((row.fatality_rate_per_100 - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rollup_adds_grand_total_after_groups() {
        let spec = QuerySpec::group_by([Attribute::CrashType]).with_rollup();
        let result = evaluate(&warehouse(), &spec).unwrap();
        assert_eq!(result.rows.len(), 3);
        let total = result.rows.last().unwrap();
        assert_eq!(total.values, vec![None]);
        assert_eq!(total.total_crashes, 13);
        assert_eq!(total.total_fatalities, 15);
        assert!(total.is_subtotal());
    }

    #[test]
    fn missing_combinations_give_empty_results() {
        let spec = QuerySpec::group_by([Attribute::CrashType])
            .filter(Filter::eq(Attribute::CrashType, "Multiple"))
            .with_rollup();
        assert!(evaluate(&warehouse(), &spec).unwrap().rows.is_empty());
    }

    #[test]
    fn unknown_members_are_not_matched_by_other_values() {
        let spec = QuerySpec::default().filter(Filter::eq(Attribute::Gender, "Male"));
        let result = evaluate(&warehouse(), &spec).unwrap();
        assert!(result.rows.is_empty());
    }
}
