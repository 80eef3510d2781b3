#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregate query model.
//!
//! A [`QuerySpec`] describes a slice of the fact table: which attributes
//! to group by, which values to keep, and how to order the result. Both
//! the in-memory evaluator and the SQL renderer consume the same query and
//! produce the same [`QueryResult`].

use std::str::FromStr;

use crash_warehouse_models::{Attribute, DimensionValue};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// An aggregate measure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Measure {
    /// `count(*)`
    TotalCrashes,
    /// `sum(fatalities)`
    TotalFatalities,
    /// Fatalities per 100 crashes, rounded to two decimals.
    #[strum(to_string = "fatality_rate_per_100", serialize = "rate")]
    FatalityRatePer100,
}

/// How a filter compares an attribute with its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// The attribute equals one of the values.
    In,
    /// The attribute equals none of the values.
    NotIn,
}

/// A predicate on one attribute.
///
/// Values are compared against the attribute's display text, ignoring
/// ASCII case, so `state=vic` matches `VIC` and `bus_involvement=yes`
/// matches involved buses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub attribute: Attribute,
    pub op: FilterOp,
    pub values: Vec<String>,
}

impl Filter {
    #[must_use]
    pub fn eq(attribute: Attribute, value: impl Into<String>) -> Self {
        Self {
            attribute,
            op: FilterOp::In,
            values: vec![value.into()],
        }
    }

    #[must_use]
    pub fn not_eq(attribute: Attribute, value: impl Into<String>) -> Self {
        Self {
            attribute,
            op: FilterOp::NotIn,
            values: vec![value.into()],
        }
    }

    #[must_use]
    pub fn one_of(attribute: Attribute, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            attribute,
            op: FilterOp::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Tests a value against this filter.
    #[must_use]
    pub fn matches(&self, value: &DimensionValue) -> bool {
        let text = value.to_string();
        let found = self.values.iter().any(|v| v.trim().eq_ignore_ascii_case(&text));
        match self.op {
            FilterOp::In => found,
            FilterOp::NotIn => !found,
        }
    }
}

/// Error parsing a filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFilterError(pub String);

impl std::fmt::Display for InvalidFilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid filter {:?}: expected attribute=value[|value...] or attribute!=value",
            self.0
        )
    }
}

impl std::error::Error for InvalidFilterError {}

impl FromStr for Filter {
    type Err = InvalidFilterError;

    /// Parses `attribute=a|b` (one of) and `attribute!=a|b` (none of).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidFilterError(s.to_string());
        let (name, values, op) = if let Some((name, values)) = s.split_once("!=") {
            (name, values, FilterOp::NotIn)
        } else if let Some((name, values)) = s.split_once('=') {
            (name, values, FilterOp::In)
        } else {
            return Err(err());
        };
        let attribute = name.trim().parse::<Attribute>().map_err(|_| err())?;
        let values: Vec<String> = values
            .split('|')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .collect();
        if values.is_empty() {
            return Err(err());
        }
        Ok(Self {
            attribute,
            op,
            values,
        })
    }
}

/// Result ordering by a measure. Ties always break on the grouping
/// values, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub measure: Measure,
    pub descending: bool,
}

/// A parameterized aggregation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub group_by: Vec<Attribute>,
    pub filters: Vec<Filter>,
    /// Adds subtotal rows for every prefix of `group_by` and a grand total.
    pub rollup: bool,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl QuerySpec {
    #[must_use]
    pub fn group_by(attributes: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            group_by: attributes.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub const fn with_rollup(mut self) -> Self {
        self.rollup = true;
        self
    }

    #[must_use]
    pub const fn order_by(mut self, measure: Measure, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            measure,
            descending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Computes `round2(fatalities * 100 / crashes)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fatality_rate_per_100(total_fatalities: u64, total_crashes: u64) -> f64 {
    if total_crashes == 0 {
        return 0.0;
    }
    let rate = total_fatalities as f64 * 100.0 / total_crashes as f64;
    (rate * 100.0).round() / 100.0
}

/// One aggregated group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// One value per `group_by` attribute; `None` marks a rolled-up
    /// attribute in subtotal rows.
    pub values: Vec<Option<DimensionValue>>,
    pub total_crashes: u64,
    pub total_fatalities: u64,
    pub fatality_rate_per_100: f64,
}

impl AggregateRow {
    #[must_use]
    pub fn new(values: Vec<Option<DimensionValue>>, total_crashes: u64, total_fatalities: u64) -> Self {
        Self {
            values,
            total_crashes,
            total_fatalities,
            fatality_rate_per_100: fatality_rate_per_100(total_fatalities, total_crashes),
        }
    }

    /// Returns `true` for subtotal and grand total rows.
    #[must_use]
    pub fn is_subtotal(&self) -> bool {
        self.values.iter().any(Option::is_none)
    }
}

/// Tabular query output: `{grouping attributes..., total_crashes,
/// total_fatalities, fatality_rate_per_100}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Attribute>,
    pub rows: Vec<AggregateRow>,
}

impl QueryResult {
    /// Column headers including the three measures.
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(ToString::to_string)
            .chain(
                [
                    Measure::TotalCrashes,
                    Measure::TotalFatalities,
                    Measure::FatalityRatePer100,
                ]
                .iter()
                .map(ToString::to_string),
            )
            .collect()
    }
}
