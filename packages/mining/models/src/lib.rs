#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Mining configuration and results.

use crash_warehouse_models::{Attribute, DimensionValue};
use serde::{Deserialize, Serialize};

/// One `attribute=value` item of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Item {
    pub attribute: Attribute,
    pub value: DimensionValue,
}

impl Item {
    #[must_use]
    pub const fn new(attribute: Attribute, value: DimensionValue) -> Self {
        Self { attribute, value }
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.attribute, self.value)
    }
}

/// Formats an itemset as `{a=x, b=y}`.
#[must_use]
pub fn format_items(items: &[Item]) -> String {
    let items: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("{{{}}}", items.join(", "))
}

/// Parameters of one mining run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Minimum fraction of transactions an itemset must appear in.
    pub min_support: f64,
    /// Minimum `support(itemset) / support(antecedent)` for a rule.
    pub min_confidence: f64,
    /// Attributes turned into items, one item per attribute per fact.
    pub attributes: Vec<Attribute>,
    pub min_lift: Option<f64>,
    /// Largest itemset size to search.
    pub max_itemset_len: Option<usize>,
    /// Keep `attribute=Unknown` items.
    pub include_unknown: bool,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: 0.1,
            min_confidence: 0.5,
            attributes: vec![
                Attribute::TimeOfDay,
                Attribute::Season,
                Attribute::State,
                Attribute::CrashType,
                Attribute::VehicleType,
                Attribute::AgeGroup,
                Attribute::Gender,
            ],
            min_lift: None,
            max_itemset_len: None,
            include_unknown: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentItemset {
    /// Items in ascending order.
    pub items: Vec<Item>,
    /// Number of transactions containing every item.
    pub count: u64,
    pub support: f64,
}

/// `antecedent => consequent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: Vec<Item>,
    pub consequent: Vec<Item>,
    /// Support of the whole itemset.
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

impl std::fmt::Display for AssociationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} => {} (support {:.4}, confidence {:.4}, lift {:.4})",
            format_items(&self.antecedent),
            format_items(&self.consequent),
            self.support,
            self.confidence,
            self.lift
        )
    }
}

/// Output of a mining run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningReport {
    pub transactions: usize,
    pub itemsets: Vec<FrequentItemset>,
    pub rules: Vec<AssociationRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reads_partial_toml() {
        let config: MiningConfig = toml::from_str(
            r#"
            min_support = 0.05
            attributes = ["gender", "age_group"]
            min_lift = 1.2
            "#,
        )
        .unwrap();
        assert!((config.min_support - 0.05).abs() < f64::EPSILON);
        assert!((config.min_confidence - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.attributes, vec![Attribute::Gender, Attribute::AgeGroup]);
        assert_eq!(config.min_lift, Some(1.2));
        assert!(!config.include_unknown);
    }

    #[test]
    fn rules_display_as_implications() {
        let rule = AssociationRule {
            antecedent: vec![Item::new(Attribute::TimeOfDay, DimensionValue::text("Night"))],
            consequent: vec![Item::new(Attribute::Gender, DimensionValue::text("Male"))],
            support: 0.25,
            confidence: 0.8,
            lift: 1.1,
        };
        assert_eq!(
            rule.to_string(),
            "{time_of_day=Night} => {gender=Male} (support 0.2500, confidence 0.8000, lift 1.1000)"
        );
    }
}
