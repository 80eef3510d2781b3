#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Apriori association rule mining over crash facts.
//!
//! Each fact becomes a transaction of `attribute=value` items. Frequent
//! itemsets are found level by level, counting each level's candidates on
//! the `rayon` pool; rules are then derived from every split of every
//! frequent itemset.

pub mod apriori;
pub mod transactions;

use crash_warehouse_mining_models::{MiningConfig, MiningReport};
use crash_warehouse_models::Warehouse;
use itertools::Itertools as _;
use thiserror::Error;

pub use apriori::Thresholds;
pub use crash_warehouse_mining_models as models;
pub use transactions::{Itemizer, TransactionSet};

/// Errors that can occur before mining starts.
#[derive(Debug, Error)]
pub enum MiningError {
    /// Thresholds or attributes are unusable.
    #[error("invalid mining configuration: {0}")]
    Configuration(String),
}

fn check_fraction(name: &str, value: f64) -> Result<(), MiningError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(MiningError::Configuration(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

/// Checks a configuration without touching any data.
///
/// # Errors
///
/// * [`MiningError::Configuration`] if a threshold is outside (0, 1],
///   `min_lift` is not positive, `max_itemset_len` is zero, or the
///   attribute list is empty or repeats an attribute
pub fn validate(config: &MiningConfig) -> Result<(), MiningError> {
    check_fraction("min_support", config.min_support)?;
    check_fraction("min_confidence", config.min_confidence)?;
    if let Some(lift) = config.min_lift
        && (lift.is_nan() || lift <= 0.0)
    {
        return Err(MiningError::Configuration(format!(
            "min_lift must be positive, got {lift}"
        )));
    }
    if config.max_itemset_len == Some(0) {
        return Err(MiningError::Configuration(
            "max_itemset_len must be at least 1".to_string(),
        ));
    }
    if config.attributes.is_empty() {
        return Err(MiningError::Configuration(
            "at least one attribute is required".to_string(),
        ));
    }
    if let Some(attribute) = config.attributes.iter().duplicates().next() {
        return Err(MiningError::Configuration(format!(
            "attribute {attribute} is listed more than once"
        )));
    }
    Ok(())
}

const fn thresholds(config: &MiningConfig) -> Thresholds {
    Thresholds {
        min_support: config.min_support,
        min_confidence: config.min_confidence,
        min_lift: config.min_lift,
        max_itemset_len: config.max_itemset_len,
    }
}

/// Mines an existing transaction set.
///
/// # Errors
///
/// * [`MiningError::Configuration`] if the config fails [`validate`]
pub fn mine_transactions(
    set: &TransactionSet,
    config: &MiningConfig,
) -> Result<MiningReport, MiningError> {
    validate(config)?;
    Ok(run(set, config))
}

fn run(set: &TransactionSet, config: &MiningConfig) -> MiningReport {
    log::info!(
        "Mining {} transactions over {} distinct items (min support {}, min confidence {})",
        set.len(),
        set.itemizer.len(),
        config.min_support,
        config.min_confidence
    );
    let report = apriori::apriori(set, &thresholds(config));
    log::info!(
        "Found {} frequent itemsets and {} rules",
        report.itemsets.len(),
        report.rules.len()
    );
    report
}

/// Mines the facts of a loaded warehouse.
///
/// # Errors
///
/// * [`MiningError::Configuration`] if the config fails [`validate`]
pub fn mine(warehouse: &Warehouse, config: &MiningConfig) -> Result<MiningReport, MiningError> {
    validate(config)?;
    let set = TransactionSet::from_warehouse(warehouse, &config.attributes, config.include_unknown);
    Ok(run(&set, config))
}

#[cfg(test)]
mod tests {
    use crash_warehouse_models::Attribute;

    use super::*;

    #[test]
    fn thresholds_outside_unit_interval_are_rejected() {
        for (support, confidence) in [(0.0, 0.5), (1.5, 0.5), (0.2, -0.1), (0.2, 1.01)] {
            let config = MiningConfig {
                min_support: support,
                min_confidence: confidence,
                ..MiningConfig::default()
            };
            assert!(matches!(
                validate(&config),
                Err(MiningError::Configuration(_))
            ));
        }
        assert!(validate(&MiningConfig::default()).is_ok());
    }

    #[test]
    fn attribute_lists_must_be_non_empty_and_distinct() {
        let empty = MiningConfig {
            attributes: vec![],
            ..MiningConfig::default()
        };
        assert!(validate(&empty).is_err());
        let repeated = MiningConfig {
            attributes: vec![Attribute::Gender, Attribute::Gender],
            ..MiningConfig::default()
        };
        assert!(validate(&repeated).is_err());
    }

    #[test]
    fn lift_and_length_limits_are_checked() {
        let lift = MiningConfig {
            min_lift: Some(0.0),
            ..MiningConfig::default()
        };
        assert!(validate(&lift).is_err());
        let len = MiningConfig {
            max_itemset_len: Some(0),
            ..MiningConfig::default()
        };
        assert!(validate(&len).is_err());
    }

    #[test]
    fn empty_warehouse_mines_nothing() {
        let report = mine(&Warehouse::new(), &MiningConfig::default()).unwrap();
        assert_eq!(report.transactions, 0);
        assert!(report.itemsets.is_empty());
        assert!(report.rules.is_empty());
    }
}
