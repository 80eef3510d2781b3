//! Level-wise frequent itemset search and rule generation.

use std::collections::{HashMap, HashSet};

use crash_warehouse_mining_models::{AssociationRule, FrequentItemset, MiningReport};
use itertools::Itertools as _;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::transactions::TransactionSet;

/// Thresholds the search runs with. Validated by the caller.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub min_support: f64,
    pub min_confidence: f64,
    pub min_lift: Option<f64>,
    pub max_itemset_len: Option<usize>,
}

/// Smallest transaction count with `count / n >= min_support`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn min_count(min_support: f64, transactions: usize) -> u64 {
    // Rounding error in the product grows with its magnitude, so the
    // tolerance does too.
    let product = min_support * transactions as f64;
    let count = product.mul_add(-4.0 * f64::EPSILON, product).ceil();
    (count.max(1.0)) as u64
}

// Both slices sorted.
fn is_subset(candidate: &[u32], transaction: &[u32]) -> bool {
    let mut rest = transaction.iter();
    candidate
        .iter()
        .all(|item| rest.by_ref().any(|other| other == item))
}

/// Joins frequent (k-1)-itemsets sharing a (k-2)-prefix and drops
/// candidates with an infrequent (k-1)-subset.
fn candidates(frequent: &[Vec<u32>]) -> Vec<Vec<u32>> {
    let known: HashSet<&[u32]> = frequent.iter().map(Vec::as_slice).collect();
    let mut out = Vec::new();
    for (i, a) in frequent.iter().enumerate() {
        let prefix = &a[..a.len() - 1];
        for b in &frequent[i + 1..] {
            if &b[..b.len() - 1] != prefix {
                // `frequent` is sorted, so no later set shares the prefix.
                break;
            }
            let mut candidate = a.clone();
            candidate.push(b[b.len() - 1]);
            let closed = (0..candidate.len()).all(|skip| {
                let subset: Vec<u32> = candidate
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != skip)
                    .map(|(_, &item)| item)
                    .collect();
                known.contains(subset.as_slice())
            });
            if closed {
                out.push(candidate);
            }
        }
    }
    out
}

fn count_level(candidates: Vec<Vec<u32>>, transactions: &[Vec<u32>]) -> Vec<(Vec<u32>, u64)> {
    candidates
        .into_par_iter()
        .map(|candidate| {
            let count = transactions
                .iter()
                .filter(|transaction| is_subset(&candidate, transaction))
                .count() as u64;
            (candidate, count)
        })
        .collect()
}

/// Finds every frequent itemset as `(sorted ids, count)`.
#[must_use]
pub fn frequent_itemsets(set: &TransactionSet, thresholds: &Thresholds) -> Vec<(Vec<u32>, u64)> {
    if set.is_empty() {
        return Vec::new();
    }
    let threshold = min_count(thresholds.min_support, set.len());
    let max_len = thresholds.max_itemset_len.unwrap_or(usize::MAX);

    let mut singles: HashMap<u32, u64> = HashMap::new();
    for transaction in &set.transactions {
        for &item in transaction {
            *singles.entry(item).or_insert(0) += 1;
        }
    }
    let mut level: Vec<(Vec<u32>, u64)> = singles
        .into_iter()
        .filter(|&(_, count)| count >= threshold)
        .map(|(item, count)| (vec![item], count))
        .sorted()
        .collect();

    let mut all = Vec::new();
    let mut size = 1;
    while !level.is_empty() {
        log::debug!("level {size}: {} frequent itemsets", level.len());
        let frequent: Vec<Vec<u32>> = level.iter().map(|(items, _)| items.clone()).collect();
        all.append(&mut level);
        if size >= max_len {
            break;
        }
        size += 1;

        let next = candidates(&frequent);
        log::debug!("level {size}: counting {} candidates", next.len());
        level = count_level(next, &set.transactions)
            .into_iter()
            .filter(|&(_, count)| count >= threshold)
            .sorted()
            .collect();
    }
    all
}

/// Runs the full search and builds rules.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn apriori(set: &TransactionSet, thresholds: &Thresholds) -> MiningReport {
    let total = set.len();
    let frequent = frequent_itemsets(set, thresholds);
    if frequent.is_empty() {
        return MiningReport {
            transactions: total,
            ..MiningReport::default()
        };
    }
    let n = total as f64;
    let counts: HashMap<&[u32], u64> = frequent
        .iter()
        .map(|(items, count)| (items.as_slice(), *count))
        .collect();

    let mut rules: Vec<(Vec<u32>, Vec<u32>, u64, f64, f64)> = frequent
        .par_iter()
        .filter(|(items, _)| items.len() >= 2)
        .flat_map_iter(|(items, count)| {
            let counts = &counts;
            (1..items.len()).flat_map(move |size| {
                items.iter().copied().combinations(size).filter_map(move |antecedent| {
                    let consequent: Vec<u32> = items
                        .iter()
                        .copied()
                        .filter(|item| !antecedent.contains(item))
                        .collect();
                    let antecedent_count = *counts.get(antecedent.as_slice())?;
                    let consequent_count = *counts.get(consequent.as_slice())?;
                    let confidence = *count as f64 / antecedent_count as f64;
                    let lift = confidence / (consequent_count as f64 / n);
                    Some((antecedent, consequent, *count, confidence, lift))
                })
            })
        })
        .filter(|&(_, _, _, confidence, lift)| {
            confidence >= thresholds.min_confidence
                && thresholds.min_lift.is_none_or(|min| lift >= min)
        })
        .collect();

    rules.sort_by(|a, b| {
        OrderedFloat(b.3)
            .cmp(&OrderedFloat(a.3))
            .then_with(|| OrderedFloat(b.4).cmp(&OrderedFloat(a.4)))
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(&b.0))
            .then_with(|| a.1.cmp(&b.1))
    });

    let mut itemsets = frequent;
    itemsets.sort_by(|a, b| {
        a.0.len()
            .cmp(&b.0.len())
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    log::debug!(
        "{} frequent itemsets, {} rules over {total} transactions",
        itemsets.len(),
        rules.len()
    );

    MiningReport {
        transactions: total,
        itemsets: itemsets
            .into_iter()
            .map(|(items, count)| FrequentItemset {
                items: set.itemizer.items_of(&items),
                count,
                support: count as f64 / n,
            })
            .collect(),
        rules: rules
            .into_iter()
            .map(|(antecedent, consequent, count, confidence, lift)| AssociationRule {
                antecedent: set.itemizer.items_of(&antecedent),
                consequent: set.itemizer.items_of(&consequent),
                support: count as f64 / n,
                confidence,
                lift,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_check_walks_sorted_lists() {
        assert!(is_subset(&[1, 3], &[0, 1, 2, 3]));
        assert!(!is_subset(&[1, 4], &[0, 1, 2, 3]));
        assert!(is_subset(&[], &[0]));
        assert!(!is_subset(&[0], &[]));
    }

    #[test]
    fn min_count_rounds_up_without_float_noise() {
        assert_eq!(min_count(0.4, 5), 2);
        assert_eq!(min_count(0.41, 5), 3);
        assert_eq!(min_count(1.0, 3), 3);
        assert_eq!(min_count(0.001, 10), 1);
    }

    #[test]
    fn min_count_tolerance_scales_with_transaction_count() {
        // 0.07 * 3e8 comes out just above 21_000_000.
        assert_eq!(min_count(0.07, 300_000_000), 21_000_000);
        assert_eq!(min_count(0.07, 300_000_000_000), 21_000_000_000);
        // A support a hair above 0.4 still needs a third transaction.
        assert_eq!(min_count(0.400_000_000_01, 5), 3);
    }

    #[test]
    fn candidates_are_pruned_by_downward_closure() {
        // {0,1}, {0,2}, {1,3}: joining gives {0,1,2}, but {1,2} is not
        // frequent.
        let frequent = vec![vec![0, 1], vec![0, 2], vec![1, 3]];
        assert!(candidates(&frequent).is_empty());

        let frequent = vec![vec![0, 1], vec![0, 2], vec![1, 2]];
        assert_eq!(candidates(&frequent), vec![vec![0, 1, 2]]);
    }
}
