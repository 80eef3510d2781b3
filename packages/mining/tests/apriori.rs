use std::collections::{BTreeSet, HashMap};

use crash_warehouse_mining::models::{Item, MiningConfig, MiningReport};
use crash_warehouse_mining::{TransactionSet, mine_transactions};
use crash_warehouse_models::{Attribute, DimensionValue};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

fn item(label: &str) -> Item {
    Item::new(Attribute::CrashType, DimensionValue::text(label))
}

fn basket(labels: &[&str]) -> Vec<Item> {
    labels.iter().map(|label| item(label)).collect()
}

fn config(min_support: f64, min_confidence: f64) -> MiningConfig {
    MiningConfig {
        min_support,
        min_confidence,
        attributes: vec![Attribute::CrashType],
        ..MiningConfig::default()
    }
}

fn supports(report: &MiningReport) -> HashMap<Vec<String>, f64> {
    report
        .itemsets
        .iter()
        .map(|set| {
            let labels = set.items.iter().map(|i| i.value.to_string()).collect();
            (labels, set.support)
        })
        .collect()
}

#[test]
fn textbook_example() {
    let set = TransactionSet::from_items([
        basket(&["A", "B", "C"]),
        basket(&["A", "B"]),
        basket(&["A", "C"]),
        basket(&["A"]),
        basket(&["B", "C"]),
    ]);
    let report = mine_transactions(&set, &config(0.4, 0.5)).unwrap();
    let supports = supports(&report);

    let expect = |labels: &[&str], support: f64| {
        let key: Vec<String> = labels.iter().map(ToString::to_string).collect();
        let found = supports.get(&key).copied();
        assert!(
            found.is_some_and(|s| (s - support).abs() < 1e-9),
            "{key:?}: expected {support}, got {found:?}"
        );
    };
    expect(&["A"], 0.8);
    expect(&["B"], 0.6);
    expect(&["C"], 0.6);
    expect(&["A", "B"], 0.4);
    expect(&["A", "C"], 0.4);
    expect(&["B", "C"], 0.4);
    assert_eq!(report.itemsets.len(), 6);
    assert!(!supports.contains_key(&vec!["A".to_string(), "B".to_string(), "C".to_string()]));

    // {B} => {A}: 0.4 / 0.6
    let rule = report
        .rules
        .iter()
        .find(|r| r.antecedent == basket(&["B"]) && r.consequent == basket(&["A"]))
        .unwrap();
    assert!((rule.confidence - 2.0 / 3.0).abs() < 1e-9);
    assert!((rule.lift - (2.0 / 3.0) / 0.8).abs() < 1e-9);
}

#[test]
fn single_item_transactions_and_empty_sets() {
    let set = TransactionSet::from_items([basket(&["A"]), basket(&["A"]), basket(&["B"])]);
    let report = mine_transactions(&set, &config(0.5, 0.5)).unwrap();
    assert_eq!(report.itemsets.len(), 1);
    assert!(report.rules.is_empty());

    let empty = TransactionSet::from_items(Vec::<Vec<Item>>::new());
    let report = mine_transactions(&empty, &config(0.5, 0.5)).unwrap();
    assert_eq!(report, MiningReport::default());
}

#[test]
fn max_itemset_len_stops_the_search() {
    let set = TransactionSet::from_items(vec![basket(&["A", "B", "C"]); 4]);
    let mut limited = config(0.5, 0.1);
    limited.max_itemset_len = Some(2);
    let report = mine_transactions(&set, &limited).unwrap();
    assert!(report.itemsets.iter().all(|s| s.items.len() <= 2));
    assert_eq!(report.itemsets.len(), 6);
}

fn random_transactions(seed: u64) -> Vec<Vec<Item>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let labels = ["a", "b", "c", "d", "e", "f", "g", "h"];
    (0..200)
        .map(|_| {
            let len = rng.gen_range(1..=5);
            (0..len)
                .map(|_| item(labels[rng.gen_range(0..labels.len())]))
                .collect()
        })
        .collect()
}

#[test]
fn every_subset_of_a_frequent_itemset_is_frequent() {
    for seed in [1, 7, 42] {
        let transactions = random_transactions(seed);
        let set = TransactionSet::from_items(transactions.clone());
        let report = mine_transactions(&set, &config(0.05, 0.3)).unwrap();
        assert!(!report.itemsets.is_empty());

        let frequent: BTreeSet<Vec<Item>> =
            report.itemsets.iter().map(|s| s.items.clone()).collect();
        for itemset in &frequent {
            for skip in 0..itemset.len() {
                let mut subset = itemset.clone();
                subset.remove(skip);
                if !subset.is_empty() {
                    assert!(frequent.contains(&subset), "seed {seed}: {subset:?}");
                }
            }
        }

        // Counts agree with a brute-force scan.
        let baskets: Vec<BTreeSet<Item>> = transactions
            .into_iter()
            .map(|t| t.into_iter().collect())
            .collect();
        for itemset in &report.itemsets {
            let count = baskets
                .iter()
                .filter(|b| itemset.items.iter().all(|i| b.contains(i)))
                .count() as u64;
            assert_eq!(count, itemset.count);
        }
    }
}

#[test]
fn rule_measures_are_consistent() {
    let set = TransactionSet::from_items(random_transactions(3));
    let report = mine_transactions(&set, &config(0.05, 0.1)).unwrap();
    let supports: HashMap<Vec<Item>, f64> = report
        .itemsets
        .iter()
        .map(|s| (s.items.clone(), s.support))
        .collect();

    assert!(!report.rules.is_empty());
    for rule in &report.rules {
        assert!((0.0..=1.0).contains(&rule.support));
        assert!((0.0..=1.0).contains(&rule.confidence));
        assert!(rule.confidence >= 0.1);
        let antecedent = supports[&rule.antecedent];
        assert!((rule.confidence - rule.support / antecedent).abs() < 1e-9);
    }

    // Output order does not depend on input order.
    let mut reversed = random_transactions(3);
    reversed.reverse();
    let again = mine_transactions(&TransactionSet::from_items(reversed), &config(0.05, 0.1)).unwrap();
    assert_eq!(report, again);
}
