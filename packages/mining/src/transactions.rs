//! Turning facts into item transactions.

use std::collections::BTreeSet;

use crash_warehouse_mining_models::Item;
use crash_warehouse_models::{Attribute, DimensionValue, Warehouse};

/// Maps items to dense ids.
///
/// Ids are assigned in item order, so comparing ids compares items and
/// sorted id lists are sorted itemsets.
#[derive(Debug, Clone, Default)]
pub struct Itemizer {
    items: Vec<Item>,
}

impl Itemizer {
    fn new(items: BTreeSet<Item>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn id_of(&self, item: &Item) -> Option<u32> {
        self.items
            .binary_search(item)
            .ok()
            .and_then(|i| u32::try_from(i).ok())
    }

    /// # Panics
    ///
    /// If `id` was not issued by this itemizer.
    #[must_use]
    pub fn item_of(&self, id: u32) -> &Item {
        &self.items[id as usize]
    }

    #[must_use]
    pub fn items_of(&self, ids: &[u32]) -> Vec<Item> {
        ids.iter().map(|&id| self.item_of(id).clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Transactions as sorted, deduplicated item id lists.
#[derive(Debug, Clone, Default)]
pub struct TransactionSet {
    pub itemizer: Itemizer,
    pub transactions: Vec<Vec<u32>>,
}

impl TransactionSet {
    /// Builds transactions from arbitrary item lists.
    pub fn from_items<T, I>(transactions: T) -> Self
    where
        T: IntoIterator<Item = I>,
        I: IntoIterator<Item = Item>,
    {
        let transactions: Vec<BTreeSet<Item>> = transactions
            .into_iter()
            .map(|items| items.into_iter().collect())
            .collect();
        let itemizer = Itemizer::new(transactions.iter().flatten().cloned().collect());
        let transactions = transactions
            .iter()
            .map(|items| {
                // BTreeSet iteration is already in item order.
                items.iter().filter_map(|item| itemizer.id_of(item)).collect()
            })
            .collect();
        Self {
            itemizer,
            transactions,
        }
    }

    /// Builds transactions from rows of attribute values, one value per
    /// attribute in `attributes`.
    pub fn from_rows<R>(attributes: &[Attribute], rows: R, include_unknown: bool) -> Self
    where
        R: IntoIterator<Item = Vec<DimensionValue>>,
    {
        Self::from_items(rows.into_iter().map(|row| {
            attributes
                .iter()
                .zip(row)
                .filter(|(_, value)| include_unknown || !value.is_unknown())
                .map(|(&attribute, value)| Item::new(attribute, value))
                .collect::<Vec<_>>()
        }))
    }

    /// One transaction per fact in the warehouse.
    #[must_use]
    pub fn from_warehouse(
        warehouse: &Warehouse,
        attributes: &[Attribute],
        include_unknown: bool,
    ) -> Self {
        Self::from_rows(
            attributes,
            warehouse.facts().iter().map(|fact| {
                attributes
                    .iter()
                    .map(|&attribute| warehouse.value_of(fact, attribute))
                    .collect()
            }),
            include_unknown,
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
