//! An editable batch with an always-current validation snapshot.

use std::collections::HashSet;

use crate::item::Item;
use crate::symbology::Symbology;
use crate::validate::{ValidationResult, validate_batch};

/// Status filter for [`Batch::filter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every item.
    #[default]
    All,
    /// Only items that passed validation.
    Valid,
    /// Only items that failed validation.
    Invalid,
}

/// Ordered items plus their validation results.
///
/// Every mutation revalidates, so result indices always match item
/// positions.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    items: Vec<Item>,
    results: Vec<ValidationResult>,
}

impl Batch {
    /// Build a batch from ingested items.
    pub fn new(items: Vec<Item>) -> Self {
        let mut batch = Self {
            items,
            results: Vec::new(),
        };
        batch.revalidate();
        batch
    }

    fn revalidate(&mut self) {
        self.results = validate_batch(&self.items);
    }

    /// The items, in print order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Validation results, one per item.
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items that passed validation.
    pub fn valid_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_valid).count()
    }

    /// Number of items that failed validation.
    pub fn invalid_count(&self) -> usize {
        self.results.len() - self.valid_count()
    }

    /// Append an item.
    pub fn push(&mut self, item: Item) {
        self.items.push(item);
        self.revalidate();
    }

    /// Replace the item at `index`. Returns `false` when out of range.
    pub fn edit(&mut self, index: usize, mut item: Item) -> bool {
        let Some(slot) = self.items.get_mut(index) else {
            return false;
        };
        item.quantity = item.quantity.max(1);
        *slot = item;
        self.revalidate();
        true
    }

    /// Remove and return the item at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Item> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.revalidate();
        Some(item)
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.results.clear();
    }

    /// Sort by data (stable).
    pub fn sort_by_data(&mut self) {
        self.items.sort_by(|a, b| a.data.cmp(&b.data));
        self.revalidate();
    }

    /// Sort by symbology, then by data (stable).
    pub fn sort_by_symbology(&mut self) {
        self.items
            .sort_by(|a, b| a.symbology.cmp(&b.symbology).then_with(|| a.data.cmp(&b.data)));
        self.revalidate();
    }

    /// Remove later items with the same (data, symbology) as an earlier one.
    /// Returns the number of items removed.
    pub fn remove_duplicates(&mut self) -> usize {
        let before = self.items.len();
        let mut seen: HashSet<(String, Symbology)> = HashSet::new();
        self.items
            .retain(|item| seen.insert((item.data.clone(), item.symbology)));
        let removed = before - self.items.len();
        if removed > 0 {
            self.revalidate();
        }
        removed
    }

    /// Results whose data contains `search` (case-insensitive) and that
    /// match `status`. An empty search matches everything.
    pub fn filter(&self, search: &str, status: StatusFilter) -> Vec<&ValidationResult> {
        let needle = search.trim().to_lowercase();
        self.results
            .iter()
            .filter(|r| needle.is_empty() || r.item.data.to_lowercase().contains(&needle))
            .filter(|r| match status {
                StatusFilter::All => true,
                StatusFilter::Valid => r.is_valid,
                StatusFilter::Invalid => !r.is_valid,
            })
            .collect()
    }
}
