use std::collections::BTreeSet;

use crate::ItemId;

/// Outcome of comparing one fetch against the accumulated seen set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Detection {
    /// `current - previous`, sorted by identifier.
    pub new_items: BTreeSet<ItemId>,
    /// `previous ∪ current`.
    pub updated_seen: BTreeSet<ItemId>,
}

impl Detection {
    pub fn has_new_items(&self) -> bool {
        !self.new_items.is_empty()
    }
}

/// Pure set-difference change detection.
///
/// Items that drop out of a listing stay in the seen set, so a listing that
/// reappears later is not reported again.
pub fn detect(previous_seen: &BTreeSet<ItemId>, current_fetched: &BTreeSet<ItemId>) -> Detection {
    let new_items = current_fetched
        .difference(previous_seen)
        .cloned()
        .collect();
    let updated_seen = previous_seen.union(current_fetched).cloned().collect();
    Detection {
        new_items,
        updated_seen,
    }
}
