// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural diff over ordered, identity-keyed collections.
//!
//! Identity decides whether an item was created, deleted or survived;
//! `equals` decides whether a surviving item changed. Equality here is deep
//! structural equality on persisted fields; object identity plays no role.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// An item present in both collections with different values
#[derive(Debug, Clone, PartialEq)]
pub struct Changed<T> {
    /// Value from the old collection
    pub old: T,
    /// Value from the new collection
    pub new: T,
}

/// Structural delta between two ordered collections
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult<T> {
    /// Items whose identity is only in the new collection, in new order
    pub created: Vec<T>,
    /// Items whose identity is only in the old collection, in old order
    pub deleted: Vec<T>,
    /// Items in both collections that fail `equals`, in new order
    pub changed: Vec<Changed<T>>,
    /// Items in both collections that pass `equals`, in new order
    pub unchanged: Vec<T>,
}

impl<T> Default for DiffResult<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            deleted: Vec::new(),
            changed: Vec::new(),
            unchanged: Vec::new(),
        }
    }
}

impl<T> DiffResult<T> {
    /// Whether the two collections were identical
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }
}

/// Classify two ordered collections into created, deleted, changed and
/// unchanged buckets.
///
/// `diff(x, x, ..)` always yields empty created/deleted/changed buckets with
/// every item unchanged. When a collection holds duplicate identities, the
/// first occurrence wins; the validator reports duplicates separately.
pub fn diff<T, K, I, E>(old: &[T], new: &[T], identity: I, equals: E) -> DiffResult<T>
where
    T: Clone,
    K: Eq + Hash,
    I: Fn(&T) -> K,
    E: Fn(&T, &T) -> bool,
{
    let old_by_id: HashMap<K, &T> = old.iter().rev().map(|item| (identity(item), item)).collect();
    let new_ids: HashSet<K> = new.iter().map(&identity).collect();

    let mut result = DiffResult::default();

    for item in new {
        match old_by_id.get(&identity(item)) {
            Some(old_item) if equals(old_item, item) => result.unchanged.push(item.clone()),
            Some(old_item) => result.changed.push(Changed {
                old: (*old_item).clone(),
                new: item.clone(),
            }),
            None => result.created.push(item.clone()),
        }
    }

    for item in old {
        if !new_ids.contains(&identity(item)) {
            result.deleted.push(item.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_first(pair: &(u32, &'static str)) -> u32 {
        pair.0
    }

    #[test]
    fn test_diff_self_is_all_unchanged() {
        let items = vec![(1, "a"), (2, "b"), (3, "c")];
        let result = diff(&items, &items, by_first, PartialEq::eq);
        assert!(result.is_empty());
        assert_eq!(result.unchanged, items);
    }

    #[test]
    fn test_created_deleted_changed_buckets() {
        let old = vec![(1, "a"), (2, "b"), (3, "c")];
        let new = vec![(4, "d"), (2, "b"), (3, "C")];
        let result = diff(&old, &new, by_first, PartialEq::eq);
        assert_eq!(result.created, vec![(4, "d")]);
        assert_eq!(result.deleted, vec![(1, "a")]);
        assert_eq!(
            result.changed,
            vec![Changed {
                old: (3, "c"),
                new: (3, "C"),
            }]
        );
        assert_eq!(result.unchanged, vec![(2, "b")]);
    }

    #[test]
    fn test_bucket_order_follows_source_collections() {
        let old = vec![(1, "a"), (2, "b"), (3, "c"), (4, "d")];
        let new = vec![(6, "f"), (4, "D"), (5, "e"), (2, "B")];
        let result = diff(&old, &new, by_first, PartialEq::eq);
        // created and changed follow new order
        assert_eq!(result.created, vec![(6, "f"), (5, "e")]);
        assert_eq!(
            result.changed.iter().map(|c| c.new.0).collect::<Vec<_>>(),
            vec![4, 2]
        );
        // deleted follows old order
        assert_eq!(result.deleted, vec![(1, "a"), (3, "c")]);
    }

    #[test]
    fn test_roundtrip_law() {
        // Applying the buckets of diff(old, new) to old reconstructs new's
        // membership and values (order aside, which identity keys pin down).
        let old = vec![(1, "a"), (2, "b"), (3, "c")];
        let new = vec![(2, "B"), (3, "c"), (4, "d")];
        let result = diff(&old, &new, by_first, PartialEq::eq);

        let mut reconstructed: Vec<(u32, &str)> = old
            .iter()
            .filter(|item| !result.deleted.contains(*item))
            .map(|item| {
                result
                    .changed
                    .iter()
                    .find(|c| c.old == *item)
                    .map_or(*item, |c| c.new)
            })
            .collect();
        reconstructed.extend(result.created.iter().copied());

        fn sorted(mut v: Vec<(u32, &'static str)>) -> Vec<(u32, &'static str)> {
            v.sort_unstable();
            v
        }
        assert_eq!(sorted(reconstructed), sorted(new));
    }
}
