use std::collections::BTreeMap;

use serde::Serialize;

use crate::position::Position;

/// Day column plus the grid slot an entry's top edge falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CollisionKey {
    pub day_index: usize,
    pub slot_bucket: i64,
}

impl CollisionKey {
    pub fn of(position: &Position, slot_height: f64) -> Self {
        Self {
            day_index: position.day_index,
            slot_bucket: (position.top / slot_height).floor() as i64,
        }
    }
}

/// Buckets item indices by `key_fn`. Indices inside a bucket keep input
/// order.
pub fn group_by_collision_key<T, K, F>(items: &[T], key_fn: F) -> BTreeMap<K, Vec<usize>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (idx, item) in items.iter().enumerate() {
        groups.entry(key_fn(item)).or_default().push(idx);
    }
    groups
}

/// Only the buckets that hold two or more items.
pub fn collision_groups<T, K, F>(items: &[T], key_fn: F) -> BTreeMap<K, Vec<usize>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut groups = group_by_collision_key(items, key_fn);
    groups.retain(|_, members| members.len() > 1);
    groups
}
