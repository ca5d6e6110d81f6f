use std::hash::Hash;

use indexmap::IndexMap;

/// Pick the `k` keys with the highest count.
///
/// - Sorts by count descending
/// - Equal counts keep ascending `first_seen` order (stable on ties)
///
/// Input is `(key, count, first_seen)`.
/// Complexity: O(n log n)
pub fn top_k_by_count<K: Clone, S: Ord>(entries: &[(K, u64, S)], k: usize) -> Vec<K> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        entries[b].1
            .cmp(&entries[a].1)
            .then_with(|| entries[a].2.cmp(&entries[b].2))
    });
    order.into_iter()
        .take(k)
        .map(|i| entries[i].0.clone())
        .collect()
}

/// Most common element, ties go to the one that appeared first.
///
/// # Returns
/// * `None` - if `items` is empty
pub fn stable_mode<T, I>(items: I) -> Option<T>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    // IndexMap keeps first-occurrence order, so the first max wins
    let mut counts: IndexMap<T, u64> = IndexMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    let mut best: Option<(T, u64)> = None;
    for (item, count) in counts {
        let replace = best.as_ref().map_or(true, |(_, best_count)| count > *best_count);
        if replace {
            best = Some((item, count));
        }
    }
    best.map(|(item, _)| item)
}
