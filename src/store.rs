use ahash::AHashMap;
use parking_lot::Mutex;

use crate::matrix::is_subset_sorted;

/// Thread-safe accumulating map from itemset (canonically sorted original
/// column ids) to absolute support.
///
/// Each insert runs its dominance check, evictions and insertion as one
/// critical section; two branches can therefore never miss each other's
/// dominance and leave a non-closed itemset behind. The closed-mode
/// invariant held at all times: no stored itemset is a subset of another
/// stored itemset with the same support.
pub(crate) struct ResultStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    map: AHashMap<Vec<u32>, u64>,
    /// Equal-support buckets, maintained for dominance checks.
    by_count: AHashMap<u64, Vec<Vec<u32>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        ResultStore { inner: Mutex::new(Inner::default()) }
    }

    /// Record unconditionally (frequent mode, maximal-candidate mode).
    /// `itemset` must be sorted ascending.
    pub fn insert(&self, itemset: Vec<u32>, count: u64) {
        debug_assert!(itemset.windows(2).all(|w| w[0] < w[1]));
        self.inner.lock().map.insert(itemset, count);
    }

    /// Record under the closed-set dominance rule: rejected when an
    /// equal-support superset is already stored; evicts every equal-support
    /// subset on the way in. `itemset` must be sorted ascending.
    pub fn insert_closed(&self, itemset: Vec<u32>, count: u64) {
        debug_assert!(itemset.windows(2).all(|w| w[0] < w[1]));
        let inner = &mut *self.inner.lock();
        let Inner { map, by_count } = inner;
        let bucket = by_count.entry(count).or_default();
        if bucket.iter().any(|existing| is_subset_sorted(&itemset, existing)) {
            return;
        }
        bucket.retain(|existing| {
            if is_subset_sorted(existing, &itemset) {
                map.remove(existing);
                false
            } else {
                true
            }
        });
        bucket.push(itemset.clone());
        map.insert(itemset, count);
    }

    /// Membership probe used by the transposed closed miner: is some stored
    /// itemset with exactly this support a superset of `items`?
    pub fn has_closed_superset(&self, items: &[u32], count: u64) -> bool {
        let inner = self.inner.lock();
        inner
            .by_count
            .get(&count)
            .is_some_and(|bucket| bucket.iter().any(|existing| is_subset_sorted(items, existing)))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn into_pairs(self) -> Vec<(u64, Vec<u32>)> {
        self.inner
            .into_inner()
            .map
            .into_iter()
            .map(|(items, count)| (count, items))
            .collect()
    }

    /// Maximality filter pass: drop every candidate that is a proper subset
    /// of another candidate, leaving an antichain.
    pub fn into_maximal(self) -> Vec<(u64, Vec<u32>)> {
        let mut pairs = self.into_pairs();
        pairs.sort_unstable_by_key(|(_, items)| std::cmp::Reverse(items.len()));
        let mut kept: Vec<(u64, Vec<u32>)> = Vec::with_capacity(pairs.len());
        for (count, items) in pairs {
            let dominated = kept
                .iter()
                .any(|(_, k)| k.len() > items.len() && is_subset_sorted(&items, k));
            if !dominated {
                kept.push((count, items));
            }
        }
        kept
    }
}
