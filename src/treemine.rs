use rayon::prelude::*;

use crate::mine::MineMode;
use crate::store::ResultStore;
use crate::tree::FPTree;

const PAR_ITEMS_CUTOFF: usize = 4;

/// Recursive conditional-tree traversal. The traversal shape is identical
/// for all three modes; they differ only in when a candidate is recorded and
/// whether recording goes through the dominance check.
pub(crate) fn mine_tree(
    tree: &FPTree,
    min_count: u64,
    max_len: Option<usize>,
    mode: MineMode,
    store: &ResultStore,
) {
    let num_items = tree.original_items.len();
    let cond_len = tree.cond_items.len();
    if num_items == 0 || max_len.map_or(false, |ml| cond_len >= ml) {
        return;
    }

    if mode == MineMode::Frequent && tree.is_path() {
        mine_single_path(tree, min_count, max_len, store);
        return;
    }

    // Header items below min_count only occur when mining a pre-built tree
    // at a stricter threshold than it was built with.
    let item_trees: Vec<(u32, u64, FPTree)> = (0..num_items as u32)
        .rev()
        .filter_map(|local| {
            let support = tree.item_support(local);
            (support >= min_count).then(|| (local, support, tree.conditional_tree(local, min_count)))
        })
        .collect();

    let visit = |&(local, support, ref cond): &(u32, u64, FPTree)| {
        let mut itemset = tree.cond_items.clone();
        itemset.push(tree.original_items[local as usize]);
        itemset.sort_unstable();
        match mode {
            MineMode::Frequent => {
                store.insert(itemset, support);
                if !cond.original_items.is_empty() {
                    mine_tree(cond, min_count, max_len, mode, store);
                }
            }
            MineMode::Closed => {
                store.insert_closed(itemset, support);
                if !cond.original_items.is_empty() {
                    mine_tree(cond, min_count, max_len, mode, store);
                }
            }
            MineMode::Maximal => {
                // Record only at dead ends: a non-empty conditional header
                // means a frequent proper superset exists on this branch.
                let at_cap = max_len.map_or(false, |ml| itemset.len() >= ml);
                if cond.original_items.is_empty() || at_cap {
                    store.insert(itemset, support);
                } else {
                    mine_tree(cond, min_count, max_len, mode, store);
                }
            }
        }
    };

    if item_trees.len() >= PAR_ITEMS_CUTOFF {
        item_trees.par_iter().for_each(visit);
    } else {
        item_trees.iter().for_each(visit);
    }
}

/// A single-path tree carries no branching: every combination of its items,
/// appended to the suffix, is frequent with the support of its deepest
/// member. Only valid in frequent mode.
fn mine_single_path(tree: &FPTree, min_count: u64, max_len: Option<usize>, store: &ResultStore) {
    let cond_len = tree.cond_items.len();
    let local_ids: Vec<u32> = (0..tree.original_items.len() as u32)
        .filter(|&l| tree.item_support(l) >= min_count)
        .collect();
    let num_items = local_ids.len();

    let max_size_from_len = max_len.map_or(num_items + 1, |ml| ml.saturating_sub(cond_len) + 1);
    let size_remain = std::cmp::min(num_items + 1, max_size_from_len);
    for size in 1..size_remain {
        for combo in combinations(&local_ids, size) {
            let support = combo
                .iter()
                .map(|&local| tree.nodes[tree.item_nodes[local as usize][0] as usize].count)
                .min()
                .unwrap_or(0);
            let mut itemset = tree.cond_items.clone();
            itemset.extend(combo.iter().map(|&local| tree.original_items[local as usize]));
            itemset.sort_unstable();
            store.insert(itemset, support);
        }
    }
}

fn combinations<T: Copy>(items: &[T], size: usize) -> impl Iterator<Item = Vec<T>> + '_ {
    let n = items.len();
    let mut indices: Vec<usize> = (0..size).collect();
    let mut first = size > 0 && n >= size;

    std::iter::from_fn(move || {
        if size == 0 || n < size {
            return None;
        }
        if !first {
            let mut i = size as isize - 1;
            while i >= 0 {
                if indices[i as usize] < n - size + i as usize {
                    break;
                }
                i -= 1;
            }
            if i < 0 {
                return None;
            }
            let idx = i as usize;
            indices[idx] += 1;
            for j in (idx + 1)..size {
                indices[j] = indices[j - 1] + 1;
            }
        } else {
            first = false;
        }
        Some(indices.iter().map(|&i| items[i]).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_enumerate_exactly_once() {
        let items = [1u32, 2, 3, 4];
        let mut all: Vec<Vec<u32>> = combinations(&items, 2).collect();
        all.sort();
        assert_eq!(
            all,
            vec![
                vec![1, 2],
                vec![1, 3],
                vec![1, 4],
                vec![2, 3],
                vec![2, 4],
                vec![3, 4]
            ]
        );
        assert_eq!(combinations(&items, 0).count(), 0);
        assert_eq!(combinations(&items, 5).count(), 0);
        assert_eq!(combinations(&items, 4).count(), 1);
    }
}
