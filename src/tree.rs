use log::debug;
use rayon::prelude::*;

use crate::matrix::PrunedView;

/// Rows per construction chunk: enough chunks to keep the pool busy, with a
/// floor so per-chunk overhead stays amortized on small inputs.
const MIN_CHUNK_ROWS: usize = 512;

/// Compact FP-tree node – children are stored in a separate flat arena
/// so that nodes are small and cache-friendly.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FPNode {
    pub item: u32,
    pub count: u64,
    pub parent: u32,
    /// Range [children_start..children_end) into FPTree::children_arena
    pub children_start: u32,
    pub children_end: u32,
}

impl FPNode {
    #[inline(always)]
    fn new(item: u32, count: u64, parent: u32) -> Self {
        FPNode { item, count, parent, children_start: 0, children_end: 0 }
    }
}

/// Prefix-sharing tree over the frequent items of one pruned view.
///
/// Nodes live in an index arena; `item_nodes` is the header table mapping
/// each local item to every node carrying it, which lets the miners walk
/// parent chains without scanning the tree. `min_count` and `n_transactions`
/// record the threshold and matrix size the tree was built against.
pub struct FPTree {
    pub(crate) nodes: Vec<FPNode>,
    children_arena: Vec<(u32, u32)>,
    pub(crate) item_nodes: Vec<Vec<u32>>,
    /// local item id → original column.
    pub(crate) original_items: Vec<u32>,
    /// Suffix itemset (original columns) this conditional tree is rooted on.
    pub(crate) cond_items: Vec<u32>,
    /// Tracked incrementally: false once any node gets >1 child.
    single_path: bool,
    pub(crate) min_count: u64,
    pub(crate) n_transactions: usize,
    /// Item name table, present only on trees built through the public API.
    pub(crate) item_names: Vec<String>,
}

impl FPTree {
    pub(crate) fn new(
        num_items: usize,
        original_items: Vec<u32>,
        min_count: u64,
        n_transactions: usize,
    ) -> Self {
        let root = FPNode::new(u32::MAX, 0, 0);
        let mut nodes = Vec::with_capacity(256);
        nodes.push(root);
        FPTree {
            nodes,
            children_arena: Vec::with_capacity(256),
            item_nodes: vec![Vec::new(); num_items],
            original_items,
            cond_items: Vec::new(),
            single_path: true,
            min_count,
            n_transactions,
            item_names: Vec::new(),
        }
    }

    /// Minimum support count this tree was built with.
    pub fn min_count(&self) -> u64 {
        self.min_count
    }

    /// Transaction count of the matrix this tree was built from.
    pub fn n_transactions(&self) -> usize {
        self.n_transactions
    }

    #[inline(always)]
    pub(crate) fn is_path(&self) -> bool {
        self.single_path
    }

    /// Aggregate support of a local item, summed over its header entries.
    pub(crate) fn item_support(&self, local: u32) -> u64 {
        self.item_nodes[local as usize]
            .iter()
            .map(|&ni| self.nodes[ni as usize].count)
            .sum()
    }

    #[inline]
    fn find_child(&self, node_idx: u32, item: u32) -> Option<u32> {
        let node = &self.nodes[node_idx as usize];
        let start = node.children_start as usize;
        let end = node.children_end as usize;
        for i in start..end {
            let (k, v) = self.children_arena[i];
            if k == item {
                return Some(v);
            }
        }
        None
    }

    #[inline]
    fn add_child(&mut self, parent_idx: u32, item: u32, child_idx: u32) {
        let parent = &self.nodes[parent_idx as usize];
        let n_children = parent.children_end - parent.children_start;

        if n_children == 0 {
            // First child: point to end of arena
            let pos = self.children_arena.len() as u32;
            self.children_arena.push((item, child_idx));
            let parent = &mut self.nodes[parent_idx as usize];
            parent.children_start = pos;
            parent.children_end = pos + 1;
        } else if parent.children_end as usize == self.children_arena.len() {
            // Children are at the tail of the arena, just append
            self.children_arena.push((item, child_idx));
            self.nodes[parent_idx as usize].children_end += 1;
            self.single_path = false;
        } else {
            // Children are in the middle — relocate to end
            let old_start = parent.children_start as usize;
            let old_end = parent.children_end as usize;
            let new_start = self.children_arena.len() as u32;
            for i in old_start..old_end {
                self.children_arena.push(self.children_arena[i]);
            }
            self.children_arena.push((item, child_idx));
            let parent = &mut self.nodes[parent_idx as usize];
            parent.children_start = new_start;
            parent.children_end = new_start + (old_end - old_start) as u32 + 1;
            self.single_path = false;
        }
    }

    pub(crate) fn insert_itemset(&mut self, itemset: &[u32], count: u64) {
        self.nodes[0].count += count;
        if itemset.is_empty() {
            return;
        }
        let mut node_idx = 0u32;
        for &item in itemset {
            if let Some(child_idx) = self.find_child(node_idx, item) {
                self.nodes[child_idx as usize].count += count;
                node_idx = child_idx;
            } else {
                let new_idx = self.nodes.len() as u32;
                let new_node = FPNode::new(item, count, node_idx);
                self.nodes.push(new_node);
                self.add_child(node_idx, item, new_idx);
                self.item_nodes[item as usize].push(new_idx);
                node_idx = new_idx;
            }
        }
    }

    /// Build from a support-descending pruned view.
    ///
    /// Rows are split into chunks and inserted into thread-local trees (no
    /// synchronization during insertion; rayon workers claim chunks as they
    /// go idle), then the local trees are merged sequentially. Merging is
    /// commutative and associative, so chunk scheduling cannot affect the
    /// final tree.
    pub(crate) fn from_view(view: &PrunedView) -> FPTree {
        let num_items = view.original_items.len();
        let n_rows = view.rows.len();
        if n_rows == 0 {
            return FPTree::new(num_items, view.original_items.clone(), view.min_count, view.n_transactions);
        }

        let target_chunks = rayon::current_num_threads() * 4;
        let chunk = n_rows.div_ceil(target_chunks.max(1)).max(MIN_CHUNK_ROWS);

        let mut parts: Vec<FPTree> = view
            .rows
            .par_chunks(chunk)
            .map(|rows| {
                let mut tree = FPTree::new(
                    num_items,
                    view.original_items.clone(),
                    view.min_count,
                    view.n_transactions,
                );
                // Sort within the chunk so duplicate baskets insert once.
                let mut sorted: Vec<&Vec<u32>> = rows.iter().collect();
                sorted.sort_unstable();
                let mut i = 0;
                while i < sorted.len() {
                    let mut j = i + 1;
                    while j < sorted.len() && sorted[j] == sorted[i] {
                        j += 1;
                    }
                    tree.insert_itemset(sorted[i], (j - i) as u64);
                    i = j;
                }
                tree
            })
            .collect();

        let mut tree = parts.remove(0);
        for part in &parts {
            tree.merge(part);
        }
        debug!(
            "fp-tree built: {} nodes over {} items from {} rows ({} chunk(s))",
            tree.nodes.len(),
            num_items,
            n_rows,
            parts.len() + 1
        );
        tree
    }

    /// Merge another tree over the same item universe into this one:
    /// children are matched by item level by level, matched nodes sum their
    /// counts, unmatched subtrees are grafted wholesale (re-parented and
    /// registered into the header table).
    pub(crate) fn merge(&mut self, other: &FPTree) {
        debug_assert_eq!(self.original_items, other.original_items);
        self.nodes[0].count += other.nodes[0].count;
        let mut stack: Vec<(u32, u32)> = vec![(0, 0)];
        while let Some((sn, on)) = stack.pop() {
            let (cs, ce) = {
                let n = &other.nodes[on as usize];
                (n.children_start, n.children_end)
            };
            for ci in cs..ce {
                let (item, oc) = other.children_arena[ci as usize];
                if let Some(sc) = self.find_child(sn, item) {
                    self.nodes[sc as usize].count += other.nodes[oc as usize].count;
                    stack.push((sc, oc));
                } else {
                    self.graft(sn, other, oc);
                }
            }
        }
    }

    /// Copy the subtree rooted at `other[root]` under `parent`, remapping
    /// arena indices and registering every copied node in the header table.
    fn graft(&mut self, parent: u32, other: &FPTree, root: u32) {
        let onode = other.nodes[root as usize];
        let new_idx = self.nodes.len() as u32;
        self.nodes.push(FPNode::new(onode.item, onode.count, parent));
        self.add_child(parent, onode.item, new_idx);
        self.item_nodes[onode.item as usize].push(new_idx);
        for ci in onode.children_start..onode.children_end {
            let (_, oc) = other.children_arena[ci as usize];
            self.graft(new_idx, other, oc);
        }
    }

    /// Conditional tree for `item`: reconstruct every occurrence's prefix
    /// path through the parent chain, re-count items within those paths,
    /// drop the ones falling below `min_count`, and insert the filtered
    /// paths (weighted by the occurrence's count) into a fresh tree.
    pub(crate) fn conditional_tree(&self, item: u32, min_count: u64) -> FPTree {
        let node_indices = &self.item_nodes[item as usize];
        // Ancestors always carry a smaller local id than `item`.
        let mut counts = vec![0u64; item as usize];

        let mut branches: Vec<(Vec<u32>, u64)> = Vec::with_capacity(node_indices.len());
        let mut branch_buf = Vec::with_capacity(32);
        for &ni in node_indices {
            branch_buf.clear();
            let mut idx = self.nodes[ni as usize].parent;
            while self.nodes[idx as usize].item != u32::MAX {
                branch_buf.push(self.nodes[idx as usize].item);
                idx = self.nodes[idx as usize].parent;
            }
            branch_buf.reverse();
            let node_count = self.nodes[ni as usize].count;
            for &i in &branch_buf {
                counts[i as usize] += node_count;
            }
            branches.push((branch_buf.clone(), node_count));
        }

        let mut valid_items: Vec<(u32, u64)> = counts
            .into_iter()
            .enumerate()
            .filter(|&(_, c)| c >= min_count)
            .map(|(i, c)| (i as u32, c))
            .collect();
        valid_items.sort_unstable_by_key(|&(i, c)| (std::cmp::Reverse(c), i));

        let mut old_to_new = vec![u32::MAX; item as usize];
        let mut new_original_items = Vec::with_capacity(valid_items.len());
        for (new_id, &(old_id, _)) in valid_items.iter().enumerate() {
            old_to_new[old_id as usize] = new_id as u32;
            new_original_items.push(self.original_items[old_id as usize]);
        }

        let mut cond_tree =
            FPTree::new(valid_items.len(), new_original_items, min_count, self.n_transactions);
        cond_tree.cond_items = self.cond_items.clone();
        cond_tree.cond_items.push(self.original_items[item as usize]);

        let mut filtered = Vec::with_capacity(32);
        for (branch, branch_count) in branches {
            filtered.clear();
            for i in branch {
                let new_id = old_to_new[i as usize];
                if new_id != u32::MAX {
                    filtered.push(new_id);
                }
            }
            if filtered.is_empty() {
                continue;
            }
            filtered.sort_unstable();
            cond_tree.insert_itemset(&filtered, branch_count);
        }
        cond_tree
    }
}
