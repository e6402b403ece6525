use rayon::prelude::*;

use crate::closure::{closure_of, BitSet};
use crate::matrix::PrunedView;
use crate::mine::MineMode;
use crate::store::ResultStore;

/// One viable extension at the current search node: a local item, its
/// tidset intersected with the branch prefix, and the resulting support.
struct Candidate {
    local: u32,
    tids: BitSet,
    count: u64,
}

/// Depth-first tidset miner over a support-ascending pruned view.
///
/// Local ids double as canonical ranks; each branch extends only with
/// higher-ranked candidates, so every itemset is reached through exactly one
/// item order. The modes share this traversal and differ in how a candidate
/// is recorded and which extensions survive into the next equivalence class.
/// Closed mining on item-rich/transaction-poor data switches to a
/// closure-keyed recursion instead (see `grow_transposed`).
pub(crate) struct SetMiner<'a> {
    view: &'a PrunedView,
    store: &'a ResultStore,
    min_count: u64,
    max_len: Option<usize>,
    mode: MineMode,
}

pub(crate) fn mine_sets(
    view: &PrunedView,
    store: &ResultStore,
    min_count: u64,
    max_len: Option<usize>,
    mode: MineMode,
    transposed: bool,
) {
    let n = view.tidsets.len();
    if n == 0 {
        return;
    }
    let miner = SetMiner { view, store, min_count, max_len, mode };

    if mode == MineMode::Closed && transposed {
        // Each top-level item seeds one closure chain.
        (0..n).into_par_iter().for_each(|i| {
            let count = view.tidsets[i].count_ones();
            let probe = view.to_original(&[i as u32]);
            if store.has_closed_superset(&probe, count) {
                return;
            }
            let closed = closure_of(view, &view.tidsets[i]);
            miner.grow_transposed(closed, view.tidsets[i].clone(), count);
        });
        return;
    }

    let root: Vec<Candidate> = (0..n)
        .map(|i| Candidate {
            local: i as u32,
            tids: view.tidsets[i].clone(),
            count: view.supports[i],
        })
        .collect();
    // Each top-level item is an independent unit of work.
    (0..n).into_par_iter().for_each(|i| miner.extend_at(&[], &root, i));
}

impl<'a> SetMiner<'a> {
    #[inline]
    fn len_ok(&self, len: usize) -> bool {
        self.max_len.map_or(true, |ml| len <= ml)
    }

    #[inline]
    fn may_grow(&self, len: usize) -> bool {
        self.max_len.map_or(true, |ml| len < ml)
    }

    /// Extend `prefix` by `class[at]` and recurse over the surviving
    /// equivalence class.
    fn extend_at(&self, prefix: &[u32], class: &[Candidate], at: usize) {
        let cand = &class[at];
        let tail = &class[at + 1..];

        match self.mode {
            MineMode::Frequent => {
                let mut itemset = prefix.to_vec();
                itemset.push(cand.local);
                if !self.len_ok(itemset.len()) {
                    return;
                }
                self.store.insert(self.view.to_original(&itemset), cand.count);
                if self.may_grow(itemset.len()) {
                    let (next, _) = self.intersect_tail(cand, tail, false);
                    for i in 0..next.len() {
                        self.extend_at(&itemset, &next, i);
                    }
                }
            }
            MineMode::Closed => {
                if !self.passes_ppc(prefix, cand) {
                    return;
                }
                // Candidates sharing the branch tidset fold straight into
                // the itemset; together with the prefix-preserving check
                // this makes the recorded set the full closure.
                let (next, folded) = self.intersect_tail(cand, tail, true);
                let mut closed = prefix.to_vec();
                closed.push(cand.local);
                closed.extend(folded);
                if !self.len_ok(closed.len()) {
                    return;
                }
                self.store.insert_closed(self.view.to_original(&closed), cand.count);
                if self.may_grow(closed.len()) {
                    for i in 0..next.len() {
                        self.extend_at(&closed, &next, i);
                    }
                }
            }
            MineMode::Maximal => {
                let (next, folded) = self.intersect_tail(cand, tail, true);
                let mut candidate = prefix.to_vec();
                candidate.push(cand.local);
                candidate.extend(folded);
                if !self.len_ok(candidate.len()) {
                    return;
                }
                // A candidate is recorded only when no deeper extension
                // stayed frequent; the final filter pass removes the
                // candidates another branch grew past.
                if next.is_empty() || !self.may_grow(candidate.len()) {
                    self.store.insert(self.view.to_original(&candidate), cand.count);
                } else {
                    for i in 0..next.len() {
                        self.extend_at(&candidate, &next, i);
                    }
                }
            }
        }
    }

    /// Closure-keyed recursion for transposed-shape data: `closed` is a
    /// closed itemset (sorted local ids) with tidset `tids`. Every frequent
    /// extension outside the closure leads to a strictly larger closure, so
    /// the chain terminates; the store probe skips any closure another chain
    /// already recorded, before the closure itself is computed. Branches
    /// reaching the same closure recurse over identical extension sets,
    /// which is what makes the skip lossless.
    fn grow_transposed(&self, closed: Vec<u32>, tids: BitSet, count: u64) {
        if !self.len_ok(closed.len()) {
            return;
        }
        self.store.insert_closed(self.view.to_original(&closed), count);
        if !self.may_grow(closed.len()) {
            return;
        }

        let mut scratch = BitSet { blocks: vec![0; tids.blocks.len()] };
        for e in 0..self.view.tidsets.len() as u32 {
            if closed.binary_search(&e).is_ok() {
                continue;
            }
            let c = tids.intersect_into(&self.view.tidsets[e as usize], &mut scratch);
            if c < self.min_count {
                continue;
            }
            let mut probe = closed.clone();
            probe.push(e);
            if self.store.has_closed_superset(&self.view.to_original(&probe), c) {
                continue;
            }
            let mut sub_tids = BitSet { blocks: vec![0; tids.blocks.len()] };
            std::mem::swap(&mut scratch, &mut sub_tids);
            let sub_closed = closure_of(self.view, &sub_tids);
            self.grow_transposed(sub_closed, sub_tids, c);
        }
    }

    /// Prefix-preserving-closure check: if the branch tidset is covered by
    /// an earlier-ranked item outside the prefix, this closed set belongs to
    /// that item's branch and is skipped here.
    fn passes_ppc(&self, prefix: &[u32], cand: &Candidate) -> bool {
        let mut in_prefix = vec![false; cand.local as usize];
        for &p in prefix {
            if p < cand.local {
                in_prefix[p as usize] = true;
            }
        }
        for j in 0..cand.local {
            if !in_prefix[j as usize] && cand.tids.is_subset_of(&self.view.tidsets[j as usize]) {
                return false;
            }
        }
        true
    }

    /// Intersect the branch tidset with every later candidate. Extensions
    /// keeping min_count survive into the next class; with `fold` set,
    /// extensions preserving the branch support are returned separately:
    /// they occur in exactly the same rows, so they join the itemset
    /// wholesale and their search branch collapses.
    fn intersect_tail(
        &self,
        cand: &Candidate,
        tail: &[Candidate],
        fold: bool,
    ) -> (Vec<Candidate>, Vec<u32>) {
        let mut next = Vec::with_capacity(tail.len());
        let mut folded = Vec::new();
        let mut scratch = BitSet { blocks: vec![0; cand.tids.blocks.len()] };
        for later in tail {
            let c = cand.tids.intersect_into(&later.tids, &mut scratch);
            if c < self.min_count {
                continue;
            }
            if fold && c == cand.count {
                folded.push(later.local);
            } else {
                let mut fresh = BitSet { blocks: vec![0; cand.tids.blocks.len()] };
                std::mem::swap(&mut scratch, &mut fresh);
                next.push(Candidate { local: later.local, tids: fresh, count: c });
            }
        }
        (next, folded)
    }
}
