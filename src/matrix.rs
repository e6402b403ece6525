use ahash::AHashSet;
use log::debug;
use rayon::prelude::*;

use crate::closure::BitSet;
use crate::error::MineError;

/// Minimum support threshold, either an absolute transaction count or a
/// fraction of the total transaction count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MinSupport {
    Count(u64),
    Fraction(f64),
}

impl MinSupport {
    /// Convert to an absolute count, validating the range. Fractions convert
    /// via ceiling with a floor of one transaction.
    pub fn resolve(&self, n_transactions: usize) -> Result<u64, MineError> {
        match *self {
            MinSupport::Count(c) => {
                if c == 0 || c > n_transactions as u64 {
                    return Err(MineError::SupportCountRange { got: c, n_transactions });
                }
                Ok(c)
            }
            MinSupport::Fraction(f) => {
                if !(f > 0.0 && f <= 1.0) {
                    return Err(MineError::SupportFractionRange(f));
                }
                Ok(((f * n_transactions as f64).ceil() as u64).max(1))
            }
        }
    }
}

/// Column ordering of a [`PrunedView`]. Descending support maximizes prefix
/// sharing in FP-trees; ascending support is the canonical extension order
/// for the tidset miners. Ties break on the original column index so the
/// order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrder {
    SupportDescending,
    SupportAscending,
}

/// Sparse boolean transaction × item matrix with name tables.
///
/// Immutable after construction; every mining algorithm consumes it
/// read-only, so it is safe to share across threads without locking.
#[derive(Debug)]
pub struct IncidenceMatrix {
    indptr: Vec<usize>,
    indices: Vec<u32>,
    item_names: Vec<String>,
    txn_ids: Option<Vec<String>>,
}

impl IncidenceMatrix {
    /// Build from per-row column index lists. Rows must be sorted strictly
    /// ascending; the name table must match the column count and be unique.
    pub fn from_rows(
        rows: Vec<Vec<u32>>,
        item_names: Vec<String>,
        txn_ids: Option<Vec<String>>,
    ) -> Result<Self, MineError> {
        let n_cols = item_names.len();
        let mut seen = AHashSet::with_capacity(n_cols);
        for name in &item_names {
            if !seen.insert(name.as_str()) {
                return Err(MineError::DuplicateItemName(name.clone()));
            }
        }
        if let Some(ids) = &txn_ids {
            if ids.len() != rows.len() {
                return Err(MineError::TxnTableMismatch { ids: ids.len(), rows: rows.len() });
            }
        }

        let nnz = rows.iter().map(Vec::len).sum();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(nnz);
        indptr.push(0);
        for (r, row) in rows.iter().enumerate() {
            let mut prev: Option<u32> = None;
            for &col in row {
                if (col as usize) >= n_cols {
                    return Err(MineError::ColumnOutOfRange { row: r, col, columns: n_cols });
                }
                if prev.is_some_and(|p| p >= col) {
                    return Err(MineError::UnsortedRow { row: r });
                }
                prev = Some(col);
                indices.push(col);
            }
            indptr.push(indices.len());
        }

        Ok(IncidenceMatrix { indptr, indices, item_names, txn_ids })
    }

    /// Build from a row-major dense buffer (non-zero byte = item present).
    /// Columns without a supplied name are named by their index.
    pub fn from_dense(
        flat: &[u8],
        n_cols: usize,
        item_names: Option<Vec<String>>,
    ) -> Result<Self, MineError> {
        if n_cols == 0 {
            return Self::from_rows(vec![], default_names(0, item_names)?, None);
        }
        if flat.len() % n_cols != 0 {
            return Err(MineError::DenseShape { len: flat.len(), columns: n_cols });
        }
        let rows: Vec<Vec<u32>> = flat
            .par_chunks(n_cols)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &v)| v != 0)
                    .map(|(c, _)| c as u32)
                    .collect()
            })
            .collect();
        Self::from_rows(rows, default_names(n_cols, item_names)?, None)
    }

    /// Build from CSR `indptr`/`indices` arrays as handed over the Python
    /// boundary. Out-of-range columns are rejected; columns within a row are
    /// sorted and deduplicated.
    pub fn from_csr(indptr: &[i32], indices: &[i32], n_cols: usize) -> Result<Self, MineError> {
        let n_rows = indptr.len().saturating_sub(1);
        let mut rows = Vec::with_capacity(n_rows);
        for r in 0..n_rows {
            let (start, end) = (indptr[r], indptr[r + 1]);
            if start > end || start < 0 || end as usize > indices.len() {
                return Err(MineError::BadIndptr(r));
            }
            let mut row: Vec<u32> = Vec::with_capacity((end - start) as usize);
            for &col in &indices[start as usize..end as usize] {
                if col < 0 || col as usize >= n_cols {
                    return Err(MineError::ColumnOutOfRange {
                        row: r,
                        col: col.max(0) as u32,
                        columns: n_cols,
                    });
                }
                row.push(col as u32);
            }
            row.sort_unstable();
            row.dedup();
            rows.push(row);
        }
        Self::from_rows(rows, default_names(n_cols, None)?, None)
    }

    #[inline]
    pub fn n_transactions(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    #[inline]
    pub fn n_items(&self) -> usize {
        self.item_names.len()
    }

    pub fn item_names(&self) -> &[String] {
        &self.item_names
    }

    pub fn txn_ids(&self) -> Option<&[String]> {
        self.txn_ids.as_deref()
    }

    #[inline]
    pub(crate) fn row(&self, r: usize) -> &[u32] {
        &self.indices[self.indptr[r]..self.indptr[r + 1]]
    }

    /// Per-item support counts over the whole matrix.
    pub fn item_supports(&self) -> Vec<u64> {
        let n_cols = self.n_items();
        (0..self.n_transactions())
            .into_par_iter()
            .fold(
                || vec![0u64; n_cols],
                |mut acc, r| {
                    for &col in self.row(r) {
                        acc[col as usize] += 1;
                    }
                    acc
                },
            )
            .reduce(
                || vec![0u64; n_cols],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(b.iter()) {
                        *x += y;
                    }
                    a
                },
            )
    }

    /// Number of rows containing every column in `items`.
    pub fn support(&self, items: &[u32]) -> u64 {
        if items.is_empty() {
            return self.n_transactions() as u64;
        }
        let mut sorted = items.to_vec();
        sorted.sort_unstable();
        (0..self.n_transactions())
            .into_par_iter()
            .filter(|&r| is_subset_sorted(&sorted, self.row(r)))
            .count() as u64
    }

    /// Row indices containing `item`.
    pub fn tidset(&self, item: u32) -> Vec<u32> {
        (0..self.n_transactions())
            .filter(|&r| self.row(r).binary_search(&item).is_ok())
            .map(|r| r as u32)
            .collect()
    }

    /// Closure operator: every column true in all rows satisfying `items`.
    /// The input is always a subset of the result; an itemset is closed
    /// exactly when `closure` returns it unchanged.
    pub fn closure(&self, items: &[u32]) -> Vec<u32> {
        let mut sorted = items.to_vec();
        sorted.sort_unstable();
        let tids: Vec<usize> = (0..self.n_transactions())
            .filter(|&r| is_subset_sorted(&sorted, self.row(r)))
            .collect();
        if tids.is_empty() {
            return sorted;
        }
        let mut counts = vec![0usize; self.n_items()];
        for &r in &tids {
            for &col in self.row(r) {
                counts[col as usize] += 1;
            }
        }
        counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == tids.len())
            .map(|(col, _)| col as u32)
            .collect()
    }

    /// Derive the transient mining view: columns below `min_count` dropped,
    /// survivors reindexed in the requested support order, all-false rows
    /// dropped, plus one tidset per surviving column.
    pub(crate) fn prune(&self, min_count: u64, order: ItemOrder) -> PrunedView {
        let supports = self.item_supports();
        let mut frequent: Vec<(u32, u64)> = supports
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c >= min_count)
            .map(|(col, &c)| (col as u32, c))
            .collect();
        match order {
            ItemOrder::SupportDescending => {
                frequent.sort_unstable_by_key(|&(col, c)| (std::cmp::Reverse(c), col))
            }
            ItemOrder::SupportAscending => frequent.sort_unstable_by_key(|&(col, c)| (c, col)),
        }

        let mut global_to_local = vec![u32::MAX; self.n_items()];
        let mut original_items = Vec::with_capacity(frequent.len());
        let mut local_supports = Vec::with_capacity(frequent.len());
        for (local, &(col, c)) in frequent.iter().enumerate() {
            global_to_local[col as usize] = local as u32;
            original_items.push(col);
            local_supports.push(c);
        }

        let rows: Vec<Vec<u32>> = (0..self.n_transactions())
            .into_par_iter()
            .filter_map(|r| {
                let mut row: Vec<u32> = self
                    .row(r)
                    .iter()
                    .filter_map(|&col| {
                        let local = global_to_local[col as usize];
                        (local != u32::MAX).then_some(local)
                    })
                    .collect();
                if row.is_empty() {
                    return None;
                }
                row.sort_unstable();
                Some(row)
            })
            .collect();

        let mut tidsets = vec![BitSet::new(rows.len()); original_items.len()];
        for (r, row) in rows.iter().enumerate() {
            for &local in row {
                tidsets[local as usize].set(r);
            }
        }

        debug!(
            "pruned view: {} of {} items survive min_count={}, {} of {} rows non-empty",
            original_items.len(),
            self.n_items(),
            min_count,
            rows.len(),
            self.n_transactions()
        );

        PrunedView {
            min_count,
            n_transactions: self.n_transactions(),
            original_items,
            supports: local_supports,
            rows,
            tidsets,
        }
    }
}

fn default_names(n_cols: usize, names: Option<Vec<String>>) -> Result<Vec<String>, MineError> {
    match names {
        Some(names) => {
            if names.len() != n_cols {
                return Err(MineError::NameTableMismatch { names: names.len(), columns: n_cols });
            }
            Ok(names)
        }
        None => Ok((0..n_cols).map(|c| c.to_string()).collect()),
    }
}

/// Two-pointer subset test over sorted slices.
pub(crate) fn is_subset_sorted(needle: &[u32], haystack: &[u32]) -> bool {
    let mut h = haystack.iter();
    'outer: for &n in needle {
        for &x in h.by_ref() {
            if x == n {
                continue 'outer;
            }
            if x > n {
                return false;
            }
        }
        return false;
    }
    true
}

/// Transient mining artifact derived from one matrix + threshold: only the
/// frequent columns, reindexed in a total support order, over the non-empty
/// rows. Local column id == canonical rank.
pub(crate) struct PrunedView {
    pub min_count: u64,
    /// Original transaction count (denominator for relative support).
    pub n_transactions: usize,
    /// local id → original column.
    pub original_items: Vec<u32>,
    /// Support per local id.
    pub supports: Vec<u64>,
    /// Kept rows as sorted local id lists.
    pub rows: Vec<Vec<u32>>,
    /// Tidset per local id, over the kept rows.
    pub tidsets: Vec<BitSet>,
}

impl PrunedView {
    pub fn is_empty(&self) -> bool {
        self.original_items.is_empty()
    }

    /// Map local ids back to original columns, canonically sorted.
    pub fn to_original(&self, locals: &[u32]) -> Vec<u32> {
        let mut items: Vec<u32> =
            locals.iter().map(|&l| self.original_items[l as usize]).collect();
        items.sort_unstable();
        items
    }
}
