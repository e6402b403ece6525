use log::debug;
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::MineError;
use crate::matrix::{IncidenceMatrix, ItemOrder, MinSupport};
use crate::setmine;
use crate::store::ResultStore;
use crate::tree::FPTree;
use crate::treemine;

/// Which family of itemsets to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MineMode {
    Frequent,
    Closed,
    Maximal,
}

impl MineMode {
    pub(crate) fn parse(s: &str) -> Result<Self, MineError> {
        match s {
            "frequent" => Ok(MineMode::Frequent),
            "closed" => Ok(MineMode::Closed),
            "maximal" => Ok(MineMode::Maximal),
            other => Err(MineError::UnknownMode(other.to_string())),
        }
    }
}

/// Miner family. `Auto` picks the tidset family when items outnumber
/// transactions (the per-item tidsets are row-bounded and cheap there) and
/// the FP-tree family otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    #[default]
    Auto,
    FpTree,
    Tidset,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MineOptions {
    /// Cap on itemset length.
    pub max_len: Option<usize>,
    pub engine: Engine,
}

/// One result row: item names (ascending by original column), relative and
/// absolute support, and itemset length. Row order is unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsetRow {
    pub items: Vec<String>,
    pub support: f64,
    pub count: u64,
    pub len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ItemsetTable {
    pub rows: Vec<ItemsetRow>,
    pub n_transactions: usize,
}

impl ItemsetTable {
    fn from_pairs(pairs: Vec<(u64, Vec<u32>)>, names: &[String], n_transactions: usize) -> Self {
        let rows = pairs
            .into_iter()
            .map(|(count, items)| ItemsetRow {
                len: items.len(),
                support: count as f64 / n_transactions as f64,
                count,
                items: items.iter().map(|&c| names[c as usize].clone()).collect(),
            })
            .collect();
        ItemsetTable { rows, n_transactions }
    }
}

pub fn mine_frequent(
    matrix: &IncidenceMatrix,
    min_support: MinSupport,
) -> Result<ItemsetTable, MineError> {
    mine(matrix, MineMode::Frequent, min_support, MineOptions::default())
}

pub fn mine_closed(
    matrix: &IncidenceMatrix,
    min_support: MinSupport,
) -> Result<ItemsetTable, MineError> {
    mine(matrix, MineMode::Closed, min_support, MineOptions::default())
}

pub fn mine_maximal(
    matrix: &IncidenceMatrix,
    min_support: MinSupport,
) -> Result<ItemsetTable, MineError> {
    mine(matrix, MineMode::Maximal, min_support, MineOptions::default())
}

/// Generalized entry point. Configuration errors surface here, before any
/// mining begins; empty matrices yield an empty table.
pub fn mine(
    matrix: &IncidenceMatrix,
    mode: MineMode,
    min_support: MinSupport,
    options: MineOptions,
) -> Result<ItemsetTable, MineError> {
    if matrix.n_transactions() == 0 || matrix.n_items() == 0 {
        return Ok(ItemsetTable { rows: vec![], n_transactions: matrix.n_transactions() });
    }
    let min_count = min_support.resolve(matrix.n_transactions())?;
    let pairs = mine_counts(matrix, mode, min_count, options);
    Ok(ItemsetTable::from_pairs(pairs, matrix.item_names(), matrix.n_transactions()))
}

pub(crate) fn mine_counts(
    matrix: &IncidenceMatrix,
    mode: MineMode,
    min_count: u64,
    options: MineOptions,
) -> Vec<(u64, Vec<u32>)> {
    let engine = match options.engine {
        Engine::Auto => {
            if matrix.n_items() > matrix.n_transactions() {
                Engine::Tidset
            } else {
                Engine::FpTree
            }
        }
        e => e,
    };

    let store = ResultStore::new();
    match engine {
        Engine::FpTree | Engine::Auto => {
            let view = matrix.prune(min_count, ItemOrder::SupportDescending);
            if view.is_empty() {
                return vec![];
            }
            let tree = FPTree::from_view(&view);
            treemine::mine_tree(&tree, min_count, options.max_len, mode, &store);
        }
        Engine::Tidset => {
            let view = matrix.prune(min_count, ItemOrder::SupportAscending);
            if view.is_empty() {
                return vec![];
            }
            let transposed = view.original_items.len() > view.rows.len();
            setmine::mine_sets(&view, &store, min_count, options.max_len, mode, transposed);
        }
    }
    debug!("{:?} mining recorded {} itemsets at min_count={}", mode, store.len(), min_count);

    match mode {
        MineMode::Maximal => store.into_maximal(),
        _ => store.into_pairs(),
    }
}

/// Build an FP-tree once, for reuse across several mining calls at equal or
/// stricter thresholds.
pub fn build_tree(
    matrix: &IncidenceMatrix,
    min_support: MinSupport,
) -> Result<FPTree, MineError> {
    if matrix.n_transactions() == 0 || matrix.n_items() == 0 {
        let mut tree = FPTree::new(0, vec![], 1, matrix.n_transactions());
        tree.item_names = matrix.item_names().to_vec();
        return Ok(tree);
    }
    let min_count = min_support.resolve(matrix.n_transactions())?;
    let view = matrix.prune(min_count, ItemOrder::SupportDescending);
    let mut tree = FPTree::from_view(&view);
    tree.item_names = matrix.item_names().to_vec();
    Ok(tree)
}

/// Mine a pre-built tree. The tree must have been built at a threshold no
/// stricter than the requested one.
pub fn mine_from_tree(
    tree: &FPTree,
    mode: MineMode,
    min_support: MinSupport,
    max_len: Option<usize>,
) -> Result<ItemsetTable, MineError> {
    if tree.n_transactions() == 0 {
        return Ok(ItemsetTable { rows: vec![], n_transactions: 0 });
    }
    let min_count = min_support.resolve(tree.n_transactions())?;
    if min_count < tree.min_count() {
        return Err(MineError::TreeThreshold { tree: tree.min_count(), requested: min_count });
    }
    let store = ResultStore::new();
    treemine::mine_tree(tree, min_count, max_len, mode, &store);
    let pairs = match mode {
        MineMode::Maximal => store.into_maximal(),
        _ => store.into_pairs(),
    };
    Ok(ItemsetTable::from_pairs(pairs, &tree.item_names, tree.n_transactions()))
}

fn flatten_pairs(results: Vec<(u64, Vec<u32>)>) -> (Vec<u64>, Vec<u32>, Vec<u32>) {
    let mut supports = Vec::with_capacity(results.len());
    let mut offsets = Vec::with_capacity(results.len() + 1);

    let total_items: usize = results.iter().map(|(_, items)| items.len()).sum();
    let mut all_items = Vec::with_capacity(total_items);

    offsets.push(0);
    for (support, mut items) in results {
        supports.push(support);
        all_items.append(&mut items);
        offsets.push(all_items.len() as u32);
    }

    (supports, offsets, all_items)
}

type FlatTriple<'py> =
    (Bound<'py, PyArray1<u64>>, Bound<'py, PyArray1<u32>>, Bound<'py, PyArray1<u32>>);

fn empty_triple(py: Python<'_>) -> FlatTriple<'_> {
    (
        Vec::<u64>::new().into_pyarray(py),
        Vec::<u32>::new().into_pyarray(py),
        Vec::<u32>::new().into_pyarray(py),
    )
}

#[pyfunction]
#[pyo3(signature = (data, mode, min_count, max_len=None))]
pub fn mine_from_dense<'py>(
    py: Python<'py>,
    data: PyReadonlyArray2<'py, u8>,
    mode: &str,
    min_count: u64,
    max_len: Option<usize>,
) -> PyResult<FlatTriple<'py>> {
    let mode = MineMode::parse(mode)?;
    let arr = data.as_array();
    let (n_rows, n_cols) = (arr.nrows(), arr.ncols());
    if n_rows == 0 || n_cols == 0 {
        return Ok(empty_triple(py));
    }
    let flat: &[u8] = arr
        .as_slice()
        .ok_or_else(|| PyValueError::new_err("dense input must be C-contiguous"))?;

    let matrix = IncidenceMatrix::from_dense(flat, n_cols, None)?;
    let min_count = MinSupport::Count(min_count).resolve(n_rows)?;
    let pairs = mine_counts(&matrix, mode, min_count, MineOptions { max_len, engine: Engine::Auto });
    let (supports, offsets, items) = flatten_pairs(pairs);

    Ok((
        supports.into_pyarray(py),
        offsets.into_pyarray(py),
        items.into_pyarray(py),
    ))
}

#[pyfunction]
#[pyo3(signature = (indptr, indices, n_cols, mode, min_count, max_len=None))]
pub fn mine_from_csr<'py>(
    py: Python<'py>,
    indptr: PyReadonlyArray1<'py, i32>,
    indices: PyReadonlyArray1<'py, i32>,
    n_cols: usize,
    mode: &str,
    min_count: u64,
    max_len: Option<usize>,
) -> PyResult<FlatTriple<'py>> {
    let mode = MineMode::parse(mode)?;
    let ip = indptr.as_slice()?;
    let ix = indices.as_slice()?;
    if ip.len() < 2 || n_cols == 0 {
        return Ok(empty_triple(py));
    }

    let matrix = IncidenceMatrix::from_csr(ip, ix, n_cols)?;
    let min_count = MinSupport::Count(min_count).resolve(matrix.n_transactions())?;
    let pairs = mine_counts(&matrix, mode, min_count, MineOptions { max_len, engine: Engine::Auto });
    let (supports, offsets, items) = flatten_pairs(pairs);

    Ok((
        supports.into_pyarray(py),
        offsets.into_pyarray(py),
        items.into_pyarray(py),
    ))
}
