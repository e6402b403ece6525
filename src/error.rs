use pyo3::exceptions::PyValueError;
use pyo3::PyErr;
use thiserror::Error;

/// Errors reported before any mining begins.
///
/// Configuration errors cover caller-supplied thresholds; structural errors
/// cover malformed matrix input. Mining over valid inputs never fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MineError {
    #[error("minimum support fraction {0} is out of range (0, 1]")]
    SupportFractionRange(f64),

    #[error("minimum support count {got} is out of range [1, {n_transactions}]")]
    SupportCountRange { got: u64, n_transactions: usize },

    #[error(
        "tree was built at minimum support {tree} but {requested} was requested; \
         a pre-built tree can only serve thresholds at or above its own"
    )]
    TreeThreshold { tree: u64, requested: u64 },

    #[error("item name table has {names} entries but the matrix has {columns} columns")]
    NameTableMismatch { names: usize, columns: usize },

    #[error("duplicate item name {0:?}")]
    DuplicateItemName(String),

    #[error("transaction id table has {ids} entries but the matrix has {rows} rows")]
    TxnTableMismatch { ids: usize, rows: usize },

    #[error("row {row}: column index {col} is out of range (matrix has {columns} columns)")]
    ColumnOutOfRange { row: usize, col: u32, columns: usize },

    #[error("row {row} is not sorted strictly ascending")]
    UnsortedRow { row: usize },

    #[error("dense buffer of length {len} does not divide into rows of {columns} columns")]
    DenseShape { len: usize, columns: usize },

    #[error("indptr is not monotonically non-decreasing at position {0}")]
    BadIndptr(usize),

    #[error("unknown mining mode {0:?}; expected \"frequent\", \"closed\" or \"maximal\"")]
    UnknownMode(String),
}

impl From<MineError> for PyErr {
    fn from(err: MineError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
