use mimalloc::MiMalloc;
use pyo3::prelude::*;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod closure;
mod error;
mod matrix;
mod mine;
mod setmine;
mod store;
mod tree;
mod treemine;

#[cfg(test)]
mod tests;

pub use error::MineError;
pub use matrix::{IncidenceMatrix, ItemOrder, MinSupport};
pub use mine::{
    build_tree, mine, mine_closed, mine_frequent, mine_from_tree, mine_maximal, Engine,
    ItemsetRow, ItemsetTable, MineMode, MineOptions,
};
pub use tree::FPTree;

#[pymodule]
fn _freqmine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(mine::mine_from_dense, m)?)?;
    m.add_function(wrap_pyfunction!(mine::mine_from_csr, m)?)?;
    Ok(())
}
