//! Cell-related types
//!
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangle of cells (e.g., "A1:B10")
//! - [`AreaReference`] - A range qualified by a sheet name
//! - [`CellData`] - Value plus style index

mod address;
mod value;

pub use address::{AreaReference, CellAddress, CellRange, CellRangeIterator};
pub use value::{CellData, CellError, CellValue};
