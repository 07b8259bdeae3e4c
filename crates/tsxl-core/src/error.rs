//! Error types for tsxl-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the workbook model
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u16),

    /// Sheet index past the last sheet
    #[error("No sheet at index {0} (workbook has {1})")]
    SheetOutOfBounds(usize, usize),

    /// Invalid sheet name
    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: &'static str },

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid defined name
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Defined name already present in the same scope
    #[error("Name already defined: {0}")]
    DuplicateName(String),

    /// Worksheet table problem (duplicate name, overlap)
    #[error("Invalid table '{name}': {reason}")]
    InvalidTable { name: String, reason: String },

    /// Value outside an accepted range
    #[error("{what} must be between {min} and {max} (got {value})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}
