//! Error types for the command library

use std::path::PathBuf;

use thiserror::Error;

/// Result type for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors raised while parsing, checking or running commands
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] tsxl_core::Error),

    #[error(transparent)]
    Xlsx(#[from] tsxl_xlsx::XlsxError),

    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed command text
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Parameter check failed; one message per problem
    #[error("Invalid parameters: {}", .0.join("; "))]
    InvalidParameters(Vec<String>),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("No time series match: {0}")]
    TimeSeriesNotFound(String),

    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),

    /// Named range or table that does not exist in the workbook
    #[error("Area not found: {0}")]
    AreaNotFound(String),

    #[error("Workbook is not open: {}", .0.display())]
    NotOpen(PathBuf),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Value that cannot be interpreted as requested
    #[error("Invalid value '{value}': {reason}")]
    InvalidValue { value: String, reason: String },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl CommandError {
    pub fn other<S: Into<String>>(msg: S) -> Self {
        CommandError::Other(msg.into())
    }

    pub(crate) fn invalid_value(value: impl Into<String>, reason: impl Into<String>) -> Self {
        CommandError::InvalidValue {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
