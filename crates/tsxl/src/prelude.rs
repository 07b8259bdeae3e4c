//! Common imports for tsxl users
//!
//! ```rust
//! use tsxl::prelude::*;
//! ```

pub use crate::{
    create_command,
    Command,
    CommandError,
    CommandParameters,
    CommandProcessor,
    CommandStatus,
    DataTable,
    DateTimeValue,
    ExcelArea,
    FieldType,
    OpenMode,
    ProcessorConfig,
    Result,
    RunSummary,
    Severity,
    TableField,
    TableValue,
    TimeSeries,
    Workbook,
    WorkbookRegistry,
    Worksheet,
};
