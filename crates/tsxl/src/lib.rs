//! # tsxl
//!
//! Excel workbook commands for a time-series command processor.
//!
//! Commands are written one per line in a command file, as
//! `Name(Parameter="value",...)`. They move data between Excel workbooks and
//! the processor's in-memory [`DataTable`]s and [`TimeSeries`], and style the
//! cells they write.
//!
//! ## Features
//!
//! - Read a worksheet area (address, named range, Excel table or used range)
//!   into a table, with date detection and column typing
//! - Write tables, named-range cells and time series to worksheets
//! - Style cells from a style table, conditionally or as native Excel rules
//! - Freeze panes, zoom and gridlines
//! - Keep workbooks open across commands through a shared registry
//!
//! ## Example
//!
//! ```rust
//! use tsxl::prelude::*;
//!
//! let mut processor = CommandProcessor::new(ProcessorConfig::default());
//! let summary = processor.run_script(
//!     r#"SetProperty(PropertyName="Start",PropertyValue="2020-01-01")
//! NewPatternTimeSeries(Alias="Demo",NewTSID="Gage.Src.Flow.Day",SetStart="${Start}",SetEnd="2020-01-10",PatternValues="1,2")
//! "#,
//! );
//! assert_eq!(summary.severity(), Severity::Success);
//! assert_eq!(processor.time_series()[0].len(), 10);
//! ```

pub mod area;
pub mod coerce;
pub mod command;
pub mod datetime;
pub mod error;
pub mod pattern;
pub mod prelude;
pub mod processor;
pub mod registry;
pub mod styles;
pub mod table;
pub mod timeseries;

pub use area::{ExcelArea, ExcelColumnNames, ResolvedArea};
pub use command::{
    create_command, Command, CommandParameters, CommandStatus, Severity, COMMAND_NAMES,
};
pub use datetime::{DateTimePrecision, DateTimeValue};
pub use error::{CommandError, Result};
pub use processor::{CommandProcessor, ProcessorConfig, RunSummary};
pub use registry::{OpenMode, WorkbookRegistry};
pub use styles::{Condition, ConditionTable, StyleTable};
pub use table::delimited::{DelimitedReader, DelimitedWriter};
pub use table::{DataTable, FieldType, TableField, TableValue};
pub use timeseries::{TimeInterval, TimeSeries, TsIdent};

pub use tsxl_core::{Workbook, Worksheet};
