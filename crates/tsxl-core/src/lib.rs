//! # tsxl-core
//!
//! In-memory workbook model used by the tsxl Excel commands.
//!
//! - [`CellValue`] - Cell contents (numbers, strings, booleans, errors, formulas)
//! - [`CellAddress`], [`CellRange`] and [`AreaReference`] - A1-style addressing
//! - [`Style`] - Cell formatting (fonts, fills, borders, number formats)
//! - [`ConditionalFormatRule`] - Native Excel conditional formatting
//! - [`DefinedName`] and [`WorksheetTable`] - Named areas
//! - [`SheetView`] - Freeze panes, zoom and gridlines
//! - [`Workbook`], [`Worksheet`] - The document structures
//!
//! ## Example
//!
//! ```rust
//! use tsxl_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Flow").unwrap();
//! sheet.set_cell_value("A2", 12.5).unwrap();
//! sheet.set_cell_value_at(2, 0, CellValue::Boolean(true)).unwrap();
//!
//! assert_eq!(sheet.used_range().unwrap().to_a1_string(), "A1:A3");
//! ```

pub mod cell;
pub mod conditional_format;
pub mod date;
pub mod error;
pub mod named_range;
pub mod style;
pub mod table;
pub mod view;
pub mod workbook;
pub mod worksheet;

pub use cell::{AreaReference, CellAddress, CellData, CellError, CellRange, CellValue};
pub use conditional_format::{CfOperator, CfRuleType, ConditionalFormatRule};
pub use date::{datetime_to_serial, serial_to_datetime};
pub use error::{Error, Result};
pub use named_range::{DefinedName, DefinedNames, NameScope};
pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, Style, StylePool, VerticalAlignment,
};
pub use table::WorksheetTable;
pub use view::{FreezePane, SheetView};
pub use workbook::{Workbook, WorkbookSettings};
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
