//! # tsxl-xlsx
//!
//! XLSX (Office Open XML) reader and writer for the tsxl workbook model.
//!
//! Reading keeps what the Excel commands work with: cell values and cached
//! formula results, styles, defined names, worksheet tables, conditional
//! formatting, column widths and sheet views. Writing produces a package
//! Excel opens without repair prompts.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
