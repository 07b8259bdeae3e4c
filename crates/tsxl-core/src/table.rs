//! Worksheet tables (Excel "Format as Table" list objects)

use crate::cell::CellRange;
use crate::error::{Error, Result};

/// A table defined on a worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct WorksheetTable {
    /// Workbook-unique id; assigned when the table is added if 0
    pub id: u32,
    /// Name used in structured references
    pub name: String,
    pub display_name: String,
    /// Full area including header and totals rows
    pub area: CellRange,
    /// 0 or 1
    pub header_row_count: u32,
    /// 0 or 1
    pub totals_row_count: u32,
    /// Column names, one per column of `area`
    pub columns: Vec<String>,
    /// Table style, e.g. `TableStyleMedium2`
    pub style_name: Option<String>,
}

impl WorksheetTable {
    /// Table with a header row and generated column names
    pub fn new(name: impl Into<String>, area: CellRange) -> Self {
        let name = name.into();
        let columns = (1..=area.col_count()).map(|i| format!("Column{}", i)).collect();
        Self {
            id: 0,
            display_name: name.clone(),
            name,
            area,
            header_row_count: 1,
            totals_row_count: 0,
            columns,
            style_name: Some("TableStyleMedium2".into()),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Header row, if the table has one
    pub fn header_range(&self) -> Option<CellRange> {
        (self.header_row_count > 0).then(|| {
            CellRange::from_indices(
                self.area.start.row,
                self.area.start.col,
                self.area.start.row,
                self.area.end.col,
            )
        })
    }

    /// Rows between the header and totals rows; `None` for a table with no data rows
    pub fn data_range(&self) -> Option<CellRange> {
        let first = self.area.start.row + self.header_row_count;
        let last = self.area.end.row.checked_sub(self.totals_row_count)?;
        (first <= last).then(|| {
            CellRange::from_indices(first, self.area.start.col, last, self.area.end.col)
        })
    }

    /// Index of a column by name, ignoring case
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Structural checks done before the table is added to a sheet
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidTable {
            name: self.name.clone(),
            reason,
        };
        crate::named_range::validate_name(&self.name)
            .map_err(|e| invalid(e.to_string()))?;
        if self.columns.len() != self.area.col_count() as usize {
            return Err(invalid(format!(
                "{} column names for {} columns",
                self.columns.len(),
                self.area.col_count()
            )));
        }
        if self.header_row_count > 1 || self.totals_row_count > 1 {
            return Err(invalid("header and totals rows are 0 or 1".into()));
        }
        if self.area.row_count() < self.header_row_count + self.totals_row_count {
            return Err(invalid("area is too small".into()));
        }
        Ok(())
    }
}
