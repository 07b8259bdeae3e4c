//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellData, CellRange, CellValue};
use crate::conditional_format::ConditionalFormatRule;
use crate::error::{Error, Result};
use crate::style::{Style, StylePool};
use crate::table::WorksheetTable;
use crate::view::{FreezePane, SheetView};
use crate::{MAX_COLS, MAX_ROWS};

static EMPTY: CellValue = CellValue::Empty;

/// A single sheet of a workbook
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    /// Sparse cells keyed by (row, col); iteration is row-major
    cells: BTreeMap<(u32, u16), CellData>,
    styles: StylePool,
    column_widths: BTreeMap<u16, f64>,
    merged: Vec<CellRange>,
    conditional_formats: Vec<ConditionalFormatRule>,
    tables: Vec<WorksheetTable>,
    view: SheetView,
    visible: bool,
}

impl Worksheet {
    /// Create an empty worksheet
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            styles: StylePool::new(),
            column_widths: BTreeMap::new(),
            merged: Vec::new(),
            conditional_formats: Vec::new(),
            tables: Vec::new(),
            view: SheetView::default(),
            visible: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renaming goes through [`crate::Workbook::rename_worksheet`] so names stay unique
    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    // === Cell Access ===

    fn check_bounds(row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
        }
        Ok(())
    }

    /// Stored cell at (row, col)
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(&(row, col))
    }

    /// Value by A1 address
    pub fn get_value(&self, address: &str) -> Result<&CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Value at (row, col); empty when no cell is stored
    pub fn get_value_at(&self, row: u32, col: u16) -> &CellValue {
        self.cells.get(&(row, col)).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    /// Set a value by A1 address
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a value at (row, col), keeping the cell's style
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        Self::check_bounds(row, col)?;
        let value = value.into();
        match self.cells.get_mut(&(row, col)) {
            Some(cell) => {
                cell.value = value;
                if cell.value.is_empty() && cell.style_index == 0 {
                    self.cells.remove(&(row, col));
                }
            }
            None if value.is_empty() => {}
            None => {
                self.cells.insert((row, col), CellData::new(value));
            }
        }
        Ok(())
    }

    /// Set a formula by A1 address (a leading `=` is added if missing)
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        self.set_cell_value(address, CellValue::formula(formula))
    }

    /// Remove value and style
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(&(row, col));
    }

    // === Styles ===

    /// Style of the cell at (row, col); the default style when none is set
    pub fn cell_style_at(&self, row: u32, col: u16) -> &Style {
        let idx = self.cells.get(&(row, col)).map_or(0, |c| c.style_index);
        self.styles
            .get(idx)
            .or_else(|| self.styles.get(0))
            .unwrap_or_else(|| default_style())
    }

    /// Style by pool index
    pub fn style_by_index(&self, index: u32) -> Option<&Style> {
        self.styles.get(index)
    }

    pub fn styles(&self) -> &StylePool {
        &self.styles
    }

    /// Set the style of a cell, creating an empty styled cell when needed
    pub fn set_cell_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        Self::check_bounds(row, col)?;
        let idx = self.styles.get_or_insert(style);
        match self.cells.get_mut(&(row, col)) {
            Some(cell) => {
                cell.style_index = idx;
                if idx == 0 && cell.value.is_empty() {
                    self.cells.remove(&(row, col));
                }
            }
            None if idx == 0 => {}
            None => {
                self.cells.insert(
                    (row, col),
                    CellData {
                        value: CellValue::Empty,
                        style_index: idx,
                    },
                );
            }
        }
        Ok(())
    }

    /// Set the style of a cell by A1 address
    pub fn set_cell_style(&mut self, address: &str, style: &Style) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_style_at(addr.row, addr.col, style)
    }

    // === Ranges ===

    /// Smallest range containing every cell with a value
    ///
    /// Style-only cells do not extend the used range.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut bounds: Option<(u32, u16, u32, u16)> = None;
        for (&(row, col), cell) in &self.cells {
            if cell.value.is_empty() {
                continue;
            }
            bounds = Some(match bounds {
                None => (row, col, row, col),
                Some((r1, c1, r2, c2)) => (r1.min(row), c1.min(col), r2.max(row), c2.max(col)),
            });
        }
        bounds.map(|(r1, c1, r2, c2)| CellRange::from_indices(r1, c1, r2, c2))
    }

    /// Cells with a value or style, row-major
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells.iter().map(|(&(r, c), data)| (r, c, data))
    }

    /// Stored cells inside `range`, row-major
    pub fn cells_in(&self, range: &CellRange) -> impl Iterator<Item = (u32, u16, &CellData)> {
        let range = *range;
        self.cells
            .range((range.start.row, 0)..=(range.end.row, u16::MAX))
            .filter(move |((_, c), _)| *c >= range.start.col && *c <= range.end.col)
            .map(|(&(r, c), data)| (r, c, data))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // === Columns ===

    /// Column width in characters, when set
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) -> Result<()> {
        Self::check_bounds(0, col)?;
        if !(0.0..=255.0).contains(&width) {
            return Err(Error::OutOfRange {
                what: "column width",
                value: width as i64,
                min: 0,
                max: 255,
            });
        }
        self.column_widths.insert(col, width);
        Ok(())
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(&c, &w)| (c, w))
    }

    // === Merged Cells ===

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged
    }

    /// Merge a range; fails when it overlaps an existing merge
    pub fn merge_cells(&mut self, range: &CellRange) -> Result<()> {
        if let Some(existing) = self.merged.iter().find(|m| m.overlaps(range)) {
            return Err(Error::InvalidRange(format!(
                "{} overlaps merged region {}",
                range, existing
            )));
        }
        self.merged.push(*range);
        Ok(())
    }

    // === Conditional Formatting ===

    /// Add a rule; a zero priority is replaced by the next free priority
    pub fn add_conditional_format(&mut self, mut rule: ConditionalFormatRule) {
        if rule.priority == 0 {
            rule.priority = self
                .conditional_formats
                .iter()
                .map(|r| r.priority)
                .max()
                .unwrap_or(0)
                + 1;
        }
        self.conditional_formats.push(rule);
    }

    pub fn conditional_formats(&self) -> &[ConditionalFormatRule] {
        &self.conditional_formats
    }

    // === Tables ===

    pub fn tables(&self) -> &[WorksheetTable] {
        &self.tables
    }

    /// Table on this sheet by name, ignoring case
    pub fn table(&self, name: &str) -> Option<&WorksheetTable> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Workbook-level uniqueness is checked by [`crate::Workbook::add_table`]
    pub(crate) fn push_table(&mut self, table: WorksheetTable) -> Result<()> {
        if let Some(other) = self.tables.iter().find(|t| t.area.overlaps(&table.area)) {
            return Err(Error::InvalidTable {
                name: table.name,
                reason: format!("overlaps table '{}'", other.name),
            });
        }
        self.tables.push(table);
        Ok(())
    }

    // === View ===

    pub fn view(&self) -> &SheetView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut SheetView {
        &mut self.view
    }

    pub fn freeze_pane(&self) -> Option<&FreezePane> {
        self.view.freeze.as_ref()
    }

    /// Freeze `cols` columns and `rows` rows (zero for both unfreezes)
    pub fn set_freeze_panes(&mut self, cols: u16, rows: u32) -> Result<()> {
        Self::check_bounds(rows, cols)?;
        self.view.set_freeze(cols, rows);
        Ok(())
    }
}

fn default_style() -> &'static Style {
    static DEFAULT: std::sync::OnceLock<Style> = std::sync::OnceLock::new();
    DEFAULT.get_or_init(Style::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_values_and_used_range() {
        let mut sheet = Worksheet::new("Data");
        assert!(sheet.used_range().is_none());

        sheet.set_cell_value("B2", 1.0).unwrap();
        sheet.set_cell_value("D5", "x").unwrap();
        assert_eq!(sheet.used_range().unwrap().to_a1_string(), "B2:D5");
        assert_eq!(sheet.get_value("D5").unwrap().as_string(), Some("x"));
        assert!(sheet.get_value_at(0, 0).is_empty());

        sheet.set_cell_value("D5", CellValue::Empty).unwrap();
        assert_eq!(sheet.cell_count(), 1);
    }

    #[test]
    fn test_style_only_cells() {
        let mut sheet = Worksheet::new("Data");
        let red = Style::new().fill_color(Color::RED);
        sheet.set_cell_style("A1", &red).unwrap();
        sheet.set_cell_value("B2", 3.0).unwrap();

        assert_eq!(sheet.cell_style_at(0, 0), &red);
        assert_eq!(sheet.used_range().unwrap().to_a1_string(), "B2");

        sheet.set_cell_value("A1", 7.0).unwrap();
        assert_eq!(sheet.cell_style_at(0, 0), &red);

        sheet.set_cell_style_at(0, 0, &Style::default()).unwrap();
        assert!(sheet.cell_style_at(0, 0).is_default());
    }

    #[test]
    fn test_bounds() {
        let mut sheet = Worksheet::new("Data");
        assert!(sheet.set_cell_value_at(MAX_ROWS, 0, 1.0).is_err());
        assert!(sheet.set_cell_value_at(0, MAX_COLS, 1.0).is_err());
        assert!(sheet.set_column_width(0, 300.0).is_err());
    }

    #[test]
    fn test_cells_in_range() {
        let mut sheet = Worksheet::new("Data");
        for (r, c) in [(0, 0), (1, 1), (1, 3), (2, 1), (5, 1)] {
            sheet.set_cell_value_at(r, c, 1.0).unwrap();
        }
        let found: Vec<_> = sheet
            .cells_in(&CellRange::parse("B2:C3").unwrap())
            .map(|(r, c, _)| (r, c))
            .collect();
        assert_eq!(found, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_merge_overlap() {
        let mut sheet = Worksheet::new("Data");
        sheet.merge_cells(&CellRange::parse("A1:B2").unwrap()).unwrap();
        assert!(sheet.merge_cells(&CellRange::parse("B2:C3").unwrap()).is_err());
        assert!(sheet.merge_cells(&CellRange::parse("C1:D1").unwrap()).is_ok());
    }

    #[test]
    fn test_conditional_format_priorities() {
        let mut sheet = Worksheet::new("Data");
        sheet.add_conditional_format(ConditionalFormatRule::contains_blanks());
        sheet.add_conditional_format(ConditionalFormatRule::not_contains_blanks());
        let priorities: Vec<_> = sheet.conditional_formats().iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![1, 2]);
    }
}
