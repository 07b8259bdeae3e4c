//! Where a command's data lives in a workbook

use std::fmt;
use std::str::FromStr;

use tsxl_core::{CellRange, CellValue, Workbook, Worksheet, WorksheetTable};

use crate::error::{CommandError, Result};

/// Area named by the `ExcelAddress`, `ExcelNamedRange` or `ExcelTableName`
/// parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ExcelArea {
    Address(CellRange),
    NamedRange(String),
    Table(String),
    /// Nothing given: the sheet's used range
    UsedRange,
}

impl ExcelArea {
    /// Build from the three area parameters; at most one may be set
    pub fn from_parameters(
        address: Option<&str>,
        named_range: Option<&str>,
        table: Option<&str>,
    ) -> Result<Self> {
        let given = [address, named_range, table]
            .iter()
            .filter(|p| p.is_some_and(|v| !v.trim().is_empty()))
            .count();
        if given > 1 {
            return Err(CommandError::other(
                "only one of ExcelAddress, ExcelNamedRange and ExcelTableName can be specified",
            ));
        }
        fn non_empty(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }
        if let Some(a) = non_empty(address) {
            return Ok(ExcelArea::Address(CellRange::parse(a)?));
        }
        if let Some(n) = non_empty(named_range) {
            return Ok(ExcelArea::NamedRange(n.to_string()));
        }
        if let Some(t) = non_empty(table) {
            return Ok(ExcelArea::Table(t.to_string()));
        }
        Ok(ExcelArea::UsedRange)
    }
}

impl fmt::Display for ExcelArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcelArea::Address(r) => write!(f, "address {}", r),
            ExcelArea::NamedRange(n) => write!(f, "named range '{}'", n),
            ExcelArea::Table(t) => write!(f, "table '{}'", t),
            ExcelArea::UsedRange => f.write_str("used range"),
        }
    }
}

/// An area located in a workbook
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArea {
    pub sheet_index: usize,
    /// `None` when the area is the used range of an empty sheet
    pub range: Option<CellRange>,
    /// The Excel table, when the area was given as one
    pub table: Option<WorksheetTable>,
}

/// Sheet index by name (ignoring case); the first sheet when no name is given
pub fn sheet_index(workbook: &Workbook, worksheet: Option<&str>) -> Result<usize> {
    match worksheet.map(str::trim).filter(|w| !w.is_empty()) {
        Some(name) => workbook
            .sheet_index(name)
            .ok_or_else(|| CommandError::WorksheetNotFound(name.to_string())),
        None if workbook.is_empty() => Err(CommandError::other("workbook has no worksheets")),
        None => Ok(0),
    }
}

/// Sheet index by name, adding the sheet when it does not exist
///
/// Without a name the first sheet is used, and a workbook with no sheets
/// gets `Sheet1`.
pub fn sheet_index_or_create(workbook: &mut Workbook, worksheet: Option<&str>) -> Result<usize> {
    match worksheet.map(str::trim).filter(|w| !w.is_empty()) {
        Some(name) => match workbook.sheet_index(name) {
            Some(i) => Ok(i),
            None => {
                log::info!("adding worksheet '{}'", name);
                Ok(workbook.add_worksheet_with_name(name)?)
            }
        },
        None if workbook.is_empty() => Ok(workbook.add_worksheet()?),
        None => Ok(0),
    }
}

/// Locate `area` in `workbook`
///
/// A named range whose formula names a sheet uses that sheet instead of
/// `worksheet`; a table always resolves to the sheet it is on. Resolved
/// ranges never carry `$` flags.
pub fn resolve(workbook: &Workbook, worksheet: Option<&str>, area: &ExcelArea) -> Result<ResolvedArea> {
    match area {
        ExcelArea::Address(range) => Ok(ResolvedArea {
            sheet_index: sheet_index(workbook, worksheet)?,
            range: Some(range.to_relative()),
            table: None,
        }),
        ExcelArea::NamedRange(name) => {
            let current = worksheet.and_then(|w| workbook.sheet_index(w));
            let defined = workbook
                .named_range(name, current)
                .ok_or_else(|| CommandError::AreaNotFound(format!("named range '{}'", name)))?;
            let reference = defined.area().map_err(|_| {
                CommandError::AreaNotFound(format!(
                    "named range '{}' does not refer to a cell area ({})",
                    name, defined.refers_to
                ))
            })?;
            let sheet_index = match &reference.sheet {
                Some(sheet) => workbook
                    .sheet_index(sheet)
                    .ok_or_else(|| CommandError::WorksheetNotFound(sheet.clone()))?,
                None => sheet_index(workbook, worksheet)?,
            };
            Ok(ResolvedArea {
                sheet_index,
                range: Some(reference.range.to_relative()),
                table: None,
            })
        }
        ExcelArea::Table(name) => {
            let (sheet_index, table) = workbook
                .table_by_name(name)
                .ok_or_else(|| CommandError::AreaNotFound(format!("table '{}'", name)))?;
            Ok(ResolvedArea {
                sheet_index,
                range: Some(table.area.to_relative()),
                table: Some(table.clone()),
            })
        }
        ExcelArea::UsedRange => {
            let sheet_index = sheet_index(workbook, worksheet)?;
            let range = workbook
                .worksheet(sheet_index)
                .and_then(Worksheet::used_range);
            Ok(ResolvedArea {
                sheet_index,
                range,
                table: None,
            })
        }
    }
}

/// Where column names come from (`ExcelColumnNames`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExcelColumnNames {
    /// Generated `Column1..N`
    None,
    #[default]
    FirstRowInRange,
    RowBeforeRange,
}

impl ExcelColumnNames {
    pub const NAMES: &'static [&'static str] = &["None", "FirstRowInRange", "RowBeforeRange"];
}

impl fmt::Display for ExcelColumnNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExcelColumnNames::None => "None",
            ExcelColumnNames::FirstRowInRange => "FirstRowInRange",
            ExcelColumnNames::RowBeforeRange => "RowBeforeRange",
        })
    }
}

impl FromStr for ExcelColumnNames {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        Self::NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(s.trim()))
            .map(|i| match i {
                0 => ExcelColumnNames::None,
                1 => ExcelColumnNames::FirstRowInRange,
                _ => ExcelColumnNames::RowBeforeRange,
            })
            .ok_or_else(|| CommandError::invalid_value(s, "expected None, FirstRowInRange or RowBeforeRange"))
    }
}

fn header_text(value: &CellValue) -> String {
    value.effective_value().to_string().trim().to_string()
}

/// Column names for `range` and the part of it that holds data
///
/// Blank header cells fall back to `ColumnN`. The data range is `None` when
/// the header is the only row.
pub fn column_names(
    sheet: &Worksheet,
    range: &CellRange,
    mode: ExcelColumnNames,
) -> Result<(Vec<String>, Option<CellRange>)> {
    let cols = range.start.col..=range.end.col;
    let names_from_row = |row: u32| -> Vec<String> {
        cols.clone()
            .enumerate()
            .map(|(i, col)| match header_text(sheet.get_value_at(row, col)) {
                s if s.is_empty() => format!("Column{}", i + 1),
                s => s,
            })
            .collect()
    };
    match mode {
        ExcelColumnNames::None => Ok((
            (1..=range.col_count()).map(|i| format!("Column{}", i)).collect(),
            Some(*range),
        )),
        ExcelColumnNames::FirstRowInRange => {
            let names = names_from_row(range.start.row);
            let data = (range.end.row > range.start.row).then(|| {
                CellRange::from_indices(range.start.row + 1, range.start.col, range.end.row, range.end.col)
            });
            Ok((names, data))
        }
        ExcelColumnNames::RowBeforeRange => {
            if range.start.row == 0 {
                return Err(CommandError::other(format!(
                    "range {} starts on the first row, so there is no row before it for column names",
                    range
                )));
            }
            Ok((names_from_row(range.start.row - 1), Some(*range)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        let sheet = wb.worksheet_mut(1).unwrap();
        sheet.set_cell_value("B2", "Date").unwrap();
        sheet.set_cell_value("D2", "Flow").unwrap();
        sheet.set_cell_value("B3", 1.0).unwrap();
        sheet.set_cell_value("D4", 2.0).unwrap();
        wb.define_name("FlowData", "Data!$B$2:$D$4").unwrap();
        wb.define_name("Bad", "#REF!").unwrap();
        wb.add_table(1, WorksheetTable::new("Flows", CellRange::parse("B2:D4").unwrap()))
            .unwrap();
        wb
    }

    #[test]
    fn test_area_parameters_are_exclusive() {
        assert!(ExcelArea::from_parameters(Some("A1"), Some("X"), None).is_err());
        assert_eq!(
            ExcelArea::from_parameters(None, Some(" "), None).unwrap(),
            ExcelArea::UsedRange
        );
        assert_eq!(
            ExcelArea::from_parameters(None, None, Some("T")).unwrap(),
            ExcelArea::Table("T".into())
        );
        assert!(ExcelArea::from_parameters(Some("A1:"), None, None).is_err());
    }

    #[test]
    fn test_resolve_named_range_uses_its_sheet() {
        let wb = workbook();
        let area = resolve(&wb, Some("Sheet1"), &ExcelArea::NamedRange("flowdata".into())).unwrap();
        assert_eq!(area.sheet_index, 1);
        assert_eq!(area.range.unwrap().to_a1_string(), "B2:D4");
        assert_eq!(area.range, Some(CellRange::parse("B2:D4").unwrap()));
        assert!(resolve(&wb, None, &ExcelArea::NamedRange("Nope".into())).is_err());
        assert!(resolve(&wb, None, &ExcelArea::NamedRange("Bad".into())).is_err());
    }

    #[test]
    fn test_resolve_drops_absolute_flags() {
        let wb = workbook();
        let absolute = ExcelArea::Address(CellRange::parse("$A$1:B$2").unwrap());
        let area = resolve(&wb, None, &absolute).unwrap();
        assert_eq!(area.range, Some(CellRange::parse("A1:B2").unwrap()));
    }

    #[test]
    fn test_resolve_table_and_used_range() {
        let wb = workbook();
        let area = resolve(&wb, None, &ExcelArea::Table("FLOWS".into())).unwrap();
        assert_eq!(area.sheet_index, 1);
        assert!(area.table.is_some());

        let used = resolve(&wb, Some("data"), &ExcelArea::UsedRange).unwrap();
        assert_eq!(used.range.unwrap().to_a1_string(), "B2:D4");
        let empty = resolve(&wb, None, &ExcelArea::UsedRange).unwrap();
        assert_eq!(empty.range, None);
        assert!(matches!(
            resolve(&wb, Some("Missing"), &ExcelArea::UsedRange),
            Err(CommandError::WorksheetNotFound(_))
        ));
    }

    #[test]
    fn test_column_names() {
        let wb = workbook();
        let sheet = wb.worksheet(1).unwrap();
        let range = CellRange::parse("B2:D4").unwrap();

        let (names, data) = column_names(sheet, &range, ExcelColumnNames::FirstRowInRange).unwrap();
        assert_eq!(names, vec!["Date", "Column2", "Flow"]);
        assert_eq!(data.unwrap().to_a1_string(), "B3:D4");

        let (names, data) = column_names(sheet, &range, ExcelColumnNames::None).unwrap();
        assert_eq!(names, vec!["Column1", "Column2", "Column3"]);
        assert_eq!(data, Some(range));

        let lower = CellRange::parse("B3:D4").unwrap();
        let (names, _) = column_names(sheet, &lower, ExcelColumnNames::RowBeforeRange).unwrap();
        assert_eq!(names[2], "Flow");
        let top = CellRange::parse("A1:B2").unwrap();
        assert!(column_names(sheet, &top, ExcelColumnNames::RowBeforeRange).is_err());
    }

    #[test]
    fn test_sheet_or_create() {
        let mut wb = Workbook::empty();
        assert_eq!(sheet_index_or_create(&mut wb, None).unwrap(), 0);
        assert_eq!(sheet_index_or_create(&mut wb, Some("Out")).unwrap(), 1);
        assert_eq!(sheet_index_or_create(&mut wb, Some("out")).unwrap(), 1);
    }
}
