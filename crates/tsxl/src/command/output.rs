//! Helpers shared by the commands that write cells

use tsxl_core::{
    AreaReference, CellAddress, CellRange, DefinedName, NameScope, Style, Workbook, Worksheet,
};

use crate::area::{self, ExcelArea};
use crate::coerce::value_to_cell;
use crate::command::{Args, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::styles::{ConditionTable, StyleTable};
use crate::table::TableValue;

/// Styles from `StyleTableID` plus the conditions from `ConditionTableID`
#[derive(Debug, Default)]
pub(crate) struct CellStyler {
    styles: StyleTable,
    conditions: Option<ConditionTable>,
}

impl CellStyler {
    /// Build from the processor's tables; `None` when neither is named
    pub(crate) fn from_args(args: &Args<'_>, processor: &CommandProcessor) -> Result<Option<Self>> {
        let style_id = args.get("StyleTableID");
        let condition_id = args.get("ConditionTableID");
        let styles = match &style_id {
            Some(id) => StyleTable::from_table(processor.require_table(id)?)?,
            None if condition_id.is_some() => {
                return Err(CommandError::other("ConditionTableID requires StyleTableID"))
            }
            None => return Ok(None),
        };
        let conditions = condition_id
            .map(|id| ConditionTable::from_table(processor.require_table(&id)?, &styles))
            .transpose()?;
        Ok(Some(Self { styles, conditions }))
    }

    pub(crate) fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// Style the conditions give a value in `column`
    pub(crate) fn style_for(&self, column: &str, value: &TableValue) -> Option<&Style> {
        self.conditions
            .as_ref()?
            .style_for(column, value, &self.styles)
    }
}

/// Check that a condition table comes with a style table
pub(crate) fn check_style_tables(check: &mut ParameterCheck<'_>) {
    if check.args().get("ConditionTableID").is_some() && check.args().get("StyleTableID").is_none() {
        check.problem("ConditionTableID requires StyleTableID");
    }
}

/// Where a write starts on a sheet
pub(crate) struct Origin {
    pub sheet_index: usize,
    pub cell: CellAddress,
    /// Rows available when the area had a fixed size
    pub rows: Option<u32>,
}

/// Find the sheet and first cell for an output area, adding the sheet when
/// the area does not name one
pub(crate) fn output_origin(
    workbook: &mut Workbook,
    worksheet: Option<&str>,
    area: &ExcelArea,
) -> Result<Origin> {
    match area {
        ExcelArea::Address(range) => Ok(Origin {
            sheet_index: area::sheet_index_or_create(workbook, worksheet)?,
            cell: CellAddress::new(range.start.row, range.start.col),
            // A single cell only marks where to start
            rows: (range.row_count() > 1 || range.col_count() > 1).then(|| range.row_count()),
        }),
        ExcelArea::UsedRange => Ok(Origin {
            sheet_index: area::sheet_index_or_create(workbook, worksheet)?,
            cell: CellAddress::new(0, 0),
            rows: None,
        }),
        ExcelArea::NamedRange(_) | ExcelArea::Table(_) => {
            let resolved = area::resolve(workbook, worksheet, area)?;
            let range = resolved
                .range
                .ok_or_else(|| CommandError::AreaNotFound(area.to_string()))?;
            Ok(Origin {
                sheet_index: resolved.sheet_index,
                cell: CellAddress::new(range.start.row, range.start.col),
                rows: Some(range.row_count()),
            })
        }
    }
}

/// Write a table value into a cell
///
/// The cell keeps its existing style; a date-time or fixed-precision number
/// replaces the number format and `overlay` is merged on top.
pub(crate) fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &TableValue,
    precision: Option<usize>,
    date_1904: bool,
    overlay: Option<&Style>,
) -> Result<()> {
    let (cell, format) = value_to_cell(value, precision, date_1904);
    sheet.set_cell_value_at(row, col, cell)?;

    let mut style = sheet.cell_style_at(row, col).clone();
    if let Some(format) = format {
        style.number_format = format;
    }
    if let Some(overlay) = overlay {
        style = style.merged_with(overlay);
    }
    if &style != sheet.cell_style_at(row, col) {
        sheet.set_cell_style_at(row, col, &style)?;
    }
    Ok(())
}

/// Define (or redefine) a workbook name over `range` on a sheet
pub(crate) fn define_range_name(
    workbook: &mut Workbook,
    sheet_index: usize,
    name: &str,
    range: CellRange,
) -> Result<()> {
    let sheet_name = workbook
        .worksheet(sheet_index)
        .map(|s| s.name().to_string())
        .ok_or_else(|| CommandError::other("worksheet for named range is missing"))?;
    if workbook.table_by_name(name).is_some() {
        return Err(CommandError::other(format!(
            "cannot define name {}: an Excel table has that name",
            name
        )));
    }
    let area = AreaReference::new(sheet_name, range);
    log::debug!("defining name {} = {}", name, area.to_formula_string());
    workbook
        .names_mut()
        .define_or_replace(DefinedName::for_area(name, &area, NameScope::Workbook))?;
    Ok(())
}

/// Apply `ColumnWidths` pairs (`Column:width`, `Default:width`)
///
/// `columns` maps written column names to worksheet column indexes.
pub(crate) fn apply_column_widths(
    sheet: &mut Worksheet,
    widths: &[(String, String)],
    columns: &[(String, u16)],
) -> Result<()> {
    let parse = |name: &str, w: &str| -> Result<f64> {
        w.parse::<f64>()
            .map_err(|_| CommandError::invalid_value(w, format!("width for {} is not a number", name)))
    };
    if let Some((_, w)) = widths.iter().find(|(n, _)| n.eq_ignore_ascii_case("Default")) {
        let width = parse("Default", w)?;
        for (_, col) in columns {
            sheet.set_column_width(*col, width)?;
        }
    }
    for (name, w) in widths.iter().filter(|(n, _)| !n.eq_ignore_ascii_case("Default")) {
        let col = columns
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(name))
            .map(|(_, col)| *col)
            .ok_or_else(|| CommandError::other(format!("ColumnWidths names unknown column {}", name)))?;
        sheet.set_column_width(col, parse(name, w)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTimeValue;
    use tsxl_core::{CellValue, Color, NumberFormat};

    #[test]
    fn test_write_value_keeps_style_and_sets_format() {
        let mut sheet = Worksheet::new("S");
        let bold = Style::new().bold(true);
        sheet.set_cell_style_at(1, 1, &bold).unwrap();

        let dt: DateTimeValue = "2021-03".parse().unwrap();
        let fill = Style::new().fill_color(Color::RED);
        write_value(&mut sheet, 1, 1, &TableValue::DateTime(dt), None, false, Some(&fill)).unwrap();
        let style = sheet.cell_style_at(1, 1);
        assert!(style.font.bold);
        assert_eq!(style.fill.color(), Some(Color::RED));
        assert_eq!(style.number_format.code(), Some("yyyy-mm"));
        assert!(matches!(sheet.get_value_at(1, 1), CellValue::Number(_)));

        write_value(&mut sheet, 2, 0, &TableValue::Double(1.25), Some(1), false, None).unwrap();
        assert_eq!(sheet.cell_style_at(2, 0).number_format, NumberFormat::decimals(1));
        write_value(&mut sheet, 3, 0, &TableValue::Null, None, false, None).unwrap();
        assert!(sheet.get_value_at(3, 0).is_empty());
    }

    #[test]
    fn test_column_widths() {
        let mut sheet = Worksheet::new("S");
        let columns = vec![("Date".to_string(), 2u16), ("Flow".to_string(), 3u16)];
        let widths = vec![
            ("Default".to_string(), "10".to_string()),
            ("flow".to_string(), "22.5".to_string()),
        ];
        apply_column_widths(&mut sheet, &widths, &columns).unwrap();
        assert_eq!(sheet.column_width(2), Some(10.0));
        assert_eq!(sheet.column_width(3), Some(22.5));
        assert!(apply_column_widths(&mut sheet, &[("X".into(), "1".into())], &columns).is_err());
    }

    #[test]
    fn test_define_range_name() {
        let mut wb = Workbook::new();
        let range = CellRange::parse("B2:B10").unwrap();
        define_range_name(&mut wb, 0, "Flow", range).unwrap();
        define_range_name(&mut wb, 0, "flow", CellRange::parse("C2:C10").unwrap()).unwrap();
        assert_eq!(wb.names().len(), 1);
        assert_eq!(wb.named_range("FLOW", None).unwrap().refers_to, "Sheet1!$C$2:$C$10");
    }
}
