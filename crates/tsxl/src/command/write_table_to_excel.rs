//! `WriteTableToExcel`

use std::sync::Arc;

use tsxl_core::{CellRange, Workbook};

use crate::area::{ExcelArea, ExcelColumnNames};
use crate::command::output::{
    apply_column_widths, check_style_tables, define_range_name, output_origin, write_value,
    CellStyler,
};
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;
use crate::table::{DataTable, FieldType};

command_struct!(
    /// `WriteTableToExcel`: write table columns to a worksheet
    ///
    /// The area's top-left cell is where writing starts; without an area
    /// that is `A1`. The worksheet is added when missing.
    WriteTableToExcel,
    "WriteTableToExcel"
);

struct WriteOptions {
    worksheet: Option<String>,
    area: ExcelArea,
    column_names: ExcelColumnNames,
    named_ranges: Vec<(String, String)>,
    widths: Vec<(String, String)>,
}

impl Command for WriteTableToExcel {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[
            "TableID",
            "IncludeColumns",
            "ExcludeColumns",
            "OutputFile",
            "Worksheet",
            "ExcelAddress",
            "ExcelNamedRange",
            "ExcelTableName",
            "ExcelColumnNames",
            "ColumnNamedRanges",
            "ColumnWidths",
            "ConditionTableID",
            "StyleTableID",
            "KeepOpen",
        ]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("TableID")
            .require("OutputFile")
            .area()
            .enumeration("ExcelColumnNames", ExcelColumnNames::NAMES)
            .pairs("ColumnNamedRanges")
            .pairs("ColumnWidths")
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        check_style_tables(&mut check);
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let processor: &CommandProcessor = processor;
        let args = Args::new(&self.parameters, processor);
        let table = processor.require_table(&args.require("TableID")?)?;
        let path = args.require_path("OutputFile")?;
        let keep_open = args.keep_open()?;
        let columns = table.select_columns(&args.list("IncludeColumns"), &args.list("ExcludeColumns"))?;
        if columns.is_empty() {
            status.warn(format!("no columns of table {} are selected", table.id()));
        }
        let styler = CellStyler::from_args(&args, processor)?;
        let options = WriteOptions {
            worksheet: args.worksheet(),
            area: args.area()?,
            column_names: args.parse("ExcelColumnNames")?.unwrap_or_default(),
            named_ranges: args.pairs("ColumnNamedRanges")?,
            widths: args.pairs("ColumnWidths")?,
        };

        let registry = Arc::clone(&processor.config().registry);
        registry.with_workbook(&path, OpenMode::Write, keep_open, |workbook| {
            write_table(workbook, table, &columns, &options, styler.as_ref(), status)
        })?;
        log::info!(
            "wrote {} rows of table {} to {}",
            table.row_count(),
            table.id(),
            path.display()
        );
        Ok(())
    }
}

fn write_table(
    workbook: &mut Workbook,
    table: &DataTable,
    columns: &[usize],
    options: &WriteOptions,
    styler: Option<&CellStyler>,
    status: &mut CommandStatus,
) -> Result<()> {
    let origin = output_origin(workbook, options.worksheet.as_deref(), &options.area)?;
    let (header_row, first_data_row) = match options.column_names {
        ExcelColumnNames::None => (None, origin.cell.row),
        ExcelColumnNames::FirstRowInRange => (Some(origin.cell.row), origin.cell.row + 1),
        ExcelColumnNames::RowBeforeRange => {
            let row = origin.cell.row.checked_sub(1).ok_or_else(|| {
                CommandError::other("ExcelColumnNames=RowBeforeRange needs an area below the first row")
            })?;
            (Some(row), origin.cell.row)
        }
    };
    if let Some(available) = origin.rows {
        let needed = table.row_count() as u32 + u32::from(header_row == Some(origin.cell.row));
        if needed > available {
            status.warn(format!(
                "table {} needs {} rows but the area has {}; writing past the area",
                table.id(),
                needed,
                available
            ));
        }
    }

    let date_1904 = workbook.is_date_1904();
    let sheet = workbook
        .worksheet_mut(origin.sheet_index)
        .ok_or_else(|| CommandError::other("output worksheet is missing"))?;
    let mut written: Vec<(String, u16)> = Vec::with_capacity(columns.len());
    for (j, &field_index) in columns.iter().enumerate() {
        let field = &table.fields()[field_index];
        let col = origin.cell.col + j as u16;
        written.push((field.name.clone(), col));
        if let Some(row) = header_row {
            sheet.set_cell_value_at(row, col, field.name.as_str())?;
        }
        let precision = match field.field_type {
            FieldType::Double => field.precision,
            _ => None,
        };
        for row in 0..table.row_count() {
            let value = table.value(row, field_index).cloned().unwrap_or_default();
            let overlay = styler.and_then(|s| s.style_for(&field.name, &value));
            write_value(
                sheet,
                first_data_row + row as u32,
                col,
                &value,
                precision,
                date_1904,
                overlay,
            )?;
        }
    }
    apply_column_widths(sheet, &options.widths, &written)?;

    let last_row = (first_data_row + table.row_count() as u32).saturating_sub(1).max(first_data_row);
    for (column, name) in &options.named_ranges {
        let col = written
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map(|(_, col)| *col)
            .ok_or_else(|| {
                CommandError::other(format!("ColumnNamedRanges names unwritten column {}", column))
            })?;
        let range = CellRange::from_indices(first_data_row, col, last_row, col);
        define_range_name(workbook, origin.sheet_index, name, range)?;
    }
    Ok(())
}
