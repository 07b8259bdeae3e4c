//! `WriteTableCellsToExcel`

use std::sync::Arc;

use tsxl_core::Workbook;

use crate::area::{self, ExcelArea};
use crate::command::output::write_value;
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;
use crate::table::{DataTable, FieldType};

command_struct!(
    /// `WriteTableCellsToExcel`: fill existing named ranges with table columns
    ///
    /// Each `Column:RangeName` pair writes the column's values down the
    /// range starting at its top-left cell. Values that do not fit are
    /// dropped with a warning.
    WriteTableCellsToExcel,
    "WriteTableCellsToExcel"
);

impl Command for WriteTableCellsToExcel {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &["TableID", "OutputFile", "Worksheet", "ColumnNamedRanges", "KeepOpen"]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("TableID")
            .require("OutputFile")
            .require("ColumnNamedRanges")
            .pairs("ColumnNamedRanges")
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let processor: &CommandProcessor = processor;
        let args = Args::new(&self.parameters, processor);
        let table = processor.require_table(&args.require("TableID")?)?;
        let path = args.require_path("OutputFile")?;
        let keep_open = args.keep_open()?;
        let worksheet = args.worksheet();
        let mapping = args.pairs("ColumnNamedRanges")?;

        let registry = Arc::clone(&processor.config().registry);
        registry.with_workbook(&path, OpenMode::Write, keep_open, |workbook| {
            for (column, range_name) in &mapping {
                write_column(workbook, worksheet.as_deref(), table, column, range_name, status)?;
            }
            Ok(())
        })?;
        log::info!(
            "wrote {} column(s) of table {} to named ranges in {}",
            mapping.len(),
            table.id(),
            path.display()
        );
        Ok(())
    }
}

fn write_column(
    workbook: &mut Workbook,
    worksheet: Option<&str>,
    table: &DataTable,
    column: &str,
    range_name: &str,
    status: &mut CommandStatus,
) -> Result<()> {
    let field_index = table.field_index(column).ok_or_else(|| {
        CommandError::other(format!("table {} has no column {}", table.id(), column))
    })?;
    let area = ExcelArea::NamedRange(range_name.to_string());
    let resolved = area::resolve(workbook, worksheet, &area)?;
    let range = resolved
        .range
        .ok_or_else(|| CommandError::AreaNotFound(range_name.to_string()))?;

    let field = &table.fields()[field_index];
    let precision = match field.field_type {
        FieldType::Double => field.precision,
        _ => None,
    };
    let available = range.row_count() as usize;
    if table.row_count() > available {
        status.warn(format!(
            "named range {} holds {} rows; {} values of column {} are not written",
            range_name,
            available,
            table.row_count() - available,
            column
        ));
    }

    let date_1904 = workbook.is_date_1904();
    let sheet = workbook
        .worksheet_mut(resolved.sheet_index)
        .ok_or_else(|| CommandError::WorksheetNotFound(range_name.to_string()))?;
    for row in 0..table.row_count().min(available) {
        let value = table.value(row, field_index).cloned().unwrap_or_default();
        write_value(
            sheet,
            range.start.row + row as u32,
            range.start.col,
            &value,
            precision,
            date_1904,
            None,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{create_command, Severity};
    use crate::processor::ProcessorConfig;
    use crate::registry::WorkbookRegistry;
    use crate::table::TableField;
    use tempfile::tempdir;
    use tsxl_core::{CellValue, NameScope};
    use tsxl_xlsx::{XlsxReader, XlsxWriter};

    #[test]
    fn test_fill_named_ranges() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let mut wb = Workbook::new();
        wb.define_name("Totals", "Sheet1!$B$2:$B$3").unwrap();
        wb.define_name("Labels", "Sheet1!$A$2:$A$5").unwrap();
        XlsxWriter::write_file(&wb, &path).unwrap();

        let mut p = CommandProcessor::new(
            ProcessorConfig::default()
                .with_working_dir(dir.path())
                .with_registry(Arc::new(WorkbookRegistry::new())),
        );
        let mut table = DataTable::with_fields(
            "Summary",
            vec![
                TableField::new("Label", FieldType::String),
                TableField::new("Total", FieldType::Integer),
            ],
        );
        for (label, total) in [("a", 1i64), ("b", 2), ("c", 3)] {
            table.add_record(vec![label.into(), total.into()]).unwrap();
        }
        p.set_table(table);

        let status = create_command(
            r#"WriteTableCellsToExcel(TableID="Summary",OutputFile="report.xlsx",ColumnNamedRanges="Label:Labels,Total:Totals")"#,
        )
        .unwrap()
        .run(&mut p)
        .unwrap();
        assert_eq!(status.severity(), Severity::Warning);

        let wb = XlsxReader::read_file(&path).unwrap();
        let sheet = wb.worksheet(0).unwrap();
        assert_eq!(sheet.get_value_at(1, 0), &CellValue::string("a"));
        assert_eq!(sheet.get_value_at(3, 0), &CellValue::string("c"));
        assert_eq!(sheet.get_value_at(2, 1), &CellValue::Number(2.0));
        assert!(sheet.get_value_at(3, 1).is_empty());
        assert!(wb.named_range("Totals", None).is_some_and(|n| n.scope == NameScope::Workbook));
    }

    #[test]
    fn test_unknown_range_fails() {
        let dir = tempdir().unwrap();
        let mut p = CommandProcessor::new(
            ProcessorConfig::default()
                .with_working_dir(dir.path())
                .with_registry(Arc::new(WorkbookRegistry::new())),
        );
        p.set_table(DataTable::with_fields("T", vec![TableField::new("A", FieldType::String)]));
        let mut command = create_command(
            r#"WriteTableCellsToExcel(TableID="T",OutputFile="x.xlsx",ColumnNamedRanges="A:Missing")"#,
        )
        .unwrap();
        assert!(command.run(&mut p).is_err());
        assert!(!dir.path().join("x.xlsx").exists());
    }
}
