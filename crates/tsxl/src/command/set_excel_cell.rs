//! `SetExcelCell`

use std::sync::Arc;

use tsxl_core::{CellValue, Style};

use crate::command::check::parse_bool;
use crate::command::output::{output_origin, write_value};
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;
use crate::styles::StyleTable;
use crate::table::TableValue;

command_struct!(
    /// `SetExcelCell`: set one cell's value, formula or style
    SetExcelCell,
    "SetExcelCell"
);

/// What goes into the cell
#[derive(Debug, Clone, PartialEq)]
enum CellContent {
    Value(TableValue),
    Formula(String),
}

/// `Value` text as the most specific value it reads as
fn literal_value(text: &str) -> TableValue {
    if let Ok(i) = text.parse::<i64>() {
        TableValue::Integer(i)
    } else if let Ok(d) = text.parse::<f64>() {
        TableValue::Double(d)
    } else if let Some(b) = parse_bool(text) {
        TableValue::Boolean(b)
    } else {
        TableValue::String(text.to_string())
    }
}

impl Command for SetExcelCell {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[
            "OutputFile",
            "Worksheet",
            "ExcelAddress",
            "ExcelNamedRange",
            "ExcelTableName",
            "Value",
            "PropertyName",
            "Formula",
            "StyleTableID",
            "StyleID",
            "KeepOpen",
        ]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("OutputFile")
            .area()
            .exclusive(&["Value", "PropertyName", "Formula"])
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        let args = check.args();
        let has_style_table = args.get("StyleTableID").is_some();
        let has_style = args.get("StyleID").is_some();
        let has_content = ["Value", "PropertyName", "Formula"]
            .iter()
            .any(|n| args.get_raw(n).is_some());
        if has_style != has_style_table {
            check.problem("StyleTableID and StyleID must be specified together");
        }
        if !has_content && !has_style {
            check.problem("one of Value, PropertyName, Formula or StyleID must be specified");
        }
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let processor: &CommandProcessor = processor;
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("OutputFile")?;
        let keep_open = args.keep_open()?;
        let worksheet = args.worksheet();
        let area = args.area()?;

        let content = if let Some(name) = args.get("PropertyName") {
            let value = processor.property(&name).cloned().ok_or_else(|| {
                CommandError::other(format!("property {} is not set", name))
            })?;
            Some(CellContent::Value(value))
        } else if let Some(formula) = args.get("Formula") {
            Some(CellContent::Formula(formula.trim_start_matches('=').to_string()))
        } else {
            // An explicitly empty Value clears the cell
            args.get_raw("Value").map(|v| match v.trim() {
                "" => CellContent::Value(TableValue::Null),
                text => CellContent::Value(literal_value(text)),
            })
        };
        let style: Option<Style> = match (args.get("StyleTableID"), args.get("StyleID")) {
            (Some(table_id), Some(style_id)) => {
                let styles = StyleTable::from_table(processor.require_table(&table_id)?)?;
                let style = styles.get(&style_id).cloned().ok_or_else(|| {
                    CommandError::other(format!("style {} is not in table {}", style_id, table_id))
                })?;
                Some(style)
            }
            _ => None,
        };

        let registry = Arc::clone(&processor.config().registry);
        let address = registry.with_workbook(&path, OpenMode::Write, keep_open, |workbook| {
            let origin = output_origin(workbook, worksheet.as_deref(), &area)?;
            if origin.rows.is_some_and(|r| r > 1) {
                status.warn(format!("{} covers several cells; only the first is set", area));
            }
            let date_1904 = workbook.is_date_1904();
            let sheet = workbook
                .worksheet_mut(origin.sheet_index)
                .ok_or_else(|| CommandError::other("output worksheet is missing"))?;
            let (row, col) = (origin.cell.row, origin.cell.col);
            match &content {
                Some(CellContent::Value(value)) => {
                    write_value(sheet, row, col, value, None, date_1904, style.as_ref())?;
                }
                Some(CellContent::Formula(text)) => {
                    sheet.set_cell_value_at(row, col, CellValue::formula(text))?;
                }
                None => {}
            }
            if let (Some(style), false) = (&style, matches!(content, Some(CellContent::Value(_)))) {
                let merged = sheet.cell_style_at(row, col).merged_with(style);
                sheet.set_cell_style_at(row, col, &merged)?;
            }
            Ok(origin.cell.to_a1_string())
        })?;
        log::info!("set cell {} in {}", address, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::create_command;
    use crate::processor::ProcessorConfig;
    use crate::registry::WorkbookRegistry;
    use crate::table::{DataTable, FieldType, TableField};
    use tempfile::{tempdir, TempDir};
    use tsxl_core::Color;
    use tsxl_xlsx::XlsxReader;

    fn processor() -> (TempDir, CommandProcessor) {
        let dir = tempdir().unwrap();
        let mut p = CommandProcessor::new(
            ProcessorConfig::default()
                .with_working_dir(dir.path())
                .with_registry(Arc::new(WorkbookRegistry::new()))
                .with_property("Title", TableValue::from("Annual report")),
        );
        let mut styles = DataTable::with_fields(
            "Styles",
            vec![
                TableField::new("StyleID", FieldType::String),
                TableField::new("FontBold", FieldType::String),
                TableField::new("FillForegroundColor", FieldType::String),
            ],
        );
        styles
            .add_record(vec!["title".into(), "true".into(), "yellow".into()])
            .unwrap();
        p.set_table(styles);
        (dir, p)
    }

    fn run(p: &mut CommandProcessor, text: &str) {
        create_command(text).unwrap().run(p).unwrap();
    }

    #[test]
    fn test_literal_value() {
        assert_eq!(literal_value("12"), TableValue::Integer(12));
        assert_eq!(literal_value("1.5"), TableValue::Double(1.5));
        assert_eq!(literal_value("TRUE"), TableValue::Boolean(true));
        assert_eq!(literal_value("abc"), TableValue::String("abc".into()));
    }

    #[test]
    fn test_set_value_property_formula_and_style() {
        let (dir, mut p) = processor();
        run(&mut p, r#"NewExcelWorkbook(OutputFile="c.xlsx",Worksheets="Report",KeepOpen=True)"#);
        run(
            &mut p,
            r#"SetExcelCell(OutputFile="c.xlsx",ExcelAddress="A1",PropertyName="Title",StyleTableID="Styles",StyleID="title",KeepOpen=True)"#,
        );
        run(&mut p, r#"SetExcelCell(OutputFile="c.xlsx",ExcelAddress="B2",Value="42",KeepOpen=True)"#);
        run(&mut p, r#"SetExcelCell(OutputFile="c.xlsx",ExcelAddress="B3",Formula="=B2*2",KeepOpen=True)"#);
        run(
            &mut p,
            r#"SetExcelCell(OutputFile="c.xlsx",ExcelAddress="C1",StyleTableID="Styles",StyleID="TITLE")"#,
        );

        let wb = XlsxReader::read_file(dir.path().join("c.xlsx")).unwrap();
        let sheet = wb.worksheet_by_name("Report").unwrap();
        assert_eq!(sheet.get_value_at(0, 0), &CellValue::string("Annual report"));
        assert!(sheet.cell_style_at(0, 0).font.bold);
        assert_eq!(sheet.get_value_at(1, 1), &CellValue::Number(42.0));
        assert_eq!(sheet.get_value_at(2, 1).formula_text(), Some("=B2*2"));
        assert!(sheet.get_value_at(0, 2).is_empty());
        assert_eq!(
            sheet.cell_style_at(0, 2).fill.color().map(|c| c.to_rgb()),
            Color::parse("yellow").map(|c| c.to_rgb())
        );
    }

    #[test]
    fn test_check_problems() {
        let (_dir, p) = processor();
        let check = |text: &str| create_command(text).unwrap().check_parameters(&p);
        assert!(!check(r#"SetExcelCell(OutputFile="c.xlsx")"#).is_ok());
        assert!(!check(r#"SetExcelCell(OutputFile="c.xlsx",Value="1",Formula="A1")"#).is_ok());
        assert!(!check(r#"SetExcelCell(OutputFile="c.xlsx",StyleID="x")"#).is_ok());
        assert!(check(r#"SetExcelCell(OutputFile="c.xlsx",Value="")"#).is_ok());
    }
}
