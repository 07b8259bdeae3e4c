//! Command files run end to end against real files

use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tsxl::prelude::*;
use tsxl_core::CellValue;
use tsxl_xlsx::XlsxReader;

fn processor(dir: &std::path::Path) -> CommandProcessor {
    CommandProcessor::new(
        ProcessorConfig::default()
            .with_working_dir(dir)
            .with_registry(Arc::new(WorkbookRegistry::new())),
    )
}

const FLOWS_CSV: &str = "# Daily flows\n\
    Station,Date,Flow\n\
    North,2021-06-01,12.5\n\
    North,2021-06-02,140.25\n\
    South,2021-06-01,8\n";

const STYLES_CSV: &str = "StyleID,FillForegroundColor,FontBold\n\
    high,red,true\n\
    header,,true\n";

const CONDITIONS_CSV: &str = "Column,Condition,StyleID\n\
    Flow,> 100,high\n";

#[test]
fn test_report_workflow() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("flows.csv"), FLOWS_CSV).unwrap();
    fs::write(dir.path().join("styles.csv"), STYLES_CSV).unwrap();
    fs::write(dir.path().join("conditions.csv"), CONDITIONS_CSV).unwrap();

    let script = r#"
# Build a styled report workbook
SetProperty(PropertyName="Report",PropertyValue="report.xlsx")
ReadTableFromDelimitedFile(TableID="Flows",InputFile="flows.csv")
ReadTableFromDelimitedFile(TableID="Styles",InputFile="styles.csv")
ReadTableFromDelimitedFile(TableID="Conditions",InputFile="conditions.csv")
NewExcelWorkbook(OutputFile="${Report}",Worksheets="Flows",KeepOpen=True)
WriteTableToExcel(TableID="Flows",OutputFile="${Report}",Worksheet="Flows",\
    ExcelAddress="A1",ColumnNamedRanges="Flow:FlowValues",ColumnWidths="Default:14",\
    StyleTableID="Styles",ConditionTableID="Conditions",KeepOpen=True)
SetExcelCell(OutputFile="${Report}",Worksheet="Flows",ExcelAddress="E1",Formula="=SUM(FlowValues)",\
    StyleTableID="Styles",StyleID="header",KeepOpen=True)
/*
SetExcelCell(OutputFile="${Report}",ExcelAddress="Z99",Value="skipped")
*/
SetExcelConditionalFormatting(OutputFile="${Report}",Worksheet="Flows",ExcelNamedRange="FlowValues",\
    Condition="< 10",StyleTableID="Styles",StyleID="high",KeepOpen=True)
SetExcelWorksheetViewProperties(OutputFile="${Report}",Worksheet="Flows",FreezePaneRowBelowSplit=2,KeepOpen=True)
CloseExcelWorkbook(OutputFile="${Report}")
ReadTableFromExcel(TableID="Back",InputFile="${Report}",Worksheet="Flows",ExcelAddress="A1:C4",\
    ColumnExcludeFilters="Station:South",RowCountProperty="BackRows")
Exit()
SetProperty(PropertyName="After",PropertyValue="never")
"#;

    let mut p = processor(dir.path());
    let summary = p.run_script(script);
    for record in &summary.records {
        assert_eq!(
            record.status.severity(),
            Severity::Success,
            "line {}: {} {:?}",
            record.line,
            record.text,
            record.status.messages()
        );
    }
    assert!(summary.exited);
    assert!(p.property("After").is_none());
    assert!(p.registry().open_paths().is_empty());

    let wb = XlsxReader::read_file(dir.path().join("report.xlsx")).unwrap();
    let sheet = wb.worksheet_by_name("Flows").unwrap();
    assert_eq!(sheet.get_value_at(0, 2), &CellValue::string("Flow"));
    assert_eq!(sheet.get_value_at(2, 2), &CellValue::Number(140.25));
    assert!(sheet.cell_style_at(2, 2).font.bold);
    assert!(!sheet.cell_style_at(1, 2).font.bold);
    assert_eq!(sheet.get_value_at(0, 4).formula_text(), Some("=SUM(FlowValues)"));
    assert_eq!(sheet.column_width(0), Some(14.0));
    assert_eq!(sheet.conditional_formats().len(), 1);
    assert_eq!(sheet.freeze_pane().map(|f| f.rows), Some(1));
    assert!(sheet.get_value_at(98, 25).is_empty());
    assert_eq!(wb.named_range("FlowValues", None).unwrap().refers_to, "Flows!$C$2:$C$4");

    let back = p.table("Back").unwrap();
    assert_eq!(back.row_count(), 2);
    assert_eq!(back.field(1).map(|f| f.field_type), Some(FieldType::DateTime));
    assert_eq!(p.property("BackRows"), Some(&TableValue::Integer(2)));
    assert_eq!(back.value(1, 2), Some(&TableValue::Double(140.25)));
}

#[test]
fn test_failure_stops_and_leaves_nothing_written() {
    let dir = tempdir().unwrap();
    let mut p = processor(dir.path());
    let summary = p.run_script(
        "NewExcelWorkbook(OutputFile=\"a.xlsx\",KeepOpen=True)\n\
         WriteTableToExcel(TableID=\"Missing\",OutputFile=\"a.xlsx\",KeepOpen=True)\n\
         CloseExcelWorkbook(OutputFile=\"a.xlsx\")\n",
    );
    assert!(summary.stopped);
    assert_eq!(summary.records.len(), 2);
    assert_eq!(summary.records[1].status.severity(), Severity::Failure);
    assert!(!dir.path().join("a.xlsx").exists());
    assert!(p.registry().is_open(&dir.path().join("a.xlsx")));
}

#[test]
fn test_time_series_to_excel_and_back() {
    let dir = tempdir().unwrap();
    let mut p = processor(dir.path());
    let summary = p.run_script(
        "NewPatternTimeSeries(Alias=\"Up\",NewTSID=\"Up.Gage.Flow.Month\",SetStart=\"2020-01\",SetEnd=\"2020-12\",PatternValues=\"1,2,3\")\n\
         WriteTimeSeriesToExcel(OutputFile=\"ts.xlsx\",Worksheet=\"Monthly\",Precision=2)\n\
         ReadTableFromExcel(TableID=\"Monthly\",InputFile=\"ts.xlsx\",Worksheet=\"Monthly\")\n",
    );
    assert_eq!(summary.severity(), Severity::Success);
    let table = p.table("Monthly").unwrap();
    assert_eq!(table.field_names(), vec!["DateTime", "Up"]);
    assert_eq!(table.row_count(), 12);
    let june: DateTimeValue = "2020-06".parse().unwrap();
    assert_eq!(table.value(5, 0), Some(&TableValue::DateTime(june)));
    assert_eq!(table.value(5, 1), Some(&TableValue::Double(3.0)));
}
