//! Write workbooks and read them back

use std::io::Cursor;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tsxl_core::{
    datetime_to_serial, CellRange, CellValue, CfOperator, CfRuleType, Color,
    ConditionalFormatRule, NameScope, NumberFormat, Style, Workbook, WorksheetTable,
};
use tsxl_xlsx::{XlsxReader, XlsxWriter};

fn roundtrip(workbook: &Workbook) -> Workbook {
    let mut buf = Vec::new();
    XlsxWriter::write(workbook, Cursor::new(&mut buf)).expect("write");
    XlsxReader::read(Cursor::new(buf)).expect("read")
}

#[test]
fn test_values_roundtrip() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_cell_value("A1", "  padded  ").unwrap();
    sheet.set_cell_value("A2", "line1\r\nline2").unwrap();
    sheet.set_cell_value("A3", "my_x0041_var").unwrap();
    sheet.set_cell_value("B1", -12.25).unwrap();
    sheet.set_cell_value("B2", 1e-9).unwrap();
    sheet.set_cell_value("C1", false).unwrap();
    sheet.set_cell_value("C2", f64::NAN).unwrap();
    sheet.set_cell_formula("D1", "=B1*2").unwrap();

    let back = roundtrip(&wb);
    let sheet = back.worksheet(0).unwrap();
    assert_eq!(sheet.get_value("A1").unwrap(), &CellValue::string("  padded  "));
    assert_eq!(sheet.get_value("A2").unwrap(), &CellValue::string("line1\r\nline2"));
    assert_eq!(sheet.get_value("A3").unwrap(), &CellValue::string("my_x0041_var"));
    assert_eq!(sheet.get_value("B1").unwrap(), &CellValue::Number(-12.25));
    assert_eq!(sheet.get_value("B2").unwrap(), &CellValue::Number(1e-9));
    assert_eq!(sheet.get_value("C1").unwrap(), &CellValue::Boolean(false));
    assert!(matches!(sheet.get_value("C2").unwrap(), CellValue::Error(_)));
    match sheet.get_value("D1").unwrap() {
        CellValue::Formula { text, .. } => assert_eq!(text, "=B1*2"),
        other => panic!("expected formula, got {:?}", other),
    }
}

#[test]
fn test_styles_roundtrip() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    let header = Style::new()
        .bold(true)
        .font_size(14.0)
        .font_color(Color::rgb(0x1F, 0x4E, 0x79))
        .fill_color(Color::rgb(0xDD, 0xEB, 0xF7));
    let date = Style::new().number_format(NumberFormat::from_code("yyyy-mm-dd"));
    sheet.set_cell_value("A1", "Date").unwrap();
    sheet.set_cell_style("A1", &header).unwrap();

    let serial = datetime_to_serial(
        NaiveDate::from_ymd_opt(2020, 5, 17)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        false,
    )
    .unwrap();
    sheet.set_cell_value("A2", serial).unwrap();
    sheet.set_cell_style("A2", &date).unwrap();

    let back = roundtrip(&wb);
    let sheet = back.worksheet(0).unwrap();

    let a1 = sheet.cell_style_at(0, 0);
    assert!(a1.font.bold);
    assert_eq!(a1.font.size(), 14.0);
    assert_eq!(a1.font.color.to_rgb(), (0x1F, 0x4E, 0x79));
    assert_eq!(a1.fill.color().map(|c| c.to_rgb()), Some((0xDD, 0xEB, 0xF7)));

    let a2 = sheet.cell_style_at(1, 0);
    assert!(a2.number_format.is_date_format());
    assert_eq!(a2.number_format.code(), Some("yyyy-mm-dd"));
    assert_eq!(sheet.get_value_at(1, 0), &CellValue::Number(serial));
}

#[test]
fn test_names_and_tables_roundtrip() {
    let mut wb = Workbook::new();
    wb.add_worksheet_with_name("Data & Notes").unwrap();
    let sheet = wb.worksheet_mut(1).unwrap();
    for (i, h) in ["Date", "Flow"].iter().enumerate() {
        sheet.set_cell_value_at(0, i as u16, *h).unwrap();
    }
    sheet.set_cell_value_at(1, 1, 3.5).unwrap();
    wb.add_table(
        1,
        WorksheetTable::new("FlowTable", CellRange::parse("A1:B2").unwrap())
            .with_columns(["Date", "Flow"]),
    )
    .unwrap();
    wb.define_name("AllData", "'Data & Notes'!$A$1:$B$2").unwrap();
    wb.define_name_for_sheet("Local", "'Data & Notes'!$B$2", 1).unwrap();

    let back = roundtrip(&wb);
    assert_eq!(back.sheet_names(), vec!["Sheet1", "Data & Notes"]);

    let (sheet_idx, table) = back.table_by_name("flowtable").unwrap();
    assert_eq!(sheet_idx, 1);
    assert_eq!(table.area.to_a1_string(), "A1:B2");
    assert_eq!(table.columns, vec!["Date".to_string(), "Flow".to_string()]);

    let global = back.named_range("AllData", None).unwrap();
    assert_eq!(global.refers_to, "'Data & Notes'!$A$1:$B$2");
    let local = back.named_range("Local", Some(1)).unwrap();
    assert_eq!(local.scope, NameScope::Sheet(1));
    assert!(back.named_range("Local", Some(0)).is_none());
}

#[test]
fn test_views_and_columns_roundtrip() {
    let mut wb = Workbook::new();
    wb.add_worksheet_with_name("Second").unwrap();
    wb.set_active_sheet(1).unwrap();
    wb.worksheet_mut(1).unwrap().set_visible(true);
    let sheet = wb.worksheet_mut(0).unwrap();
    sheet.set_visible(false);
    sheet.set_freeze_panes(2, 1).unwrap();
    sheet.set_column_width(0, 20.0).unwrap();
    sheet.set_column_width(1, 20.0).unwrap();
    sheet.set_column_width(3, 8.5).unwrap();
    sheet.view_mut().set_zoom(85).unwrap();

    let back = roundtrip(&wb);
    assert_eq!(back.active_sheet(), 1);
    let sheet = back.worksheet(0).unwrap();
    assert!(!sheet.is_visible());
    let pane = sheet.freeze_pane().unwrap();
    assert_eq!((pane.cols, pane.rows), (2, 1));
    assert_eq!(sheet.view().zoom_scale, 85);
    assert_eq!(sheet.column_width(0), Some(20.0));
    assert_eq!(sheet.column_width(1), Some(20.0));
    assert_eq!(sheet.column_width(2), None);
    assert_eq!(sheet.column_width(3), Some(8.5));
}

#[test]
fn test_conditional_formats_roundtrip() {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    let range = CellRange::parse("B2:B20").unwrap();
    sheet.add_conditional_format(
        ConditionalFormatRule::cell_is(CfOperator::GreaterThan, "100", None)
            .with_range(range)
            .with_format(Style::new().fill_color(Color::RED)),
    );
    sheet.add_conditional_format(
        ConditionalFormatRule::begins_with("M")
            .with_range(range)
            .with_format(Style::new().italic(true)),
    );
    sheet.add_conditional_format(
        ConditionalFormatRule::color_scale_2(Color::rgb(0xF8, 0x69, 0x6B), Color::rgb(0x63, 0xBE, 0x7B))
            .with_range(CellRange::parse("C2:C20").unwrap()),
    );

    let back = roundtrip(&wb);
    let rules = back.worksheet(0).unwrap().conditional_formats();
    assert_eq!(rules.len(), 3);

    match &rules[0].rule_type {
        CfRuleType::CellIs { operator, formula1, .. } => {
            assert_eq!(*operator, CfOperator::GreaterThan);
            assert_eq!(formula1, "100");
        }
        other => panic!("unexpected rule {:?}", other),
    }
    let fill = rules[0].format.as_ref().and_then(|s| s.fill.color());
    assert_eq!(fill.map(|c| c.to_rgb()), Some((255, 0, 0)));

    assert_eq!(rules[1].rule_type, CfRuleType::BeginsWith { text: "M".into() });
    assert!(rules[1].format.as_ref().unwrap().font.italic);
    assert_eq!(rules[1].priority, 2);

    match &rules[2].rule_type {
        CfRuleType::ColorScale { stops } => {
            assert_eq!(stops.len(), 2);
            assert_eq!(stops[1].color.to_rgb(), (0x63, 0xBE, 0x7B));
        }
        other => panic!("unexpected rule {:?}", other),
    }
    assert_eq!(rules[2].sqref(), "C2:C20");
}

#[test]
fn test_date_1904_roundtrip_via_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mac.xlsx");

    let mut wb = Workbook::new();
    wb.settings_mut().date_1904 = true;
    wb.worksheet_mut(0).unwrap().set_cell_value("A1", 0.0).unwrap();
    XlsxWriter::write_file(&wb, &path).unwrap();

    let back = XlsxReader::read_file(&path).unwrap();
    assert!(back.is_date_1904());
    assert_eq!(back.worksheet(0).unwrap().get_value_at(0, 0), &CellValue::Number(0.0));
}
