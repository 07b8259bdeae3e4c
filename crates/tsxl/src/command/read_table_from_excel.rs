//! `ReadTableFromExcel`

use std::sync::Arc;

use tsxl_core::{CellAddress, CellRange, CellValue, NumberFormat, Workbook};

use crate::area::{self, ExcelArea, ExcelColumnNames};
use crate::coerce::{cell_to_value, convert, infer_column_type};
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::error::{CommandError, Result};
use crate::pattern::Glob;
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;
use crate::table::{DataTable, FieldType, TableField, TableValue};

const DEFAULT_PRECISION: usize = 6;

command_struct!(
    /// `ReadTableFromExcel`: read a worksheet area into a table
    ///
    /// Column types come from the first non-blank value in each column
    /// unless one of the column-type parameters says otherwise.
    ReadTableFromExcel,
    "ReadTableFromExcel"
);

/// Everything the read needs, resolved before the workbook is opened
struct ReadOptions {
    table_id: String,
    worksheet: Option<String>,
    area: ExcelArea,
    column_names: ExcelColumnNames,
    include_filters: Vec<(String, Glob)>,
    exclude_filters: Vec<(String, Glob)>,
    comment: Option<String>,
    integer_columns: Vec<Glob>,
    datetime_columns: Vec<Glob>,
    text_columns: Vec<Glob>,
    all_text: bool,
    precision: usize,
}

impl ReadOptions {
    fn from_args(args: &Args<'_>) -> Result<Self> {
        let globs = |name: &str| -> Result<Vec<Glob>> {
            args.list(name).iter().map(|p| Glob::new(p)).collect()
        };
        let filters = |name: &str| -> Result<Vec<(String, Glob)>> {
            args.pairs(name)?
                .into_iter()
                .map(|(column, pattern)| -> Result<(String, Glob)> {
                    Ok((column, Glob::new(&pattern)?))
                })
                .collect()
        };
        Ok(Self {
            table_id: args.require("TableID")?,
            worksheet: args.worksheet(),
            area: args.area()?,
            column_names: args.parse("ExcelColumnNames")?.unwrap_or_default(),
            include_filters: filters("ColumnIncludeFilters")?,
            exclude_filters: filters("ColumnExcludeFilters")?,
            comment: args.get_raw("Comment").filter(|c| !c.is_empty()),
            integer_columns: globs("ExcelIntegerColumns")?,
            datetime_columns: globs("ExcelDateTimeColumns")?,
            text_columns: globs("ExcelTextColumns")?,
            all_text: args.flag("ReadAllAsText", false)?,
            precision: args.parse("NumberPrecision")?.unwrap_or(DEFAULT_PRECISION),
        })
    }

    /// Column type forced by parameters; text wins over integer over date-time
    fn requested_type(&self, column: &str) -> Option<FieldType> {
        let any = |globs: &[Glob]| globs.iter().any(|g| g.is_match(column));
        if self.all_text || any(&self.text_columns) {
            Some(FieldType::String)
        } else if any(&self.integer_columns) {
            Some(FieldType::Integer)
        } else if any(&self.datetime_columns) {
            Some(FieldType::DateTime)
        } else {
            None
        }
    }
}

impl Command for ReadTableFromExcel {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[
            "TableID",
            "InputFile",
            "Worksheet",
            "ExcelAddress",
            "ExcelNamedRange",
            "ExcelTableName",
            "ExcelColumnNames",
            "ColumnIncludeFilters",
            "ColumnExcludeFilters",
            "Comment",
            "ExcelIntegerColumns",
            "ExcelDateTimeColumns",
            "ExcelTextColumns",
            "ReadAllAsText",
            "NumberPrecision",
            "RowCountProperty",
            "KeepOpen",
        ]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .require("TableID")
            .require("InputFile")
            .area()
            .enumeration("ExcelColumnNames", ExcelColumnNames::NAMES)
            .pairs("ColumnIncludeFilters")
            .pairs("ColumnExcludeFilters")
            .boolean("ReadAllAsText")
            .integer("NumberPrecision", 0..=15)
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("InputFile")?;
        let keep_open = args.keep_open()?;
        let row_count_property = args.get("RowCountProperty");
        let options = ReadOptions::from_args(&args)?;

        let registry = Arc::clone(&processor.config().registry);
        let table = registry.with_workbook(&path, OpenMode::Read, keep_open, |workbook| {
            read_table(workbook, &options, status)
        })?;

        log::info!(
            "read table {} ({} columns, {} rows) from {}",
            table.id(),
            table.field_count(),
            table.row_count(),
            path.display()
        );
        if let Some(name) = row_count_property {
            processor.set_property(name, TableValue::Integer(table.row_count() as i64));
        }
        processor.set_table(table);
        Ok(())
    }
}

fn read_table(workbook: &Workbook, options: &ReadOptions, status: &mut CommandStatus) -> Result<DataTable> {
    let resolved = area::resolve(workbook, options.worksheet.as_deref(), &options.area)?;
    let sheet = workbook
        .worksheet(resolved.sheet_index)
        .ok_or_else(|| CommandError::other("resolved worksheet is missing"))?;
    let mut table = DataTable::new(options.table_id.as_str());

    let Some(range) = resolved.range else {
        status.warn(format!("worksheet '{}' has no data; the table is empty", sheet.name()));
        return Ok(table);
    };
    let (names, data) = match &resolved.table {
        // An Excel table carries its own header
        Some(excel_table) => (excel_table.columns.clone(), excel_table.data_range()),
        None => area::column_names(sheet, &range, options.column_names)?,
    };
    let names = unique_names(names, status);

    let include = filter_columns(&names, &options.include_filters)?;
    let exclude = filter_columns(&names, &options.exclude_filters)?;
    let date_1904 = workbook.is_date_1904();
    let requested: Vec<Option<FieldType>> =
        names.iter().map(|n| options.requested_type(n)).collect();

    // Raw values, one row per kept worksheet row
    let mut rows: Vec<Vec<TableValue>> = Vec::new();
    if let Some(data) = data {
        for row in data.start.row..=data.end.row {
            if let Some(comment) = &options.comment {
                let first = sheet.get_value_at(row, data.start.col).effective_value().to_string();
                if first.trim_start().starts_with(comment.as_str()) {
                    continue;
                }
            }
            if is_blank_row(sheet, &data, row) {
                continue;
            }
            let values: Vec<TableValue> = (data.start.col..=data.end.col)
                .enumerate()
                .map(|(i, col)| read_cell(sheet, row, col, requested[i], date_1904, status))
                .collect();
            let keep = include
                .iter()
                .all(|(col, glob)| glob.is_match(&values[*col].to_string()))
                && !exclude
                    .iter()
                    .any(|(col, glob)| glob.is_match(&values[*col].to_string()));
            if keep {
                rows.push(values);
            }
        }
    }

    let types: Vec<FieldType> = (0..names.len())
        .map(|i| requested[i].unwrap_or_else(|| infer_column_type(rows.iter().map(|r| &r[i]))))
        .collect();
    for (name, field_type) in names.iter().zip(&types) {
        let mut field = TableField::new(name.as_str(), *field_type);
        if *field_type == FieldType::Double {
            field.precision = Some(options.precision);
        }
        table.add_field(field);
    }

    for (n, row) in rows.into_iter().enumerate() {
        let record = row
            .into_iter()
            .zip(&types)
            .enumerate()
            .map(|(i, (value, field_type))| match convert(value, *field_type) {
                Ok(v) => v,
                Err(reason) => {
                    status.warn(format!("row {} column {}: {}; using null", n + 1, names[i], reason));
                    TableValue::Null
                }
            })
            .collect();
        table.add_record(record)?;
    }
    Ok(table)
}

fn read_cell(
    sheet: &tsxl_core::Worksheet,
    row: u32,
    col: u16,
    requested: Option<FieldType>,
    date_1904: bool,
    status: &mut CommandStatus,
) -> TableValue {
    let value = sheet.get_value_at(row, col);
    let style_format = &sheet.cell_style_at(row, col).number_format;
    // Numbers in a date-time column are serials even without a date format
    let fallback;
    let format = match (requested, value.effective_value()) {
        (Some(FieldType::DateTime), CellValue::Number(n)) if !style_format.is_date_format() => {
            fallback = NumberFormat::from_code(if n.fract() == 0.0 {
                "yyyy-mm-dd"
            } else {
                "yyyy-mm-dd hh:mm"
            });
            &fallback
        }
        _ => style_format,
    };
    match cell_to_value(value, format, date_1904) {
        Ok(v) => v,
        Err(e) => {
            status.warn(format!(
                "cell {} holds error {}; using null",
                CellAddress::new(row, col).to_a1_string(),
                e.as_str()
            ));
            TableValue::Null
        }
    }
}

fn is_blank_row(sheet: &tsxl_core::Worksheet, data: &CellRange, row: u32) -> bool {
    (data.start.col..=data.end.col).all(|col| sheet.get_value_at(row, col).is_blank())
}

/// Suffix repeated names with `_2`, `_3`, ...
fn unique_names(names: Vec<String>, status: &mut CommandStatus) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1;
        while out.iter().any(|o| o.eq_ignore_ascii_case(&candidate)) {
            n += 1;
            candidate = format!("{}_{}", name, n);
        }
        if candidate != name {
            status.warn(format!("column name {} is repeated; renamed to {}", name, candidate));
        }
        out.push(candidate);
    }
    out
}

fn filter_columns(names: &[String], filters: &[(String, Glob)]) -> Result<Vec<(usize, Glob)>> {
    filters
        .iter()
        .map(|(column, glob)| {
            names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(column))
                .map(|i| (i, glob.clone()))
                .ok_or_else(|| {
                    CommandError::other(format!("filter column {} is not in the area", column))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::create_command;
    use crate::datetime::DateTimeValue;
    use crate::processor::ProcessorConfig;
    use crate::registry::WorkbookRegistry;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};
    use tsxl_core::{CellError, Style, WorksheetTable};
    use tsxl_xlsx::XlsxWriter;

    fn sample() -> (TempDir, CommandProcessor) {
        let dir = tempdir().unwrap();
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        let date = Style::new().number_format(NumberFormat::from_code("yyyy-mm-dd"));
        for (col, name) in ["Station", "Date", "Flow", "Count"].iter().enumerate() {
            sheet.set_cell_value_at(0, col as u16, *name).unwrap();
        }
        let rows: [(&str, f64, CellValue, f64); 4] = [
            ("North", 43831.0, CellValue::Number(1.5), 3.0),
            ("# skipped", 43832.0, CellValue::Number(2.0), 1.0),
            ("South", 43833.0, CellValue::Error(CellError::Div0), 4.0),
            ("Northeast", 43834.0, CellValue::string("n/a"), 5.4),
        ];
        for (i, (station, serial, flow, count)) in rows.into_iter().enumerate() {
            let r = i as u32 + 1;
            sheet.set_cell_value_at(r, 0, station).unwrap();
            sheet.set_cell_value_at(r, 1, serial).unwrap();
            sheet.set_cell_style_at(r, 1, &date).unwrap();
            sheet.set_cell_value_at(r, 2, flow).unwrap();
            sheet.set_cell_value_at(r, 3, count).unwrap();
        }
        wb.define_name("Flows", "Sheet1!$A$1:$D$5").unwrap();
        XlsxWriter::write_file(&wb, dir.path().join("in.xlsx")).unwrap();

        let processor = CommandProcessor::new(
            ProcessorConfig::default()
                .with_working_dir(dir.path())
                .with_registry(Arc::new(WorkbookRegistry::new())),
        );
        (dir, processor)
    }

    fn run(processor: &mut CommandProcessor, text: &str) -> CommandStatus {
        create_command(text).unwrap().run(processor).unwrap()
    }

    #[test]
    fn test_read_used_range_with_types() {
        let (_dir, mut p) = sample();
        let status = run(
            &mut p,
            r##"ReadTableFromExcel(TableID="T",InputFile="in.xlsx",Comment="#",ExcelIntegerColumns="Count",RowCountProperty="Rows")"##,
        );
        let t = p.table("t").unwrap();
        assert_eq!(t.field_names(), vec!["Station", "Date", "Flow", "Count"]);
        assert_eq!(t.fields()[1].field_type, FieldType::DateTime);
        assert_eq!(t.fields()[2].field_type, FieldType::Double);
        assert_eq!(t.fields()[2].precision, Some(6));
        assert_eq!(t.fields()[3].field_type, FieldType::Integer);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.value(0, 1), Some(&TableValue::DateTime("2020-01-01".parse::<DateTimeValue>().unwrap())));
        // Error cell and unparsable text both become null with warnings
        assert_eq!(t.value(1, 2), Some(&TableValue::Null));
        assert_eq!(t.value(2, 2), Some(&TableValue::Null));
        assert_eq!(t.value(2, 3), Some(&TableValue::Integer(5)));
        assert_eq!(status.messages().len(), 2);
        assert_eq!(p.property("Rows"), Some(&TableValue::Integer(3)));
    }

    #[test]
    fn test_named_range_filters_and_text() {
        let (_dir, mut p) = sample();
        run(
            &mut p,
            r#"ReadTableFromExcel(TableID="T",InputFile="in.xlsx",ExcelNamedRange="Flows",ColumnIncludeFilters="Station:North*",ColumnExcludeFilters="Station:*east",ReadAllAsText=True)"#,
        );
        let t = p.table("T").unwrap();
        assert_eq!(t.row_count(), 1);
        assert!(t.fields().iter().all(|f| f.field_type == FieldType::String));
        assert_eq!(t.value(0, 0), Some(&TableValue::from("North")));
        assert_eq!(t.value(0, 1), Some(&TableValue::from("2020-01-01")));
    }

    #[test]
    fn test_address_without_header() {
        let (_dir, mut p) = sample();
        run(
            &mut p,
            r#"ReadTableFromExcel(TableID="T",InputFile="in.xlsx",ExcelAddress="D2:D3",ExcelColumnNames="None",NumberPrecision="2")"#,
        );
        let t = p.table("T").unwrap();
        assert_eq!(t.field_names(), vec!["Column1"]);
        assert_eq!(t.formatted_value(0, 0), "3.00");
    }

    #[test]
    fn test_excel_table_uses_its_own_sheet_and_header() {
        let (dir, mut p) = sample();
        let mut wb = Workbook::new();
        let gauges = wb.add_worksheet_with_name("Gauges").unwrap();
        let sheet = wb.worksheet_mut(gauges).unwrap();
        // Cells above the table header must not be taken for column names
        sheet.set_cell_value("B1", "Report").unwrap();
        sheet.set_cell_value("B2", "Gauge").unwrap();
        sheet.set_cell_value("C2", "Reading").unwrap();
        sheet.set_cell_value("B3", "Upper").unwrap();
        sheet.set_cell_value("C3", 4.25).unwrap();
        sheet.set_cell_value("B4", "Total").unwrap();
        sheet.set_cell_value("C4", 4.25).unwrap();
        let mut table = WorksheetTable::new("Readings", CellRange::parse("B2:C4").unwrap())
            .with_columns(["Name", "Val"]);
        table.totals_row_count = 1;
        wb.add_table(gauges, table).unwrap();
        XlsxWriter::write_file(&wb, dir.path().join("tables.xlsx")).unwrap();

        run(
            &mut p,
            r#"ReadTableFromExcel(TableID="T",InputFile="tables.xlsx",Worksheet="Sheet1",ExcelTableName="readings",RowCountProperty="N")"#,
        );
        let t = p.table("T").unwrap();
        assert_eq!(t.field_names(), vec!["Name", "Val"]);
        assert_eq!(t.row_count(), 1);
        assert_eq!(t.value(0, 0), Some(&TableValue::from("Upper")));
        assert_eq!(t.value(0, 1), Some(&TableValue::Double(4.25)));
        assert_eq!(p.property("N"), Some(&TableValue::Integer(1)));

        let mut command = create_command(
            r#"ReadTableFromExcel(TableID="U",InputFile="tables.xlsx",ExcelTableName="Nope")"#,
        )
        .unwrap();
        assert!(matches!(command.run(&mut p), Err(CommandError::AreaNotFound(_))));
    }

    #[test]
    fn test_unknown_worksheet_and_filter_column() {
        let (_dir, mut p) = sample();
        let mut command = create_command(
            r#"ReadTableFromExcel(TableID="T",InputFile="in.xlsx",Worksheet="Nope")"#,
        )
        .unwrap();
        assert!(matches!(command.run(&mut p), Err(CommandError::WorksheetNotFound(_))));

        let mut command = create_command(
            r#"ReadTableFromExcel(TableID="T",InputFile="in.xlsx",ColumnIncludeFilters="Missing:*")"#,
        )
        .unwrap();
        assert!(command.run(&mut p).is_err());
        assert!(p.table("T").is_none());
    }
}
