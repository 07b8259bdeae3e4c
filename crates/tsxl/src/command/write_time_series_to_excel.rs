//! `WriteTimeSeriesToExcel`

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tsxl_core::Workbook;

use crate::area::{ExcelArea, ExcelColumnNames};
use crate::command::output::{check_style_tables, output_origin, write_value, CellStyler};
use crate::command::{Args, CheckResult, Command, CommandStatus, ParameterCheck};
use crate::datetime::DateTimeValue;
use crate::error::{CommandError, Result};
use crate::processor::CommandProcessor;
use crate::registry::OpenMode;
use crate::table::TableValue;
use crate::timeseries::{TimeInterval, TimeSeries};

/// Which time series a command works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TsList {
    #[default]
    AllTs,
    /// Series whose alias or TSID matches the `TSID` pattern
    AllMatchingTsid,
}

impl TsList {
    pub const NAMES: &'static [&'static str] = &["AllTS", "AllMatchingTSID"];
}

impl fmt::Display for TsList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TsList::AllTs => "AllTS",
            TsList::AllMatchingTsid => "AllMatchingTSID",
        })
    }
}

impl FromStr for TsList {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("AllTS") {
            Ok(TsList::AllTs)
        } else if s.eq_ignore_ascii_case("AllMatchingTSID") {
            Ok(TsList::AllMatchingTsid)
        } else {
            Err(format!("expected one of {}", Self::NAMES.join(", ")))
        }
    }
}

/// `Blank` or a number written in place of missing values
fn parse_missing(value: &str) -> std::result::Result<Option<f64>, String> {
    if value.eq_ignore_ascii_case("Blank") {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| "expected Blank or a number".to_string())
}

/// Column heading for a series: `%A` is the alias (or TSID when there is
/// none) and `%I` the TSID
fn value_column_name(format: &str, ts: &TimeSeries) -> String {
    let alias = if ts.alias.is_empty() { ts.tsid() } else { ts.alias.clone() };
    format.replace("%A", &alias).replace("%I", &ts.tsid())
}

command_struct!(
    /// `WriteTimeSeriesToExcel`: write series side by side, one row per
    /// date-time
    ///
    /// The first column holds date-times over the union of the selected
    /// series' periods, clipped to `OutputStart`/`OutputEnd`. Every series
    /// must have the same interval.
    WriteTimeSeriesToExcel,
    "WriteTimeSeriesToExcel"
);

struct WriteOptions {
    worksheet: Option<String>,
    area: ExcelArea,
    headers: bool,
    datetime_column: String,
    value_columns: String,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    missing: Option<f64>,
    precision: Option<usize>,
}

impl Command for WriteTimeSeriesToExcel {
    command_accessors!();

    fn valid_parameters(&self) -> &'static [&'static str] {
        &[
            "TSList",
            "TSID",
            "OutputFile",
            "Worksheet",
            "ExcelAddress",
            "ExcelNamedRange",
            "ExcelTableName",
            "ExcelColumnNames",
            "DateTimeColumn",
            "ValueColumns",
            "OutputStart",
            "OutputEnd",
            "MissingValue",
            "Precision",
            "ConditionTableID",
            "StyleTableID",
            "KeepOpen",
        ]
    }

    fn check_parameters(&self, processor: &CommandProcessor) -> CheckResult {
        let mut check = ParameterCheck::new(&self.parameters, processor);
        check
            .enumeration("TSList", TsList::NAMES)
            .require("OutputFile")
            .area()
            .enumeration("ExcelColumnNames", &["FirstRowInRange", "None"])
            .validate("OutputStart", DateTimeValue::from_str)
            .validate("OutputEnd", DateTimeValue::from_str)
            .validate("MissingValue", parse_missing)
            .integer("Precision", 0..=15)
            .boolean("KeepOpen")
            .unknown(self.valid_parameters());
        let matching = check
            .args()
            .get("TSList")
            .is_some_and(|v| v.eq_ignore_ascii_case("AllMatchingTSID"));
        if matching && check.args().get("TSID").is_none() {
            check.problem("TSID must be specified when TSList=AllMatchingTSID");
        }
        check_style_tables(&mut check);
        check.finish()
    }

    fn execute(&mut self, processor: &mut CommandProcessor, status: &mut CommandStatus) -> Result<()> {
        let processor: &CommandProcessor = processor;
        let args = Args::new(&self.parameters, processor);
        let path = args.require_path("OutputFile")?;
        let keep_open = args.keep_open()?;
        let pattern = match args.parse::<TsList>("TSList")?.unwrap_or_default() {
            TsList::AllTs => "*".to_string(),
            TsList::AllMatchingTsid => args.require("TSID")?,
        };
        let series = processor.find_time_series(&pattern)?;
        if series.is_empty() {
            return Err(CommandError::TimeSeriesNotFound(pattern));
        }
        let styler = CellStyler::from_args(&args, processor)?;
        let column_names: ExcelColumnNames = args.parse("ExcelColumnNames")?.unwrap_or_default();
        let options = WriteOptions {
            worksheet: args.worksheet(),
            area: args.area()?,
            headers: column_names != ExcelColumnNames::None,
            datetime_column: args.get("DateTimeColumn").unwrap_or_else(|| "DateTime".to_string()),
            value_columns: args.get("ValueColumns").unwrap_or_else(|| "%A".to_string()),
            start: args.parse::<DateTimeValue>("OutputStart")?.map(|d| d.value()),
            end: args.parse::<DateTimeValue>("OutputEnd")?.map(|d| d.value()),
            missing: match args.get("MissingValue") {
                Some(v) => parse_missing(&v).map_err(|e| CommandError::invalid_value(&v, e))?,
                None => None,
            },
            precision: args.parse("Precision")?,
        };

        let registry = Arc::clone(&processor.config().registry);
        let rows = registry.with_workbook(&path, OpenMode::Write, keep_open, |workbook| {
            write_series(workbook, &series, &options, styler.as_ref(), status)
        })?;
        log::info!(
            "wrote {} series ({} rows) to {}",
            series.len(),
            rows,
            path.display()
        );
        Ok(())
    }
}

/// Interval shared by every series, or an error naming the mismatch
fn common_interval(series: &[&TimeSeries]) -> Result<TimeInterval> {
    let interval = series[0].interval();
    match series.iter().find(|ts| ts.interval() != interval) {
        Some(other) => Err(CommandError::other(format!(
            "time series {} has interval {} but {} has {}; all must match",
            other.tsid(),
            other.interval(),
            series[0].tsid(),
            interval
        ))),
        None => Ok(interval),
    }
}

/// Date-times from the earliest start to the latest end, clipped to the
/// requested output period
fn output_dates(series: &[&TimeSeries], options: &WriteOptions) -> Result<Vec<NaiveDateTime>> {
    let interval = common_interval(series)?;
    let precision = interval.precision();
    let (Some(first), Some(last)) = (
        series.iter().map(|ts| ts.start()).min(),
        series.iter().map(|ts| ts.end()).max(),
    ) else {
        return Ok(Vec::new());
    };
    let start = options
        .start
        .map_or(first, |s| DateTimeValue::new(s, precision).value());
    let end = options
        .end
        .map_or(last, |e| DateTimeValue::new(e, precision).value());

    // Step from the series' own start so clipped output stays on the interval
    let mut dates = Vec::new();
    let mut step = 0;
    while let Some(dt) = interval.advance(first, step) {
        if dt > end {
            break;
        }
        if dt >= start {
            dates.push(dt);
        }
        step += 1;
    }
    Ok(dates)
}

fn write_series(
    workbook: &mut Workbook,
    series: &[&TimeSeries],
    options: &WriteOptions,
    styler: Option<&CellStyler>,
    status: &mut CommandStatus,
) -> Result<usize> {
    let dates = output_dates(series, options)?;
    if dates.is_empty() {
        status.warn("the output period holds no date-times; only headers are written");
    }
    let precision = common_interval(series)?.precision();
    let origin = output_origin(workbook, options.worksheet.as_deref(), &options.area)?;
    if let Some(available) = origin.rows {
        let needed = dates.len() as u32 + u32::from(options.headers);
        if needed > available {
            status.warn(format!(
                "{} rows are needed but the area has {}; writing past the area",
                needed, available
            ));
        }
    }

    let date_1904 = workbook.is_date_1904();
    let sheet = workbook
        .worksheet_mut(origin.sheet_index)
        .ok_or_else(|| CommandError::other("output worksheet is missing"))?;
    let columns: Vec<String> = series
        .iter()
        .map(|ts| value_column_name(&options.value_columns, ts))
        .collect();
    let mut row = origin.cell.row;
    if options.headers {
        sheet.set_cell_value_at(row, origin.cell.col, options.datetime_column.as_str())?;
        for (j, name) in columns.iter().enumerate() {
            sheet.set_cell_value_at(row, origin.cell.col + 1 + j as u16, name.as_str())?;
        }
        row += 1;
    }

    let mut missing_count = 0;
    for dt in &dates {
        let date = TableValue::DateTime(DateTimeValue::new(*dt, precision));
        let overlay = styler.and_then(|s| s.style_for(&options.datetime_column, &date));
        write_value(sheet, row, origin.cell.col, &date, None, date_1904, overlay)?;
        for (j, ts) in series.iter().enumerate() {
            let value = match ts.value_at(*dt).or(options.missing) {
                Some(v) => TableValue::Double(v),
                None => {
                    missing_count += 1;
                    TableValue::Null
                }
            };
            let overlay = styler.and_then(|s| s.style_for(&columns[j], &value));
            write_value(
                sheet,
                row,
                origin.cell.col + 1 + j as u16,
                &value,
                options.precision,
                date_1904,
                overlay,
            )?;
        }
        row += 1;
    }
    if missing_count > 0 {
        log::debug!("{} missing values written as blank cells", missing_count);
    }
    Ok(dates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{create_command, Severity};
    use crate::processor::ProcessorConfig;
    use crate::registry::WorkbookRegistry;
    use crate::timeseries::TsIdent;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};
    use tsxl_core::CellValue;
    use tsxl_xlsx::XlsxReader;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn series(tsid: &str, alias: &str, first: u32, values: &[Option<f64>]) -> TimeSeries {
        let ident: TsIdent = tsid.parse().unwrap();
        let mut ts = TimeSeries::new(ident, day(first), day(first + values.len() as u32 - 1)).unwrap();
        ts.alias = alias.to_string();
        for (i, v) in values.iter().enumerate() {
            ts.set_value(day(first + i as u32), *v).unwrap();
        }
        ts
    }

    fn processor() -> (TempDir, CommandProcessor) {
        let dir = tempdir().unwrap();
        let mut p = CommandProcessor::new(
            ProcessorConfig::default()
                .with_working_dir(dir.path())
                .with_registry(Arc::new(WorkbookRegistry::new())),
        );
        p.add_time_series(series("Gage1.USGS.Flow.Day", "Upper", 1, &[Some(1.0), None, Some(3.0)]));
        p.add_time_series(series("Gage2.USGS.Flow.Day", "", 2, &[Some(20.0), Some(30.0), Some(40.0)]));
        (dir, p)
    }

    fn run(p: &mut CommandProcessor, text: &str) -> CommandStatus {
        create_command(text).unwrap().run(p).unwrap()
    }

    #[test]
    fn test_union_period_with_headers() {
        let (dir, mut p) = processor();
        run(
            &mut p,
            r#"WriteTimeSeriesToExcel(OutputFile="ts.xlsx",Worksheet="Flows",ValueColumns="%A cfs",Precision=1)"#,
        );
        let wb = XlsxReader::read_file(dir.path().join("ts.xlsx")).unwrap();
        let sheet = wb.worksheet_by_name("Flows").unwrap();
        assert_eq!(sheet.get_value_at(0, 0), &CellValue::string("DateTime"));
        assert_eq!(sheet.get_value_at(0, 1), &CellValue::string("Upper cfs"));
        assert_eq!(sheet.get_value_at(0, 2), &CellValue::string("Gage2.USGS.Flow.Day cfs"));
        // 2020-01-01 .. 2020-01-04
        assert_eq!(sheet.get_value_at(1, 0), &CellValue::Number(43831.0));
        assert_eq!(sheet.get_value_at(4, 0), &CellValue::Number(43834.0));
        assert_eq!(sheet.cell_style_at(1, 0).number_format.code(), Some("yyyy-mm-dd"));
        assert_eq!(sheet.get_value_at(1, 1), &CellValue::Number(1.0));
        assert!(sheet.get_value_at(2, 1).is_empty());
        assert!(sheet.get_value_at(4, 1).is_empty());
        assert!(sheet.get_value_at(1, 2).is_empty());
        assert_eq!(sheet.get_value_at(4, 2), &CellValue::Number(40.0));
        assert_eq!(sheet.cell_style_at(4, 2).number_format.code(), Some("0.0"));
        assert!(sheet.get_value_at(5, 0).is_empty());
    }

    #[test]
    fn test_matching_period_and_missing_value() {
        let (dir, mut p) = processor();
        run(
            &mut p,
            r#"WriteTimeSeriesToExcel(TSList=AllMatchingTSID,TSID="Up*",OutputFile="ts.xlsx",ExcelAddress="C3",ExcelColumnNames=None,ValueColumns="%I",OutputStart="2020-01-02",OutputEnd="2020-01-03",MissingValue=-999)"#,
        );
        let wb = XlsxReader::read_file(dir.path().join("ts.xlsx")).unwrap();
        let sheet = wb.worksheet(0).unwrap();
        assert_eq!(sheet.get_value_at(2, 2), &CellValue::Number(43832.0));
        assert_eq!(sheet.get_value_at(2, 3), &CellValue::Number(-999.0));
        assert_eq!(sheet.get_value_at(3, 3), &CellValue::Number(3.0));
        assert!(sheet.get_value_at(4, 2).is_empty());
        assert!(sheet.get_value_at(2, 4).is_empty());
    }

    #[test]
    fn test_check_and_errors() {
        let (_dir, mut p) = processor();
        let mut no_tsid =
            create_command(r#"WriteTimeSeriesToExcel(TSList=AllMatchingTSID,OutputFile="a.xlsx")"#).unwrap();
        assert!(matches!(no_tsid.run(&mut p), Err(CommandError::InvalidParameters(v)) if v.len() == 1));

        let mut bad_missing =
            create_command(r#"WriteTimeSeriesToExcel(OutputFile="a.xlsx",MissingValue=None)"#).unwrap();
        assert!(matches!(bad_missing.run(&mut p), Err(CommandError::InvalidParameters(_))));

        let mut nothing = create_command(
            r#"WriteTimeSeriesToExcel(TSList=AllMatchingTSID,TSID="Nope*",OutputFile="a.xlsx")"#,
        )
        .unwrap();
        assert!(matches!(nothing.run(&mut p), Err(CommandError::TimeSeriesNotFound(_))));

        let ident: TsIdent = "Gage3.USGS.Flow.Month".parse().unwrap();
        p.add_time_series(TimeSeries::new(ident, day(1), day(1)).unwrap());
        let mut mixed = create_command(r#"WriteTimeSeriesToExcel(OutputFile="a.xlsx")"#).unwrap();
        assert!(mixed.run(&mut p).is_err());
    }

    #[test]
    fn test_empty_period_warns() {
        let (_dir, mut p) = processor();
        let status = run(
            &mut p,
            r#"WriteTimeSeriesToExcel(OutputFile="a.xlsx",OutputStart="2021-01-01")"#,
        );
        assert_eq!(status.severity(), Severity::Warning);
    }
}
