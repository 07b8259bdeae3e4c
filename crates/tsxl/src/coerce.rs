//! Cell values to table values and back

use tsxl_core::{
    datetime_to_serial, serial_to_datetime, CellError, CellValue, NumberFormat,
};

use crate::datetime::{DateTimePrecision, DateTimeValue};
use crate::table::{FieldType, TableValue};

/// Convert one cell to a table value
///
/// Numbers shown with a date format become date-times; strings are trimmed
/// and blank strings are null. Formulas use their cached result. An error
/// cell is returned as `Err` so the caller can name the cell in a warning.
pub fn cell_to_value(
    value: &CellValue,
    format: &NumberFormat,
    date_1904: bool,
) -> Result<TableValue, CellError> {
    match value {
        CellValue::Empty => Ok(TableValue::Null),
        CellValue::Boolean(b) => Ok(TableValue::Boolean(*b)),
        CellValue::String(s) => match s.trim() {
            "" => Ok(TableValue::Null),
            t => Ok(TableValue::String(t.to_string())),
        },
        CellValue::Number(n) => {
            if format.is_date_format() {
                if let Some(dt) = serial_to_datetime(*n, date_1904) {
                    let precision = format
                        .code()
                        .map(precision_for_format)
                        .unwrap_or(DateTimePrecision::Day);
                    return Ok(TableValue::DateTime(DateTimeValue::new(dt, precision)));
                }
            }
            Ok(TableValue::Double(*n))
        }
        CellValue::Error(e) => Err(*e),
        CellValue::Formula { cached_value, .. } => match cached_value {
            Some(v) => cell_to_value(v, format, date_1904),
            None => Ok(TableValue::Null),
        },
    }
}

/// Precision a date number format displays
pub fn precision_for_format(code: &str) -> DateTimePrecision {
    // Drop quoted literals and bracketed colors/conditions
    let mut cleaned = String::with_capacity(code.len());
    let mut in_quote = false;
    let mut in_bracket = false;
    for c in code.chars() {
        match c {
            '"' => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            _ if in_quote || in_bracket => {}
            _ => cleaned.push(c.to_ascii_lowercase()),
        }
    }
    if cleaned.contains('s') {
        DateTimePrecision::Second
    } else if cleaned.contains('h') {
        if cleaned.contains(":m") {
            DateTimePrecision::Minute
        } else {
            DateTimePrecision::Hour
        }
    } else if cleaned.contains('d') {
        DateTimePrecision::Day
    } else if cleaned.contains('m') {
        DateTimePrecision::Month
    } else {
        DateTimePrecision::Year
    }
}

/// Type of a column: the type of its first non-null value, or String
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a TableValue>) -> FieldType {
    values
        .into_iter()
        .find_map(TableValue::field_type)
        .unwrap_or(FieldType::String)
}

/// Convert a value to a column type
///
/// Any value converts to String. Failures return the reason, and the caller
/// stores null.
pub fn convert(value: TableValue, to: FieldType) -> Result<TableValue, String> {
    if value.field_type().map_or(true, |t| t == to) {
        return Ok(value);
    }
    let fail = |v: &TableValue| Err(format!("'{}' is not a valid {}", v, to));
    match to {
        FieldType::String => Ok(TableValue::String(value.to_string())),
        FieldType::Integer => match &value {
            TableValue::Double(d) if d.is_finite() => Ok(TableValue::Integer(d.round() as i64)),
            TableValue::Boolean(b) => Ok(TableValue::Integer(i64::from(*b))),
            TableValue::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(TableValue::Integer(i)),
                Err(_) => match s.trim().parse::<f64>() {
                    Ok(d) if d.is_finite() => Ok(TableValue::Integer(d.round() as i64)),
                    _ => fail(&value),
                },
            },
            _ => fail(&value),
        },
        FieldType::Double => match &value {
            TableValue::Integer(i) => Ok(TableValue::Double(*i as f64)),
            TableValue::Boolean(b) => Ok(TableValue::Double(if *b { 1.0 } else { 0.0 })),
            TableValue::String(s) => s
                .trim()
                .parse()
                .map(TableValue::Double)
                .or_else(|_| fail(&value)),
            _ => fail(&value),
        },
        FieldType::Boolean => match &value {
            TableValue::Integer(i) => Ok(TableValue::Boolean(*i != 0)),
            TableValue::Double(d) => Ok(TableValue::Boolean(*d != 0.0)),
            TableValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(TableValue::Boolean(true)),
                "false" | "no" | "0" => Ok(TableValue::Boolean(false)),
                _ => fail(&value),
            },
            _ => fail(&value),
        },
        FieldType::DateTime => match &value {
            TableValue::String(s) => s
                .parse::<DateTimeValue>()
                .map(TableValue::DateTime)
                .or_else(|_| fail(&value)),
            _ => fail(&value),
        },
    }
}

/// Cell value plus the number format a table value should be written with
///
/// Date-times become serials formatted to their precision; Double values
/// with a precision get a fixed-decimals format. `None` means keep the
/// cell's existing format.
pub fn value_to_cell(
    value: &TableValue,
    precision: Option<usize>,
    date_1904: bool,
) -> (CellValue, Option<NumberFormat>) {
    match value {
        TableValue::Null => (CellValue::Empty, None),
        TableValue::Integer(i) => (CellValue::Number(*i as f64), None),
        TableValue::Double(d) => (
            CellValue::Number(*d),
            precision.map(NumberFormat::decimals),
        ),
        TableValue::String(s) => (CellValue::String(s.clone()), None),
        TableValue::Boolean(b) => (CellValue::Boolean(*b), None),
        TableValue::DateTime(dt) => match datetime_to_serial(dt.value(), date_1904) {
            Some(serial) => (
                CellValue::Number(serial),
                Some(NumberFormat::from_code(dt.precision().excel_format())),
            ),
            // Before the epoch: Excel cannot show it as a date
            None => (CellValue::String(dt.to_string()), None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date_format(code: &str) -> NumberFormat {
        NumberFormat::from_code(code)
    }

    #[test]
    fn test_cell_to_value_basic() {
        let general = NumberFormat::General;
        assert_eq!(cell_to_value(&CellValue::Empty, &general, false), Ok(TableValue::Null));
        assert_eq!(
            cell_to_value(&CellValue::string("  x "), &general, false),
            Ok(TableValue::String("x".into()))
        );
        assert_eq!(cell_to_value(&CellValue::string("   "), &general, false), Ok(TableValue::Null));
        assert_eq!(
            cell_to_value(&CellValue::Number(2.5), &general, false),
            Ok(TableValue::Double(2.5))
        );
        assert_eq!(
            cell_to_value(&CellValue::Error(CellError::Div0), &general, false),
            Err(CellError::Div0)
        );
    }

    #[test]
    fn test_dates_and_formulas() {
        let value = cell_to_value(&CellValue::Number(43831.0), &date_format("yyyy-mm-dd"), false).unwrap();
        match value {
            TableValue::DateTime(dt) => {
                assert_eq!(dt.value().date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
                assert_eq!(dt.precision(), DateTimePrecision::Day);
            }
            other => panic!("expected date, got {:?}", other),
        }

        let formula = CellValue::Formula {
            text: "=A1".into(),
            cached_value: Some(Box::new(CellValue::Number(43831.5))),
        };
        let value = cell_to_value(&formula, &date_format("yyyy-mm-dd hh:mm"), false).unwrap();
        assert_eq!(value.to_string(), "2020-01-01 12:00");

        let uncached = CellValue::formula("=A1");
        assert_eq!(cell_to_value(&uncached, &NumberFormat::General, false), Ok(TableValue::Null));
    }

    #[test]
    fn test_precision_for_format() {
        assert_eq!(precision_for_format("yyyy"), DateTimePrecision::Year);
        assert_eq!(precision_for_format("mmm-yy"), DateTimePrecision::Month);
        assert_eq!(precision_for_format("m/d/yy h:mm"), DateTimePrecision::Minute);
        assert_eq!(precision_for_format("[Red]\"day\" hh"), DateTimePrecision::Hour);
        assert_eq!(precision_for_format("h:mm:ss"), DateTimePrecision::Second);
    }

    #[test]
    fn test_convert() {
        assert_eq!(convert(TableValue::Double(3.0), FieldType::Integer), Ok(TableValue::Integer(3)));
        assert_eq!(
            convert(TableValue::String("12".into()), FieldType::Double),
            Ok(TableValue::Double(12.0))
        );
        assert!(convert(TableValue::String("abc".into()), FieldType::Double).is_err());
        assert_eq!(
            convert(TableValue::Double(1.5), FieldType::String),
            Ok(TableValue::String("1.5".into()))
        );
        assert_eq!(convert(TableValue::Null, FieldType::Integer), Ok(TableValue::Null));
        assert!(matches!(
            convert(TableValue::String("2021-04".into()), FieldType::DateTime),
            Ok(TableValue::DateTime(_))
        ));
    }

    #[test]
    fn test_infer_column_type() {
        let values = [TableValue::Null, TableValue::Integer(1), TableValue::String("x".into())];
        assert_eq!(infer_column_type(&values), FieldType::Integer);
        assert_eq!(infer_column_type(&[TableValue::Null]), FieldType::String);
    }

    #[test]
    fn test_value_to_cell() {
        let dt: DateTimeValue = "2020-01".parse().unwrap();
        let (cell, format) = value_to_cell(&TableValue::DateTime(dt), None, false);
        assert_eq!(cell, CellValue::Number(43831.0));
        assert_eq!(format.unwrap().code(), Some("yyyy-mm"));
        let (_, format) = value_to_cell(&TableValue::Double(1.0), Some(3), false);
        assert_eq!(format.unwrap().code(), Some("0.000"));
    }
}
