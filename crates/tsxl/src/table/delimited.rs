//! Delimited (CSV) table files

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use super::{DataTable, FieldType, TableField, TableValue};
use crate::datetime::DateTimeValue;
use crate::error::Result;

/// Options for reading delimited files
#[derive(Debug, Clone)]
pub struct DelimitedReadOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Lines starting with this text are skipped (default: `#`)
    pub comment: String,
    /// Infer column types from the data; otherwise every column is text
    pub detect_types: bool,
}

impl Default for DelimitedReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            comment: "#".to_string(),
            detect_types: true,
        }
    }
}

/// Options for writing delimited files
#[derive(Debug, Clone)]
pub struct DelimitedWriteOptions {
    pub delimiter: u8,
    pub write_header: bool,
}

impl Default for DelimitedWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            write_header: true,
        }
    }
}

/// Reads a header row plus records into a [`DataTable`]
pub struct DelimitedReader;

impl DelimitedReader {
    pub fn read_file<P: AsRef<Path>>(
        path: P,
        table_id: &str,
        options: &DelimitedReadOptions,
    ) -> Result<DataTable> {
        let file = File::open(path)?;
        Self::read(file, table_id, options)
    }

    pub fn read<R: Read>(
        mut reader: R,
        table_id: &str,
        options: &DelimitedReadOptions,
    ) -> Result<DataTable> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let comment = options.comment.trim();
        let body: String = text
            .lines()
            .filter(|line| comment.is_empty() || !line.trim_start().starts_with(comment))
            .filter(|line| !line.trim().is_empty())
            .flat_map(|line| [line, "\n"])
            .collect();

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| match h.trim() {
                "" => format!("Column{}", i + 1),
                h => h.to_string(),
            })
            .collect();

        let mut raw: Vec<Vec<String>> = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();
            row.resize(headers.len(), String::new());
            raw.push(row);
        }

        let types: Vec<FieldType> = (0..headers.len())
            .map(|col| {
                if options.detect_types {
                    detect_type(raw.iter().map(|r| r[col].as_str()))
                } else {
                    FieldType::String
                }
            })
            .collect();

        let mut table = DataTable::new(table_id);
        for (name, field_type) in headers.iter().zip(&types) {
            table.add_field(TableField::new(name.clone(), *field_type));
        }
        let raw_decimals: Vec<usize> = (0..headers.len())
            .map(|col| {
                raw.iter()
                    .filter_map(|r| r[col].split_once('.'))
                    .map(|(_, frac)| frac.chars().take_while(char::is_ascii_digit).count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        for row in raw {
            let record = row
                .iter()
                .zip(&types)
                .map(|(text, t)| parse_as(text, *t))
                .collect();
            table.add_record(record)?;
        }

        // Double precision is the most decimals written in the column
        for (col, field_type) in types.iter().enumerate() {
            if *field_type == FieldType::Double {
                let precision = raw_decimals.get(col).copied().unwrap_or(0);
                if let Some(field) = table.field_mut(col) {
                    field.precision = Some(precision);
                }
            }
        }

        log::debug!(
            "read delimited table '{}': {} columns, {} rows",
            table_id,
            table.field_count(),
            table.row_count()
        );
        Ok(table)
    }
}

/// Column type that every non-empty value in `values` parses as
fn detect_type<'a>(values: impl Iterator<Item = &'a str> + Clone) -> FieldType {
    let mut non_empty = values.filter(|v| !v.is_empty()).peekable();
    if non_empty.peek().is_none() {
        return FieldType::String;
    }
    let all = |pred: &dyn Fn(&str) -> bool| non_empty.clone().all(pred);
    if all(&|v| v.parse::<i64>().is_ok()) {
        FieldType::Integer
    } else if all(&|v| v.parse::<f64>().is_ok()) {
        FieldType::Double
    } else if all(&|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
        FieldType::Boolean
    } else if all(&|v| v.parse::<DateTimeValue>().is_ok()) {
        FieldType::DateTime
    } else {
        FieldType::String
    }
}

fn parse_as(text: &str, field_type: FieldType) -> TableValue {
    if text.is_empty() {
        return TableValue::Null;
    }
    let parsed = match field_type {
        FieldType::Integer => text.parse().ok().map(TableValue::Integer),
        FieldType::Double => text.parse().ok().map(TableValue::Double),
        FieldType::Boolean => Some(TableValue::Boolean(text.eq_ignore_ascii_case("true"))),
        FieldType::DateTime => text.parse().ok().map(TableValue::DateTime),
        FieldType::String => None,
    };
    parsed.unwrap_or_else(|| TableValue::String(text.to_string()))
}

/// Writes a [`DataTable`] as delimited text
pub struct DelimitedWriter;

impl DelimitedWriter {
    pub fn write_file<P: AsRef<Path>>(
        table: &DataTable,
        path: P,
        options: &DelimitedWriteOptions,
    ) -> Result<()> {
        let file = File::create(path)?;
        Self::write(table, file, options)
    }

    pub fn write<W: Write>(table: &DataTable, writer: W, options: &DelimitedWriteOptions) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .from_writer(writer);

        if options.write_header {
            csv_writer.write_record(table.fields().iter().map(|f| f.name.as_str()))?;
        }
        for row in 0..table.row_count() {
            let record: Vec<String> = (0..table.field_count())
                .map(|col| table.formatted_value(row, col))
                .collect();
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "# Flows for the test basin\n\
        Station,Date,Flow,Count,Active\n\
        # mid-file comment\n\
        A,2020-01-01,1.5,3,true\n\
        B,2020-01-02,,4,false\n\
        \"C, east\",2020-01-03,2.25,5,TRUE\n";

    #[test]
    fn test_read_types() {
        let t = DelimitedReader::read(SAMPLE.as_bytes(), "Flows", &Default::default()).unwrap();
        assert_eq!(t.field_names(), vec!["Station", "Date", "Flow", "Count", "Active"]);
        let types: Vec<FieldType> = t.fields().iter().map(|f| f.field_type).collect();
        assert_eq!(
            types,
            vec![
                FieldType::String,
                FieldType::DateTime,
                FieldType::Double,
                FieldType::Integer,
                FieldType::Boolean
            ]
        );
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.value(1, 2), Some(&TableValue::Null));
        assert_eq!(t.value(2, 0), Some(&TableValue::String("C, east".into())));
        assert_eq!(t.value(2, 4), Some(&TableValue::Boolean(true)));
    }

    #[test]
    fn test_read_without_detection() {
        let options = DelimitedReadOptions {
            detect_types: false,
            ..Default::default()
        };
        let t = DelimitedReader::read(SAMPLE.as_bytes(), "Flows", &options).unwrap();
        assert!(t.fields().iter().all(|f| f.field_type == FieldType::String));
        assert_eq!(t.value(0, 3), Some(&TableValue::String("3".into())));
    }

    #[test]
    fn test_write() {
        let t = DelimitedReader::read(SAMPLE.as_bytes(), "Flows", &Default::default()).unwrap();
        let mut out = Vec::new();
        DelimitedWriter::write(&t, &mut out, &Default::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Station,Date,Flow,Count,Active");
        assert_eq!(lines[1], "A,2020-01-01,1.50,3,true");
        assert_eq!(lines[2], "B,2020-01-02,,4,false");
        assert_eq!(lines[3], "\"C, east\",2020-01-03,2.25,5,true");
    }
}
