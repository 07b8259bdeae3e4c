//! In-memory data tables
//!
//! A [`DataTable`] is the processor's generic tabular container: an ordered
//! list of typed [`TableField`]s and a list of records. Excel and delimited
//! file commands read into and write out of it.

pub mod delimited;

use std::fmt;
use std::str::FromStr;

use crate::datetime::DateTimeValue;
use crate::error::{CommandError, Result};
use crate::pattern::Glob;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Double,
    String,
    Boolean,
    DateTime,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Integer => "Integer",
            FieldType::Double => "Double",
            FieldType::String => "String",
            FieldType::Boolean => "Boolean",
            FieldType::DateTime => "DateTime",
        };
        f.write_str(s)
    }
}

impl FromStr for FieldType {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(FieldType::Integer),
            "double" | "float" | "number" => Ok(FieldType::Double),
            "string" | "text" => Ok(FieldType::String),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "datetime" | "date" => Ok(FieldType::DateTime),
            _ => Err(CommandError::invalid_value(s, "unknown field type")),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct TableField {
    pub name: String,
    pub field_type: FieldType,
    /// Display width in characters, when known
    pub width: Option<usize>,
    /// Digits after the decimal point for Double columns
    pub precision: Option<usize>,
}

impl TableField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            width: None,
            precision: None,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }
}

/// A single table cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TableValue {
    #[default]
    Null,
    Integer(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    DateTime(DateTimeValue),
}

impl TableValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TableValue::Null)
    }

    /// The natural column type of this value; `None` for null
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            TableValue::Null => None,
            TableValue::Integer(_) => Some(FieldType::Integer),
            TableValue::Double(_) => Some(FieldType::Double),
            TableValue::String(_) => Some(FieldType::String),
            TableValue::Boolean(_) => Some(FieldType::Boolean),
            TableValue::DateTime(_) => Some(FieldType::DateTime),
        }
    }

    /// Numeric view of the value, parsing strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TableValue::Integer(i) => Some(*i as f64),
            TableValue::Double(d) => Some(*d),
            TableValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text with Double values shown at `precision` digits
    pub fn format(&self, precision: Option<usize>) -> String {
        match (self, precision) {
            (TableValue::Double(d), Some(p)) if d.is_finite() => format!("{:.*}", p, d),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for TableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableValue::Null => Ok(()),
            TableValue::Integer(i) => write!(f, "{}", i),
            TableValue::Double(d) => write!(f, "{}", d),
            TableValue::String(s) => f.write_str(s),
            TableValue::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            TableValue::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

impl From<&str> for TableValue {
    fn from(s: &str) -> Self {
        TableValue::String(s.to_string())
    }
}

impl From<String> for TableValue {
    fn from(s: String) -> Self {
        TableValue::String(s)
    }
}

impl From<f64> for TableValue {
    fn from(v: f64) -> Self {
        TableValue::Double(v)
    }
}

impl From<i64> for TableValue {
    fn from(v: i64) -> Self {
        TableValue::Integer(v)
    }
}

impl From<bool> for TableValue {
    fn from(v: bool) -> Self {
        TableValue::Boolean(v)
    }
}

impl From<DateTimeValue> for TableValue {
    fn from(v: DateTimeValue) -> Self {
        TableValue::DateTime(v)
    }
}

/// Ordered fields plus records
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    id: String,
    fields: Vec<TableField>,
    records: Vec<Vec<TableValue>>,
}

impl DataTable {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Create a table with the given fields
    pub fn with_fields(id: impl Into<String>, fields: Vec<TableField>) -> Self {
        Self {
            id: id.into(),
            fields,
            records: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Append a field; existing records get a null value for it
    pub fn add_field(&mut self, field: TableField) -> usize {
        self.fields.push(field);
        for record in &mut self.records {
            record.push(TableValue::Null);
        }
        self.fields.len() - 1
    }

    pub fn fields(&self) -> &[TableField] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&TableField> {
        self.fields.get(index)
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut TableField> {
        self.fields.get_mut(index)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Index of a field by name, ignoring case
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Append a record; its length must match the field count
    pub fn add_record(&mut self, record: Vec<TableValue>) -> Result<usize> {
        if record.len() != self.fields.len() {
            return Err(CommandError::other(format!(
                "table '{}': record has {} values but the table has {} fields",
                self.id,
                record.len(),
                self.fields.len()
            )));
        }
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &[TableValue]> {
        self.records.iter().map(Vec::as_slice)
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&TableValue> {
        self.records.get(row).and_then(|r| r.get(col))
    }

    /// Set a value, appending null records until `row` exists
    pub fn set_value(&mut self, row: usize, col: usize, value: TableValue) -> Result<()> {
        if col >= self.fields.len() {
            return Err(CommandError::other(format!(
                "table '{}' has no column {}",
                self.id, col
            )));
        }
        let width = self.fields.len();
        while self.records.len() <= row {
            self.records.push(vec![TableValue::Null; width]);
        }
        self.records[row][col] = value;
        Ok(())
    }

    /// Value formatted with its field's precision
    pub fn formatted_value(&self, row: usize, col: usize) -> String {
        let precision = self.fields.get(col).and_then(|f| f.precision);
        self.value(row, col)
            .map(|v| v.format(precision))
            .unwrap_or_default()
    }

    /// Column indexes selected by include and exclude glob patterns
    ///
    /// An empty include list selects every column. Order follows the table.
    pub fn select_columns(&self, include: &[String], exclude: &[String]) -> Result<Vec<usize>> {
        let include = include
            .iter()
            .map(|p| Glob::new(p))
            .collect::<Result<Vec<_>>>()?;
        let exclude = exclude
            .iter()
            .map(|p| Glob::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| include.is_empty() || include.iter().any(|g| g.is_match(&f.name)))
            .filter(|(_, f)| !exclude.iter().any(|g| g.is_match(&f.name)))
            .map(|(i, _)| i)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flows() -> DataTable {
        let mut t = DataTable::with_fields(
            "Flows",
            vec![
                TableField::new("Station", FieldType::String),
                TableField::new("FlowMax", FieldType::Double).with_precision(2),
                TableField::new("FlowMin", FieldType::Double),
            ],
        );
        t.add_record(vec!["A".into(), 10.456.into(), 1.0.into()]).unwrap();
        t
    }

    #[test]
    fn test_field_lookup_ignores_case() {
        let t = flows();
        assert_eq!(t.field_index("flowmax"), Some(1));
        assert_eq!(t.field_index("Missing"), None);
        assert_eq!(t.formatted_value(0, 1), "10.46");
    }

    #[test]
    fn test_set_value_appends_rows() {
        let mut t = flows();
        t.set_value(3, 0, "D".into()).unwrap();
        assert_eq!(t.row_count(), 4);
        assert_eq!(t.value(2, 0), Some(&TableValue::Null));
        assert!(t.set_value(0, 9, TableValue::Null).is_err());
        assert!(t.add_record(vec![TableValue::Null]).is_err());
    }

    #[test]
    fn test_add_field_pads_records() {
        let mut t = flows();
        let idx = t.add_field(TableField::new("Note", FieldType::String));
        assert_eq!(idx, 3);
        assert_eq!(t.value(0, 3), Some(&TableValue::Null));
    }

    #[test]
    fn test_select_columns() {
        let t = flows();
        assert_eq!(t.select_columns(&[], &[]).unwrap(), vec![0, 1, 2]);
        assert_eq!(t.select_columns(&["Flow*".into()], &[]).unwrap(), vec![1, 2]);
        assert_eq!(
            t.select_columns(&["Flow*".into()], &["*min".into()]).unwrap(),
            vec![1]
        );
    }

    #[test]
    fn test_field_type_parse() {
        assert_eq!("DateTime".parse::<FieldType>().unwrap(), FieldType::DateTime);
        assert_eq!("int".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert!("blob".parse::<FieldType>().is_err());
    }
}
