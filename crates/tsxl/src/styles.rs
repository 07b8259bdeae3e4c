//! Style tables and condition tables
//!
//! Commands that write cells take two optional tables. A style table
//! defines named cell styles, one per row. A condition table says which
//! style applies to which column when a value satisfies a condition:
//!
//! | Column | Condition        | StyleID |
//! |--------|------------------|---------|
//! | Flow   | `> 100`          | high    |
//! | *      | `isempty`        | missing |
//! | Flow   | `>= 50 and < 100`| medium  |
//!
//! Conditions are checked in table order and the last match wins.

use ahash::AHashMap;
use tsxl_core::conditional_format::quote_formula_string;
use tsxl_core::{
    BorderLineStyle, CellAddress, CellRange, CfOperator, Color, ConditionalFormatRule,
    FillStyle, HorizontalAlignment, NumberFormat, Style,
};

use crate::datetime::DateTimeValue;
use crate::error::{CommandError, Result};
use crate::table::{DataTable, TableValue};

/// Style-table column names
pub const STYLE_COLUMNS: &[&str] = &[
    "StyleID",
    "FontColor",
    "FontBold",
    "FontItalic",
    "FontSize",
    "FillForegroundColor",
    "FillPattern",
    "NumberFormat",
    "BorderColor",
    "BorderStyle",
    "HorizontalAlignment",
];

/// Styles by id, built from a style table
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    styles: AHashMap<String, Style>,
}

impl StyleTable {
    /// Build from a [`DataTable`] with the [`STYLE_COLUMNS`] columns
    ///
    /// Only `StyleID` is required; blank cells leave that part of the style
    /// at its default.
    pub fn from_table(table: &DataTable) -> Result<Self> {
        let id_col = table.field_index("StyleID").ok_or_else(|| {
            CommandError::other(format!("style table '{}' has no StyleID column", table.id()))
        })?;
        let col = |name: &str| table.field_index(name);
        let (font_color, bold, italic, size) = (
            col("FontColor"),
            col("FontBold"),
            col("FontItalic"),
            col("FontSize"),
        );
        let (fill_color, fill_pattern, number_format) =
            (col("FillForegroundColor"), col("FillPattern"), col("NumberFormat"));
        let (border_color, border_style, halign) =
            (col("BorderColor"), col("BorderStyle"), col("HorizontalAlignment"));

        let mut styles = AHashMap::new();
        for row in 0..table.row_count() {
            let text = |c: Option<usize>| -> Option<String> {
                c.and_then(|c| table.value(row, c))
                    .map(|v| v.to_string().trim().to_string())
                    .filter(|s| !s.is_empty())
            };
            let Some(id) = text(Some(id_col)) else {
                log::warn!("style table '{}' row {} has no StyleID", table.id(), row + 1);
                continue;
            };
            let bad = |column: &str, value: &str| {
                CommandError::other(format!(
                    "style '{}': invalid {} '{}'",
                    id, column, value
                ))
            };

            let mut style = Style::new();
            if let Some(v) = text(font_color) {
                style.font.color = Color::parse(&v).ok_or_else(|| bad("FontColor", &v))?;
            }
            if let Some(v) = text(bold) {
                style.font.bold = parse_bool(&v).ok_or_else(|| bad("FontBold", &v))?;
            }
            if let Some(v) = text(italic) {
                style.font.italic = parse_bool(&v).ok_or_else(|| bad("FontItalic", &v))?;
            }
            if let Some(v) = text(size) {
                let points: f64 = v.parse().map_err(|_| bad("FontSize", &v))?;
                style.font.set_size(points);
            }
            let pattern = text(fill_pattern);
            match (text(fill_color), pattern.as_deref()) {
                (_, Some(p)) if p.eq_ignore_ascii_case("none") => style.fill = FillStyle::None,
                (Some(v), _) => {
                    if let Some(p) = pattern.as_deref() {
                        if !p.eq_ignore_ascii_case("solid") {
                            return Err(bad("FillPattern", p));
                        }
                    }
                    let color = Color::parse(&v).ok_or_else(|| bad("FillForegroundColor", &v))?;
                    style.fill = FillStyle::Solid { color };
                }
                _ => {}
            }
            if let Some(v) = text(number_format) {
                style.number_format = NumberFormat::from_code(&v);
            }
            let line = match text(border_style) {
                Some(v) => Some(BorderLineStyle::parse(&v).ok_or_else(|| bad("BorderStyle", &v))?),
                None => None,
            };
            let color = match text(border_color) {
                Some(v) => Some(Color::parse(&v).ok_or_else(|| bad("BorderColor", &v))?),
                None => None,
            };
            if line.is_some() || color.is_some() {
                style = style.border_all(
                    line.unwrap_or(BorderLineStyle::Thin),
                    color.unwrap_or(Color::BLACK),
                );
            }
            if let Some(v) = text(halign) {
                style.alignment.horizontal =
                    HorizontalAlignment::parse(&v).ok_or_else(|| bad("HorizontalAlignment", &v))?;
            }

            if styles.insert(id.to_ascii_lowercase(), style).is_some() {
                log::warn!("style table '{}' defines '{}' more than once; the last row wins", table.id(), id);
            }
        }
        Ok(Self { styles })
    }

    /// Style by id, ignoring case
    pub fn get(&self, id: &str) -> Option<&Style> {
        self.styles.get(&id.trim().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    IsEmpty,
}

impl ConditionOperator {
    /// Symbol or keyword, in the order they are tried when parsing
    const TOKENS: &'static [(&'static str, ConditionOperator)] = &[
        ("==", ConditionOperator::Equal),
        ("!=", ConditionOperator::NotEqual),
        ("<=", ConditionOperator::LessThanOrEqual),
        (">=", ConditionOperator::GreaterThanOrEqual),
        ("<", ConditionOperator::LessThan),
        (">", ConditionOperator::GreaterThan),
        ("=", ConditionOperator::Equal),
        ("contains", ConditionOperator::Contains),
        ("starts", ConditionOperator::StartsWith),
        ("ends", ConditionOperator::EndsWith),
        ("isempty", ConditionOperator::IsEmpty),
    ];

    pub fn token(&self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(_, op)| op == self)
            .map(|(t, _)| *t)
            .unwrap_or("==")
    }

    fn cf_operator(&self) -> Option<CfOperator> {
        match self {
            ConditionOperator::Equal => Some(CfOperator::Equal),
            ConditionOperator::NotEqual => Some(CfOperator::NotEqual),
            ConditionOperator::LessThan => Some(CfOperator::LessThan),
            ConditionOperator::LessThanOrEqual => Some(CfOperator::LessThanOrEqual),
            ConditionOperator::GreaterThan => Some(CfOperator::GreaterThan),
            ConditionOperator::GreaterThanOrEqual => Some(CfOperator::GreaterThanOrEqual),
            _ => None,
        }
    }
}

/// One `<op> <value>` clause
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub operator: ConditionOperator,
    pub value: String,
}

impl Clause {
    fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let lower = text.to_ascii_lowercase();
        let (token, operator) = ConditionOperator::TOKENS
            .iter()
            .find(|(t, _)| lower.starts_with(t))
            .ok_or_else(|| {
                CommandError::invalid_value(
                    text,
                    "condition must start with ==, !=, <, <=, >, >=, contains, starts, ends or isempty",
                )
            })?;
        let value = unquote(text[token.len()..].trim()).to_string();
        if *operator != ConditionOperator::IsEmpty && value.is_empty() {
            return Err(CommandError::invalid_value(text, "condition has no value"));
        }
        Ok(Self {
            operator: *operator,
            value,
        })
    }

    /// Whether a value satisfies the clause
    ///
    /// Numbers compare numerically and date-times chronologically; anything
    /// else compares as text, ignoring case. Null only satisfies `isempty`
    /// and `!=`.
    pub fn matches(&self, value: &TableValue) -> bool {
        use std::cmp::Ordering;
        use ConditionOperator::*;

        if self.operator == IsEmpty {
            return value.is_null() || value.to_string().trim().is_empty();
        }
        if value.is_null() {
            return self.operator == NotEqual;
        }

        let text = value.to_string().to_lowercase();
        let target = self.value.to_lowercase();
        let ordering = match (value, value.as_f64(), self.value.trim().parse::<f64>()) {
            (TableValue::DateTime(dt), _, _) => match self.value.parse::<DateTimeValue>() {
                Ok(other) => dt.value().partial_cmp(&other.value()),
                Err(_) => Some(text.cmp(&target)),
            },
            (_, Some(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(text.cmp(&target)),
        };
        match self.operator {
            Equal => ordering == Some(Ordering::Equal),
            NotEqual => ordering != Some(Ordering::Equal),
            LessThan => ordering == Some(Ordering::Less),
            LessThanOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            GreaterThan => ordering == Some(Ordering::Greater),
            GreaterThanOrEqual => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            Contains => text.contains(&target),
            StartsWith => text.starts_with(&target),
            EndsWith => text.ends_with(&target),
            IsEmpty => false,
        }
    }

    fn operand(&self) -> String {
        match self.value.trim().parse::<f64>() {
            Ok(_) => self.value.trim().to_string(),
            Err(_) => quote_formula_string(&self.value),
        }
    }

    /// Excel boolean formula for this clause relative to `cell`
    fn formula(&self, cell: &str) -> String {
        let q = quote_formula_string(&self.value);
        match self.operator {
            ConditionOperator::Contains => format!("NOT(ISERROR(SEARCH({},{})))", q, cell),
            ConditionOperator::StartsWith => format!("LEFT({c},LEN({q}))={q}", c = cell, q = q),
            ConditionOperator::EndsWith => format!("RIGHT({c},LEN({q}))={q}", c = cell, q = q),
            ConditionOperator::IsEmpty => format!("LEN(TRIM({}))=0", cell),
            ConditionOperator::Equal => format!("{}={}", cell, self.operand()),
            ConditionOperator::NotEqual => format!("{}<>{}", cell, self.operand()),
            op => format!("{}{}{}", cell, op.token(), self.operand()),
        }
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Split on ` and `, leaving quoted operands whole
fn split_clauses(text: &str) -> Vec<&str> {
    let splitter = lazy_regex::regex!(r"(?i)\s+and\s+");
    let mut parts = Vec::new();
    let mut start = 0;
    for m in splitter.find_iter(text) {
        let quoted = text[..m.start()].matches('"').count() % 2 == 1;
        if !quoted {
            parts.push(&text[start..m.start()]);
            start = m.end();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Clauses joined by ` and `; all must hold
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub clauses: Vec<Clause>,
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self> {
        let clauses = split_clauses(text.trim())
            .into_iter()
            .map(Clause::parse)
            .collect::<Result<Vec<_>>>()?;
        if clauses.is_empty() {
            return Err(CommandError::invalid_value(text, "empty condition"));
        }
        Ok(Self { clauses })
    }

    pub fn matches(&self, value: &TableValue) -> bool {
        self.clauses.iter().all(|c| c.matches(value))
    }

    /// Native Excel rule over `range` with the same meaning
    ///
    /// A single clause maps onto the matching rule type; several clauses
    /// become an `AND(...)` expression relative to the range's top-left cell.
    pub fn to_rule(&self, range: CellRange) -> ConditionalFormatRule {
        let rule = match self.clauses.as_slice() {
            [clause] => match clause.operator {
                ConditionOperator::Contains => ConditionalFormatRule::contains_text(&clause.value),
                ConditionOperator::StartsWith => ConditionalFormatRule::begins_with(&clause.value),
                ConditionOperator::EndsWith => ConditionalFormatRule::ends_with(&clause.value),
                ConditionOperator::IsEmpty => ConditionalFormatRule::contains_blanks(),
                op => match op.cf_operator() {
                    Some(cf) => ConditionalFormatRule::cell_is(cf, clause.operand(), None),
                    None => ConditionalFormatRule::expression(clause.formula(&anchor(&range))),
                },
            },
            clauses => {
                let cell = anchor(&range);
                let parts: Vec<String> = clauses.iter().map(|c| c.formula(&cell)).collect();
                ConditionalFormatRule::expression(format!("AND({})", parts.join(",")))
            }
        };
        rule.with_range(range)
    }
}

fn anchor(range: &CellRange) -> String {
    CellAddress::new(range.start.row, range.start.col).to_a1_string()
}

/// A row of a condition table
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionEntry {
    /// Column name, or `*` for every column
    pub column: String,
    pub condition: Condition,
    pub style_id: String,
}

/// Ordered condition entries
#[derive(Debug, Clone, Default)]
pub struct ConditionTable {
    entries: Vec<ConditionEntry>,
}

impl ConditionTable {
    /// Build from a [`DataTable`] with `Column`, `Condition` and `StyleID`
    /// columns; every style id must exist in `styles`
    pub fn from_table(table: &DataTable, styles: &StyleTable) -> Result<Self> {
        let col = |name: &str| {
            table.field_index(name).ok_or_else(|| {
                CommandError::other(format!(
                    "condition table '{}' has no {} column",
                    table.id(),
                    name
                ))
            })
        };
        let (column_col, condition_col, style_col) =
            (col("Column")?, col("Condition")?, col("StyleID")?);

        let mut entries = Vec::new();
        for row in 0..table.row_count() {
            let text = |c: usize| {
                table
                    .value(row, c)
                    .map(|v| v.to_string().trim().to_string())
                    .unwrap_or_default()
            };
            let (column, condition, style_id) =
                (text(column_col), text(condition_col), text(style_col));
            if column.is_empty() || condition.is_empty() || style_id.is_empty() {
                log::warn!(
                    "condition table '{}' row {} is incomplete and is ignored",
                    table.id(),
                    row + 1
                );
                continue;
            }
            if styles.get(&style_id).is_none() {
                return Err(CommandError::other(format!(
                    "condition table '{}' row {} uses unknown style '{}'",
                    table.id(),
                    row + 1,
                    style_id
                )));
            }
            entries.push(ConditionEntry {
                column,
                condition: Condition::parse(&condition)?,
                style_id,
            });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ConditionEntry] {
        &self.entries
    }

    /// Style for a value in `column`: the last matching entry wins
    pub fn style_for<'s>(
        &self,
        column: &str,
        value: &TableValue,
        styles: &'s StyleTable,
    ) -> Option<&'s Style> {
        self.entries
            .iter()
            .filter(|e| e.column == "*" || e.column.eq_ignore_ascii_case(column))
            .filter(|e| e.condition.matches(value))
            .last()
            .and_then(|e| styles.get(&e.style_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FieldType, TableField};
    use tsxl_core::CfRuleType;

    fn string_table(id: &str, columns: &[&str], rows: &[&[&str]]) -> DataTable {
        let mut t = DataTable::with_fields(
            id,
            columns
                .iter()
                .map(|c| TableField::new(*c, FieldType::String))
                .collect(),
        );
        for row in rows {
            let record = row
                .iter()
                .map(|v| if v.is_empty() { TableValue::Null } else { TableValue::from(*v) })
                .collect();
            t.add_record(record).unwrap();
        }
        t
    }

    fn styles() -> StyleTable {
        let t = string_table(
            "Styles",
            &["StyleID", "FontBold", "FillForegroundColor", "FontSize", "BorderStyle"],
            &[
                &["high", "true", "red", "", ""],
                &["low", "", "#00FF00", "8", "thin"],
                &["missing", "", "lightgray", "", ""],
            ],
        );
        StyleTable::from_table(&t).unwrap()
    }

    #[test]
    fn test_style_table() {
        let styles = styles();
        assert_eq!(styles.len(), 3);
        let high = styles.get("HIGH").unwrap();
        assert!(high.font.bold);
        assert_eq!(high.fill.color(), Color::parse("red"));
        let low = styles.get("low").unwrap();
        assert_eq!(low.font.size(), 8.0);
        assert!(low.border.edges().iter().all(|(_, e)| e.is_some()));
    }

    #[test]
    fn test_style_table_errors() {
        let t = string_table("S", &["StyleID", "FontBold"], &[&["x", "maybe"]]);
        assert!(StyleTable::from_table(&t).is_err());
        let t = string_table("S", &["Name"], &[&["x"]]);
        assert!(StyleTable::from_table(&t).is_err());
    }

    #[test]
    fn test_clause_matching() {
        let c = Condition::parse(">= 10 AND < 20").unwrap();
        assert!(c.matches(&TableValue::Double(10.0)));
        assert!(c.matches(&TableValue::String("15".into())));
        assert!(!c.matches(&TableValue::Integer(20)));
        assert!(!c.matches(&TableValue::Null));

        let c = Condition::parse("contains \"North\"").unwrap();
        assert!(c.matches(&TableValue::String("far north fork".into())));
        assert!(Condition::parse("isempty").unwrap().matches(&TableValue::Null));
        assert!(Condition::parse("== abc").unwrap().matches(&TableValue::String("ABC".into())));
        assert!(Condition::parse("!= 5").unwrap().matches(&TableValue::Null));
        let date: DateTimeValue = "2020-06-01".parse().unwrap();
        assert!(Condition::parse("> 2020-05-31").unwrap().matches(&TableValue::DateTime(date)));
        assert!(Condition::parse("about 5").is_err());
        assert!(Condition::parse("> ").is_err());
    }

    #[test]
    fn test_and_inside_quotes_is_not_a_separator() {
        let c = Condition::parse("contains \"salt and pepper\"").unwrap();
        assert_eq!(c.clauses.len(), 1);
        assert_eq!(c.clauses[0].value, "salt and pepper");
        assert!(c.matches(&TableValue::String("Salt and Pepper shakers".into())));
        assert!(!c.matches(&TableValue::String("salt".into())));

        let c = Condition::parse("starts \"a and b\" and ends \"z\"").unwrap();
        assert_eq!(c.clauses.len(), 2);
        assert_eq!(c.clauses[1].operator, ConditionOperator::EndsWith);
    }

    #[test]
    fn test_last_match_wins() {
        let styles = styles();
        let conditions = string_table(
            "Conditions",
            &["Column", "Condition", "StyleID"],
            &[
                &["Flow", "> 100", "high"],
                &["*", "isempty", "missing"],
                &["flow", "> 500", "low"],
            ],
        );
        let table = ConditionTable::from_table(&conditions, &styles).unwrap();
        let style = table.style_for("Flow", &TableValue::Double(200.0), &styles).unwrap();
        assert!(style.font.bold);
        let style = table.style_for("Flow", &TableValue::Double(600.0), &styles).unwrap();
        assert_eq!(style.font.size(), 8.0);
        assert!(table.style_for("Stage", &TableValue::Null, &styles).is_some());
        assert!(table.style_for("Stage", &TableValue::Double(600.0), &styles).is_none());

        let bad = string_table("C", &["Column", "Condition", "StyleID"], &[&["A", "> 1", "nope"]]);
        assert!(ConditionTable::from_table(&bad, &styles).is_err());
    }

    #[test]
    fn test_to_rule() {
        let range = CellRange::parse("C2:C20").unwrap();
        let rule = Condition::parse("> 100").unwrap().to_rule(range);
        assert_eq!(
            rule.rule_type,
            CfRuleType::CellIs {
                operator: CfOperator::GreaterThan,
                formula1: "100".into(),
                formula2: None
            }
        );
        assert_eq!(rule.sqref(), "C2:C20");

        let rule = Condition::parse("== Dry").unwrap().to_rule(range);
        assert_eq!(rule.formulas(), vec!["\"Dry\"".to_string()]);

        let rule = Condition::parse("starts N").unwrap().to_rule(range);
        assert_eq!(rule.rule_type, CfRuleType::BeginsWith { text: "N".into() });

        let rule = Condition::parse(">= 1 and <= 5").unwrap().to_rule(range);
        assert_eq!(rule.formulas(), vec!["AND(C2>=1,C2<=5)".to_string()]);
        let rule = Condition::parse("!= 0 and contains x").unwrap().to_rule(range);
        assert_eq!(rule.formulas(), vec!["AND(C2<>0,NOT(ISERROR(SEARCH(\"x\",C2))))".to_string()]);
    }
}
