//! Native Excel conditional formatting
//!
//! ```rust
//! use tsxl_core::{CellRange, CfOperator, ConditionalFormatRule, Style, Color, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! let rule = ConditionalFormatRule::cell_is(CfOperator::GreaterThan, "100", None)
//!     .with_range(CellRange::parse("B2:B20").unwrap())
//!     .with_format(Style::new().fill_color(Color::rgb(255, 199, 206)));
//! sheet.add_conditional_format(rule);
//! ```

use crate::cell::{CellAddress, CellRange};
use crate::style::{Color, Style};

/// A conditional formatting rule
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalFormatRule {
    pub rule_type: CfRuleType,
    /// Cells the rule applies to
    pub ranges: Vec<CellRange>,
    /// Lower is evaluated first; assigned by the worksheet when 0
    pub priority: u32,
    pub stop_if_true: bool,
    /// Differential style applied when the rule matches
    pub format: Option<Style>,
}

impl ConditionalFormatRule {
    pub fn new(rule_type: CfRuleType) -> Self {
        Self {
            rule_type,
            ranges: Vec::new(),
            priority: 0,
            stop_if_true: false,
            format: None,
        }
    }

    /// Compare the cell value against one or two operands
    pub fn cell_is(
        operator: CfOperator,
        formula1: impl Into<String>,
        formula2: Option<String>,
    ) -> Self {
        Self::new(CfRuleType::CellIs {
            operator,
            formula1: formula1.into(),
            formula2,
        })
    }

    /// Formula that evaluates to TRUE for matching cells
    pub fn expression(formula: impl Into<String>) -> Self {
        Self::new(CfRuleType::Expression {
            formula: formula.into(),
        })
    }

    pub fn contains_text(text: impl Into<String>) -> Self {
        Self::new(CfRuleType::ContainsText { text: text.into() })
    }

    pub fn begins_with(text: impl Into<String>) -> Self {
        Self::new(CfRuleType::BeginsWith { text: text.into() })
    }

    pub fn ends_with(text: impl Into<String>) -> Self {
        Self::new(CfRuleType::EndsWith { text: text.into() })
    }

    pub fn contains_blanks() -> Self {
        Self::new(CfRuleType::ContainsBlanks)
    }

    pub fn not_contains_blanks() -> Self {
        Self::new(CfRuleType::NotContainsBlanks)
    }

    /// Two-color scale from the lowest to the highest value
    pub fn color_scale_2(min: Color, max: Color) -> Self {
        Self::new(CfRuleType::ColorScale {
            stops: vec![
                ColorScaleStop::new(CfValueKind::Min, None, min),
                ColorScaleStop::new(CfValueKind::Max, None, max),
            ],
        })
    }

    /// Three-color scale with the middle color at the 50th percentile
    pub fn color_scale_3(min: Color, mid: Color, max: Color) -> Self {
        Self::new(CfRuleType::ColorScale {
            stops: vec![
                ColorScaleStop::new(CfValueKind::Min, None, min),
                ColorScaleStop::new(CfValueKind::Percentile, Some("50".into()), mid),
                ColorScaleStop::new(CfValueKind::Max, None, max),
            ],
        })
    }

    pub fn with_range(mut self, range: CellRange) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn with_format(mut self, style: Style) -> Self {
        self.format = Some(style);
        self
    }

    pub fn with_stop_if_true(mut self, stop: bool) -> Self {
        self.stop_if_true = stop;
        self
    }

    /// `sqref` attribute: space-separated ranges
    pub fn sqref(&self) -> String {
        self.ranges
            .iter()
            .map(|r| r.to_a1_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Top-left cell of the first range, which text rule formulas are relative to
    pub fn anchor(&self) -> CellAddress {
        self.ranges
            .first()
            .map(|r| CellAddress::new(r.start.row, r.start.col))
            .unwrap_or_else(|| CellAddress::new(0, 0))
    }

    /// The `<formula>` children Excel expects for this rule
    pub fn formulas(&self) -> Vec<String> {
        let cell = self.anchor().to_a1_string();
        match &self.rule_type {
            CfRuleType::CellIs {
                formula1, formula2, ..
            } => std::iter::once(formula1.clone())
                .chain(formula2.iter().cloned())
                .collect(),
            CfRuleType::Expression { formula } => vec![formula.clone()],
            CfRuleType::ContainsText { text } => vec![format!(
                "NOT(ISERROR(SEARCH({},{})))",
                quote_formula_string(text),
                cell
            )],
            CfRuleType::BeginsWith { text } => vec![format!(
                "LEFT({cell},LEN({q}))={q}",
                cell = cell,
                q = quote_formula_string(text)
            )],
            CfRuleType::EndsWith { text } => vec![format!(
                "RIGHT({cell},LEN({q}))={q}",
                cell = cell,
                q = quote_formula_string(text)
            )],
            CfRuleType::ContainsBlanks => vec![format!("LEN(TRIM({}))=0", cell)],
            CfRuleType::NotContainsBlanks => vec![format!("LEN(TRIM({}))>0", cell)],
            CfRuleType::ColorScale { .. } => Vec::new(),
        }
    }
}

/// Quote text as an Excel formula string literal
pub fn quote_formula_string(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// Kinds of conditional formatting rules
#[derive(Debug, Clone, PartialEq)]
pub enum CfRuleType {
    CellIs {
        operator: CfOperator,
        formula1: String,
        formula2: Option<String>,
    },
    Expression {
        formula: String,
    },
    ContainsText {
        text: String,
    },
    BeginsWith {
        text: String,
    },
    EndsWith {
        text: String,
    },
    ContainsBlanks,
    NotContainsBlanks,
    ColorScale {
        stops: Vec<ColorScaleStop>,
    },
}

impl CfRuleType {
    /// `type` attribute of `<cfRule>`
    pub fn xlsx_type(&self) -> &'static str {
        match self {
            CfRuleType::CellIs { .. } => "cellIs",
            CfRuleType::Expression { .. } => "expression",
            CfRuleType::ContainsText { .. } => "containsText",
            CfRuleType::BeginsWith { .. } => "beginsWith",
            CfRuleType::EndsWith { .. } => "endsWith",
            CfRuleType::ContainsBlanks => "containsBlanks",
            CfRuleType::NotContainsBlanks => "notContainsBlanks",
            CfRuleType::ColorScale { .. } => "colorScale",
        }
    }
}

/// Operators for cell-is rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfOperator {
    Between,
    NotBetween,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

const OPERATOR_NAMES: &[(CfOperator, &str)] = &[
    (CfOperator::Between, "between"),
    (CfOperator::NotBetween, "notBetween"),
    (CfOperator::Equal, "equal"),
    (CfOperator::NotEqual, "notEqual"),
    (CfOperator::GreaterThan, "greaterThan"),
    (CfOperator::LessThan, "lessThan"),
    (CfOperator::GreaterThanOrEqual, "greaterThanOrEqual"),
    (CfOperator::LessThanOrEqual, "lessThanOrEqual"),
];

impl CfOperator {
    pub fn xlsx_operator(&self) -> &'static str {
        OPERATOR_NAMES
            .iter()
            .find(|(op, _)| op == self)
            .map(|(_, name)| *name)
            .unwrap_or("equal")
    }

    pub fn from_xlsx(s: &str) -> Option<Self> {
        OPERATOR_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(op, _)| *op)
    }

    /// Operator for a comparison symbol (`>`, `<=`, `==`, `!=`, `<>`)
    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            ">" => CfOperator::GreaterThan,
            ">=" => CfOperator::GreaterThanOrEqual,
            "<" => CfOperator::LessThan,
            "<=" => CfOperator::LessThanOrEqual,
            "=" | "==" => CfOperator::Equal,
            "!=" | "<>" => CfOperator::NotEqual,
            _ => return None,
        })
    }
}

/// One color stop of a color scale
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScaleStop {
    pub kind: CfValueKind,
    pub value: Option<String>,
    pub color: Color,
}

impl ColorScaleStop {
    pub fn new(kind: CfValueKind, value: Option<String>, color: Color) -> Self {
        Self { kind, value, color }
    }
}

/// How a color scale stop is positioned (`<cfvo type=...>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfValueKind {
    Min,
    Max,
    Num,
    Percent,
    Percentile,
    Formula,
}

impl CfValueKind {
    pub fn xlsx_type(&self) -> &'static str {
        match self {
            CfValueKind::Min => "min",
            CfValueKind::Max => "max",
            CfValueKind::Num => "num",
            CfValueKind::Percent => "percent",
            CfValueKind::Percentile => "percentile",
            CfValueKind::Formula => "formula",
        }
    }

    pub fn from_xlsx(s: &str) -> Option<Self> {
        Some(match s {
            "min" => CfValueKind::Min,
            "max" => CfValueKind::Max,
            "num" => CfValueKind::Num,
            "percent" => CfValueKind::Percent,
            "percentile" => CfValueKind::Percentile,
            "formula" => CfValueKind::Formula,
            _ => return None,
        })
    }
}
