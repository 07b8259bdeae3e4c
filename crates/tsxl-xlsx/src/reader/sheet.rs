//! Worksheet part parsing

use quick_xml::events::BytesStart;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::ParsedStyles;
use crate::xml::{attr, attr_bool, attr_parse, decode_excel_escapes};
use tsxl_core::conditional_format::{CfValueKind, ColorScaleStop};
use tsxl_core::{
    CellAddress, CellError, CellRange, CellValue, CfOperator, CfRuleType, Color,
    ConditionalFormatRule, Worksheet, MAX_COLS,
};

/// Where text events currently go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Value,
    Formula,
    InlineText,
    CfFormula,
}

#[derive(Debug)]
struct PendingCell {
    address: CellAddress,
    kind: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
}

#[derive(Debug, Default)]
struct PendingRule {
    kind: String,
    operator: Option<String>,
    text: Option<String>,
    priority: u32,
    stop_if_true: bool,
    dxf_id: Option<usize>,
    formulas: Vec<String>,
    cfvo: Vec<(CfValueKind, Option<String>)>,
    colors: Vec<Color>,
}

/// Event-driven builder filling a [`Worksheet`] from `sheetN.xml`
pub(super) struct SheetParser<'a> {
    part: &'a str,
    sheet: &'a mut Worksheet,
    shared_strings: &'a [String],
    styles: &'a ParsedStyles,

    row: u32,
    any_row: bool,
    next_col: u16,
    cell: Option<PendingCell>,
    target: TextTarget,
    in_inline_string: bool,
    in_phonetic: bool,
    seen_view: bool,
    in_view: bool,

    cf_ranges: Vec<CellRange>,
    rule: Option<PendingRule>,
    in_color_scale: bool,

    table_rids: Vec<String>,
}

fn parse_pane_count(e: &BytesStart<'_>, key: &[u8]) -> u32 {
    attr_parse::<f64>(e, key).map_or(0, |v| v.max(0.0) as u32)
}

impl<'a> SheetParser<'a> {
    pub(super) fn new(
        part: &'a str,
        sheet: &'a mut Worksheet,
        shared_strings: &'a [String],
        styles: &'a ParsedStyles,
    ) -> Self {
        Self {
            part,
            sheet,
            shared_strings,
            styles,
            row: 0,
            any_row: false,
            next_col: 0,
            cell: None,
            target: TextTarget::None,
            in_inline_string: false,
            in_phonetic: false,
            seen_view: false,
            in_view: false,
            cf_ranges: Vec::new(),
            rule: None,
            in_color_scale: false,
            table_rids: Vec::new(),
        }
    }

    fn parse_error(&self, message: String) -> XlsxError {
        XlsxError::parse(self.part, message)
    }

    pub(super) fn start(&mut self, e: &BytesStart<'_>, empty: bool) -> XlsxResult<()> {
        match e.name().as_ref() {
            b"sheetView" if !self.seen_view => {
                self.seen_view = true;
                self.in_view = !empty;
                let view = self.sheet.view_mut();
                view.selected = attr_bool(e, b"tabSelected").unwrap_or(false);
                view.show_gridlines = attr_bool(e, b"showGridLines").unwrap_or(true);
                if let Some(zoom) = attr_parse::<u16>(e, b"zoomScale") {
                    if view.set_zoom(zoom).is_err() {
                        log::debug!("{}: ignoring zoom {}", self.part, zoom);
                    }
                }
            }
            b"pane" if self.in_view => {
                let frozen = matches!(
                    attr(e, b"state").as_deref(),
                    Some("frozen") | Some("frozenSplit")
                );
                if frozen {
                    let cols = parse_pane_count(e, b"xSplit").min(MAX_COLS as u32) as u16;
                    let rows = parse_pane_count(e, b"ySplit");
                    self.sheet.set_freeze_panes(cols, rows)?;
                }
            }
            b"selection" if self.in_view => {
                if let Some(cell) = attr(e, b"activeCell").and_then(|a| CellAddress::parse(&a).ok()) {
                    self.sheet.view_mut().active_cell = Some(cell);
                }
            }

            b"col" => {
                let min = attr_parse::<u32>(e, b"min").unwrap_or(1).max(1);
                let max = attr_parse::<u32>(e, b"max").unwrap_or(min).min(MAX_COLS as u32);
                let width = attr_parse::<f64>(e, b"width");
                let custom = attr_bool(e, b"customWidth").unwrap_or(false);
                if let (Some(width), true) = (width, custom) {
                    for col in min..=max {
                        self.sheet.set_column_width((col - 1) as u16, width)?;
                    }
                }
            }

            b"row" => {
                self.row = match attr_parse::<u32>(e, b"r") {
                    Some(r) => r.saturating_sub(1),
                    None if self.any_row => self.row + 1,
                    None => 0,
                };
                self.any_row = true;
                self.next_col = 0;
            }
            b"c" => {
                let address = match attr(e, b"r") {
                    Some(r) => CellAddress::parse(&r).map_err(|err| {
                        self.parse_error(format!("invalid cell reference '{}': {}", r, err))
                    })?,
                    None => CellAddress::new(self.row, self.next_col),
                };
                self.next_col = address.col.saturating_add(1);
                self.cell = Some(PendingCell {
                    address,
                    kind: attr(e, b"t"),
                    style: attr_parse(e, b"s"),
                    value: None,
                    formula: None,
                });
                if empty {
                    self.finish_cell()?;
                }
            }
            b"v" if self.cell.is_some() && !empty => self.target = TextTarget::Value,
            b"f" if self.cell.is_some() && !empty => self.target = TextTarget::Formula,
            b"is" if self.cell.is_some() => self.in_inline_string = !empty,
            b"rPh" if self.in_inline_string => self.in_phonetic = !empty,
            b"t" if self.in_inline_string && !self.in_phonetic && !empty => {
                self.target = TextTarget::InlineText;
                if let Some(cell) = self.cell.as_mut() {
                    cell.kind = Some("inlineStr".into());
                }
            }

            b"mergeCell" => {
                if let Some(range) = attr(e, b"ref").and_then(|r| CellRange::parse(&r).ok()) {
                    if let Err(err) = self.sheet.merge_cells(&range) {
                        log::warn!("{}: {}", self.part, err);
                    }
                }
            }

            b"conditionalFormatting" => {
                self.cf_ranges = attr(e, b"sqref")
                    .unwrap_or_default()
                    .split_whitespace()
                    .filter_map(|s| CellRange::parse(s).ok())
                    .collect();
            }
            b"cfRule" => {
                self.rule = Some(PendingRule {
                    kind: attr(e, b"type").unwrap_or_default(),
                    operator: attr(e, b"operator"),
                    text: attr(e, b"text"),
                    priority: attr_parse(e, b"priority").unwrap_or(0),
                    stop_if_true: attr_bool(e, b"stopIfTrue").unwrap_or(false),
                    dxf_id: attr_parse(e, b"dxfId"),
                    ..PendingRule::default()
                });
                if empty {
                    self.finish_rule();
                }
            }
            b"formula" if self.rule.is_some() && !empty => {
                self.target = TextTarget::CfFormula;
                if let Some(rule) = self.rule.as_mut() {
                    rule.formulas.push(String::new());
                }
            }
            b"colorScale" if self.rule.is_some() => self.in_color_scale = !empty,
            b"cfvo" if self.in_color_scale => {
                let kind = attr(e, b"type")
                    .and_then(|t| CfValueKind::from_xlsx(&t))
                    .unwrap_or(CfValueKind::Num);
                if let Some(rule) = self.rule.as_mut() {
                    rule.cfvo.push((kind, attr(e, b"val")));
                }
            }
            b"color" if self.in_color_scale => {
                let color = attr(e, b"rgb")
                    .and_then(|rgb| match rgb.len() {
                        8 => Color::from_hex(&rgb[2..]),
                        _ => Color::from_hex(&rgb),
                    })
                    .unwrap_or(Color::Auto);
                if let Some(rule) = self.rule.as_mut() {
                    rule.colors.push(color);
                }
            }

            b"tablePart" => {
                if let Some(r_id) = attr(e, b"r:id") {
                    self.table_rids.push(r_id);
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub(super) fn end(&mut self, name: &[u8]) -> XlsxResult<()> {
        match name {
            b"sheetView" => self.in_view = false,
            b"c" => self.finish_cell()?,
            b"v" | b"f" | b"t" | b"formula" => self.target = TextTarget::None,
            b"is" => self.in_inline_string = false,
            b"rPh" => self.in_phonetic = false,
            b"colorScale" => self.in_color_scale = false,
            b"cfRule" => self.finish_rule(),
            b"conditionalFormatting" => self.cf_ranges.clear(),
            _ => {}
        }
        Ok(())
    }

    pub(super) fn text(&mut self, text: &str) {
        match self.target {
            TextTarget::None => {}
            TextTarget::CfFormula => {
                if let Some(f) = self.rule.as_mut().and_then(|r| r.formulas.last_mut()) {
                    f.push_str(text);
                }
            }
            target => {
                if let Some(cell) = self.cell.as_mut() {
                    let slot = match target {
                        TextTarget::Formula => &mut cell.formula,
                        _ => &mut cell.value,
                    };
                    slot.get_or_insert_with(String::new).push_str(text);
                }
            }
        }
    }

    /// Relationship ids of the sheet's table parts
    pub(super) fn finish(self) -> Vec<String> {
        self.table_rids
    }

    fn finish_cell(&mut self) -> XlsxResult<()> {
        let Some(cell) = self.cell.take() else {
            return Ok(());
        };
        let PendingCell {
            address,
            kind,
            style,
            value,
            formula,
        } = cell;

        let value = value.map(|v| self.typed_value(kind.as_deref(), v)).transpose()?;
        let cell_value = match formula.filter(|f| !f.trim().is_empty()) {
            Some(f) => CellValue::Formula {
                text: format!("={}", f.trim_start_matches('=')),
                cached_value: value.filter(|v| !v.is_empty()).map(Box::new),
            },
            None => value.unwrap_or(CellValue::Empty),
        };
        self.sheet
            .set_cell_value_at(address.row, address.col, cell_value)?;

        if let Some(s) = style.filter(|s| *s != 0) {
            let style = self.styles.cell_styles.get(s as usize).ok_or_else(|| {
                self.parse_error(format!("style index {} out of bounds", s))
            })?;
            self.sheet.set_cell_style_at(address.row, address.col, style)?;
        }
        Ok(())
    }

    fn typed_value(&self, kind: Option<&str>, raw: String) -> XlsxResult<CellValue> {
        Ok(match kind {
            Some("s") => {
                let idx: usize = raw.trim().parse().map_err(|_| {
                    self.parse_error(format!("invalid shared string index: {}", raw))
                })?;
                let s = self.shared_strings.get(idx).ok_or_else(|| {
                    self.parse_error(format!("shared string index {} out of bounds", idx))
                })?;
                CellValue::String(s.clone())
            }
            Some("b") => CellValue::Boolean(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
            Some("e") => CellError::from_literal(&raw)
                .map(CellValue::Error)
                .unwrap_or(CellValue::String(raw)),
            Some("str") | Some("inlineStr") => CellValue::String(decode_excel_escapes(&raw)),
            None | Some("n") => match raw.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) if raw.trim().is_empty() => CellValue::Empty,
                Err(_) => CellValue::String(raw),
            },
            // ISO dates (t="d") and unknown types stay text
            Some(_) => CellValue::String(raw),
        })
    }

    fn finish_rule(&mut self) {
        let Some(pending) = self.rule.take() else {
            return;
        };
        let first = pending.formulas.first().cloned().unwrap_or_default();
        let text = pending.text.clone().unwrap_or_default();
        let rule_type = match pending.kind.as_str() {
            "cellIs" => CfRuleType::CellIs {
                operator: pending
                    .operator
                    .as_deref()
                    .and_then(CfOperator::from_xlsx)
                    .unwrap_or(CfOperator::Equal),
                formula1: first,
                formula2: pending.formulas.get(1).cloned(),
            },
            "expression" => CfRuleType::Expression { formula: first },
            "containsText" => CfRuleType::ContainsText { text },
            "beginsWith" => CfRuleType::BeginsWith { text },
            "endsWith" => CfRuleType::EndsWith { text },
            "containsBlanks" => CfRuleType::ContainsBlanks,
            "notContainsBlanks" => CfRuleType::NotContainsBlanks,
            "colorScale" if pending.cfvo.len() == pending.colors.len() => CfRuleType::ColorScale {
                stops: pending
                    .cfvo
                    .iter()
                    .zip(&pending.colors)
                    .map(|((kind, val), color)| ColorScaleStop::new(*kind, val.clone(), *color))
                    .collect(),
            },
            other => {
                log::debug!("{}: dropping unsupported cfRule type '{}'", self.part, other);
                return;
            }
        };

        let mut rule = ConditionalFormatRule::new(rule_type);
        rule.ranges = self.cf_ranges.clone();
        rule.priority = pending.priority;
        rule.stop_if_true = pending.stop_if_true;
        rule.format = pending
            .dxf_id
            .and_then(|id| self.styles.dxf_styles.get(id))
            .cloned();
        self.sheet.add_conditional_format(rule);
    }
}
