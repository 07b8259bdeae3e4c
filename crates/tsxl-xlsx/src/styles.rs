//! XLSX styles (styles.xml) read/write helpers

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr, attr_bool, attr_parse, escape};
use tsxl_core::style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, PatternType, Protection, Style, Underline,
    VerticalAlignment,
};
use tsxl_core::Workbook;

/// First id available for custom number formats
const FIRST_CUSTOM_NUMFMT: u32 = 164;

// === Writing ===

/// Workbook-wide cellXfs and dxfs built from the per-sheet style pools
#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Deduplicated styles; the index is the cellXfs index
    styles: Vec<Style>,
    /// Per sheet: local pool index -> cellXfs index
    sheet_maps: Vec<HashMap<u32, u32>>,
    dxf_styles: Vec<Style>,
    /// (sheet index, rule index) -> dxf id
    dxf_map: HashMap<(usize, usize), u32>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    num_fmt_id: u32,
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut styles = vec![Style::default()];
        let mut style_to_xf: HashMap<Style, u32> = HashMap::new();
        style_to_xf.insert(Style::default(), 0);

        let mut sheet_maps = Vec::with_capacity(workbook.sheet_count());
        let mut dxf_styles: Vec<Style> = Vec::new();
        let mut dxf_ids: HashMap<Style, u32> = HashMap::new();
        let mut dxf_map = HashMap::new();

        for (sheet_idx, sheet) in workbook.worksheets().enumerate() {
            let mut map: HashMap<u32, u32> = HashMap::new();
            map.insert(0, 0);

            for (_row, _col, cell) in sheet.iter_cells() {
                let local = cell.style_index;
                if map.contains_key(&local) {
                    continue;
                }
                let style = sheet.style_by_index(local).cloned().unwrap_or_default();
                let xf = *style_to_xf.entry(style.clone()).or_insert_with(|| {
                    styles.push(style);
                    styles.len() as u32 - 1
                });
                map.insert(local, xf);
            }
            sheet_maps.push(map);

            for (rule_idx, rule) in sheet.conditional_formats().iter().enumerate() {
                if let Some(format) = &rule.format {
                    let id = *dxf_ids.entry(format.clone()).or_insert_with(|| {
                        dxf_styles.push(format.clone());
                        dxf_styles.len() as u32 - 1
                    });
                    dxf_map.insert((sheet_idx, rule_idx), id);
                }
            }
        }

        Self {
            styles,
            sheet_maps,
            dxf_styles,
            dxf_map,
        }
    }

    pub(crate) fn xf_id_for(&self, sheet_index: usize, local_style_index: u32) -> u32 {
        self.sheet_maps
            .get(sheet_index)
            .and_then(|m| m.get(&local_style_index).copied())
            .unwrap_or(0)
    }

    pub(crate) fn dxf_id_for(&self, sheet_index: usize, rule_index: usize) -> Option<u32> {
        self.dxf_map.get(&(sheet_index, rule_index)).copied()
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut fonts = vec![FontStyle::default()];
        let mut font_ids: HashMap<FontStyle, u32> = HashMap::new();
        font_ids.insert(FontStyle::default(), 0);

        // Excel requires fills 0 and 1 to be none and gray125
        let mut fills = vec![
            FillStyle::None,
            FillStyle::Pattern {
                pattern: PatternType::Gray125,
                foreground: Color::Auto,
                background: Color::Auto,
            },
        ];
        let mut fill_ids: HashMap<FillStyle, u32> = HashMap::new();
        fill_ids.insert(FillStyle::None, 0);

        let mut borders = vec![BorderStyle::default()];
        let mut border_ids: HashMap<BorderStyle, u32> = HashMap::new();
        border_ids.insert(BorderStyle::default(), 0);

        let mut numfmts: Vec<(u32, String)> = Vec::new();
        let mut numfmt_ids: HashMap<String, u32> = HashMap::new();

        let mut resolved = Vec::with_capacity(self.styles.len());
        for style in &self.styles {
            let font_id = *font_ids.entry(style.font.clone()).or_insert_with(|| {
                fonts.push(style.font.clone());
                fonts.len() as u32 - 1
            });
            let fill_id = *fill_ids.entry(style.fill).or_insert_with(|| {
                fills.push(style.fill);
                fills.len() as u32 - 1
            });
            let border_id = *border_ids.entry(style.border).or_insert_with(|| {
                borders.push(style.border);
                borders.len() as u32 - 1
            });
            let num_fmt_id =
                number_format_id(&style.number_format, &mut numfmts, &mut numfmt_ids);
            resolved.push(ResolvedXfIds {
                font_id,
                fill_id,
                border_id,
                num_fmt_id,
            });
        }

        // Custom formats used only by dxfs still need unique ids
        let dxf_numfmts: Vec<u32> = self
            .dxf_styles
            .iter()
            .map(|s| number_format_id(&s.number_format, &mut numfmts, &mut numfmt_ids))
            .collect();

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!("\n  <fills count=\"{}\">", fills.len()));
        for fill in &fills {
            xml.push_str("\n    ");
            xml.push_str(&write_fill(fill, false));
        }
        xml.push_str("\n  </fills>");

        xml.push_str(&format!("\n  <borders count=\"{}\">", borders.len()));
        for border in &borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (style, ids) in self.styles.iter().zip(&resolved) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>"#,
        );

        if self.dxf_styles.is_empty() {
            xml.push_str("\n  <dxfs count=\"0\"/>");
        } else {
            xml.push_str(&format!("\n  <dxfs count=\"{}\">", self.dxf_styles.len()));
            for (style, num_fmt_id) in self.dxf_styles.iter().zip(dxf_numfmts) {
                xml.push_str("\n    ");
                xml.push_str(&write_dxf(style, num_fmt_id));
            }
            xml.push_str("\n  </dxfs>");
        }

        xml.push_str(
            r#"
  <tableStyles count="0" defaultTableStyle="TableStyleMedium2" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#,
        );
        xml
    }
}

fn number_format_id(
    format: &NumberFormat,
    numfmts: &mut Vec<(u32, String)>,
    ids: &mut HashMap<String, u32>,
) -> u32 {
    match format {
        NumberFormat::General => 0,
        NumberFormat::BuiltIn(id) => *id,
        NumberFormat::Custom(code) => *ids.entry(code.clone()).or_insert_with(|| {
            let id = FIRST_CUSTOM_NUMFMT + numfmts.len() as u32;
            numfmts.push((id, code.clone()));
            id
        }),
    }
}

fn color_attrs(color: &Color) -> String {
    match color {
        Color::Auto => " auto=\"1\"".to_string(),
        Color::Rgb { .. } | Color::Argb { .. } => format!(" rgb=\"{}\"", color.to_argb_hex()),
        Color::Indexed(i) => format!(" indexed=\"{}\"", i),
        Color::Theme { index, tint } if *tint == 0 => format!(" theme=\"{}\"", index),
        Color::Theme { index, tint } => {
            format!(" theme=\"{}\" tint=\"{}\"", index, *tint as f64 / 100.0)
        }
    }
}

fn write_color(tag: &str, color: &Color) -> String {
    format!("<{}{}/>", tag, color_attrs(color))
}

fn write_font(font: &FontStyle) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.strikethrough {
        s.push_str("<strike/>");
    }
    match font.underline {
        Underline::None => {}
        Underline::Single => s.push_str("<u/>"),
        Underline::Double => s.push_str("<u val=\"double\"/>"),
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size()));
    if font.color != Color::Auto {
        s.push_str(&write_color("color", &font.color));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape(&font.name)));
    s.push_str("</font>");
    s
}

/// Differential fonts list only what the rule changes
fn write_dxf_font(font: &FontStyle) -> String {
    let default = FontStyle::default();
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.strikethrough {
        s.push_str("<strike/>");
    }
    match font.underline {
        Underline::None => {}
        Underline::Single => s.push_str("<u/>"),
        Underline::Double => s.push_str("<u val=\"double\"/>"),
    }
    if font.size() != default.size() {
        s.push_str(&format!("<sz val=\"{}\"/>", font.size()));
    }
    if font.color != Color::Auto {
        s.push_str(&write_color("color", &font.color));
    }
    if font.name != default.name {
        s.push_str(&format!("<name val=\"{}\"/>", escape(&font.name)));
    }
    s.push_str("</font>");
    s
}

/// In a dxf, a solid fill's color goes in `bgColor`
fn write_fill(fill: &FillStyle, dxf: bool) -> String {
    match fill {
        FillStyle::None => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        FillStyle::Solid { color } if dxf => format!(
            "<fill><patternFill patternType=\"solid\">{}</patternFill></fill>",
            write_color("bgColor", color)
        ),
        FillStyle::Solid { color } => format!(
            "<fill><patternFill patternType=\"solid\">{}<bgColor indexed=\"64\"/></patternFill></fill>",
            write_color("fgColor", color)
        ),
        FillStyle::Pattern {
            pattern,
            foreground,
            background,
        } => format!(
            "<fill><patternFill patternType=\"{}\">{}{}</patternFill></fill>",
            pattern.as_xlsx(),
            write_color("fgColor", foreground),
            write_color("bgColor", background)
        ),
    }
}

fn write_border(border: &BorderStyle) -> String {
    let mut s = String::from("<border>");
    for (tag, edge) in border.edges() {
        match edge {
            Some(e) if e.style != BorderLineStyle::None => {
                s.push_str(&format!(
                    "<{tag} style=\"{}\">{}</{tag}>",
                    e.style.as_xlsx(),
                    write_color("color", &e.color),
                    tag = tag
                ));
            }
            _ => s.push_str(&format!("<{}/>", tag)),
        }
    }
    s.push_str("<diagonal/></border>");
    s
}

fn write_alignment(al: &Alignment) -> String {
    let default = Alignment::default();
    if al == &default {
        return String::new();
    }
    let mut s = String::from("<alignment");
    if al.horizontal != default.horizontal {
        s.push_str(&format!(" horizontal=\"{}\"", al.horizontal.as_xlsx()));
    }
    if al.vertical != default.vertical {
        s.push_str(&format!(" vertical=\"{}\"", al.vertical.as_xlsx()));
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    s.push_str("/>");
    s
}

fn write_protection(p: &Protection) -> String {
    let default = Protection::default();
    if p == &default {
        return String::new();
    }
    format!(
        "<protection locked=\"{}\" hidden=\"{}\"/>",
        u8::from(p.locked),
        u8::from(p.hidden)
    )
}

fn write_xf(style: &Style, ids: ResolvedXfIds) -> String {
    let mut attrs = String::new();
    if ids.num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if style.font != FontStyle::default() {
        attrs.push_str(" applyFont=\"1\"");
    }
    if style.fill != FillStyle::None {
        attrs.push_str(" applyFill=\"1\"");
    }
    if style.border != BorderStyle::default() {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if style.alignment != Alignment::default() {
        attrs.push_str(" applyAlignment=\"1\"");
    }
    if style.protection != Protection::default() {
        attrs.push_str(" applyProtection=\"1\"");
    }

    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id, attrs
    );
    let children = write_alignment(&style.alignment) + &write_protection(&style.protection);
    if children.is_empty() {
        s.push_str("/>");
    } else {
        s.push('>');
        s.push_str(&children);
        s.push_str("</xf>");
    }
    s
}

fn write_dxf(style: &Style, num_fmt_id: u32) -> String {
    let mut s = String::from("<dxf>");
    if style.font != FontStyle::default() {
        s.push_str(&write_dxf_font(&style.font));
    }
    if let Some(code) = style.number_format.code().filter(|_| num_fmt_id != 0) {
        s.push_str(&format!(
            "<numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
            num_fmt_id,
            escape(code)
        ));
    }
    if style.fill != FillStyle::None {
        s.push_str(&write_fill(&style.fill, true));
    }
    if style.alignment != Alignment::default() {
        s.push_str(&write_alignment(&style.alignment));
    }
    if style.border != BorderStyle::default() {
        s.push_str(&write_border(&style.border));
    }
    s.push_str("</dxf>");
    s
}

// === Reading ===

/// Cell styles (cellXfs) and differential styles (dxfs) of a workbook
#[derive(Debug)]
pub(crate) struct ParsedStyles {
    pub cell_styles: Vec<Style>,
    pub dxf_styles: Vec<Style>,
}

impl Default for ParsedStyles {
    fn default() -> Self {
        Self {
            cell_styles: vec![Style::default()],
            dxf_styles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    Dxfs,
}

#[derive(Debug, Default)]
struct FillParts {
    pattern: Option<String>,
    fg: Option<Color>,
    bg: Option<Color>,
}

impl FillParts {
    fn finish(self, dxf: bool) -> FillStyle {
        let pattern = match self.pattern.as_deref() {
            // dxfs usually omit patternType for solid fills
            None if dxf => Some(PatternType::Solid),
            None => None,
            Some(p) => PatternType::from_xlsx(p),
        };
        match pattern {
            None => FillStyle::None,
            Some(PatternType::Solid) => {
                let color = if dxf {
                    self.bg.or(self.fg)
                } else {
                    self.fg.or(self.bg)
                };
                FillStyle::Solid {
                    color: color.unwrap_or(Color::Auto),
                }
            }
            Some(pattern) => FillStyle::Pattern {
                pattern,
                foreground: self.fg.unwrap_or(Color::Auto),
                background: self.bg.unwrap_or(Color::Auto),
            },
        }
    }
}

#[derive(Debug, Default)]
struct XfParts {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
    protection: Protection,
}

fn parse_color(e: &BytesStart<'_>) -> Color {
    if attr_bool(e, b"auto") == Some(true) {
        return Color::Auto;
    }
    if let Some(rgb) = attr(e, b"rgb") {
        let hex = match rgb.len() {
            8 if rgb[..2].eq_ignore_ascii_case("FF") => &rgb[2..],
            _ => rgb.as_str(),
        };
        if let Some(c) = Color::from_hex(hex) {
            return c;
        }
    }
    if let Some(i) = attr_parse::<u8>(e, b"indexed") {
        return Color::Indexed(i);
    }
    if let Some(index) = attr_parse::<u8>(e, b"theme") {
        let tint = attr_parse::<f64>(e, b"tint").unwrap_or(0.0);
        return Color::Theme {
            index,
            tint: (tint * 100.0).round() as i16,
        };
    }
    Color::Auto
}

/// Builder for whichever element is currently open
#[derive(Default)]
struct StylesParser {
    section: Option<Section>,
    numfmts: HashMap<u32, String>,
    fonts: Vec<FontStyle>,
    fills: Vec<FillStyle>,
    borders: Vec<BorderStyle>,
    xfs: Vec<XfParts>,
    dxfs: Vec<Style>,

    font: Option<FontStyle>,
    fill: Option<FillParts>,
    border: Option<BorderStyle>,
    border_edge: Option<String>,
    xf: Option<XfParts>,
    dxf: Option<Style>,
}

impl StylesParser {
    fn section(&self) -> Section {
        self.section.unwrap_or(Section::Other)
    }

    fn start(&mut self, e: &BytesStart<'_>, empty: bool) {
        let in_dxf = self.dxf.is_some();
        match e.name().as_ref() {
            b"fonts" => self.section = Some(Section::Fonts),
            b"fills" => self.section = Some(Section::Fills),
            b"borders" => self.section = Some(Section::Borders),
            b"cellXfs" => self.section = Some(Section::CellXfs),
            b"cellStyleXfs" | b"cellStyles" | b"colors" | b"tableStyles" => {
                self.section = Some(Section::Other)
            }
            b"dxfs" => self.section = Some(Section::Dxfs),

            b"numFmt" => {
                let id = attr_parse::<u32>(e, b"numFmtId").unwrap_or(0);
                let code = attr(e, b"formatCode").unwrap_or_default();
                if let Some(dxf) = self.dxf.as_mut() {
                    dxf.number_format = NumberFormat::from_code(&code);
                } else {
                    self.numfmts.insert(id, code);
                }
            }

            b"dxf" if self.section() == Section::Dxfs => {
                self.dxf = Some(Style::default());
                if empty {
                    self.end(b"dxf");
                }
            }

            b"font" if in_dxf || self.section() == Section::Fonts => {
                self.font = Some(FontStyle::default());
                if empty {
                    self.end(b"font");
                }
            }
            b"b" | b"i" | b"strike" => {
                let on = attr_bool(e, b"val").unwrap_or(true);
                if let Some(font) = self.font.as_mut() {
                    match e.name().as_ref() {
                        b"b" => font.bold = on,
                        b"i" => font.italic = on,
                        _ => font.strikethrough = on,
                    }
                }
            }
            b"u" => {
                if let Some(font) = self.font.as_mut() {
                    font.underline = Underline::from_xlsx(attr(e, b"val").as_deref());
                }
            }
            b"sz" => {
                if let (Some(font), Some(sz)) = (self.font.as_mut(), attr_parse(e, b"val")) {
                    font.set_size(sz);
                }
            }
            b"name" | b"rFont" => {
                if let (Some(font), Some(name)) = (self.font.as_mut(), attr(e, b"val")) {
                    font.name = name;
                }
            }

            b"fill" if in_dxf || self.section() == Section::Fills => {
                self.fill = Some(FillParts::default());
                if empty {
                    self.end(b"fill");
                }
            }
            b"patternFill" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.pattern = attr(e, b"patternType");
                }
            }
            b"fgColor" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.fg = Some(parse_color(e));
                }
            }
            b"bgColor" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.bg = Some(parse_color(e));
                }
            }

            b"border" if in_dxf || self.section() == Section::Borders => {
                self.border = Some(BorderStyle::default());
                if empty {
                    self.end(b"border");
                }
            }
            tag @ (b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end") => {
                let name = String::from_utf8_lossy(tag).into_owned();
                if let Some(border) = self.border.as_mut() {
                    let style = attr(e, b"style")
                        .and_then(|s| BorderLineStyle::parse(&s))
                        .filter(|s| *s != BorderLineStyle::None);
                    if let (Some(style), Some(edge)) = (style, border.edge_mut(&name)) {
                        *edge = Some(BorderEdge {
                            style,
                            color: Color::Auto,
                        });
                    }
                    self.border_edge = (!empty).then_some(name);
                }
            }

            b"color" => {
                let color = parse_color(e);
                if let (Some(border), Some(edge)) = (self.border.as_mut(), &self.border_edge) {
                    if let Some(Some(edge)) = border.edge_mut(edge) {
                        edge.color = color;
                    }
                } else if let Some(font) = self.font.as_mut() {
                    font.color = color;
                }
            }

            b"xf" if self.section() == Section::CellXfs => {
                self.xf = Some(XfParts {
                    num_fmt_id: attr_parse(e, b"numFmtId").unwrap_or(0),
                    font_id: attr_parse(e, b"fontId").unwrap_or(0),
                    fill_id: attr_parse(e, b"fillId").unwrap_or(0),
                    border_id: attr_parse(e, b"borderId").unwrap_or(0),
                    ..XfParts::default()
                });
                if empty {
                    self.end(b"xf");
                }
            }
            b"alignment" => {
                let target = match (self.xf.as_mut(), self.dxf.as_mut()) {
                    (Some(xf), _) => Some(&mut xf.alignment),
                    (None, Some(dxf)) => Some(&mut dxf.alignment),
                    _ => None,
                };
                if let Some(al) = target {
                    if let Some(h) = attr(e, b"horizontal").and_then(|v| HorizontalAlignment::parse(&v)) {
                        al.horizontal = h;
                    }
                    if let Some(v) = attr(e, b"vertical").and_then(|v| VerticalAlignment::parse(&v)) {
                        al.vertical = v;
                    }
                    al.wrap_text = attr_bool(e, b"wrapText").unwrap_or(false);
                }
            }
            b"protection" => {
                if let Some(xf) = self.xf.as_mut() {
                    xf.protection.locked = attr_bool(e, b"locked").unwrap_or(true);
                    xf.protection.hidden = attr_bool(e, b"hidden").unwrap_or(false);
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"fonts" | b"fills" | b"borders" | b"cellXfs" | b"dxfs" => self.section = None,
            b"font" => {
                if let Some(font) = self.font.take() {
                    match self.dxf.as_mut() {
                        Some(dxf) => dxf.font = font,
                        None => self.fonts.push(font),
                    }
                }
            }
            b"fill" => {
                if let Some(parts) = self.fill.take() {
                    match self.dxf.as_mut() {
                        Some(dxf) => dxf.fill = parts.finish(true),
                        None => self.fills.push(parts.finish(false)),
                    }
                }
            }
            b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end" => {
                self.border_edge = None;
            }
            b"border" => {
                if let Some(border) = self.border.take() {
                    match self.dxf.as_mut() {
                        Some(dxf) => dxf.border = border,
                        None => self.borders.push(border),
                    }
                }
            }
            b"xf" => {
                if let Some(xf) = self.xf.take() {
                    self.xfs.push(xf);
                }
            }
            b"dxf" => {
                if let Some(dxf) = self.dxf.take() {
                    self.dxfs.push(dxf);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> ParsedStyles {
        let mut cell_styles: Vec<Style> = self
            .xfs
            .iter()
            .map(|xf| Style {
                font: self.fonts.get(xf.font_id).cloned().unwrap_or_default(),
                fill: self.fills.get(xf.fill_id).copied().unwrap_or_default(),
                border: self.borders.get(xf.border_id).copied().unwrap_or_default(),
                alignment: xf.alignment,
                number_format: match self.numfmts.get(&xf.num_fmt_id) {
                    Some(code) => NumberFormat::from_code(code),
                    None if xf.num_fmt_id == 0 => NumberFormat::General,
                    None => NumberFormat::BuiltIn(xf.num_fmt_id),
                },
                protection: xf.protection,
            })
            .collect();
        if cell_styles.is_empty() {
            cell_styles.push(Style::default());
        }
        ParsedStyles {
            cell_styles,
            dxf_styles: self.dxfs,
        }
    }
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<ParsedStyles> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut parser = StylesParser::default();
    let mut buf = Vec::new();
    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.start(&e, false),
            Ok(Event::Empty(e)) => parser.start(&e, true),
            Ok(Event::End(e)) => parser.end(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(parser.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tsxl_core::CellValue;

    fn roundtrip(workbook: &Workbook) -> ParsedStyles {
        let table = XlsxStyleTable::build(workbook);
        read_styles_xml(Cursor::new(table.to_styles_xml().into_bytes())).unwrap()
    }

    #[test]
    fn test_build_dedups_across_sheets() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Two").unwrap();
        let bold = Style::new().bold(true);
        for i in 0..2 {
            let sheet = wb.worksheet_mut(i).unwrap();
            sheet.set_cell_value("A1", "x").unwrap();
            sheet.set_cell_style("A1", &bold).unwrap();
        }
        let table = XlsxStyleTable::build(&wb);
        assert_eq!(table.styles.len(), 2);
        assert_eq!(table.xf_id_for(0, 1), 1);
        assert_eq!(table.xf_id_for(1, 1), 1);
        assert_eq!(table.xf_id_for(1, 0), 0);
    }

    #[test]
    fn test_styles_roundtrip() {
        let style = Style::new()
            .bold(true)
            .font_size(14.0)
            .font_color(Color::rgb(0, 0, 255))
            .fill_color(Color::rgb(255, 255, 0))
            .number_format(NumberFormat::Custom("yyyy-mm-dd hh:mm".into()))
            .border_all(BorderLineStyle::Thin, Color::BLACK)
            .horizontal_alignment(HorizontalAlignment::Center);

        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(0, 0, CellValue::Number(1.0)).unwrap();
        sheet.set_cell_style_at(0, 0, &style).unwrap();

        let parsed = roundtrip(&wb);
        assert_eq!(parsed.cell_styles.len(), 2);
        assert_eq!(parsed.cell_styles[1], style);
    }

    #[test]
    fn test_dxf_fill_uses_bg_color() {
        use tsxl_core::ConditionalFormatRule;

        let format = Style::new().fill_color(Color::rgb(198, 239, 206)).bold(true);
        let mut wb = Workbook::new();
        wb.worksheet_mut(0).unwrap().add_conditional_format(
            ConditionalFormatRule::contains_blanks().with_format(format.clone()),
        );

        let table = XlsxStyleTable::build(&wb);
        let xml = table.to_styles_xml();
        assert!(xml.contains("<dxf><font><b/></font><fill><patternFill patternType=\"solid\"><bgColor rgb=\"FFC6EFCE\"/>"));
        assert_eq!(table.dxf_id_for(0, 0), Some(0));

        let parsed = read_styles_xml(Cursor::new(xml.into_bytes())).unwrap();
        assert_eq!(parsed.dxf_styles, vec![format]);
    }

    #[test]
    fn test_read_excel_style_sheet() {
        let xml = br#"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="165" formatCode="m/d/yyyy"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><sz val="12"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="2">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
  </fills>
  <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="165" fontId="1" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0"><alignment horizontal="right"/></xf>
  </cellXfs>
</styleSheet>"#;
        let parsed = read_styles_xml(Cursor::new(&xml[..])).unwrap();
        assert_eq!(parsed.cell_styles.len(), 3);

        let date = &parsed.cell_styles[1];
        assert!(date.number_format.is_date_format());
        assert!(date.font.bold);
        assert!(!date.font.italic);
        assert_eq!(date.font.name, "Arial");
        assert_eq!(date.font.color, Color::RED);

        let builtin = &parsed.cell_styles[2];
        assert_eq!(builtin.number_format, NumberFormat::BuiltIn(14));
        assert_eq!(builtin.alignment.horizontal, HorizontalAlignment::Right);
        assert_eq!(parsed.cell_styles[0].font.color, Color::Theme { index: 1, tint: 0 });
    }
}
