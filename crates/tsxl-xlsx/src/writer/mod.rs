//! XLSX writer

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::XlsxStyleTable;
use crate::xml::{encode_excel_escapes, escape};
use tsxl_core::{
    CellAddress, CellValue, CfRuleType, NameScope, Workbook, Worksheet, WorksheetTable,
};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const TABLE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/table";

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write(workbook, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "a workbook needs at least one worksheet".into(),
            ));
        }
        let mut zip = zip::ZipWriter::new(writer);
        let style_table = XlsxStyleTable::build(workbook);

        // Table parts are numbered across the whole workbook
        let mut table_numbers: Vec<Vec<usize>> = Vec::with_capacity(workbook.sheet_count());
        let mut next_table = 1;
        for sheet in workbook.worksheets() {
            let numbers: Vec<usize> = (next_table..next_table + sheet.tables().len()).collect();
            next_table += numbers.len();
            table_numbers.push(numbers);
        }

        Self::write_content_types(&mut zip, workbook.sheet_count(), next_table - 1)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook.sheet_count())?;
        Self::write_part(&mut zip, "xl/styles.xml", &style_table.to_styles_xml())?;

        for (i, sheet) in workbook.worksheets().enumerate() {
            let xml = Self::worksheet_xml(workbook, i, sheet, &style_table);
            Self::write_part(&mut zip, &format!("xl/worksheets/sheet{}.xml", i + 1), &xml)?;

            if !sheet.tables().is_empty() {
                Self::write_sheet_rels(&mut zip, i, &table_numbers[i])?;
                for (table, n) in sheet.tables().iter().zip(&table_numbers[i]) {
                    Self::write_part(
                        &mut zip,
                        &format!("xl/tables/table{}.xml", n),
                        &Self::table_xml(table),
                    )?;
                }
            }
        }

        zip.finish()?;
        log::debug!("wrote workbook with {} sheets", workbook.sheet_count());
        Ok(())
    }

    fn write_part<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        name: &str,
        content: &str,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_count: usize,
        table_count: usize,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );
        for i in 1..=sheet_count {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
        }
        for i in 1..=table_count {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/tables/table{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/>"#,
                i
            ));
        }
        content.push_str("\n</Types>");
        Self::write_part(zip, "[Content_Types].xml", &content)
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        Self::write_part(zip, "_rels/.rels", content)
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let settings = workbook.settings();
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{}" xmlns:r="{}">
    <workbookPr{}/>
    <bookViews>
        <workbookView activeTab="{}"/>
    </bookViews>
    <sheets>"#,
            MAIN_NS,
            REL_NS,
            if settings.date_1904 { r#" date1904="1""# } else { "" },
            settings.active_sheet
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
                escape(sheet.name()),
                i + 1,
                if sheet.is_visible() { "" } else { r#" state="hidden""# },
                i + 1
            ));
        }
        content.push_str("\n    </sheets>");

        if !workbook.names().is_empty() {
            content.push_str("\n    <definedNames>");
            for name in workbook.names().iter() {
                let mut attrs = format!(" name=\"{}\"", escape(&name.name));
                if let NameScope::Sheet(i) = name.scope {
                    attrs.push_str(&format!(" localSheetId=\"{}\"", i));
                }
                if name.hidden {
                    attrs.push_str(" hidden=\"1\"");
                }
                if let Some(comment) = &name.comment {
                    attrs.push_str(&format!(" comment=\"{}\"", escape(comment)));
                }
                content.push_str(&format!(
                    "\n        <definedName{}>{}</definedName>",
                    attrs,
                    escape(&name.refers_to)
                ));
            }
            content.push_str("\n    </definedNames>");
        }

        content.push_str(&format!(
            "\n    <calcPr calcId=\"191029\"{}/>\n</workbook>",
            if settings.full_calc_on_load { " fullCalcOnLoad=\"1\"" } else { "" }
        ));
        Self::write_part(zip, "xl/workbook.xml", &content)
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_count: usize,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=sheet_count {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            ));
        }
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
            sheet_count + 1
        ));
        Self::write_part(zip, "xl/_rels/workbook.xml.rels", &content)
    }

    fn write_sheet_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_index: usize,
        table_numbers: &[usize],
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, n) in table_numbers.iter().enumerate() {
            content.push_str(&format!(
                "\n    <Relationship Id=\"rId{}\" Type=\"{}\" Target=\"../tables/table{}.xml\"/>",
                i + 1,
                TABLE_REL,
                n
            ));
        }
        content.push_str("\n</Relationships>");
        Self::write_part(
            zip,
            &format!("xl/worksheets/_rels/sheet{}.xml.rels", sheet_index + 1),
            &content,
        )
    }

    fn worksheet_xml(
        workbook: &Workbook,
        index: usize,
        sheet: &Worksheet,
        style_table: &XlsxStyleTable,
    ) -> String {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{}" xmlns:r="{}">
    <dimension ref="{}"/>"#,
            MAIN_NS,
            REL_NS,
            sheet
                .used_range()
                .map_or_else(|| "A1".to_string(), |r| r.to_a1_string())
        );

        Self::write_sheet_views(&mut content, sheet, index == workbook.active_sheet());
        content.push_str("\n    <sheetFormatPr defaultRowHeight=\"15\"/>");
        Self::write_cols(&mut content, sheet);
        Self::write_sheet_data(&mut content, index, sheet, style_table);

        let merged = sheet.merged_regions();
        if !merged.is_empty() {
            content.push_str(&format!("\n    <mergeCells count=\"{}\">", merged.len()));
            for range in merged {
                content.push_str(&format!("\n        <mergeCell ref=\"{}\"/>", range));
            }
            content.push_str("\n    </mergeCells>");
        }

        Self::write_conditional_formatting(&mut content, sheet, index, style_table);

        content.push_str(
            r#"
    <pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
        );

        if !sheet.tables().is_empty() {
            content.push_str(&format!(
                "\n    <tableParts count=\"{}\">",
                sheet.tables().len()
            ));
            for i in 1..=sheet.tables().len() {
                content.push_str(&format!("\n        <tablePart r:id=\"rId{}\"/>", i));
            }
            content.push_str("\n    </tableParts>");
        }

        content.push_str("\n</worksheet>");
        content
    }

    fn write_sheet_views(content: &mut String, sheet: &Worksheet, active: bool) {
        let view = sheet.view();
        let mut attrs = String::new();
        if active || view.selected {
            attrs.push_str(" tabSelected=\"1\"");
        }
        if !view.show_gridlines {
            attrs.push_str(" showGridLines=\"0\"");
        }
        if view.zoom_scale != 100 {
            attrs.push_str(&format!(" zoomScale=\"{}\"", view.zoom_scale));
        }
        content.push_str(&format!(
            "\n    <sheetViews>\n        <sheetView{} workbookViewId=\"0\">",
            attrs
        ));

        let mut pane_name = None;
        if let Some(pane) = &view.freeze {
            let mut split = String::new();
            if pane.cols > 0 {
                split.push_str(&format!(" xSplit=\"{}\"", pane.cols));
            }
            if pane.rows > 0 {
                split.push_str(&format!(" ySplit=\"{}\"", pane.rows));
            }
            content.push_str(&format!(
                "\n            <pane{} topLeftCell=\"{}\" activePane=\"{}\" state=\"frozen\"/>",
                split,
                pane.top_left_cell(),
                pane.active_pane()
            ));
            pane_name = Some(pane.active_pane());
        }
        if let Some(cell) = &view.active_cell {
            let pane_attr = pane_name.map_or(String::new(), |p| format!(" pane=\"{}\"", p));
            content.push_str(&format!(
                "\n            <selection{} activeCell=\"{}\" sqref=\"{}\"/>",
                pane_attr, cell, cell
            ));
        }
        content.push_str("\n        </sheetView>\n    </sheetViews>");
    }

    /// Consecutive columns with the same width share one `<col>`
    fn write_cols(content: &mut String, sheet: &Worksheet) {
        let mut spans: Vec<(u16, u16, f64)> = Vec::new();
        for (col, width) in sheet.column_widths() {
            match spans.last_mut() {
                Some((_, last, w)) if *last + 1 == col && *w == width => *last = col,
                _ => spans.push((col, col, width)),
            }
        }
        if spans.is_empty() {
            return;
        }
        content.push_str("\n    <cols>");
        for (first, last, width) in spans {
            content.push_str(&format!(
                "\n        <col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>",
                first + 1,
                last + 1,
                width
            ));
        }
        content.push_str("\n    </cols>");
    }

    fn write_sheet_data(
        content: &mut String,
        index: usize,
        sheet: &Worksheet,
        style_table: &XlsxStyleTable,
    ) {
        content.push_str("\n    <sheetData>");
        let mut current_row: Option<u32> = None;
        for (row, col, cell) in sheet.iter_cells() {
            if current_row != Some(row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", row + 1));
                current_row = Some(row);
            }

            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let xf_id = style_table.xf_id_for(index, cell.style_index);
            let style_attr = if xf_id != 0 {
                format!(" s=\"{}\"", xf_id)
            } else {
                String::new()
            };

            content.push_str("\n            ");
            match &cell.value {
                CellValue::Formula { text, cached_value } => {
                    let formula = escape(text.strip_prefix('=').unwrap_or(text));
                    let (kind, cached) = match cached_value.as_deref() {
                        Some(v) => Self::value_parts(v),
                        None => (None, None),
                    };
                    let kind_attr = kind.map_or(String::new(), |k| format!(" t=\"{}\"", k));
                    let cached = cached.map_or(String::new(), |v| format!("<v>{}</v>", v));
                    content.push_str(&format!(
                        "<c r=\"{}\"{}{}><f>{}</f>{}</c>",
                        cell_ref, style_attr, kind_attr, formula, cached
                    ));
                }
                CellValue::String(s) => {
                    let space = if s.trim() != s { " xml:space=\"preserve\"" } else { "" };
                    content.push_str(&format!(
                        "<c r=\"{}\"{} t=\"inlineStr\"><is><t{}>{}</t></is></c>",
                        cell_ref,
                        style_attr,
                        space,
                        escape(&encode_excel_escapes(s))
                    ));
                }
                CellValue::Empty => {
                    content.push_str(&format!("<c r=\"{}\"{}/>", cell_ref, style_attr));
                }
                other => {
                    let (kind, value) = Self::value_parts(other);
                    let kind_attr = kind.map_or(String::new(), |k| format!(" t=\"{}\"", k));
                    content.push_str(&format!(
                        "<c r=\"{}\"{}{}><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        kind_attr,
                        value.unwrap_or_default()
                    ));
                }
            }
        }
        if current_row.is_some() {
            content.push_str("\n        </row>");
        }
        content.push_str("\n    </sheetData>");
    }

    /// `t` attribute and `<v>` text for a plain value
    ///
    /// Non-finite numbers have no XLSX representation and become `#NUM!`.
    fn value_parts(value: &CellValue) -> (Option<&'static str>, Option<String>) {
        match value {
            CellValue::Number(n) if n.is_finite() => (None, Some(n.to_string())),
            CellValue::Number(_) => (Some("e"), Some("#NUM!".into())),
            CellValue::Boolean(b) => (Some("b"), Some(u8::from(*b).to_string())),
            CellValue::Error(e) => (Some("e"), Some(escape(e.as_str()))),
            CellValue::String(s) => (Some("str"), Some(escape(&encode_excel_escapes(s)))),
            CellValue::Empty | CellValue::Formula { .. } => (None, None),
        }
    }

    fn write_conditional_formatting(
        content: &mut String,
        sheet: &Worksheet,
        sheet_index: usize,
        style_table: &XlsxStyleTable,
    ) {
        for (rule_idx, rule) in sheet.conditional_formats().iter().enumerate() {
            if rule.ranges.is_empty() {
                continue;
            }
            let mut attrs = format!(" type=\"{}\"", rule.rule_type.xlsx_type());
            if let Some(dxf) = style_table.dxf_id_for(sheet_index, rule_idx) {
                attrs.push_str(&format!(" dxfId=\"{}\"", dxf));
            }
            attrs.push_str(&format!(" priority=\"{}\"", rule.priority.max(1)));
            if rule.stop_if_true {
                attrs.push_str(" stopIfTrue=\"1\"");
            }
            match &rule.rule_type {
                CfRuleType::CellIs { operator, .. } => {
                    attrs.push_str(&format!(" operator=\"{}\"", operator.xlsx_operator()));
                }
                CfRuleType::ContainsText { text } => {
                    attrs.push_str(&format!(" operator=\"containsText\" text=\"{}\"", escape(text)));
                }
                CfRuleType::BeginsWith { text } => {
                    attrs.push_str(&format!(" operator=\"beginsWith\" text=\"{}\"", escape(text)));
                }
                CfRuleType::EndsWith { text } => {
                    attrs.push_str(&format!(" operator=\"endsWith\" text=\"{}\"", escape(text)));
                }
                _ => {}
            }

            content.push_str(&format!(
                "\n    <conditionalFormatting sqref=\"{}\">\n        <cfRule{}>",
                rule.sqref(),
                attrs
            ));
            if let CfRuleType::ColorScale { stops } = &rule.rule_type {
                content.push_str("\n            <colorScale>");
                for stop in stops {
                    let val = stop
                        .value
                        .as_ref()
                        .map_or(String::new(), |v| format!(" val=\"{}\"", escape(v)));
                    content.push_str(&format!(
                        "\n                <cfvo type=\"{}\"{}/>",
                        stop.kind.xlsx_type(),
                        val
                    ));
                }
                for stop in stops {
                    content.push_str(&format!(
                        "\n                <color rgb=\"{}\"/>",
                        stop.color.to_argb_hex()
                    ));
                }
                content.push_str("\n            </colorScale>");
            }
            for formula in rule.formulas() {
                content.push_str(&format!(
                    "\n            <formula>{}</formula>",
                    escape(&formula)
                ));
            }
            content.push_str("\n        </cfRule>\n    </conditionalFormatting>");
        }
    }

    fn table_xml(table: &WorksheetTable) -> String {
        let mut attrs = String::new();
        if table.header_row_count == 0 {
            attrs.push_str(" headerRowCount=\"0\"");
        }
        if table.totals_row_count > 0 {
            attrs.push_str(&format!(" totalsRowCount=\"{}\"", table.totals_row_count));
        }
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="{}" id="{}" name="{}" displayName="{}" ref="{}"{}>"#,
            MAIN_NS,
            table.id,
            escape(&table.name),
            escape(&table.display_name),
            table.area,
            attrs
        );
        if table.header_row_count > 0 {
            let filter_range = match table.totals_row_count {
                0 => table.area,
                _ => tsxl_core::CellRange::from_indices(
                    table.area.start.row,
                    table.area.start.col,
                    table.area.end.row.saturating_sub(1),
                    table.area.end.col,
                ),
            };
            content.push_str(&format!("\n    <autoFilter ref=\"{}\"/>", filter_range));
        }
        content.push_str(&format!(
            "\n    <tableColumns count=\"{}\">",
            table.columns.len()
        ));
        for (i, name) in table.columns.iter().enumerate() {
            content.push_str(&format!(
                "\n        <tableColumn id=\"{}\" name=\"{}\"/>",
                i + 1,
                escape(&encode_excel_escapes(name))
            ));
        }
        content.push_str("\n    </tableColumns>");
        if let Some(style) = &table.style_name {
            content.push_str(&format!(
                "\n    <tableStyleInfo name=\"{}\" showFirstColumn=\"0\" showLastColumn=\"0\" showRowStripes=\"1\" showColumnStripes=\"0\"/>",
                escape(style)
            ));
        }
        content.push_str("\n</table>");
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tsxl_core::{CellRange, ConditionalFormatRule, Style};

    fn write_to_vec(workbook: &Workbook) -> Vec<u8> {
        let mut buf = Vec::new();
        XlsxWriter::write(workbook, Cursor::new(&mut buf)).unwrap();
        buf
    }

    fn part(buf: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(buf)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        std::io::Read::read_to_string(&mut file, &mut s).unwrap();
        s
    }

    #[test]
    fn test_write_simple() {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", "Hello & <bye>").unwrap();
        sheet.set_cell_value("B2", 42.5).unwrap();
        sheet.set_cell_value("C3", true).unwrap();

        let buf = write_to_vec(&wb);
        let xml = part(&buf, "xl/worksheets/sheet1.xml");
        assert!(xml.contains("<dimension ref=\"A1:C3\"/>"));
        assert!(xml.contains("Hello &amp; &lt;bye&gt;"));
        assert!(xml.contains("<c r=\"B2\"><v>42.5</v></c>"));
        assert!(xml.contains("<c r=\"C3\" t=\"b\"><v>1</v></c>"));
    }

    #[test]
    fn test_write_empty_workbook_fails() {
        let mut buf = Vec::new();
        assert!(XlsxWriter::write(&Workbook::empty(), Cursor::new(&mut buf)).is_err());
    }

    #[test]
    fn test_freeze_pane_xml() {
        let mut wb = Workbook::new();
        wb.worksheet_mut(0).unwrap().set_freeze_panes(1, 1).unwrap();
        let xml = part(&write_to_vec(&wb), "xl/worksheets/sheet1.xml");
        assert!(xml.contains(
            "<pane xSplit=\"1\" ySplit=\"1\" topLeftCell=\"B2\" activePane=\"bottomRight\" state=\"frozen\"/>"
        ));
    }

    #[test]
    fn test_table_parts() {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", "Date").unwrap();
        sheet.set_cell_value("B1", "Flow").unwrap();
        wb.add_table(
            0,
            WorksheetTable::new("Flows", CellRange::parse("A1:B3").unwrap())
                .with_columns(["Date", "Flow"]),
        )
        .unwrap();

        let buf = write_to_vec(&wb);
        let table = part(&buf, "xl/tables/table1.xml");
        assert!(table.contains("name=\"Flows\""));
        assert!(table.contains("<tableColumn id=\"2\" name=\"Flow\"/>"));
        assert!(part(&buf, "[Content_Types].xml").contains("/xl/tables/table1.xml"));
        assert!(part(&buf, "xl/worksheets/_rels/sheet1.xml.rels").contains("../tables/table1.xml"));
        assert!(part(&buf, "xl/worksheets/sheet1.xml").contains("<tablePart r:id=\"rId1\"/>"));
    }

    #[test]
    fn test_conditional_format_xml() {
        let mut wb = Workbook::new();
        wb.worksheet_mut(0).unwrap().add_conditional_format(
            ConditionalFormatRule::contains_text("low")
                .with_range(CellRange::parse("B2:B10").unwrap())
                .with_format(Style::new().bold(true)),
        );
        let xml = part(&write_to_vec(&wb), "xl/worksheets/sheet1.xml");
        assert!(xml.contains("<conditionalFormatting sqref=\"B2:B10\">"));
        assert!(xml.contains(
            "<cfRule type=\"containsText\" dxfId=\"0\" priority=\"1\" operator=\"containsText\" text=\"low\">"
        ));
        assert!(xml.contains("<formula>NOT(ISERROR(SEARCH(&quot;low&quot;,B2)))</formula>"));
    }

    #[test]
    fn test_defined_names_and_date_1904() {
        let mut wb = Workbook::new();
        wb.settings_mut().date_1904 = true;
        wb.define_name("Data", "Sheet1!$A$1:$B$4").unwrap();
        let xml = part(&write_to_vec(&wb), "xl/workbook.xml");
        assert!(xml.contains("<workbookPr date1904=\"1\"/>"));
        assert!(xml.contains("<definedName name=\"Data\">Sheet1!$A$1:$B$4</definedName>"));
    }
}
