//! XLSX reader

mod sheet;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::{read_styles_xml, ParsedStyles};
use crate::xml::{attr, attr_bool, attr_parse, decode_excel_escapes, resolve_target, split_part_path};
use tsxl_core::{CellRange, DefinedName, NameScope, Workbook, Worksheet, WorksheetTable};

use sheet::SheetParser;

/// A `<sheet>` entry of workbook.xml
#[derive(Debug)]
struct SheetEntry {
    name: String,
    r_id: String,
    hidden: bool,
}

/// A `<definedName>` entry of workbook.xml
#[derive(Debug)]
struct NameEntry {
    name: String,
    local_sheet_id: Option<usize>,
    hidden: bool,
    comment: Option<String>,
    formula: String,
}

#[derive(Debug, Default)]
struct WorkbookPart {
    sheets: Vec<SheetEntry>,
    names: Vec<NameEntry>,
    date_1904: bool,
    active_tab: usize,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let styles = Self::read_styles(&mut archive)?;
        let book = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_rels(&mut archive, "xl/_rels/workbook.xml.rels", "xl")?;

        let mut workbook = Workbook::empty();
        workbook.settings_mut().date_1904 = book.date_1904;

        for entry in &book.sheets {
            let path = match sheet_paths.get(&entry.r_id) {
                Some((target, kind)) if kind.ends_with("/worksheet") => target.clone(),
                _ => {
                    log::debug!("skipping non-worksheet sheet '{}'", entry.name);
                    continue;
                }
            };

            let mut worksheet = Worksheet::new(entry.name.clone());
            worksheet.set_visible(!entry.hidden);
            let table_rids =
                Self::read_worksheet(&mut archive, &path, &mut worksheet, &shared_strings, &styles)?;
            let sheet_idx = workbook.add_existing_worksheet(worksheet)?;

            if !table_rids.is_empty() {
                let (dir, file) = split_part_path(&path);
                let rels_path = format!("{}/_rels/{}.rels", dir, file);
                let rels = Self::read_rels(&mut archive, &rels_path, dir)?;
                for r_id in table_rids {
                    let Some((target, _)) = rels.get(&r_id) else {
                        log::warn!("{}: table relationship {} not found", path, r_id);
                        continue;
                    };
                    let table = Self::read_table(&mut archive, target)?;
                    let name = table.name.clone();
                    if let Err(e) = workbook.add_table(sheet_idx, table) {
                        log::warn!("skipping table '{}': {}", name, e);
                    }
                }
            }
        }

        if workbook.is_empty() {
            workbook.add_worksheet()?;
        }
        if book.active_tab < workbook.sheet_count() {
            workbook.set_active_sheet(book.active_tab)?;
        }

        for entry in book.names {
            let scope = match entry.local_sheet_id {
                Some(i) if i < workbook.sheet_count() => NameScope::Sheet(i),
                Some(_) => continue,
                None => NameScope::Workbook,
            };
            let mut name = DefinedName::new(entry.name, entry.formula, scope);
            name.hidden = entry.hidden;
            name.comment = entry.comment;
            if let Err(e) = workbook.names_mut().define_or_replace(name) {
                log::warn!("skipping defined name: {}", e);
            }
        }

        log::debug!(
            "read workbook: {} sheets, {} names",
            workbook.sheet_count(),
            workbook.names().len()
        );
        Ok(workbook)
    }

    /// Read the shared strings table
    ///
    /// Rich-text runs are concatenated; phonetic runs are skipped.
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();
        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        // Keep leading/trailing spaces of cell text
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    current.push_str(&e.unescape()?);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<ParsedStyles> {
        match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file),
            Err(_) => Ok(ParsedStyles::default()),
        }
    }

    /// Sheets, defined names and workbook properties from workbook.xml
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<WorkbookPart> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut part = WorkbookPart::default();
        let mut current_name: Option<NameEntry> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"sheet" => {
                        if let (Some(name), Some(r_id)) = (attr(&e, b"name"), attr(&e, b"r:id")) {
                            let hidden = matches!(
                                attr(&e, b"state").as_deref(),
                                Some("hidden") | Some("veryHidden")
                            );
                            part.sheets.push(SheetEntry { name, r_id, hidden });
                        }
                    }
                    b"workbookPr" => {
                        part.date_1904 = attr_bool(&e, b"date1904").unwrap_or(false);
                    }
                    b"workbookView" => {
                        part.active_tab = attr_parse(&e, b"activeTab").unwrap_or(0);
                    }
                    b"definedName" => {
                        current_name = attr(&e, b"name").map(|name| NameEntry {
                            name,
                            local_sheet_id: attr_parse(&e, b"localSheetId"),
                            hidden: attr_bool(&e, b"hidden").unwrap_or(false),
                            comment: attr(&e, b"comment"),
                            formula: String::new(),
                        });
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let Some(entry) = current_name.as_mut() {
                        entry.formula.push_str(&e.unescape()?);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"definedName" => {
                    if let Some(entry) = current_name.take() {
                        part.names.push(entry);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(part)
    }

    /// Relationships of a part: id -> (resolved target, type)
    ///
    /// A missing rels part yields no relationships.
    fn read_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        rels_path: &str,
        base_dir: &str,
    ) -> XlsxResult<HashMap<String, (String, String)>> {
        let mut rels = HashMap::new();
        let file = match archive.by_name(rels_path) {
            Ok(f) => f,
            Err(_) => return Ok(rels),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);
        let mut buf = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    if let (Some(id), Some(target), Some(kind)) =
                        (attr(&e, b"Id"), attr(&e, b"Target"), attr(&e, b"Type"))
                    {
                        if attr(&e, b"TargetMode").as_deref() != Some("External") {
                            rels.insert(id, (resolve_target(base_dir, &target), kind));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Parse a worksheet part; returns the relationship ids of its table parts
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        styles: &ParsedStyles,
    ) -> XlsxResult<Vec<String>> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut parser = SheetParser::new(path, worksheet, shared_strings, styles);
        let mut buf = Vec::new();
        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => parser.start(&e, false)?,
                Ok(Event::Empty(e)) => parser.start(&e, true)?,
                Ok(Event::End(e)) => parser.end(e.name().as_ref())?,
                Ok(Event::Text(e)) => parser.text(&e.unescape()?),
                Ok(Event::CData(e)) => parser.text(&String::from_utf8_lossy(&e)),
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }
        Ok(parser.finish())
    }

    /// Parse a table part (`xl/tables/tableN.xml`)
    fn read_table<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
    ) -> XlsxResult<WorksheetTable> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);
        let mut buf = Vec::new();
        let mut table: Option<WorksheetTable> = None;
        let mut columns = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"table" => {
                        let name = attr(&e, b"name")
                            .or_else(|| attr(&e, b"displayName"))
                            .ok_or_else(|| XlsxError::parse(path, "table without a name"))?;
                        let reference = attr(&e, b"ref")
                            .ok_or_else(|| XlsxError::parse(path, "table without a ref"))?;
                        let area = CellRange::parse(&reference)?;
                        let mut t = WorksheetTable::new(name, area);
                        t.id = attr_parse(&e, b"id").unwrap_or(0);
                        if let Some(display) = attr(&e, b"displayName") {
                            t.display_name = display;
                        }
                        t.header_row_count = attr_parse(&e, b"headerRowCount").unwrap_or(1);
                        t.totals_row_count = attr_parse(&e, b"totalsRowCount").unwrap_or(0);
                        t.style_name = None;
                        table = Some(t);
                    }
                    b"tableColumn" => {
                        columns.push(decode_excel_escapes(&attr(&e, b"name").unwrap_or_default()));
                    }
                    b"tableStyleInfo" => {
                        if let Some(t) = table.as_mut() {
                            t.style_name = attr(&e, b"name");
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        let mut table = table.ok_or_else(|| XlsxError::parse(path, "missing <table> element"))?;
        if columns.len() == table.area.col_count() as usize {
            table.columns = columns;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

    fn package(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut zip = zip::ZipWriter::new(cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(CONTENT_TYPES).unwrap();
            for (name, data) in parts {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    const WORKBOOK_RELS: &[u8] = br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

    #[test]
    fn test_read_minimal_xlsx() {
        let buf = package(&[
            ("xl/workbook.xml", br#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", br#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData></sheetData></worksheet>"#),
        ]);

        let workbook = XlsxReader::read(Cursor::new(buf)).unwrap();
        assert_eq!(workbook.sheet_count(), 1);
        assert_eq!(workbook.worksheet(0).unwrap().name(), "Sheet1");
    }

    #[test]
    fn test_read_names_strings_and_1904() {
        let buf = package(&[
            ("xl/workbook.xml", br#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr date1904="1"/><sheets><sheet name="Flows" sheetId="1" r:id="rId1"/></sheets><definedNames><definedName name="Data">Flows!$A$1:$B$2</definedName><definedName name="Local" localSheetId="0">Flows!$B$1</definedName></definedNames></workbook>"#),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/sharedStrings.xml", br#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="2" uniqueCount="2"><si><t xml:space="preserve"> Flow </t></si><si><r><t>Ri</t></r><r><rPr><b/></rPr><t>ch</t></r><rPh><t>x</t></rPh></si></sst>"#),
            ("xl/worksheets/sheet1.xml", br#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row><row r="2"><c r="A2"><v>1.5</v></c><c r="B2" t="b"><v>1</v></c></row></sheetData></worksheet>"#),
        ]);

        let workbook = XlsxReader::read(Cursor::new(buf)).unwrap();
        assert!(workbook.is_date_1904());
        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.get_value_at(0, 0).as_string(), Some(" Flow "));
        assert_eq!(sheet.get_value_at(0, 1).as_string(), Some("Rich"));
        assert_eq!(sheet.get_value_at(1, 0).as_number(), Some(1.5));
        assert_eq!(sheet.get_value_at(1, 1).as_bool(), Some(true));

        assert_eq!(
            workbook.named_range("data", None).unwrap().refers_to,
            "Flows!$A$1:$B$2"
        );
        assert!(workbook.named_range("Local", Some(0)).is_some());
        assert!(workbook.named_range("Local", None).is_none());
    }

    #[test]
    fn test_missing_content_types() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("hello.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        assert!(matches!(
            XlsxReader::read(Cursor::new(buf)),
            Err(XlsxError::InvalidFormat(_))
        ));
    }
}
