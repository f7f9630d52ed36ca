use crate::error::ResultMessage;
use crate::error::SheetPipelineError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::cell_error;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::options::ReadOptions;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SheetSource;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use log::debug;
use log::info;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use zip::ZipArchive;

// XML tag names for parsing the XLSX parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship";           // Package relationship
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");        // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");          // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");        // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");               // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");         // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");             // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                        // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");                   // Worksheet definition
const TAG_ROW: QName = QName(b"row");                       // Row in worksheet
const TAG_CELL: QName = QName(b"c");                        // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");              // Inline string value
const TAG_VALUE: QName = QName(b"v");                       // Cell value content

/// An Excel 2007+ workbook (`.xlsx`, `.xlsm`).
pub(crate) struct XlsxWorkbook<RS: Read + Seek> {
    /// File name of the workbook
    name: String,
    /// ZIP archive containing the workbook parts
    zip: ZipArchive<RS>,
    /// Parsed number formats for cell type detection, indexed by style id
    number_formats: Vec<CellType>,
    /// Worksheets as (name, zip_path) pairs, in workbook order
    sheets: Vec<(String, String)>,
    /// Shared string table, loaded on the first sheet read
    shared_strings: Option<Vec<String>>,
}

impl XlsxWorkbook<BufReader<File>> {
    pub(crate) fn open(path: &Path) -> Result<Self, SheetPipelineError> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(SheetPipelineError::from).with_prefix(&format!("Open '{}' failed", name))?;
        Self::from_reader(&name, BufReader::new(file))
    }
}

impl<RS: Read + Seek> XlsxWorkbook<RS> {
    /// Parses the workbook structure from any seekable reader.
    pub(crate) fn from_reader(name: &str, reader: RS) -> Result<Self, SheetPipelineError> {
        let mut zip = ZipArchive::new(reader).map_err(SheetPipelineError::from).with_prefix(&format!("Read '{}' failed", name))?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptySpreadsheet(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        debug!("Workbook '{}' has {} sheets", name, sheets.len());
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets,
            shared_strings: None,
        })
    }
}

impl<RS: Read + Seek> SheetSource for XlsxWorkbook<RS> {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Reads one worksheet, converting each cell in the requested range to a table value.
    fn read_sheet(&mut self, sheet_name: &str, options: &ReadOptions) -> Result<Table, SheetPipelineError> {
        let zip_path = self
            .sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound(self.name.to_owned(), sheet_name.to_owned()))?;

        if self.shared_strings.is_none() {
            self.shared_strings = Some(load_shared_strings(&mut self.zip)?);
        }
        let shared_strings = self.shared_strings.as_deref().unwrap_or_default();

        let mut sheet = Sheet::new(options.range);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self
            .zip
            .xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.get_attribute_value("r")? {
                    row_count = number.parse::<usize>()?.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                value.clear();
                if sheet.after_row_upper_bound(row) {
                    break;
                } else if sheet.contains(row, col) {
                    kind = match event.get_attribute_value("t")?.as_deref() {
                        Some("inlineStr") | Some("str") => CellType::InlineString,
                        Some("s") => CellType::SharedString,
                        Some("d") => CellType::IsoDateTime,
                        Some("b") => CellType::Boolean,
                        Some("e") => CellType::Error,
                        _ => CellType::Number,
                    };
                    if let Some(format_id) = event.get_attribute_value("s")? {
                        if kind == CellType::Number && !format_id.is_empty() {
                            let index = format_id.parse::<usize>()?;
                            kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                        }
                    }
                } else {
                    kind = CellType::default();
                }
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if kind != CellType::Empty && event.name() == TAG_CELL => {
                let cell = Cell {
                    row,
                    col,
                    kind,
                    value: std::mem::take(&mut value),
                };
                kind = CellType::default();
                if cell.kind == CellType::Error && !cell.value.is_empty() {
                    if !options.error_as_null {
                        let message = cell.value.to_owned();
                        return Err(cell_error(&self.name, sheet_name, &cell, message));
                    }
                } else if !cell.value.is_empty() {
                    let converted = cell
                        .to_value(shared_strings)
                        .map_err(|message| cell_error(&self.name, sheet_name, &cell, message))?;
                    sheet.push(row, col, converted);
                }
            }
        });

        let table = sheet.into_table(options)?;
        info!(
            "Loaded sheet '{}' from '{}': {} rows, {} columns",
            sheet_name,
            self.name,
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }
}

/// Loads the worksheet relationships of the workbook part.
///
/// # Returns
/// Mapping of relationship ids to worksheet paths inside the archive
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, SheetPipelineError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheets; chart sheets and dialogs have no cells to read
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target against the `xl/` folder.
fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads worksheet names with their part paths, and whether the workbook uses the 1904 date system.
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), SheetPipelineError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Maps each cell style to the type its number format implies.
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, SheetPipelineError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Loads the whole shared string table; an absent part means no shared strings.
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, SheetPipelineError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads the text up to `end_tag`, skipping phonetic runs.
///
/// Rich text is flattened: the `<t>` runs are concatenated. `is_text_content`
/// treats character data directly under the element as text (as in `<v>`).
fn read_string_value<B: BufRead>(
    reader: &mut XmlReader<B>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SheetPipelineError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = is_text_content,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::Value;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr/>
  <sheets>
    <sheet name="Sales" sheetId="1" r:id="rId1"/>
    <sheet name="Empty" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/></numFmts>
  <cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="14"/></cellXfs>
</styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>Region</t></si>
  <si><t>Total</t></si>
  <si><r><t>North</t></r><r><t xml:space="preserve"> East</t></r><rPh><t>ignored</t></rPh></si>
  <si><t>Date</t></si>
</sst>"#;

    const SHEET1: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>3</v></c><c r="D1" t="inlineStr"><is><t>Open</t></is></c></row>
    <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>1500</v></c><c r="C2" s="1"><v>45413</v></c><c r="D2" t="b"><v>1</v></c></row>
    <row r="4"><c r="A4" t="inlineStr"><is><t>West &amp; Co</t></is></c><c r="B4" t="e"><v>#DIV/0!</v></c><c r="C4" s="2"><v>45414</v></c></row>
  </sheetData>
</worksheet>"#;

    const SHEET2: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;

    fn workbook_bytes(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).expect("start file");
            writer.write_all(content.as_bytes()).expect("write part");
        }
        writer.finish().expect("finish zip").into_inner()
    }

    fn workbook() -> XlsxWorkbook<Cursor<Vec<u8>>> {
        let bytes = workbook_bytes(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ]);
        XlsxWorkbook::from_reader("sales.xlsx", Cursor::new(bytes)).expect("valid workbook")
    }

    #[test]
    fn list_sheets_in_workbook_order() {
        let workbook = workbook();
        assert_eq!(workbook.sheet_names(), vec!["Sales", "Empty"]);
        assert_eq!(workbook.name(), "sales.xlsx");
    }

    #[test]
    fn read_sheet_values() {
        let mut workbook = workbook();
        let table = workbook.read_sheet("Sales", &ReadOptions::default()).expect("sheet is readable");

        assert_eq!(table.columns(), ["Region", "Total", "Date", "Open"].map(str::to_owned));
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows()[0],
            vec![
                Value::from("North East"),
                Value::Number(1500.0),
                Value::from("2024-05-01"),
                Value::from("true"),
            ]
        );
        assert_eq!(
            table.rows()[1],
            vec![Value::from("West & Co"), Value::Missing, Value::from("2024-05-02"), Value::Missing]
        );
    }

    #[test]
    fn read_sheet_error_cells() {
        let mut workbook = workbook();
        let options = ReadOptions {
            error_as_null: false,
            ..ReadOptions::default()
        };
        let error = workbook.read_sheet("Sales", &options).unwrap_err();
        assert!(error.to_string().contains("B4"));
        assert_eq!(error.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn read_sheet_date_serial_out_of_range() {
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="inlineStr"><is><t>Due</t></is></c></row>
    <row r="2"><c r="A2" s="1"><v>1e9</v></c></row>
  </sheetData>
</worksheet>"#;
        let bytes = workbook_bytes(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", sheet),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ]);
        let mut workbook = XlsxWorkbook::from_reader("dates.xlsx", Cursor::new(bytes)).expect("valid workbook");

        let error = workbook.read_sheet("Sales", &ReadOptions::default()).unwrap_err();
        assert!(matches!(
            error,
            SheetPipelineError::SpreadsheetError(SpreadsheetError::CellValueError(..))
        ));
        assert!(error.to_string().contains("A2"));
    }

    #[test]
    fn read_sheet_with_range() {
        let mut workbook = workbook();
        let options = ReadOptions {
            range: Some("A1:B2".parse().expect("valid range")),
            ..ReadOptions::default()
        };
        let table = workbook.read_sheet("Sales", &options).expect("sheet is readable");
        assert_eq!(table.columns(), ["Region", "Total"].map(str::to_owned));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn read_empty_and_unknown_sheets() {
        let mut workbook = workbook();
        let table = workbook.read_sheet("Empty", &ReadOptions::default()).expect("sheet is readable");
        assert!(table.is_empty());
        assert_eq!(table.column_count(), 0);

        let error = workbook.read_sheet("Missing", &ReadOptions::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn reject_workbook_without_sheets() {
        let bytes = workbook_bytes(&[
            ("xl/workbook.xml", "<workbook><sheets/></workbook>"),
            ("xl/_rels/workbook.xml.rels", "<Relationships/>"),
        ]);
        let result = XlsxWorkbook::from_reader("blank.xlsx", Cursor::new(bytes));
        assert!(matches!(
            result,
            Err(SheetPipelineError::SpreadsheetError(SpreadsheetError::EmptySpreadsheet(_)))
        ));
    }

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path(Cow::Borrowed("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
    }
}
