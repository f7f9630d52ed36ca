use crate::error::SheetPipelineError;
use crate::helpers::xml::XmlWriterHelper;
use crate::spreadsheet::reference::index_to_reference;
use crate::table::Table;
use crate::table::Value;
use quick_xml::events::BytesDecl;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::fs::File;
use std::io::BufWriter;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

/// Name of the only worksheet in an exported workbook.
pub(crate) const SHEET_NAME: &str = "Sheet1";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub(super) fn write(table: &Table, path: &Path) -> Result<(), SheetPipelineError> {
    let file = BufWriter::new(File::create(path)?);
    write_to(table, file)?.flush()?;
    Ok(())
}

/// Writes a minimal workbook: package parts plus one worksheet holding `table`.
fn write_to<W: Write + Seek>(table: &Table, writer: W) -> Result<W, SheetPipelineError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    write_content_types(&mut Writer::new(&mut zip))?;

    zip.start_file("_rels/.rels", options)?;
    write_package_relationships(&mut Writer::new(&mut zip))?;

    zip.start_file("xl/workbook.xml", options)?;
    write_workbook(&mut Writer::new(&mut zip))?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    write_workbook_relationships(&mut Writer::new(&mut zip))?;

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    write_worksheet(&mut Writer::new(&mut zip), table)?;

    Ok(zip.finish()?)
}

fn write_declaration<W: Write>(writer: &mut Writer<W>) -> Result<(), SheetPipelineError> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(())
}

fn write_content_types<W: Write>(writer: &mut Writer<W>) -> Result<(), SheetPipelineError> {
    write_declaration(writer)?;
    writer.open_tag("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    writer.empty_element(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    writer.empty_element("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    writer.empty_element(
        "Override",
        &[
            ("PartName", "/xl/workbook.xml"),
            ("ContentType", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"),
        ],
    )?;
    writer.empty_element(
        "Override",
        &[
            ("PartName", "/xl/worksheets/sheet1.xml"),
            ("ContentType", "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"),
        ],
    )?;
    writer.close_tag("Types")
}

fn write_package_relationships<W: Write>(writer: &mut Writer<W>) -> Result<(), SheetPipelineError> {
    write_declaration(writer)?;
    writer.open_tag("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    writer.empty_element(
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument"),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    writer.close_tag("Relationships")
}

fn write_workbook<W: Write>(writer: &mut Writer<W>) -> Result<(), SheetPipelineError> {
    write_declaration(writer)?;
    writer.open_tag("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    writer.open_tag("sheets", &[])?;
    writer.empty_element("sheet", &[("name", SHEET_NAME), ("sheetId", "1"), ("r:id", "rId1")])?;
    writer.close_tag("sheets")?;
    writer.close_tag("workbook")
}

fn write_workbook_relationships<W: Write>(writer: &mut Writer<W>) -> Result<(), SheetPipelineError> {
    write_declaration(writer)?;
    writer.open_tag("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    writer.empty_element(
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet"),
            ("Target", "worksheets/sheet1.xml"),
        ],
    )?;
    writer.close_tag("Relationships")
}

fn write_worksheet<W: Write>(writer: &mut Writer<W>, table: &Table) -> Result<(), SheetPipelineError> {
    write_declaration(writer)?;
    writer.open_tag("worksheet", &[("xmlns", NS_MAIN)])?;
    writer.open_tag("sheetData", &[])?;
    if table.column_count() > 0 {
        let header: Vec<Value> = table.columns().iter().map(|name| Value::from(name.as_str())).collect();
        write_row(writer, 0, &header)?;
        for (index, row) in table.rows().iter().enumerate() {
            write_row(writer, index + 1, row)?;
        }
    }
    writer.close_tag("sheetData")?;
    writer.close_tag("worksheet")
}

/// Writes one `<row>`; missing values are left out.
fn write_row<W: Write>(writer: &mut Writer<W>, row: usize, values: &[Value]) -> Result<(), SheetPipelineError> {
    let row_number = (row + 1).to_string();
    writer.open_tag("row", &[("r", row_number.as_str())])?;
    for (col, value) in values.iter().enumerate() {
        let reference = index_to_reference(row, col);
        match value {
            Value::Missing => (),
            Value::Number(number) if number.is_finite() => {
                writer.open_tag("c", &[("r", reference.as_str())])?;
                writer.text_element("v", &[], &number.to_string())?;
                writer.close_tag("c")?;
            }
            value => write_inline_string(writer, &reference, &value.to_string())?,
        }
    }
    writer.close_tag("row")
}

fn write_inline_string<W: Write>(writer: &mut Writer<W>, reference: &str, text: &str) -> Result<(), SheetPipelineError> {
    writer.open_tag("c", &[("r", reference), ("t", "inlineStr")])?;
    writer.open_tag("is", &[])?;
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        writer.text_element("t", &[("xml:space", "preserve")], text)?;
    } else {
        writer.text_element("t", &[], text)?;
    }
    writer.close_tag("is")?;
    writer.close_tag("c")
}
