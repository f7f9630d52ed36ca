//! Lookup of workbook parts inside the OOXML zip container.

use crate::error::SheetPipelineError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a part by name, ignoring ASCII case and accepting backslash separators.
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetPipelineError>;

    /// Opens a part as an XML event reader.
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetPipelineError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetPipelineError> {
        let pattern = name.replace('\\', "/");
        let path = self
            .file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(file) => Ok(file),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetPipelineError> {
        Ok(self.file(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive() -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("xl/workbook.xml", SimpleFileOptions::default()).expect("start file");
        writer.write_all(b"<workbook/>").expect("write part");
        let cursor = writer.finish().expect("finish zip");
        ZipArchive::new(cursor).expect("open zip")
    }

    #[test]
    fn file_lookup_is_case_and_separator_insensitive() -> Result<(), SheetPipelineError> {
        let mut zip = archive();
        assert!(zip.file("XL\\Workbook.xml")?.is_some());
        assert!(zip.file("xl/sharedStrings.xml")?.is_none());
        Ok(())
    }

    #[test]
    fn missing_part_has_no_reader() -> Result<(), SheetPipelineError> {
        let mut zip = archive();
        assert!(zip.xml_reader("xl/styles.xml")?.is_none());
        assert!(zip.xml_reader("xl/workbook.xml")?.is_some());
        Ok(())
    }
}
