use crate::error::SheetPipelineError;
use crate::table::Table;
use csv::WriterBuilder;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

pub(super) fn write(table: &Table, path: &Path, delimiter: u8) -> Result<(), SheetPipelineError> {
    let file = BufWriter::new(File::create(path)?);
    write_to(table, file, delimiter)?.flush()?;
    Ok(())
}

/// Writes the header and rows; missing values become empty fields.
fn write_to<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<W, SheetPipelineError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    if table.column_count() > 0 {
        writer.write_record(table.columns())?;
    }
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.into_inner().map_err(|error| SheetPipelineError::IoError(error.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table() -> Table {
        Table::new(
            vec!["city".to_owned(), "score".to_owned()],
            vec![
                vec!["Paris, FR".into(), 42.0.into()],
                vec!["Lyon".into(), Value::Missing],
                vec!["say \"hi\"".into(), 7.5.into()],
            ],
        )
        .expect("valid table")
    }

    fn render(delimiter: u8) -> String {
        let bytes = write_to(&table(), Vec::new(), delimiter).expect("written");
        String::from_utf8(bytes).expect("utf-8")
    }

    #[test]
    fn write_comma_separated() {
        assert_eq!(render(b','), "city,score\n\"Paris, FR\",42\nLyon,\n\"say \"\"hi\"\"\",7.5\n");
    }

    #[test]
    fn write_tab_separated() {
        assert_eq!(render(b'\t'), "city\tscore\nParis, FR\t42\nLyon\t\n\"say \"\"hi\"\"\"\t7.5\n");
    }

    #[test]
    fn write_file_and_read_back() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("scores.csv");
        write(&table(), &path, b',').expect("written");

        let table = crate::spreadsheet::read_sheet(&path, "scores").expect("readable");
        assert_eq!(table.value(0, "city"), Some(&Value::from("Paris, FR")));
        assert_eq!(table.value(1, "score"), Some(&Value::Missing));
        assert_eq!(table.value(2, "score"), Some(&Value::Number(7.5)));
    }
}
