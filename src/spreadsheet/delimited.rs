use crate::error::ResultMessage;
use crate::error::SheetPipelineError;
use crate::spreadsheet::options::ReadOptions;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SheetSource;
use crate::spreadsheet::SpreadsheetError;
use crate::table::parse_number;
use crate::table::Table;
use crate::table::Value;
use csv::ReaderBuilder;
use log::info;
use std::path::Path;

/// A comma or tab separated text file, exposed as a single sheet named after the file stem.
pub(crate) struct DelimitedFile {
    name: String,
    sheet_name: String,
    delimiter: u8,
    data: Vec<u8>,
}

impl DelimitedFile {
    pub(crate) fn open(path: &Path, delimiter: u8) -> Result<Self, SheetPipelineError> {
        let name = path.display().to_string();
        let data = std::fs::read(path)
            .map_err(SheetPipelineError::from)
            .with_prefix(&format!("Open '{}' failed", name))?;
        let sheet_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_owned());
        Ok(Self::from_bytes(&name, &sheet_name, delimiter, data))
    }

    pub(crate) fn from_bytes(name: &str, sheet_name: &str, delimiter: u8, data: Vec<u8>) -> Self {
        DelimitedFile {
            name: name.to_owned(),
            sheet_name: sheet_name.to_owned(),
            delimiter,
            data,
        }
    }
}

impl SheetSource for DelimitedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        vec![self.sheet_name.to_owned()]
    }

    fn read_sheet(&mut self, sheet_name: &str, options: &ReadOptions) -> Result<Table, SheetPipelineError> {
        if sheet_name != self.sheet_name {
            Err(SpreadsheetError::SheetNotFound(self.name.to_owned(), sheet_name.to_owned()))?
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(self.data.as_slice());
        let mut sheet = Sheet::new(options.range);
        for (row, record) in reader.records().enumerate() {
            if sheet.after_row_upper_bound(row) {
                break;
            }
            let record = record.map_err(SheetPipelineError::from).with_prefix(&format!("Read '{}' failed", self.name))?;
            for (col, field) in record.iter().enumerate() {
                if sheet.contains(row, col) {
                    sheet.push(row, col, Value::from(field));
                }
            }
        }

        let table = infer_numeric_columns(sheet.into_table(options)?);
        info!(
            "Loaded '{}': {} rows, {} columns",
            self.name,
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }
}

/// Turns columns whose present values all parse as numbers into numeric columns.
fn infer_numeric_columns(table: Table) -> Table {
    let numeric: Vec<bool> = (0..table.column_count())
        .map(|index| {
            let mut present = table.rows().iter().map(|row| &row[index]).filter(|value| !value.is_missing()).peekable();
            present.peek().is_some() && present.all(|value| value.as_number().is_some())
        })
        .collect();
    if !numeric.contains(&true) {
        return table;
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&numeric)
                .map(|(value, is_numeric)| match value {
                    Value::Text(text) if *is_numeric => parse_number(text).map(Value::Number).unwrap_or(Value::Missing),
                    value => value.clone(),
                })
                .collect()
        })
        .collect();
    Table::from_parts(table.columns().to_vec(), rows)
}
