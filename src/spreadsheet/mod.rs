//! # Sheet sources
//!
//! Loads a named sheet from a workbook file into a [`Table`]. Excel 2007+ workbooks
//! (`.xlsx`, `.xlsm`) are read from their zipped SpreadsheetML parts; comma and tab
//! separated text files (`.csv`, `.tsv`, `.txt`) appear as a workbook with a single
//! sheet named after the file stem.
use crate::error::SheetPipelineError;
use crate::table::Table;
use std::path::Path;
use thiserror::Error;

mod cell;
mod delimited;
mod options;
mod range;
pub(crate) mod reference;
mod sheet;
mod xlsx;

pub use options::ReadOptions;
pub use range::Range;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing required part '{0}' in workbook")]
    FileError(String),

    #[error("No sheets found in '{0}'")]
    EmptySpreadsheet(String),

    #[error("Sheet '{1}' not found in '{0}'")]
    SheetNotFound(String, String),

    #[error("Unsupported file format '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid range format '{0}'")]
    InvalidRange(String),

    #[error("Invalid cell value at '{2}' in sheet '{1}' of '{0}': {3}")]
    CellValueError(String, String, String, String),
}

/// A workbook whose sheets can be listed and read by name.
pub trait SheetSource {
    /// File name of the workbook.
    fn name(&self) -> &str;

    /// Sheet names, in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Reads a whole sheet as a table.
    fn read_sheet(&mut self, sheet_name: &str, options: &ReadOptions) -> Result<Table, SheetPipelineError>;
}

/// Opens a workbook, choosing the reader by file extension.
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn SheetSource>, SheetPipelineError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" => Ok(Box::new(xlsx::XlsxWorkbook::open(path)?)),
        "csv" => Ok(Box::new(delimited::DelimitedFile::open(path, b',')?)),
        "tsv" | "txt" => Ok(Box::new(delimited::DelimitedFile::open(path, b'\t')?)),
        _ => Err(SpreadsheetError::UnsupportedFormat(path.display().to_string()).into()),
    }
}

/// Reads one sheet of the workbook at `path` with default options.
pub fn read_sheet(path: impl AsRef<Path>, sheet_name: &str) -> Result<Table, SheetPipelineError> {
    open(path)?.read_sheet(sheet_name, &ReadOptions::default())
}
