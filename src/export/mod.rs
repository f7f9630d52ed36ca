//! # Export
//!
//! Writes a [`Table`] to disk as an Excel workbook, comma separated text or tab
//! separated text, and derives default export file names ([`ExportNamer`]).
use crate::error::ResultMessage;
use crate::error::SheetPipelineError;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use log::info;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

mod delimited;
mod namer;
mod xlsx;

pub use namer::operator_code;
pub use namer::ExportNamer;
pub use namer::NamingOptions;

/// File formats a table can be exported to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Excel 2007+ workbook with a single sheet
    Xlsx,
    /// Comma separated text
    Csv,
    /// Tab separated text
    Tsv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Xlsx, ExportFormat::Csv, ExportFormat::Tsv];

    /// Extension of the default file name, without the dot.
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Tsv => "txt",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "Excel",
            Self::Csv => "CSV",
            Self::Tsv => "TXT",
        }
    }

    /// Picks the format from the file extension of `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SheetPipelineError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            "tsv" | "txt" => Ok(Self::Tsv),
            _ => Err(SpreadsheetError::UnsupportedFormat(path.display().to_string()).into()),
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    /// Accepts the format label (`Excel`, `CSV`, `TXT`) or an extension.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            "txt" | "tsv" => Ok(Self::Tsv),
            _ => Err(format!("unknown export format '{}'", name)),
        }
    }
}

/// Writes `table` to `path`: a header row of column names, then one line or row per table row.
pub fn write_table(table: &Table, path: impl AsRef<Path>, format: ExportFormat) -> Result<(), SheetPipelineError> {
    let path = path.as_ref();
    match format {
        ExportFormat::Xlsx => xlsx::write(table, path),
        ExportFormat::Csv => delimited::write(table, path, b','),
        ExportFormat::Tsv => delimited::write(table, path, b'\t'),
    }
    .with_prefix(&format!("Export '{}' failed", path.display()))?;
    info!(
        "Exported {} rows, {} columns to '{}' as {}",
        table.row_count(),
        table.column_count(),
        path.display(),
        format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn format_from_path() {
        assert_eq!(ExportFormat::from_path("out/report.XLSX").ok(), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_path("report.csv").ok(), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path("report.txt").ok(), Some(ExportFormat::Tsv));
        assert_eq!(ExportFormat::from_path("report").unwrap_err().kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn format_names() {
        assert_eq!("Excel".parse::<ExportFormat>(), Ok(ExportFormat::Xlsx));
        assert_eq!("tsv".parse::<ExportFormat>(), Ok(ExportFormat::Tsv));
        assert!("pdf".parse::<ExportFormat>().is_err());
        for format in ExportFormat::ALL {
            assert_eq!(format.as_str().parse::<ExportFormat>(), Ok(format));
        }
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let directory = tempfile::tempdir().expect("temp dir");
        let path = directory.path().join("absent").join("out.csv");
        let error = write_table(&Table::default(), &path, ExportFormat::Csv).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::IoFailure);
        assert!(error.to_string().starts_with("Export '"));
    }
}
