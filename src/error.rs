use crate::preset::PresetError;
use crate::spreadsheet::SpreadsheetError;
use thiserror::Error;

/// Main error type for the sheet pipeline.
/// Aggregates errors from the standard library, dependencies and internal modules.
#[derive(Error, Debug)]
pub enum SheetPipelineError {
    #[error("{0}")]
    WithContextError(String),

    // Pipeline errors
    #[error("Column '{0}' does not exist in the current table")]
    InvalidColumn(String),

    #[error("Invalid value '{literal}' for '{operator}' condition: {message}")]
    InvalidLiteral {
        operator: String,
        literal: String,
        message: String,
    },

    #[error("Malformed table: {0}")]
    MalformedTable(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    GlobError(#[from] glob::GlobError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Domain module errors
    #[error("{0}")]
    SpreadsheetError(#[from] SpreadsheetError),

    #[error("{0}")]
    PresetError(#[from] PresetError),
}

/// Coarse classification of every [`SheetPipelineError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced column is absent from the current table, or none is selected.
    InvalidColumn,
    /// A filter literal cannot be used with its operator.
    InvalidLiteral,
    /// A named preset or sheet does not exist.
    NotFound,
    /// A table violates its shape invariants.
    MalformedTable,
    /// A preset name has no filesystem-safe characters.
    InvalidPresetName,
    /// Reading or writing a file failed, including format errors.
    IoFailure,
}

impl SheetPipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidColumn(_) => ErrorKind::InvalidColumn,
            Self::InvalidLiteral { .. } => ErrorKind::InvalidLiteral,
            Self::MalformedTable(_) => ErrorKind::MalformedTable,
            Self::PresetError(PresetError::NotFound(_)) => ErrorKind::NotFound,
            Self::PresetError(PresetError::InvalidName(_)) => ErrorKind::InvalidPresetName,
            Self::PresetError(PresetError::NoColumns(_)) => ErrorKind::InvalidColumn,
            Self::SpreadsheetError(SpreadsheetError::SheetNotFound(..)) => ErrorKind::NotFound,
            _ => ErrorKind::IoFailure,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetPipelineError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e {
            // Keep the classification of pipeline errors intact.
            SheetPipelineError::InvalidColumn(_)
            | SheetPipelineError::InvalidLiteral { .. }
            | SheetPipelineError::MalformedTable(_)
            | SheetPipelineError::PresetError(_)
            | SheetPipelineError::SpreadsheetError(SpreadsheetError::SheetNotFound(..)) => e,
            e => SheetPipelineError::WithContextError(format!("{}: {}", message, e)),
        })
    }
}
