use crate::spreadsheet::range::Range;
use crate::table::Value;
use std::collections::HashSet;

/// Controls how a sheet's cells become a [`crate::table::Table`].
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Treat the first row as column names.
    pub header: bool,

    /// Cell texts read as missing values (default: empty string).
    pub nulls: HashSet<String>,

    /// Read error cells (`#DIV/0!`, `#N/A`) as missing instead of failing.
    pub error_as_null: bool,

    /// Skip rows where all columns are empty.
    pub skip_empty_rows: bool,

    /// Stop reading at the first completely empty row.
    pub end_at_empty_row: bool,

    /// Maximum number of data rows to read.
    pub rows_limit: Option<usize>,

    /// Cells to read; the whole sheet when `None`.
    pub range: Option<Range>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            header: true,
            nulls: HashSet::from([String::new()]),
            error_as_null: true,
            skip_empty_rows: true,
            end_at_empty_row: false,
            rows_limit: None,
            range: None,
        }
    }
}

impl ReadOptions {
    /// Replaces null literals with [`Value::Missing`].
    pub(crate) fn normalize(&self, value: Value) -> Value {
        match value {
            Value::Text(text) if self.nulls.contains(&text) => Value::Missing,
            value => value,
        }
    }
}
