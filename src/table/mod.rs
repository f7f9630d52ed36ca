//! # In-memory tables
//!
//! A [`Table`] is an ordered list of uniquely named columns plus rows holding one
//! [`Value`] per column. Every pipeline stage ([`projector`], [`filter`], [`sorter`])
//! takes a table by reference and returns a new one.
use crate::error::SheetPipelineError;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Display;

pub mod filter;
pub mod projector;
pub mod sorter;

/// A single cell value with its inferred type.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    #[default]
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value. Text is accepted when it parses as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            Value::Text(text) => parse_number(text),
            Value::Missing => None,
        }
    }

    /// Text view of the value; `None` for missing cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            value => Some(value.to_string()),
        }
    }

    /// Total order used by the sorter for two present values:
    /// numbers numerically, text by raw bytes, numbers before text.
    pub(crate) fn compare_present(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(left), Value::Number(right)) => left.total_cmp(right),
            (Value::Text(left), Value::Text(right)) => left.cmp(right),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
            (Value::Missing, Value::Missing) => Ordering::Equal,
            (Value::Missing, _) => Ordering::Greater,
            (_, Value::Missing) => Ordering::Less,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Number(number) => write!(f, "{}", format_number(*number)),
            Value::Missing => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// Parses user or cell text as a number, ignoring surrounding whitespace.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        text.parse::<f64>().ok()
    }
}

/// Formats integral numbers without a fractional part (`42.0` as `42`).
pub(crate) fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}

/// Ordered, uniquely named columns and the rows beneath them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table, rejecting duplicate column names and rows of the wrong width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Table, SheetPipelineError> {
        let mut names = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !names.insert(name.as_str()) {
                return Err(SheetPipelineError::MalformedTable(format!("duplicate column '{}'", name)));
            }
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != columns.len()) {
            return Err(SheetPipelineError::MalformedTable(format!(
                "row {} has {} values but the table has {} columns",
                index + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Table { columns, rows })
    }

    /// Builds a table from parts already known to satisfy the invariants.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Table {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Like [`Table::column_index`], failing with `InvalidColumn`.
    pub fn require_column(&self, name: &str) -> Result<usize, SheetPipelineError> {
        self.column_index(name)
            .ok_or_else(|| SheetPipelineError::InvalidColumn(name.to_owned()))
    }

    /// Value at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[index])
    }

    /// Row `index` as (column name, value) pairs in column order.
    pub fn record(&self, index: usize) -> Option<impl Iterator<Item = (&str, &Value)>> {
        let row = self.rows.get(index)?;
        Some(self.columns.iter().map(String::as_str).zip(row.iter()))
    }

    /// All values of the named column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Same columns, only the given rows.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Value>>) -> Table {
        Table::from_parts(self.columns.clone(), rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `name`/`age` table used across the stage tests.
    pub(crate) fn people() -> Table {
        Table::new(
            vec!["name".to_owned(), "age".to_owned()],
            vec![
                vec!["Bob".into(), 30.0.into()],
                vec!["amy".into(), 25.0.into()],
                vec!["Cid".into(), 30.0.into()],
            ],
        )
        .expect("valid table")
    }

    pub(crate) fn names(table: &Table) -> Vec<String> {
        table.rows().iter().map(|row| row[0].to_string()).collect()
    }

    #[test]
    fn new_rejects_duplicate_columns() {
        let result = Table::new(vec!["a".to_owned(), "a".to_owned()], vec![]);
        assert!(matches!(result, Err(SheetPipelineError::MalformedTable(_))));
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let result = Table::new(vec!["a".to_owned(), "b".to_owned()], vec![vec![1.0.into()]]);
        assert!(matches!(result, Err(SheetPipelineError::MalformedTable(_))));
    }

    #[test]
    fn record_pairs_names_with_values() {
        let table = people();
        let record: Vec<(&str, String)> = table
            .record(1)
            .expect("row exists")
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        assert_eq!(record, vec![("name", "amy".to_owned()), ("age", "25".to_owned())]);
        assert!(table.record(3).is_none());
    }

    #[test]
    fn require_column_reports_name() {
        let error = people().require_column("city").unwrap_err();
        assert_eq!(error.to_string(), "Column 'city' does not exist in the current table");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(-3.5).to_string(), "-3.5");
        assert_eq!(Value::Missing.to_string(), "");
        assert_eq!(Value::Missing.as_text(), None);
    }

    #[test]
    fn numeric_view_of_text() {
        assert_eq!(Value::from(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(Value::from("abc").as_number(), None);
        assert_eq!(Value::from(None::<f64>), Value::Missing);
    }
}
