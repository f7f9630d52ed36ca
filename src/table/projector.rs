use crate::error::SheetPipelineError;
use crate::table::Table;
use log::debug;
use log::warn;

/// Ordered set of column names chosen by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    columns: Vec<String>,
}

/// Result of matching saved column names against a table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Columns present in the table, in saved order.
    pub selection: ColumnSelection,
    /// Saved columns the table does not have.
    pub missing: Vec<String>,
}

impl ColumnSelection {
    /// Selection of every column, in table order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a selection from names, keeping the first occurrence of duplicates.
    /// Does not check the names against any table.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        ColumnSelection { columns }
    }

    /// Builds a selection that must exist in `table`, failing with `InvalidColumn` otherwise.
    pub fn new<I, S>(table: &Table, names: I) -> Result<Self, SheetPipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selection = Self::from_names(names);
        if let Some(missing) = selection.columns.iter().find(|name| !table.has_column(name)) {
            return Err(SheetPipelineError::InvalidColumn(missing.to_owned()));
        }
        Ok(selection)
    }

    /// Keeps the names `table` has and reports the rest instead of failing.
    pub fn reconcile<I, S>(table: &Table, names: I) -> Reconciliation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (present, missing): (Vec<String>, Vec<String>) = Self::from_names(names)
            .columns
            .into_iter()
            .partition(|name| table.has_column(name));
        if !missing.is_empty() {
            warn!("Dropping columns not found in the current sheet: {}", missing.join(", "));
        }
        Reconciliation {
            selection: ColumnSelection { columns: present },
            missing,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True when the selection means "all columns".
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Appends a column unless it is already selected.
    pub fn with(&self, name: &str) -> Self {
        let mut selection = self.clone();
        if !selection.contains(name) {
            selection.columns.push(name.to_owned());
        }
        selection
    }

    /// Removes a column if it is selected.
    pub fn without(&self, name: &str) -> Self {
        ColumnSelection {
            columns: self.columns.iter().filter(|column| *column != name).cloned().collect(),
        }
    }
}

/// Narrows `table` to the selected columns, in selection order.
///
/// An empty selection keeps every column. Names the table does not have are
/// skipped with a warning; callers that need a hard failure validate with
/// [`ColumnSelection::new`] first.
pub fn project(table: &Table, selection: &ColumnSelection) -> Table {
    if selection.is_empty() {
        return table.clone();
    }

    let mut columns = Vec::with_capacity(selection.len());
    let mut indexes = Vec::with_capacity(selection.len());
    for name in selection.columns() {
        match table.column_index(name) {
            Some(index) => {
                columns.push(name.to_owned());
                indexes.push(index);
            }
            None => warn!("Column '{}' is not in the current table and was skipped", name),
        }
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| indexes.iter().map(|index| row[*index].clone()).collect())
        .collect();
    debug!("Projected {} of {} columns", columns.len(), table.column_count());
    Table::from_parts(columns, rows)
}
