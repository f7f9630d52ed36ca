use crate::error::SheetPipelineError;
use crate::spreadsheet::options::ReadOptions;
use crate::spreadsheet::range::Range;
use crate::table::Table;
use crate::table::Value;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Cells collected from one sheet, before they are shaped into a [`Table`].
pub(crate) struct Sheet {
    /// Non-empty cells keyed by row, then column
    rows: BTreeMap<usize, BTreeMap<usize, Value>>,
    /// Expected data range (user-specified)
    range: Range,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(range: Option<Range>) -> Self {
        Self {
            rows: BTreeMap::new(),
            range: range.unwrap_or_default(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Checks if a cell at (row, col) is within the specified range.
    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        self.range.contains(row, col)
    }

    /// Checks if a row is after the upper bound of the specified range.
    pub(crate) fn after_row_upper_bound(&self, row: usize) -> bool {
        self.range.is_past(row)
    }

    /// Adds a cell, updating the data bounds. Missing values are not stored.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: Value) {
        if value.is_missing() {
            return;
        }
        self.update_bound(row, col);
        self.rows.entry(row).or_default().insert(col, value);
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|lower| row < lower).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|upper| upper < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|lower| col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|upper| upper < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Shapes the collected cells into a table.
    ///
    /// The first non-empty row is the header when `options.header` is set. Data rows
    /// follow it up to the last non-empty row, honoring the empty-row options and the
    /// row limit.
    pub(crate) fn into_table(self, options: &ReadOptions) -> Result<Table, SheetPipelineError> {
        let (Some(row_lower), Some(row_upper)) = (self.row_lower_bound, self.row_upper_bound) else {
            return Ok(Table::default());
        };
        let col_lower = self.range.col_lower_bound.or(self.col_lower_bound).unwrap_or_default();
        let col_upper = self.range.col_upper_bound.or(self.col_upper_bound).unwrap_or(col_lower);
        let width = col_upper.saturating_sub(col_lower) + 1;

        let mut rows = self.rows;
        let record = |cells: Option<BTreeMap<usize, Value>>| -> Vec<Value> {
            let mut record = vec![Value::Missing; width];
            for (col, value) in cells.into_iter().flatten() {
                if (col_lower..=col_upper).contains(&col) {
                    record[col - col_lower] = options.normalize(value);
                }
            }
            record
        };

        let (columns, first_data_row) = if options.header {
            (header_names(&record(rows.remove(&row_lower))), row_lower + 1)
        } else {
            ((1..=width).map(|index| format!("column{}", index)).collect(), row_lower)
        };

        let mut data = Vec::new();
        for row in first_data_row..=row_upper {
            if options.rows_limit.map(|limit| data.len() >= limit).unwrap_or(false) {
                break;
            }
            let values = record(rows.remove(&row));
            if values.iter().all(Value::is_missing) {
                if options.end_at_empty_row {
                    break;
                } else if options.skip_empty_rows {
                    continue;
                }
            }
            data.push(values);
        }
        Table::new(columns, data)
    }
}

/// Names header cells: blanks become `Unnamed: <index>` and repeats get `.1`, `.2` suffixes.
pub(crate) fn header_names(cells: &[Value]) -> Vec<String> {
    let mut seen = HashSet::<String>::with_capacity(cells.len());
    let mut names = Vec::with_capacity(cells.len());
    for (index, cell) in cells.iter().enumerate() {
        let base = cell
            .as_text()
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| format!("Unnamed: {}", index));
        let mut name = base.to_owned();
        let mut suffix = 0usize;
        while seen.contains(&name) {
            suffix += 1;
            name = format!("{}.{}", base, suffix);
        }
        seen.insert(name.to_owned());
        names.push(name);
    }
    names
}
