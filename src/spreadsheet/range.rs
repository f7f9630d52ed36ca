use crate::error::SheetPipelineError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::row_to_index;
use crate::spreadsheet::SpreadsheetError;
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// Excel-style cell range with optional boundaries, all 0-based and inclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Range {
    pub row_lower_bound: Option<usize>,
    pub row_upper_bound: Option<usize>,
    pub col_lower_bound: Option<usize>,
    pub col_upper_bound: Option<usize>,
}

impl Range {
    pub(crate) fn contains_row(&self, row: usize) -> bool {
        self.row_lower_bound.map(|lower| lower <= row).unwrap_or(true)
            && self.row_upper_bound.map(|upper| row <= upper).unwrap_or(true)
    }

    pub(crate) fn contains_col(&self, col: usize) -> bool {
        self.col_lower_bound.map(|lower| lower <= col).unwrap_or(true)
            && self.col_upper_bound.map(|upper| col <= upper).unwrap_or(true)
    }

    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        self.contains_row(row) && self.contains_col(col)
    }

    /// True once `row` is past the last row the range accepts.
    pub(crate) fn is_past(&self, row: usize) -> bool {
        self.row_upper_bound.map(|upper| upper < row).unwrap_or(false)
    }
}

impl FromStr for Range {
    type Err = SheetPipelineError;

    /// Parses `A1`, `B2:C5`, `A:C` or `3:10`. Omitted parts are unbounded.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern"));
        let value = value.trim().to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .filter(|_| !value.is_empty())
            .ok_or_else(|| SpreadsheetError::InvalidRange(value.to_owned()))?;
        let bound = |index: usize, convert: fn(&str) -> Option<usize>| {
            captures
                .get(index)
                .map(|matcher| matcher.as_str())
                .filter(|text| !text.is_empty())
                .and_then(convert)
        };
        Ok(Range {
            col_lower_bound: bound(1, col_to_index),
            row_lower_bound: bound(2, row_to_index),
            col_upper_bound: bound(4, col_to_index),
            row_upper_bound: bound(5, row_to_index),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(text: &str) -> Range {
        text.parse().expect("valid range")
    }

    #[test]
    fn parse_full_range() {
        assert_eq!(
            range("b2:d10"),
            Range {
                row_lower_bound: Some(1),
                row_upper_bound: Some(9),
                col_lower_bound: Some(1),
                col_upper_bound: Some(3),
            }
        );
    }

    #[test]
    fn parse_partial_ranges() {
        let columns = range("A:C");
        assert_eq!(columns.row_lower_bound, None);
        assert_eq!(columns.col_upper_bound, Some(2));

        let rows = range("3:");
        assert_eq!(rows.row_lower_bound, Some(2));
        assert_eq!(rows.row_upper_bound, None);
        assert_eq!(rows.col_lower_bound, None);
    }

    #[test]
    fn parse_invalid_range() {
        assert!("A1-B2".parse::<Range>().is_err());
        assert!("".parse::<Range>().is_err());
    }

    #[test]
    fn contains_cells() {
        let range = range("B2:C3");
        assert!(range.contains(1, 1));
        assert!(range.contains(2, 2));
        assert!(!range.contains(0, 1));
        assert!(!range.contains(1, 3));
        assert!(range.is_past(3));
        assert!(!Range::default().is_past(1_000_000));
    }
}
