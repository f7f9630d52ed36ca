use crate::error::SheetPipelineError;
use crate::table::Table;
use crate::table::Value;
use log::debug;
use serde::Deserialize;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "Ascending",
            Self::Descending => "Descending",
        }
    }

    pub const fn reversed(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            _ => Err(format!("unknown sort order '{}'", name)),
        }
    }
}

/// Sort by one column in one direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: Direction,
}

impl SortSpec {
    pub fn new(column: &str, direction: Direction) -> Self {
        SortSpec {
            column: column.to_owned(),
            direction,
        }
    }

    pub fn ascending(column: &str) -> Self {
        Self::new(column, Direction::Ascending)
    }

    pub fn descending(column: &str) -> Self {
        Self::new(column, Direction::Descending)
    }
}

/// Orders two cells for `direction`. Missing cells go last in either direction.
fn compare(left: &Value, right: &Value, direction: Direction) -> Ordering {
    match (left.is_missing(), right.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match direction {
            Direction::Ascending => left.compare_present(right),
            Direction::Descending => right.compare_present(left),
        },
    }
}

/// Reorders rows by `spec.column`.
///
/// Numbers sort numerically and text by its raw characters (case-sensitive); in a
/// mixed column numbers come before text. The sort is stable, so rows with equal
/// keys keep their relative order in both directions.
pub fn sort(table: &Table, spec: &SortSpec) -> Result<Table, SheetPipelineError> {
    let index = table.require_column(&spec.column)?;
    let mut rows = table.rows().to_vec();
    rows.sort_by(|left, right| compare(&left[index], &right[index], spec.direction));
    debug!("Sorted {} rows by '{}' {}", rows.len(), spec.column, spec.direction);
    Ok(table.with_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::tests::names;
    use crate::table::tests::people;

    fn scores() -> Table {
        Table::new(
            vec!["id".to_owned(), "score".to_owned()],
            vec![
                vec!["r1".into(), 3.0.into()],
                vec!["r2".into(), Value::Missing],
                vec!["r3".into(), 10.0.into()],
                vec!["r4".into(), "b".into()],
                vec!["r5".into(), (-1.0).into()],
                vec!["r6".into(), "B".into()],
            ],
        )
        .expect("valid table")
    }

    #[test]
    fn ascending_numbers_then_text_then_missing() {
        let sorted = sort(&scores(), &SortSpec::ascending("score")).expect("sort succeeds");
        assert_eq!(names(&sorted), vec!["r5", "r1", "r3", "r6", "r4", "r2"]);
    }

    #[test]
    fn descending_keeps_missing_last() {
        let sorted = sort(&scores(), &SortSpec::descending("score")).expect("sort succeeds");
        assert_eq!(names(&sorted), vec!["r4", "r6", "r3", "r1", "r5", "r2"]);
    }

    #[test]
    fn numbers_sort_numerically_not_textually() {
        let sorted = sort(&scores(), &SortSpec::ascending("score")).expect("sort succeeds");
        let values: Vec<String> = sorted.column_values("score").expect("column").iter().map(|v| v.to_string()).collect();
        assert_eq!(&values[..3], ["-1", "3", "10"]);
    }

    #[test]
    fn ties_keep_original_order_in_both_directions() {
        let table = people();
        let ascending = sort(&table, &SortSpec::ascending("age")).expect("sort succeeds");
        assert_eq!(names(&ascending), vec!["amy", "Bob", "Cid"]);
        let descending = sort(&table, &SortSpec::descending("age")).expect("sort succeeds");
        assert_eq!(names(&descending), vec!["Bob", "Cid", "amy"]);
    }

    #[test]
    fn sort_is_idempotent_permutation() {
        let table = scores();
        let spec = SortSpec::ascending("score");
        let once = sort(&table, &spec).expect("sort succeeds");
        let twice = sort(&once, &spec).expect("sort succeeds");
        assert_eq!(once, twice);
        let mut before = names(&table);
        let mut after = names(&once);
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn reversing_direction_reverses_distinct_keys() {
        let table = Table::new(
            vec!["k".to_owned()],
            vec![vec![2.0.into()], vec!["x".into()], vec![1.0.into()], vec![5.0.into()]],
        )
        .expect("valid table");
        let ascending = names(&sort(&table, &SortSpec::ascending("k")).expect("sort succeeds"));
        let mut descending = names(&sort(&table, &SortSpec::descending("k")).expect("sort succeeds"));
        descending.reverse();
        assert_eq!(ascending, descending);
    }

    #[test]
    fn unknown_column_is_invalid() {
        let error = sort(&people(), &SortSpec::ascending("city")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidColumn);
    }

    #[test]
    fn direction_parsing() {
        assert_eq!("Descending".parse::<Direction>(), Ok(Direction::Descending));
        assert_eq!("asc".parse::<Direction>(), Ok(Direction::Ascending));
        assert_eq!(Direction::Ascending.reversed(), Direction::Descending);
    }
}
