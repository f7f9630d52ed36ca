use crate::error::SheetPipelineError;
use crate::table::parse_number;
use crate::table::Table;
use crate::table::Value;
use log::debug;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

/// Comparison applied by a [`FilterCriterion`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Equals,
        Operator::Contains,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::StartsWith,
        Operator::EndsWith,
    ];

    /// Human-readable name, as offered in the condition dropdown.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::GreaterThan => "greater than",
            Self::LessThan => "less than",
        }
    }

    /// Whether the literal must be a number.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::GreaterThan | Self::LessThan)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    /// Accepts `greater than`, `greater-than` and `greater_than` spellings, case-insensitively.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        Operator::ALL
            .into_iter()
            .find(|operator| operator.as_str() == normalized)
            .ok_or_else(|| format!("unknown filter condition '{}'", name))
    }
}

/// A single `column operator literal` condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub column: String,
    pub operator: Operator,
    pub literal: String,
}

impl FilterCriterion {
    pub fn new(column: &str, operator: Operator, literal: &str) -> Self {
        FilterCriterion {
            column: column.to_owned(),
            operator,
            literal: literal.to_owned(),
        }
    }
}

/// Criterion checked and lowered once, then evaluated per row.
enum Predicate {
    NumberEquals(f64),
    TextEquals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    GreaterThan(f64),
    LessThan(f64),
}

impl Predicate {
    fn compile(criterion: &FilterCriterion) -> Result<Predicate, SheetPipelineError> {
        let invalid = |message: &str| SheetPipelineError::InvalidLiteral {
            operator: criterion.operator.to_string(),
            literal: criterion.literal.to_owned(),
            message: message.to_owned(),
        };
        if criterion.literal.is_empty() {
            return Err(invalid("value must not be empty"));
        }

        let number = parse_number(&criterion.literal);
        let lowered = criterion.literal.to_lowercase();
        let predicate = match criterion.operator {
            Operator::Equals => match number {
                Some(number) => Predicate::NumberEquals(number),
                None => Predicate::TextEquals(lowered),
            },
            Operator::Contains => Predicate::Contains(lowered),
            Operator::StartsWith => Predicate::StartsWith(lowered),
            Operator::EndsWith => Predicate::EndsWith(lowered),
            Operator::GreaterThan => Predicate::GreaterThan(number.ok_or_else(|| invalid("value must be numeric"))?),
            Operator::LessThan => Predicate::LessThan(number.ok_or_else(|| invalid("value must be numeric"))?),
        };
        Ok(predicate)
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::NumberEquals(expected) => value.as_number().map(|number| number == *expected).unwrap_or(false),
            Predicate::GreaterThan(bound) => value.as_number().map(|number| number > *bound).unwrap_or(false),
            Predicate::LessThan(bound) => value.as_number().map(|number| number < *bound).unwrap_or(false),
            Predicate::TextEquals(expected) => lowered_text(value).map(|text| text == *expected).unwrap_or(false),
            Predicate::Contains(needle) => lowered_text(value).map(|text| text.contains(needle.as_str())).unwrap_or(false),
            Predicate::StartsWith(prefix) => lowered_text(value).map(|text| text.starts_with(prefix.as_str())).unwrap_or(false),
            Predicate::EndsWith(suffix) => lowered_text(value).map(|text| text.ends_with(suffix.as_str())).unwrap_or(false),
        }
    }
}

fn lowered_text(value: &Value) -> Option<String> {
    value.as_text().map(|text| text.to_lowercase())
}

/// Keeps the rows whose `criterion.column` value satisfies the criterion, in original order.
///
/// `equals` compares numerically when the literal is a number and as case-insensitive
/// text otherwise. The text operators never match a missing cell. `greater than` and
/// `less than` skip cells that are not numbers and reject a non-numeric literal with
/// `InvalidLiteral`.
pub fn filter(table: &Table, criterion: &FilterCriterion) -> Result<Table, SheetPipelineError> {
    let index = table.require_column(&criterion.column)?;
    let predicate = Predicate::compile(criterion)?;
    let rows: Vec<Vec<_>> = table
        .rows()
        .iter()
        .filter(|row| predicate.matches(&row[index]))
        .cloned()
        .collect();
    debug!(
        "Filter '{} {} {}' kept {} of {} rows",
        criterion.column,
        criterion.operator,
        criterion.literal,
        rows.len(),
        table.row_count()
    );
    Ok(table.with_rows(rows))
}
