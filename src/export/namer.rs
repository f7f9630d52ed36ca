use crate::table::filter::FilterCriterion;
use crate::table::sorter::Direction;
use crate::table::sorter::SortSpec;
use chrono::NaiveDateTime;
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Write;

const DEFAULT_TIMESTAMP_FORMAT: &str = "%m%d";

/// Layout of generated export names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingOptions {
    /// Joins the name parts and precedes the timestamp.
    pub separator: char,
    /// `chrono` format of the timestamp suffix, e.g. `%m%d` or `%Y%m%d_%H%M%S`.
    pub timestamp_format: String,
}

impl Default for NamingOptions {
    fn default() -> Self {
        NamingOptions {
            separator: '_',
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_owned(),
        }
    }
}

/// Derives short, filesystem-safe default names for exported files.
#[derive(Clone, Debug, Default)]
pub struct ExportNamer {
    options: NamingOptions,
}

impl ExportNamer {
    /// A separator outside the allowed file name characters is replaced by `_`.
    pub fn new(options: NamingOptions) -> Self {
        if is_allowed(options.separator) {
            return ExportNamer { options };
        }
        warn!("Separator '{}' is not allowed in file names, using '_'", options.separator);
        ExportNamer {
            options: NamingOptions {
                separator: NamingOptions::default().separator,
                ..options
            },
        }
    }

    pub fn options(&self) -> &NamingOptions {
        &self.options
    }

    /// Builds a name from the source file's base name, the sheet, the active filter
    /// and sort, and `now`.
    ///
    /// Sheet names over 10 characters keep 8 plus `..`; columns and filter values
    /// over 8 characters keep 6 plus `..`. Parts are joined by the separator and
    /// stripped of everything but alphanumerics, space, `-`, `_` and `.` before the
    /// timestamp is appended. The same inputs always give the same name.
    pub fn name_for(
        &self,
        source_base_name: &str,
        sheet_name: Option<&str>,
        filter: Option<&FilterCriterion>,
        sort: Option<&SortSpec>,
        now: NaiveDateTime,
    ) -> String {
        let mut parts = vec![source_base_name.to_owned()];
        if let Some(sheet_name) = sheet_name.filter(|name| !name.is_empty()) {
            parts.push(abbreviate(sheet_name, 10, 8));
        }
        if let Some(filter) = filter.filter(|filter| !filter.column.is_empty() && !filter.literal.is_empty()) {
            parts.push(format!(
                "{}-{}-{}",
                abbreviate(&filter.column, 8, 6),
                operator_code(filter.operator.as_str()),
                abbreviate(&filter.literal, 8, 6)
            ));
        }
        if let Some(sort) = sort.filter(|sort| !sort.column.is_empty()) {
            let direction = match sort.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            parts.push(format!("{}-{}", abbreviate(&sort.column, 8, 6), direction));
        }

        let mut name: String = parts
            .join(&self.options.separator.to_string())
            .chars()
            .filter(|character| is_allowed(*character))
            .collect();
        name.push(self.options.separator);
        name.push_str(&self.timestamp(now));
        name
    }

    fn timestamp(&self, now: NaiveDateTime) -> String {
        let mut stamp = String::new();
        if write!(stamp, "{}", now.format(&self.options.timestamp_format)).is_err() {
            stamp = now.format(DEFAULT_TIMESTAMP_FORMAT).to_string();
        }
        stamp.chars().filter(|character| is_allowed(*character)).collect()
    }
}

/// Short code of a filter condition name; unknown names keep their first two characters.
pub fn operator_code(name: &str) -> String {
    let code = match name.trim().to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
        "equals" => "eq",
        "contains" => "cont",
        "greater than" => "gt",
        "less than" => "lt",
        "starts with" => "sw",
        "ends with" => "ew",
        _ => return name.chars().take(2).collect(),
    };
    code.to_owned()
}

/// Keeps `keep` characters plus `..` when `text` is longer than `limit` characters.
fn abbreviate(text: &str, limit: usize, keep: usize) -> String {
    if text.chars().count() > limit {
        let mut short: String = text.chars().take(keep).collect();
        short.push_str("..");
        short
    } else {
        text.to_owned()
    }
}

fn is_allowed(character: char) -> bool {
    character.is_alphanumeric() || matches!(character, ' ' | '-' | '_' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::filter::Operator;
    use chrono::NaiveDate;

    fn may_first() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|date| date.and_hms_opt(9, 30, 15))
            .expect("valid date")
    }

    #[test]
    fn name_with_sheet_filter_and_sort() {
        let filter = FilterCriterion::new("TotalScore", Operator::GreaterThan, "1000000");
        let sort = SortSpec::descending("TotalScore");
        let name = ExportNamer::default().name_for("report", Some("Sheet1234567"), Some(&filter), Some(&sort), may_first());
        assert_eq!(name, "report_Sheet123.._TotalS..-gt-1000000_TotalS..-desc_0501");
    }

    #[test]
    fn long_literal_is_abbreviated() {
        let filter = FilterCriterion::new("TotalScore", Operator::GreaterThan, "100000000");
        let name = ExportNamer::default().name_for("report", None, Some(&filter), None, may_first());
        assert_eq!(name, "report_TotalS..-gt-100000.._0501");
    }

    #[test]
    fn truncation_boundaries() {
        assert_eq!(abbreviate("Sheet12345", 10, 8), "Sheet12345");
        assert_eq!(abbreviate("Sheet123456", 10, 8), "Sheet123..");
        assert_eq!(abbreviate("Région_Été", 8, 6), "Région..");
    }

    #[test]
    fn unsafe_characters_are_stripped() {
        let filter = FilterCriterion::new("city", Operator::Equals, "a/b:c*?");
        let name = ExportNamer::default().name_for("my:report", Some("Q1 <draft>"), Some(&filter), None, may_first());
        assert_eq!(name, "myreport_Q1 draft_city-eq-abc_0501");
        assert!(name.chars().all(is_allowed));
    }

    #[test]
    fn optional_parts_are_skipped() {
        let namer = ExportNamer::default();
        assert_eq!(namer.name_for("data", None, None, None, may_first()), "data_0501");
        assert_eq!(namer.name_for("data", Some(""), None, Some(&SortSpec::ascending("age")), may_first()), "data_age-asc_0501");
        let empty = FilterCriterion::new("age", Operator::Equals, "");
        assert_eq!(namer.name_for("data", None, Some(&empty), None, may_first()), "data_0501");
    }

    #[test]
    fn name_is_deterministic() {
        let namer = ExportNamer::default();
        let filter = FilterCriterion::new("name", Operator::Contains, "ann");
        let first = namer.name_for("x", Some("S"), Some(&filter), None, may_first());
        let second = namer.name_for("x", Some("S"), Some(&filter), None, may_first());
        assert_eq!(first, second);
    }

    #[test]
    fn custom_timestamp_format() {
        let namer = ExportNamer::new(NamingOptions {
            separator: '_',
            timestamp_format: "%Y%m%d_%H%M%S".to_owned(),
        });
        assert_eq!(namer.name_for("data", None, None, None, may_first()), "data_20240501_093015");
    }

    #[test]
    fn disallowed_separator_falls_back() {
        for separator in ['/', '\\', ':', '*'] {
            let namer = ExportNamer::new(NamingOptions {
                separator,
                timestamp_format: "%m%d".to_owned(),
            });
            assert_eq!(namer.options().separator, '_');
            let name = namer.name_for("report", Some("Sales"), None, None, may_first());
            assert_eq!(name, "report_Sales_0501");
            assert!(name.chars().all(is_allowed));
        }

        let namer = ExportNamer::new(NamingOptions {
            separator: '-',
            timestamp_format: "%m%d".to_owned(),
        });
        assert_eq!(namer.name_for("report", Some("Sales"), None, None, may_first()), "report-Sales-0501");
    }

    #[test]
    fn invalid_timestamp_format_uses_default() {
        let namer = ExportNamer::new(NamingOptions {
            separator: '_',
            timestamp_format: "%Q".to_owned(),
        });
        assert_eq!(namer.name_for("data", None, None, None, may_first()), "data_0501");
    }

    #[test]
    fn operator_codes() {
        assert_eq!(operator_code("greater than"), "gt");
        assert_eq!(operator_code("starts-with"), "sw");
        assert_eq!(operator_code("contains"), "cont");
        assert_eq!(operator_code("between"), "be");
        for operator in Operator::ALL {
            assert_ne!(operator_code(operator.as_str()), operator.as_str());
        }
    }
}
