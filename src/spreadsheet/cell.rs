use crate::error::SheetPipelineError;
use crate::spreadsheet::reference::index_to_reference;
use crate::table::Value;
use chrono::Duration;
use chrono::NaiveDate;

/// How the raw text of a worksheet cell is to be interpreted.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Serial date-time, 1900 date system
    NumberDateTime1900,
    /// Serial date, 1900 date system
    NumberDate1900,
    /// Serial time of day, 1900 date system
    NumberTime1900,
    /// Serial date-time, 1904 date system
    NumberDateTime1904,
    /// Serial date, 1904 date system
    NumberDate1904,
    /// Serial time of day, 1904 date system
    NumberTime1904,
    /// ISO 8601 text (`t="d"`)
    IsoDateTime,
    InlineString,
    /// Index into the shared string table
    SharedString,
    Error,
}

impl CellType {
    /// Maps a built-in number format id to a date/time type, if it is one.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        let kind = match id {
            "22" => (Self::NumberDateTime1900, Self::NumberDateTime1904),
            "14" | "15" | "16" | "17" => (Self::NumberDate1900, Self::NumberDate1904),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => (Self::NumberTime1900, Self::NumberTime1904),
            _ => return None,
        };
        Some(if is_1904 { kind.1 } else { kind.0 })
    }

    /// Classifies a custom format code by the date and time tokens outside
    /// quoted literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// A worksheet cell as read from the file: position, type and raw text.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    pub(crate) value: String,
}

impl Cell {
    /// Returns the A1-style reference of the cell.
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the raw cell into a table value.
    ///
    /// Numbers stay numeric, dates and times become ISO text, booleans become
    /// `true`/`false`, and shared strings are resolved against `shared_strings`.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<Value, String> {
        let value = match self.kind {
            CellType::Empty => Value::Missing,
            CellType::Boolean => {
                let flag = matches!(self.value.trim(), "1" | "true" | "TRUE");
                Value::Text(flag.to_string())
            }
            CellType::Number => Value::Number(self.to_double()?),
            CellType::NumberDate1900 => Value::Text(to_date_string(self.to_serial()?, false)?),
            CellType::NumberDate1904 => Value::Text(to_date_string(self.to_serial()?, true)?),
            CellType::NumberDateTime1900 => Value::Text(to_datetime_string(self.to_serial()?, false)?),
            CellType::NumberDateTime1904 => Value::Text(to_datetime_string(self.to_serial()?, true)?),
            CellType::NumberTime1900 | CellType::NumberTime1904 => Value::Text(to_time_string(self.to_serial()?)),
            CellType::IsoDateTime => Value::Text(self.value.replace('T', " ")),
            CellType::InlineString | CellType::Error => Value::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self
                    .value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("invalid shared string index '{}'", self.value))?;
                let text = shared_strings
                    .get(index)
                    .ok_or_else(|| format!("shared string {} does not exist", index))?;
                Value::Text(text.to_owned())
            }
        };
        Ok(value)
    }

    fn to_double(&self) -> Result<f64, String> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("parse '{}' to number failed", self.value))
    }

    /// Parses a date or time serial; infinities and NaN are rejected.
    fn to_serial(&self) -> Result<f64, String> {
        let serial = self.to_double()?;
        if serial.is_finite() {
            Ok(serial)
        } else {
            Err(format!("serial {} is out of the date range", self.value))
        }
    }
}

/// Days between the serial-date origin and `date`, honoring the Lotus 1-2-3 leap year bug.
///
/// Returns `None` when the serial falls outside the dates chrono can represent.
fn serial_to_date(serial: f64, is_1904: bool) -> Option<NaiveDate> {
    let days = serial.trunc();
    if !days.is_finite() || days.abs() > f64::from(i32::MAX) {
        return None;
    }
    let days = days as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let origin = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    origin.checked_add_signed(Duration::try_days(days + offset)?)
}

fn to_date_string(serial: f64, is_1904: bool) -> Result<String, String> {
    serial_to_date(serial, is_1904)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| format!("serial {} is out of the date range", serial))
}

fn to_time_string(serial: f64) -> String {
    let mut remaining = (serial.fract().abs() * 86_400_000f64).round() as i64;
    let milliseconds = remaining % 1_000;
    remaining /= 1_000;
    let seconds = remaining % 60;
    remaining /= 60;
    let minutes = remaining % 60;
    let hours = remaining / 60;
    if milliseconds > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

fn to_datetime_string(serial: f64, is_1904: bool) -> Result<String, String> {
    Ok(format!("{} {}", to_date_string(serial, is_1904)?, to_time_string(serial)))
}

/// Wraps a conversion failure with the cell position it happened at.
pub(crate) fn cell_error(file_name: &str, sheet_name: &str, cell: &Cell, message: String) -> SheetPipelineError {
    crate::spreadsheet::SpreadsheetError::CellValueError(
        file_name.to_owned(),
        sheet_name.to_owned(),
        cell.reference(),
        message,
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 1,
            col: 2,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn custom_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", true), CellType::NumberTime1904);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("0.0\"days\"", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("#,##0_);\\(#,##0\\)", false), CellType::Number);
    }

    #[test]
    fn builtin_formats() {
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDate1900));
        assert_eq!(CellType::parse_builtin_number_format_id("22", true), Some(CellType::NumberDateTime1904));
        assert_eq!(CellType::parse_builtin_number_format_id("2", false), None);
    }

    #[test]
    fn serial_dates() {
        assert_eq!(cell(CellType::NumberDate1900, "45413").to_value(&[]), Ok(Value::from("2024-05-01")));
        assert_eq!(cell(CellType::NumberDate1900, "1").to_value(&[]), Ok(Value::from("1900-01-01")));
        assert_eq!(cell(CellType::NumberDate1904, "0").to_value(&[]), Ok(Value::from("1904-01-01")));
        assert_eq!(
            cell(CellType::NumberDateTime1900, "45413.5").to_value(&[]),
            Ok(Value::from("2024-05-01 12:00:00"))
        );
        assert_eq!(cell(CellType::NumberTime1900, "0.75").to_value(&[]), Ok(Value::from("18:00:00")));
    }

    #[test]
    fn serials_outside_date_range_are_errors() {
        for kind in [CellType::NumberDate1900, CellType::NumberDateTime1904, CellType::NumberTime1900] {
            assert!(cell(kind, "inf").to_value(&[]).is_err());
            assert!(cell(kind, "NaN").to_value(&[]).is_err());
        }
        let error = cell(CellType::NumberDate1900, "1e9").to_value(&[]).unwrap_err();
        assert_eq!(error, "serial 1000000000 is out of the date range");
        assert!(cell(CellType::NumberDateTime1900, "-1e300").to_value(&[]).is_err());
        assert_eq!(cell(CellType::NumberDate1900, "2958465").to_value(&[]), Ok(Value::from("9999-12-31")));
    }

    #[test]
    fn scalar_values() {
        assert_eq!(cell(CellType::Number, "42").to_value(&[]), Ok(Value::Number(42.0)));
        assert_eq!(cell(CellType::Boolean, "1").to_value(&[]), Ok(Value::from("true")));
        assert_eq!(cell(CellType::IsoDateTime, "2024-05-01T08:30:00").to_value(&[]), Ok(Value::from("2024-05-01 08:30:00")));
        assert!(cell(CellType::Number, "abc").to_value(&[]).is_err());
    }

    #[test]
    fn shared_strings_are_resolved() {
        let shared = vec!["zero".to_owned(), "one".to_owned()];
        assert_eq!(cell(CellType::SharedString, "1").to_value(&shared), Ok(Value::from("one")));
        assert!(cell(CellType::SharedString, "7").to_value(&shared).is_err());
        assert_eq!(cell(CellType::SharedString, "7").reference(), "C2");
    }
}
