//! Conversion between A1-style cell references and 0-based (row, column) indexes.
use regex::Regex;
use std::sync::OnceLock;

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$").expect("Hardcode regex pattern"))
}

/// Converts column letters (`A`, `AB`) to a 0-based index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |index, letter| {
        let digit = letter.to_ascii_uppercase();
        digit
            .is_ascii_uppercase()
            .then(|| index * 26 + (digit as usize - 'A' as usize + 1))
    }).map(|index| index - 1)
}

/// Converts a 1-based row number to a 0-based index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().and_then(|row| row.checked_sub(1))
}

/// Parses `B3` (or `$B$3`) into `(2, 1)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = reference_pattern().captures(reference)?;
    let col = col_to_index(captures.get(1)?.as_str())?;
    let row = row_to_index(captures.get(2)?.as_str())?;
    Some((row, col))
}

/// Converts a 0-based column index to letters.
pub(crate) fn index_to_col(mut col: usize) -> String {
    let mut letters = String::new();
    col += 1;
    while col > 0 {
        col -= 1;
        letters.insert(0, (b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    letters
}

/// Formats a 0-based (row, column) pair as an A1-style reference.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_col(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_references() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("b3"), Some((2, 1)));
        assert_eq!(reference_to_index("$AA$10"), Some((9, 26)));
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("1A"), None);
    }

    #[test]
    fn format_references() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(9, 25), "Z10");
        assert_eq!(index_to_reference(0, 26), "AA1");
        assert_eq!(index_to_reference(4, 701), "ZZ5");
        assert_eq!(index_to_reference(4, 702), "AAA5");
    }

    #[test]
    fn columns_round_trip() {
        for col in [0, 1, 25, 26, 51, 52, 701, 702, 16383] {
            assert_eq!(col_to_index(&index_to_col(col)), Some(col));
        }
    }
}
