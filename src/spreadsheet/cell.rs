use chrono::Duration;
use chrono::NaiveDate;

/// Raw storage types of worksheet cells, before any normalization.
/// Numeric cells carrying a date number format are split out so the value
/// reader can turn their serial values into calendar dates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum RawCellKind {
    #[default]
    Empty,
    /// Boolean values stored as "0"/"1"
    Boolean,
    /// Plain numeric values
    Number,
    /// Date values stored as serial numbers from the 1900 epoch
    Date1900,
    /// Date values stored as serial numbers from the 1904 epoch
    Date1904,
    /// ISO 8601 date/datetime strings (`t="d"` cells)
    IsoDate,
    /// Shared string table references, resolved to text at decode time
    SharedString,
    /// Inline string values
    InlineString,
    /// Formula error results (#DIV/0!, #N/A, ...)
    Error,
}

impl RawCellKind {
    /// Classifies built-in Excel number format IDs.
    /// Date and datetime formats map to the date kinds; time-only formats
    /// carry no calendar information and stay plain numbers.
    pub(crate) fn from_builtin_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "22" => Some(Self::date_kind(is_1904)),
            _ => None,
        }
    }

    /// Classifies a custom number format string by scanning for date letter
    /// codes outside quoted literals, escapes, and color/condition sections.
    pub(crate) fn from_custom_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_color = false;
        let mut is_date = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                _ => (),
            }
        }

        if is_date {
            Self::date_kind(is_1904)
        } else {
            Self::Number
        }
    }

    const fn date_kind(is_1904: bool) -> Self {
        if is_1904 {
            Self::Date1904
        } else {
            Self::Date1900
        }
    }
}

/// One worksheet cell with its position, storage type, and raw value text.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Storage type
    pub(crate) kind: RawCellKind,
    /// Raw value as written in the worksheet part
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts a serial-date cell to a calendar date.
    /// Returns None for non-date kinds and for unparsable serial values.
    pub(crate) fn serial_date(&self) -> Option<NaiveDate> {
        let epoch_1904 = match self.kind {
            RawCellKind::Date1900 => false,
            RawCellKind::Date1904 => true,
            _ => return None,
        };
        let days = self.value.parse::<f64>().ok()?.trunc() as i64;
        // 1899-12-30 base absorbs the Lotus 1-2-3 phantom 1900-02-29;
        // serials below 60 predate it and shift by one day.
        let offset = if epoch_1904 {
            1462
        } else if days < 60 {
            1
        } else {
            0
        };
        let base = NaiveDate::from_ymd_opt(1899, 12, 30).expect("NaiveDate literal");
        base.checked_add_signed(Duration::days(days + offset))
    }

    /// Parses an ISO date cell (`t="d"`), accepting a trailing time component.
    pub(crate) fn iso_date(&self) -> Option<NaiveDate> {
        let text = self.value.trim();
        let date_part = text.split('T').next()?;
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }
}

/// Converts 0-based row & column indexes to an Excel-style reference.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut column = col as u32 + 1;
    let mut reference = String::new();
    while column > 0 {
        column -= 1;
        let digit = char::from_u32(65 + column % 26).expect("Hardcode letters");
        column /= 26;
        reference.insert(0, digit);
    }
    reference.push_str(&(row + 1).to_string());
    reference
}

/// Converts an Excel-style reference ("B7") to 0-based (row, col) indexes.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let mut col = 0usize;
    let mut letters = 0usize;
    for character in reference.chars() {
        if character.is_ascii_alphabetic() {
            col = col * 26 + (character.to_ascii_uppercase() as usize - 'A' as usize + 1);
            letters += 1;
        } else {
            break;
        }
    }
    if letters == 0 || letters == reference.len() {
        return None;
    }
    let row = reference[letters..].parse::<usize>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date_cell(kind: RawCellKind, value: &str) -> Cell {
        Cell {
            row: 0,
            col: 0,
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn reference_round_trip() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(6, 1), "B7");
        assert_eq!(index_to_reference(0, 26), "AA1");
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("B7"), Some((6, 1)));
        assert_eq!(reference_to_index("AA1"), Some((0, 26)));
        assert_eq!(reference_to_index("17"), None);
        assert_eq!(reference_to_index("AA"), None);
    }

    #[test]
    fn serial_dates_1900_epoch() {
        let cell = date_cell(RawCellKind::Date1900, "1");
        assert_eq!(cell.serial_date(), NaiveDate::from_ymd_opt(1900, 1, 1));
        // 45657 = 2024-12-31, past the phantom leap day
        let cell = date_cell(RawCellKind::Date1900, "45657");
        assert_eq!(cell.serial_date(), NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn serial_dates_1904_epoch() {
        let cell = date_cell(RawCellKind::Date1904, "0");
        assert_eq!(cell.serial_date(), NaiveDate::from_ymd_opt(1904, 1, 1));
    }

    #[test]
    fn iso_date_with_time_component() {
        let cell = date_cell(RawCellKind::IsoDate, "2025-12-31T00:00:00");
        assert_eq!(cell.iso_date(), NaiveDate::from_ymd_opt(2025, 12, 31));
    }

    #[test]
    fn custom_format_classification() {
        assert_eq!(
            RawCellKind::from_custom_format("yyyy-mm-dd", false),
            RawCellKind::Date1900
        );
        // date letters inside a quoted literal do not make it a date format
        assert_eq!(
            RawCellKind::from_custom_format("#,##0.0\"yd\"", false),
            RawCellKind::Number
        );
        assert_eq!(
            RawCellKind::from_custom_format("[Red]#,##0", false),
            RawCellKind::Number
        );
        assert_eq!(
            RawCellKind::from_custom_format("dd/mm/yyyy", true),
            RawCellKind::Date1904
        );
    }

    #[test]
    fn builtin_format_classification() {
        assert_eq!(
            RawCellKind::from_builtin_format_id("14", false),
            Some(RawCellKind::Date1900)
        );
        assert_eq!(RawCellKind::from_builtin_format_id("0", false), None);
        // time-only formats stay numeric
        assert_eq!(RawCellKind::from_builtin_format_id("20", false), None);
    }
}
