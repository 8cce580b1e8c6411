//! Cell value normalization.
//!
//! Turns raw decoded cells into one of four typed values. Text that reads as
//! a number under either of the two locale conventions seen in uploads is
//! promoted to a number; sentinel placeholders become empty; everything else
//! stays text so row labels survive untouched.

use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::RawCellKind;
use chrono::NaiveDate;

/// Sentinel strings uploads use for "no value".
const SENTINELS: [&str; 7] = ["-", "--", "n/a", "na", "n.a.", "nm", "n.m."];

/// A normalized cell value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CellValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    /// The numeric value, if this cell is a number.
    pub(crate) fn number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// The text value, if this cell is text.
    pub(crate) fn text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Normalizes one raw cell. Absent cells, formula errors, and values
/// unparsable under their declared kind all resolve to Empty rather than
/// failing: stray annotation text is routine in uploaded sheets.
pub(crate) fn read_cell(cell: Option<&Cell>) -> CellValue {
    let Some(cell) = cell else {
        return CellValue::Empty;
    };
    match cell.kind {
        RawCellKind::Empty | RawCellKind::Error => CellValue::Empty,
        RawCellKind::Boolean => CellValue::Number(if cell.value == "1" { 1.0 } else { 0.0 }),
        RawCellKind::Number => cell
            .value
            .trim()
            .parse::<f64>()
            .map(CellValue::Number)
            .unwrap_or(CellValue::Empty),
        RawCellKind::Date1900 | RawCellKind::Date1904 => cell
            .serial_date()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Empty),
        RawCellKind::IsoDate => cell.iso_date().map(CellValue::Date).unwrap_or(CellValue::Empty),
        RawCellKind::SharedString | RawCellKind::InlineString => {
            let text = cell.value.trim();
            if text.is_empty() || is_sentinel(text) {
                CellValue::Empty
            } else if let Some(number) = parse_numeric_text(text) {
                CellValue::Number(number)
            } else {
                CellValue::Text(text.to_owned())
            }
        }
    }
}

fn is_sentinel(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SENTINELS.iter().any(|sentinel| *sentinel == lowered)
}

/// Locale-aware numeric parsing of cell text.
///
/// A string containing a comma but no dot treats the comma as the decimal
/// mark and embedded spaces as grouping. When both separators appear,
/// whichever comes later is the decimal mark ("1.234,5" vs "1,234.5").
/// Accounting negatives in parentheses and trailing percent signs are
/// honored; a trailing "%" divides by 100.
pub(crate) fn parse_numeric_text(text: &str) -> Option<f64> {
    let mut text = text.trim();
    let mut negative = false;
    if let Some(inner) = text.strip_prefix('(').and_then(|inner| inner.strip_suffix(')')) {
        negative = true;
        text = inner.trim();
    }
    let mut percent = false;
    if let Some(stripped) = text.strip_suffix('%') {
        percent = true;
        text = stripped.trim_end();
    }

    // grouping spaces: regular, no-break, and narrow no-break
    let cleaned: String = text
        .chars()
        .filter(|character| !matches!(character, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|character| character.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    let mut value = normalized.parse::<f64>().ok()?;
    if percent {
        value /= 100.0;
    }
    if negative {
        value = -value;
    }
    Some(value)
}
