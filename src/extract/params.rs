//! Workbook-wide input parameter extraction.
//!
//! Deal constants (share counts, warrants, multiples, rates) live above the
//! first model block rather than inside it. A second pass covers the two
//! single-cell constants that tend to appear inline among per-period rows.

use crate::extract::value::read_cell;
use crate::extract::value::CellValue;
use crate::model::InputParameters;
use crate::spreadsheet::Sheet;
use regex::Regex;
use std::sync::LazyLock;

/// How many columns of a parameter row are scanned for values.
const PARAM_SCAN_COLS: usize = 30;

static SHARES_SIGNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(shares?|aksjer).*(signing|signering|today|i dag)").expect("Hardcode regex pattern")
});
static SHARES_CLOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(shares?|aksjer).*(closing|gjennomføring)").expect("Hardcode regex pattern")
});
static WARRANTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)warrants?|tegningsrett(er)?").expect("Hardcode regex pattern"));
static OWNERSHIP_PROGRAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(management |employee )?(ownership|incentive) (program|plan)|eier(skaps)?program|opsjonsprogram")
        .expect("Hardcode regex pattern")
});
static ACQUISITION_MULTIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)acquisition multiple|m&a multiple|oppkjøpsmultippel").expect("Hardcode regex pattern")
});
static SHARE_SETTLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)acquisitions?( consideration)?( settled)? (in|with) shares|aksjeoppgjør|andel aksjer i oppgjør")
        .expect("Hardcode regex pattern")
});
static ENTRY_MULTIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)entry (ev([ /-]ebitda)? )?multiple|ev ?/ ?ebitda (at )?entry|inngangsmultippel")
        .expect("Hardcode regex pattern")
});
static PREFERRED_RATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)preferred (return|rate|accrual|yield)|preference rate|preferanserente")
        .expect("Hardcode regex pattern")
});

/// Extracts workbook-wide parameters from one sheet.
///
/// Pass 1 scans the preamble rows above the first block (exclusive upper
/// bound `preamble_rows`); pass 2 re-scans every row through `block_upper`
/// for the two constants that may sit inline among period rows. Within a
/// sheet the first hit per parameter wins.
pub(crate) fn extract_input_parameters(
    sheet: &Sheet,
    preamble_rows: usize,
    block_upper: usize,
) -> InputParameters {
    let mut parameters = InputParameters::default();

    for row in 0..preamble_rows.min(sheet.rows()) {
        let Some((label_col, label)) = row_label(sheet, row) else {
            continue;
        };
        let values = row_values(sheet, row, label_col);
        if values.is_empty() {
            continue;
        }

        if SHARES_SIGNING.is_match(&label) {
            parameters.shares_at_signing.get_or_insert(values[0]);
        } else if SHARES_CLOSING.is_match(&label) {
            parameters.shares_at_closing.get_or_insert(values[0]);
        } else if WARRANTS.is_match(&label) {
            // warrant rows carry a count and a strike, in that order
            if parameters.warrant_count_1.is_none() {
                parameters.warrant_count_1 = Some(values[0]);
                parameters.warrant_strike_1 = values.get(1).copied();
            } else if parameters.warrant_count_2.is_none() {
                parameters.warrant_count_2 = Some(values[0]);
                parameters.warrant_strike_2 = values.get(1).copied();
            }
        } else if OWNERSHIP_PROGRAM.is_match(&label) {
            parameters.ownership_program_pct.get_or_insert(as_fraction(values[0]));
        } else if SHARE_SETTLED.is_match(&label) {
            parameters
                .share_settled_acquisition_pct
                .get_or_insert(as_fraction(values[0]));
        } else if ACQUISITION_MULTIPLE.is_match(&label) {
            parameters.acquisition_multiple.get_or_insert(values[0]);
        }
    }

    for row in 0..=block_upper.min(sheet.rows().saturating_sub(1)) {
        let Some((label_col, label)) = row_label(sheet, row) else {
            continue;
        };
        let values = row_values(sheet, row, label_col);
        if values.is_empty() {
            continue;
        }

        if ENTRY_MULTIPLE.is_match(&label) {
            parameters.entry_ev_multiple.get_or_insert(values[0]);
        } else if PREFERRED_RATE.is_match(&label) {
            parameters.preferred_return_rate.get_or_insert(as_fraction(values[0]));
        }
    }

    parameters
}

/// The first text cell of a row, taken as the parameter label.
fn row_label(sheet: &Sheet, row: usize) -> Option<(usize, String)> {
    (0..PARAM_SCAN_COLS.min(sheet.cols())).find_map(|col| {
        read_cell(sheet.cell(row, col))
            .text()
            .map(|text| (col, text.to_owned()))
    })
}

/// Numeric values to the right of the label, left to right.
fn row_values(sheet: &Sheet, row: usize, label_col: usize) -> Vec<f64> {
    ((label_col + 1)..PARAM_SCAN_COLS.min(sheet.cols()))
        .filter_map(|col| match read_cell(sheet.cell(row, col)) {
            CellValue::Number(value) => Some(value),
            _ => None,
        })
        .collect()
}

/// Percent-style parameters arrive either as fractions (0.15, from percent
/// formats or "%" text) or as whole percents (15). Normalize to a fraction.
fn as_fraction(value: f64) -> f64 {
    if value.abs() > 1.0 {
        value / 100.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::testing::sheet_from_rows;

    #[test]
    fn preamble_parameters_extracted() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["Shares outstanding at signing", "1000000"],
                &["Shares outstanding at closing", "1100000"],
                &["Warrants tranche 1", "50000", "12.5"],
                &["Warrants tranche 2", "25000", "15"],
                &["Management ownership program", "0.12"],
                &["Acquisition multiple", "6"],
                &["Acquisitions settled in shares", "0.5"],
                &["Name: Base"],
                &["", "2025", "2026"],
                &["Revenue", "100", "110"],
            ],
        );
        let parameters = extract_input_parameters(&sheet, 7, 9);
        assert_eq!(parameters.shares_at_signing, Some(1_000_000.0));
        assert_eq!(parameters.shares_at_closing, Some(1_100_000.0));
        assert_eq!(parameters.warrant_count_1, Some(50_000.0));
        assert_eq!(parameters.warrant_strike_1, Some(12.5));
        assert_eq!(parameters.warrant_count_2, Some(25_000.0));
        assert_eq!(parameters.warrant_strike_2, Some(15.0));
        assert_eq!(parameters.ownership_program_pct, Some(0.12));
        assert_eq!(parameters.acquisition_multiple, Some(6.0));
        assert_eq!(parameters.share_settled_acquisition_pct, Some(0.5));
    }

    #[test]
    fn inline_constants_found_in_second_pass() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["", "2025", "2026"],
                &["Revenue", "100", "110"],
                &["Entry EV/EBITDA multiple", "9.5"],
                &["Preferred return", "8"],
            ],
        );
        let parameters = extract_input_parameters(&sheet, 0, 3);
        assert_eq!(parameters.entry_ev_multiple, Some(9.5));
        assert_eq!(parameters.preferred_return_rate, Some(0.08));
    }

    #[test]
    fn whole_percent_values_normalize_to_fractions() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[&["Management ownership program", "12"]],
        );
        let parameters = extract_input_parameters(&sheet, 1, 0);
        assert_eq!(parameters.ownership_program_pct, Some(0.12));
    }

    #[test]
    fn rows_without_values_are_ignored() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[&["Warrants", "tbd"], &["Warrants issued", "50000", "12.5"]],
        );
        let parameters = extract_input_parameters(&sheet, 2, 1);
        assert_eq!(parameters.warrant_count_1, Some(50_000.0));
        assert_eq!(parameters.warrant_strike_1, Some(12.5));
        assert_eq!(parameters.warrant_count_2, None);
    }

    #[test]
    fn first_extraction_wins_within_sheet() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["Acquisition multiple", "6"],
                &["Acquisition multiple", "8"],
            ],
        );
        let parameters = extract_input_parameters(&sheet, 2, 1);
        assert_eq!(parameters.acquisition_multiple, Some(6.0));
    }
}
