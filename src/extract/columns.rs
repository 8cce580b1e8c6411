//! Column detection: which column holds row labels, and which columns form
//! the fiscal-year axis.

use crate::extract::value::read_cell;
use crate::extract::value::CellValue;
use crate::spreadsheet::Sheet;
use chrono::Datelike;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Fiscal years the engine accepts as period columns.
pub(crate) const YEAR_MIN: i32 = 2020;
pub(crate) const YEAR_MAX: i32 = 2040;

/// How many leading columns are scored as label-column candidates.
const LABEL_SCAN_COLS: usize = 10;
/// How many columns per row are scanned for year headers.
const YEAR_SCAN_COLS: usize = 30;

/// Broad bilingual vocabulary of financial row labels. Used to score label
/// columns and to keep scenario headings apart from line items.
pub(crate) static FINANCIAL_VOCAB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(revenue|sales|turnover|omsetning|driftsinntekt|salgsinntekt|ebitda|\bebit\b|gross profit|gross margin|brutto|margin|growth|vekst|\bopex\b|\bcapex\b|cost|expense|kostnad|depreciation|avskrivn|amorti[sz]|\btax(es)?\b|skatt|interest|rente|finans|cash|kontant|likvid|debt|gjeld|\bnibd\b|equity|egenkapital|share|aksje|warrant|tegningsrett|dividend|utbytte|working capital|arbeidskapital|\barr\b|\bfte\b|ansatte|årsverk|resultat|leverage|multiple|multippel|enterprise value)",
    )
    .expect("Hardcode regex pattern")
});

/// Year header cell text: a 4-digit year with optional budget/forecast
/// markers around it ("2026B", "FY2027", "B2026", "2025 est").
static YEAR_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:fy|act(?:ual)?|bud(?:get|sjett)?|est|fcst|forecast|prognose|[abefp])?\s*'?(20\d{2})\s*(?:act(?:ual)?|bud(?:get|sjett)?|est|fcst|forecast|prognose|[abefp])?\.?\s*$",
    )
    .expect("Hardcode regex pattern")
});

/// Finds the column most likely holding row labels within a row range.
///
/// Scores the first 10 columns by how many of their cells match the
/// financial vocabulary; the highest score wins, ties break left. Falls back
/// to the second column when nothing scores, which is where labels sit in
/// the common layouts. Sibling blocks on one sheet may be aligned
/// differently, so this runs per block, never globally.
pub(crate) fn find_label_column(sheet: &Sheet, row_lower: usize, row_upper: usize) -> usize {
    let mut best_col = 1usize;
    let mut best_score = 0usize;
    for col in 0..LABEL_SCAN_COLS.min(sheet.cols()) {
        let score = (row_lower..=row_upper)
            .filter_map(|row| match read_cell(sheet.cell(row, col)) {
                CellValue::Text(text) => Some(text),
                _ => None,
            })
            .filter(|text| FINANCIAL_VOCAB.is_match(text))
            .count();
        if score > best_score {
            best_score = score;
            best_col = col;
        }
    }
    best_col
}

/// One fiscal-year column of a block's period axis.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct YearColumn {
    pub(crate) col: usize,
    pub(crate) year: i32,
    /// Header cell text, kept as the period's display label
    pub(crate) label: String,
}

/// The detected year header row and its period axis.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct YearHeader {
    pub(crate) row: usize,
    /// Qualifying columns, deduplicated by year, left to right
    pub(crate) columns: Vec<YearColumn>,
}

/// Locates the year header within a row range.
///
/// Runs a strict pass requiring two distinct year columns, then retries
/// accepting a single one. Small models may carry only one forecast year,
/// but accepting single hits up front would mistake stray numbers elsewhere
/// on the sheet for a period axis.
pub(crate) fn locate_year_header(
    sheet: &Sheet,
    row_lower: usize,
    row_upper: usize,
) -> Option<YearHeader> {
    find_year_header(sheet, row_lower, row_upper, 2)
        .or_else(|| find_year_header(sheet, row_lower, row_upper, 1))
}

/// Scans rows top-down for the first row with at least `min_hits` distinct
/// qualifying year columns.
fn find_year_header(
    sheet: &Sheet,
    row_lower: usize,
    row_upper: usize,
    min_hits: usize,
) -> Option<YearHeader> {
    for row in row_lower..=row_upper.min(sheet.rows().saturating_sub(1)) {
        let mut by_year: BTreeMap<i32, YearColumn> = BTreeMap::new();
        for col in 0..YEAR_SCAN_COLS.min(sheet.cols()) {
            let value = read_cell(sheet.cell(row, col));
            if let Some(year) = cell_year(&value) {
                // duplicate years keep the leftmost column
                by_year.entry(year).or_insert_with(|| YearColumn {
                    col,
                    year,
                    label: year_label(&value, year),
                });
            }
        }
        if by_year.len() >= min_hits {
            let mut columns: Vec<YearColumn> = by_year.into_values().collect();
            columns.sort_by_key(|column| column.col);
            return Some(YearHeader { row, columns });
        }
    }
    None
}

/// Resolves a cell value to a fiscal year, if plausible.
pub(crate) fn cell_year(value: &CellValue) -> Option<i32> {
    let year = match value {
        CellValue::Number(number) if number.fract() == 0.0 => *number as i32,
        CellValue::Date(date) => date.year(),
        CellValue::Text(text) => YEAR_TEXT
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|year| year.as_str().parse::<i32>().ok())?,
        _ => return None,
    };
    (YEAR_MIN..=YEAR_MAX).contains(&year).then_some(year)
}

fn year_label(value: &CellValue, year: i32) -> String {
    match value {
        CellValue::Text(text) => text.trim().to_owned(),
        _ => year.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::testing::sheet_from_rows;

    #[test]
    fn label_column_prefers_vocabulary_hits() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["", "", "Revenue", "100"],
                &["", "", "EBITDA", "20"],
                &["", "", "Net debt", "50"],
            ],
        );
        assert_eq!(find_label_column(&sheet, 0, 2), 2);
    }

    #[test]
    fn label_column_defaults_to_second() {
        let sheet = sheet_from_rows("Sheet1", &[&["alpha", "beta"], &["gamma", "delta"]]);
        assert_eq!(find_label_column(&sheet, 0, 1), 1);
    }

    #[test]
    fn year_header_skips_stray_single_hits() {
        // a stray year above the real header must not win the strict pass
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["", "2030"],
                &["", ""],
                &["", "2025", "2026"],
            ],
        );
        let header = locate_year_header(&sheet, 0, 2).unwrap();
        assert_eq!(header.row, 2);
        assert_eq!(header.columns.len(), 2);
    }

    #[test]
    fn single_year_models_found_on_retry() {
        let sheet = sheet_from_rows("Sheet1", &[&["", "2026"], &["Revenue", "100"]]);
        let header = locate_year_header(&sheet, 0, 1).unwrap();
        assert_eq!(header.row, 0);
        assert_eq!(header.columns.len(), 1);
        assert_eq!(header.columns[0].year, 2026);
    }

    #[test]
    fn year_header_deduplicates_years_left_to_right() {
        let sheet = sheet_from_rows("Sheet1", &[&["", "2026", "2025", "2026"]]);
        let header = locate_year_header(&sheet, 0, 0).unwrap();
        let years: Vec<(usize, i32)> = header
            .columns
            .iter()
            .map(|column| (column.col, column.year))
            .collect();
        assert_eq!(years, vec![(1, 2026), (2, 2025)]);
    }

    #[test]
    fn year_markers_in_text() {
        assert_eq!(cell_year(&CellValue::Text("2026B".to_owned())), Some(2026));
        assert_eq!(cell_year(&CellValue::Text("FY2027".to_owned())), Some(2027));
        assert_eq!(cell_year(&CellValue::Text("2025 est".to_owned())), Some(2025));
        assert_eq!(cell_year(&CellValue::Text("B2026".to_owned())), Some(2026));
        assert_eq!(cell_year(&CellValue::Text("since 2021 we".to_owned())), None);
        assert_eq!(cell_year(&CellValue::Number(2019.0)), None);
        assert_eq!(cell_year(&CellValue::Number(2041.0)), None);
        assert_eq!(cell_year(&CellValue::Number(2025.0)), Some(2025));
        assert_eq!(cell_year(&CellValue::Number(2025.5)), None);
    }

    #[test]
    fn date_cells_anchor_years() {
        use chrono::NaiveDate;
        let date = CellValue::Date(NaiveDate::from_ymd_opt(2027, 12, 31).unwrap());
        assert_eq!(cell_year(&date), Some(2027));
    }
}
