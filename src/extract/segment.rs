//! Sheet segmentation.
//!
//! A sheet may stack several independent forecast variants. Three strategies
//! of decreasing specificity split it into blocks; per sheet, the first
//! strategy yielding at least one block wins and the rest are not consulted.

use crate::extract::columns::find_label_column;
use crate::extract::columns::FINANCIAL_VOCAB;
use crate::extract::value::read_cell;
use crate::extract::value::CellValue;
use crate::spreadsheet::Sheet;
use regex::Regex;
use std::sync::LazyLock;

/// Empty-row run length that closes a heading-based block.
const BLOCK_GAP_ROWS: usize = 3;

pub(crate) const MARKER_ROWS: &str = "marker-rows";
pub(crate) const SECTION_HEADINGS: &str = "section-headings";
pub(crate) const WHOLE_SHEET: &str = "whole-sheet";

/// Explicit block marker: `Name: Baseline Plan` (or Norwegian `Navn:`).
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:name|navn)\s*:\s*(.+)$").expect("Hardcode regex pattern")
});

/// Scenario-title vocabulary for heading-based segmentation.
static SCENARIO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(scenario|case|plan|alternative|alternativ|sensitivity|sensitivitet|budsjett|budget|forecast|prognose|upside|downside)\b",
    )
    .expect("Hardcode regex pattern")
});

/// One candidate block: a name and an inclusive row range.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BlockSpan {
    pub(crate) name: String,
    pub(crate) row_lower: usize,
    pub(crate) row_upper: usize,
}

/// One way of splitting a sheet into blocks, testable in isolation.
pub(crate) trait SegmentStrategy {
    fn name(&self) -> &'static str;
    fn segment(&self, sheet: &Sheet) -> Vec<BlockSpan>;
}

/// Strategy 1: explicit `Name:` marker rows open blocks.
pub(crate) struct MarkerRows;

impl SegmentStrategy for MarkerRows {
    fn name(&self) -> &'static str {
        MARKER_ROWS
    }

    fn segment(&self, sheet: &Sheet) -> Vec<BlockSpan> {
        let mut spans: Vec<BlockSpan> = Vec::new();
        for row in 0..sheet.rows() {
            let marker = sheet.row_cells(row).find_map(|cell| {
                read_cell(Some(cell)).text().and_then(|text| {
                    MARKER
                        .captures(text)
                        .and_then(|captures| captures.get(1))
                        .map(|name| name.as_str().trim().to_owned())
                })
            });
            if let Some(name) = marker.filter(|name| !name.is_empty()) {
                if let Some(open) = spans.last_mut() {
                    open.row_upper = row - 1;
                }
                spans.push(BlockSpan {
                    name,
                    row_lower: row,
                    row_upper: sheet.rows() - 1,
                });
            }
        }
        spans
    }
}

/// Strategy 2: scenario-style headings in the label column open blocks; a
/// run of fully empty rows closes the current one.
pub(crate) struct SectionHeadings;

impl SegmentStrategy for SectionHeadings {
    fn name(&self) -> &'static str {
        SECTION_HEADINGS
    }

    fn segment(&self, sheet: &Sheet) -> Vec<BlockSpan> {
        if sheet.is_empty() {
            return Vec::new();
        }
        let label_col = find_label_column(sheet, 0, sheet.rows() - 1);
        let mut spans: Vec<BlockSpan> = Vec::new();
        let mut open = false;
        let mut empty_run = 0usize;
        for row in 0..sheet.rows() {
            if sheet.row_is_empty(row) {
                empty_run += 1;
                if open && empty_run == BLOCK_GAP_ROWS {
                    // the block ended before the gap started
                    spans.last_mut().expect("Open block").row_upper = row - empty_run;
                    open = false;
                }
                continue;
            }
            empty_run = 0;

            let heading = match read_cell(sheet.cell(row, label_col)) {
                // a heading names a scenario without reading like a line item
                CellValue::Text(text)
                    if SCENARIO.is_match(&text) && !FINANCIAL_VOCAB.is_match(&text) =>
                {
                    Some(text)
                }
                _ => None,
            };
            if let Some(name) = heading {
                if open {
                    spans.last_mut().expect("Open block").row_upper = row - 1;
                }
                spans.push(BlockSpan {
                    name: name.trim().to_owned(),
                    row_lower: row,
                    row_upper: sheet.rows() - 1,
                });
                open = true;
            }
        }
        spans
    }
}

/// Strategy 3: the whole sheet as one block, named from the sheet, or from
/// the uploaded file name for single-sheet workbooks.
pub(crate) struct WholeSheet {
    pub(crate) fallback_name: Option<String>,
}

impl SegmentStrategy for WholeSheet {
    fn name(&self) -> &'static str {
        WHOLE_SHEET
    }

    fn segment(&self, sheet: &Sheet) -> Vec<BlockSpan> {
        if sheet.is_empty() {
            return Vec::new();
        }
        let name = self
            .fallback_name
            .clone()
            .unwrap_or_else(|| sheet.name.clone());
        vec![BlockSpan {
            name,
            row_lower: 0,
            row_upper: sheet.rows() - 1,
        }]
    }
}

/// The strategy chain in fallback order.
pub(crate) fn strategies(
    display_name: Option<&str>,
    single_sheet: bool,
) -> Vec<Box<dyn SegmentStrategy>> {
    let fallback_name = display_name
        .filter(|_| single_sheet)
        .map(|name| name.trim_end_matches(".xlsx").trim_end_matches(".xlsm").to_owned());
    vec![
        Box::new(MarkerRows),
        Box::new(SectionHeadings),
        Box::new(WholeSheet { fallback_name }),
    ]
}

/// Runs the chain; the first strategy producing blocks wins for this sheet.
pub(crate) fn segment_sheet(
    sheet: &Sheet,
    strategies: &[Box<dyn SegmentStrategy>],
) -> (&'static str, Vec<BlockSpan>) {
    for strategy in strategies {
        let spans = strategy.segment(sheet);
        if !spans.is_empty() {
            return (strategy.name(), spans);
        }
    }
    (WHOLE_SHEET, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::sheet::testing::sheet_from_rows;

    #[test]
    fn marker_rows_open_and_close_blocks() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["Shares at signing", "1000"],
                &["Name:  Base Case "],
                &["", "2025", "2026"],
                &["Revenue", "100", "110"],
                &["Name: Downside"],
                &["", "2025", "2026"],
                &["Revenue", "90", "95"],
            ],
        );
        let spans = MarkerRows.segment(&sheet);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "Base Case");
        assert_eq!((spans[0].row_lower, spans[0].row_upper), (1, 3));
        assert_eq!(spans[1].name, "Downside");
        assert_eq!((spans[1].row_lower, spans[1].row_upper), (4, 6));
    }

    #[test]
    fn heading_blocks_close_on_empty_run() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["Management plan"],
                &["Revenue", "100"],
                &[],
                &[],
                &[],
                &["notes far below"],
            ],
        );
        let spans = SectionHeadings.segment(&sheet);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "Management plan");
        assert_eq!((spans[0].row_lower, spans[0].row_upper), (0, 1));
    }

    #[test]
    fn line_items_do_not_open_heading_blocks() {
        // "budget" vocabulary inside a financial label must not start a block
        let sheet = sheet_from_rows(
            "Sheet1",
            &[&["Budget revenue", "100"], &["EBITDA", "20"]],
        );
        assert!(SectionHeadings.segment(&sheet).is_empty());
    }

    #[test]
    fn whole_sheet_uses_sheet_name_or_fallback() {
        let sheet = sheet_from_rows("Forecast", &[&["Revenue", "100"]]);
        let spans = WholeSheet { fallback_name: None }.segment(&sheet);
        assert_eq!(spans[0].name, "Forecast");

        let spans = WholeSheet {
            fallback_name: Some("Project Alpha".to_owned()),
        }
        .segment(&sheet);
        assert_eq!(spans[0].name, "Project Alpha");
        assert_eq!((spans[0].row_lower, spans[0].row_upper), (0, 0));
    }

    #[test]
    fn chain_falls_through_in_order() {
        let sheet = sheet_from_rows("Sheet1", &[&["Revenue", "100"]]);
        let chain = strategies(Some("upload.xlsx"), true);
        let (strategy, spans) = segment_sheet(&sheet, &chain);
        assert_eq!(strategy, WHOLE_SHEET);
        assert_eq!(spans[0].name, "upload");

        let sheet = sheet_from_rows("Sheet1", &[&["Name: Plan A"], &["Revenue", "100"]]);
        let (strategy, spans) = segment_sheet(&sheet, &chain);
        assert_eq!(strategy, MARKER_ROWS);
        assert_eq!(spans[0].name, "Plan A");
    }
}
