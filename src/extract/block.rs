//! Single-block parsing: one row range becomes one structured model.

use crate::extract::columns::find_label_column;
use crate::extract::columns::locate_year_header;
use crate::extract::labels::map_label;
use crate::extract::labels::LabelMatch;
use crate::extract::labels::ParseContext;
use crate::extract::segment::BlockSpan;
use crate::extract::value::read_cell;
use crate::extract::value::CellValue;
use crate::model::ModelBlock;
use crate::model::Period;
use crate::model::SourceRef;
use crate::spreadsheet::Sheet;
use std::collections::BTreeMap;
use tracing::warn;

/// Parses one block's row range into a model.
///
/// Rows whose label matches no known field but which still carry numeric
/// data in a year column are collected as unmapped: excluded from typed
/// fields, never dropped from visibility. Returns None (with a warning) when
/// no year header is found or no period ends up with any value.
pub(crate) fn parse_block(
    sheet: &Sheet,
    span: &BlockSpan,
    warnings: &mut Vec<String>,
) -> Option<ModelBlock> {
    let source = SourceRef {
        sheet: sheet.name.clone(),
        row_lower: span.row_lower,
        row_upper: span.row_upper,
    };

    let label_col = find_label_column(sheet, span.row_lower, span.row_upper);
    let Some(header) = locate_year_header(sheet, span.row_lower, span.row_upper) else {
        warn!(block = %span.name, source = %source, "no fiscal-year header; block skipped");
        warnings.push(format!(
            "Block '{}' ({}): no fiscal-year header found; block skipped",
            span.name, source
        ));
        return None;
    };

    let mut periods: BTreeMap<i32, Period> = header
        .columns
        .iter()
        .map(|column| (column.year, Period::new(column.year, &column.label)))
        .collect();

    let mut context = ParseContext::new();
    let mut unmapped_rows: Vec<String> = Vec::new();
    for row in (header.row + 1)..=span.row_upper {
        let label = match read_cell(sheet.cell(row, label_col)) {
            CellValue::Text(text) => text,
            _ => continue,
        };
        match map_label(&label, &mut context) {
            LabelMatch::Field(field) => {
                for column in &header.columns {
                    if let Some(value) = read_cell(sheet.cell(row, column.col)).number() {
                        if let Some(period) = periods.get_mut(&column.year) {
                            period.set(field, value);
                        }
                    }
                }
            }
            LabelMatch::Recognized => (),
            LabelMatch::Unknown => {
                let has_values = header
                    .columns
                    .iter()
                    .any(|column| read_cell(sheet.cell(row, column.col)).number().is_some());
                if has_values {
                    unmapped_rows.push(label);
                }
            }
        }
    }

    periods.retain(|_, period| !period.is_empty());
    if periods.is_empty() {
        warn!(block = %span.name, source = %source, "no data rows produced values; block skipped");
        warnings.push(format!(
            "Block '{}' ({}): no data rows produced any value; block skipped",
            span.name, source
        ));
        return None;
    }

    if !unmapped_rows.is_empty() {
        warnings.push(format!(
            "Block '{}' ({}): {} unmapped row(s): {}",
            span.name,
            source,
            unmapped_rows.len(),
            unmapped_rows.join("; ")
        ));
    }

    Some(ModelBlock {
        name: span.name.clone(),
        periods: periods.into_values().collect(),
        unmapped_rows,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FinancialField as F;
    use crate::spreadsheet::sheet::testing::sheet_from_rows;

    fn span(name: &str, row_lower: usize, row_upper: usize) -> BlockSpan {
        BlockSpan {
            name: name.to_owned(),
            row_lower,
            row_upper,
        }
    }

    #[test]
    fn block_populates_periods_in_year_order() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["", "2026", "2025"],
                &["Revenue", "110", "100"],
                &["EBITDA", "24", "20"],
            ],
        );
        let mut warnings = Vec::new();
        let block = parse_block(&sheet, &span("Base", 0, 2), &mut warnings).unwrap();
        assert_eq!(block.periods.len(), 2);
        assert_eq!(block.periods[0].year, 2025);
        assert_eq!(block.periods[1].year, 2026);
        assert_eq!(block.periods[0].get(F::Revenue), Some(100.0));
        assert_eq!(block.periods[1].get(F::Revenue), Some(110.0));
        assert_eq!(block.periods[0].get(F::Ebitda), Some(20.0));
        assert_eq!(block.periods[1].get(F::Ebitda), Some(24.0));
        assert!(block.unmapped_rows.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn segment_margin_rows_attach_to_their_segment() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["", "2025", "2026"],
                &["EBITDA managed services", "10", "12"],
                &["% margin", "0.21", "0.22"],
                &["EBITDA", "20", "24"],
                &["% margin", "0.20", "0.21"],
            ],
        );
        let mut warnings = Vec::new();
        let block = parse_block(&sheet, &span("Base", 0, 4), &mut warnings).unwrap();
        let period = &block.periods[0];
        assert_eq!(period.get(F::EbitdaManagedServicesMargin), Some(0.21));
        assert_eq!(period.get(F::EbitdaMargin), Some(0.20));
    }

    #[test]
    fn unmapped_rows_are_reported_not_dropped() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["", "2025", "2026"],
                &["Revenue", "100", "110"],
                &["Synergies from Project Falcon", "5", "6"],
                &["footnote text only"],
            ],
        );
        let mut warnings = Vec::new();
        let block = parse_block(&sheet, &span("Base", 0, 3), &mut warnings).unwrap();
        assert_eq!(
            block.unmapped_rows,
            vec!["Synergies from Project Falcon".to_owned()]
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unmapped"));
        // the row without numeric values is not noise worth reporting
        assert!(!warnings[0].contains("footnote"));
    }

    #[test]
    fn empty_blocks_are_skipped_with_warning() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[&["", "2025", "2026"], &["some prose", "", ""]],
        );
        let mut warnings = Vec::new();
        assert!(parse_block(&sheet, &span("Empty", 0, 1), &mut warnings).is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("block skipped"));
    }

    #[test]
    fn missing_year_header_skips_block() {
        let sheet = sheet_from_rows("Sheet1", &[&["Revenue", "alpha"], &["EBITDA", "beta"]]);
        let mut warnings = Vec::new();
        assert!(parse_block(&sheet, &span("NoYears", 0, 1), &mut warnings).is_none());
        assert!(warnings[0].contains("no fiscal-year header"));
    }

    #[test]
    fn sentinel_cells_leave_fields_absent() {
        let sheet = sheet_from_rows(
            "Sheet1",
            &[
                &["", "2025", "2026"],
                &["Revenue", "100", "-"],
                &["EBITDA", "n/a", "24"],
            ],
        );
        let mut warnings = Vec::new();
        let block = parse_block(&sheet, &span("Base", 0, 2), &mut warnings).unwrap();
        assert_eq!(block.periods[0].get(F::Revenue), Some(100.0));
        assert_eq!(block.periods[1].get(F::Revenue), None);
        assert_eq!(block.periods[0].get(F::Ebitda), None);
        assert_eq!(block.periods[1].get(F::Ebitda), Some(24.0));
    }
}
