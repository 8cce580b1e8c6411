//! Parse orchestration.
//!
//! Drives every sheet through segmentation and block parsing, merges the
//! workbook-wide input parameters, and aggregates warnings. Recoverable
//! issues never abort remaining blocks or sheets; the engine extracts as
//! much as it can and leaves the accept/reject decision to the caller. Only
//! an undecodable document or a workbook yielding zero blocks is fatal.

use crate::error::ModelSheetError;
use crate::extract::columns::locate_year_header;
use crate::model::InputParameters;
use crate::model::ParseResult;
use crate::spreadsheet::Workbook;
use thiserror::Error;
use tracing::debug;

mod block;
mod columns;
mod labels;
mod params;
mod segment;
mod value;

/// Fatal extraction failures.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Every segmentation strategy came up empty on every sheet. The report
    /// describes each sheet's dimensions and leading rows so an operator can
    /// fix the source document without reading this engine's internals.
    #[error("No financial models could be extracted from the workbook\n{report}")]
    NothingExtracted { report: String },
}

/// Parses one in-memory workbook into a normalized, periodized dataset.
///
/// This is the crate entry point. It performs no I/O and keeps no state
/// between invocations: the same document bytes always produce the same
/// result, and independent uploads may be parsed in parallel.
///
/// # Arguments
/// * `bytes` - Raw document bytes (.xlsx/.xlsm), already size/extension
///   checked by the upload boundary
/// * `display_name` - Optional uploaded file name, used to name the block of
///   single-sheet workbooks without any marker or heading structure
///
/// # Errors
/// Fails when the document cannot be decoded, or when no sheet yields a
/// single usable block. Partial success is not an error: it is reported
/// through `ParseResult::warnings`.
pub fn parse_workbook(
    bytes: &[u8],
    display_name: Option<&str>,
) -> Result<ParseResult, ModelSheetError> {
    let workbook = Workbook::from_bytes(bytes)?;
    let strategies = segment::strategies(display_name, workbook.sheets.len() == 1);

    let mut models = Vec::new();
    let mut warnings = Vec::new();
    let mut input_parameters = InputParameters::default();

    for sheet in &workbook.sheets {
        if sheet.is_empty() {
            debug!(sheet = %sheet.name, "sheet is empty; skipped");
            continue;
        }

        let (strategy, spans) = segment::segment_sheet(sheet, &strategies);
        debug!(sheet = %sheet.name, strategy, blocks = spans.len(), "segmented sheet");

        // Parameters live above the first block; without marker rows the
        // year header is the best available boundary.
        let preamble_rows = if strategy == segment::MARKER_ROWS {
            spans.first().map(|span| span.row_lower).unwrap_or(0)
        } else {
            locate_year_header(sheet, 0, sheet.rows() - 1)
                .map(|header| header.row)
                .unwrap_or(0)
        };
        let extracted =
            params::extract_input_parameters(sheet, preamble_rows, sheet.rows() - 1);
        if !extracted.is_empty() {
            if input_parameters.is_empty() {
                input_parameters = extracted;
            } else if extracted != input_parameters {
                warnings.push(format!(
                    "Sheet '{}' defines conflicting workbook parameters; keeping the first extraction",
                    sheet.name
                ));
            }
        }

        for span in &spans {
            if let Some(model) = block::parse_block(sheet, span, &mut warnings) {
                models.push(model);
            }
        }
    }

    if models.is_empty() {
        return Err(ExtractError::NothingExtracted {
            report: diagnostic_report(&workbook),
        }
        .into());
    }

    Ok(ParseResult {
        models,
        input_parameters,
        warnings,
    })
}

/// Per-sheet dimensions and a preview of the first ten rows' non-empty
/// cells, for the nothing-extracted failure.
fn diagnostic_report(workbook: &Workbook) -> String {
    let mut report = String::new();
    for sheet in &workbook.sheets {
        report.push_str(&format!(
            "sheet '{}': {} rows x {} cols\n",
            sheet.name,
            sheet.rows(),
            sheet.cols()
        ));
        for row in 0..sheet.rows().min(10) {
            let cells: Vec<String> = sheet
                .row_cells(row)
                .filter(|cell| !cell.value.trim().is_empty())
                .map(|cell| format!("{}='{}'", cell.reference(), preview(&cell.value)))
                .collect();
            if !cells.is_empty() {
                report.push_str(&format!("  {}\n", cells.join(" ")));
            }
        }
    }
    report
}

fn preview(value: &str) -> String {
    const LIMIT: usize = 40;
    if value.chars().count() <= LIMIT {
        value.to_owned()
    } else {
        let mut truncated: String = value.chars().take(LIMIT).collect();
        truncated.push('…');
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("short"), "short");
        let long = "å".repeat(60);
        let truncated = preview(&long);
        assert_eq!(truncated.chars().count(), 41);
        assert!(truncated.ends_with('…'));
    }
}
