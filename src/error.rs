use crate::extract::ExtractError;
use crate::spreadsheet::SpreadsheetError;
use thiserror::Error;

/// Top-level error type of the extraction engine.
///
/// Exactly two situations are fatal: the document cannot be decoded, or the
/// decoded workbook yields zero usable blocks. Everything else is reported
/// through `ParseResult::warnings` instead of raised.
#[derive(Error, Debug)]
pub enum ModelSheetError {
    #[error("{0}")]
    DecodeError(#[from] SpreadsheetError),

    #[error("{0}")]
    ExtractError(#[from] ExtractError),
}
