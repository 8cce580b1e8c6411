//! # modelsheet
//!
//! A spreadsheet-to-structured-data extraction engine for semi-structured
//! financial forecast workbooks. Uploaded documents are not normalized: one
//! workbook may stack several independent forecast variants in a sheet or
//! spread them across sheets, with shifting column layouts, mixed
//! numeric-locale conventions, and bilingual row labels. This crate recovers
//! the structure from layout convention alone and produces a normalized,
//! periodized dataset.
//!
//! ## Features
//!
//! - **OOXML decode**: reads `.xlsx`/`.xlsm` bytes directly; computed cells
//!   resolve to their cached results, never formula source text
//! - **Locale-aware numbers**: "1 105,0", "1,105.0" and "1.105,0" all parse
//!   to the same value; sentinel placeholders become null
//! - **Layered block detection**: explicit `Name:` markers, scenario
//!   headings, and a whole-sheet fallback, tried in that order per sheet
//! - **Bilingual label mapping**: an ordered, auditable rule table maps
//!   English and Norwegian row labels onto ~45 financial fields, with
//!   context-sensitive resolution of bare "% margin" / "% growth" rows
//! - **Graceful degradation**: everything recoverable is a warning, never an
//!   abort; the one fatal extraction error carries a per-sheet diagnostic
//!   preview an operator can act on
//!
//! ## Usage
//!
//! ```no_run
//! use modelsheet::parse_workbook;
//!
//! # fn main() -> Result<(), modelsheet::ModelSheetError> {
//! let bytes = std::fs::read("forecast.xlsx").expect("read upload");
//! let result = parse_workbook(&bytes, Some("forecast.xlsx"))?;
//! for model in &result.models {
//!     println!("{}: {} periods", model.name, model.periods.len());
//! }
//! for warning in &result.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod extract;
mod helpers;
mod model;
mod spreadsheet;

pub use crate::error::ModelSheetError;
pub use crate::extract::parse_workbook;
pub use crate::extract::ExtractError;
pub use crate::model::FinancialField;
pub use crate::model::InputParameters;
pub use crate::model::ModelBlock;
pub use crate::model::ParseResult;
pub use crate::model::Period;
pub use crate::model::PeriodKind;
pub use crate::model::SourceRef;
pub use crate::spreadsheet::SpreadsheetError;
