//! Workbook decode layer.
//!
//! Turns raw OOXML spreadsheet bytes (.xlsx, .xlsm) into ordered sheets of
//! typed raw cells: shared strings resolved, cached formula results in place
//! of formula text, and number-format-driven date detection. This is the
//! atomic setup step that precedes all extraction heuristics; nothing here
//! interprets financial content.

use crate::helpers::xml::XmlError;
use std::io::Cursor;
use thiserror::Error;
use zip::ZipArchive;

pub(crate) mod cell;
pub(crate) mod sheet;
mod xlsx;

pub(crate) use sheet::Sheet;

/// Magic prefix of a CFB container: either a legacy binary workbook or an
/// encrypted OOXML package. Both are undecodable here.
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Errors raised while decoding the workbook container.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// The bytes are not a readable ZIP container
    #[error("Not an OOXML spreadsheet: {0}")]
    ContainerError(#[from] zip::result::ZipError),

    /// CFB container: password-protected workbook or legacy .xls
    #[error("Workbook is password protected or in a legacy binary format")]
    EncryptedOrLegacyWorkbook,

    /// A required archive part is absent
    #[error("Missing workbook part '{0}'")]
    MissingPart(String),

    /// Malformed XML in one of the workbook parts
    #[error("Malformed workbook XML: {0}")]
    XmlError(String),

    /// A style index could not be parsed
    #[error("Invalid cell style index: {0}")]
    StyleIndexError(#[from] std::num::ParseIntError),

    /// The workbook declares no sheets
    #[error("Workbook contains no sheets")]
    EmptyWorkbook,
}

impl From<XmlError> for SpreadsheetError {
    fn from(error: XmlError) -> Self {
        Self::XmlError(error.to_string())
    }
}

/// A decoded workbook: its sheets in workbook order.
#[derive(Debug)]
pub(crate) struct Workbook {
    pub(crate) sheets: Vec<Sheet>,
}

impl Workbook {
    /// Decodes an in-memory OOXML workbook.
    ///
    /// # Arguments
    /// * `bytes` - Raw document bytes as received from the upload boundary
    ///
    /// # Errors
    /// Fails when the container cannot be opened, a required part is missing
    /// or malformed, or the workbook declares no sheets. Individual cell
    /// oddities never fail the decode.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Workbook, SpreadsheetError> {
        if bytes.starts_with(&CFB_MAGIC) {
            return Err(SpreadsheetError::EncryptedOrLegacyWorkbook);
        }

        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let relationships = xlsx::load_relationships(&mut zip, "xl/_rels/workbook.xml.rels")?;
        let (sheet_list, is_1904) = xlsx::load_sheet_list(&mut zip)?;
        if sheet_list.is_empty() {
            return Err(SpreadsheetError::EmptyWorkbook);
        }

        let number_formats = xlsx::load_number_formats(&mut zip, is_1904)?;
        let shared_strings = xlsx::load_shared_strings(&mut zip)?;

        let mut sheets = Vec::with_capacity(sheet_list.len());
        for (name, relationship_id) in &sheet_list {
            if let Some(path) = relationships.get(relationship_id) {
                sheets.push(xlsx::read_sheet(
                    &mut zip,
                    name,
                    path,
                    &number_formats,
                    &shared_strings,
                )?);
            }
        }
        if sheets.is_empty() {
            return Err(SpreadsheetError::EmptyWorkbook);
        }
        Ok(Workbook { sheets })
    }
}
