use crate::for_xml_events;
use crate::helpers::xml::attribute;
use crate::helpers::xml::push_general_ref;
use crate::helpers::xml::XmlError;
use crate::helpers::xml::XmlReader;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::reference_to_index;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::RawCellKind;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names of the OOXML spreadsheet parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship"; // Workbook relationship entry
const TAG_SHEET: QName = QName(b"sheet"); //         Worksheet definition
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs"); // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh"); //   Phonetic annotation, skipped
const TAG_TEXT: QName = QName(b"t");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// Loads the workbook relationship table mapping relationship IDs to
/// worksheet part paths.
pub(super) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<HashMap<String, String>, SpreadsheetError> {
    let mut reader = zip
        .xml_part(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    for_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = attribute(&event, "Id")?;
            let kind = attribute(&event, "Type")?;
            let target = attribute(&event, "Target")?;
            // Only worksheet relationships matter here
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id, to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Loads the ordered sheet list (name, relationship ID) from workbook.xml,
/// together with the workbook's 1904-date-system flag.
pub(super) fn load_sheet_list<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<(Vec<(String, String)>, bool), SpreadsheetError> {
    let mut reader = zip
        .xml_part("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPart("xl/workbook.xml".to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    for_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<String>;
            let mut id = None::<String>;
            // The relationship ID attribute is namespaced (r:id), so the
            // lookup goes through local names.
            for result in event.attributes() {
                let attribute = result.map_err(XmlError::from)?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value().map_err(XmlError::from)?.to_string());
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value().map_err(XmlError::from)?.to_string());
                }
            }
            if let Some((name, id)) = name.zip(id) {
                sheets.push((name, id));
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = attribute(&event, "date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads cell format indexes from styles.xml, resolved against custom and
/// built-in number formats, so numeric cells can be told apart from dates.
pub(super) fn load_number_formats<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    is_1904: bool,
) -> Result<Vec<RawCellKind>, SpreadsheetError> {
    let mut reader = match zip.xml_part("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, RawCellKind>::new();

    // xf tags also appear under cellStyleXfs; only cellXfs entries are cell formats
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    for_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = attribute(&event, "numFmtId")?;
            let format = attribute(&event, "formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id, RawCellKind::from_custom_format(&format, is_1904));
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            if let Some(id) = attribute(&event, "numFmtId")? {
                format_indexes.push(id);
            }
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| RawCellKind::from_builtin_format_id(id, is_1904))
                .unwrap_or(RawCellKind::Number)
        })
        .collect())
}

/// Loads the shared string table, concatenating rich-text runs.
pub(super) fn load_shared_strings<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<Vec<String>, SpreadsheetError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_part("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };

    for_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads one worksheet part into a sparse cell grid.
///
/// Formula cells contribute their cached `<v>` result; the formula source in
/// `<f>` is never read. Shared string references are resolved immediately so
/// downstream code only sees payload text.
pub(super) fn read_sheet<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    sheet_name: &str,
    path: &str,
    number_formats: &[RawCellKind],
    shared_strings: &[String],
) -> Result<Sheet, SpreadsheetError> {
    let mut reader = zip
        .xml_part(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_owned()))?;

    let mut sheet = Sheet::new(sheet_name);
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = RawCellKind::default();
    let mut value = String::new();
    for_xml_events!(reader => {
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
            col_count = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            (row, col) = attribute(&event, "r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            row_count = row;
            col_count = col + 1;
            kind = match attribute(&event, "t")?.as_deref() {
                Some("inlineStr") | Some("str") => RawCellKind::InlineString,
                Some("s") => RawCellKind::SharedString,
                Some("d") => RawCellKind::IsoDate,
                Some("b") => RawCellKind::Boolean,
                Some("e") => RawCellKind::Error,
                _ => RawCellKind::Number,
            };
            if kind == RawCellKind::Number {
                if let Some(style) = attribute(&event, "s")?.filter(|style| !style.is_empty()) {
                    let index = style.parse::<usize>()?;
                    if let Some(format) = number_formats.get(index) {
                        kind = *format;
                    }
                }
            }
            value.clear();
        }
        Event::Start(event) if kind != RawCellKind::Empty && event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if kind != RawCellKind::Empty && event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if kind != RawCellKind::Empty && !value.is_empty() && event.name() == TAG_CELL => {
            let resolved = if kind == RawCellKind::SharedString {
                value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| shared_strings.get(index).cloned())
            } else {
                Some(value.clone())
            };
            if let Some(resolved) = resolved {
                sheet.push(Cell {
                    row,
                    col,
                    kind,
                    value: resolved,
                });
            }
            value.clear();
            kind = RawCellKind::Empty;
        }
    });
    Ok(sheet)
}

/// Reads string content up to `end_tag`, concatenating `<t>` runs and CDATA
/// while skipping phonetic annotations.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, XmlError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    for_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => push_general_ref(&mut text, &event)?,
    });
    Ok(text)
}

/// Normalizes a relationship target into a path inside the archive.
fn to_zip_path(path: &str) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_path_normalization() {
        assert_eq!(to_zip_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
