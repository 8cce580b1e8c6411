//! XML parsing utilities shared by the workbook decode layer.
//! Wraps quick-xml with a reusable buffer and helpers for attribute and text extraction.

use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub(crate) enum XmlError {
    #[error("{0}")]
    SyntaxError(#[from] quick_xml::Error),

    #[error("{0}")]
    EncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    AttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse character reference failed: {0}")]
    ParseCharacterReferenceError(#[from] std::num::ParseIntError),
}

/// XML reader with configuration suited to OOXML worksheet parts.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, returning None at end of input.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, XmlError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(XmlError::SyntaxError(error)),
        }
    }
}

/// Returns the unescaped value of the named attribute, if present.
pub(crate) fn attribute(event: &BytesStart<'_>, name: &str) -> Result<Option<String>, XmlError> {
    Ok(event
        .try_get_attribute(name)?
        .map(|attribute| attribute.unescape_value().map(|value| value.to_string()))
        .transpose()?)
}

/// Appends the text of a general entity or character reference to `target`.
/// Handles `&#NNN;`, `&#xHHH;` and the predefined XML entities.
pub(crate) fn push_general_ref(target: &mut String, bytes: &BytesRef<'_>) -> Result<(), XmlError> {
    let raw = bytes.xml_content()?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = if let Some(hex) = number.strip_prefix('x') {
            u32::from_str_radix(hex, 16)?
        } else {
            number.parse::<u32>()?
        };
        if let Some(character) = std::char::from_u32(code) {
            target.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        target.push_str(entity);
    } else {
        return Err(XmlError::ParseEntityError(raw.to_string()));
    }
    Ok(())
}

#[macro_export]
macro_rules! for_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
