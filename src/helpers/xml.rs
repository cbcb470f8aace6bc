//! XML parsing utilities shared by the xlsx and ods readers.
//! Wraps `quick_xml::Reader` with a configuration suited to worksheet parts.

use crate::error::ExdSheetError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// Streaming XML reader with a reusable event buffer
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

    /// Reads the next XML event, `None` at end of document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, ExdSheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(ExdSheetError::XmlError(error)),
        }
    }
}

pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, ExdSheetError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, ExdSheetError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, ExdSheetError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, ExdSheetError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => ExdSheetError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => ExdSheetError::StringEncodingError(error),
            })
    }
}

pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ExdSheetError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, ExdSheetError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, ExdSheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, ExdSheetError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Accumulates text content from XML events
pub(crate) trait XmlTextContextHelper {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), ExdSheetError>;

    /// Appends an entity or character reference (`&amp;`, `&#x41;`)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ExdSheetError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), ExdSheetError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), ExdSheetError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Drives an [`XmlReader`] to the end of the document, dispatching each event to the given arms.
/// Unmatched events are skipped; `break` leaves the loop early.
#[macro_export]
macro_rules! match_xml_events {
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

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::name::QName;

    #[test]
    fn reads_text_with_entities() -> Result<(), ExdSheetError> {
        let xml = r#"<root><t a="1&amp;2">x &lt; y &#x41;&#66;</t></root>"#;
        let mut reader = XmlReader::new(xml.as_bytes());
        let mut attribute = None;
        let mut text = String::new();
        let mut in_text = false;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == QName(b"t") => {
                attribute = event.get_attribute_value("a")?.map(|value| value.to_string());
                in_text = true;
            }
            Event::End(event) if event.name() == QName(b"t") => in_text = false,
            Event::Text(event) if in_text => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) if in_text => text.push_bytes_ref(&event)?,
        });
        assert_eq!(attribute.as_deref(), Some("1&2"));
        assert_eq!(text, "x < y AB");
        Ok(())
    }

    #[test]
    fn parses_attribute_values() -> Result<(), ExdSheetError> {
        let xml = r#"<row count="3" bad="x"/>"#;
        let mut reader = XmlReader::new(xml.as_bytes());
        match_xml_events!(reader => {
            Event::Start(event) => {
                assert_eq!(event.parse_attribute_value::<usize>("count")?, Some(3));
                assert_eq!(event.parse_attribute_value::<usize>("missing")?, None);
                assert!(event.parse_attribute_value::<usize>("bad").is_err());
            }
        });
        Ok(())
    }
}
