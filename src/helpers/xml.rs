//! XML reading and writing utilities for the SpreadsheetML parts of a workbook.

use crate::error::SheetPipelineError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// Pull reader over a workbook part, configured so that `<v/>` yields a start and an end event.
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

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Returns the next event, or `None` at end of input.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SheetPipelineError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(SheetPipelineError::XmlError(error)),
        }
    }
}

pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value.
    fn get_value(&self) -> Result<Cow<'a, str>, SheetPipelineError>;

    /// Parses the unescaped attribute value into `T`.
    fn parse_value<T: FromStr>(&self) -> Result<T, SheetPipelineError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SheetPipelineError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, SheetPipelineError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => XmlError::ParseAttributeValueError(value.to_string()).into(),
                Err(error) => SheetPipelineError::StringEncodingError(error),
            })
    }
}

pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by its qualified name.
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetPipelineError>;

    /// Parses an attribute value by its qualified name.
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetPipelineError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetPipelineError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetPipelineError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

pub(crate) trait XmlTextContextHelper {
    /// Appends decoded character data.
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SheetPipelineError>;

    /// Appends a resolved entity or character reference.
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetPipelineError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SheetPipelineError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetPipelineError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = char::from_u32(code) {
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

/// Writing counterpart used by the workbook exporter.
pub(crate) trait XmlWriterHelper {
    /// Writes `<name attr="value"...>`.
    fn open_tag(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SheetPipelineError>;

    /// Writes `</name>`.
    fn close_tag(&mut self, name: &str) -> Result<(), SheetPipelineError>;

    /// Writes `<name attr="value"...>text</name>` with the text escaped.
    fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), SheetPipelineError>;

    /// Writes a self-closing `<name attr="value"... />`.
    fn empty_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SheetPipelineError>;
}

fn start_with_attributes<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for attribute in attributes {
        start.push_attribute(*attribute);
    }
    start
}

impl<W: Write> XmlWriterHelper for Writer<W> {
    fn open_tag(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SheetPipelineError> {
        self.write_event(Event::Start(start_with_attributes(name, attributes)))?;
        Ok(())
    }

    fn close_tag(&mut self, name: &str) -> Result<(), SheetPipelineError> {
        self.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), SheetPipelineError> {
        self.open_tag(name, attributes)?;
        self.write_event(Event::Text(BytesText::new(text)))?;
        self.close_tag(name)
    }

    fn empty_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SheetPipelineError> {
        self.write_event(Event::Empty(start_with_attributes(name, attributes)))?;
        Ok(())
    }
}

/// Drives an [`XmlReader`] to the end of input, dispatching events to the given match arms.
/// Unmatched events are ignored; `break` stops reading early.
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
