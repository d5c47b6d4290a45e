//! Descriptor parsing with a construction-time choice of strictness
//!
//! Real-world JNLP files are frequently hand-written and not always
//! well-formed. The tolerant backend is an event reader that keeps going
//! through mismatched tags, bad entities, broken markup and undecodable
//! bytes; the strict backend is a conforming DOM parser that rejects any
//! of those. Both honour the encoding the document declares.

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::charset::{self, Detected};
use super::{Document, Element};
use crate::errors::{ParseError, ParseResult};

/// Which XML engine the parser uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserMode {
    /// Recover from common malformations and return a best-effort tree
    #[default]
    Tolerant,
    /// Fail on any malformation
    Strict,
}

impl fmt::Display for ParserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserMode::Tolerant => write!(f, "tolerant"),
            ParserMode::Strict => write!(f, "strict"),
        }
    }
}

/// Turns descriptor bytes into a [`Document`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorParser {
    mode: ParserMode,
}

impl DescriptorParser {
    pub fn new(mode: ParserMode) -> Self {
        Self { mode }
    }

    /// The engine this parser was built with
    pub fn mode(&self) -> ParserMode {
        self.mode
    }

    /// Hint shown to the user when parsing fails, if a different mode could help
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self.mode {
            ParserMode::Strict => Some(
                "To enable automatic recovery from some XML errors, re-run without --strict-xml",
            ),
            ParserMode::Tolerant => None,
        }
    }

    /// Parses raw descriptor bytes
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if no root element can be recovered, or, in
    /// strict mode, if the input is not well-formed XML in its declared
    /// encoding.
    pub fn parse(&self, bytes: &[u8]) -> ParseResult<Document> {
        let document = match self.mode {
            ParserMode::Tolerant => parse_tolerant(bytes)?,
            ParserMode::Strict => parse_strict(bytes)?,
        };
        tracing::debug!(
            "Parsed descriptor ({} mode), root <{}>",
            self.mode,
            document.root.name
        );
        Ok(document)
    }
}

fn parse_strict(bytes: &[u8]) -> ParseResult<Document> {
    let detected = charset::detect(bytes)?;
    let text = detected.decode_strict(bytes)?;
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let tree = roxmltree::Document::parse_with_options(&text, options)?;
    Ok(Document {
        root: convert_node(tree.root_element()),
    })
}

fn convert_node(node: roxmltree::Node<'_, '_>) -> Element {
    Element {
        name: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect(),
        children: node
            .children()
            .filter(|child| child.is_element())
            .map(convert_node)
            .collect(),
    }
}

/// Element stack used while replaying reader events
#[derive(Default)]
struct TreeBuilder {
    open: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn attach(&mut self, element: Element) {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(element);
        } else if self.root.is_none() {
            self.root = Some(element);
        } else {
            tracing::debug!("Ignoring extra top-level element <{}>", element.name);
        }
    }

    fn open(&mut self, element: Element) {
        self.open.push(element);
    }

    /// Closes the innermost open element with this name, and everything opened inside it
    fn close(&mut self, name: &str) {
        let Some(index) = self.open.iter().rposition(|element| element.name == name) else {
            tracing::debug!("Ignoring stray closing tag </{}>", name);
            return;
        };
        while self.open.len() > index {
            if let Some(element) = self.open.pop() {
                self.attach(element);
            }
        }
    }

    fn close_all(&mut self) {
        while let Some(element) = self.open.pop() {
            self.attach(element);
        }
    }

    fn finish(mut self) -> ParseResult<Document> {
        self.close_all();
        self.root
            .map(|root| Document { root })
            .ok_or(ParseError::MissingRoot)
    }
}

fn parse_tolerant(bytes: &[u8]) -> ParseResult<Document> {
    let detected = charset::detect(bytes).unwrap_or_else(|e| {
        tracing::warn!("{}, reading the descriptor as UTF-8", e);
        Detected::utf8()
    });
    let text = detected.decode_lossy(bytes);

    let mut builder = TreeBuilder::default();
    let mut first_error = None;
    let mut offset = 0;
    while let Some(error_at) = replay(&text, offset, &mut builder, &mut first_error) {
        // resume at the next tag after the broken markup
        let Some(next) = text
            .as_bytes()
            .get(error_at + 1..)
            .and_then(|rest| rest.iter().position(|&b| b == b'<'))
        else {
            break;
        };
        offset = error_at + 1 + next;
        tracing::warn!(
            "Descriptor XML error at byte {}, skipped to byte {}",
            error_at,
            offset
        );
    }

    match (builder.finish(), first_error) {
        (Err(ParseError::MissingRoot), Some(error)) => Err(error),
        (result, _) => result,
    }
}

/// Feeds reader events for `text` from byte `offset` on into `builder`
///
/// Returns the byte offset of the markup that broke the reader, if any.
fn replay(
    text: &str,
    offset: usize,
    builder: &mut TreeBuilder,
    first_error: &mut Option<ParseError>,
) -> Option<usize> {
    let segment = &text[offset..];
    let mut reader = Reader::from_str(segment);
    reader.config_mut().check_end_names = false;
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => builder.open(element_from(&start)),
            Ok(Event::Empty(start)) => builder.attach(element_from(&start)),
            Ok(Event::End(end)) => builder.close(&lossy(end.local_name().as_ref())),
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(e) => {
                let position = offset
                    + usize::try_from(reader.error_position())
                        .unwrap_or(segment.len())
                        .min(segment.len());
                first_error.get_or_insert_with(|| ParseError::Tolerant {
                    position: position as u64,
                    reason: e.to_string(),
                });
                return Some(position);
            }
        }
    }
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let mut element = Element::new(lossy(start.local_name().as_ref()));
    for attr in start.html_attributes().with_checks(false) {
        let Ok(attr) = attr else {
            break;
        };
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = lossy(attr.key.local_name().as_ref());
        let raw = lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| raw.clone());
        element.attributes.push((key, value));
    }
    element
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
