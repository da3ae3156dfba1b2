//! XML parser that builds mutable [`XmlDocument`] trees.

use crate::types::split_qualified;
use crate::{Error, Result, XmlAttribute, XmlDeclaration, XmlDocument, XmlElement, XmlNode};
use quick_xml::Reader;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::path::Path;

/// Parse XML from a string.
///
/// # Example
///
/// ```rust
/// use stencil_xml::parse;
///
/// let xml = parse("<root><child/></root>").unwrap();
/// assert_eq!(xml.root.name, "root");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &str) -> Result<XmlDocument> {
    XmlParser::new(content).parse()
}

/// Read and parse an XML file.
pub fn parse_file(path: &Path) -> Result<XmlDocument> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}

/// Name of the synthetic element used to parse fragments.
const FRAGMENT_ROOT: &str = "stencil-fragment";

/// Parse a markup fragment (any mix of text and elements) into nodes.
///
/// ```rust
/// use stencil_xml::{parse_fragment, XmlNode};
///
/// let nodes = parse_fragment("a <b>bold</b> move").unwrap();
/// assert_eq!(nodes.len(), 3);
/// assert_eq!(nodes[0], XmlNode::Text("a ".to_string()));
/// ```
pub fn parse_fragment(content: &str) -> Result<Vec<XmlNode>> {
    let wrapped = format!("<{FRAGMENT_ROOT}>{content}</{FRAGMENT_ROOT}>");
    let doc = parse(&wrapped)?;
    Ok(doc.root.children)
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Declaration seen before the root, if any.
    declaration: Option<XmlDeclaration>,

    /// Stack of elements being built.
    stack: Vec<XmlElement>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            declaration: None,
            stack: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;

        loop {
            let event_start = self.reader.buffer_position();

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = self.start_element(&e, event_start)?;
                    self.stack.push(element);
                }
                Ok(Event::End(e)) => {
                    let element = self.handle_end(&e, event_start)?;
                    self.attach(element, &mut root, event_start)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.start_element(&e, event_start)?;
                    self.attach(element, &mut root, event_start)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|err| Error::XmlSyntax {
                        message: format!("Invalid text content: {}", err),
                        position: Some(event_start),
                    })?;
                    self.push_text(&text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.push_text(&text);
                }
                Ok(Event::Comment(e)) => {
                    // Comments outside the root element are dropped
                    if let Some(node) = self.stack.last_mut() {
                        let comment = String::from_utf8_lossy(&e).into_owned();
                        node.children.push(XmlNode::Comment(comment));
                    }
                }
                Ok(Event::Decl(e)) => {
                    self.declaration = Some(self.parse_declaration(&e, event_start)?);
                }
                Ok(Event::PI(_) | Event::DocType(_)) => {
                    // Skip processing instructions and DOCTYPE declarations
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        // Check for unclosed elements
        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.qualified_name()),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        Ok(XmlDocument {
            declaration: self.declaration,
            root,
        })
    }

    /// Attach a finished element to its parent, or make it the root.
    fn attach(
        &mut self,
        element: XmlElement,
        root: &mut Option<XmlElement>,
        position: u64,
    ) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(XmlNode::Element(element));
                Ok(())
            }
            None if root.is_some() => Err(Error::MultipleRoots {
                position: Some(position),
            }),
            None => {
                *root = Some(element);
                Ok(())
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        // Text outside the root element is whitespace (or an error quick-xml reports)
        let Some(node) = self.stack.last_mut() else {
            return;
        };
        match node.children.last_mut() {
            Some(XmlNode::Text(prev)) => prev.push_str(text),
            _ => node.children.push(XmlNode::Text(text.to_string())),
        }
    }

    fn start_element(&self, e: &BytesStart<'_>, position: u64) -> Result<XmlElement> {
        let full_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let (name, prefix) = split_qualified(&full_name);

        let mut attributes = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let (name, prefix) = split_qualified(&key);

            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: Some(position),
            })?;

            attributes.push(XmlAttribute {
                name,
                prefix,
                value: value.into_owned(),
            });
        }

        Ok(XmlElement {
            name,
            prefix,
            attributes,
            children: Vec::new(),
        })
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>, position: u64) -> Result<XmlElement> {
        let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        let node = self.stack.pop().ok_or_else(|| Error::InvalidStructure {
            message: format!("Unexpected closing tag </{}>", end_name),
        })?;

        // Verify tag names match
        if node.qualified_name() != end_name {
            return Err(Error::MismatchedEndTag {
                expected: node.qualified_name(),
                found: end_name,
                position: Some(position),
            });
        }

        Ok(node)
    }

    fn parse_declaration(&self, e: &BytesDecl<'_>, position: u64) -> Result<XmlDeclaration> {
        let version = e
            .version()
            .map_err(|err| declaration_error(err, position))?;
        let version = String::from_utf8_lossy(&version).into_owned();
        let encoding = match e.encoding() {
            Some(enc) => {
                let enc = enc.map_err(|err| declaration_error(err, position))?;
                Some(String::from_utf8_lossy(&enc).into_owned())
            }
            None => None,
        };
        let standalone = match e.standalone() {
            Some(sa) => {
                let sa = sa.map_err(|err| declaration_error(err, position))?;
                Some(String::from_utf8_lossy(&sa).into_owned())
            }
            None => None,
        };

        Ok(XmlDeclaration {
            version,
            encoding,
            standalone,
        })
    }
}

fn declaration_error(err: impl std::fmt::Display, position: u64) -> Error {
    Error::XmlSyntax {
        message: format!("Invalid XML declaration: {}", err),
        position: Some(position),
    }
}
