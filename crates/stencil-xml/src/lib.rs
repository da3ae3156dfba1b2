//! Mutable XML node trees for stencil.
//!
//! This crate wraps [`quick-xml`] to provide an owned tree of [`XmlElement`]s
//! that can be parsed, rewritten in place, and written back out. Unlike a
//! read-only view, the tree keeps everything a template round trip needs:
//! mixed text and element content in document order, comments, namespace
//! prefixes, and the XML declaration.
//!
//! # Overview
//!
//! The main types are:
//! - [`XmlDocument`]: A parsed document (optional declaration plus root element)
//! - [`XmlElement`]: An element with name, prefix, attributes and children
//! - [`XmlAttribute`]: An attribute with name, prefix and unescaped value
//! - [`XmlNode`]: A child node (element, text, or comment)
//!
//! # Example
//!
//! ```rust
//! use stencil_xml::{parse, to_string};
//!
//! let mut doc = parse(r#"<doc version="1"><p>Hello</p></doc>"#).unwrap();
//!
//! assert_eq!(doc.root.name, "doc");
//! assert_eq!(doc.root.get_attribute("version"), Some("1"));
//!
//! doc.root.set_attribute("version", "2");
//! assert_eq!(to_string(&doc), r#"<doc version="2"><p>Hello</p></doc>"#);
//! ```

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export main types
pub use error::{Error, Result};
pub use parser::{parse, parse_file, parse_fragment};
pub use types::{XmlAttribute, XmlDeclaration, XmlDocument, XmlElement, XmlNode};
pub use writer::{element_to_string, to_string, write_file};
