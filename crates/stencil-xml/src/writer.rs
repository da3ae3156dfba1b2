//! Serialization of [`XmlDocument`] trees back to markup.
//!
//! Output is compact: no indentation is added and text is written exactly as
//! stored (with the five XML special characters escaped), so that
//! `parse(to_string(doc)) == doc` for any document produced by [`crate::parse`].

use crate::{Error, Result, XmlDocument, XmlElement, XmlNode};
use quick_xml::escape::escape;
use std::path::Path;

/// Serialize a document, including its declaration.
pub fn to_string(doc: &XmlDocument) -> String {
    let mut out = String::new();
    if let Some(decl) = &doc.declaration {
        out.push_str("<?xml version=\"");
        out.push_str(&escape(decl.version.as_str()));
        out.push('"');
        if let Some(encoding) = &decl.encoding {
            out.push_str(" encoding=\"");
            out.push_str(&escape(encoding.as_str()));
            out.push('"');
        }
        if let Some(standalone) = &decl.standalone {
            out.push_str(" standalone=\"");
            out.push_str(&escape(standalone.as_str()));
            out.push('"');
        }
        out.push_str("?>\n");
    }
    write_element(&doc.root, &mut out);
    out
}

/// Serialize a single element (and its subtree).
pub fn element_to_string(element: &XmlElement) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

/// Serialize a document to a file, replacing any existing content.
pub fn write_file(path: &Path, doc: &XmlDocument) -> Result<()> {
    std::fs::write(path, to_string(doc)).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_element(element: &XmlElement, out: &mut String) {
    let name = element.qualified_name();
    out.push('<');
    out.push_str(&name);
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&attr.qualified_name());
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(e) => write_element(e, out),
        XmlNode::Text(t) => out.push_str(&escape(t.as_str())),
        XmlNode::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
    }
}
