/*
 * instructions.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Construction and recognition of transform-program instructions.
//!
//! Compiled programs are XSLT 1.0 stylesheets:
//!
//! ```xml
//! <xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
//!   <xsl:template match="/">
//!     <doc><p>Hello <xsl:value-of select="/values/user/name"/>!</p></doc>
//!   </xsl:template>
//! </xsl:stylesheet>
//! ```
//!
//! Instructions are recognized by the `xsl` prefix.

use stencil_xml::{XmlDocument, XmlElement, XmlNode};

pub const XSL_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";
pub const XSL_PREFIX: &str = "xsl";

/// Name of the root element of encoded values documents.
pub const VALUES_ROOT: &str = "values";

/// Whether `doc` is a compiled program rather than raw source.
pub fn is_compiled(doc: &XmlDocument) -> bool {
    is_instruction(&doc.root, "stylesheet") || is_instruction(&doc.root, "transform")
}

/// Whether `element` is the instruction `xsl:<name>`.
pub fn is_instruction(element: &XmlElement, name: &str) -> bool {
    element.is(Some(XSL_PREFIX), name)
}

/// Whether `element` is any `xsl:` instruction.
pub fn is_any_instruction(element: &XmlElement) -> bool {
    element.prefix.as_deref() == Some(XSL_PREFIX)
}

fn instruction(name: &str) -> XmlElement {
    XmlElement::new(&format!("{}:{}", XSL_PREFIX, name))
}

/// Absolute select expression for a value path: `["a", "b"]` → `/values/a/b`.
pub fn values_select(path: &[String]) -> String {
    let mut select = format!("/{}", VALUES_ROOT);
    for segment in path {
        select.push('/');
        select.push_str(segment);
    }
    select
}

/// `<xsl:value-of select="..."/>`
pub fn value_of(select: &str) -> XmlElement {
    instruction("value-of").with_attribute("select", select)
}

/// `<xsl:value-of select="..." disable-output-escaping="yes"/>`
pub fn raw_value_of(select: &str) -> XmlElement {
    value_of(select).with_attribute("disable-output-escaping", "yes")
}

/// `<xsl:if test="..."/>`
pub fn conditional(test: &str) -> XmlElement {
    instruction("if").with_attribute("test", test)
}

/// `<xsl:for-each select="..."/>`
pub fn for_each(select: &str) -> XmlElement {
    instruction("for-each").with_attribute("select", select)
}

/// Value of `select` when it selects anything, otherwise the literal `fallback`.
pub fn value_or(select: &str, fallback: &str) -> XmlElement {
    let when = instruction("when")
        .with_attribute("test", select)
        .with_child(value_of(select).into());
    let otherwise =
        instruction("otherwise").with_child(instruction("text").with_text(fallback).into());
    instruction("choose")
        .with_child(when.into())
        .with_child(otherwise.into())
}

/// Nest `node` inside `wrappers`; the first wrapper ends up innermost.
pub fn wrap_all(wrappers: Vec<XmlElement>, node: XmlNode) -> XmlNode {
    wrappers.into_iter().fold(node, |inner, mut wrapper| {
        wrapper.push(inner);
        XmlNode::Element(wrapper)
    })
}

/// Wrap a compiled document body in the stylesheet skeleton.
pub fn stylesheet(body: XmlNode) -> XmlElement {
    let template = instruction("template")
        .with_attribute("match", "/")
        .with_child(body);
    instruction("stylesheet")
        .with_attribute("version", "1.0")
        .with_attribute(&format!("xmlns:{}", XSL_PREFIX), XSL_NAMESPACE)
        .with_child(template.into())
}

/// The `<xsl:template match="/">` of a compiled program.
pub fn root_template(program: &XmlElement) -> Option<&XmlElement> {
    program
        .elements()
        .find(|e| is_instruction(e, "template") && e.get_attribute("match") == Some("/"))
}
