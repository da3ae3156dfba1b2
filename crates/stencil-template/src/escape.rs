/*
 * escape.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Reserved-character escaping.
//!
//! In a stylesheet, `{` and `}` in literal attribute values delimit attribute
//! value templates. Compilation doubles them so source attributes are never
//! evaluated; the renderer undoes the doubling on the output tree.

use crate::instructions::is_any_instruction;
use stencil_xml::{XmlElement, XmlNode};

/// `{` → `{{`, `}` → `}}`.
pub fn escape_braces(value: &str) -> String {
    value.replace('{', "{{").replace('}', "}}")
}

/// `{{` → `{`, `}}` → `}`.
pub fn unescape_braces(value: &str) -> String {
    value.replace("{{", "{").replace("}}", "}")
}

/// Escape braces in every literal (non-instruction) attribute value.
pub fn escape_attribute_braces(element: &mut XmlElement) {
    map_literal_attributes(element, &escape_braces);
}

/// Reverse [`escape_attribute_braces`].
pub fn unescape_attribute_braces(element: &mut XmlElement) {
    map_literal_attributes(element, &unescape_braces);
}

fn map_literal_attributes(element: &mut XmlElement, f: &dyn Fn(&str) -> String) {
    if !is_any_instruction(element) {
        for attr in &mut element.attributes {
            if attr.value.contains(['{', '}']) {
                attr.value = f(&attr.value);
            }
        }
    }
    for child in &mut element.children {
        if let XmlNode::Element(e) = child {
            map_literal_attributes(e, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brace_round_trip() {
        for value in ["", "plain", "{x}", "{{", "a}b{c", "}}{{"] {
            assert_eq!(unescape_braces(&escape_braces(value)), value);
        }
    }

    #[test]
    fn test_instructions_are_left_alone() {
        let mut root = XmlElement::new("doc")
            .with_attribute("style", "{color}")
            .with_child(
                XmlElement::new("xsl:if")
                    .with_attribute("test", "{raw}")
                    .with_child(XmlElement::new("span").with_attribute("a", "}").into())
                    .into(),
            );
        escape_attribute_braces(&mut root);

        assert_eq!(root.get_attribute("style"), Some("{{color}}"));
        let conditional = root.elements().next().unwrap();
        assert_eq!(conditional.get_attribute("test"), Some("{raw}"));
        assert_eq!(
            conditional.elements().next().unwrap().get_attribute("a"),
            Some("}}")
        );

        unescape_attribute_braces(&mut root);
        assert_eq!(root.get_attribute("style"), Some("{color}"));
    }
}
