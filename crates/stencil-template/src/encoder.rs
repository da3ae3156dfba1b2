/*
 * encoder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Encoding of value trees as values documents.
//!
//! ```text
//! {"user": {"name": "Ann"}, "items": ["a", "b"], "draft": false}
//! ```
//!
//! becomes
//!
//! ```xml
//! <values><items>a</items><items>b</items><user><name>Ann</name></user></values>
//! ```
//!
//! Keys become element names, so they must be identifiers. A list under key
//! `k` becomes repeated `<k>` elements; nested lists nest a `<k>` per inner
//! list. `false` and null produce no element at all so that conditions on
//! them test false.

use crate::error::{TemplateError, TemplateResult};
use crate::instructions::VALUES_ROOT;
use crate::lexer::is_identifier;
use crate::values::Value;
use stencil_xml::{XmlDocument, XmlElement, XmlNode};

/// Element name used for items of a top-level list.
pub const LIST_ITEM: &str = "item";

/// Encode `values` as a `<values>` document.
pub fn encode_values(values: &Value) -> TemplateResult<XmlDocument> {
    let mut root = XmlElement::new(VALUES_ROOT);
    match values {
        Value::Map(entries) => {
            for (key, value) in entries {
                append(&mut root, key, value)?;
            }
        }
        Value::List(_) => append(&mut root, LIST_ITEM, values)?,
        scalar => {
            if let Some(text) = scalar.scalar_text().filter(|t| !t.is_empty()) {
                root.push(XmlNode::Text(text));
            }
        }
    }
    Ok(XmlDocument::with_declaration(root))
}

fn append(parent: &mut XmlElement, key: &str, value: &Value) -> TemplateResult<()> {
    if !is_identifier(key) {
        return Err(TemplateError::InvalidValues {
            message: format!("key {:?} is not a valid identifier", key),
        });
    }

    match value {
        Value::Null | Value::Bool(false) => {}
        Value::List(items) => {
            for item in items {
                if let Value::List(_) = item {
                    let mut nested = XmlElement::new(key);
                    append(&mut nested, key, item)?;
                    parent.push(nested.into());
                } else {
                    append(parent, key, item)?;
                }
            }
        }
        Value::Map(entries) => {
            let mut element = XmlElement::new(key);
            for (k, v) in entries {
                append(&mut element, k, v)?;
            }
            parent.push(element.into());
        }
        scalar => {
            let mut element = XmlElement::new(key);
            if let Some(text) = scalar.scalar_text().filter(|t| !t.is_empty()) {
                element.push(XmlNode::Text(text));
            }
            parent.push(element.into());
        }
    }
    Ok(())
}
