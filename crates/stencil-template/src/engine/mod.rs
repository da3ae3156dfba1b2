/*
 * engine/mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Transform engines.
//!
//! A [`TransformEngine`] executes a compiled program against a values
//! document. [`BuiltinEngine`] interprets the instruction subset that the
//! compiler and the built-in expressions generate:
//!
//! - `xsl:value-of` (with `disable-output-escaping="yes"` parsing the value
//!   as markup)
//! - `xsl:if`, `xsl:for-each`, `xsl:choose`/`xsl:when`/`xsl:otherwise`
//! - `xsl:text`
//!
//! Literal elements and text are copied. Attribute values are copied
//! verbatim; the renderer reverses attribute brace escaping afterwards.

mod select;

use crate::error::{TemplateError, TemplateResult};
use crate::escape::escape_attribute_braces;
use crate::instructions::{is_any_instruction, is_compiled, is_instruction, root_template};
use select::{Node, Outcome, Select};
use stencil_xml::{XmlDocument, XmlElement, XmlNode};

/// Executes compiled programs.
pub trait TransformEngine: Send + Sync {
    /// Run `program` with `input` as the source document.
    fn transform(&self, program: &XmlDocument, input: &XmlDocument) -> TemplateResult<XmlDocument>;
}

/// The bundled interpreter for compiled programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngine;

impl TransformEngine for BuiltinEngine {
    fn transform(&self, program: &XmlDocument, input: &XmlDocument) -> TemplateResult<XmlDocument> {
        if !is_compiled(program) {
            return Err(TemplateError::transform(format!(
                "program root <{}> is not xsl:stylesheet",
                program.root.qualified_name()
            )));
        }
        let template = root_template(&program.root).ok_or_else(|| {
            TemplateError::transform("program has no <xsl:template match=\"/\">")
        })?;

        let mut output = Vec::new();
        apply_children(template, &Node::document(input), &mut output)?;

        Ok(XmlDocument {
            declaration: program.declaration.clone(),
            root: single_root(output)?,
        })
    }
}

fn apply_children(element: &XmlElement, context: &Node<'_>, out: &mut Vec<XmlNode>) -> TemplateResult<()> {
    for child in &element.children {
        match child {
            XmlNode::Text(text) => push_text(out, text),
            XmlNode::Comment(_) => {}
            XmlNode::Element(e) if is_any_instruction(e) => apply_instruction(e, context, out)?,
            XmlNode::Element(e) => {
                let mut copy = XmlElement {
                    name: e.name.clone(),
                    prefix: e.prefix.clone(),
                    attributes: e.attributes.clone(),
                    children: Vec::new(),
                };
                apply_children(e, context, &mut copy.children)?;
                out.push(XmlNode::Element(copy));
            }
        }
    }
    Ok(())
}

fn apply_instruction(
    instruction: &XmlElement,
    context: &Node<'_>,
    out: &mut Vec<XmlNode>,
) -> TemplateResult<()> {
    match instruction.name.as_str() {
        "value-of" => {
            let value = evaluate(instruction, "select", context)?.to_text();
            if instruction.get_attribute("disable-output-escaping") == Some("yes") {
                push_markup(out, &value);
            } else {
                push_text(out, &value);
            }
        }
        "if" => {
            if evaluate(instruction, "test", context)?.to_bool() {
                apply_children(instruction, context, out)?;
            }
        }
        "for-each" => match evaluate(instruction, "select", context)? {
            Outcome::Nodes(nodes) => {
                for node in &nodes {
                    apply_children(instruction, node, out)?;
                }
            }
            Outcome::Boolean(_) => {
                return Err(TemplateError::transform(
                    "xsl:for-each select must produce a node-set",
                ));
            }
        },
        "choose" => apply_choose(instruction, context, out)?,
        "text" => push_text(out, &instruction.own_text()),
        other => {
            return Err(TemplateError::transform(format!(
                "unsupported instruction xsl:{}",
                other
            )));
        }
    }
    Ok(())
}

fn apply_choose(choose: &XmlElement, context: &Node<'_>, out: &mut Vec<XmlNode>) -> TemplateResult<()> {
    for child in &choose.children {
        match child {
            XmlNode::Element(branch) if is_instruction(branch, "when") => {
                if evaluate(branch, "test", context)?.to_bool() {
                    return apply_children(branch, context, out);
                }
            }
            XmlNode::Element(branch) if is_instruction(branch, "otherwise") => {
                return apply_children(branch, context, out);
            }
            XmlNode::Element(other) => {
                return Err(TemplateError::transform(format!(
                    "unexpected <{}> in xsl:choose",
                    other.qualified_name()
                )));
            }
            XmlNode::Text(text) if !text.trim().is_empty() => {
                return Err(TemplateError::transform("text is not allowed in xsl:choose"));
            }
            XmlNode::Text(_) | XmlNode::Comment(_) => {}
        }
    }
    Ok(())
}

fn evaluate<'a>(instruction: &XmlElement, attribute: &str, context: &Node<'a>) -> TemplateResult<Outcome<'a>> {
    let expr = instruction.get_attribute(attribute).ok_or_else(|| {
        TemplateError::transform(format!(
            "xsl:{} requires a {} attribute",
            instruction.name, attribute
        ))
    })?;
    Ok(Select::parse(expr)?.evaluate(context))
}

fn push_text(out: &mut Vec<XmlNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(XmlNode::Text(previous)) => previous.push_str(text),
        _ => out.push(XmlNode::Text(text.to_string())),
    }
}

/// Insert `markup` as nodes; falls back to text when it is not well-formed.
///
/// Attribute braces of inserted elements are doubled so the renderer's
/// unescaping pass leaves them as they were in the value.
fn push_markup(out: &mut Vec<XmlNode>, markup: &str) {
    match stencil_xml::parse_fragment(markup) {
        Ok(nodes) => {
            for node in nodes {
                match node {
                    XmlNode::Text(text) => push_text(out, &text),
                    XmlNode::Element(mut element) => {
                        escape_attribute_braces(&mut element);
                        out.push(XmlNode::Element(element));
                    }
                    other => out.push(other),
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "raw value is not well-formed markup, inserting as text");
            push_text(out, markup);
        }
    }
}

fn single_root(output: Vec<XmlNode>) -> TemplateResult<XmlElement> {
    let mut root = None;
    for node in output {
        match node {
            XmlNode::Element(element) => {
                if root.is_some() {
                    return Err(TemplateError::transform(
                        "output has more than one root element",
                    ));
                }
                root = Some(element);
            }
            XmlNode::Text(text) if !text.trim().is_empty() => {
                return Err(TemplateError::transform(
                    "output has text outside the root element",
                ));
            }
            XmlNode::Text(_) | XmlNode::Comment(_) => {}
        }
    }
    root.ok_or_else(|| TemplateError::transform("output has no root element"))
}
