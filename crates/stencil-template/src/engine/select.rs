/*
 * engine/select.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Select expressions.
//!
//! The subset of XPath 1.0 produced by the compiler and the built-in
//! expressions: absolute (`/values/a/b`) and relative (`a/b`, `.`, `../a`)
//! location paths over child elements, `*` wildcards, and `not(...)`.

use crate::error::{TemplateError, TemplateResult};
use stencil_xml::{XmlDocument, XmlElement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Select {
    Path { absolute: bool, steps: Vec<Step> },
    Not(Box<Select>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    SelfNode,
    Parent,
    AnyChild,
    Child(String),
}

/// A node of the input document: the document node itself, or an element
/// together with its ancestors.
#[derive(Debug, Clone)]
pub(crate) struct Node<'a> {
    root: &'a XmlElement,
    ancestry: Vec<&'a XmlElement>,
}

impl<'a> Node<'a> {
    pub(crate) fn document(doc: &'a XmlDocument) -> Self {
        Self {
            root: &doc.root,
            ancestry: Vec::new(),
        }
    }

    fn document_node(&self) -> Self {
        Self {
            root: self.root,
            ancestry: Vec::new(),
        }
    }

    fn children(&self) -> Vec<&'a XmlElement> {
        match self.ancestry.last() {
            None => vec![self.root],
            Some(element) => element.elements().collect(),
        }
    }

    fn child(&self, element: &'a XmlElement) -> Self {
        let mut ancestry = self.ancestry.clone();
        ancestry.push(element);
        Self {
            root: self.root,
            ancestry,
        }
    }

    fn parent(&self) -> Option<Self> {
        let mut ancestry = self.ancestry.clone();
        ancestry.pop()?;
        Some(Self {
            root: self.root,
            ancestry,
        })
    }

    fn same_node(&self, other: &Self) -> bool {
        match (self.ancestry.last(), other.ancestry.last()) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }

    /// Concatenated descendant text.
    pub(crate) fn string_value(&self) -> String {
        match self.ancestry.last() {
            None => self.root.text_content(),
            Some(element) => element.text_content(),
        }
    }
}

/// Result of evaluating a select expression.
#[derive(Debug, Clone)]
pub(crate) enum Outcome<'a> {
    Nodes(Vec<Node<'a>>),
    Boolean(bool),
}

impl<'a> Outcome<'a> {
    pub(crate) fn to_bool(&self) -> bool {
        match self {
            Outcome::Nodes(nodes) => !nodes.is_empty(),
            Outcome::Boolean(b) => *b,
        }
    }

    /// String value: that of the first node, or `true`/`false`.
    pub(crate) fn to_text(&self) -> String {
        match self {
            Outcome::Nodes(nodes) => nodes.first().map(Node::string_value).unwrap_or_default(),
            Outcome::Boolean(b) => b.to_string(),
        }
    }
}

impl Select {
    pub(crate) fn parse(expr: &str) -> TemplateResult<Self> {
        let expr = expr.trim();
        if let Some(inner) = expr.strip_prefix("not(").and_then(|r| r.strip_suffix(')')) {
            return Ok(Select::Not(Box::new(Select::parse(inner)?)));
        }

        let (absolute, rest) = match expr.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, expr),
        };
        if rest.is_empty() {
            if absolute {
                return Ok(Select::Path {
                    absolute,
                    steps: Vec::new(),
                });
            }
            return Err(unsupported(expr));
        }

        let steps = rest
            .split('/')
            .map(|step| parse_step(step.trim()).ok_or_else(|| unsupported(expr)))
            .collect::<TemplateResult<Vec<_>>>()?;
        Ok(Select::Path { absolute, steps })
    }

    pub(crate) fn evaluate<'a>(&self, context: &Node<'a>) -> Outcome<'a> {
        match self {
            Select::Not(inner) => Outcome::Boolean(!inner.evaluate(context).to_bool()),
            Select::Path { absolute, steps } => {
                let start = if *absolute {
                    context.document_node()
                } else {
                    context.clone()
                };
                let mut current = vec![start];
                for step in steps {
                    let mut next: Vec<Node<'a>> = Vec::new();
                    for node in &current {
                        match step {
                            Step::SelfNode => next.push(node.clone()),
                            Step::Parent => next.extend(node.parent()),
                            Step::AnyChild => {
                                next.extend(node.children().into_iter().map(|e| node.child(e)))
                            }
                            Step::Child(name) => next.extend(
                                node.children()
                                    .into_iter()
                                    .filter(|e| e.qualified_name() == *name)
                                    .map(|e| node.child(e)),
                            ),
                        }
                    }
                    next.dedup_by(|a, b| a.same_node(b));
                    current = next;
                }
                Outcome::Nodes(current)
            }
        }
    }
}

fn parse_step(step: &str) -> Option<Step> {
    match step {
        "." => Some(Step::SelfNode),
        ".." => Some(Step::Parent),
        "*" => Some(Step::AnyChild),
        name if is_name(name) => Some(Step::Child(name.to_string())),
        _ => None,
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        }
        _ => false,
    }
}

fn unsupported(expr: &str) -> TemplateError {
    TemplateError::transform(format!("unsupported select expression {:?}", expr))
}
