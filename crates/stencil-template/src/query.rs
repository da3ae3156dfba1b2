/*
 * query.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Node-selection queries.
//!
//! Document collaborators describe which elements may carry placeholders with
//! a small XPath-like query: alternatives separated by `|`, each of the form
//! `//*`, `//name`, `//prefix:name` or `//prefix:*`.

use crate::error::{TemplateError, TemplateResult};
use stencil_xml::XmlElement;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    AnyInPrefix(String),
    Name {
        prefix: Option<String>,
        name: String,
    },
}

/// A parsed node-selection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeQuery {
    alternatives: Vec<NameTest>,
}

impl NodeQuery {
    /// Parse a query string.
    pub fn parse(query: &str) -> TemplateResult<Self> {
        let alternatives = query
            .split('|')
            .map(|alt| parse_alternative(alt.trim(), query))
            .collect::<TemplateResult<Vec<_>>>()?;
        Ok(Self { alternatives })
    }

    /// Whether `element` is selected.
    pub fn matches(&self, element: &XmlElement) -> bool {
        self.alternatives.iter().any(|test| match test {
            NameTest::Any => true,
            NameTest::AnyInPrefix(prefix) => element.prefix.as_deref() == Some(prefix.as_str()),
            NameTest::Name { prefix, name } => element.is(prefix.as_deref(), name),
        })
    }
}

fn parse_alternative(alt: &str, query: &str) -> TemplateResult<NameTest> {
    let invalid = || {
        TemplateError::config(format!(
            "invalid node selection query {:?}: expected //name, //prefix:name or //*",
            query
        ))
    };

    let test = alt.strip_prefix("//").ok_or_else(invalid)?;
    if test == "*" {
        return Ok(NameTest::Any);
    }

    let (prefix, name) = match test.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, test),
    };
    if let Some(prefix) = prefix {
        if !is_name(prefix) {
            return Err(invalid());
        }
        if name == "*" {
            return Ok(NameTest::AnyInPrefix(prefix.to_string()));
        }
    }
    if !is_name(name) {
        return Err(invalid());
    }
    Ok(NameTest::Name {
        prefix: prefix.map(str::to_string),
        name: name.to_string(),
    })
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any() {
        let query = NodeQuery::parse("//*").unwrap();
        assert!(query.matches(&XmlElement::new("p")));
        assert!(query.matches(&XmlElement::new("text:p")));
    }

    #[test]
    fn test_names_and_alternatives() {
        let query = NodeQuery::parse("//text:p | //text:h|//cell").unwrap();
        assert!(query.matches(&XmlElement::new("text:p")));
        assert!(query.matches(&XmlElement::new("text:h")));
        assert!(query.matches(&XmlElement::new("cell")));
        assert!(!query.matches(&XmlElement::new("p")));
        assert!(!query.matches(&XmlElement::new("table:cell")));
    }

    #[test]
    fn test_prefix_wildcard() {
        let query = NodeQuery::parse("//w:*").unwrap();
        assert!(query.matches(&XmlElement::new("w:t")));
        assert!(!query.matches(&XmlElement::new("t")));
    }

    #[test]
    fn test_invalid_queries() {
        for bad in ["", "p", "/p", "//", "//a b", "//:p", "//*|x"] {
            assert!(
                matches!(NodeQuery::parse(bad), Err(TemplateError::Config { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
