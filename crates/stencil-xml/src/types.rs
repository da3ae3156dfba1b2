//! Core types for mutable XML trees.

/// A parsed XML document.
///
/// Only the root element and the XML declaration are kept. Comments and
/// processing instructions outside the root are dropped on parse.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    /// The `<?xml ...?>` declaration, if the source had one.
    pub declaration: Option<XmlDeclaration>,

    /// The root element of the document.
    pub root: XmlElement,
}

/// The contents of an `<?xml ...?>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// An XML element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any (e.g., "text" in `<text:p>`).
    pub prefix: Option<String>,

    /// Attributes of this element, in source order.
    pub attributes: Vec<XmlAttribute>,

    /// Child nodes in document order.
    pub children: Vec<XmlNode>,
}

/// An XML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// The local name of the attribute (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// A single child node of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),

    /// Text content (after unescaping XML entities; CDATA is folded in).
    Text(String),

    /// A comment, without the `<!--`/`-->` markers.
    Comment(String),
}

impl XmlDocument {
    /// Create a document without a declaration.
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: None,
            root,
        }
    }

    /// Create a document with the standard `version="1.0" encoding="UTF-8"` declaration.
    pub fn with_declaration(root: XmlElement) -> Self {
        Self {
            declaration: Some(XmlDeclaration::default()),
            root,
        }
    }
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        }
    }
}

/// Split a qualified name like `xsl:value-of` into `(local, prefix)`.
pub(crate) fn split_qualified(full_name: &str) -> (String, Option<String>) {
    match full_name.split_once(':') {
        Some((prefix, local)) => (local.to_string(), Some(prefix.to_string())),
        None => (full_name.to_string(), None),
    }
}

impl XmlElement {
    /// Create a new empty element from a possibly prefixed name (`"xsl:if"`).
    pub fn new(qualified_name: &str) -> Self {
        let (name, prefix) = split_qualified(qualified_name);
        Self {
            name,
            prefix,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder-style text appender.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(XmlNode::Text(text.into()))
    }

    /// The qualified name (`prefix:name` or `name`).
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }

    /// Check the element's prefix and local name.
    pub fn is(&self, prefix: Option<&str>, name: &str) -> bool {
        self.name == name && self.prefix.as_deref() == prefix
    }

    /// Get an attribute value by qualified name (`"href"` or `"xlink:href"`).
    pub fn get_attribute(&self, qualified_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.qualified_name() == qualified_name)
            .map(|a| a.value.as_str())
    }

    /// Set (or replace) an attribute by qualified name.
    pub fn set_attribute(&mut self, qualified_name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.qualified_name() == qualified_name)
        {
            Some(attr) => attr.value = value,
            None => {
                let (name, prefix) = split_qualified(qualified_name);
                self.attributes.push(XmlAttribute {
                    name,
                    prefix,
                    value,
                });
            }
        }
    }

    /// Append a child node.
    pub fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    /// Check if this element has child elements.
    pub fn has_elements(&self) -> bool {
        self.children
            .iter()
            .any(|c| matches!(c, XmlNode::Element(_)))
    }

    /// Check if this element has no children at all.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Get child elements by local name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.elements().filter(|e| e.name == name).collect()
    }

    /// Iterate over child elements (ignoring text and comments).
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Iterate mutably over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of the direct text children.
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text of all descendant text nodes, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// The last child, if it is a comment.
    pub fn trailing_comment(&self) -> Option<&str> {
        match self.children.last() {
            Some(XmlNode::Comment(c)) => Some(c),
            _ => None,
        }
    }

    /// Merge runs of adjacent text children into single text nodes.
    ///
    /// Applied recursively. Empty text nodes are removed.
    pub fn normalize_text(&mut self) {
        let children = std::mem::take(&mut self.children);
        for child in children {
            match child {
                XmlNode::Text(t) if t.is_empty() => {}
                XmlNode::Text(t) => match self.children.last_mut() {
                    Some(XmlNode::Text(prev)) => prev.push_str(&t),
                    _ => self.children.push(XmlNode::Text(t)),
                },
                XmlNode::Element(mut e) => {
                    e.normalize_text();
                    self.children.push(XmlNode::Element(e));
                }
                other => self.children.push(other),
            }
        }
    }
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(e) => collect_text(e, out),
            XmlNode::Comment(_) => {}
        }
    }
}

impl XmlAttribute {
    /// Create a new attribute from a possibly prefixed name.
    pub fn new(qualified_name: &str, value: impl Into<String>) -> Self {
        let (name, prefix) = split_qualified(qualified_name);
        Self {
            name,
            prefix,
            value: value.into(),
        }
    }

    /// The qualified name (`prefix:name` or `name`).
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(element: XmlElement) -> Self {
        XmlNode::Element(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_get_attribute() {
        let element = XmlElement::new("test").with_attribute("name", "value");

        assert_eq!(element.get_attribute("name"), Some("value"));
        assert_eq!(element.get_attribute("missing"), None);
    }

    #[test]
    fn test_prefixed_names() {
        let element = XmlElement::new("xsl:value-of").with_attribute("xlink:href", "#a");

        assert_eq!(element.name, "value-of");
        assert_eq!(element.prefix.as_deref(), Some("xsl"));
        assert!(element.is(Some("xsl"), "value-of"));
        assert!(!element.is(None, "value-of"));
        assert_eq!(element.qualified_name(), "xsl:value-of");
        assert_eq!(element.get_attribute("xlink:href"), Some("#a"));
        assert_eq!(element.get_attribute("href"), None);
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut element = XmlElement::new("p").with_attribute("class", "a");
        element.set_attribute("class", "b");

        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.get_attribute("class"), Some("b"));
    }

    #[test]
    fn test_element_children() {
        let parent = XmlElement::new("parent")
            .with_text("lead ")
            .with_child(XmlElement::new("child").into())
            .with_child(XmlElement::new("other").into());

        assert!(parent.has_elements());
        assert_eq!(parent.elements().count(), 2);
        assert_eq!(parent.get_children("child").len(), 1);
        assert_eq!(parent.own_text(), "lead ");
    }

    #[test]
    fn test_text_content_is_recursive() {
        let element = XmlElement::new("p")
            .with_text("Hello ")
            .with_child(XmlElement::new("b").with_text("big").into())
            .with_child(XmlNode::Comment("ignored".to_string()))
            .with_text(" world");

        assert_eq!(element.text_content(), "Hello big world");
    }

    #[test]
    fn test_normalize_text_merges_runs() {
        let mut element = XmlElement::new("p")
            .with_text("a")
            .with_text("")
            .with_text("b")
            .with_child(XmlElement::new("i").with_text("x").with_text("y").into())
            .with_text("c");
        element.normalize_text();

        assert_eq!(element.children.len(), 3);
        assert_eq!(element.children[0], XmlNode::Text("ab".to_string()));
        assert_eq!(
            element.get_children("i")[0].children,
            vec![XmlNode::Text("xy".to_string())]
        );
    }

    #[test]
    fn test_trailing_comment() {
        let element = XmlElement::new("root")
            .with_child(XmlElement::new("a").into())
            .with_child(XmlNode::Comment("meta".to_string()));
        assert_eq!(element.trailing_comment(), Some("meta"));

        let element = XmlElement::new("root").with_text("x");
        assert_eq!(element.trailing_comment(), None);
    }
}
