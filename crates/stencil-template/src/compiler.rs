/*
 * compiler.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compilation of template documents into transform programs.
//!
//! The compiler walks the document once, top down. In every element selected
//! by the document's node query, the text children containing placeholders
//! are split at each occurrence: plain value references become
//! `xsl:value-of`, function calls are handed to their expressions. Wrappers
//! requested by expressions are applied around the element after its
//! descendants have been compiled.

use crate::ast::Placeholder;
use crate::config::Delimiters;
use crate::document::TemplateDocument;
use crate::error::{TemplateError, TemplateResult};
use crate::escape::escape_attribute_braces;
use crate::expression::{ExpressionTarget, LoopScope};
use crate::instructions::{self, is_any_instruction};
use crate::parser::PlaceholderParser;
use crate::query::NodeQuery;
use stencil_xml::{XmlDocument, XmlElement, XmlNode};

/// Result of a successful [`Compiler::compile`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The document was raw source and has been rewritten in place.
    Compiled { placeholders: usize },
    /// The document already was a program and was left untouched.
    AlreadyCompiled,
}

/// Turns source documents into programs.
pub struct Compiler<'a> {
    delimiters: &'a Delimiters,
    document: &'a dyn TemplateDocument,
}

impl<'a> Compiler<'a> {
    pub fn new(delimiters: &'a Delimiters, document: &'a dyn TemplateDocument) -> Self {
        Self {
            delimiters,
            document,
        }
    }

    /// Compile `doc` in place.
    ///
    /// Compilation is all or nothing: on error `doc` is unchanged.
    pub fn compile(&self, doc: &mut XmlDocument) -> TemplateResult<CompileOutcome> {
        if instructions::is_compiled(doc) {
            tracing::debug!(identity = self.document.identity(), "already compiled");
            return Ok(CompileOutcome::AlreadyCompiled);
        }

        let query = NodeQuery::parse(self.document.node_selection_query())?;
        let mut source = doc.clone();
        self.document.cleanup(&mut source);
        escape_attribute_braces(&mut source.root);

        let mut placeholders = 0;
        let body = self.compile_element(source.root, &query, &LoopScope::new(), &mut placeholders)?;
        doc.root = instructions::stylesheet(body);

        tracing::debug!(
            identity = self.document.identity(),
            placeholders,
            "compiled document"
        );
        Ok(CompileOutcome::Compiled { placeholders })
    }

    fn compile_element(
        &self,
        mut element: XmlElement,
        query: &NodeQuery,
        outer: &LoopScope,
        placeholders: &mut usize,
    ) -> TemplateResult<XmlNode> {
        let mut scope = outer.clone();
        let mut wrappers = Vec::new();

        if query.matches(&element) {
            let children = std::mem::take(&mut element.children);
            for child in children {
                match child {
                    XmlNode::Text(text) if self.delimiters.marks(&text) => {
                        let nodes = self
                            .compile_text(&text, outer, &mut scope, &mut wrappers, placeholders)
                            .map_err(|e| in_fragment(e, &text))?;
                        element.children.extend(nodes);
                    }
                    other => element.children.push(other),
                }
            }
        }

        let children = std::mem::take(&mut element.children);
        for child in children {
            match child {
                XmlNode::Element(e) if !is_any_instruction(&e) => {
                    let compiled = self.compile_element(e, query, &scope, placeholders)?;
                    element.children.push(compiled);
                }
                other => element.children.push(other),
            }
        }

        Ok(instructions::wrap_all(wrappers, XmlNode::Element(element)))
    }

    fn compile_text(
        &self,
        text: &str,
        outer: &LoopScope,
        scope: &mut LoopScope,
        wrappers: &mut Vec<XmlElement>,
        placeholders: &mut usize,
    ) -> TemplateResult<Vec<XmlNode>> {
        let mut parser = PlaceholderParser::new(text, self.delimiters);
        let mut nodes = Vec::new();
        let mut cursor = 0;

        while let Some(placeholder) = parser.next_placeholder()? {
            if placeholder.span.start > cursor {
                nodes.push(XmlNode::Text(text[cursor..placeholder.span.start].to_string()));
            }
            nodes.extend(self.apply(&placeholder, outer, scope, wrappers)?);
            cursor = placeholder.span.end;
            *placeholders += 1;
        }
        if cursor < text.len() {
            nodes.push(XmlNode::Text(text[cursor..].to_string()));
        }
        Ok(nodes)
    }

    fn apply(
        &self,
        placeholder: &Placeholder,
        outer: &LoopScope,
        scope: &mut LoopScope,
        wrappers: &mut Vec<XmlElement>,
    ) -> TemplateResult<Vec<XmlNode>> {
        if placeholder.is_value_accessor() {
            let select = scope.select_for(&placeholder.path);
            return Ok(vec![instructions::value_of(&select).into()]);
        }

        let mut target = ExpressionTarget::new(placeholder, outer, scope, wrappers);
        for call in &placeholder.functions {
            let expression = self
                .document
                .resolve_expression(&call.name, placeholder)
                .ok_or_else(|| TemplateError::UnknownFunction {
                    name: call.name.clone(),
                })?;
            tracing::trace!(function = %call, "applying expression");
            expression.execute(call, &mut target)?;
        }
        Ok(target.into_inline())
    }
}

/// Attach the offending text to syntax errors.
fn in_fragment(err: TemplateError, text: &str) -> TemplateError {
    const MAX_EXCERPT: usize = 60;
    let excerpt: String = text.chars().take(MAX_EXCERPT).collect();
    let ellipsis = if excerpt.len() < text.len() { "..." } else { "" };
    match err {
        TemplateError::Lex { message, offset } => TemplateError::Lex {
            message: format!("{} in {:?}{}", message, excerpt, ellipsis),
            offset,
        },
        TemplateError::Parse { message, offset } => TemplateError::Parse {
            message: format!("{} in {:?}{}", message, excerpt, ellipsis),
            offset,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::ast::FunctionCall;
    use crate::expression::ExpressionRegistry;
    use pretty_assertions::assert_eq;
    use stencil_xml::{element_to_string, parse};

    fn compile(markup: &str) -> TemplateResult<(String, CompileOutcome)> {
        compile_with(&MemoryDocument::new("t", markup), markup)
    }

    fn compile_with(document: &MemoryDocument, markup: &str) -> TemplateResult<(String, CompileOutcome)> {
        let delimiters = Delimiters::default();
        let mut doc = parse(markup).unwrap();
        let outcome = Compiler::new(&delimiters, document).compile(&mut doc)?;
        Ok((body(&doc), outcome))
    }

    /// Serialized content of the root template.
    fn body(doc: &XmlDocument) -> String {
        let template = instructions::root_template(&doc.root).unwrap();
        template
            .elements()
            .map(element_to_string)
            .collect::<Vec<_>>()
            .join("")
    }

    #[test]
    fn test_value_accessor() {
        let (body, outcome) = compile("<doc><p>Hello [[user.name]]!</p></doc>").unwrap();
        assert_eq!(
            body,
            r#"<doc><p>Hello <xsl:value-of select="/values/user/name"/>!</p></doc>"#
        );
        assert_eq!(outcome, CompileOutcome::Compiled { placeholders: 1 });
    }

    #[test]
    fn test_program_snapshot() {
        let mut doc = parse("<p>[[name.default(\"anon\")]]</p>").unwrap();
        let document = MemoryDocument::new("t", "");
        Compiler::new(&Delimiters::default(), &document)
            .compile(&mut doc)
            .unwrap();
        insta::assert_snapshot!(stencil_xml::to_string(&doc), @r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><xsl:template match="/"><p><xsl:choose><xsl:when test="/values/name"><xsl:value-of select="/values/name"/></xsl:when><xsl:otherwise><xsl:text>anon</xsl:text></xsl:otherwise></xsl:choose></p></xsl:template></xsl:stylesheet>"#);
    }

    #[test]
    fn test_no_placeholders_still_compiles() {
        let (body, outcome) = compile(r#"<doc a="{x}"><p>plain</p></doc>"#).unwrap();
        assert_eq!(body, r#"<doc a="{{x}}"><p>plain</p></doc>"#);
        assert_eq!(outcome, CompileOutcome::Compiled { placeholders: 0 });
    }

    #[test]
    fn test_conditional_wraps_element() {
        let (body, _) = compile("<doc><p>[[if(user.active)]]Welcome</p><p>bye</p></doc>").unwrap();
        assert_eq!(
            body,
            r#"<doc><xsl:if test="/values/user/active"><p>Welcome</p></xsl:if><p>bye</p></doc>"#
        );
    }

    #[test]
    fn test_each_scopes_descendants() {
        let (body, _) =
            compile("<ul><li>[[items.each()]]<b>[[items.title]]</b> [[user.name]]</li></ul>")
                .unwrap();
        assert_eq!(
            body,
            concat!(
                r#"<ul><xsl:for-each select="/values/items"><li><b><xsl:value-of select="title"/></b> "#,
                r#"<xsl:value-of select="/values/user/name"/></li></xsl:for-each></ul>"#
            )
        );
    }

    #[test]
    fn test_loop_scope_does_not_leak_to_siblings() {
        let (body, _) =
            compile("<doc><p>[[items.each()]][[items]]</p><p>[[items]]</p></doc>").unwrap();
        assert_eq!(
            body,
            concat!(
                r#"<doc><xsl:for-each select="/values/items"><p><xsl:value-of select="."/></p></xsl:for-each>"#,
                r#"<p><xsl:value-of select="/values/items"/></p></doc>"#
            )
        );
    }

    #[test]
    fn test_chained_wrappers_nest_in_declared_order() {
        let (body, _) = compile("<doc><p>[[items.each().if()]]x</p></doc>").unwrap();
        assert_eq!(
            body,
            r#"<doc><xsl:if test="/values/items"><xsl:for-each select="/values/items"><p>x</p></xsl:for-each></xsl:if></doc>"#
        );
    }

    #[test]
    fn test_already_compiled_is_untouched() {
        let (first, _) = compile("<doc>[[a]]</doc>").unwrap();
        let delimiters = Delimiters::default();
        let document = MemoryDocument::new("t", "");
        let mut program = parse(&format!(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="{}"><xsl:template match="/">{}</xsl:template></xsl:stylesheet>"#,
            instructions::XSL_NAMESPACE,
            first
        ))
        .unwrap();
        let before = program.clone();

        let outcome = Compiler::new(&delimiters, &document)
            .compile(&mut program)
            .unwrap();
        assert_eq!(outcome, CompileOutcome::AlreadyCompiled);
        assert_eq!(program, before);
    }

    #[test]
    fn test_unknown_function_aborts() {
        let markup = "<doc><p>[[a]]</p><p>[[b.shout()]]</p></doc>";
        let delimiters = Delimiters::default();
        let document = MemoryDocument::new("t", markup);
        let mut doc = parse(markup).unwrap();
        let before = doc.clone();

        let err = Compiler::new(&delimiters, &document)
            .compile(&mut doc)
            .unwrap_err();
        assert!(matches!(err, TemplateError::UnknownFunction { ref name } if name == "shout"));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_malformed_placeholder_aborts() {
        let err = compile("<doc><p>[[a]]</p><p>[[user.]]</p></doc>").unwrap_err();
        match err {
            TemplateError::Parse { message, offset } => {
                assert_eq!(offset, 7);
                assert!(message.contains("[[user.]]"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_node_query_limits_compilation() {
        let markup = "<doc><title>[[a]]</title><p>[[b]]</p></doc>";
        let document = MemoryDocument::new("t", markup).with_query("//p");
        let (body, outcome) = compile_with(&document, markup).unwrap();
        assert_eq!(
            body,
            r#"<doc><title>[[a]]</title><p><xsl:value-of select="/values/b"/></p></doc>"#
        );
        assert_eq!(outcome, CompileOutcome::Compiled { placeholders: 1 });
    }

    #[test]
    fn test_custom_expression() {
        let markup = "<doc><p>[[name.upper()]]</p></doc>";
        let mut registry = ExpressionRegistry::with_builtins();
        registry.register(
            "upper",
            |_call: &FunctionCall, target: &mut ExpressionTarget<'_>| -> TemplateResult<()> {
                let select = target.select(&target.placeholder().path);
                let expr = format!("translate({}, 'abc', 'ABC')", select);
                target.emit(instructions::value_of(&expr));
                Ok(())
            },
        );
        let document = MemoryDocument::new("t", markup).with_expressions(registry);
        let (body, _) = compile_with(&document, markup).unwrap();
        assert_eq!(
            body,
            r#"<doc><p><xsl:value-of select="translate(/values/name, 'abc', 'ABC')"/></p></doc>"#
        );
    }

    #[test]
    fn test_cdata_is_folded_into_text() {
        let (body, _) = compile("<doc>[[<![CDATA[a]]>]]</doc>").unwrap();
        assert_eq!(body, r#"<doc><xsl:value-of select="/values/a"/></doc>"#);
    }
}
