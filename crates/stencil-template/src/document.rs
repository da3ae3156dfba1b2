/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template documents.
//!
//! A [`TemplateDocument`] knows where its markup comes from and how it is
//! laid out in the cache. The cache manager and compiler only talk to this
//! trait; [`XmlFileDocument`] and [`MemoryDocument`] are the bundled
//! implementations.

use crate::ast::Placeholder;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::{Expression, ExpressionRegistry};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stencil_xml::XmlDocument;

/// Query selecting every element.
pub const ALL_ELEMENTS: &str = "//*";

/// A document that can be compiled into a transform program.
pub trait TemplateDocument {
    /// Stable identifier; names the document's cache directory.
    fn identity(&self) -> &str;

    /// Location of the markup within the cache directory.
    fn content_path(&self) -> &Path;

    /// Hex SHA-256 of the current source.
    fn content_hash(&self) -> TemplateResult<String>;

    /// Write the markup to `cache_root/identity/content_path` and return that
    /// path. An existing file is only replaced when `force_overwrite` is set.
    fn extract(&self, cache_root: &Path, force_overwrite: bool) -> TemplateResult<PathBuf>;

    /// Normalize a freshly parsed document before placeholders are located.
    fn cleanup(&self, doc: &mut XmlDocument) {
        doc.root.normalize_text();
    }

    /// Which elements may carry placeholders.
    fn node_selection_query(&self) -> &str {
        ALL_ELEMENTS
    }

    /// Look up the expression for a function call.
    fn resolve_expression(
        &self,
        name: &str,
        placeholder: &Placeholder,
    ) -> Option<Arc<dyn Expression>>;

    /// Where this document's artifact lives under `cache_root`.
    fn cache_path(&self, cache_root: &Path) -> PathBuf {
        cache_root.join(self.identity()).join(self.content_path())
    }
}

/// Compute the hex SHA-256 of `content`.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Make `identity` usable as a single path component.
fn sanitize_identity(identity: &str) -> String {
    let cleaned: String = identity
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Whether an already extracted file should be kept.
fn keep_existing(target: &Path, force_overwrite: bool) -> bool {
    let keep = !force_overwrite && target.exists();
    if keep {
        tracing::debug!(path = %target.display(), "keeping extracted markup");
    }
    keep
}

fn write_extracted(target: PathBuf, content: &[u8]) -> TemplateResult<PathBuf> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TemplateError::io(parent, e))?;
    }
    std::fs::write(&target, content).map_err(|e| TemplateError::io(&target, e))?;
    tracing::debug!(path = %target.display(), "extracted markup");
    Ok(target)
}

/// A template stored as a single XML file on disk.
#[derive(Debug, Clone)]
pub struct XmlFileDocument {
    source: PathBuf,
    identity: String,
    content_path: PathBuf,
    query: String,
    expressions: ExpressionRegistry,
}

impl XmlFileDocument {
    /// Open the template at `source`. Its identity is the file stem.
    pub fn new(source: impl Into<PathBuf>) -> TemplateResult<Self> {
        let source = source.into();
        let metadata = std::fs::metadata(&source).map_err(|e| TemplateError::io(&source, e))?;
        if !metadata.is_file() {
            return Err(TemplateError::config(format!(
                "template {} is not a file",
                source.display()
            )));
        }
        let (Some(stem), Some(file_name)) = (source.file_stem(), source.file_name()) else {
            return Err(TemplateError::config(format!(
                "template {} has no file name",
                source.display()
            )));
        };

        Ok(Self {
            identity: sanitize_identity(&stem.to_string_lossy()),
            content_path: PathBuf::from(file_name),
            source,
            query: ALL_ELEMENTS.to_string(),
            expressions: ExpressionRegistry::with_builtins(),
        })
    }

    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = sanitize_identity(identity);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_expressions(mut self, expressions: ExpressionRegistry) -> Self {
        self.expressions = expressions;
        self
    }

    /// Register an additional expression.
    pub fn register(&mut self, name: &str, expression: impl Expression + 'static) -> &mut Self {
        self.expressions.register(name, expression);
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn read_source(&self) -> TemplateResult<Vec<u8>> {
        std::fs::read(&self.source).map_err(|e| TemplateError::io(&self.source, e))
    }
}

impl TemplateDocument for XmlFileDocument {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn content_path(&self) -> &Path {
        &self.content_path
    }

    fn content_hash(&self) -> TemplateResult<String> {
        Ok(compute_hash(&self.read_source()?))
    }

    fn extract(&self, cache_root: &Path, force_overwrite: bool) -> TemplateResult<PathBuf> {
        let target = self.cache_path(cache_root);
        if keep_existing(&target, force_overwrite) {
            return Ok(target);
        }
        write_extracted(target, &self.read_source()?)
    }

    fn node_selection_query(&self) -> &str {
        &self.query
    }

    fn resolve_expression(&self, name: &str, _placeholder: &Placeholder) -> Option<Arc<dyn Expression>> {
        self.expressions.get(name)
    }
}

/// A template held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    identity: String,
    markup: String,
    content_path: PathBuf,
    query: String,
    expressions: ExpressionRegistry,
}

impl MemoryDocument {
    pub fn new(identity: &str, markup: impl Into<String>) -> Self {
        Self {
            identity: sanitize_identity(identity),
            markup: markup.into(),
            content_path: PathBuf::from("content.xml"),
            query: ALL_ELEMENTS.to_string(),
            expressions: ExpressionRegistry::with_builtins(),
        }
    }

    pub fn with_content_path(mut self, content_path: impl Into<PathBuf>) -> Self {
        self.content_path = content_path.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_expressions(mut self, expressions: ExpressionRegistry) -> Self {
        self.expressions = expressions;
        self
    }

    pub fn register(&mut self, name: &str, expression: impl Expression + 'static) -> &mut Self {
        self.expressions.register(name, expression);
        self
    }

    /// Replace the markup, as an edit to the source would.
    pub fn set_markup(&mut self, markup: impl Into<String>) {
        self.markup = markup.into();
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

impl TemplateDocument for MemoryDocument {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn content_path(&self) -> &Path {
        &self.content_path
    }

    fn content_hash(&self) -> TemplateResult<String> {
        Ok(compute_hash(self.markup.as_bytes()))
    }

    fn extract(&self, cache_root: &Path, force_overwrite: bool) -> TemplateResult<PathBuf> {
        let target = self.cache_path(cache_root);
        if keep_existing(&target, force_overwrite) {
            return Ok(target);
        }
        write_extracted(target, self.markup.as_bytes())
    }

    fn node_selection_query(&self) -> &str {
        &self.query
    }

    fn resolve_expression(&self, name: &str, _placeholder: &Placeholder) -> Option<Arc<dyn Expression>> {
        self.expressions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compute_hash() {
        assert_eq!(
            compute_hash(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sanitize_identity() {
        assert_eq!(sanitize_identity("report"), "report");
        assert_eq!(sanitize_identity("a/b"), "a_b");
        assert_eq!(sanitize_identity(".."), "_");
        assert_eq!(sanitize_identity(""), "_");
    }

    #[test]
    fn test_memory_extract_respects_force() {
        let cache = tempfile::tempdir().unwrap();
        let mut doc = MemoryDocument::new("letter", "<a/>");

        let path = doc.extract(cache.path(), false).unwrap();
        assert_eq!(path, cache.path().join("letter").join("content.xml"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<a/>");

        doc.set_markup("<b/>");
        doc.extract(cache.path(), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<a/>");

        doc.extract(cache.path(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<b/>");
    }

    #[test]
    fn test_file_document() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("invoice.xml");
        std::fs::write(&source, "<invoice/>").unwrap();

        let doc = XmlFileDocument::new(&source).unwrap();
        assert_eq!(doc.identity(), "invoice");
        assert_eq!(doc.content_path(), Path::new("invoice.xml"));
        assert_eq!(doc.content_hash().unwrap(), compute_hash(b"<invoice/>"));
        assert!(doc.resolve_expression("each", &placeholder()).is_some());
        assert!(doc.resolve_expression("nope", &placeholder()).is_none());

        let cache = dir.path().join("cache");
        let extracted = doc.extract(&cache, false).unwrap();
        assert_eq!(std::fs::read_to_string(extracted).unwrap(), "<invoice/>");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = XmlFileDocument::new(dir.path().join("missing.xml")).unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));

        let err = XmlFileDocument::new(dir.path()).unwrap_err();
        assert!(matches!(err, TemplateError::Config { .. }));
    }

    fn placeholder() -> Placeholder {
        Placeholder {
            path: vec![],
            functions: vec![],
            span: 0..0,
        }
    }
}
