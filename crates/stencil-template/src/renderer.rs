/*
 * renderer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering: compile or reuse the program, encode the values, run the
//! program, post-process the output.

use crate::cache::{CacheManager, CachedProgram};
use crate::config::RenderConfig;
use crate::document::TemplateDocument;
use crate::encoder::encode_values;
use crate::engine::{BuiltinEngine, TransformEngine};
use crate::error::{TemplateError, TemplateResult};
use crate::escape::unescape_attribute_braces;
use crate::values::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use stencil_xml::XmlDocument;

/// Renders template documents with values.
///
/// # Example
///
/// ```no_run
/// use stencil_template::{MemoryDocument, RenderConfig, Renderer, Value};
///
/// let renderer = Renderer::new(RenderConfig::new("/tmp/stencil-cache"))?;
/// let document = MemoryDocument::new("greeting", "<p>Hello [[user.name]]!</p>");
/// let values = Value::from_json_str(r#"{"user": {"name": "Ann"}}"#)?;
///
/// let result = renderer.render(&document, &values)?;
/// assert_eq!(result.to_xml_string(), "<p>Hello Ann!</p>");
/// # Ok::<(), stencil_template::TemplateError>(())
/// ```
#[derive(Debug)]
pub struct Renderer<E = BuiltinEngine> {
    config: RenderConfig,
    cache: CacheManager,
    engine: E,
}

impl Renderer<BuiltinEngine> {
    /// Create a renderer using the built-in engine.
    ///
    /// Fails with [`TemplateError::Config`] when the cache directory is not
    /// usable.
    pub fn new(config: RenderConfig) -> TemplateResult<Self> {
        Self::with_engine(config, BuiltinEngine)
    }
}

impl<E: TransformEngine> Renderer<E> {
    /// Create a renderer using a custom engine.
    pub fn with_engine(config: RenderConfig, engine: E) -> TemplateResult<Self> {
        config.validate()?;
        let cache = CacheManager::new(&config);
        Ok(Self {
            config,
            cache,
            engine,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Compile `document` (or reuse its cached program) without rendering.
    pub fn compile(&self, document: &dyn TemplateDocument) -> TemplateResult<CachedProgram> {
        self.cache.load(document)
    }

    /// Render `document` with `values`.
    pub fn render<'d>(
        &self,
        document: &'d dyn TemplateDocument,
        values: &Value,
    ) -> TemplateResult<RenderResult<'d>> {
        let cached = self.cache.load(document)?;
        let input = encode_values(values)?;

        let mut output = self.engine.transform(&cached.program, &input)?;
        unescape_attribute_braces(&mut output.root);

        tracing::debug!(
            identity = document.identity(),
            regenerated = cached.regenerated,
            "rendered document"
        );
        Ok(RenderResult {
            output,
            document,
            artifact: cached.path,
        })
    }
}

/// The rendered tree of one document.
pub struct RenderResult<'d> {
    output: XmlDocument,
    document: &'d dyn TemplateDocument,
    artifact: PathBuf,
}

impl<'d> RenderResult<'d> {
    pub fn output(&self) -> &XmlDocument {
        &self.output
    }

    pub fn into_output(self) -> XmlDocument {
        self.output
    }

    /// The document that was rendered.
    pub fn document(&self) -> &'d dyn TemplateDocument {
        self.document
    }

    /// The compiled program that produced this result.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Serialize the output, declaration included.
    pub fn to_xml_string(&self) -> String {
        stencil_xml::to_string(&self.output)
    }

    /// Write the serialized output to `path`.
    pub fn write_to(&self, path: &Path) -> TemplateResult<()> {
        stencil_xml::write_file(path, &self.output).map_err(|e| TemplateError::xml(path, e))
    }
}

impl fmt::Debug for RenderResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderResult")
            .field("document", &self.document.identity())
            .field("artifact", &self.artifact)
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_validates_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = Renderer::new(RenderConfig::new(&missing)).unwrap_err();
        assert!(matches!(err, TemplateError::Config { .. }));

        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            Renderer::new(RenderConfig::new(&file)),
            Err(TemplateError::Config { .. })
        ));
    }

    #[test]
    fn test_attribute_braces_survive_rendering() {
        let cache = tempfile::tempdir().unwrap();
        let renderer = Renderer::new(RenderConfig::new(cache.path())).unwrap();
        let document = MemoryDocument::new("styled", r#"<p style="{a}">[[x]]</p>"#);

        let values = Value::map([("x", "1")]);
        let result = renderer.render(&document, &values).unwrap();
        assert_eq!(result.output().root.get_attribute("style"), Some("{a}"));
        assert_eq!(result.to_xml_string(), r#"<p style="{a}">1</p>"#);
        assert_eq!(result.document().identity(), "styled");
    }

    #[test]
    fn test_raw_markup_keeps_attribute_braces() {
        let cache = tempfile::tempdir().unwrap();
        let renderer = Renderer::new(RenderConfig::new(cache.path())).unwrap();
        let document = MemoryDocument::new("raw", r#"<p class="{c}">[[h.raw()]]</p>"#);

        let values = Value::map([("h", r#"<a href="{{x}}" title="{y}">t</a>"#)]);
        let result = renderer.render(&document, &values).unwrap();
        assert_eq!(
            result.to_xml_string(),
            r#"<p class="{c}"><a href="{{x}}" title="{y}">t</a></p>"#
        );
    }

    #[test]
    fn test_custom_engine() {
        struct Echo;
        impl TransformEngine for Echo {
            fn transform(&self, _program: &XmlDocument, input: &XmlDocument) -> TemplateResult<XmlDocument> {
                Ok(input.clone())
            }
        }

        let cache = tempfile::tempdir().unwrap();
        let renderer = Renderer::with_engine(RenderConfig::new(cache.path()), Echo).unwrap();
        let document = MemoryDocument::new("echo", "<p/>");
        let result = renderer.render(&document, &Value::map([("a", "b")])).unwrap();
        assert_eq!(result.output().root.name, "values");
    }
}
