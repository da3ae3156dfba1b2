/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compiled-program cache.
//!
//! Programs live at `<cache_dir>/<identity>/<content_path>`, next to nothing
//! else: the cached file starts out as the extracted source and is rewritten
//! in place once compiled. The trailing comment of the program root records
//! when it was compiled and from which source hash.

use crate::comment::Metadata;
use crate::compiler::{CompileOutcome, Compiler};
use crate::config::{Delimiters, RenderConfig};
use crate::document::TemplateDocument;
use crate::error::{TemplateError, TemplateResult};
use crate::instructions::is_compiled;
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use stencil_xml::{XmlDocument, XmlNode};

/// A program ready to run.
#[derive(Debug, Clone)]
pub struct CachedProgram {
    /// Location of the artifact.
    pub path: PathBuf,
    /// The program as reloaded from `path`.
    pub program: XmlDocument,
    /// Whether this call compiled the program.
    pub regenerated: bool,
}

/// Decides whether cached programs can be reused.
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
    delimiters: Delimiters,
    debug: bool,
    track_documents: bool,
}

impl CacheManager {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            delimiters: config.delimiters.clone(),
            debug: config.debug,
            track_documents: config.track_documents,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the artifact for `document` lives.
    pub fn artifact_path(&self, document: &dyn TemplateDocument) -> PathBuf {
        document.cache_path(&self.cache_dir)
    }

    /// Load the program for `document`, compiling it if needed.
    pub fn load(&self, document: &dyn TemplateDocument) -> TemplateResult<CachedProgram> {
        let force = self.needs_regeneration(document)?;
        let path = document.extract(&self.cache_dir, force)?;

        let mut doc = read_artifact(&path)?;
        if is_compiled(&doc) {
            tracing::debug!(identity = document.identity(), path = %path.display(), "reusing compiled program");
            return Ok(CachedProgram {
                path,
                program: doc,
                regenerated: false,
            });
        }

        let outcome = Compiler::new(&self.delimiters, document).compile(&mut doc)?;
        let metadata = Metadata::generated(
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            document.content_hash()?,
        );
        doc.root.push(XmlNode::Comment(metadata.encode()));
        stencil_xml::write_file(&path, &doc).map_err(|e| TemplateError::xml(&path, e))?;

        if let CompileOutcome::Compiled { placeholders } = outcome {
            tracing::info!(
                identity = document.identity(),
                path = %path.display(),
                placeholders,
                "compiled template"
            );
        }

        // Reload so that callers always see the program as persisted.
        let program = read_artifact(&path)?;
        Ok(CachedProgram {
            path,
            program,
            regenerated: true,
        })
    }

    fn needs_regeneration(&self, document: &dyn TemplateDocument) -> TemplateResult<bool> {
        let identity = document.identity();
        if self.debug {
            tracing::debug!(identity, "debug mode, regenerating");
            return Ok(true);
        }
        if !self.track_documents {
            tracing::debug!(identity, "document tracking disabled");
            return Ok(false);
        }

        let path = self.artifact_path(document);
        if !path.exists() {
            tracing::debug!(identity, "no cached artifact");
            return Ok(false);
        }

        let program = match read_artifact(&path) {
            Ok(program) => program,
            Err(TemplateError::Xml { source, .. }) => {
                tracing::debug!(identity, error = %source, "cached artifact is not valid XML");
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        let Some(recorded) = read_metadata(&program) else {
            tracing::debug!(identity, "cached artifact has no metadata");
            return Ok(true);
        };
        let Some(recorded_hash) = recorded.document_hash() else {
            tracing::debug!(identity, "cached artifact has no document hash");
            return Ok(true);
        };

        let current = document.content_hash()?;
        let stale = recorded_hash != current;
        tracing::debug!(identity, stale, "compared document hash");
        Ok(stale)
    }
}

/// Metadata recorded in a program's trailing comment.
pub fn read_metadata(program: &XmlDocument) -> Option<Metadata> {
    program.root.trailing_comment().and_then(Metadata::decode)
}

fn read_artifact(path: &Path) -> TemplateResult<XmlDocument> {
    stencil_xml::parse_file(path).map_err(|e| TemplateError::xml(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::{DOCUMENT_HASH, GENERATION_DATE};
    use crate::document::{MemoryDocument, compute_hash};
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "<doc><p>Hello [[user.name]]!</p></doc>";

    fn manager(dir: &Path) -> CacheManager {
        CacheManager::new(&RenderConfig::new(dir))
    }

    #[test]
    fn test_first_load_compiles_and_records_metadata() {
        let cache = tempfile::tempdir().unwrap();
        let document = MemoryDocument::new("greeting", SOURCE);

        let loaded = manager(cache.path()).load(&document).unwrap();
        assert!(loaded.regenerated);
        assert!(is_compiled(&loaded.program));
        assert_eq!(loaded.path, cache.path().join("greeting").join("content.xml"));

        let metadata = read_metadata(&loaded.program).unwrap();
        let expected_hash = compute_hash(SOURCE.as_bytes());
        assert_eq!(metadata.get(DOCUMENT_HASH), Some(expected_hash.as_str()));
        let date = metadata.get(GENERATION_DATE).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(date).is_ok(), "{date}");
    }

    #[test]
    fn test_unchanged_source_is_reused() {
        let cache = tempfile::tempdir().unwrap();
        let document = MemoryDocument::new("greeting", SOURCE);
        let manager = manager(cache.path());

        let first = manager.load(&document).unwrap();
        let second = manager.load(&document).unwrap();
        assert!(!second.regenerated);
        assert_eq!(first.program, second.program);
    }

    #[test]
    fn test_changed_source_is_recompiled() {
        let cache = tempfile::tempdir().unwrap();
        let mut document = MemoryDocument::new("greeting", SOURCE);
        let manager = manager(cache.path());
        manager.load(&document).unwrap();

        document.set_markup(SOURCE.replace("Hello", "Hallo"));
        let reloaded = manager.load(&document).unwrap();
        assert!(reloaded.regenerated);
        assert!(stencil_xml::to_string(&reloaded.program).contains("Hallo"));
    }

    #[test]
    fn test_untracked_cache_ignores_source_changes() {
        let cache = tempfile::tempdir().unwrap();
        let mut document = MemoryDocument::new("greeting", SOURCE);
        let manager = CacheManager::new(&RenderConfig::new(cache.path()).with_tracking(false));
        manager.load(&document).unwrap();

        document.set_markup(SOURCE.replace("Hello", "Hallo"));
        let reloaded = manager.load(&document).unwrap();
        assert!(!reloaded.regenerated);
        assert!(stencil_xml::to_string(&reloaded.program).contains("Hello"));
    }

    #[test]
    fn test_debug_always_regenerates() {
        let cache = tempfile::tempdir().unwrap();
        let document = MemoryDocument::new("greeting", SOURCE);
        let manager = CacheManager::new(
            &RenderConfig::new(cache.path())
                .with_tracking(false)
                .with_debug(true),
        );

        assert!(manager.load(&document).unwrap().regenerated);
        assert!(manager.load(&document).unwrap().regenerated);
    }

    #[test]
    fn test_stale_artifacts_are_replaced() {
        let cache = tempfile::tempdir().unwrap();
        let document = MemoryDocument::new("greeting", SOURCE);
        let manager = manager(cache.path());
        let path = manager.artifact_path(&document);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        for stale in [
            "<not-closed>",
            "<doc/>",
            "<doc><!--garbage;;--></doc>",
            "<doc><!--generation_date:2020-01-01T00:00:00Z--></doc>",
            "<doc><!--document_hash:0000--></doc>",
        ] {
            std::fs::write(&path, stale).unwrap();
            let loaded = manager.load(&document).unwrap();
            assert!(loaded.regenerated, "{stale}");
            assert!(is_compiled(&loaded.program), "{stale}");
        }
    }

    #[test]
    fn test_compile_error_leaves_source_in_cache() {
        let cache = tempfile::tempdir().unwrap();
        let document = MemoryDocument::new("broken", "<doc>Hello [[user.name!</doc>");
        let manager = manager(cache.path());

        let err = manager.load(&document).unwrap_err();
        assert!(matches!(err, TemplateError::Lex { .. }));

        let cached = std::fs::read_to_string(manager.artifact_path(&document)).unwrap();
        assert_eq!(cached, "<doc>Hello [[user.name!</doc>");
    }
}
