/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Renderer configuration.
//!
//! A [`RenderConfig`] can be built in code or loaded from TOML:
//!
//! ```toml
//! cache_dir = "/var/cache/stencil"
//! delimiters = ["{{", "}}"]
//! debug = false
//! track_documents = true
//! ```

use crate::error::{TemplateError, TemplateResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The ordered open/close bracket pair that marks placeholders.
///
/// Both strings are non-empty and distinct; this is checked on construction,
/// so every `Delimiters` value in the program is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Delimiters {
    open: String,
    close: String,
}

impl Delimiters {
    /// Create a validated delimiter pair.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> TemplateResult<Self> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return Err(TemplateError::config("delimiters must not be empty"));
        }
        if open == close {
            return Err(TemplateError::config(format!(
                "open and close delimiters must differ (both are {:?})",
                open
            )));
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    /// Whether `text` may hold a placeholder, well-formed or not.
    pub fn marks(&self, text: &str) -> bool {
        text.contains(&self.open)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: "[[".to_string(),
            close: "]]".to_string(),
        }
    }
}

impl TryFrom<Vec<String>> for Delimiters {
    type Error = TemplateError;

    fn try_from(pair: Vec<String>) -> TemplateResult<Self> {
        match <[String; 2]>::try_from(pair) {
            Ok([open, close]) => Delimiters::new(open, close),
            Err(pair) => Err(TemplateError::config(format!(
                "delimiters must be exactly two strings [open, close], got {}",
                pair.len()
            ))),
        }
    }
}

impl From<Delimiters> for Vec<String> {
    fn from(delimiters: Delimiters) -> Self {
        vec![delimiters.open, delimiters.close]
    }
}

/// Configuration for a [`crate::Renderer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Root directory for compiled artifacts. Must exist and be writable.
    pub cache_dir: PathBuf,

    /// Placeholder bracket pair.
    pub delimiters: Delimiters,

    /// Always recompile, ignoring any cached artifact.
    pub debug: bool,

    /// Compare the cached artifact's content hash with the source on every render.
    pub track_documents: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".stencil-cache"),
            delimiters: Delimiters::default(),
            debug: false,
            track_documents: true,
        }
    }
}

impl RenderConfig {
    /// Default configuration with the given cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_tracking(mut self, track_documents: bool) -> Self {
        self.track_documents = track_documents;
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(source: &str) -> TemplateResult<Self> {
        toml::from_str(source).map_err(|e| TemplateError::config(e.to_string()))
    }

    /// Load a configuration from a TOML file.
    ///
    /// A relative `cache_dir` is resolved against the file's directory.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        let source =
            std::fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        let mut config = Self::from_toml_str(&source)?;
        if config.cache_dir.is_relative() {
            if let Some(base) = path.parent() {
                config.cache_dir = base.join(&config.cache_dir);
            }
        }
        Ok(config)
    }

    /// Check that the cache directory exists, is a directory and is writable.
    pub fn validate(&self) -> TemplateResult<()> {
        let metadata = std::fs::metadata(&self.cache_dir).map_err(|e| {
            TemplateError::config(format!(
                "cache directory {} is not accessible: {}",
                self.cache_dir.display(),
                e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(TemplateError::config(format!(
                "cache path {} is not a directory",
                self.cache_dir.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(TemplateError::config(format!(
                "cache directory {} is not writable",
                self.cache_dir.display()
            )));
        }
        Ok(())
    }
}
