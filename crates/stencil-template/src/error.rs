/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for compiling, caching and rendering templates.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Invalid configuration (cache directory, delimiters). Raised at setup time.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed placeholder markup found by the lexer.
    #[error("Lexical error at offset {offset}: {message}")]
    Lex { message: String, offset: usize },

    /// Placeholder tokens that do not form a valid placeholder.
    #[error("Parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    /// No expression is registered under a function name.
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    /// An expression rejected its arguments.
    #[error("Invalid arguments for function '{function}': {message}")]
    InvalidArguments { function: String, message: String },

    /// A cache artifact or source file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document or artifact is not well-formed XML.
    #[error("Invalid XML in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: stencil_xml::Error,
    },

    /// A cache metadata key outside `[A-Za-z0-9_]+`.
    #[error("Invalid metadata key: {key:?}")]
    InvalidMetadataKey { key: String },

    /// The values tree cannot be encoded.
    #[error("Invalid values: {message}")]
    InvalidValues { message: String },

    /// The transform engine rejected the program or the values document.
    #[error("Transform error: {message}")]
    Transform { message: String },
}

impl TemplateError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        TemplateError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn transform(message: impl Into<String>) -> Self {
        TemplateError::Transform {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplateError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an XML error; I/O failures keep their I/O classification.
    pub(crate) fn xml(path: impl Into<PathBuf>, source: stencil_xml::Error) -> Self {
        match source {
            stencil_xml::Error::Io { path, source } => TemplateError::Io { path, source },
            source => TemplateError::Xml {
                path: path.into(),
                source,
            },
        }
    }

    /// Whether this is a lexical or parse error in placeholder markup.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            TemplateError::Lex { .. } | TemplateError::Parse { .. }
        )
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
