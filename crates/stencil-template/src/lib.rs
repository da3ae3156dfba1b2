/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder templates for XML documents.
//!
//! Authors mark up an ordinary XML document with placeholders:
//!
//! ```xml
//! <doc>
//!   <p>Dear [[customer.name]],</p>
//!   <p>[[if(customer.vip)]]Thank you for being a VIP.</p>
//!   <row>[[orders.each()]]<cell>[[orders.id]]</cell><cell>[[orders.total]]</cell></row>
//! </doc>
//! ```
//!
//! This crate compiles such a document once into a transform program (an
//! XSLT 1.0 stylesheet), caches the program next to a hash of its source,
//! and renders it against a tree of values:
//!
//! - [`lexer`] and [`parser`] locate placeholders in text
//!   (`[[path.fn(args)]]`, delimiters configurable)
//! - [`expression`] and [`builtins`] map function names (`if`, `unless`,
//!   `each`, `raw`, `default`) to program instructions
//! - [`compiler`] rewrites a document into a program
//! - [`cache`] decides whether a cached program can be reused, using the
//!   metadata codec in [`comment`]
//! - [`encoder`] turns a [`Value`] tree into a values document
//! - [`engine`] runs programs; [`renderer`] ties everything together
//!
//! # Example
//!
//! ```no_run
//! use stencil_template::{RenderConfig, Renderer, Value, XmlFileDocument};
//!
//! let renderer = Renderer::new(RenderConfig::new(".stencil-cache"))?;
//! let document = XmlFileDocument::new("letter.xml")?;
//! let values = Value::from_json_str(r#"{"customer": {"name": "Ann", "vip": true}}"#)?;
//!
//! renderer.render(&document, &values)?.write_to("letter.out.xml".as_ref())?;
//! # Ok::<(), stencil_template::TemplateError>(())
//! ```

pub mod ast;
pub mod builtins;
pub mod cache;
pub mod comment;
pub mod compiler;
pub mod config;
pub mod document;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod escape;
pub mod expression;
pub mod instructions;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod renderer;
pub mod values;

// Re-export main types at crate root
pub use ast::{Argument, FunctionCall, Placeholder};
pub use cache::{CacheManager, CachedProgram};
pub use comment::Metadata;
pub use compiler::{CompileOutcome, Compiler};
pub use config::{Delimiters, RenderConfig};
pub use document::{MemoryDocument, TemplateDocument, XmlFileDocument, compute_hash};
pub use encoder::encode_values;
pub use engine::{BuiltinEngine, TransformEngine};
pub use error::{TemplateError, TemplateResult};
pub use expression::{Expression, ExpressionRegistry, ExpressionTarget};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::PlaceholderParser;
pub use renderer::{RenderResult, Renderer};
pub use values::Value;
