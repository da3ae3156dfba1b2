/*
 * comment.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Cache metadata stored as a trailing comment of compiled programs.
//!
//! The encoding is `key:value;key:value` with keys sorted. Values are
//! percent-escaped where needed so the result is always valid comment
//! content: `%` → `%25`, `;` → `%3B`, and a `-` that is followed by another
//! `-` or ends the value → `%2D`.

use crate::error::{TemplateError, TemplateResult};
use std::collections::BTreeMap;

/// RFC 3339 timestamp of when the program was compiled.
pub const GENERATION_DATE: &str = "generation_date";

/// Hex SHA-256 of the source the program was compiled from.
pub const DOCUMENT_HASH: &str = "document_hash";

/// Key/value metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a freshly compiled program.
    pub fn generated(generation_date: impl Into<String>, document_hash: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(GENERATION_DATE.to_string(), generation_date.into());
        entries.insert(DOCUMENT_HASH.to_string(), document_hash.into());
        Self { entries }
    }

    /// Insert an entry. Keys are restricted to `[A-Za-z0-9_]+`.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> TemplateResult<()> {
        if !is_key(key) {
            return Err(TemplateError::InvalidMetadataKey {
                key: key.to_string(),
            });
        }
        self.entries.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn generation_date(&self) -> Option<&str> {
        self.get(GENERATION_DATE)
    }

    pub fn document_hash(&self) -> Option<&str> {
        self.get(DOCUMENT_HASH)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as comment content.
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}:{}", key, escape_value(value)))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Decode comment content; `None` if it is not metadata.
    pub fn decode(comment: &str) -> Option<Self> {
        let mut entries = BTreeMap::new();
        if comment.is_empty() {
            return Some(Self { entries });
        }
        for entry in comment.split(';') {
            let (key, value) = entry.split_once(':')?;
            if !is_key(key) {
                return None;
            }
            entries.insert(key.to_string(), unescape_value(value)?);
        }
        Some(Self { entries })
    }
}

fn is_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str("%25"),
            ';' => out.push_str("%3B"),
            '-' if matches!(chars.peek(), None | Some('-')) => out.push_str("%2D"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_value(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() != 2 {
                return None;
            }
            let byte = u8::from_str_radix(&hex, 16).ok()?;
            if !byte.is_ascii() {
                return None;
            }
            out.push(char::from(byte));
        } else if c == ';' {
            return None;
        } else {
            out.push(c);
        }
    }
    Some(out)
}
