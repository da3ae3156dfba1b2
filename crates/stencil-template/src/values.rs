/*
 * values.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Value trees supplied at render time.
//!
//! A [`Value`] is what a caller hands to [`crate::Renderer::render`]. It is
//! usually built from JSON or YAML through serde, and is encoded into a values
//! document by [`crate::encoder::encode_values`].

use crate::error::{TemplateError, TemplateResult};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A value that placeholders can refer to.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum Value {
    /// A string value.
    String(String),

    /// A boolean value.
    Bool(bool),

    /// A number, kept as written.
    Number(serde_json::Number),

    /// A list of values.
    List(Vec<Value>),

    /// A map of string keys to values. Keys iterate in sorted order.
    Map(BTreeMap<String, Value>),

    /// A null/missing value.
    #[default]
    Null,
}

impl Value {
    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> TemplateResult<Self> {
        serde_json::from_str(source).map_err(|e| TemplateError::InvalidValues {
            message: e.to_string(),
        })
    }

    /// Build a map from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Text of a scalar value; `None` for lists, maps, `false` and null.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Bool(true) => Some("true".to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(false) | Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
