/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder AST types.
//!
//! A placeholder is a dotted value path followed by zero or more chained
//! function calls: `[[user.name]]`, `[[items.each()]]`, `[[if(user.active)]]`.

use std::fmt;
use std::ops::Range;

/// A parsed placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Value path segments. Empty only when `functions` is not.
    pub path: Vec<String>,
    /// Chained function calls in declared order.
    pub functions: Vec<FunctionCall>,
    /// Byte range of the whole occurrence, delimiters included.
    pub span: Range<usize>,
}

/// A function call: `name(arg, ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Argument>,
    /// Byte offset of the function name.
    pub position: usize,
}

/// A function argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// A quoted string literal.
    String(String),
    /// A dotted value path.
    Path(Vec<String>),
}

impl Placeholder {
    /// Whether this placeholder is a plain value reference.
    pub fn is_value_accessor(&self) -> bool {
        self.functions.is_empty()
    }

    /// The path joined with dots, as written.
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

impl FunctionCall {
    /// The first argument, if it is a path.
    pub fn path_argument(&self) -> Option<&[String]> {
        self.arguments.iter().find_map(|a| match a {
            Argument::Path(p) => Some(p.as_slice()),
            Argument::String(_) => None,
        })
    }

    /// The first string literal argument.
    pub fn string_argument(&self) -> Option<&str> {
        self.arguments.iter().find_map(|a| match a {
            Argument::String(s) => Some(s.as_str()),
            Argument::Path(_) => None,
        })
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::String(s) => write!(f, "{:?}", s),
            Argument::Path(p) => write!(f, "{}", p.join(".")),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments: Vec<String> = self.path.clone();
        segments.extend(self.functions.iter().map(|call| call.to_string()));
        write!(f, "{}", segments.join("."))
    }
}
