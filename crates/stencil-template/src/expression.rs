/*
 * expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expressions: named transformations applied by placeholder function calls.
//!
//! An [`Expression`] receives the call and an [`ExpressionTarget`] describing
//! where the placeholder sits. It may emit nodes in place of the placeholder
//! text, wrap the enclosing element in an instruction, or open a loop scope
//! for the rest of the element.

use crate::ast::{FunctionCall, Placeholder};
use crate::builtins;
use crate::error::{TemplateError, TemplateResult};
use crate::instructions::{VALUES_ROOT, values_select};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stencil_xml::{XmlElement, XmlNode};

/// A transformation bound to a function name.
pub trait Expression: Send + Sync {
    /// Apply the call to `target`.
    fn execute(&self, call: &FunctionCall, target: &mut ExpressionTarget<'_>) -> TemplateResult<()>;
}

impl<F> Expression for F
where
    F: Fn(&FunctionCall, &mut ExpressionTarget<'_>) -> TemplateResult<()> + Send + Sync,
{
    fn execute(&self, call: &FunctionCall, target: &mut ExpressionTarget<'_>) -> TemplateResult<()> {
        self(call, target)
    }
}

/// Loop scopes active at some point in the document.
///
/// Each entry is the absolute step list (`["values", "items"]`) of an
/// enclosing `for-each`. Paths under an open loop are addressed relative to
/// the loop item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopScope {
    loops: Vec<Vec<String>>,
}

impl LoopScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open loops.
    pub fn depth(&self) -> usize {
        self.loops.len()
    }

    /// Open a loop over the value at `path`.
    pub fn enter(&mut self, path: &[String]) {
        self.loops.push(absolute_steps(path));
    }

    /// Select expression for the value at `path` from inside this scope.
    pub fn select_for(&self, path: &[String]) -> String {
        let Some(innermost) = self.loops.last() else {
            return values_select(path);
        };
        let target = absolute_steps(path);

        // The innermost loop that contains the target supplies the item.
        let Some(anchor) = self.loops.iter().rev().find(|l| target.starts_with(l)) else {
            return values_select(path);
        };
        // Loops over unrelated paths cannot reach back to an outer item.
        if !innermost.starts_with(anchor) {
            return values_select(path);
        }

        let common = innermost
            .iter()
            .zip(&target)
            .take_while(|(a, b)| a == b)
            .count();
        let mut steps: Vec<&str> = vec![".."; innermost.len() - common];
        steps.extend(target[common..].iter().map(String::as_str));
        if steps.is_empty() {
            ".".to_string()
        } else {
            steps.join("/")
        }
    }
}

fn absolute_steps(path: &[String]) -> Vec<String> {
    std::iter::once(VALUES_ROOT.to_string())
        .chain(path.iter().cloned())
        .collect()
}

/// What an expression may act on while compiling one placeholder.
pub struct ExpressionTarget<'a> {
    placeholder: &'a Placeholder,
    outer: &'a LoopScope,
    scope: &'a mut LoopScope,
    wrappers: &'a mut Vec<XmlElement>,
    inline: Vec<XmlNode>,
}

impl<'a> ExpressionTarget<'a> {
    /// `outer` is the scope where the enclosing element starts; `scope` is the
    /// scope at the placeholder and receives any loop the expression opens.
    pub fn new(
        placeholder: &'a Placeholder,
        outer: &'a LoopScope,
        scope: &'a mut LoopScope,
        wrappers: &'a mut Vec<XmlElement>,
    ) -> Self {
        Self {
            placeholder,
            outer,
            scope,
            wrappers,
            inline: Vec::new(),
        }
    }

    /// The placeholder being compiled.
    pub fn placeholder(&self) -> &Placeholder {
        self.placeholder
    }

    /// Select expression for `path` in emitted output, relative to any open
    /// loop.
    pub fn select(&self, path: &[String]) -> String {
        self.scope.select_for(path)
    }

    /// Select expression for `path` in a wrapper. Wrappers sit outside the
    /// element, so loops opened by the element itself do not apply.
    pub fn wrapper_select(&self, path: &[String]) -> String {
        self.outer.select_for(path)
    }

    /// The path a call operates on: its first path argument, or else the
    /// placeholder's own path.
    pub fn subject(&self, call: &FunctionCall) -> TemplateResult<Vec<String>> {
        let path = call
            .path_argument()
            .unwrap_or(self.placeholder.path.as_slice());
        if path.is_empty() {
            return Err(TemplateError::InvalidArguments {
                function: call.name.clone(),
                message: "expected a value path".to_string(),
            });
        }
        Ok(path.to_vec())
    }

    /// Emit a node in place of the placeholder text.
    pub fn emit(&mut self, node: impl Into<XmlNode>) {
        self.inline.push(node.into());
    }

    /// Wrap the enclosing element in `wrapper`. Wrappers applied earlier end
    /// up closer to the element.
    pub fn wrap(&mut self, wrapper: XmlElement) {
        self.wrappers.push(wrapper);
    }

    /// Address later placeholders of the element, and its descendants,
    /// relative to items of the value at `path`.
    pub fn enter_loop(&mut self, path: &[String]) {
        self.scope.enter(path);
    }

    pub(crate) fn into_inline(self) -> Vec<XmlNode> {
        self.inline
    }
}

/// Name → expression mapping.
#[derive(Clone, Default)]
pub struct ExpressionRegistry {
    expressions: HashMap<String, Arc<dyn Expression>>,
}

impl ExpressionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `if`, `unless`, `each`, `raw` and `default`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        registry
    }

    /// Register `expression` under `name`, replacing any earlier entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        expression: impl Expression + 'static,
    ) -> &mut Self {
        self.expressions.insert(name.into(), Arc::new(expression));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Expression>> {
        self.expressions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.expressions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.expressions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ExpressionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionRegistry")
            .field("names", &self.names())
            .finish()
    }
}
