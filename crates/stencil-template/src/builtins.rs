/*
 * builtins.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Built-in expressions.
//!
//! | Call                  | Effect                                                      |
//! |-----------------------|-------------------------------------------------------------|
//! | `p.if()`, `if(p)`     | keep the element only when `p` selects something            |
//! | `p.unless()`          | keep the element only when `p` selects nothing              |
//! | `p.each()`            | repeat the element for each item of `p`                     |
//! | `p.raw()`             | insert the value of `p` as markup instead of text           |
//! | `p.default("x")`      | insert the value of `p`, or `x` when `p` selects nothing    |

use crate::ast::FunctionCall;
use crate::error::{TemplateError, TemplateResult};
use crate::expression::{Expression, ExpressionRegistry, ExpressionTarget};
use crate::instructions;

pub(crate) fn register(registry: &mut ExpressionRegistry) {
    registry
        .register("if", Conditional { negate: false })
        .register("unless", Conditional { negate: true })
        .register("each", Each)
        .register("raw", Raw)
        .register("default", DefaultValue);
}

/// Wraps the element in `xsl:if`.
#[derive(Debug, Clone, Copy)]
pub struct Conditional {
    pub negate: bool,
}

impl Expression for Conditional {
    fn execute(&self, call: &FunctionCall, target: &mut ExpressionTarget<'_>) -> TemplateResult<()> {
        let select = target.wrapper_select(&target.subject(call)?);
        let test = if self.negate {
            format!("not({})", select)
        } else {
            select
        };
        target.wrap(instructions::conditional(&test));
        Ok(())
    }
}

/// Wraps the element in `xsl:for-each` and opens a loop scope.
#[derive(Debug, Clone, Copy)]
pub struct Each;

impl Expression for Each {
    fn execute(&self, call: &FunctionCall, target: &mut ExpressionTarget<'_>) -> TemplateResult<()> {
        let path = target.subject(call)?;
        target.wrap(instructions::for_each(&target.wrapper_select(&path)));
        target.enter_loop(&path);
        Ok(())
    }
}

/// Emits the value unescaped.
#[derive(Debug, Clone, Copy)]
pub struct Raw;

impl Expression for Raw {
    fn execute(&self, call: &FunctionCall, target: &mut ExpressionTarget<'_>) -> TemplateResult<()> {
        let select = target.select(&target.subject(call)?);
        target.emit(instructions::raw_value_of(&select));
        Ok(())
    }
}

/// Emits the value, or a literal fallback.
#[derive(Debug, Clone, Copy)]
pub struct DefaultValue;

impl Expression for DefaultValue {
    fn execute(&self, call: &FunctionCall, target: &mut ExpressionTarget<'_>) -> TemplateResult<()> {
        let fallback = call
            .string_argument()
            .ok_or_else(|| TemplateError::InvalidArguments {
                function: call.name.clone(),
                message: "expected a string fallback, e.g. default(\"n/a\")".to_string(),
            })?;
        let select = target.select(&target.subject(call)?);
        target.emit(instructions::value_or(&select, fallback));
        Ok(())
    }
}
