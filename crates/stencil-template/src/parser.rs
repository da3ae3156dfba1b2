/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder parser.
//!
//! [`PlaceholderParser`] pulls tokens from a [`Lexer`] and yields one
//! [`Placeholder`] per call, skipping literal text. Grammar:
//!
//! ```text
//! placeholder := segment ('.' segment)*
//! segment     := identifier                  -- path segment, only before any call
//!              | identifier '(' args? ')'    -- function call
//! args        := arg (',' arg)*
//! arg         := string | identifier ('.' identifier)*
//! ```

use crate::ast::{Argument, FunctionCall, Placeholder};
use crate::config::Delimiters;
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// Lazy, finite sequence of the placeholders in one text fragment.
///
/// `next_placeholder` returns `Ok(None)` once the fragment is exhausted;
/// [`reset`](Self::reset) starts over from the beginning.
#[derive(Debug, Clone)]
pub struct PlaceholderParser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    failed: bool,
}

impl<'a> PlaceholderParser<'a> {
    pub fn new(input: &'a str, delimiters: &'a Delimiters) -> Self {
        Self {
            lexer: Lexer::new(input, delimiters),
            peeked: None,
            failed: false,
        }
    }

    /// Restart from the beginning of the fragment.
    pub fn reset(&mut self) {
        self.lexer.reset();
        self.peeked = None;
        self.failed = false;
    }

    /// Parse the next placeholder, or return `None` when there are no more.
    pub fn next_placeholder(&mut self) -> TemplateResult<Option<Placeholder>> {
        loop {
            match self.advance()? {
                None => return Ok(None),
                Some(token) => match token.kind {
                    TokenKind::Literal => continue,
                    TokenKind::Open => return self.parse_placeholder(token.position).map(Some),
                    _ => return Err(unexpected(&token, "placeholder")),
                },
            }
        }
    }

    fn advance(&mut self) -> TemplateResult<Option<Token>> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.lexer.next_token(),
        }
    }

    fn peek_kind(&mut self) -> TemplateResult<Option<TokenKind>> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token()?;
        }
        Ok(self.peeked.as_ref().map(|t| t.kind))
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> TemplateResult<Token> {
        match self.advance()? {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(unexpected(&token, expected)),
            None => Err(self.end_of_input(expected)),
        }
    }

    fn end_of_input(&self, expected: &str) -> TemplateError {
        TemplateError::Parse {
            message: format!("expected {}, found end of input", expected),
            offset: self.lexer.position(),
        }
    }

    fn parse_placeholder(&mut self, open_at: usize) -> TemplateResult<Placeholder> {
        if self.peek_kind()? == Some(TokenKind::Close) {
            return Err(TemplateError::Parse {
                message: "empty placeholder".to_string(),
                offset: open_at,
            });
        }

        let mut path = Vec::new();
        let mut functions = Vec::new();

        loop {
            let ident = self.expect(TokenKind::Identifier, "identifier")?;

            if self.peek_kind()? == Some(TokenKind::ParenOpen) {
                self.advance()?;
                let arguments = self.parse_arguments()?;
                functions.push(FunctionCall {
                    name: ident.text,
                    arguments,
                    position: ident.position,
                });
            } else if !functions.is_empty() {
                return Err(TemplateError::Parse {
                    message: format!(
                        "path segment '{}' after a function call (missing parentheses?)",
                        ident.text
                    ),
                    offset: ident.position,
                });
            } else {
                path.push(ident.text);
            }

            match self.advance()? {
                Some(token) if token.kind == TokenKind::Dot => continue,
                Some(token) if token.kind == TokenKind::Close => {
                    return Ok(Placeholder {
                        path,
                        functions,
                        span: open_at..token.position + token.text.len(),
                    });
                }
                Some(token) => {
                    return Err(unexpected(&token, "'.' or the close delimiter"));
                }
                None => return Err(self.end_of_input("the close delimiter")),
            }
        }
    }

    fn parse_arguments(&mut self) -> TemplateResult<Vec<Argument>> {
        let mut arguments = Vec::new();
        if self.peek_kind()? == Some(TokenKind::ParenClose) {
            self.advance()?;
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_argument()?);
            match self.advance()? {
                Some(token) if token.kind == TokenKind::Comma => continue,
                Some(token) if token.kind == TokenKind::ParenClose => return Ok(arguments),
                Some(token) => return Err(unexpected(&token, "',' or ')'")),
                None => return Err(self.end_of_input("')'")),
            }
        }
    }

    fn parse_argument(&mut self) -> TemplateResult<Argument> {
        match self.advance()? {
            Some(token) if token.kind == TokenKind::StringLiteral => {
                Ok(Argument::String(token.text))
            }
            Some(token) if token.kind == TokenKind::Identifier => {
                let mut path = vec![token.text];
                while self.peek_kind()? == Some(TokenKind::Dot) {
                    self.advance()?;
                    path.push(self.expect(TokenKind::Identifier, "identifier")?.text);
                }
                Ok(Argument::Path(path))
            }
            Some(token) => Err(unexpected(&token, "an argument")),
            None => Err(self.end_of_input("an argument")),
        }
    }
}

impl Iterator for PlaceholderParser<'_> {
    type Item = TemplateResult<Placeholder>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_placeholder() {
            Ok(Some(placeholder)) => Some(Ok(placeholder)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn unexpected(token: &Token, expected: &str) -> TemplateError {
    TemplateError::Parse {
        message: format!("expected {}, found '{}'", expected, token.text),
        offset: token.position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_all(text: &str) -> TemplateResult<Vec<Placeholder>> {
        let delimiters = Delimiters::default();
        PlaceholderParser::new(text, &delimiters).collect()
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bare_path() {
        let placeholders = parse_all("Hello [[user.name]]!").unwrap();
        assert_eq!(
            placeholders,
            vec![Placeholder {
                path: path(&["user", "name"]),
                functions: vec![],
                span: 6..19,
            }]
        );
    }

    #[test]
    fn test_multiple_in_order() {
        let placeholders = parse_all("[[a]] and [[b.c]][[d]]").unwrap();
        let paths: Vec<_> = placeholders.iter().map(|p| p.dotted_path()).collect();
        assert_eq!(paths, vec!["a", "b.c", "d"]);
        assert_eq!(placeholders[1].span, 10..17);
        assert_eq!(placeholders[2].span, 17..22);
    }

    #[test]
    fn test_chained_functions() {
        let placeholders = parse_all(r#"[[items.each().default("x", other.path)]]"#).unwrap();
        let p = &placeholders[0];
        assert_eq!(p.path, path(&["items"]));
        assert_eq!(p.functions.len(), 2);
        assert_eq!(p.functions[0].name, "each");
        assert!(p.functions[0].arguments.is_empty());
        assert_eq!(p.functions[1].name, "default");
        assert_eq!(
            p.functions[1].arguments,
            vec![
                Argument::String("x".to_string()),
                Argument::Path(path(&["other", "path"])),
            ]
        );
    }

    #[test]
    fn test_function_with_empty_path() {
        let placeholders = parse_all("[[if(user.active)]]").unwrap();
        assert!(placeholders[0].path.is_empty());
        assert_eq!(placeholders[0].functions[0].name, "if");
        assert_eq!(placeholders[0].functions[0].position, 2);
    }

    #[test]
    fn test_no_placeholders_is_end_not_error() {
        let delimiters = Delimiters::default();
        let mut parser = PlaceholderParser::new("just text", &delimiters);
        assert_eq!(parser.next_placeholder().unwrap(), None);
        assert_eq!(parser.next_placeholder().unwrap(), None);
    }

    #[test]
    fn test_reset() {
        let delimiters = Delimiters::default();
        let mut parser = PlaceholderParser::new("[[a]] [[b]]", &delimiters);
        assert_eq!(parser.next_placeholder().unwrap().unwrap().path, path(&["a"]));
        assert_eq!(parser.next_placeholder().unwrap().unwrap().path, path(&["b"]));
        assert_eq!(parser.next_placeholder().unwrap(), None);

        parser.reset();
        assert_eq!(parser.next_placeholder().unwrap().unwrap().path, path(&["a"]));
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("[[]]", 0),
            ("[[a.]]", 4),
            ("[[.a]]", 2),
            ("[[a)]]", 3),
            ("[[a.f(]]", 6),
            ("[[a.f(x]]", 7),
            ("[[a.f().b]]", 8),
            ("[[a b]]", 4),
        ];
        for (text, offset) in cases {
            match parse_all(text) {
                Err(TemplateError::Parse { offset: got, .. }) => {
                    assert_eq!(got, offset, "offset for {text}")
                }
                other => panic!("expected parse error for {text}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_lex_errors_propagate() {
        let err = parse_all("Hello [[user.name!").unwrap_err();
        assert!(matches!(err, TemplateError::Lex { offset: 6, .. }));
    }

    #[test]
    fn test_iterator_fuses_after_error() {
        let delimiters = Delimiters::default();
        let mut parser = PlaceholderParser::new("[[a]] [[]] [[b]]", &delimiters);
        assert!(parser.next().unwrap().is_ok());
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }
}
