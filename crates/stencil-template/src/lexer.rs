/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Lexer for placeholder markup.
//!
//! The lexer switches between two modes. Outside a placeholder it produces
//! [`TokenKind::Literal`] tokens carrying the text unchanged. After an open
//! delimiter it produces interior tokens (identifiers, `.`, `(`, `)`, `,`,
//! string literals) until the close delimiter. Whitespace inside a
//! placeholder is skipped.

use crate::config::Delimiters;
use crate::error::{TemplateError, TemplateResult};

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Text outside any placeholder.
    Literal,
    /// The open delimiter.
    Open,
    Identifier,
    Dot,
    ParenOpen,
    ParenClose,
    Comma,
    /// A quoted string; the token text is the unescaped content.
    StringLiteral,
    /// The close delimiter.
    Close,
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token in the lexed text.
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerMode {
    Text,
    /// Inside a placeholder opened at the given offset.
    Placeholder { open_at: usize },
}

/// Lazily tokenizes one text fragment.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    delimiters: &'a Delimiters,
    pos: usize,
    mode: LexerMode,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, delimiters: &'a Delimiters) -> Self {
        Self {
            input,
            delimiters,
            pos: 0,
            mode: LexerMode::Text,
        }
    }

    /// The text being lexed.
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Restart from the beginning of the input.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.mode = LexerMode::Text;
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Tokenize the rest of the input.
    pub fn tokenize(mut self) -> TemplateResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Return the next token, or `None` at the end of the input.
    pub fn next_token(&mut self) -> TemplateResult<Option<Token>> {
        match self.mode {
            LexerMode::Text => self.lex_text(),
            LexerMode::Placeholder { open_at } => self.lex_interior(open_at).map(Some),
        }
    }

    fn lex_text(&mut self) -> TemplateResult<Option<Token>> {
        if self.pos >= self.input.len() {
            return Ok(None);
        }

        let open = self.delimiters.open();
        let start = self.pos;

        if self.remaining().starts_with(open) {
            let after_open = start + open.len();
            if !self.input[after_open..].contains(self.delimiters.close()) {
                return Err(TemplateError::Lex {
                    message: format!(
                        "unterminated placeholder: '{}' without matching '{}'",
                        open,
                        self.delimiters.close()
                    ),
                    offset: start,
                });
            }
            self.pos = after_open;
            self.mode = LexerMode::Placeholder { open_at: start };
            return Ok(Some(self.token(TokenKind::Open, open, start)));
        }

        let end = self
            .remaining()
            .find(open)
            .map_or(self.input.len(), |rel| start + rel);
        self.pos = end;
        Ok(Some(self.token(
            TokenKind::Literal,
            &self.input[start..end],
            start,
        )))
    }

    fn lex_interior(&mut self, open_at: usize) -> TemplateResult<Token> {
        let close = self.delimiters.close();

        // The close delimiter may itself start with whitespace.
        while let Some(c) = self.peek() {
            if c.is_whitespace() && !self.remaining().starts_with(close) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        let start = self.pos;

        if self.remaining().starts_with(close) {
            self.pos += close.len();
            self.mode = LexerMode::Text;
            return Ok(self.token(TokenKind::Close, close, start));
        }

        let Some(c) = self.peek() else {
            return Err(TemplateError::Lex {
                message: format!("unterminated placeholder: missing '{}'", close),
                offset: open_at,
            });
        };

        let kind = match c {
            '.' => TokenKind::Dot,
            '(' => TokenKind::ParenOpen,
            ')' => TokenKind::ParenClose,
            ',' => TokenKind::Comma,
            '"' | '\'' => return self.lex_string(c),
            c if is_ident_start(c) => return Ok(self.lex_identifier()),
            c => {
                return Err(TemplateError::Lex {
                    message: format!("unexpected character '{}' in placeholder", c),
                    offset: start,
                });
            }
        };

        self.pos += 1;
        Ok(self.token(kind, &self.input[start..self.pos], start))
    }

    fn lex_identifier(&mut self) -> Token {
        let start = self.pos;
        let close = self.delimiters.close();
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) || self.remaining().starts_with(close) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.token(TokenKind::Identifier, &self.input[start..self.pos], start)
    }

    fn lex_string(&mut self, quote: char) -> TemplateResult<Token> {
        let start = self.pos;
        self.pos += quote.len_utf8();

        let mut value = String::new();
        let mut escaped = false;
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                return Ok(self.token(TokenKind::StringLiteral, &value, start));
            } else {
                value.push(c);
            }
        }

        Err(TemplateError::Lex {
            message: "unterminated string literal".to_string(),
            offset: start,
        })
    }

    fn token(&self, kind: TokenKind, text: &str, position: usize) -> Token {
        Token {
            kind,
            text: text.to_string(),
            position,
        }
    }
}

/// First character of an identifier.
pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Subsequent characters of an identifier.
pub fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Whether `s` is a complete identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => chars.all(is_ident_continue),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str, delimiters: &Delimiters) -> Vec<(TokenKind, String)> {
        Lexer::new(text, delimiters)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_plain_text_is_one_literal() {
        let d = Delimiters::default();
        assert_eq!(
            kinds("no placeholders ]] here", &d),
            vec![(TokenKind::Literal, "no placeholders ]] here".to_string())]
        );
        assert!(Lexer::new("", &d).tokenize().unwrap().is_empty());
    }

    #[test]
    fn test_simple_placeholder() {
        let d = Delimiters::default();
        let tokens = Lexer::new("Hello [[ user.name ]]!", &d).tokenize().unwrap();

        let summary: Vec<_> = tokens.iter().map(|t| (t.kind, t.position)).collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Literal, 0),
                (TokenKind::Open, 6),
                (TokenKind::Identifier, 9),
                (TokenKind::Dot, 13),
                (TokenKind::Identifier, 14),
                (TokenKind::Close, 19),
                (TokenKind::Literal, 21),
            ]
        );
        assert_eq!(tokens[4].text, "name");
        assert_eq!(tokens[6].text, "!");
    }

    #[test]
    fn test_function_call_tokens() {
        let d = Delimiters::default();
        assert_eq!(
            kinds(r#"[[items.each("row", a.b)]]"#, &d),
            vec![
                (TokenKind::Open, "[[".to_string()),
                (TokenKind::Identifier, "items".to_string()),
                (TokenKind::Dot, ".".to_string()),
                (TokenKind::Identifier, "each".to_string()),
                (TokenKind::ParenOpen, "(".to_string()),
                (TokenKind::StringLiteral, "row".to_string()),
                (TokenKind::Comma, ",".to_string()),
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Dot, ".".to_string()),
                (TokenKind::Identifier, "b".to_string()),
                (TokenKind::ParenClose, ")".to_string()),
                (TokenKind::Close, "]]".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_delimiters_inside_strings() {
        let d = Delimiters::default();
        let tokens = kinds(r#"[[x.default('it\'s ]] \\ ok')]]"#, &d);
        assert_eq!(tokens[5], (TokenKind::StringLiteral, r"it's ]] \ ok".to_string()));
        assert_eq!(tokens.last().unwrap().0, TokenKind::Close);
    }

    #[test]
    fn test_adjacent_placeholders() {
        let d = Delimiters::default();
        let tokens = kinds("[[a]][[b]]", &d);
        let k: Vec<_> = tokens.iter().map(|t| t.0).collect();
        assert_eq!(
            k,
            vec![
                TokenKind::Open,
                TokenKind::Identifier,
                TokenKind::Close,
                TokenKind::Open,
                TokenKind::Identifier,
                TokenKind::Close,
            ]
        );
    }

    #[test]
    fn test_custom_delimiters_leave_other_text_alone() {
        let pairs = [("{{", "}}"), ("<%", "%>"), ("$", "#"), ("«", "»"), ("<<", " >>")];
        for (open, close) in pairs {
            let d = Delimiters::new(open, close).unwrap();
            let text = format!("a [[b]] {open}name{close} c");
            let tokens = Lexer::new(&text, &d).tokenize().unwrap();

            let literals: Vec<_> = tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Literal)
                .map(|t| t.text.as_str())
                .collect();
            assert_eq!(literals, vec!["a [[b]] ", " c"], "delimiters {open} {close}");

            let idents: Vec<_> = tokens
                .iter()
                .filter(|t| t.kind == TokenKind::Identifier)
                .map(|t| t.text.as_str())
                .collect();
            assert_eq!(idents, vec!["name"]);
        }
    }

    #[test]
    fn test_identifier_stops_at_close_delimiter() {
        let d = Delimiters::new("<-", "->").unwrap();
        assert_eq!(
            kinds("<-my-var->", &d),
            vec![
                (TokenKind::Open, "<-".to_string()),
                (TokenKind::Identifier, "my-var".to_string()),
                (TokenKind::Close, "->".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        let d = Delimiters::default();
        let err = Lexer::new("Hello [[user.name!", &d).tokenize().unwrap_err();
        match err {
            TemplateError::Lex { offset, message } => {
                assert_eq!(offset, 6);
                assert!(message.contains("unterminated"));
            }
            other => panic!("expected lex error, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_string() {
        let d = Delimiters::default();
        let err = Lexer::new(r#"[[x.default("oops)]]"#, &d).tokenize().unwrap_err();
        assert!(matches!(err, TemplateError::Lex { offset: 12, .. }), "{err:?}");
    }

    #[test]
    fn test_unexpected_character() {
        let d = Delimiters::default();
        let err = Lexer::new("[[a + b]]", &d).tokenize().unwrap_err();
        assert!(matches!(err, TemplateError::Lex { offset: 4, .. }), "{err:?}");
    }

    #[test]
    fn test_close_delimiter_starting_with_whitespace() {
        let d = Delimiters::new("<<", " >>").unwrap();
        let tokens = Lexer::new("x <<a >> y", &d).tokenize().unwrap();
        let summary: Vec<_> = tokens
            .iter()
            .map(|t| (t.kind, t.text.as_str(), t.position))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Literal, "x ", 0),
                (TokenKind::Open, "<<", 2),
                (TokenKind::Identifier, "a", 4),
                (TokenKind::Close, " >>", 5),
                (TokenKind::Literal, " y", 8),
            ]
        );
    }

    #[test]
    fn test_reset_restarts() {
        let d = Delimiters::default();
        let mut lexer = Lexer::new("x[[y]]", &d);
        let first = lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.reset();
        assert_eq!(lexer.position(), 0);
        assert_eq!(lexer.next_token().unwrap(), first);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("name"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("first-name2"));
        assert!(!is_identifier("2nd"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
    }
}
