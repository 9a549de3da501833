//! Grammar / parser (C2), tokenizing half.
//!
//! The lexer recognizes everything *except* conditional predicates, which
//! are skipped as opaque text by [`Lexer::skip_predicate`] (spec §4.1): a
//! full boolean-expression grammar is deliberately not implemented, so the
//! lexer only needs to find the predicate's terminating, unquoted `{`.

use crate::ast::Span;
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, bytes: src.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    fn span(&self) -> Span {
        Span { offset: self.pos, line: self.line, column: self.column }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_ident_byte(c: u8) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'-' | b'@')
    }

    /// Produce the next token, or a fatal [`ParseError`] if the character
    /// at the current position starts nothing recognized.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia();
        let start = self.span();
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", start.offset, start.line, start.column));
        };

        let tok = match c {
            b'{' => self.single(TokenKind::LBrace, start),
            b'}' => self.single(TokenKind::RBrace, start),
            b'[' => self.single(TokenKind::LBracket, start),
            b']' => self.single(TokenKind::RBracket, start),
            b'(' => self.single(TokenKind::LParen, start),
            b')' => self.single(TokenKind::RParen, start),
            b',' => self.single(TokenKind::Comma, start),
            b'"' | b'\'' => self.lex_string(c, start)?,
            b'=' => {
                self.advance();
                if self.peek() == Some(b'>') {
                    self.advance();
                    Token::new(TokenKind::Arrow, "=>", start.offset, start.line, start.column)
                } else {
                    Token::new(TokenKind::Arrow, "=", start.offset, start.line, start.column)
                }
            }
            b':' => self.single(TokenKind::Arrow, start),
            b'0'..=b'9' => self.lex_number(start),
            c if Self::is_ident_byte(c) => self.lex_ident_or_keyword(start),
            other => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", other as char),
                    start,
                    (other as char).to_string(),
                    vec![],
                    self.current_line_text(),
                ))
            }
        };
        Ok(tok)
    }

    fn single(&mut self, kind: TokenKind, start: Span) -> Token {
        let c = self.advance().unwrap();
        Token::new(kind, (c as char).to_string(), start.offset, start.line, start.column)
    }

    fn lex_string(&mut self, quote: u8, start: Span) -> Result<Token, ParseError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(
                        "unterminated string literal",
                        start,
                        "<eof>",
                        vec!["closing quote".into()],
                        self.current_line_text(),
                    ))
                }
                Some(b'\\') => {
                    self.advance();
                    if let Some(escaped) = self.advance() {
                        text.push(escaped as char);
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    // Multi-line strings are permitted; advance_char handles UTF-8.
                    text.push(self.advance_char());
                }
            }
        }
        Ok(Token::new(TokenKind::Str, text, start.offset, start.line, start.column))
    }

    /// Advance past one (possibly multi-byte) UTF-8 character, returning it.
    fn advance_char(&mut self) -> char {
        let rest = &self.src[self.pos..];
        let ch = rest.chars().next().unwrap_or('\u{FFFD}');
        for _ in 0..ch.len_utf8() {
            self.advance();
        }
        ch
    }

    fn lex_number(&mut self, start: Span) -> Token {
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(self.advance().unwrap() as char);
            } else if c == b'.' && !seen_dot && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) {
                seen_dot = true;
                text.push(self.advance().unwrap() as char);
            } else {
                break;
            }
        }
        Token::new(TokenKind::Num, text, start.offset, start.line, start.column)
    }

    fn lex_ident_or_keyword(&mut self, start: Span) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if Self::is_ident_byte(c) {
                text.push(self.advance().unwrap() as char);
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "filter" => TokenKind::Filter,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "true" | "false" => TokenKind::Bool,
            _ => TokenKind::Ident,
        };
        Token::new(kind, text, start.offset, start.line, start.column)
    }

    fn current_line_text(&self) -> String {
        let start = self.src[..self.pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = self.src[self.pos..].find('\n').map(|i| self.pos + i).unwrap_or(self.src.len());
        self.src[start..end].to_string()
    }

    /// Skip raw predicate text starting at the current position, up to
    /// (but not including) the predicate's terminating `{`. Honors string
    /// (`"..."`/`'...'`) and regex (`/.../`) boundaries with backslash
    /// escapes, so unbalanced `{`/`}` inside a string or regex literal
    /// cannot confuse the scan (spec §4.1).
    pub fn skip_predicate(&mut self) -> (String, Span) {
        let start = self.span();
        let text_start = self.pos;
        loop {
            match self.peek() {
                None | Some(b'{') => break,
                Some(b'"') | Some(b'\'') => {
                    let quote = self.peek().unwrap();
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == b'\\' {
                            self.advance();
                            self.advance();
                        } else if c == quote {
                            self.advance();
                            break;
                        } else {
                            self.advance();
                        }
                    }
                }
                Some(b'/') => {
                    // A regex literal, /.../ — but only treat it as one if
                    // it is not immediately followed by whitespace, which
                    // would indicate a stray division-looking slash; either
                    // way, scanning to the next unescaped '/' is safe since
                    // predicates never legitimately contain a bare '{'
                    // between slashes.
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == b'\\' {
                            self.advance();
                            self.advance();
                        } else if c == b'/' {
                            self.advance();
                            break;
                        } else if c == b'{' {
                            break;
                        } else {
                            self.advance();
                        }
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let text = self.src[text_start..self.pos].to_string();
        (text, start)
    }
}
