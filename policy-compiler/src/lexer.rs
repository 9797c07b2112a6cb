//! UTF-8 source → token stream.

use crate::tokens::{Token, TokenKind};
use policy_core::{Pos, Range};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,
    #[error("invalid numeric literal")]
    InvalidNumber,
    #[error("unexpected character {ch:?}")]
    UnexpectedChar { ch: char },
}

/// Tokenizes one source file. CRLF is normalized to LF: CR advances the byte
/// offset but not the line counter, so positions line up with LF-normalized
/// source.
pub struct Lexer {
    source: Vec<char>,
    file: Arc<str>,
    pos: usize,
    line: usize,
    column: usize,
    offset: usize,
    /// Line number of the last non-comment token produced, or `0` before any
    /// token has been lexed. A comment starting on this same line follows a
    /// real token and is a trailing comment rather than a line comment.
    last_token_line: usize,
}

impl Lexer {
    pub fn new(source: &str, file: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.chars().collect(),
            file: file.into(),
            pos: 0,
            line: 1,
            column: 1,
            offset: 0,
            last_token_line: 0,
        }
    }

    fn here(&self) -> Pos {
        Pos::new(self.line, self.column, self.offset)
    }

    fn range(&self, from: Pos) -> Range {
        Range::new(self.file.clone(), from, self.here())
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        self.offset += ch.len_utf8();
        if ch == '\r' {
            // Normalized to LF: advance offset only, the following '\n' (if
            // any) does the line/column reset.
        } else if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\r')) {
            self.bump();
        }
    }

    /// Produces the next token. Returns `TokenKind::Eof` at end of input;
    /// never returns `None`.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_inline_whitespace();
            match self.peek() {
                None => {
                    let at = self.here();
                    return Token::new(TokenKind::Eof, "", self.range(at));
                }
                Some('\n') => {
                    self.bump();
                    continue;
                }
                Some('-') if self.peek2() == Some('-') => {
                    return self.lex_comment();
                }
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                    continue;
                }
                _ => break,
            }
        }
        let start = self.here();
        let ch = match self.bump() {
            Some(c) => c,
            None => return Token::new(TokenKind::Eof, "", self.range(start)),
        };
        let token = match ch {
            '(' => self.lexeme_token(TokenKind::LParen, start),
            ')' => self.lexeme_token(TokenKind::RParen, start),
            '[' => self.lexeme_token(TokenKind::LBracket, start),
            ']' => self.lexeme_token(TokenKind::RBracket, start),
            '{' => self.lexeme_token(TokenKind::LBrace, start),
            '}' => self.lexeme_token(TokenKind::RBrace, start),
            ',' => self.lexeme_token(TokenKind::Comma, start),
            ':' => self.lexeme_token(TokenKind::Colon, start),
            ';' => self.lexeme_token(TokenKind::Semicolon, start),
            '.' => self.lexeme_token(TokenKind::Dot, start),
            '@' => self.lexeme_token(TokenKind::At, start),
            '+' => self.lexeme_token(TokenKind::Plus, start),
            '-' => self.lexeme_token(TokenKind::Minus, start),
            '*' => self.lexeme_token(TokenKind::Star, start),
            '/' => self.lexeme_token(TokenKind::Slash, start),
            '%' => self.lexeme_token(TokenKind::Percent, start),
            '?' => self.lexeme_token(TokenKind::Question, start),
            '=' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.lexeme_token(TokenKind::EqEq, start)
                } else {
                    self.lexeme_token(TokenKind::Assign, start)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.lexeme_token(TokenKind::NotEq, start)
                } else {
                    self.lexeme_token(TokenKind::Bang, start)
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.lexeme_token(TokenKind::LtEq, start)
                } else {
                    self.lexeme_token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.lexeme_token(TokenKind::GtEq, start)
                } else {
                    self.lexeme_token(TokenKind::Gt, start)
                }
            }
            '"' => self.lex_string(start),
            c if c.is_ascii_digit() => self.lex_number(start, c),
            c if is_ident_start(c) => self.lex_ident(start, c),
            other => {
                let range = self.range(start);
                Token::new(
                    TokenKind::Error(LexError::UnexpectedChar { ch: other }.to_string()),
                    other.to_string(),
                    range,
                )
            }
        };
        self.last_token_line = start.line;
        token
    }

    fn lexeme_token(&self, kind: TokenKind, start: Pos) -> Token {
        let range = self.range(start);
        let lexeme = kind.to_string();
        Token::new(kind, lexeme, range)
    }

    fn lex_comment(&mut self) -> Token {
        let start = self.here();
        let trailing = start.line == self.last_token_line;
        self.bump(); // first '-'
        self.bump(); // second '-'
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.bump();
        }
        let kind = if trailing {
            TokenKind::TrailingComment(text.clone())
        } else {
            TokenKind::LineComment(text.clone())
        };
        Token::new(kind, text, self.range(start))
    }

    fn lex_string(&mut self, start: Pos) -> Token {
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Token::new(
                        TokenKind::Error(LexError::UnterminatedString.to_string()),
                        value,
                        self.range(start),
                    );
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some('"') => {
                            value.push('"');
                            self.bump();
                        }
                        Some('\\') => {
                            value.push('\\');
                            self.bump();
                        }
                        Some('n') => {
                            value.push('\n');
                            self.bump();
                        }
                        Some('r') => {
                            value.push('\r');
                            self.bump();
                        }
                        Some('t') => {
                            value.push('\t');
                            self.bump();
                        }
                        Some('u') => {
                            self.bump();
                            if self.peek() != Some('{') {
                                return Token::new(
                                    TokenKind::Error(LexError::InvalidUnicodeEscape.to_string()),
                                    value,
                                    self.range(start),
                                );
                            }
                            self.bump();
                            let mut hex = String::new();
                            while let Some(c) = self.peek() {
                                if c == '}' {
                                    break;
                                }
                                hex.push(c);
                                self.bump();
                            }
                            if self.peek() != Some('}') {
                                return Token::new(
                                    TokenKind::Error(LexError::InvalidUnicodeEscape.to_string()),
                                    value,
                                    self.range(start),
                                );
                            }
                            self.bump();
                            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                                Some(c) => value.push(c),
                                None => {
                                    return Token::new(
                                        TokenKind::Error(
                                            LexError::InvalidUnicodeEscape.to_string(),
                                        ),
                                        value,
                                        self.range(start),
                                    );
                                }
                            }
                        }
                        _ => {
                            return Token::new(
                                TokenKind::Error(LexError::InvalidUnicodeEscape.to_string()),
                                value,
                                self.range(start),
                            );
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        Token::new(TokenKind::String(value.clone()), value, self.range(start))
    }

    fn lex_number(&mut self, start: Pos, first: char) -> Token {
        let mut lexeme = String::new();
        lexeme.push(first);
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            lexeme.push(self.bump().unwrap());
        }
        let mut is_float = false;
        if self.peek() == Some('.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            lexeme.push(self.bump().unwrap()); // '.'
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                lexeme.push(self.bump().unwrap());
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut exp = String::new();
            exp.push(self.peek().unwrap());
            let save_pos = self.pos;
            let save_line = self.line;
            let save_col = self.column;
            let save_off = self.offset;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                exp.push(self.bump().unwrap());
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                is_float = true;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    exp.push(self.bump().unwrap());
                }
                lexeme.push_str(&exp);
            } else {
                // Not actually an exponent; rewind.
                self.pos = save_pos;
                self.line = save_line;
                self.column = save_col;
                self.offset = save_off;
            }
        }
        if is_float {
            match lexeme.parse::<f64>() {
                Ok(v) => Token::new(TokenKind::Float(v), lexeme, self.range(start)),
                Err(_) => Token::new(
                    TokenKind::Error(LexError::InvalidNumber.to_string()),
                    lexeme,
                    self.range(start),
                ),
            }
        } else {
            match lexeme.parse::<i64>() {
                Ok(v) => Token::new(TokenKind::Int(v), lexeme, self.range(start)),
                Err(_) => Token::new(
                    TokenKind::Error(LexError::InvalidNumber.to_string()),
                    lexeme,
                    self.range(start),
                ),
            }
        }
    }

    fn lex_ident(&mut self, start: Pos, first: char) -> Token {
        let mut lexeme = String::new();
        lexeme.push(first);
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            lexeme.push(self.bump().unwrap());
        }
        let kind = TokenKind::keyword(&lexeme).unwrap_or_else(|| TokenKind::Ident(lexeme.clone()));
        Token::new(kind, lexeme, self.range(start))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenizes the whole source into a `Vec<Token>` ending with `Eof`. Used by
/// the parser, which wants random lookahead rather than a pull iterator.
pub fn tokenize(source: &str, file: impl Into<Arc<str>>) -> Vec<Token> {
    let mut lexer = Lexer::new(source, file);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok.is_eof();
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src, "t.pl").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_namespace_keyword_and_fqn() {
        let ks = kinds("namespace com/example");
        assert_eq!(
            ks,
            vec![
                TokenKind::Namespace,
                TokenKind::Ident("com".into()),
                TokenKind::Slash,
                TokenKind::Ident("example".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_string_escapes() {
        let ks = kinds(r#" "a\nb\u{41}" "#);
        assert_eq!(ks, vec![TokenKind::String("a\nbA".into()), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_is_error_token() {
        let ks = kinds("\"abc");
        assert!(matches!(ks[0], TokenKind::Error(_)));
    }

    #[test]
    fn lexes_float_and_int() {
        let ks = kinds("1 2.5 3e2 4.0e-1");
        assert_eq!(
            ks,
            vec![
                TokenKind::Int(1),
                TokenKind::Float(2.5),
                TokenKind::Float(300.0),
                TokenKind::Float(0.4),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_is_preserved_as_token() {
        let toks = tokenize("-- hi\nlet", "t.pl");
        assert!(matches!(toks[0].kind, TokenKind::LineComment(ref s) if s == " hi"));
    }

    #[test]
    fn comment_after_a_token_on_the_same_line_is_trailing() {
        let toks = tokenize("let -- hi\nrule", "t.pl");
        assert!(matches!(toks[1].kind, TokenKind::TrailingComment(ref s) if s == " hi"));
    }

    #[test]
    fn comment_on_its_own_line_is_not_trailing() {
        let toks = tokenize("-- hi\nlet", "t.pl");
        assert!(matches!(toks[0].kind, TokenKind::LineComment(_)));
    }

    #[test]
    fn crlf_normalizes_line_without_double_counting() {
        let toks = tokenize("let\r\nrule", "t.pl");
        let rule_tok = toks.iter().find(|t| t.kind == TokenKind::Rule).unwrap();
        assert_eq!(rule_tok.range.from.line, 2);
    }

    #[test]
    fn column_counts_unicode_scalars_not_bytes() {
        let toks = tokenize("\"é\" x", "t.pl");
        let x = toks.iter().find(|t| matches!(t.kind, TokenKind::Ident(_))).unwrap();
        // `"é"` is 4 display cells (quote, e-acute, quote, space) -> x starts at column 5.
        assert_eq!(x.range.from.column, 5);
    }
}
