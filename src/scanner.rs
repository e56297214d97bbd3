//! Streaming lexer for Rox source.
//!
//! [`Scanner`] walks a UTF‑8 byte buffer and yields `Result<Token<'a>>` items.
//! Lexemes borrow from the buffer, so scanning allocates only for string
//! literal payloads. Whitespace and `//` comments produce nothing; exactly one
//! `EOF` token closes the stream.
//!
//! A lexical error is yielded in place of a token and scanning resumes right
//! after the offending character, so a caller that drains the iterator sees
//! every problem in the source. [`scan`] is the collecting front end used by
//! the session driver: it logs every error and returns the first.
//!
//! Recognised lexemes:
//!
//! - punctuation `( ) { } , . - + ; / * ? :`
//! - operators `! != = == > >= < <=`
//! - string literals (may span lines), numbers (`12`, `3.5`)
//! - identifiers, with keywords looked up in a compile‑time perfect hash

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info, warn};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Keywords
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"break"    => TokenType::BREAK,
    b"class"    => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"fun"      => TokenType::FUN,
    b"for"      => TokenType::FOR,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
};

/// Kinds that are always exactly one byte long.
fn punctuation(b: u8) -> Option<TokenType> {
    let tt = match b {
        b'(' => TokenType::LEFT_PAREN,
        b')' => TokenType::RIGHT_PAREN,
        b'{' => TokenType::LEFT_BRACE,
        b'}' => TokenType::RIGHT_BRACE,
        b',' => TokenType::COMMA,
        b'.' => TokenType::DOT,
        b'-' => TokenType::MINUS,
        b'+' => TokenType::PLUS,
        b';' => TokenType::SEMICOLON,
        b'*' => TokenType::STAR,
        b'?' => TokenType::QUESTION,
        b':' => TokenType::COLON,
        _ => return None,
    };

    Some(tt)
}

#[inline(always)]
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Collect the whole of `source`. Every lexical error is logged; the first
/// one is returned and no tokens are.
pub fn scan(source: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut first_error: Option<LoxError> = None;

    for result in Scanner::new(source.as_bytes()) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                warn!("Scan error: {}", e);

                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    info!("Scanned {} tokens", tokens.len());

    Ok(tokens)
}

/// Single‑pass scanner over a borrowed source buffer.
pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize, // first byte of the lexeme being scanned
    pos: usize,   // next unread byte
    line: usize,  // 1‑based
    done: bool,   // EOF already emitted
}

impl<'a> Scanner<'a> {
    /// `src` must be valid UTF‑8.
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    // ─────────────────────────── cursor ────────────────────────────────

    #[inline(always)]
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Byte `ahead` positions past the cursor, or `0` beyond the buffer.
    #[inline(always)]
    fn peek_at(&self, ahead: usize) -> u8 {
        self.src.get(self.pos + ahead).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b = self.src[self.pos];
        self.pos += 1;
        b
    }

    /// Consume bytes while `pred` holds.
    #[inline(always)]
    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while !self.at_end() && pred(self.src[self.pos]) {
            self.pos += 1;
        }
    }

    /// `double` when the next byte is `=`, else `single`.
    #[inline(always)]
    fn with_equals(&mut self, double: TokenType, single: TokenType) -> TokenType {
        if self.peek_at(0) == b'=' {
            self.pos += 1;
            double
        } else {
            single
        }
    }

    #[inline(always)]
    fn text(&self, from: usize, to: usize) -> &'a str {
        // SAFETY: the source is valid UTF‑8 and every cut point sits next to
        // an ASCII byte or at a character boundary.
        unsafe { std::str::from_utf8_unchecked(&self.src[from..to]) }
    }

    // ─────────────────────────── lexing ────────────────────────────────

    /// Scan one lexeme starting at `self.start`. `Ok(None)` means it was
    /// whitespace or a comment.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.bump();

        if let Some(tt) = punctuation(b) {
            return Ok(Some(tt));
        }

        let tt = match b {
            b'!' => self.with_equals(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equals(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equals(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equals(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.peek_at(0) == b'/' => {
                // leave the newline for the line counter
                self.pos = match memchr(b'\n', &self.src[self.pos..]) {
                    Some(offset) => self.pos + offset,
                    None => self.src.len(),
                };
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }
            b' ' | b'\r' | b'\t' => return Ok(None),

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // one error per character, not per byte
                self.eat_while(|c| (c & 0xC0) == 0x80);

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", self.text(self.start, self.pos)),
                ));
            }
        };

        Ok(Some(tt))
    }

    /// Opening quote already consumed.
    fn string(&mut self) -> Result<TokenType> {
        let newlines = match memchr(b'"', &self.src[self.pos..]) {
            Some(offset) => {
                let body = &self.src[self.pos..self.pos + offset];
                self.pos += offset + 1;
                body.iter().filter(|&&c| c == b'\n').count()
            }
            None => {
                self.line += self.src[self.pos..].iter().filter(|&&c| c == b'\n').count();
                self.pos = self.src.len();

                return Err(LoxError::lex(self.line, "Unterminated string."));
            }
        };

        self.line += newlines;

        let contents = self.text(self.start + 1, self.pos - 1);
        Ok(TokenType::STRING(contents.to_owned()))
    }

    fn number(&mut self) -> TokenType {
        self.eat_while(|c| c.is_ascii_digit());

        if self.peek_at(0) == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            self.eat_while(|c| c.is_ascii_digit());
        }

        // digits with at most one interior '.' always parse
        let value = self.text(self.start, self.pos).parse().unwrap_or(0.0);
        TokenType::NUMBER(value)
    }

    fn identifier(&mut self) -> TokenType {
        self.eat_while(is_ident_byte);

        KEYWORDS
            .get(&self.src[self.start..self.pos])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Iterator
// ─────────────────────────────────────────────────────────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.at_end() {
            self.start = self.pos;

            match self.scan_token() {
                Ok(Some(tt)) => {
                    debug!("Scanned {:?} on line {}", tt, self.line);

                    let lexeme = self.text(self.start, self.pos);
                    return Some(Ok(Token::new(tt, lexeme, self.line)));
                }
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }

        self.done = true;

        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl FusedIterator for Scanner<'_> {}
