//! Module `scanner` implements a one-pass, streaming UTF-8 lexer for the Lox
//! language.
//!
//! It transforms a byte slice (`&[u8]`) into a sequence of `Token<'a>`s,
//! skipping whitespace and comments, and emitting exactly one `EOF` token at
//! the end. Designed as a `FusedIterator`, it can be chained safely with other
//! iterator adapters.  Lexical errors are non-fatal: the iterator yields an
//! `Err` item and keeps scanning from the next byte.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a [u8]) -> Scanner<'a>`
//!   Create a new lexer over the input buffer.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token<'a>, LoxError>` on each `.next()`, where `Ok(token)`
//!   is a scanned token and `Err` reports a lexing error with line
//!   information.
//!
//! - `scan(src: &[u8]) -> (Vec<Token<'_>>, Vec<LoxError>)`
//!   Drain the iterator into the token list and the accumulated lexical
//!   errors — the form the pipeline driver consumes.
//!
//! # Token recognition
//!
//! - Single-character punctuators: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`,
//!   `;`, `*`.
//! - Two-character operators by maximal munch: `!=`, `==`, `<=`, `>=`.
//! - `//` begins a comment consumed to end-of-line (bulk-skipped via
//!   `memchr`).
//! - String literals `"` … `"` may span lines; an unterminated string is an
//!   error reported at the line where scanning ends.
//! - Numeric literals: digit sequence with an optional fraction — the dot is
//!   consumed only when a digit follows it.
//! - Identifiers `[A-Za-z_][A-Za-z0-9_]*`, resolved against a perfect-hash
//!   `KEYWORDS` map.
//! - Any other byte is a lexical error and produces no token.

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Scan a complete source buffer, partitioning the iterator's output into
/// the token sequence and the list of lexical errors.  Errors never abort
/// the scan, so the token list always ends with `EOF`.
pub fn scan(src: &[u8]) -> (Vec<Token<'_>>, Vec<LoxError>) {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

/// A single pass **scanner / lexer** that converts raw UTF-8 bytes into a
/// sequence of [`Token`]s.  The lifetime `'a` ties every emitted token's
/// `lexeme` slice back to the original source buffer.
pub struct Scanner<'a> {
    src: &'a [u8],              // entire source buffer (possibly memory-mapped)
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1-based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    /// Return the length of the input slice.
    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  *Panics* if called at EOF — higher-
    /// level code always guards with [`Scanner::is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` if past
    /// EOF to avoid branching at call-site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`Scanner::peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    /// Returns `true` on success so callers can branch inline without an else.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces
    /// an actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single-character punctuators ──────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b',' => self.pending = Some(TokenType::COMMA),
            b'.' => self.pending = Some(TokenType::DOT),
            b'-' => self.pending = Some(TokenType::MINUS),
            b'+' => self.pending = Some(TokenType::PLUS),
            b';' => self.pending = Some(TokenType::SEMICOLON),
            b'*' => self.pending = Some(TokenType::STAR),

            // ── two-character operators (!=, ==, <=, >=) ─────────────────
            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };

                self.pending = Some(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };

                self.pending = Some(tt);
            }

            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };

                self.pending = Some(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.pending = Some(tt);
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(()); // skip insignificants
            }

            b'\n' => {
                self.line += 1; // track for diagnostics

                return Ok(());
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast-forward to the next newline using `memchr`.
                    // If none found, skip to EOF.
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(());
                }

                self.pending = Some(TokenType::SLASH);
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => {
                return self.parse_string();
            }

            // ── number literal (digit-leading) ───────────────────────────
            b'0'..=b'9' => {
                self.parse_number();
            }

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        }

        Ok(())
    }

    /// Parse a double-quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1; // multi-line strings are allowed in Lox
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // consume closing quote

        // Slice excluding the surrounding quotes.
        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];

        // SAFETY: the original source is valid UTF-8 (guaranteed by caller)
        // and the quote delimiters are single ASCII bytes.
        let s: &str = unsafe { std::str::from_utf8_unchecked(slice) };

        self.pending = Some(TokenType::STRING(s.to_owned()));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional; a
    /// trailing `.` with no digit after it is left for the next token.
    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        // SAFETY: the slice holds only ASCII digits and at most one dot.
        let s: &str = unsafe { std::str::from_utf8_unchecked(slice) };
        let n: f64 = s.parse::<f64>().unwrap_or(0.0); // parse never fails (checked digits)
        self.pending = Some(TokenType::NUMBER(n));
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>; // alias = Result<T, LoxError>

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard — emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1; // ensure fused semantics
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            // 2. Reset per-token state.
            self.start = self.curr;
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let slice: &[u8] = &self.src[self.start..self.curr];

                // SAFETY: lexeme boundaries fall on ASCII token characters.
                let lex: &str = unsafe { std::str::from_utf8_unchecked(slice) };
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, lex, self.line)));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
