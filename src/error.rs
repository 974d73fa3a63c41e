//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables
//! a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter-operation with `anyhow` in the driver, while still preserving rich
//! diagnostic detail.
//!
//! Each diagnostic variant renders as a single line of the form
//! `[line <N>] <Kind> Error<at-context>: <message>`, where `<at-context>` is
//! empty for lexical errors, `" at end"` or `" at '<lexeme>'"` otherwise.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Lex Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error, located at a specific token.
    #[error("[line {line}] Parse Error{at}: {message}")]
    Parse {
        message: String,
        line: usize,

        /// `" at end"` or `" at '<lexeme>'"`.
        at: String,
    },

    /// Static-analysis (resolver) failure.
    #[error("[line {line}] Resolve Error{at}: {message}")]
    Resolve {
        message: String,
        line: usize,
        at: String,
    },

    /// Runtime evaluation error, located at the token that triggered it.
    #[error("[line {line}] Runtime Error{at}: {message}")]
    Runtime {
        message: String,
        line: usize,
        at: String,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

/// `" at end"` for the EOF token, `" at '<lexeme>'"` for everything else.
fn at_token(token: &Token<'_>) -> String {
    if matches!(token.token_type, TokenType::EOF) {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            at: at_token(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            at: at_token(token),
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        LoxError::Runtime {
            message,
            line: token.line,
            at: format!(" at '{}'", token.lexeme),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
