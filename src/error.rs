//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! Every phase (scanner, parser, resolver, interpreter) converts its failure
//! modes into one of the variants defined here, so the whole pipeline shares a
//! single `Result<T>` alias and interoperates with `anyhow` in the binary.
//!
//! The four language-level domains (lex, parse, resolve, runtime) are never
//! merged: each carries its own variant. `Internal` is reserved for a mismatch
//! between the resolver's distances and the runtime environment chain.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure (redeclaration, misplaced `return`, …).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error.
    #[error("[line {line}] Runtime error: {message}")]
    Runtime { message: String, line: usize },

    /// The resolver and the environment chain disagree. Never a user error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Internal error: {}", message);

        LoxError::Internal(message)
    }

    /// True for faults that must end an interactive session.
    pub fn is_internal(&self) -> bool {
        matches!(self, LoxError::Internal(_))
    }

    /// Process exit status for file mode (sysexits conventions).
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. } => 65,
            LoxError::Runtime { .. } | LoxError::Internal(_) => 70,
            LoxError::Io(_) => 74,
            LoxError::Utf8(_) => 65,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
