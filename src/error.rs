//! Error types. Parse errors are fatal (spec §4.1/§7: "Abort on first
//! syntax error"); everything else is funneled into the diagnostic list
//! instead of propagated as a `Result` error.

use crate::ast::Span;
use thiserror::Error;

/// Top-level error returned by the driver when linting cannot proceed at
/// all: the file could not be read, or parsing failed outright.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A fatal syntax error, pinned to a source location.
///
/// `expected` is populated when the parser knows the set of token kinds
/// (rendered as human strings) that would have been accepted instead; it
/// is left empty where no closed expectation set applies (spec §4.1:
/// "the expected-token set if available").
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub found: String,
    pub expected: Vec<String>,
    pub source_line: String,
}

impl ParseError {
    pub fn new(
        message: impl Into<String>,
        span: Span,
        found: impl Into<String>,
        expected: Vec<String>,
        source_line: impl Into<String>,
    ) -> Self {
        ParseError {
            message: message.into(),
            span,
            found: found.into(),
            expected,
            source_line: source_line.into(),
        }
    }
}
