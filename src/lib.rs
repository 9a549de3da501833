//! Static analyzer for CBN parser configurations: a Logstash-like log
//! filter language used to describe field extraction pipelines. This
//! crate parses a configuration into an AST (C1-C3), walks it with a
//! symbol-state table to find missing/undeclared fields and filter
//! misuse (C4-C5), and renders the result as a line-ordered diagnostic
//! list plus an optional UDM field report (C6).
//!
//! ```no_run
//! let outcome = cbn_lint::lint_str("pipeline.conf", "filter { drop { } }");
//! for diagnostic in outcome.diagnostics() {
//!     println!("{}", diagnostic);
//! }
//! ```

pub mod analyzer;
pub mod ast;
pub mod diag;
pub mod error;
pub mod grok;
pub mod lexer;
pub mod parser;
pub mod state;
pub mod token;
pub mod udm;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub use diag::{Diagnostic, Severity};
pub use error::{LintError, ParseError};
pub use state::State;

use parser::Parser;

/// The result of linting one configuration: either a fatal parse failure,
/// or a completed analysis carrying its diagnostics and final state.
pub enum LintOutcome {
    ParseFailed(ParseError),
    Analyzed(State),
}

impl LintOutcome {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            LintOutcome::ParseFailed(_) => &[],
            LintOutcome::Analyzed(state) => state.diagnostics(),
        }
    }

    pub fn has_errors(&self) -> bool {
        match self {
            LintOutcome::ParseFailed(_) => true,
            LintOutcome::Analyzed(state) => state.has_errors(),
        }
    }

    /// UDM field report (spec §4.5); empty if parsing failed outright.
    pub fn udm_fields(&self) -> BTreeMap<String, Vec<String>> {
        match self {
            LintOutcome::ParseFailed(_) => BTreeMap::new(),
            LintOutcome::Analyzed(state) => udm::extract(state),
        }
    }
}

impl fmt::Debug for LintOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintOutcome::ParseFailed(e) => write!(f, "ParseFailed({})", e.message),
            LintOutcome::Analyzed(state) => write!(f, "Analyzed({} diagnostics)", state.diagnostics().len()),
        }
    }
}

/// Runs the full lexer -> parser -> analyzer pipeline over source text
/// already in memory. `path` is used only for labeling; it need not refer
/// to a real file.
pub fn lint_str(_path: &str, src: &str) -> LintOutcome {
    match Parser::parse(src) {
        Ok(ast) => LintOutcome::Analyzed(analyzer::analyze(&ast)),
        Err(err) => LintOutcome::ParseFailed(err),
    }
}

/// As [`lint_str`], but reads the configuration from disk first.
pub fn lint_file(path: &Path) -> Result<LintOutcome, LintError> {
    let src = std::fs::read_to_string(path).map_err(|source| LintError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(lint_str(&path.display().to_string(), &src))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn lints_a_minimal_valid_configuration() {
        let outcome = lint_str("t.conf", r#"filter { drop { tag => "dropped" } }"#);
        assert_matches!(outcome, LintOutcome::Analyzed(_));
        assert!(!outcome.has_errors());
    }

    #[test]
    fn fatal_syntax_error_short_circuits_analysis() {
        let outcome = lint_str("t.conf", "filter { grok { match => } }");
        assert_matches!(outcome, LintOutcome::ParseFailed(_));
        assert!(outcome.has_errors());
    }
}
