//! Diagnostic surface (C6): the error/warning list and the exit-code
//! policy spec §6/§7 describe.

use crate::error::ParseError;
use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One semantic finding, line-ordered per the analyzer's source-order
/// traversal (spec §5: "diagnostics are line-ordered").
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    /// `[ERROR] <path>, line <N>, <message>` / `[WARN] <path>, line <N>, <message>`
    /// (spec §6).
    pub fn format(&self, path: &str) -> String {
        let tag = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        match self.line {
            Some(line) => format!("[{tag}] {path}, line {line}, {}", self.message),
            None => format!("[{tag}] {path}, {}", self.message),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        match self.line {
            Some(line) => write!(f, "[{tag}] line {line}, {}", self.message),
            None => write!(f, "[{tag}] {}", self.message),
        }
    }
}

/// Render a fatal parse error as a caret-pointing snippet, in the style of
/// the `original_source` tool's `drilldown_parser_error` (see
/// SPEC_FULL.md).
pub fn render_parse_error(path: &str, err: &ParseError) -> String {
    let label = if err.expected.is_empty() {
        err.message.clone()
    } else {
        format!("{} (expected: {})", err.message, err.expected.join(", "))
    };
    let origin = format!("{path}:{}:{}", err.span.line, err.span.column);
    let col = err.span.column.max(1) - 1;
    let ann_len = err.found.chars().count().max(1);
    let snippet = Snippet {
        title: Some(Annotation {
            label: Some(&label),
            id: None,
            annotation_type: AnnotationType::Error,
        }),
        footer: vec![],
        slices: vec![Slice {
            source: &err.source_line,
            line_start: err.span.line,
            origin: Some(&origin),
            fold: false,
            annotations: vec![SourceAnnotation {
                label: "unexpected here",
                annotation_type: AnnotationType::Error,
                range: (col, col + ann_len),
            }],
        }],
        opt: FormatOptions { color: true, ..Default::default() },
    };
    DisplayList::from(snippet).to_string()
}
