//! AST (C3): pure data node types for blocks, filters, filter-options and
//! values. Nodes own their children outright; there are no back-pointers
//! and no cycles (the tree is built bottom-up by the parser and is
//! immutable thereafter).

use std::collections::BTreeMap;

/// A source location, carried by every AST node for diagnostic pointing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// The closed set of filter kinds the language recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterKind {
    Grok,
    Json,
    Xml,
    Kv,
    Csv,
    Mutate,
    Base64,
    Date,
    Drop,
    Statedump,
}

impl FilterKind {
    pub fn from_name(name: &str) -> Option<Self> {
        use FilterKind::*;
        Some(match name {
            "grok" => Grok,
            "json" => Json,
            "xml" => Xml,
            "kv" => Kv,
            "csv" => Csv,
            "mutate" => Mutate,
            "base64" => Base64,
            "date" => Date,
            "drop" => Drop,
            "statedump" => Statedump,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use FilterKind::*;
        match self {
            Grok => "grok",
            Json => "json",
            Xml => "xml",
            Kv => "kv",
            Csv => "csv",
            Mutate => "mutate",
            Base64 => "base64",
            Date => "date",
            Drop => "drop",
            Statedump => "statedump",
        }
    }

    /// Whether `source` is part of this filter kind's schema at all (spec
    /// §3: json/xml/kv/csv/base64/date accept `source`; grok, mutate, drop
    /// and statedump do not). Used by the analyzer's common filter contract
    /// (spec §4.4: "If filter accepts source and source is missing...").
    pub fn accepts_source(self) -> bool {
        matches!(
            self,
            FilterKind::Json
                | FilterKind::Xml
                | FilterKind::Kv
                | FilterKind::Csv
                | FilterKind::Base64
                | FilterKind::Date
        )
    }

    /// Option names permitted for this filter kind, per spec §3. Used by
    /// the parser to reject unknown option names as a syntax error.
    pub fn allowed_options(self) -> &'static [&'static str] {
        use FilterKind::*;
        match self {
            Grok => &["match", "overwrite", "on_error"],
            Json => &["source", "target", "on_error", "array_function"],
            Xml => &["source", "target", "on_error", "xpath"],
            Kv => &[
                "source",
                "target",
                "on_error",
                "field_split",
                "unescape_field_split",
                "value_split",
                "unescape_value_split",
                "whitespace",
                "trim_value",
            ],
            Csv => &[
                "source",
                "target",
                "on_error",
                "separator",
                "unescape_separator",
            ],
            Base64 => &["source", "target", "on_error", "encoding"],
            Date => &["match", "source", "target", "timezone", "rebase", "on_error"],
            Mutate => &[
                "convert",
                "gsub",
                "lowercase",
                "merge",
                "rename",
                "replace",
                "uppercase",
                "remove_field",
                "copy",
                "split",
                "on_error",
            ],
            Drop => &["tag"],
            Statedump => &["label"],
        }
    }
}

/// A value literal, per spec §3.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(String),
    Boolean(bool),
    Regex(String),
    Identifier(String),
    List(Vec<Value>),
    /// Ordered map; keys are always `String` or `Identifier` values.
    Hash(Vec<(String, Value)>),
}

impl Value {
    /// Render a bracket path as a dotted field name (`a.b.c`).
    pub fn bracket_path_dotted(segments: &[String]) -> String {
        segments.join(".")
    }

    /// If this value is a list of strings/identifiers, or a bare
    /// string/identifier, return the flattened list of strings. Used for
    /// `overwrite` values, which may be given as either shape.
    pub fn as_string_list(&self) -> Vec<String> {
        match self {
            Value::List(items) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) | Value::Identifier(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            Value::String(s) | Value::Identifier(s) => vec![s.clone()],
            _ => vec![],
        }
    }

    pub fn as_hash(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Hash(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_str_literal(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Identifier(s) => Some(s),
            _ => None,
        }
    }
}

/// One `name => value` pair inside a filter's `{ ... }` body.
#[derive(Debug, Clone)]
pub struct Option_ {
    pub name: String,
    pub value: Value,
    pub span: Span,
}

/// A filter invocation: `<kind> { option* }`.
///
/// Options are kept both as the parse-order sequence (for diagnostics that
/// care about source order) and as a name -> option map built while
/// checking for duplicates.
#[derive(Debug, Clone)]
pub struct FilterInvocation {
    pub kind: FilterKind,
    pub span: Span,
    pub options: BTreeMap<String, Option_>,
    /// Option names that repeated; each duplicate's span, reported as a
    /// semantic error by the analyzer (spec §4.1: "Duplicate option names
    /// ... is a semantic error reported in C5").
    pub duplicate_options: Vec<(String, Span)>,
}

impl FilterInvocation {
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name).map(|o| &o.value)
    }
}

/// The opaque predicate blob a conditional carries: the skipped text plus
/// the `BracketPath` references extracted from it by a light secondary
/// scan (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    pub text: String,
    pub span: Span,
    pub bracket_paths: Vec<(Vec<String>, Span)>,
}

/// One branch of an `if` / `else if` / `else` chain.
#[derive(Debug, Clone)]
pub struct Branch {
    /// `None` only for a trailing `else`.
    pub predicate: Option<Predicate>,
    pub span: Span,
    pub body: Vec<Statement>,
}

/// `for [ident,] ident in (ident | list) { body }`.
#[derive(Debug, Clone)]
pub struct Loop {
    pub span: Span,
    pub index_ident: Option<String>,
    pub value_ident: String,
    pub iterable: Value,
    pub body: Vec<Statement>,
}

/// One statement inside a `filter { ... }` body or nested body.
#[derive(Debug, Clone)]
pub enum Statement {
    Filter(FilterInvocation),
    Conditional(Vec<Branch>),
    Loop(Loop),
}

/// The top-level `filter { ... }` container.
#[derive(Debug, Clone)]
pub struct FilterContainer {
    pub span: Span,
    pub body: Vec<Statement>,
}
