//! Semantic analyzer (C5): a single depth-first, source-order traversal
//! that mutates a [`State`] and appends to its diagnostic list. Never
//! unwinds on semantic issues (spec §4.4: "never throws ... appends to
//! the diagnostic list and continues").

use crate::ast::*;
use crate::grok;
use crate::state::State;

/// Runs the analyzer over a parsed configuration and returns the final
/// state (explicit/implicit sets, value table, diagnostics).
pub fn analyze(ast: &FilterContainer) -> State {
    log::trace!("analyzing filter container with {} top-level statement(s)", ast.body.len());
    let mut state = State::new();
    analyze_body(&mut state, &ast.body);
    log::debug!("analysis produced {} diagnostic(s)", state.diagnostics().len());
    state
}

fn analyze_body(state: &mut State, body: &[Statement]) {
    for stmt in body {
        match stmt {
            Statement::Filter(f) => {
                log::trace!("dispatch: filter '{}' at line {}", f.kind.name(), f.span.line);
                analyze_filter(state, f)
            }
            Statement::Conditional(branches) => {
                log::trace!("dispatch: conditional chain with {} branch(es)", branches.len());
                analyze_conditional(state, branches)
            }
            Statement::Loop(l) => {
                log::trace!("dispatch: loop at line {}", l.span.line);
                analyze_loop(state, l)
            }
        }
    }
}

/// Branches do not share scope; each is visited independently, and fields
/// set only inside a branch are demoted to implicit on exit (spec §4.4).
fn analyze_conditional(state: &mut State, branches: &[Branch]) {
    for branch in branches {
        if let Some(predicate) = &branch.predicate {
            for (segments, span) in &predicate.bracket_paths {
                let path = Value::bracket_path_dotted(segments);
                if state.contains_explicit(&path) {
                    // guaranteed to exist; nothing to report
                } else if state.contains_implicit(&path) {
                    state.add_error(
                        Some(span.line),
                        format!(
                            "implicit field '{path}' used in conditional predicate; not guaranteed to exist"
                        ),
                    );
                } else {
                    state.add_error(
                        Some(span.line),
                        format!("undeclared field '{path}' used in conditional predicate"),
                    );
                }
            }
        }
        state.push_scope();
        analyze_body(state, &branch.body);
        state.pop_scope();
    }
}

/// Loop bodies do not get a fresh scope in this language (spec §4.4).
fn analyze_loop(state: &mut State, loop_: &Loop) {
    analyze_body(state, &loop_.body);
}

fn report_duplicates(state: &mut State, f: &FilterInvocation) {
    for (name, span) in &f.duplicate_options {
        state.add_error(
            Some(span.line),
            format!("duplicate option '{name}' in {} filter", f.kind.name()),
        );
    }
}

/// Common filter contract (spec §4.4): only filter kinds whose schema
/// includes `source` at all are checked, and `date` is exempted even
/// though it accepts `source` ("source may be omitted", spec §4.4).
fn require_source_unless_date(state: &mut State, f: &FilterInvocation) {
    if f.kind.accepts_source() && f.kind != FilterKind::Date && f.option("source").is_none() {
        state.add_error(Some(f.span.line), format!("{} missing source", f.kind.name()));
    }
}

fn apply_target(state: &mut State, f: &FilterInvocation) {
    if let Some(target) = f.option("target").and_then(Value::as_str_literal) {
        state.add_implicit(target);
        state.add_value_table(target, "nil");
    }
}

/// Materializes the `on_error` field name as explicit (per the analyzer's
/// diagnostic convenience: the name is guaranteed-known, spec §4.4).
/// Returns whether `on_error` was present.
fn apply_on_error(state: &mut State, f: &FilterInvocation) -> bool {
    match f.option("on_error").and_then(Value::as_str_literal) {
        Some(name) => {
            state.add_explicit(name);
            state.add_value_table(name, "nil");
            true
        }
        None => false,
    }
}

fn require_on_error(state: &mut State, f: &FilterInvocation, present: bool) {
    if !present {
        state.add_error(Some(f.span.line), format!("{} missing on_error", f.kind.name()));
    }
}

fn analyze_filter(state: &mut State, f: &FilterInvocation) {
    report_duplicates(state, f);
    require_source_unless_date(state, f);
    apply_target(state, f);
    let on_error_present = apply_on_error(state, f);

    match f.kind {
        FilterKind::Grok => analyze_grok(state, f, on_error_present),
        FilterKind::Mutate => analyze_mutate(state, f, on_error_present),
        FilterKind::Date => analyze_date(state, f, on_error_present),
        FilterKind::Csv => analyze_csv(state, f, on_error_present),
        FilterKind::Json => analyze_json(state, f, on_error_present),
        FilterKind::Xml | FilterKind::Kv | FilterKind::Base64 => {
            require_on_error(state, f, on_error_present)
        }
        FilterKind::Drop | FilterKind::Statedump => {
            // No state mutation, no on_error requirement.
        }
    }
}

fn analyze_grok(state: &mut State, f: &FilterInvocation, on_error_present: bool) {
    let Some(match_value) = f.option("match") else {
        state.add_error(Some(f.span.line), "grok missing match");
        require_on_error(state, f, on_error_present);
        return;
    };
    let Some(pairs) = match_value.as_hash() else {
        state.add_error(Some(f.span.line), "grok match must be a hash");
        require_on_error(state, f, on_error_present);
        return;
    };

    let mut extracted = Vec::new();
    for (source_field, patterns) in pairs {
        let pattern_strings: Vec<String> = match patterns {
            Value::List(items) => items.iter().filter_map(Value::as_str_literal).map(String::from).collect(),
            Value::String(_) | Value::Identifier(_) => {
                vec![patterns.as_str_literal().unwrap().to_string()]
            }
            _ => vec![],
        };
        for pattern in pattern_strings {
            for name in grok::extract_field_names(&pattern) {
                state.add_implicit(&name);
                state.add_value_table(&name, &format!("grok({source_field})"));
                if !extracted.contains(&name) {
                    extracted.push(name);
                }
            }
        }
    }

    let overwrite_list = f.option("overwrite").map(Value::as_string_list).unwrap_or_default();
    let missing: Vec<&String> = extracted.iter().filter(|n| !overwrite_list.contains(*n)).collect();
    if !missing.is_empty() {
        let names = missing.iter().map(|s| format!("\"{s}\"")).collect::<Vec<_>>().join(", ");
        state.add_error(Some(f.span.line), format!("grok missing overwrite values: {names}"));
    }

    require_on_error(state, f, on_error_present);
}

fn analyze_mutate(state: &mut State, f: &FilterInvocation, on_error_present: bool) {
    let mut needs_on_error = false;

    if let Some(Value::Hash(pairs)) = f.option("replace") {
        for (dst, src) in pairs {
            let src_text = src.as_str_literal().unwrap_or("");
            state.add_implicit(dst);
            state.add_value_table(dst, src_text);
            if src_text.contains("%{") {
                needs_on_error = true;
            }
        }
    }

    if let Some(Value::Hash(pairs)) = f.option("merge") {
        needs_on_error = true;
        for (dst, src) in pairs {
            state.add_implicit(dst);
            state.add_value_table(dst, src.as_str_literal().unwrap_or(""));
        }
    }

    if let Some(Value::Hash(pairs)) = f.option("rename") {
        for (src, dst) in pairs {
            let dst_text = dst.as_str_literal().unwrap_or("");
            if state.contains_explicit(src) {
                state.rename_explicit(src, dst_text);
            } else if state.contains_implicit(src) {
                state.rename_implicit(src, dst_text);
                needs_on_error = true;
            } else {
                needs_on_error = true;
            }
            // The destination is never trusted past the rename itself;
            // renamed contracts are re-demoted to implicit here.
            state.add_implicit(dst_text);
            state.add_value_table(dst_text, src);
        }
    }

    if let Some(Value::Hash(pairs)) = f.option("copy") {
        needs_on_error = true;
        for (dst, src) in pairs {
            state.add_implicit(dst);
            state.add_value_table(dst, src.as_str_literal().unwrap_or(""));
        }
    }

    if f.option("convert").is_some() {
        needs_on_error = true;
    }
    if f.option("split").is_some() {
        needs_on_error = true;
    }

    // gsub/lowercase/uppercase operate on already-explicit fields in
    // place; they cause no state transition (spec §4.4).

    if let Some(remove_field) = f.option("remove_field") {
        for name in remove_field.as_string_list() {
            state.remove_explicit(&name);
            state.remove_implicit(&name);
        }
    }

    if needs_on_error {
        require_on_error(state, f, on_error_present);
    }
}

fn analyze_date(state: &mut State, f: &FilterInvocation, on_error_present: bool) {
    match f.option("match") {
        None => state.add_error(Some(f.span.line), "date missing match"),
        Some(Value::List(_)) => {}
        Some(_) => state.add_error(Some(f.span.line), "date match must be a list"),
    }
    require_on_error(state, f, on_error_present);
}

fn analyze_csv(state: &mut State, f: &FilterInvocation, on_error_present: bool) {
    for i in 1..=100 {
        state.add_implicit(&format!("column{i}"));
    }
    require_on_error(state, f, on_error_present);
}

fn analyze_json(state: &mut State, f: &FilterInvocation, on_error_present: bool) {
    if let Some(target) = f.option("target").and_then(Value::as_str_literal) {
        // Structural inference is left symbolic: record provenance only.
        state.add_value_table(&format!("{target}.*"), "json:inferred");
    }
    require_on_error(state, f, on_error_present);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn lint(src: &str) -> State {
        let ast = Parser::parse(src).expect("parses");
        analyze(&ast)
    }

    #[test]
    fn mutate_copy_missing_on_error_is_an_error() {
        let state = lint(r#"filter { mutate { copy => { "a" => "b" } } }"#);
        assert!(state.diagnostics().iter().any(|d| d.message.contains("mutate missing on_error")));
    }

    #[test]
    fn grok_overwrite_gap_is_reported() {
        let state = lint(
            r#"filter { grok { match => { "message" => "%{IP:src_ip}" } overwrite => ["other"] on_error => "err" } }"#,
        );
        assert!(state
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("grok missing overwrite values") && d.message.contains("src_ip")));
    }

    #[test]
    fn conditional_on_undeclared_field_is_an_error() {
        let state = lint(r#"filter { if [nope] == "x" { drop { tag => "t" } } }"#);
        assert!(state
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("undeclared field 'nope' used in conditional predicate")));
    }

    #[test]
    fn implicit_promotion_is_demoted_after_conditional_exit() {
        let state = lint(
            r#"filter {
                if [x] == "y" {
                    mutate { replace => { "e" => "v" } on_error => "er" }
                }
                if [e] == "v" {
                    drop { tag => "t" }
                }
            }"#,
        );
        assert!(state
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("field 'e'") && d.message.contains("conditional predicate")));
    }

    #[test]
    fn rename_demotes_destination_to_implicit() {
        let state = lint(
            r#"filter { mutate { rename => { "message" => "msg" } on_error => "err" } }"#,
        );
        assert!(!state.contains_explicit("message"));
        assert!(state.contains_implicit("msg"));
        assert!(!state.contains_explicit("msg"));
    }

    #[test]
    fn date_without_source_is_ok() {
        let state = lint(r#"filter { date { match => ["ts", "ISO8601"] on_error => "err" } }"#);
        assert!(!state.has_errors());
    }
}
