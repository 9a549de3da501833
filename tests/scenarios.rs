//! End-to-end fixture-driven tests exercising the scenarios the analyzer
//! is expected to get right: each one lints a small configuration and
//! checks the resulting diagnostic list.

use cbn_lint::{lint_str, LintOutcome};

fn diagnostics_for(src: &str) -> Vec<String> {
    match lint_str("fixture.conf", src) {
        LintOutcome::Analyzed(state) => {
            state.diagnostics().iter().map(|d| d.format("fixture.conf")).collect()
        }
        LintOutcome::ParseFailed(err) => panic!("expected a clean parse, got: {}", err.message),
    }
}

#[test]
fn missing_on_error_in_mutate_copy() {
    let diags = diagnostics_for(r#"filter { mutate { copy => { "a" => "b" } } }"#);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].contains("mutate missing on_error"));
}

#[test]
fn grok_overwrite_gap() {
    let diags = diagnostics_for(
        r#"filter {
            grok {
                match => { "message" => "%{IP:src_ip}" }
                overwrite => ["other"]
                on_error => "err"
            }
        }"#,
    );
    assert!(diags.iter().any(|d| d.contains("grok missing overwrite values") && d.contains("src_ip")));
}

#[test]
fn conditional_on_undeclared_field() {
    let diags = diagnostics_for(r#"filter { if [nope] == "x" { drop { tag => "t" } } }"#);
    assert!(diags.iter().any(|d| d.contains("undeclared field 'nope' used in conditional predicate")));
}

#[test]
fn implicit_field_promotion_does_not_survive_conditional_exit() {
    let diags = diagnostics_for(
        r#"filter {
            if [message] == "x" {
                mutate { replace => { "e" => "v" } on_error => "er" }
            }
            if [e] == "v" {
                drop { tag => "t" }
            }
        }"#,
    );
    assert!(diags
        .iter()
        .any(|d| d.contains("implicit field 'e' used in conditional predicate")));
}

#[test]
fn rename_semantics_move_the_subtree_and_demote_the_destination() {
    let diags = diagnostics_for(
        r#"filter {
            mutate { rename => { "message" => "msg" } on_error => "err" }
            if [message] == "x" { drop { tag => "t" } }
        }"#,
    );
    assert!(diags
        .iter()
        .any(|d| d.contains("undeclared field 'message' used in conditional predicate")));
}

#[test]
fn date_without_source_is_accepted() {
    let diags = diagnostics_for(r#"filter { date { match => ["ts", "ISO8601"] on_error => "err" } }"#);
    assert!(diags.is_empty());
}

#[test]
fn every_other_filter_requires_source() {
    let diags = diagnostics_for(r#"filter { json { on_error => "err" } }"#);
    assert!(diags.iter().any(|d| d.contains("json missing source")));
}

#[test]
fn duplicate_options_are_reported() {
    let diags = diagnostics_for(
        r#"filter { drop { tag => "a" tag => "b" } }"#,
    );
    assert!(diags.iter().any(|d| d.contains("duplicate option 'tag'")));
}

#[test]
fn csv_seeds_one_hundred_columns_as_implicit() {
    let diags = diagnostics_for(
        r#"filter {
            csv { source => "message" on_error => "err" }
            if [column57] == "x" { drop { tag => "t" } }
        }"#,
    );
    assert!(diags
        .iter()
        .any(|d| d.contains("implicit field 'column57' used in conditional predicate")));
}

#[test]
fn loop_body_shares_scope_with_its_container() {
    let diags = diagnostics_for(
        r#"filter {
            for item in ["a", "b"] {
                mutate { replace => { "seen" => "1" } on_error => "err" }
            }
        }"#,
    );
    assert!(diags.is_empty());
}
