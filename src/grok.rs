//! Grok pattern field extraction, grounded in
//! `original_source/src/State.py::parse_grok_pattern`: a grok pattern
//! string embeds named captures that set fields at runtime, in either
//! `%{TYPE:name}` or `(?P<name>...)` shape.

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PERCENT_CAPTURE: Regex = Regex::new(r"%\{[^}]+?:([^}]+?)\}").unwrap();
    static ref NAMED_GROUP: Regex = Regex::new(r"\(\?P<([^>]+)>").unwrap();
}

/// Returns the field names a grok pattern string would set at runtime,
/// deduplicated but in first-seen order.
pub fn extract_field_names(pattern: &str) -> Vec<String> {
    PERCENT_CAPTURE
        .captures_iter(pattern)
        .chain(NAMED_GROUP.captures_iter(pattern))
        .map(|cap| cap[1].to_string())
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_percent_capture() {
        assert_eq!(extract_field_names("%{IP:src_ip} %{WORD:action}"), vec!["src_ip", "action"]);
    }

    #[test]
    fn extracts_named_group() {
        assert_eq!(extract_field_names(r"(?P<user>\w+)"), vec!["user"]);
    }

    #[test]
    fn dedupes_repeated_names() {
        assert_eq!(extract_field_names("%{IP:src_ip} %{IP:src_ip}"), vec!["src_ip"]);
    }
}
