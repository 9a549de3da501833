//! UDM (Unified Data Model) field extraction (spec §4.5): after analysis,
//! walk the `@output` identifiers recorded in the value table and collect
//! every provenance-bearing leaf under each `<id>.idm.read_only_udm`
//! subtree.

use std::collections::BTreeMap;

use crate::state::State;

/// Returns every UDM field path (relative to `idm.read_only_udm`) mapped
/// to its recorded provenance, across every `@output`-tagged identifier
/// found in the value table.
pub fn extract(state: &State) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    let Some(output_node) = state.lookup_value_table("@output") else {
        return out;
    };
    for output_id in output_node.children.keys() {
        let prefix = format!("@output.{output_id}.idm.read_only_udm");
        if let Some(subtree) = state.lookup_value_table(&prefix) {
            subtree.collect_leaves("", &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_yields_no_udm_fields() {
        let state = State::new();
        assert!(extract(&state).is_empty());
    }

    #[test]
    fn collects_fields_under_an_output_subtree() {
        let mut state = State::new();
        state.add_value_table("@output.main.idm.read_only_udm.principal.hostname", "grok(message)");
        let fields = extract(&state);
        assert_eq!(fields.get("principal.hostname"), Some(&vec!["grok(message)".to_string()]));
    }
}
