#![forbid(unsafe_code)]

use super::lifecycle::normalize_tool_name;
use super::state::{SidebarState, ViewMode};

#[test]
fn namespaced_tool_names_are_normalized() {
    assert_eq!(normalize_tool_name("tags_tree"), "tags_tree");
    assert_eq!(normalize_tool_name("tagtree/tags_tree"), "tags_tree");
    assert_eq!(normalize_tool_name("tagtree.tags_tree"), "tags_tree");
    assert_eq!(normalize_tool_name("tt.tags_status"), "tags_status");
    assert_eq!(normalize_tool_name("  graph_apply "), "graph_apply");
    // Foreign prefixes with a dot are left alone; only our namespaces are stripped.
    assert_eq!(normalize_tool_name("other.tags_tree"), "other.tags_tree");
}

#[test]
fn graph_changes_mark_the_tree_stale_until_refreshed() {
    let state = SidebarState::new(true);
    assert!(!state.tree_is_stale());

    state.note_graph_change();
    assert!(state.tree_is_stale());
    assert_eq!(*state.graph_rev.get().value, 1);

    state.mark_tree_fresh();
    assert!(!state.tree_is_stale());

    state.note_graph_change();
    assert!(state.tree_is_stale(), "every write re-arms the flag");
}

#[test]
fn view_mode_parses_its_wire_names_only() {
    assert_eq!(ViewMode::from_arg("tree"), Some(ViewMode::Tree));
    assert_eq!(ViewMode::from_arg("pages"), Some(ViewMode::Pages));
    assert_eq!(ViewMode::from_arg("Tree"), None);
    assert_eq!(ViewMode::from_arg(""), None);
    assert_eq!(ViewMode::Tree.as_str(), "tree");
    assert_eq!(ViewMode::Pages.as_str(), "pages");
}
