#![forbid(unsafe_code)]

mod support;

use serde_json::{Value, json};
use support::*;

fn listed_tools(server: &mut Server, id: u64) -> Vec<Value> {
    let resp = server.request(json!({
        "jsonrpc": "2.0", "id": id, "method": "tools/list", "params": {}
    }));
    resp.pointer("/result/tools")
        .and_then(Value::as_array)
        .expect("tools/list returns an array")
        .clone()
}

#[test]
fn tools_list_matches_the_sidebar_surface() {
    let mut server = Server::start_initialized("surface_tools_list");

    let names: Vec<String> = listed_tools(&mut server, 1)
        .iter()
        .filter_map(|tool| tool.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    // Definitions are sorted by name, so the listing order is stable too.
    let expected = [
        "graph_apply",
        "graph_import",
        "tags_pages",
        "tags_refresh",
        "tags_select",
        "tags_status",
        "tags_tree",
        "tags_view",
    ];
    assert_eq!(names, expected, "tools/list surface mismatch");
}

#[test]
fn every_tool_schema_is_an_object_schema() {
    let mut server = Server::start_initialized("surface_schemas");

    for tool in listed_tools(&mut server, 2) {
        let name = tool.get("name").and_then(Value::as_str).expect("tool name");
        let schema = tool.get("inputSchema").expect("inputSchema");
        assert_eq!(
            schema.get("type").and_then(Value::as_str),
            Some("object"),
            "{name}: schema type"
        );
        assert!(schema.get("properties").is_some(), "{name}: properties");
        assert!(
            schema.get("required").and_then(Value::as_array).is_some(),
            "{name}: required array"
        );
    }
}

#[test]
fn unknown_tools_fail_closed() {
    let mut server = Server::start_initialized("unknown_tool");

    let out = call_tool(&mut server, 3, "status", json!({}));
    assert_tool_error(&out, "UNKNOWN_TOOL");
    assert!(
        out.pointer("/error/recovery")
            .and_then(Value::as_str)
            .is_some_and(|r| r.contains("tools/list")),
        "unknown tool points at tools/list: {out}"
    );
}

#[test]
fn namespaced_tool_names_resolve_to_their_suffix() {
    let mut server =
        Server::start_initialized_with_args("namespaced_names", &["--workspace", "ws-guard"]);

    let slash = call_tool(&mut server, 4, "tagtree/tags_status", json!({}));
    assert_tool_ok(&slash);

    let dot = call_tool(&mut server, 5, "tt.tags_status", json!({}));
    assert_tool_ok(&dot);

    // A foreign prefix is not ours to strip.
    let foreign = call_tool(&mut server, 6, "other.tags_status", json!({}));
    assert_tool_error(&foreign, "UNKNOWN_TOOL");
}

#[test]
fn non_object_arguments_are_rejected_by_the_tool() {
    let mut server = Server::start_initialized("non_object_args");

    let out = call_tool(&mut server, 7, "tags_status", json!(42));
    assert_tool_error(&out, "INVALID_INPUT");
}
