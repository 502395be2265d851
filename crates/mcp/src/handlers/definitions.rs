#![forbid(unsafe_code)]

use serde_json::{Value, json};

pub(crate) fn handler_definitions() -> Vec<Value> {
    let mut handlers = vec![
        json!({
            "name": "graph_apply",
            "description": "Apply a batch of page/block operations to the note graph (atomic).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" },
                    "ops": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "op": {
                                    "type": "string",
                                    "enum": ["page_upsert", "page_delete", "block_upsert", "block_delete"]
                                },
                                "uid": { "type": "string" },
                                "title": { "type": "string" },
                                "page_uid": { "type": "string" },
                                "text": { "type": "string" }
                            },
                            "required": ["op", "uid"]
                        }
                    }
                },
                "required": ["ops"]
            }
        }),
        json!({
            "name": "graph_import",
            "description": "Import a YAML snapshot (pages with optional blocks) into the note graph.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" },
                    "yaml": { "type": "string" }
                },
                "required": ["yaml"]
            }
        }),
        json!({
            "name": "tags_refresh",
            "description": "Rebuild the tag tree from the note graph and publish the new snapshot.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" }
                },
                "required": []
            }
        }),
        json!({
            "name": "tags_tree",
            "description": "Read the current tag tree (top level sorted/paged, children nested).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" },
                    "sort": { "type": "string", "enum": ["count", "name"] },
                    "order": { "type": "string", "enum": ["asc", "desc"] },
                    "limit": { "type": "integer" },
                    "offset": { "type": "integer" }
                },
                "required": []
            }
        }),
        json!({
            "name": "tags_select",
            "description": "Select a tag path (e.g. \"Work/Done\") or pass null to clear the selection.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" },
                    "path": { "type": ["string", "null"] }
                },
                "required": ["path"]
            }
        }),
        json!({
            "name": "tags_pages",
            "description": "List the merged references for the selected tag (or an explicit path).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" },
                    "path": { "type": "string" },
                    "include_descendants": { "type": "boolean" },
                    "limit": { "type": "integer" }
                },
                "required": []
            }
        }),
        json!({
            "name": "tags_status",
            "description": "Get graph counts, tree snapshot info, staleness, selection, and view state.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" }
                },
                "required": []
            }
        }),
        json!({
            "name": "tags_view",
            "description": "Set view preferences: show_descendants, panel_open, and/or mode (tree|pages).",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "workspace": { "type": "string" },
                    "show_descendants": { "type": "boolean" },
                    "panel_open": { "type": "boolean" },
                    "mode": { "type": "string", "enum": ["tree", "pages"] }
                },
                "required": []
            }
        }),
    ];

    handlers.sort_by_key(|tool| {
        tool.get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    });
    handlers
}
