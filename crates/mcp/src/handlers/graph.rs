#![forbid(unsafe_code)]

use crate::*;
use serde::Deserialize;
use serde_json::{Value, json};

/// YAML shape accepted by `graph_import`: a list of pages, each with an
/// optional list of blocks. Block text is optional so structural-only
/// imports (titles for the tag tree) stay terse.
#[derive(Debug, Deserialize)]
struct ImportSnapshot {
    #[serde(default)]
    pages: Vec<ImportPage>,
}

#[derive(Debug, Deserialize)]
struct ImportPage {
    uid: String,
    title: String,
    #[serde(default)]
    blocks: Vec<ImportBlock>,
}

#[derive(Debug, Deserialize)]
struct ImportBlock {
    uid: String,
    #[serde(default)]
    text: Option<String>,
}

impl SidebarServer {
    pub(crate) fn tool_graph_apply(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };

        let ops_value = args_obj.get("ops").cloned().unwrap_or(Value::Null);
        let Some(ops_array) = ops_value.as_array() else {
            return ai_error("INVALID_INPUT", "ops must be an array");
        };
        if ops_array.is_empty() {
            return ai_error("INVALID_INPUT", "ops must not be empty");
        }
        let mut ops = Vec::with_capacity(ops_array.len());
        for op_value in ops_array {
            let Some(op_obj) = op_value.as_object() else {
                return ai_error("INVALID_INPUT", "ops[] must be an array of objects");
            };
            let op_name = op_obj.get("op").and_then(|v| v.as_str()).unwrap_or("");
            match op_name {
                "page_upsert" => {
                    let uid = match require_string(op_obj, "uid") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    let title = match require_string(op_obj, "title") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    ops.push(tt_storage::GraphOp::PageUpsert { uid, title });
                }
                "page_delete" => {
                    let uid = match require_string(op_obj, "uid") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    ops.push(tt_storage::GraphOp::PageDelete { uid });
                }
                "block_upsert" => {
                    let uid = match require_string(op_obj, "uid") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    let page_uid = match optional_string(op_obj, "page_uid") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    let text = match optional_string(op_obj, "text") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    ops.push(tt_storage::GraphOp::BlockUpsert {
                        uid,
                        page_uid,
                        text,
                    });
                }
                "block_delete" => {
                    let uid = match require_string(op_obj, "uid") {
                        Ok(v) => v,
                        Err(resp) => return resp,
                    };
                    ops.push(tt_storage::GraphOp::BlockDelete { uid });
                }
                _ => {
                    return ai_error(
                        "INVALID_INPUT",
                        "ops[].op must be one of: page_upsert|page_delete|block_upsert|block_delete",
                    );
                }
            }
        }

        self.apply_graph_ops("graph_apply", &workspace, ops, None)
    }

    pub(crate) fn tool_graph_import(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };
        let yaml = match require_string(args_obj, "yaml") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let snapshot: ImportSnapshot = match serde_yaml::from_str(&yaml) {
            Ok(v) => v,
            Err(err) => {
                return ai_error_with(
                    "INVALID_INPUT",
                    &format!("yaml must be a valid snapshot: {err}"),
                    Some("Expected shape: pages: [{uid, title, blocks: [{uid, text}]}]"),
                    vec![],
                );
            }
        };
        if snapshot.pages.is_empty() {
            return ai_error("INVALID_INPUT", "yaml snapshot has no pages");
        }

        // Pages first so block upserts in the same batch can attach to them.
        let pages_imported = snapshot.pages.len();
        let mut ops = Vec::new();
        for page in &snapshot.pages {
            ops.push(tt_storage::GraphOp::PageUpsert {
                uid: page.uid.clone(),
                title: page.title.clone(),
            });
        }
        for page in snapshot.pages {
            for block in page.blocks {
                ops.push(tt_storage::GraphOp::BlockUpsert {
                    uid: block.uid,
                    page_uid: Some(page.uid.clone()),
                    text: block.text,
                });
            }
        }

        self.apply_graph_ops("graph_import", &workspace, ops, Some(pages_imported))
    }

    /// Shared tail of the graph write tools: run the batch, bump the graph
    /// revision (which marks the tree stale), and when auto refresh is on
    /// rebuild the tree inline so callers get the fresh digest in one trip.
    fn apply_graph_ops(
        &mut self,
        intent: &str,
        workspace: &WorkspaceId,
        ops: Vec<tt_storage::GraphOp>,
        pages_imported: Option<usize>,
    ) -> Value {
        let applied = match self.store.graph_apply(workspace, ops) {
            Ok(v) => v,
            Err(StoreError::UnknownId) => {
                return ai_error_with(
                    "UNKNOWN_ID",
                    "Unknown id",
                    Some("page_delete and block_delete require an existing uid; check the batch against tags_status counts."),
                    vec![suggest_call(
                        "tags_status",
                        "Inspect graph counts for this workspace.",
                        "medium",
                        json!({ "workspace": workspace.as_str() }),
                    )],
                );
            }
            Err(StoreError::InvalidInput(msg)) => return ai_error("INVALID_INPUT", msg),
            Err(err) => return ai_error("STORE_ERROR", &format_store_error(err)),
        };
        let graph_revision = self.sidebar.note_graph_change();

        let mut result = json!({
            "workspace": workspace.as_str(),
            "applied": {
                "pages_upserted": applied.pages_upserted,
                "pages_deleted": applied.pages_deleted,
                "blocks_upserted": applied.blocks_upserted,
                "blocks_deleted": applied.blocks_deleted
            },
            "ts_ms": applied.ts_ms,
            "graph_revision": graph_revision
        });
        if let Some(count) = pages_imported {
            result["pages_imported"] = json!(count);
        }
        if self.auto_refresh {
            let summary = match self.refresh_tree(workspace) {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            result["tree"] = json!({
                "revision": summary.revision,
                "digest": summary.snapshot.digest,
                "pages": summary.snapshot.pages,
                "refs": summary.snapshot.refs,
                "selection_cleared": summary.selection_cleared
            });
        }
        ai_ok(intent, result)
    }
}
