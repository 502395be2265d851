#![forbid(unsafe_code)]

use crate::*;
use serde_json::{Value, json};
use std::sync::Arc;
use tt_core::model::BlockRef;
use tt_core::tree::{TagNode, build_tag_tree, lookup_path, split_tag_path};
use tt_core::tree::{total_page_count, total_ref_count};

/// What a rebuild produced: the published tree-cell revision, the
/// snapshot itself, and whether a now-dangling selection was dropped.
pub(crate) struct RefreshSummary {
    pub(crate) revision: u64,
    pub(crate) snapshot: Arc<TreeSnapshot>,
    pub(crate) selection_cleared: bool,
}

impl SidebarServer {
    /// Rebuilds the tag tree from the store and publishes it wholesale.
    /// A selection whose path vanished from the new tree is cleared
    /// rather than left dangling.
    pub(crate) fn refresh_tree(
        &mut self,
        workspace: &WorkspaceId,
    ) -> Result<RefreshSummary, Value> {
        let records = self
            .store
            .scan_tag_refs(workspace)
            .map_err(|err| ai_error("STORE_ERROR", &format_store_error(err)))?;
        let root = build_tag_tree(&records);
        let digest = tree_digest(&root);
        let pages = total_page_count(&root);
        let refs = total_ref_count(&root);
        let snapshot = Arc::new(TreeSnapshot {
            workspace: workspace.clone(),
            root,
            digest,
            built_at_ms: now_ms_i64(),
            pages,
            refs,
        });

        let published = self.sidebar.tree.set(Some(Arc::clone(&snapshot)));
        self.sidebar.mark_tree_fresh();

        let mut selection_cleared = false;
        let selection = self.sidebar.selection.get();
        if let Some(path) = &*selection.value
            && lookup_path(&snapshot.root, path).is_none()
        {
            self.sidebar.selection.set(None);
            selection_cleared = true;
        }

        Ok(RefreshSummary {
            revision: published.revision,
            snapshot,
            selection_cleared,
        })
    }

    /// The published snapshot for `workspace`, or a NO_TREE error
    /// steering the caller to tags_refresh. A snapshot built for a
    /// different workspace does not count.
    fn current_tree(&self, workspace: &WorkspaceId) -> Result<(u64, Arc<TreeSnapshot>), Value> {
        let current = self.sidebar.tree.get();
        match &*current.value {
            Some(snapshot) if snapshot.workspace == *workspace => {
                Ok((current.revision, Arc::clone(snapshot)))
            }
            Some(snapshot) => Err(ai_error_with(
                "NO_TREE",
                &format!(
                    "the current tree was built for workspace {}, not {}",
                    snapshot.workspace.as_str(),
                    workspace.as_str()
                ),
                Some("Call tags_refresh to rebuild the tree for this workspace."),
                vec![suggest_call(
                    "tags_refresh",
                    "Rebuild the tag tree for the requested workspace.",
                    "high",
                    json!({ "workspace": workspace.as_str() }),
                )],
            )),
            None => Err(ai_error_with(
                "NO_TREE",
                "no tag tree has been built yet",
                Some("Call tags_refresh to build the tree from the note graph."),
                vec![suggest_call(
                    "tags_refresh",
                    "Build the tag tree from the note graph.",
                    "high",
                    json!({ "workspace": workspace.as_str() }),
                )],
            )),
        }
    }

    pub(crate) fn tool_tags_refresh(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };
        let summary = match self.refresh_tree(&workspace) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        ai_ok(
            "tags_refresh",
            json!({
                "workspace": workspace.as_str(),
                "revision": summary.revision,
                "digest": summary.snapshot.digest,
                "pages": summary.snapshot.pages,
                "refs": summary.snapshot.refs,
                "built_at": ts_ms_to_rfc3339(summary.snapshot.built_at_ms),
                "selection_cleared": summary.selection_cleared
            }),
        )
    }

    pub(crate) fn tool_tags_tree(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };
        let sort = match optional_string(args_obj, "sort") {
            Ok(v) => v.unwrap_or_else(|| "count".to_string()),
            Err(resp) => return resp,
        };
        let order = match optional_string(args_obj, "order") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        // count defaults to busiest-first; name defaults to a-z.
        let descending = match (sort.as_str(), order.as_deref()) {
            ("count", None) | ("count" | "name", Some("desc")) => true,
            ("name", None) | ("count" | "name", Some("asc")) => false,
            ("count" | "name", Some(_)) => {
                return ai_error("INVALID_INPUT", "order must be one of: asc|desc");
            }
            _ => return ai_error("INVALID_INPUT", "sort must be one of: count|name"),
        };
        let limit = match optional_usize(args_obj, "limit") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let offset = match optional_usize(args_obj, "offset") {
            Ok(v) => v.unwrap_or(0),
            Err(resp) => return resp,
        };

        let (revision, snapshot) = match self.current_tree(&workspace) {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        // Only the top level is sorted and paged; children stay nested
        // in name order.
        let mut entries: Vec<(&String, &TagNode)> = snapshot.root.iter().collect();
        if sort == "count" {
            if descending {
                entries.sort_by(|a, b| {
                    b.1.ref_count
                        .cmp(&a.1.ref_count)
                        .then_with(|| a.0.cmp(b.0))
                });
            } else {
                entries.sort_by(|a, b| {
                    a.1.ref_count
                        .cmp(&b.1.ref_count)
                        .then_with(|| a.0.cmp(b.0))
                });
            }
        } else if descending {
            entries.reverse();
        }

        let total = entries.len();
        let nodes: Vec<Value> = entries
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(name, node)| tag_node_json(name, node))
            .collect();

        ai_ok(
            "tags_tree",
            json!({
                "workspace": workspace.as_str(),
                "revision": revision,
                "digest": snapshot.digest,
                "stale": self.sidebar.tree_is_stale(),
                "total": total,
                "offset": offset,
                "nodes": nodes
            }),
        )
    }

    pub(crate) fn tool_tags_select(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };
        let Some(path_value) = args_obj.get("path") else {
            return ai_error(
                "INVALID_INPUT",
                "path is required (a tag path string, or null to clear)",
            );
        };

        if path_value.is_null() {
            let published = self.sidebar.selection.set(None);
            return ai_ok(
                "tags_select",
                json!({
                    "workspace": workspace.as_str(),
                    "path": Value::Null,
                    "revision": published.revision
                }),
            );
        }
        let Some(raw_path) = path_value.as_str() else {
            return ai_error("INVALID_INPUT", "path must be a string or null");
        };
        let segments = split_tag_path(raw_path);
        if segments.is_empty() {
            return ai_error("INVALID_INPUT", "path has no segments");
        }

        let (_, snapshot) = match self.current_tree(&workspace) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let Some(node) = lookup_path(&snapshot.root, &segments) else {
            return self.unknown_path(&workspace, &segments);
        };
        let node_summary = json!({
            "count": node.ref_count,
            "pages": node.pages.len(),
            "children": node.children.len()
        });

        let canonical = segments.join("/");
        let published = self.sidebar.selection.set(Some(segments));
        ai_ok(
            "tags_select",
            json!({
                "workspace": workspace.as_str(),
                "path": canonical,
                "revision": published.revision,
                "node": node_summary
            }),
        )
    }

    pub(crate) fn tool_tags_pages(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };
        let explicit_path = match optional_string(args_obj, "path") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let include_descendants = match optional_bool(args_obj, "include_descendants") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let limit = match optional_usize(args_obj, "limit") {
            Ok(v) => v,
            Err(resp) => return resp,
        };

        let segments = match explicit_path {
            Some(raw_path) => {
                let segments = split_tag_path(&raw_path);
                if segments.is_empty() {
                    return ai_error("INVALID_INPUT", "path has no segments");
                }
                segments
            }
            None => match &*self.sidebar.selection.get().value {
                Some(selected) => selected.clone(),
                None => {
                    return ai_error_with(
                        "INVALID_INPUT",
                        "nothing is selected (pass path, or call tags_select first)",
                        Some("Call tags_select with a tag path, then retry."),
                        vec![suggest_call(
                            "tags_select",
                            "Select the tag whose references you want.",
                            "high",
                            json!({ "workspace": workspace.as_str() }),
                        )],
                    );
                }
            },
        };

        let (revision, snapshot) = match self.current_tree(&workspace) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let Some(node) = lookup_path(&snapshot.root, &segments) else {
            return self.unknown_path(&workspace, &segments);
        };

        let include_descendants =
            include_descendants.unwrap_or(*self.sidebar.show_descendants.get().value);
        let merged = tt_core::merge::merge_refs(node, include_descendants);

        let groups_total = merged.len();
        let refs_total = merged.total_refs();
        let groups: Vec<Value> = merged
            .groups()
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(key, refs)| {
                let refs: Vec<Value> = refs.iter().map(block_ref_json).collect();
                json!({ "key": key, "refs": refs })
            })
            .collect();
        let truncated = groups.len() < groups_total;

        ai_ok(
            "tags_pages",
            json!({
                "workspace": workspace.as_str(),
                "revision": revision,
                "path": segments.join("/"),
                "include_descendants": include_descendants,
                "groups": groups,
                "groups_total": groups_total,
                "refs_total": refs_total,
                "truncated": truncated
            }),
        )
    }

    pub(crate) fn tool_tags_status(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };
        let pages = match self.store.page_count(&workspace) {
            Ok(v) => v,
            Err(err) => return ai_error("STORE_ERROR", &format_store_error(err)),
        };
        let blocks = match self.store.block_count(&workspace) {
            Ok(v) => v,
            Err(err) => return ai_error("STORE_ERROR", &format_store_error(err)),
        };

        let tree_cell = self.sidebar.tree.get();
        let tree = match &*tree_cell.value {
            Some(snapshot) => json!({
                "workspace": snapshot.workspace.as_str(),
                "revision": tree_cell.revision,
                "digest": snapshot.digest,
                "built_at": ts_ms_to_rfc3339(snapshot.built_at_ms),
                "pages": snapshot.pages,
                "refs": snapshot.refs,
                "stale": self.sidebar.tree_is_stale()
            }),
            None => Value::Null,
        };

        let selection = self.sidebar.selection.get();
        let selection_path = match &*selection.value {
            Some(segments) => Value::String(segments.join("/")),
            None => Value::Null,
        };

        ai_ok(
            "tags_status",
            json!({
                "workspace": workspace.as_str(),
                "build": build_fingerprint(),
                "graph": {
                    "pages": pages,
                    "blocks": blocks,
                    "revision": *self.sidebar.graph_rev.get().value
                },
                "tree": tree,
                "selection": {
                    "path": selection_path,
                    "revision": selection.revision
                },
                "view": view_state_json(&self.sidebar)
            }),
        )
    }

    pub(crate) fn tool_tags_view(&mut self, args: Value) -> Value {
        let Some(args_obj) = args.as_object() else {
            return ai_error("INVALID_INPUT", "arguments must be an object");
        };
        let workspace = match self.workspace_scope(args_obj) {
            Ok(w) => w,
            Err(resp) => return resp,
        };
        let show_descendants = match optional_bool(args_obj, "show_descendants") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let panel_open = match optional_bool(args_obj, "panel_open") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        let mode_arg = match optional_string(args_obj, "mode") {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        if show_descendants.is_none() && panel_open.is_none() && mode_arg.is_none() {
            return ai_error(
                "INVALID_INPUT",
                "pass at least one of: show_descendants, panel_open, mode",
            );
        }
        let mode = match mode_arg.as_deref() {
            None => None,
            Some(raw) => match ViewMode::from_arg(raw) {
                Some(mode) => Some(mode),
                None => return ai_error("INVALID_INPUT", "mode must be one of: tree|pages"),
            },
        };

        if let Some(value) = show_descendants {
            self.sidebar.show_descendants.set(value);
        }
        if let Some(value) = panel_open {
            self.sidebar.panel_open.set(value);
        }
        if let Some(value) = mode {
            self.sidebar.mode.set(value);
        }

        ai_ok(
            "tags_view",
            json!({
                "workspace": workspace.as_str(),
                "view": view_state_json(&self.sidebar)
            }),
        )
    }

    fn unknown_path(&self, workspace: &WorkspaceId, segments: &[String]) -> Value {
        ai_error_with(
            "UNKNOWN_ID",
            &format!("unknown tag path: {}", segments.join("/")),
            Some("Call tags_tree to see the paths present in the current tree."),
            vec![suggest_call(
                "tags_tree",
                "List the current tag tree.",
                "medium",
                json!({ "workspace": workspace.as_str() }),
            )],
        )
    }
}

/// Recursive wire form of one tag node: subtree reference count, the
/// pages terminating exactly here, and children in name order.
fn tag_node_json(name: &str, node: &TagNode) -> Value {
    let pages: Vec<Value> = node
        .pages
        .iter()
        .map(|page| json!({ "uid": page.page_uid, "title": page.title }))
        .collect();
    let children: Vec<Value> = node
        .children
        .iter()
        .map(|(child_name, child)| tag_node_json(child_name, child))
        .collect();
    json!({
        "tag": name,
        "count": node.ref_count,
        "pages": pages,
        "children": children
    })
}

fn block_ref_json(reference: &BlockRef) -> Value {
    let page = match &reference.page {
        Some(page) => json!({ "uid": page.uid, "title": page.title }),
        None => Value::Null,
    };
    json!({
        "block_uid": reference.block_uid,
        "text": reference.text,
        "page": page
    })
}

fn view_state_json(state: &SidebarState) -> Value {
    let show = state.show_descendants.get();
    let panel = state.panel_open.get();
    let mode = state.mode.get();
    json!({
        "show_descendants": { "value": *show.value, "revision": show.revision },
        "panel_open": { "value": *panel.value, "revision": panel.revision },
        "mode": { "value": mode.value.as_str(), "revision": mode.revision }
    })
}
