#![forbid(unsafe_code)]

use crate::{SidebarServer, SidebarState};
use serde_json::{Value, json};

impl SidebarServer {
    pub(crate) fn new(store: tt_storage::SqliteStore, cfg: crate::SidebarServerConfig) -> Self {
        Self {
            initialized: false,
            store,
            sidebar: SidebarState::new(cfg.show_descendants),
            default_workspace: cfg.default_workspace,
            auto_refresh: cfg.auto_refresh,
        }
    }

    pub(crate) fn handle(&mut self, request: crate::JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        // Requests carry a non-null id; everything else is a notification and
        // must never be answered, not even with an error.
        let is_notification = matches!(request.id, None | Some(Value::Null));

        if method == "initialize" {
            return Some(initialize_response(request.id, request.params.as_ref()));
        }
        // `notifications/initialized` is the canonical MCP name; the bare form
        // shows up in the wild often enough to accept as well.
        if matches!(method, "notifications/initialized" | "initialized") {
            self.initialized = true;
            return None;
        }
        if !self.initialized && !self.auto_initialize(method) {
            if is_notification {
                return None;
            }
            return Some(crate::json_rpc_error(
                request.id,
                -32002,
                "Server not initialized",
            ));
        }

        match method {
            "ping" => Some(crate::json_rpc_response(request.id, json!({}))),
            "logging/setLevel" => Some(crate::json_rpc_response(request.id, json!({}))),
            // We publish no resources, prompts or roots; fixed empty answers
            // keep clients that enumerate these surfaces unconditionally happy.
            "resources/list" => Some(crate::json_rpc_response(
                request.id,
                json!({ "resources": [] }),
            )),
            "resources/templates/list" => Some(crate::json_rpc_response(
                request.id,
                json!({ "resourceTemplates": [] }),
            )),
            "resources/read" => Some(crate::json_rpc_response(
                request.id,
                json!({ "contents": [] }),
            )),
            "prompts/list" => {
                Some(crate::json_rpc_response(request.id, json!({ "prompts": [] })))
            }
            "prompts/get" => Some(crate::json_rpc_error(request.id, -32602, "Unknown prompt")),
            "roots/list" => Some(crate::json_rpc_response(request.id, json!({ "roots": [] }))),
            "tools/list" => {
                let tools = crate::handlers::handler_definitions();
                Some(crate::json_rpc_response(request.id, json!({ "tools": tools })))
            }
            "tools/call" => Some(self.tools_call_response(request.id, request.params)),
            _ if is_notification => None,
            _ => Some(crate::json_rpc_error(
                request.id,
                -32601,
                &format!("Method not found: {method}"),
            )),
        }
    }

    /// A client that skips or races its own `initialize` still gets served:
    /// the ordinary read-and-call surface counts as an implicit handshake.
    fn auto_initialize(&mut self, method: &str) -> bool {
        const HANDSHAKE_FREE: [&str; 6] = [
            "tools/call",
            "tools/list",
            "resources/list",
            "resources/read",
            "resources/templates/list",
            "ping",
        ];
        if !HANDSHAKE_FREE.contains(&method) {
            return false;
        }
        self.initialized = true;
        true
    }

    fn tools_call_response(&mut self, id: Option<Value>, params: Option<Value>) -> Value {
        let Some(call) = params.as_ref().and_then(Value::as_object) else {
            return crate::json_rpc_error(id, -32602, "params must be an object");
        };
        let name = call.get("name").and_then(Value::as_str).unwrap_or("");
        // Zero-arg calls often arrive as `"arguments": null`; fold that into an
        // empty object. Other non-object shapes pass through untouched so the
        // tool can reject them with a structured INVALID_INPUT of its own.
        let args = match call.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(other) => other.clone(),
        };

        let body = self.call_tool(name, args);
        let succeeded = body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        crate::json_rpc_response(
            id,
            json!({
                "content": [crate::tool_text_content(&body)],
                "isError": !succeeded
            }),
        )
    }

    pub(crate) fn call_tool(&mut self, name: &str, args: Value) -> Value {
        let requested = name.to_string();
        let name = normalize_tool_name(&requested);

        // A tool panic must come back as a structured error on this one
        // request instead of killing the transport loop.
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            crate::handlers::dispatch_handler(self, name, args).unwrap_or_else(|| unknown_tool(name))
        }));

        outcome.unwrap_or_else(|_| {
            crate::ai_error("INTERNAL", &format!("Internal panic while handling {name}"))
        })
    }
}

fn initialize_response(id: Option<Value>, params: Option<&Value>) -> Value {
    // Echo the protocol revision the client asked for; strict clients refuse a
    // server that names a different one. Our baseline only fills the gap when
    // the client sent none at all.
    let negotiated = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(crate::MCP_VERSION);

    crate::json_rpc_response(
        id,
        json!({
            "protocolVersion": negotiated,
            "serverInfo": {
                "name": crate::SERVER_NAME,
                "version": crate::build_fingerprint()
            },
            // Advertised but empty: clients that probe the optional surfaces
            // handle a vacant capability better than an absent one.
            "capabilities": {
                "tools": {},
                "resources": {},
                "prompts": {},
                "logging": {}
            }
        }),
    )
}

fn unknown_tool(name: &str) -> Value {
    crate::ai_error_with(
        "UNKNOWN_TOOL",
        &format!("Unknown tool: {name}"),
        Some("Call tools/list to discover the available tools."),
        Vec::new(),
    )
}

/// Strip client-added namespace prefixes from a tool name.
///
/// Tool names arrive as bare identifiers, but some clients prepend the server
/// name as `tagtree/tags_tree` or `tt.tags_tree`. Slash prefixes are always
/// dropped; dotted prefixes only when they name this server, since a dot can
/// legitimately appear inside a foreign tool id.
pub(crate) fn normalize_tool_name(name: &str) -> &str {
    let name = name.trim();
    if let Some((_, bare)) = name.rsplit_once('/') {
        return bare;
    }
    match name.split_once('.') {
        Some(("tagtree" | "tt", bare)) => bare,
        _ => name,
    }
}
