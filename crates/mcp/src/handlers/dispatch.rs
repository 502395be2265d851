#![forbid(unsafe_code)]

use crate::SidebarServer;
use serde_json::Value;

macro_rules! define_sidebar_dispatch {
    ($($tool_name:literal => $method:ident),* $(,)?) => {
        pub(crate) fn dispatch_handler(
            server: &mut SidebarServer,
            name: &str,
            args: Value,
        ) -> Option<Value> {
            let resp = match name {
                $($tool_name => server.$method(args),)*
                _ => return None,
            };
            Some(resp)
        }

        #[cfg(test)]
        pub(crate) fn dispatch_tool_names() -> &'static [&'static str] {
            &[$($tool_name),*]
        }
    };
}

define_sidebar_dispatch! {
    "graph_apply" => tool_graph_apply,
    "graph_import" => tool_graph_import,
    "tags_refresh" => tool_tags_refresh,
    "tags_tree" => tool_tags_tree,
    "tags_select" => tool_tags_select,
    "tags_pages" => tool_tags_pages,
    "tags_status" => tool_tags_status,
    "tags_view" => tool_tags_view,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn handler_definitions_and_dispatch_are_in_sync() {
        let mut defined = BTreeSet::<String>::new();
        for tool in super::super::handler_definitions() {
            let Some(name) = tool.get("name").and_then(|v| v.as_str()) else {
                continue;
            };
            defined.insert(name.to_string());
        }

        let mut dispatched = BTreeSet::<String>::new();
        for name in dispatch_tool_names() {
            dispatched.insert((*name).to_string());
        }

        let missing_in_definitions = dispatched.difference(&defined).cloned().collect::<Vec<_>>();
        let missing_in_dispatch = defined.difference(&dispatched).cloned().collect::<Vec<_>>();

        assert!(
            missing_in_definitions.is_empty() && missing_in_dispatch.is_empty(),
            "tool dispatch/definitions mismatch\n  dispatch-only: {missing_in_definitions:?}\n  definitions-only: {missing_in_dispatch:?}"
        );
    }
}
