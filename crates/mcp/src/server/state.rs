#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tt_core::ids::WorkspaceId;
use tt_core::state::StateCell;
use tt_core::tree::TagRoot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ViewMode {
    Tree,
    Pages,
}

impl ViewMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Pages => "pages",
        }
    }

    pub(crate) fn from_arg(value: &str) -> Option<Self> {
        match value {
            "tree" => Some(Self::Tree),
            "pages" => Some(Self::Pages),
            _ => None,
        }
    }
}

/// One fully built tag tree. Immutable once published; a refresh swaps
/// in a whole new snapshot so readers never see a half-built tree.
#[derive(Debug)]
pub(crate) struct TreeSnapshot {
    pub(crate) workspace: WorkspaceId,
    pub(crate) root: TagRoot,
    pub(crate) digest: String,
    pub(crate) built_at_ms: i64,
    pub(crate) pages: usize,
    pub(crate) refs: usize,
}

/// The sidebar's observable state. Each cell is independently
/// versioned; `graph_rev` feeds the staleness flag through a
/// subscription so any graph write marks the displayed tree as out of
/// date until the next refresh.
pub(crate) struct SidebarState {
    pub(crate) tree: StateCell<Option<Arc<TreeSnapshot>>>,
    pub(crate) selection: StateCell<Option<Vec<String>>>,
    pub(crate) show_descendants: StateCell<bool>,
    pub(crate) panel_open: StateCell<bool>,
    pub(crate) mode: StateCell<ViewMode>,
    pub(crate) graph_rev: StateCell<u64>,
    needs_refresh: Arc<AtomicBool>,
}

impl SidebarState {
    pub(crate) fn new(show_descendants: bool) -> Self {
        let graph_rev = StateCell::new(0u64);
        let needs_refresh = Arc::new(AtomicBool::new(false));

        let stale_flag = Arc::clone(&needs_refresh);
        let _ = graph_rev.subscribe(move |_| stale_flag.store(true, Ordering::SeqCst));

        Self {
            tree: StateCell::new(None),
            selection: StateCell::new(None),
            show_descendants: StateCell::new(show_descendants),
            panel_open: StateCell::new(true),
            mode: StateCell::new(ViewMode::Tree),
            graph_rev,
            needs_refresh,
        }
    }

    /// Bumps the graph revision (which also trips the staleness flag via
    /// the subscription) and returns the new revision.
    pub(crate) fn note_graph_change(&self) -> u64 {
        *self.graph_rev.update(|rev| rev + 1).value
    }

    pub(crate) fn tree_is_stale(&self) -> bool {
        self.needs_refresh.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_tree_fresh(&self) {
        self.needs_refresh.store(false, Ordering::SeqCst);
    }
}
