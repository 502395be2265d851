#![forbid(unsafe_code)]

use sha2::{Digest, Sha256};
use tt_core::tree::{TagNode, TagRoot};

/// Canonical digest of a built tag tree. Pre-order traversal, one line
/// per node: path, ref count, then the uids of the pages attached to
/// that node. Equal trees hash equal; any structural, count, or page
/// membership difference changes the digest.
pub(crate) fn tree_digest(root: &TagRoot) -> String {
    let mut hasher = Sha256::new();
    let mut path = Vec::new();
    for (name, node) in root {
        digest_node(&mut hasher, &mut path, name, node);
    }

    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn digest_node(hasher: &mut Sha256, path: &mut Vec<String>, name: &str, node: &TagNode) {
    path.push(name.to_string());

    let mut line = path.join("/");
    line.push('\t');
    line.push_str(&node.ref_count.to_string());
    line.push('\t');
    for (idx, page) in node.pages.iter().enumerate() {
        if idx > 0 {
            line.push(' ');
        }
        line.push_str(&page.page_uid);
    }
    line.push('\n');
    hasher.update(line.as_bytes());

    for (child, child_node) in &node.children {
        digest_node(hasher, path, child, child_node);
    }
    path.pop();
}
