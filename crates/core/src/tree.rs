#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::model::PageRefs;

pub const TAG_SEPARATOR: char = '/';

/// One level of the tag hierarchy. `ref_count` accumulates the reference
/// totals of every page terminating at this node or anywhere below it;
/// `pages` holds only the records terminating exactly here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagNode {
    pub pages: Vec<PageRefs>,
    pub ref_count: usize,
    pub children: BTreeMap<String, TagNode>,
}

/// Forest of independent top-level tags, keyed by first path segment.
pub type TagRoot = BTreeMap<String, TagNode>;

pub fn split_tag_path(title: &str) -> Vec<String> {
    title
        .split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Folds a flat record list into a counted tag tree.
///
/// Each record contributes its reference total to every node along its
/// path and lands in `pages` at the leaf. Records with an empty path
/// contribute nothing; a `page_uid` already folded into the tree is
/// skipped wholesale, so redundant input never inflates counts.
pub fn build_tag_tree(records: &[PageRefs]) -> TagRoot {
    let mut root = TagRoot::new();
    let mut seen_uids: HashSet<&str> = HashSet::new();
    for record in records {
        let path = split_tag_path(&record.title);
        let Some((first, rest)) = path.split_first() else {
            continue;
        };
        if !seen_uids.insert(record.page_uid.as_str()) {
            continue;
        }
        let mut node = root.entry(first.clone()).or_default();
        node.ref_count += record.refs.len();
        for segment in rest {
            node = node.children.entry(segment.clone()).or_default();
            node.ref_count += record.refs.len();
        }
        node.pages.push(record.clone());
    }
    root
}

pub fn lookup_path<'a>(root: &'a TagRoot, path: &[String]) -> Option<&'a TagNode> {
    let (first, rest) = path.split_first()?;
    let mut node = root.get(first)?;
    for segment in rest {
        node = node.children.get(segment)?;
    }
    Some(node)
}

pub fn subtree_page_count(node: &TagNode) -> usize {
    node.pages.len()
        + node
            .children
            .values()
            .map(subtree_page_count)
            .sum::<usize>()
}

fn count_nodes(node: &TagNode) -> usize {
    1 + node.children.values().map(count_nodes).sum::<usize>()
}

pub fn node_count(root: &TagRoot) -> usize {
    root.values().map(count_nodes).sum()
}

pub fn total_page_count(root: &TagRoot) -> usize {
    root.values().map(subtree_page_count).sum()
}

/// Total references folded into the tree. Every record contributes to its
/// top-level ancestor exactly once, so summing the first level suffices.
pub fn total_ref_count(root: &TagRoot) -> usize {
    root.values().map(|node| node.ref_count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockRef, PageRefs};

    fn block(uid: &str) -> BlockRef {
        BlockRef {
            block_uid: uid.to_string(),
            text: None,
            page: None,
        }
    }

    fn record(page_uid: &str, title: &str, ref_uids: &[&str]) -> PageRefs {
        PageRefs {
            page_uid: page_uid.to_string(),
            title: title.to_string(),
            refs: ref_uids.iter().map(|uid| block(uid)).collect(),
        }
    }

    #[test]
    fn split_drops_empty_and_trims_segments() {
        assert_eq!(split_tag_path("Work/Done"), vec!["Work", "Done"]);
        assert_eq!(split_tag_path("solo"), vec!["solo"]);
        assert_eq!(split_tag_path(" A / B "), vec!["A", "B"]);
        assert_eq!(split_tag_path("A//B"), vec!["A", "B"]);
        assert_eq!(split_tag_path("/leading/"), vec!["leading"]);
        assert!(split_tag_path("").is_empty());
        assert!(split_tag_path("   ").is_empty());
        assert!(split_tag_path("///").is_empty());
    }

    #[test]
    fn single_record_lands_at_leaf_with_counts_along_path() {
        let root = build_tag_tree(&[record("p1", "Work/Done", &["b1"])]);

        let work = root.get("Work").unwrap();
        assert_eq!(work.ref_count, 1);
        assert!(work.pages.is_empty());

        let done = work.children.get("Done").unwrap();
        assert_eq!(done.ref_count, 1);
        assert_eq!(done.pages.len(), 1);
        assert_eq!(done.pages[0].page_uid, "p1");
        assert!(done.children.is_empty());
    }

    #[test]
    fn siblings_accumulate_into_shared_ancestor() {
        let root = build_tag_tree(&[
            record("p1", "Work", &["b1", "b2"]),
            record("p2", "Work", &["b3", "b4"]),
        ]);

        let work = root.get("Work").unwrap();
        assert_eq!(work.ref_count, 4);
        assert_eq!(work.pages.len(), 2);
    }

    #[test]
    fn duplicate_page_records_do_not_double_count() {
        let root = build_tag_tree(&[
            record("p1", "Work", &["b1", "b2"]),
            record("p1", "Work", &["b1", "b2"]),
        ]);

        let work = root.get("Work").unwrap();
        assert_eq!(work.pages.len(), 1);
        assert_eq!(work.ref_count, 2);
    }

    #[test]
    fn empty_title_records_are_skipped_and_do_not_consume_the_uid() {
        let root = build_tag_tree(&[
            record("p1", "   ", &["b1"]),
            record("p2", "///", &["b2"]),
            record("p1", "Real", &["b3"]),
        ]);

        assert_eq!(root.len(), 1);
        let real = root.get("Real").unwrap();
        assert_eq!(real.ref_count, 1);
        assert_eq!(real.pages[0].page_uid, "p1");
    }

    #[test]
    fn segments_are_trimmed_before_keying() {
        let root = build_tag_tree(&[
            record("p1", "A / B", &["b1"]),
            record("p2", "A/B", &["b2"]),
        ]);

        assert_eq!(root.len(), 1);
        let a = root.get("A").unwrap();
        assert_eq!(a.ref_count, 2);
        let b = a.children.get("B").unwrap();
        assert_eq!(b.ref_count, 2);
        assert_eq!(b.pages.len(), 2);
    }

    #[test]
    fn deep_path_counts_are_monotone_toward_the_root() {
        let root = build_tag_tree(&[
            record("p1", "A/B/C", &["b1", "b2"]),
            record("p2", "A/B", &["b3"]),
            record("p3", "A", &["b4"]),
        ]);

        let a = root.get("A").unwrap();
        let b = a.children.get("B").unwrap();
        let c = b.children.get("C").unwrap();
        assert_eq!(a.ref_count, 4);
        assert_eq!(b.ref_count, 3);
        assert_eq!(c.ref_count, 2);
        assert!(a.ref_count >= b.ref_count);
        assert!(b.ref_count >= c.ref_count);
        assert_eq!(c.pages[0].page_uid, "p1");
    }

    #[test]
    fn build_is_idempotent_and_order_independent_for_counts() {
        let records = vec![
            record("p1", "A/B/C", &["b1", "b2"]),
            record("p2", "A/B", &["b3"]),
            record("p3", "D", &["b4", "b5", "b6"]),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        let first = build_tag_tree(&records);
        let second = build_tag_tree(&records);
        assert_eq!(first, second);

        let flipped = build_tag_tree(&reversed);
        assert_eq!(node_count(&first), node_count(&flipped));
        assert_eq!(total_page_count(&first), total_page_count(&flipped));
        assert_eq!(total_ref_count(&first), total_ref_count(&flipped));
        assert_eq!(
            first.get("A").unwrap().ref_count,
            flipped.get("A").unwrap().ref_count
        );
    }

    #[test]
    fn count_invariant_holds_on_every_node() {
        fn check(node: &TagNode) {
            let direct: usize = node.pages.iter().map(|p| p.refs.len()).sum();
            let from_children: usize = node.children.values().map(|c| c.ref_count).sum();
            assert_eq!(node.ref_count, direct + from_children);
            for child in node.children.values() {
                check(child);
            }
        }

        let root = build_tag_tree(&[
            record("p1", "A/B/C", &["b1", "b2"]),
            record("p2", "A/B", &["b3"]),
            record("p3", "A/X", &["b4"]),
            record("p4", "A", &["b5"]),
            record("p5", "D", &["b6"]),
        ]);
        for node in root.values() {
            check(node);
        }
    }

    #[test]
    fn lookup_walks_child_keys() {
        let root = build_tag_tree(&[record("p1", "A/B/C", &["b1"])]);
        let path = |s: &str| split_tag_path(s);

        assert!(lookup_path(&root, &path("A")).is_some());
        assert!(lookup_path(&root, &path("A/B/C")).is_some());
        assert!(lookup_path(&root, &path("A/C")).is_none());
        assert!(lookup_path(&root, &path("Z")).is_none());
        assert!(lookup_path(&root, &[]).is_none());
    }

    #[test]
    fn summary_helpers_count_pages_refs_and_nodes() {
        let root = build_tag_tree(&[
            record("p1", "A/B", &["b1", "b2"]),
            record("p2", "A", &["b3"]),
            record("p3", "C", &["b4"]),
        ]);

        assert_eq!(node_count(&root), 3);
        assert_eq!(total_page_count(&root), 3);
        assert_eq!(total_ref_count(&root), 4);
        assert_eq!(subtree_page_count(root.get("A").unwrap()), 2);
    }

    #[test]
    fn refless_records_still_shape_the_tree() {
        let root = build_tag_tree(&[record("p1", "A/B", &[])]);
        let a = root.get("A").unwrap();
        assert_eq!(a.ref_count, 0);
        let b = a.children.get("B").unwrap();
        assert_eq!(b.ref_count, 0);
        assert_eq!(b.pages.len(), 1);
    }
}
