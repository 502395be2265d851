#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::model::BlockRef;
use crate::tree::TagNode;

/// References flattened out of a subtree, grouped by containing-page
/// title (block uid when the block is orphaned). Groups keep first-seen
/// order; within a group, references keep encounter order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergedRefs {
    groups: Vec<(String, Vec<BlockRef>)>,
    index: HashMap<String, usize>,
}

impl MergedRefs {
    pub fn groups(&self) -> &[(String, Vec<BlockRef>)] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[BlockRef]> {
        let index = *self.index.get(key)?;
        Some(&self.groups[index].1)
    }

    pub fn total_refs(&self) -> usize {
        self.groups.iter().map(|(_, refs)| refs.len()).sum()
    }

    fn push(&mut self, key: &str, reference: BlockRef) {
        match self.index.get(key) {
            Some(&at) => self.groups[at].1.push(reference),
            None => {
                self.index.insert(key.to_string(), self.groups.len());
                self.groups.push((key.to_string(), vec![reference]));
            }
        }
    }
}

/// Flattens every reference reachable under `node` into groups. With
/// `include_descendants` false only the node's own pages are scanned,
/// children ignored even when non-empty.
pub fn merge_refs(node: &TagNode, include_descendants: bool) -> MergedRefs {
    let mut merged = MergedRefs::default();
    collect(node, include_descendants, &mut merged);
    merged
}

fn collect(node: &TagNode, include_descendants: bool, merged: &mut MergedRefs) {
    for page in &node.pages {
        for reference in &page.refs {
            merged.push(reference.group_key(), reference.clone());
        }
    }
    if include_descendants {
        for child in node.children.values() {
            collect(child, true, merged);
        }
    }
}
