//! Branch (journal) view tracking.
//!
//! In branch mode every shown passage stays on screen as a node. The tracker
//! records which passages currently have a node and in what display order,
//! so a revisit can scroll to the existing node instead of rendering a
//! duplicate.

extern crate alloc;

use alloc::vec::Vec;

/// A rendered passage instance in branch mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchNode {
    pub passage_id: u32,
    /// Passage whose link led here. Positioning only.
    pub parent: Option<u32>,
}

/// Display-ordered set of branch nodes, at most one per passage id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BranchTracker {
    nodes: Vec<BranchNode>,
}

impl BranchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_node(&self, passage_id: u32) -> bool {
        self.position(passage_id).is_some()
    }

    /// Display index of the node for `passage_id`.
    pub fn position(&self, passage_id: u32) -> Option<usize> {
        self.nodes
            .iter()
            .position(|node| node.passage_id == passage_id)
    }

    /// Create a node for `passage_id`, placed right after `after` when that
    /// node exists and appended otherwise. Returns the display index.
    ///
    /// An existing node for `passage_id` is reused and its index returned.
    pub fn create_node(&mut self, passage_id: u32, after: Option<u32>) -> usize {
        if let Some(existing) = self.position(passage_id) {
            return existing;
        }
        let node = BranchNode {
            passage_id,
            parent: after,
        };
        match after.and_then(|parent| self.position(parent)) {
            Some(parent_index) => {
                let index = parent_index + 1;
                self.nodes.insert(index, node);
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Remove the node for `passage_id`, returning it if present.
    pub fn remove_node(&mut self, passage_id: u32) -> Option<BranchNode> {
        let index = self.position(passage_id)?;
        Some(self.nodes.remove(index))
    }

    /// Drop every node (new generation).
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn nodes(&self) -> &[BranchNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
