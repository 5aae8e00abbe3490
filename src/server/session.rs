//! Per-connection session state

use crate::server::file_tree::TreeNode;

/// A file write accepted but not yet committed
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub file_path: String,
    pub content: String,
}

/// State owned by exactly one WebSocket connection.
///
/// Dropped together with the connection; nothing here is persisted.
#[derive(Debug, Default)]
pub struct Session {
    pending_changes: Vec<PendingChange>,
    tree: Vec<TreeNode>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_changes(&self) -> &[PendingChange] {
        &self.pending_changes
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending_changes.is_empty()
    }

    pub fn record_change(&mut self, file_path: String, content: String) {
        self.pending_changes.push(PendingChange { file_path, content });
    }

    /// Forget every pending change; only called after a successful commit
    pub fn clear_pending(&mut self) -> usize {
        let count = self.pending_changes.len();
        self.pending_changes.clear();
        count
    }

    /// Last snapshot sent to the peer (may be stale between refreshes)
    pub fn tree(&self) -> &[TreeNode] {
        &self.tree
    }

    pub fn set_tree(&mut self, tree: Vec<TreeNode>) {
        self.tree = tree;
    }
}
