//! Shared execution bookkeeping.
//!
//! The scheduler keeps one in-flight record per started node. Records are
//! how errors bubble: a failing node flags its parent's record, one tree
//! level per hop, and bypass decisions read those flags. The map is a
//! concurrent map since every operation touches exactly one key.

use crate::errors::InvocationError;
use crate::node::{Node, NodeId};
use dashmap::DashMap;

#[derive(Debug, Default, Clone)]
struct StageRecord {
    failed: bool,
    error: Option<InvocationError>,
}

/// Thread-safe per-node exception tracking used to decide bypass cascades.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    records: DashMap<NodeId, StageRecord>,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh in-flight record for a node.
    pub fn start(&self, id: NodeId) {
        self.records.insert(id, StageRecord::default());
    }

    /// Removes a node's record once its stage bookkeeping is settled.
    pub fn complete_stage(&self, id: NodeId) {
        self.records.remove(&id);
    }

    /// Flags the record of `node`'s parent as failed, keeping the first
    /// recorded error. Never flags the node's own record; this is how errors
    /// bubble exactly one tree level per hop. Reporting from the root is a
    /// no-op.
    pub fn report_stage_exception(&self, node: &Node, error: InvocationError) {
        let Some(parent) = node.parent() else {
            return;
        };
        let mut record = self.records.entry(parent).or_default();
        record.failed = true;
        if record.error.is_none() {
            record.error = Some(error);
        }
    }

    /// Returns true if the node's own record has been flagged.
    #[must_use]
    pub fn has_stage_exception(&self, id: NodeId) -> bool {
        self.records.get(&id).is_some_and(|r| r.failed)
    }

    /// Returns the first error recorded against the node's own record.
    #[must_use]
    pub fn stage_error(&self, id: NodeId) -> Option<InvocationError> {
        self.records.get(&id).and_then(|r| r.error.clone())
    }

    /// Returns the number of in-flight records.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ActionHandle, NodeBuilder, TreeBuilder};

    #[test]
    fn test_start_and_complete_stage() {
        let ctx = ExecutionContext::new();
        let id = NodeId(0);

        ctx.start(id);
        assert_eq!(ctx.in_flight(), 1);
        assert!(!ctx.has_stage_exception(id));

        ctx.complete_stage(id);
        assert_eq!(ctx.in_flight(), 0);
    }

    #[test]
    fn test_report_flags_parent_not_self() {
        let mut builder = TreeBuilder::new();
        let root = builder.set_root(NodeBuilder::holder("suite", "all")).unwrap();
        let leaf = builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "a step", ActionHandle::new("aStep")),
            )
            .unwrap();
        let tree = builder.build().unwrap();

        let ctx = ExecutionContext::new();
        ctx.start(root);
        ctx.start(leaf);

        ctx.report_stage_exception(tree.node(leaf), InvocationError::new("AssertionError", "boom"));

        assert!(ctx.has_stage_exception(root));
        assert!(!ctx.has_stage_exception(leaf));
        assert_eq!(
            ctx.stage_error(root).map(|e| e.class().to_string()),
            Some("AssertionError".to_string())
        );
    }

    #[test]
    fn test_first_error_wins() {
        let mut builder = TreeBuilder::new();
        let root = builder.set_root(NodeBuilder::holder("suite", "all")).unwrap();
        let first = builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "first", ActionHandle::new("first")),
            )
            .unwrap();
        let second = builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "second", ActionHandle::new("second")),
            )
            .unwrap();
        let tree = builder.build().unwrap();

        let ctx = ExecutionContext::new();
        ctx.start(root);
        ctx.report_stage_exception(tree.node(first), InvocationError::new("First", "1"));
        ctx.report_stage_exception(tree.node(second), InvocationError::new("Second", "2"));

        assert_eq!(
            ctx.stage_error(root).map(|e| e.class().to_string()),
            Some("First".to_string())
        );
    }

    #[test]
    fn test_report_from_root_is_noop() {
        let mut builder = TreeBuilder::new();
        let root = builder.set_root(NodeBuilder::holder("suite", "all")).unwrap();
        let tree = builder.build().unwrap();

        let ctx = ExecutionContext::new();
        ctx.report_stage_exception(tree.node(root), InvocationError::new("X", "y"));
        assert_eq!(ctx.in_flight(), 0);
    }
}
