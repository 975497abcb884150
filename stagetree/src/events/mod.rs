//! Lifecycle notifications published by the scheduler.
//!
//! The engine reports transitions through the [`ExecutionObserver`] trait so
//! reporting integrations stay out of the core. Observer failures are logged
//! and swallowed by the scheduler; they never affect execution outcome.

use crate::core::{NodeStatus, Relation};
use crate::errors::InvocationError;
use crate::node::Node;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// The kind of a lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A non-empty container began processing its sub-stages.
    ContainerStarted,
    /// A container completed, successfully or not.
    ContainerFinished,
    /// A sub-stage node was started.
    NodeStarted,
    /// A sub-stage node completed with success or skip.
    NodeCompleted,
    /// A sub-stage node completed exceptionally.
    NodeErrored,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerStarted => write!(f, "container.started"),
            Self::ContainerFinished => write!(f, "container.finished"),
            Self::NodeStarted => write!(f, "node.started"),
            Self::NodeCompleted => write!(f, "node.completed"),
            Self::NodeErrored => write!(f, "node.errored"),
        }
    }
}

/// A serializable snapshot of one lifecycle notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// The notification kind.
    pub kind: EventKind,
    /// The node role.
    pub role: String,
    /// The node name.
    pub name: String,
    /// The relation slot the node occupies under its parent.
    pub relation: Option<Relation>,
    /// The node's runtime id.
    pub runtime_id: String,
    /// The node's stable history id.
    pub history_id: String,
    /// The node status at notification time.
    pub status: NodeStatus,
    /// The error display, for errored notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the notification was recorded (ISO 8601).
    pub timestamp: String,
}

impl EventRecord {
    /// Captures a notification snapshot from a node.
    #[must_use]
    pub fn from_node(kind: EventKind, node: &Node, error: Option<&InvocationError>) -> Self {
        Self {
            kind,
            role: node.role().to_string(),
            name: node.name().to_string(),
            relation: node.relation(),
            runtime_id: node.runtime_id().to_string(),
            history_id: node.history_id().to_string(),
            status: node.status(),
            error: error.map(ToString::to_string),
            timestamp: crate::utils::iso_timestamp(),
        }
    }
}

/// Receives lifecycle notifications from the scheduler.
///
/// All methods default to no-ops so implementations subscribe only to what
/// they need. Each notification carries the node reference; errored
/// notifications carry the raised error as well.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionObserver: Send + Sync {
    /// A non-empty container began processing its sub-stages.
    fn container_started(&self, node: &Node) {
        let _ = node;
    }

    /// A container completed; its status and error are readable on the node.
    fn container_finished(&self, node: &Node) {
        let _ = node;
    }

    /// A sub-stage node was started.
    fn node_started(&self, node: &Node) {
        let _ = node;
    }

    /// A sub-stage node completed with success or skip.
    fn node_completed(&self, node: &Node) {
        let _ = node;
    }

    /// A sub-stage node completed exceptionally.
    fn node_errored(&self, node: &Node, error: &InvocationError) {
        let _ = (node, error);
    }
}

/// An observer that discards all notifications.
///
/// Used as the default when no observer is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl ExecutionObserver for NoOpObserver {}

/// An observer that logs notifications through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl LoggingObserver {
    fn log(kind: EventKind, node: &Node, error: Option<&InvocationError>) {
        info!(
            event = %kind,
            role = %node.role(),
            name = %node.name(),
            status = %node.status(),
            error = error.map(ToString::to_string),
            "Event: {}", kind
        );
    }
}

impl ExecutionObserver for LoggingObserver {
    fn container_started(&self, node: &Node) {
        Self::log(EventKind::ContainerStarted, node, None);
    }

    fn container_finished(&self, node: &Node) {
        Self::log(EventKind::ContainerFinished, node, None);
    }

    fn node_started(&self, node: &Node) {
        Self::log(EventKind::NodeStarted, node, None);
    }

    fn node_completed(&self, node: &Node) {
        Self::log(EventKind::NodeCompleted, node, None);
    }

    fn node_errored(&self, node: &Node, error: &InvocationError) {
        Self::log(EventKind::NodeErrored, node, Some(error));
    }
}

/// A collecting observer for assertions in tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    records: RwLock<Vec<EventRecord>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected records in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.read().clone()
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns the records of one kind, in arrival order.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<EventRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns the `(kind, name)` pairs in arrival order.
    #[must_use]
    pub fn sequence(&self) -> Vec<(EventKind, String)> {
        self.records
            .read()
            .iter()
            .map(|r| (r.kind, r.name.clone()))
            .collect()
    }

    /// Clears all collected records.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    fn push(&self, record: EventRecord) {
        self.records.write().push(record);
    }
}

impl ExecutionObserver for CollectingObserver {
    fn container_started(&self, node: &Node) {
        self.push(EventRecord::from_node(EventKind::ContainerStarted, node, None));
    }

    fn container_finished(&self, node: &Node) {
        self.push(EventRecord::from_node(EventKind::ContainerFinished, node, None));
    }

    fn node_started(&self, node: &Node) {
        self.push(EventRecord::from_node(EventKind::NodeStarted, node, None));
    }

    fn node_completed(&self, node: &Node) {
        self.push(EventRecord::from_node(EventKind::NodeCompleted, node, None));
    }

    fn node_errored(&self, node: &Node, error: &InvocationError) {
        self.push(EventRecord::from_node(EventKind::NodeErrored, node, Some(error)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ActionHandle, NodeBuilder, TreeBuilder};

    fn single_leaf_tree() -> (crate::node::ExecutionTree, crate::node::NodeId) {
        let mut builder = TreeBuilder::new();
        let root = builder.set_root(NodeBuilder::holder("suite", "all")).unwrap();
        let leaf = builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "a step", ActionHandle::new("aStep")),
            )
            .unwrap();
        (builder.build().unwrap(), leaf)
    }

    #[test]
    fn test_collecting_observer_records_sequence() {
        let (tree, leaf) = single_leaf_tree();
        let node = tree.node(leaf);

        let observer = CollectingObserver::new();
        assert!(observer.is_empty());

        observer.node_started(node);
        observer.node_completed(node);

        assert_eq!(observer.len(), 2);
        assert_eq!(
            observer.sequence(),
            vec![
                (EventKind::NodeStarted, "a step".to_string()),
                (EventKind::NodeCompleted, "a step".to_string()),
            ]
        );
        assert_eq!(observer.of_kind(EventKind::NodeStarted).len(), 1);

        observer.clear();
        assert!(observer.is_empty());
    }

    #[test]
    fn test_event_record_carries_error_display() {
        let (tree, leaf) = single_leaf_tree();
        let node = tree.node(leaf);
        let error = InvocationError::new("AssertionError", "boom");

        let record = EventRecord::from_node(EventKind::NodeErrored, node, Some(&error));
        assert_eq!(record.error.as_deref(), Some("AssertionError: boom"));
        assert_eq!(record.relation, Some(Relation::Target));

        let json = serde_json::to_string(&record).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, EventKind::NodeErrored);
    }

    #[test]
    fn test_logging_observer_does_not_panic() {
        let (tree, leaf) = single_leaf_tree();
        let node = tree.node(leaf);

        let observer = LoggingObserver;
        observer.node_started(node);
        observer.node_errored(node, &InvocationError::new("X", "y"));
    }

    #[test]
    fn test_mock_observer_expectations() {
        let (tree, leaf) = single_leaf_tree();
        let node = tree.node(leaf);

        let mut mock = MockExecutionObserver::new();
        mock.expect_node_started().times(1).return_const(());
        mock.expect_node_completed().times(1).return_const(());

        mock.node_started(node);
        mock.node_completed(node);
    }
}
