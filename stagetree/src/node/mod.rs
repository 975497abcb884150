//! The execution tree: nodes, their arena and the assembly builder.
//!
//! Nodes live in an arena owned by [`ExecutionTree`] and are addressed by
//! [`NodeId`]. The parent link is an id, children are id lists inside the
//! parent's sub-stages, so the tree carries no shared mutable aliasing.
//! Structure is immutable once built; only phase, status, dry mode and the
//! error payload mutate during execution, behind a per-node lock held by the
//! scheduler.

mod builder;

pub use builder::{NodeBuilder, TreeBuilder};

use crate::core::{BypassOptions, NodePhase, NodeStatus, Relation, SubStage};
use crate::errors::{InvocationError, StateError};
use crate::outcome::Outcome;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Arena index of a node within its [`ExecutionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a node is a container or a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A container stage owning sub-stages.
    Holder,
    /// A leaf carrying an action handle.
    Invokable,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Holder => write!(f, "holder"),
            Self::Invokable => write!(f, "invokable"),
        }
    }
}

/// An opaque reference to the real work behind a leaf node.
///
/// The engine never interprets the handle; adapters resolve the target
/// against a real method or callable and bind the parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionHandle {
    /// The adapter-scoped target name.
    pub target: String,
    /// Named parameters bound to the target.
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl ActionHandle {
    /// Creates a handle with no parameters.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            parameters: HashMap::new(),
        }
    }

    /// Adds a named parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// A declarative skip predicate, evaluated by the external invoker.
///
/// Condition-skip is independent of error bypass: a condition-skipped node
/// still receives full start/complete notifications, but its action handle
/// is never invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// The external trigger the predicate is keyed by.
    pub trigger: String,
    /// Trigger-specific parameters.
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl Condition {
    /// Creates a condition keyed by the given trigger.
    #[must_use]
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            parameters: HashMap::new(),
        }
    }

    /// Adds a trigger parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Runtime state mutated by the scheduler during execution.
#[derive(Debug, Default)]
struct NodeRuntime {
    phase: NodePhase,
    status: NodeStatus,
    dry_mode: bool,
    error: Option<InvocationError>,
    outcome: Option<Outcome>,
}

/// One entity in the execution tree, either a container or a leaf.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    runtime_id: Uuid,
    kind: NodeKind,
    role: String,
    name: String,
    description: Option<String>,
    history_id: String,
    adapter: Option<String>,
    relation: Option<Relation>,
    parent: Option<NodeId>,
    optional: bool,
    attributes: HashMap<String, serde_json::Value>,
    condition: Option<Condition>,
    action: Option<ActionHandle>,
    sub_stages: [SubStage; 3],
    state: Mutex<NodeRuntime>,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: NodeId,
        kind: NodeKind,
        role: String,
        name: String,
        description: Option<String>,
        history_id: String,
        adapter: Option<String>,
        relation: Option<Relation>,
        parent: Option<NodeId>,
        optional: bool,
        attributes: HashMap<String, serde_json::Value>,
        condition: Option<Condition>,
        action: Option<ActionHandle>,
        sub_stages: [SubStage; 3],
    ) -> Self {
        Self {
            id,
            runtime_id: crate::utils::generate_uuid(),
            kind,
            role,
            name,
            description,
            history_id,
            adapter,
            relation,
            parent,
            optional,
            attributes,
            condition,
            action,
            sub_stages,
            state: Mutex::new(NodeRuntime::default()),
        }
    }

    /// Returns the arena id of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the globally unique runtime id.
    #[must_use]
    pub fn runtime_id(&self) -> Uuid {
        self.runtime_id
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns true if the node is a container.
    #[must_use]
    pub fn is_holder(&self) -> bool {
        self.kind == NodeKind::Holder
    }

    /// Returns true if the node is a leaf.
    #[must_use]
    pub fn is_invokable(&self) -> bool {
        self.kind == NodeKind::Invokable
    }

    /// Returns the node role (e.g. "suite", "feature", "test", "step").
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the node description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the stable history id.
    #[must_use]
    pub fn history_id(&self) -> &str {
        &self.history_id
    }

    /// Returns the adapter tag, if any.
    #[must_use]
    pub fn adapter(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    /// Returns the relation slot this node occupies under its parent.
    #[must_use]
    pub fn relation(&self) -> Option<Relation> {
        self.relation
    }

    /// Returns the parent node id; the root has none.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns true if a failure of this node is non-fatal for reporting.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns the free-form attributes.
    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, serde_json::Value> {
        &self.attributes
    }

    /// Returns the skip condition, if any.
    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Returns the action handle, if any.
    #[must_use]
    pub fn action(&self) -> Option<&ActionHandle> {
        self.action.as_ref()
    }

    /// Returns the sub-stage for a relation.
    #[must_use]
    pub fn sub_stage(&self, relation: Relation) -> &SubStage {
        &self.sub_stages[relation.index()]
    }

    /// Iterates the sub-stages in the fixed order Before, Target, After.
    pub fn sub_stages_in_order(&self) -> impl Iterator<Item = (Relation, &SubStage)> {
        Relation::ORDERED
            .into_iter()
            .map(move |r| (r, self.sub_stage(r)))
    }

    /// Returns true if this is a holder with zero children in all three
    /// relations. Such a node never leaves [`NodePhase::Created`] and no
    /// lifecycle events are ever published for it.
    #[must_use]
    pub fn is_empty_holder(&self) -> bool {
        self.is_holder() && self.sub_stages.iter().all(SubStage::is_empty)
    }

    /// Returns the current scheduling phase.
    #[must_use]
    pub fn phase(&self) -> NodePhase {
        self.state.lock().phase
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> NodeStatus {
        self.state.lock().status
    }

    /// Returns true if the node is in dry mode.
    #[must_use]
    pub fn is_dry_mode(&self) -> bool {
        self.state.lock().dry_mode
    }

    /// Returns the recorded error, if the node completed exceptionally.
    #[must_use]
    pub fn error(&self) -> Option<InvocationError> {
        self.state.lock().error.clone()
    }

    /// Returns the classified outcome, if the node completed exceptionally.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.state.lock().outcome
    }

    pub(crate) fn push_child(&mut self, relation: Relation, child: NodeId) {
        self.sub_stages[relation.index()].push(child);
    }

    pub(crate) fn set_sub_stage_bypass(&mut self, relation: Relation, bypass: BypassOptions) {
        self.sub_stages[relation.index()].set_bypass(bypass);
    }

    pub(crate) fn mark_scheduled(&self) {
        self.advance_phase(NodePhase::Scheduled);
    }

    pub(crate) fn mark_executing(&self) {
        self.advance_phase(NodePhase::Executing);
    }

    pub(crate) fn set_dry_mode(&self, dry: bool) {
        self.state.lock().dry_mode = dry;
    }

    /// Terminal transition to `Success`. Write-once.
    pub(crate) fn complete_successfully(&self) -> Result<(), StateError> {
        self.complete(NodeStatus::Success, None, None)
    }

    /// Terminal transition to `Skip`. Write-once.
    pub(crate) fn complete_with_skip(&self) -> Result<(), StateError> {
        self.complete(NodeStatus::Skip, None, None)
    }

    /// Terminal transition to `Error`. Write-once.
    pub(crate) fn complete_exceptionally(
        &self,
        error: InvocationError,
        outcome: Outcome,
    ) -> Result<(), StateError> {
        self.complete(NodeStatus::Error, Some(error), Some(outcome))
    }

    fn complete(
        &self,
        status: NodeStatus,
        error: Option<InvocationError>,
        outcome: Option<Outcome>,
    ) -> Result<(), StateError> {
        let mut state = self.state.lock();
        if state.phase == NodePhase::Completed {
            return Err(StateError::AlreadyCompleted(self.name.clone()));
        }
        state.phase = NodePhase::Completed;
        state.status = status;
        state.error = error;
        state.outcome = outcome;
        Ok(())
    }

    fn advance_phase(&self, to: NodePhase) {
        let mut state = self.state.lock();
        if to > state.phase {
            state.phase = to;
        }
    }
}

/// The assembled, structurally immutable execution tree.
#[derive(Debug)]
pub struct ExecutionTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ExecutionTree {
    pub(crate) fn new(nodes: Vec<Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    /// Returns the root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node for an id issued by this tree's builder.
    ///
    /// # Panics
    ///
    /// Panics if the id was issued by a different tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates all nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BypassOptions;

    fn leaf() -> Node {
        Node::new(
            NodeId(0),
            NodeKind::Invokable,
            "step".to_string(),
            "given a user".to_string(),
            None,
            "abc".to_string(),
            None,
            Some(Relation::Target),
            None,
            false,
            HashMap::new(),
            None,
            Some(ActionHandle::new("givenUser")),
            Default::default(),
        )
    }

    #[test]
    fn test_new_node_starts_created() {
        let node = leaf();
        assert_eq!(node.phase(), NodePhase::Created);
        assert_eq!(node.status(), NodeStatus::Started);
        assert!(!node.is_dry_mode());
        assert!(node.error().is_none());
    }

    #[test]
    fn test_phase_only_advances() {
        let node = leaf();
        node.mark_executing();
        node.mark_scheduled();
        assert_eq!(node.phase(), NodePhase::Executing);
    }

    #[test]
    fn test_completions_are_write_once() {
        let node = leaf();
        node.complete_successfully().unwrap();
        assert_eq!(node.phase(), NodePhase::Completed);
        assert_eq!(node.status(), NodeStatus::Success);

        let err = node.complete_with_skip().unwrap_err();
        assert_eq!(err, StateError::AlreadyCompleted("given a user".to_string()));
        assert_eq!(node.status(), NodeStatus::Success);
    }

    #[test]
    fn test_complete_exceptionally_records_error_and_outcome() {
        let node = leaf();
        let failure = InvocationError::new("AssertionError", "boom");
        node.complete_exceptionally(failure, Outcome::Failed).unwrap();

        assert_eq!(node.status(), NodeStatus::Error);
        assert_eq!(node.outcome(), Some(Outcome::Failed));
        assert_eq!(node.error().map(|e| e.class().to_string()), Some("AssertionError".to_string()));

        assert!(node
            .complete_exceptionally(InvocationError::new("X", "y"), Outcome::Error)
            .is_err());
    }

    #[test]
    fn test_sub_stage_order_contract() {
        let node = leaf();
        let relations: Vec<Relation> = node.sub_stages_in_order().map(|(r, _)| r).collect();
        assert_eq!(relations, vec![Relation::Before, Relation::Target, Relation::After]);
    }

    #[test]
    fn test_empty_holder_detection() {
        let mut holder = Node::new(
            NodeId(0),
            NodeKind::Holder,
            "test".to_string(),
            "login works".to_string(),
            None,
            "abc".to_string(),
            None,
            None,
            None,
            false,
            HashMap::new(),
            None,
            None,
            Default::default(),
        );
        assert!(holder.is_empty_holder());

        holder.push_child(Relation::Target, NodeId(1));
        assert!(!holder.is_empty_holder());

        // leaves are never "empty holders"
        assert!(!leaf().is_empty_holder());
    }

    #[test]
    fn test_set_sub_stage_bypass() {
        let mut holder = Node::new(
            NodeId(0),
            NodeKind::Holder,
            "test".to_string(),
            "login works".to_string(),
            None,
            "abc".to_string(),
            None,
            None,
            None,
            false,
            HashMap::new(),
            None,
            None,
            Default::default(),
        );
        holder.set_sub_stage_bypass(Relation::Target, BypassOptions::on_sub_stage_error());
        assert!(holder
            .sub_stage(Relation::Target)
            .bypass()
            .bypasses_on_sub_stage_error());
    }
}
