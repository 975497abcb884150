//! Tree-assembly surface consumed by discovery adapters.
//!
//! Adapters describe each stage with a [`NodeBuilder`] and hang it onto the
//! tree through a [`TreeBuilder`]. Required fields are enforced here, at
//! construction, so an assembled [`ExecutionTree`] is valid by definition.

use super::{ActionHandle, Condition, ExecutionTree, Node, NodeId, NodeKind};
use crate::core::{BypassOptions, Relation, SubStage};
use crate::errors::BuildError;
use std::collections::HashMap;

/// Configuration for a single node, validated on append.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    kind: NodeKind,
    role: String,
    name: String,
    description: Option<String>,
    history_id: Option<String>,
    adapter: Option<String>,
    optional: bool,
    attributes: HashMap<String, serde_json::Value>,
    condition: Option<Condition>,
    action: Option<ActionHandle>,
    bypass: [BypassOptions; 3],
}

impl NodeBuilder {
    /// Starts a container node description.
    #[must_use]
    pub fn holder(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(NodeKind::Holder, role, name, None)
    }

    /// Starts a leaf node description carrying its action handle.
    #[must_use]
    pub fn invokable(
        role: impl Into<String>,
        name: impl Into<String>,
        action: ActionHandle,
    ) -> Self {
        Self::new(NodeKind::Invokable, role, name, Some(action))
    }

    fn new(
        kind: NodeKind,
        role: impl Into<String>,
        name: impl Into<String>,
        action: Option<ActionHandle>,
    ) -> Self {
        Self {
            kind,
            role: role.into(),
            name: name.into(),
            description: None,
            history_id: None,
            adapter: None,
            optional: false,
            attributes: HashMap::new(),
            condition: None,
            action,
            bypass: [BypassOptions::NONE; 3],
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets an explicit history id; derived from role/adapter/name otherwise.
    #[must_use]
    pub fn with_history_id(mut self, history_id: impl Into<String>) -> Self {
        self.history_id = Some(history_id.into());
        self
    }

    /// Sets the adapter tag. Children without one inherit their parent's.
    #[must_use]
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    /// Marks a failure of this node as non-fatal for reporting.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Adds a free-form attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Attaches a declarative skip condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the bypass policy for one of this node's own sub-stages.
    #[must_use]
    pub fn with_bypass(mut self, relation: Relation, bypass: BypassOptions) -> Self {
        self.bypass[relation.index()] = bypass;
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.role.trim().is_empty() {
            return Err(BuildError::EmptyRole);
        }
        if self.name.trim().is_empty() {
            return Err(BuildError::EmptyName);
        }
        Ok(())
    }
}

/// Arena-backed builder producing an [`ExecutionTree`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl TreeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the single root holder of the tree.
    pub fn set_root(&mut self, builder: NodeBuilder) -> Result<NodeId, BuildError> {
        if self.root.is_some() {
            return Err(BuildError::RootAlreadySet);
        }
        if builder.kind != NodeKind::Holder {
            return Err(BuildError::RootNotHolder);
        }
        let id = self.materialize(builder, None, None)?;
        self.root = Some(id);
        Ok(id)
    }

    /// Appends a container child to the parent's TARGET sub-stage.
    pub fn add_container_target(
        &mut self,
        parent: NodeId,
        builder: NodeBuilder,
    ) -> Result<NodeId, BuildError> {
        self.append(parent, Relation::Target, builder)
    }

    /// Appends an invokable child to the parent's TARGET sub-stage.
    pub fn add_invokable_target(
        &mut self,
        parent: NodeId,
        builder: NodeBuilder,
    ) -> Result<NodeId, BuildError> {
        self.append(parent, Relation::Target, builder)
    }

    /// Appends an invokable child to the parent's BEFORE sub-stage.
    pub fn add_invokable_before(
        &mut self,
        parent: NodeId,
        builder: NodeBuilder,
    ) -> Result<NodeId, BuildError> {
        self.append(parent, Relation::Before, builder)
    }

    /// Appends an invokable child to the parent's AFTER sub-stage.
    pub fn add_invokable_after(
        &mut self,
        parent: NodeId,
        builder: NodeBuilder,
    ) -> Result<NodeId, BuildError> {
        self.append(parent, Relation::After, builder)
    }

    /// Finishes assembly.
    pub fn build(self) -> Result<ExecutionTree, BuildError> {
        let root = self.root.ok_or(BuildError::MissingRoot)?;
        Ok(ExecutionTree::new(self.nodes, root))
    }

    fn append(
        &mut self,
        parent: NodeId,
        relation: Relation,
        builder: NodeBuilder,
    ) -> Result<NodeId, BuildError> {
        let parent_node = self
            .nodes
            .get(parent.0)
            .ok_or(BuildError::UnknownParent(parent.0))?;
        if parent_node.is_invokable() {
            return Err(BuildError::ChildrenOnLeaf(parent_node.name().to_string()));
        }
        let inherited = parent_node.adapter().map(String::from);

        let id = self.materialize(builder, Some(relation), Some(parent))?;
        if self.nodes[id.0].adapter.is_none() {
            self.nodes[id.0].adapter = inherited;
        }
        self.nodes[parent.0].push_child(relation, id);
        Ok(id)
    }

    fn materialize(
        &mut self,
        builder: NodeBuilder,
        relation: Option<Relation>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, BuildError> {
        builder.validate()?;

        let id = NodeId(self.nodes.len());
        let history_id = builder.history_id.clone().unwrap_or_else(|| {
            crate::utils::history_id(&builder.role, builder.adapter.as_deref(), &builder.name)
        });
        let sub_stages = [
            SubStage::new(builder.bypass[0]),
            SubStage::new(builder.bypass[1]),
            SubStage::new(builder.bypass[2]),
        ];
        self.nodes.push(Node::new(
            id,
            builder.kind,
            builder.role,
            builder.name,
            builder.description,
            history_id,
            builder.adapter,
            relation,
            parent,
            builder.optional,
            builder.attributes,
            builder.condition,
            builder.action,
            sub_stages,
        ));
        Ok(id)
    }
}
