//! The external invoker contract.
//!
//! Adapters implement [`NodeInvoker`] to resolve a leaf's opaque action
//! handle against a real callable and to evaluate declarative skip
//! conditions against their trigger source (configuration, environment).

use crate::errors::InvocationError;
use crate::node::{Condition, Node};
use async_trait::async_trait;

/// Executes leaf actions and evaluates skip conditions for the engine.
#[async_trait]
pub trait NodeInvoker: Send + Sync {
    /// Executes the node's action handle.
    ///
    /// # Errors
    ///
    /// Returns the adapter-described failure; the engine classifies it and
    /// records it on the node, it never aborts the run.
    async fn invoke(&self, node: &Node) -> Result<(), InvocationError>;

    /// Evaluates a node's declarative skip condition.
    async fn is_skipped_by_condition(&self, condition: &Condition) -> bool;
}

/// An invoker that treats every action as an immediate success and never
/// skips. Useful as a default and for structural tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpInvoker;

#[async_trait]
impl NodeInvoker for NoOpInvoker {
    async fn invoke(&self, _node: &Node) -> Result<(), InvocationError> {
        Ok(())
    }

    async fn is_skipped_by_condition(&self, _condition: &Condition) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ActionHandle, NodeBuilder, TreeBuilder};

    #[tokio::test]
    async fn test_noop_invoker() {
        let mut builder = TreeBuilder::new();
        let root = builder.set_root(NodeBuilder::holder("suite", "all")).unwrap();
        let leaf = builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "a step", ActionHandle::new("aStep")),
            )
            .unwrap();
        let tree = builder.build().unwrap();

        let invoker = NoOpInvoker;
        assert!(invoker.invoke(tree.node(leaf)).await.is_ok());
        assert!(!invoker.is_skipped_by_condition(&Condition::new("env")).await);
    }
}
