//! Scripted invoker and observer doubles.

use crate::errors::InvocationError;
use crate::events::ExecutionObserver;
use crate::invoker::NodeInvoker;
use crate::node::{Condition, Node};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// An invoker scripted per action target.
///
/// Targets fail with their configured error, everything else succeeds.
/// Conditions evaluate to "skip" when their trigger is registered. Every
/// real invocation is recorded in order.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    failures: HashMap<String, InvocationError>,
    skip_triggers: HashSet<String>,
    invoked: Mutex<Vec<String>>,
}

impl ScriptedInvoker {
    /// Creates an invoker where every action succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a failure for one action target.
    #[must_use]
    pub fn fail_target(mut self, target: impl Into<String>, error: InvocationError) -> Self {
        self.failures.insert(target.into(), error);
        self
    }

    /// Registers a condition trigger that evaluates to "skip".
    #[must_use]
    pub fn skip_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.skip_triggers.insert(trigger.into());
        self
    }

    /// Returns the invoked action targets in invocation order.
    #[must_use]
    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().clone()
    }

    /// Returns true if the given target was invoked.
    #[must_use]
    pub fn was_invoked(&self, target: &str) -> bool {
        self.invoked.lock().iter().any(|t| t == target)
    }
}

#[async_trait]
impl NodeInvoker for ScriptedInvoker {
    async fn invoke(&self, node: &Node) -> Result<(), InvocationError> {
        let target = node
            .action()
            .map_or_else(|| node.name().to_string(), |a| a.target.clone());
        self.invoked.lock().push(target.clone());

        match self.failures.get(&target) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn is_skipped_by_condition(&self, condition: &Condition) -> bool {
        self.skip_triggers.contains(&condition.trigger)
    }
}

/// An observer that panics on every notification.
///
/// Exists to verify that notification failures are swallowed by the
/// scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickyObserver;

impl ExecutionObserver for PanickyObserver {
    fn container_started(&self, node: &Node) {
        panic!("container_started({})", node.name());
    }

    fn container_finished(&self, node: &Node) {
        panic!("container_finished({})", node.name());
    }

    fn node_started(&self, node: &Node) {
        panic!("node_started({})", node.name());
    }

    fn node_completed(&self, node: &Node) {
        panic!("node_completed({})", node.name());
    }

    fn node_errored(&self, node: &Node, _error: &InvocationError) {
        panic!("node_errored({})", node.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ActionHandle, NodeBuilder, TreeBuilder};

    #[tokio::test]
    async fn test_scripted_invoker_records_and_fails() {
        let mut builder = TreeBuilder::new();
        let root = builder.set_root(NodeBuilder::holder("suite", "all")).unwrap();
        let ok = builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "ok step", ActionHandle::new("okStep")),
            )
            .unwrap();
        let bad = builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "bad step", ActionHandle::new("badStep")),
            )
            .unwrap();
        let tree = builder.build().unwrap();

        let invoker = ScriptedInvoker::new()
            .fail_target("badStep", InvocationError::new("AssertionError", "boom"));

        assert!(invoker.invoke(tree.node(ok)).await.is_ok());
        assert!(invoker.invoke(tree.node(bad)).await.is_err());
        assert_eq!(invoker.invoked(), vec!["okStep".to_string(), "badStep".to_string()]);
        assert!(invoker.was_invoked("okStep"));
        assert!(!invoker.was_invoked("missing"));
    }

    #[tokio::test]
    async fn test_scripted_invoker_condition_triggers() {
        let invoker = ScriptedInvoker::new().skip_trigger("wip");
        assert!(invoker.is_skipped_by_condition(&Condition::new("wip")).await);
        assert!(!invoker.is_skipped_by_condition(&Condition::new("smoke")).await);
    }
}
