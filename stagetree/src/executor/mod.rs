//! The tree scheduler.
//!
//! [`TreeExecutor`] walks the assembled tree stage by stage: for every
//! container it resolves the BEFORE sub-stage (nested recursion included)
//! before TARGET, and TARGET before AFTER, then derives the container's
//! terminal status from the shared bookkeeping. Failures are recorded on the
//! failing node and bubble exactly one tree level per hop; AFTER sub-stages
//! still run after earlier failures unless their own bypass policy says
//! otherwise.


use crate::context::ExecutionContext;
use crate::core::{BypassOptions, NodeStatus, Relation};
use crate::errors::InvocationError;
use crate::events::{ExecutionObserver, NoOpObserver};
use crate::invoker::NodeInvoker;
use crate::node::{ExecutionTree, NodeId, NodeKind};
use crate::outcome::OutcomeClassifier;
use crate::utils::Timestamp;
use futures::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorConfig {
    /// Fan sibling nodes of one sub-stage out concurrently instead of
    /// running them sequentially in declaration order. The sub-stage join
    /// barrier holds in both modes.
    pub parallel_siblings: bool,
}

impl ExecutorConfig {
    /// Enables concurrent sibling execution within each sub-stage.
    #[must_use]
    pub fn with_parallel_siblings(mut self) -> Self {
        self.parallel_siblings = true;
        self
    }
}

/// Per-status node counts over a finished tree.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    /// Nodes that completed successfully.
    pub success: usize,
    /// Nodes that completed with skip.
    pub skipped: usize,
    /// Nodes that completed exceptionally.
    pub errored: usize,
    /// Nodes that never ran (empty holders and their kin).
    pub untouched: usize,
}

/// Result of one tree run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Terminal status of the root node.
    pub root_status: NodeStatus,
    /// Wall time of the run in milliseconds.
    pub duration_ms: f64,
    /// When the run finished.
    pub finished_at: Timestamp,
    /// Per-status node counts.
    pub counts: StatusCounts,
}

impl RunSummary {
    fn capture(tree: &ExecutionTree, duration_ms: f64) -> Self {
        let mut counts = StatusCounts::default();
        for node in tree.nodes() {
            match node.status() {
                NodeStatus::Success => counts.success += 1,
                NodeStatus::Skip => counts.skipped += 1,
                NodeStatus::Error => counts.errored += 1,
                NodeStatus::Started => counts.untouched += 1,
            }
        }
        Self {
            root_status: tree.node(tree.root()).status(),
            duration_ms,
            finished_at: chrono::Utc::now(),
            counts,
        }
    }

    /// Returns true if the root did not fail.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.root_status != NodeStatus::Error
    }
}

/// The hierarchical stage scheduler.
pub struct TreeExecutor {
    invoker: Arc<dyn NodeInvoker>,
    observer: Arc<dyn ExecutionObserver>,
    classifier: OutcomeClassifier,
    context: Arc<ExecutionContext>,
    config: ExecutorConfig,
}

impl TreeExecutor {
    /// Creates an executor around an invoker, with a no-op observer and a
    /// default classifier.
    #[must_use]
    pub fn new(invoker: Arc<dyn NodeInvoker>) -> Self {
        Self {
            invoker,
            observer: Arc::new(NoOpObserver),
            classifier: OutcomeClassifier::default(),
            context: Arc::new(ExecutionContext::new()),
            config: ExecutorConfig::default(),
        }
    }

    /// Sets the lifecycle observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the outcome classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: OutcomeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sets the execution options.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the shared bookkeeping context.
    #[must_use]
    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }

    /// Runs the whole tree: registers the root with the shared context,
    /// processes it as a TARGET stage and settles its bookkeeping.
    ///
    /// Never fails: action errors are recorded on their nodes and bubble as
    /// container statuses, not as a scheduler result.
    pub async fn execute_root(&self, tree: &ExecutionTree) -> RunSummary {
        let started = Instant::now();
        let root = tree.root();

        self.context.start(root);
        self.process_stage(tree, root).await;
        self.context.complete_stage(root);

        RunSummary::capture(tree, started.elapsed().as_secs_f64() * 1000.0)
    }

    /// Processes one container: sub-stages in order BEFORE, TARGET, AFTER,
    /// with a join barrier between them, then terminal-status derivation.
    fn process_stage<'a>(&'a self, tree: &'a ExecutionTree, holder_id: NodeId) -> BoxFuture<'a, ()> {
        async move {
            let holder = tree.node(holder_id);
            if holder.is_empty_holder() {
                return;
            }

            holder.mark_executing();
            self.notify("container.started", || self.observer.container_started(holder));

            for relation in Relation::ORDERED {
                let sub_stage = holder.sub_stage(relation);
                if sub_stage.is_empty() {
                    continue;
                }
                let bypass = sub_stage.bypass();
                if self.config.parallel_siblings {
                    let runs = sub_stage
                        .children()
                        .iter()
                        .map(|&child| self.run_sub_stage_node(tree, holder_id, child, bypass));
                    future::join_all(runs).await;
                } else {
                    for &child in sub_stage.children() {
                        self.run_sub_stage_node(tree, holder_id, child, bypass).await;
                    }
                }
            }

            if self.context.has_stage_exception(holder_id) {
                let error = self
                    .context
                    .stage_error(holder_id)
                    .unwrap_or_else(|| InvocationError::new("StageError", "sub-stage failed"));
                let outcome = self.classifier.classify(&error);
                if let Err(state) = holder.complete_exceptionally(error.clone(), outcome) {
                    warn!(error = %state, "container completion rejected");
                }
                self.context.report_stage_exception(holder, error);
            } else if holder.is_dry_mode() {
                if let Err(state) = holder.complete_with_skip() {
                    warn!(error = %state, "container completion rejected");
                }
            } else if let Err(state) = holder.complete_successfully() {
                warn!(error = %state, "container completion rejected");
            }

            self.notify("container.finished", || self.observer.container_finished(holder));
        }
        .boxed()
    }

    /// Schedules one sub-stage node: condition evaluation, start
    /// notification, bypass decision, invocation and error bookkeeping.
    async fn run_sub_stage_node(
        &self,
        tree: &ExecutionTree,
        holder_id: NodeId,
        node_id: NodeId,
        bypass: BypassOptions,
    ) {
        let node = tree.node(node_id);
        if node.is_empty_holder() {
            return;
        }

        self.context.start(node_id);
        node.mark_scheduled();

        let condition_skip = match node.condition() {
            Some(condition) => self.invoker.is_skipped_by_condition(condition).await,
            None => false,
        };

        if node.is_invokable() {
            self.notify("node.started", || self.observer.node_started(node));
        }

        let holder = tree.node(holder_id);
        let stage_failed = holder
            .parent()
            .is_some_and(|grand| self.context.has_stage_exception(grand));
        let sibling_failed = self.context.has_stage_exception(holder_id);
        if holder.is_dry_mode()
            || (bypass.bypasses_on_stage_error() && stage_failed)
            || (bypass.bypasses_on_sub_stage_error() && sibling_failed)
        {
            node.set_dry_mode(true);
        }

        match self.invoke_node(tree, node_id, condition_skip).await {
            Ok(()) => self.context.complete_stage(node_id),
            Err(error) => {
                let outcome = self.classifier.classify(&error);
                if let Err(state) = node.complete_exceptionally(error.clone(), outcome) {
                    warn!(error = %state, "node completion rejected");
                }
                self.notify("node.errored", || self.observer.node_errored(node, &error));
                self.context.report_stage_exception(node, error);
            }
        }
    }

    /// Invokes one node: a holder delegates to the recursive stage
    /// processor, an invokable either completes with skip or runs its
    /// action handle through the external invoker.
    async fn invoke_node(
        &self,
        tree: &ExecutionTree,
        node_id: NodeId,
        skip: bool,
    ) -> Result<(), InvocationError> {
        let node = tree.node(node_id);
        match node.kind() {
            NodeKind::Holder => {
                if skip {
                    node.set_dry_mode(true);
                }
                self.process_stage(tree, node_id).await;
                Ok(())
            }
            NodeKind::Invokable => {
                node.mark_executing();
                if skip || node.is_dry_mode() {
                    if let Err(state) = node.complete_with_skip() {
                        warn!(error = %state, "node completion rejected");
                    }
                    self.notify("node.completed", || self.observer.node_completed(node));
                    return Ok(());
                }
                self.invoker.invoke(node).await?;
                if let Err(state) = node.complete_successfully() {
                    warn!(error = %state, "node completion rejected");
                }
                self.notify("node.completed", || self.observer.node_completed(node));
                Ok(())
            }
        }
    }

    /// Runs a notification, logging and swallowing observer panics so
    /// bookkeeping failures never affect execution outcome.
    fn notify<F: FnOnce()>(&self, notification: &str, f: F) {
        if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
            warn!(notification, "execution observer panicked; continuing");
        }
    }
}
