//! # Stagetree
//!
//! A hierarchical stage-tree execution engine for BDD-style test frameworks.
//!
//! Stagetree runs a tree of stages (suite → feature → test → step) in which
//! every container owns three ordered sub-stages — BEFORE, TARGET, AFTER —
//! with support for:
//!
//! - **Barriered scheduling**: each sub-stage fully resolves, nested
//!   recursion included, before the next one starts
//! - **Bypass cascades**: per-sub-stage policy skips nodes when an ancestor
//!   or sibling sub-stage already failed
//! - **Condition gating**: declarative skip predicates evaluated by an
//!   external invoker, independent of failures
//! - **Outcome classification**: mapping raised errors onto terminal
//!   skip/failed/pending/error categories
//! - **Lifecycle observation**: container and node notifications for
//!   reporting integrations, decoupled from the core
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagetree::prelude::*;
//! use std::sync::Arc;
//!
//! // Assemble a tree
//! let mut builder = TreeBuilder::new();
//! let test = builder.set_root(NodeBuilder::holder("test", "login works"))?;
//! builder.add_invokable_target(
//!     test,
//!     NodeBuilder::invokable("step", "click login", ActionHandle::new("clickLogin")),
//! )?;
//! let tree = builder.build()?;
//!
//! // Execute it through an adapter-provided invoker
//! let executor = TreeExecutor::new(Arc::new(MyInvoker));
//! let summary = executor.execute_root(&tree).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod invoker;
pub mod node;
pub mod outcome;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::ExecutionContext;
    pub use crate::core::{BypassOptions, NodePhase, NodeStatus, Relation, SubStage};
    pub use crate::errors::{BuildError, InvocationError, StateError};
    pub use crate::events::{
        CollectingObserver, EventKind, EventRecord, ExecutionObserver, LoggingObserver,
        NoOpObserver,
    };
    pub use crate::executor::{ExecutorConfig, RunSummary, StatusCounts, TreeExecutor};
    pub use crate::invoker::{NodeInvoker, NoOpInvoker};
    pub use crate::node::{
        ActionHandle, Condition, ExecutionTree, Node, NodeBuilder, NodeId, NodeKind, TreeBuilder,
    };
    pub use crate::outcome::{Outcome, OutcomeClassifier};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_exposes_the_assembly_surface() {
        let mut builder = TreeBuilder::new();
        let root = builder
            .set_root(NodeBuilder::holder("suite", "all"))
            .unwrap();
        builder
            .add_invokable_target(
                root,
                NodeBuilder::invokable("step", "a step", ActionHandle::new("aStep")),
            )
            .unwrap();
        let tree = builder.build().unwrap();
        assert_eq!(tree.len(), 2);
    }
}
