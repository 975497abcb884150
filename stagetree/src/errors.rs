//! Error types for the stagetree engine.
//!
//! Three families live here: `InvocationError` (a failure raised by a node's
//! action handle, the payload that bubbles through the tree), `StateError`
//! (lifecycle contract violations) and `BuildError` (tree-assembly
//! validation failures).

use thiserror::Error;

/// A failure raised while invoking a node's action handle.
///
/// The engine never inspects adapter error types directly; adapters describe
/// their failure with a class name (the analogue of an exception class), a
/// message and optional markers. The outcome classifier maps these onto a
/// terminal category.
#[derive(Debug, Clone, Error)]
#[error("{class}: {message}")]
pub struct InvocationError {
    class: String,
    message: String,
    markers: Vec<String>,
    wrapper: bool,
    #[source]
    cause: Option<Box<InvocationError>>,
}

impl InvocationError {
    /// Creates a new invocation error with a class name and message.
    #[must_use]
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            markers: Vec::new(),
            wrapper: false,
            cause: None,
        }
    }

    /// Creates an error from an opaque adapter failure.
    ///
    /// The cause is flattened to its display form; adapters that need
    /// classification should construct the error explicitly instead.
    #[must_use]
    pub fn from_cause(class: impl Into<String>, cause: &anyhow::Error) -> Self {
        Self::new(class, cause.to_string())
    }

    /// Wraps an error in an async-completion layer.
    ///
    /// The classifier unwraps these to the root cause before matching.
    #[must_use]
    pub fn wrapped(cause: Self) -> Self {
        Self {
            class: "WrappedCompletionError".to_string(),
            message: cause.to_string(),
            markers: Vec::new(),
            wrapper: true,
            cause: Some(Box::new(cause)),
        }
    }

    /// Adds a marker used for pending-outcome classification.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// Returns the error class name.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the markers attached to this error.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Returns true if the given marker is attached.
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }

    /// Returns true if this error is an async-completion wrapper.
    #[must_use]
    pub fn is_wrapper(&self) -> bool {
        self.wrapper
    }

    /// Follows wrapper layers down to the real cause.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while current.wrapper {
            match current.cause.as_deref() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }
}

/// A violation of the node lifecycle contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A terminal completion was attempted twice.
    #[error("node '{0}' is already completed")]
    AlreadyCompleted(String),
}

/// A tree-assembly validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The node role was empty or whitespace-only.
    #[error("node role cannot be empty or whitespace-only")]
    EmptyRole,

    /// The node name was empty or whitespace-only.
    #[error("node name cannot be empty or whitespace-only")]
    EmptyName,

    /// A child was appended to an invokable node.
    #[error("invokable node '{0}' cannot own children")]
    ChildrenOnLeaf(String),

    /// The referenced parent id was not issued by this builder.
    #[error("unknown parent node id {0}")]
    UnknownParent(usize),

    /// A second root was supplied.
    #[error("tree already has a root")]
    RootAlreadySet,

    /// The root must be a holder.
    #[error("tree root must be a holder node")]
    RootNotHolder,

    /// `build` was called before a root was supplied.
    #[error("tree has no root")]
    MissingRoot,
}
