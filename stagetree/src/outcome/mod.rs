//! Outcome classification for action failures.
//!
//! Maps a raised [`InvocationError`] onto a terminal category. The mapping is
//! orthogonal to the tree scheduler but feeds the failing node's terminal
//! state and the observer notifications.

use crate::errors::InvocationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The terminal category of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The failure signals an intentional skip.
    Skipped,
    /// An assertion-style failure: the step ran and its check failed.
    Failed,
    /// The step is declared but not yet implemented.
    Pending,
    /// Any other failure.
    Error,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::Pending => write!(f, "pending"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Classifies invocation errors into [`Outcome`] categories.
///
/// Three inputs drive the classification: a set of error class names meaning
/// "skip", a set meaning "fail", and a set of markers meaning "pending".
/// Wrapped async layers are unwrapped to the root cause before matching.
/// Unclassified errors default to [`Outcome::Error`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeClassifier {
    #[serde(default)]
    skip_classes: HashSet<String>,
    #[serde(default)]
    fail_classes: HashSet<String>,
    #[serde(default)]
    pending_markers: HashSet<String>,
}

impl OutcomeClassifier {
    /// Creates a classifier with empty class and marker sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A preset covering the conventional BDD adapter error names.
    #[must_use]
    pub fn bdd_defaults() -> Self {
        Self::new()
            .with_skip_class("SkipException")
            .with_fail_class("AssertionError")
            .with_pending_marker("pending")
    }

    /// Adds an error class name that classifies as skip.
    #[must_use]
    pub fn with_skip_class(mut self, class: impl Into<String>) -> Self {
        self.skip_classes.insert(class.into());
        self
    }

    /// Adds an error class name that classifies as failed.
    #[must_use]
    pub fn with_fail_class(mut self, class: impl Into<String>) -> Self {
        self.fail_classes.insert(class.into());
        self
    }

    /// Adds a marker that classifies as pending.
    #[must_use]
    pub fn with_pending_marker(mut self, marker: impl Into<String>) -> Self {
        self.pending_markers.insert(marker.into());
        self
    }

    /// Classifies an invocation error.
    #[must_use]
    pub fn classify(&self, error: &InvocationError) -> Outcome {
        let cause = error.root_cause();

        if self.skip_classes.contains(cause.class()) {
            return Outcome::Skipped;
        }
        if cause
            .markers()
            .iter()
            .any(|m| self.pending_markers.contains(m))
        {
            return Outcome::Pending;
        }
        if self.fail_classes.contains(cause.class()) {
            return Outcome::Failed;
        }
        Outcome::Error
    }
}
