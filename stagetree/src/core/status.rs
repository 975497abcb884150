//! Node phase and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The scheduling phase of a node.
///
/// Phases are monotonic: a node only ever moves forward through
/// `Created` → `Scheduled` → `Executing` → `Completed`. An empty holder
/// never leaves `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePhase {
    /// The node exists but has not been picked up by the scheduler.
    Created,
    /// The node has been scheduled into a sub-stage run.
    Scheduled,
    /// The node's invocation (or stage processing) has begun.
    Executing,
    /// The node reached a terminal status.
    Completed,
}

impl Default for NodePhase {
    fn default() -> Self {
        Self::Created
    }
}

impl fmt::Display for NodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// The execution status of a node.
///
/// `Started` is the initial value; the terminal statuses are written exactly
/// once, when the phase becomes [`NodePhase::Completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// The node has not reached a terminal status yet.
    Started,
    /// The node was skipped (dry mode, bypass or condition).
    Skip,
    /// The node completed successfully.
    Success,
    /// The node failed.
    Error,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Started
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Skip => write!(f, "skip"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl NodeStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started)
    }

    /// Returns true if the status indicates the node did not fail.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::Skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(NodePhase::Created.to_string(), "created");
        assert_eq!(NodePhase::Scheduled.to_string(), "scheduled");
        assert_eq!(NodePhase::Executing.to_string(), "executing");
        assert_eq!(NodePhase::Completed.to_string(), "completed");
    }

    #[test]
    fn test_phase_ordering_is_monotonic() {
        assert!(NodePhase::Created < NodePhase::Scheduled);
        assert!(NodePhase::Scheduled < NodePhase::Executing);
        assert!(NodePhase::Executing < NodePhase::Completed);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(NodeStatus::Started.to_string(), "started");
        assert_eq!(NodeStatus::Skip.to_string(), "skip");
        assert_eq!(NodeStatus::Success.to_string(), "success");
        assert_eq!(NodeStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!NodeStatus::Started.is_terminal());
        assert!(NodeStatus::Skip.is_terminal());
        assert!(NodeStatus::Success.is_terminal());
        assert!(NodeStatus::Error.is_terminal());
    }

    #[test]
    fn test_status_serialize() {
        let status = NodeStatus::Success;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#""success""#);

        let deserialized: NodeStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, NodeStatus::Success);
    }
}
