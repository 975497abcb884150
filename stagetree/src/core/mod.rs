//! Core enums and value types shared across the engine.
//!
//! This module provides:
//! - Node phase and status state machines
//! - Sub-stage relations with their fixed scheduling order
//! - Bypass policy flags

mod relation;
mod status;

pub use relation::{BypassOptions, Relation, SubStage};
pub use status::{NodePhase, NodeStatus};
