// src/graph/edge.rs

//! Finish-to-start dependency edges and their derived status.

use std::fmt;

use crate::graph::node::WorkNode;
use crate::types::{DependencyType, NodeKey};

/// Index of an edge in the graph's edge arena.
pub type EdgeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStatus {
    /// Predecessor has not completed yet.
    Pending,
    /// Predecessor completed. Never reverts on its own.
    Satisfied,
    /// Predecessor was cancelled/declined or carries a blocking marker.
    Blocked,
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeStatus::Pending => "PENDING",
            EdgeStatus::Satisfied => "SATISFIED",
            EdgeStatus::Blocked => "BLOCKED",
        };
        f.write_str(s)
    }
}

/// "`dependent` may not start until `depends_on` finishes + `lag_days`."
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEdge {
    pub id: EdgeId,
    pub dependent: NodeKey,
    pub depends_on: NodeKey,
    pub dependency_type: DependencyType,
    pub lag_days: i64,
    pub status: EdgeStatus,
    /// Analytics cache written from the last schedule snapshot.
    pub is_critical_path: bool,
    pub slack_days: i64,
}

impl DependencyEdge {
    pub(crate) fn new(id: EdgeId, dependent: NodeKey, depends_on: NodeKey, lag_days: i64) -> Self {
        Self {
            id,
            dependent,
            depends_on,
            dependency_type: DependencyType::FinishToStart,
            lag_days,
            status: EdgeStatus::Pending,
            is_critical_path: false,
            slack_days: 0,
        }
    }
}

/// Edge status implied by the predecessor's current state.
///
/// `Satisfied` is sticky: once reached it is returned regardless of what the
/// predecessor does afterwards.
pub fn derive_edge_status(current: EdgeStatus, predecessor: &WorkNode) -> EdgeStatus {
    if current == EdgeStatus::Satisfied || predecessor.status.is_complete() {
        EdgeStatus::Satisfied
    } else if predecessor.status.is_dead() || predecessor.is_blocked() {
        EdgeStatus::Blocked
    } else {
        EdgeStatus::Pending
    }
}
