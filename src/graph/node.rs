// src/graph/node.rs

//! Work-breakdown nodes stored in the graph arena.

use chrono::NaiveDate;

use crate::types::{Duration, EntityType, NodeKey};
use crate::workflow::status::NodeStatus;

/// A schedulable unit: stage, task, step or assignment.
///
/// Nodes are never removed from a project; they only move to a terminal
/// status. All status changes go through the workflow state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkNode {
    pub key: NodeKey,
    pub name: String,
    /// `None` when no estimate has been recorded.
    pub duration: Option<Duration>,
    pub status: NodeStatus,
    /// Step → task → stage containment.
    pub parent: Option<NodeKey>,
    /// Baseline dates as persisted by the planner, not by the calculator.
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    /// Completion percentage, 0..=100.
    pub completion: u8,
    /// Set by the Block action; cleared by Unblock.
    pub blocked_reason: Option<String>,
    /// Why the node was held, declined or cancelled; cleared by Resume.
    pub status_reason: Option<String>,
    pub assignee: Option<String>,
    /// Identity of whoever applied the last action (audit only).
    pub last_actor: Option<String>,
}

impl WorkNode {
    pub fn new(key: NodeKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            duration: None,
            status: NodeStatus::initial_for(key.kind),
            parent: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            completion: 0,
            blocked_reason: None,
            status_reason: None,
            assignee: None,
            last_actor: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_parent(mut self, parent: NodeKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_actual_start(mut self, date: NaiveDate) -> Self {
        self.actual_start = Some(date);
        self
    }

    pub fn with_actual_end(mut self, date: NaiveDate) -> Self {
        self.actual_end = Some(date);
        self
    }

    pub fn kind(&self) -> EntityType {
        self.key.kind
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_reason.is_some()
    }
}
