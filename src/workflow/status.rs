// src/workflow/status.rs

//! Lifecycle status per node kind.
//!
//! Stages, tasks and steps share [`WorkStatus`]; assignments have their own
//! [`AssignmentStatus`]. [`NodeStatus`] tags the two so a node carries exactly
//! one, and [`NodeStatus::is_valid_for`] closes the set of legal
//! `(kind, status)` pairs.

use std::fmt;

use crate::types::EntityType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkStatus {
    NotStarted,
    /// Steps only.
    ReadyToStart,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Work(WorkStatus),
    Assignment(AssignmentStatus),
}

impl NodeStatus {
    /// Status a freshly created node of this kind starts in.
    pub fn initial_for(kind: EntityType) -> Self {
        match kind {
            EntityType::Assignment => NodeStatus::Assignment(AssignmentStatus::Pending),
            EntityType::Stage | EntityType::Task | EntityType::Step => {
                NodeStatus::Work(WorkStatus::NotStarted)
            }
        }
    }

    pub fn is_valid_for(&self, kind: EntityType) -> bool {
        match (kind, self) {
            (EntityType::Assignment, NodeStatus::Assignment(_)) => true,
            (EntityType::Step, NodeStatus::Work(_)) => true,
            (EntityType::Stage | EntityType::Task, NodeStatus::Work(s)) => {
                *s != WorkStatus::ReadyToStart
            }
            _ => false,
        }
    }

    /// Whether a dependency on this node counts as satisfied.
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            NodeStatus::Work(WorkStatus::Completed)
                | NodeStatus::Assignment(AssignmentStatus::Accepted)
        )
    }

    /// Cancelled or declined: the node will never complete.
    pub fn is_dead(&self) -> bool {
        matches!(
            self,
            NodeStatus::Work(WorkStatus::Cancelled)
                | NodeStatus::Assignment(AssignmentStatus::Cancelled)
                | NodeStatus::Assignment(AssignmentStatus::Declined)
        )
    }

    /// No further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Work(WorkStatus::Completed) | NodeStatus::Work(WorkStatus::Cancelled)
        ) || matches!(
            self,
            NodeStatus::Assignment(AssignmentStatus::Declined)
                | NodeStatus::Assignment(AssignmentStatus::Cancelled)
        )
    }

    pub fn is_not_started(&self) -> bool {
        matches!(
            self,
            NodeStatus::Work(WorkStatus::NotStarted)
                | NodeStatus::Work(WorkStatus::ReadyToStart)
                | NodeStatus::Assignment(AssignmentStatus::Pending)
        )
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, NodeStatus::Work(WorkStatus::InProgress))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Work(WorkStatus::NotStarted) => "NOT_STARTED",
            NodeStatus::Work(WorkStatus::ReadyToStart) => "READY_TO_START",
            NodeStatus::Work(WorkStatus::InProgress) => "IN_PROGRESS",
            NodeStatus::Work(WorkStatus::OnHold) => "ON_HOLD",
            NodeStatus::Work(WorkStatus::Completed) => "COMPLETED",
            NodeStatus::Work(WorkStatus::Cancelled) => "CANCELLED",
            NodeStatus::Assignment(AssignmentStatus::Pending) => "PENDING",
            NodeStatus::Assignment(AssignmentStatus::Accepted) => "ACCEPTED",
            NodeStatus::Assignment(AssignmentStatus::Declined) => "DECLINED",
            NodeStatus::Assignment(AssignmentStatus::Cancelled) => "CANCELLED",
        }
    }

    /// Parse a status name (`"in_progress"`, `"IN_PROGRESS"`, ...) for a
    /// node of the given kind.
    pub fn parse_for(kind: EntityType, s: &str) -> Result<Self, String> {
        let norm = s.trim().to_uppercase().replace(['-', ' '], "_");
        let status = match (kind, norm.as_str()) {
            (EntityType::Assignment, "PENDING") => NodeStatus::Assignment(AssignmentStatus::Pending),
            (EntityType::Assignment, "ACCEPTED") => NodeStatus::Assignment(AssignmentStatus::Accepted),
            (EntityType::Assignment, "DECLINED") => NodeStatus::Assignment(AssignmentStatus::Declined),
            (EntityType::Assignment, "CANCELLED") => {
                NodeStatus::Assignment(AssignmentStatus::Cancelled)
            }
            (EntityType::Assignment, other) => {
                return Err(format!("invalid assignment status: {other}"));
            }
            (_, "NOT_STARTED") => NodeStatus::Work(WorkStatus::NotStarted),
            (_, "READY_TO_START") => NodeStatus::Work(WorkStatus::ReadyToStart),
            (_, "IN_PROGRESS") => NodeStatus::Work(WorkStatus::InProgress),
            (_, "ON_HOLD") => NodeStatus::Work(WorkStatus::OnHold),
            (_, "COMPLETED") => NodeStatus::Work(WorkStatus::Completed),
            (_, "CANCELLED") => NodeStatus::Work(WorkStatus::Cancelled),
            (_, other) => return Err(format!("invalid {kind} status: {other}")),
        };

        if !status.is_valid_for(kind) {
            return Err(format!("status {status} is not valid for a {kind}"));
        }
        Ok(status)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_to_start_is_step_only() {
        let ready = NodeStatus::Work(WorkStatus::ReadyToStart);
        assert!(ready.is_valid_for(EntityType::Step));
        assert!(!ready.is_valid_for(EntityType::Task));
        assert!(!ready.is_valid_for(EntityType::Stage));
        assert!(NodeStatus::parse_for(EntityType::Stage, "ready_to_start").is_err());
    }

    #[test]
    fn assignment_statuses_do_not_mix_with_work_kinds() {
        let accepted = NodeStatus::Assignment(AssignmentStatus::Accepted);
        assert!(accepted.is_valid_for(EntityType::Assignment));
        assert!(!accepted.is_valid_for(EntityType::Step));
        assert!(!NodeStatus::Work(WorkStatus::InProgress).is_valid_for(EntityType::Assignment));
        assert!(NodeStatus::parse_for(EntityType::Assignment, "in_progress").is_err());
    }

    #[test]
    fn parse_is_lenient_about_case_and_separators() {
        assert_eq!(
            NodeStatus::parse_for(EntityType::Task, "in-progress").unwrap(),
            NodeStatus::Work(WorkStatus::InProgress)
        );
        assert_eq!(
            NodeStatus::parse_for(EntityType::Assignment, "Accepted").unwrap(),
            NodeStatus::Assignment(AssignmentStatus::Accepted)
        );
    }

    #[test]
    fn accepted_assignment_completes_dependencies_but_is_not_terminal() {
        let accepted = NodeStatus::Assignment(AssignmentStatus::Accepted);
        assert!(accepted.is_complete());
        assert!(!accepted.is_terminal());
    }
}
