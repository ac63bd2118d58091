// src/workflow/transitions.rs

//! Pure transition functions.
//!
//! Each function takes the current node and returns the node as it would be
//! after the action, or an error. Nothing here touches the graph; the state
//! machine decides whether and how to commit the result.

use std::collections::BTreeSet;

use crate::errors::{Result, SiteplanError};
use crate::graph::{DependencyGraph, EdgeStatus, WorkNode};
use crate::types::{EntityType, NodeKey};
use crate::workflow::action::{Action, ActionContext};
use crate::workflow::status::{AssignmentStatus, NodeStatus, WorkStatus};

/// Graph facts a transition may need, gathered before the transition runs.
#[derive(Debug, Clone, Default)]
pub struct Prerequisites {
    /// Predecessors whose edge into this node is not yet `Satisfied`.
    pub unsatisfied: BTreeSet<NodeKey>,
}

impl Prerequisites {
    pub fn for_node(graph: &DependencyGraph, key: NodeKey) -> Self {
        let unsatisfied = graph
            .incoming_edges(key)
            .iter()
            .filter(|e| e.status != EdgeStatus::Satisfied)
            .map(|e| e.depends_on)
            .collect();
        Self { unsatisfied }
    }

    pub fn all_satisfied(&self) -> bool {
        self.unsatisfied.is_empty()
    }
}

/// Dispatch an action to its transition function.
pub fn transition(node: &WorkNode, action: &Action, ctx: &ActionContext, prereq: &Prerequisites) -> Result<WorkNode> {
    match action {
        Action::Start => start(node, ctx, prereq),
        Action::Complete => complete(node, ctx),
        Action::Accept => accept(node),
        Action::Decline { reason } => decline(node, reason.as_deref()),
        Action::Block { reason } => block(node, reason),
        Action::Unblock => unblock(node),
        Action::UpdateProgress { percent } => update_progress(node, *percent),
        Action::MarkReady => mark_ready(node),
        Action::Hold { reason } => hold(node, reason.as_deref()),
        Action::Resume => resume(node),
        Action::Cancel { reason } => cancel(node, reason.as_deref()),
    }
}

fn invalid(node: &WorkNode, what: &str) -> SiteplanError {
    SiteplanError::InvalidStateTransition(format!(
        "cannot {what} {} from {}",
        node.key, node.status
    ))
}

fn with_reason(mut node: WorkNode, reason: Option<&str>) -> WorkNode {
    node.status_reason = reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string);
    node
}

fn moved(node: &WorkNode, status: WorkStatus) -> WorkNode {
    let mut next = node.clone();
    next.status = NodeStatus::Work(status);
    next
}

pub fn start(node: &WorkNode, ctx: &ActionContext, prereq: &Prerequisites) -> Result<WorkNode> {
    let allowed = match (node.kind(), node.status) {
        (EntityType::Assignment, _) => false,
        (EntityType::Step, NodeStatus::Work(WorkStatus::ReadyToStart)) => true,
        (_, NodeStatus::Work(WorkStatus::NotStarted)) => true,
        _ => false,
    };
    if !allowed {
        return Err(invalid(node, "start"));
    }

    // Steps may start ahead of their predecessors; stages and tasks may not.
    if node.kind() != EntityType::Step && !prereq.all_satisfied() {
        let waiting: Vec<String> = prereq.unsatisfied.iter().map(|k| k.to_string()).collect();
        return Err(SiteplanError::InvalidStateTransition(format!(
            "cannot start {}: waiting on {}",
            node.key,
            waiting.join(", ")
        )));
    }

    let mut next = moved(node, WorkStatus::InProgress);
    next.actual_start.get_or_insert(ctx.date);
    Ok(next)
}

pub fn complete(node: &WorkNode, ctx: &ActionContext) -> Result<WorkNode> {
    if node.status != NodeStatus::Work(WorkStatus::InProgress) {
        return Err(invalid(node, "complete"));
    }
    if node.kind() == EntityType::Step && node.actual_start.is_none() {
        return Err(SiteplanError::InvalidStateTransition(format!(
            "cannot complete {}: no actual start date recorded",
            node.key
        )));
    }
    if let Some(started) = node.actual_start {
        if ctx.date < started {
            return Err(SiteplanError::InvalidArgument(format!(
                "completion date {} of {} is before its start {}",
                ctx.date, node.key, started
            )));
        }
    }

    let mut next = moved(node, WorkStatus::Completed);
    next.actual_end = Some(ctx.date);
    next.completion = 100;
    Ok(next)
}

pub fn accept(node: &WorkNode) -> Result<WorkNode> {
    if node.status != NodeStatus::Assignment(AssignmentStatus::Pending) {
        return Err(invalid(node, "accept"));
    }
    let mut next = node.clone();
    next.status = NodeStatus::Assignment(AssignmentStatus::Accepted);
    Ok(next)
}

pub fn decline(node: &WorkNode, reason: Option<&str>) -> Result<WorkNode> {
    if node.status != NodeStatus::Assignment(AssignmentStatus::Pending) {
        return Err(invalid(node, "decline"));
    }
    let mut next = node.clone();
    next.status = NodeStatus::Assignment(AssignmentStatus::Declined);
    Ok(with_reason(next, reason))
}

pub fn block(node: &WorkNode, reason: &str) -> Result<WorkNode> {
    if reason.trim().is_empty() {
        return Err(SiteplanError::InvalidArgument(format!(
            "blocking {} needs a reason",
            node.key
        )));
    }
    if node.status.is_terminal() {
        return Err(invalid(node, "block"));
    }
    let mut next = node.clone();
    next.blocked_reason = Some(reason.trim().to_string());
    Ok(next)
}

pub fn unblock(node: &WorkNode) -> Result<WorkNode> {
    if !node.is_blocked() {
        return Err(SiteplanError::InvalidStateTransition(format!(
            "cannot unblock {}: it is not blocked",
            node.key
        )));
    }
    let mut next = node.clone();
    next.blocked_reason = None;
    Ok(next)
}

pub fn update_progress(node: &WorkNode, percent: i64) -> Result<WorkNode> {
    if !(0..=100).contains(&percent) {
        return Err(SiteplanError::InvalidArgument(format!(
            "completion percentage for {} must be within 0..=100 (got {percent})",
            node.key
        )));
    }
    if node.kind() == EntityType::Assignment || node.status.is_terminal() {
        return Err(invalid(node, "update progress of"));
    }
    let mut next = node.clone();
    next.completion = percent as u8;
    Ok(next)
}

pub fn mark_ready(node: &WorkNode) -> Result<WorkNode> {
    if node.kind() != EntityType::Step || node.status != NodeStatus::Work(WorkStatus::NotStarted) {
        return Err(invalid(node, "mark ready"));
    }
    Ok(moved(node, WorkStatus::ReadyToStart))
}

pub fn hold(node: &WorkNode, reason: Option<&str>) -> Result<WorkNode> {
    match node.status {
        NodeStatus::Work(WorkStatus::NotStarted)
        | NodeStatus::Work(WorkStatus::ReadyToStart)
        | NodeStatus::Work(WorkStatus::InProgress) => Ok(with_reason(moved(node, WorkStatus::OnHold), reason)),
        _ => Err(invalid(node, "hold")),
    }
}

/// Back to `IN_PROGRESS` if work had begun, otherwise `NOT_STARTED`.
pub fn resume(node: &WorkNode) -> Result<WorkNode> {
    if node.status != NodeStatus::Work(WorkStatus::OnHold) {
        return Err(invalid(node, "resume"));
    }
    let target = if node.actual_start.is_some() {
        WorkStatus::InProgress
    } else {
        WorkStatus::NotStarted
    };
    Ok(with_reason(moved(node, target), None))
}

pub fn cancel(node: &WorkNode, reason: Option<&str>) -> Result<WorkNode> {
    let next_status = match node.status {
        NodeStatus::Work(WorkStatus::Completed) | NodeStatus::Work(WorkStatus::Cancelled) => None,
        NodeStatus::Work(_) => Some(NodeStatus::Work(WorkStatus::Cancelled)),
        NodeStatus::Assignment(AssignmentStatus::Accepted) => {
            Some(NodeStatus::Assignment(AssignmentStatus::Cancelled))
        }
        NodeStatus::Assignment(_) => None,
    };
    match next_status {
        Some(status) => {
            let mut next = node.clone();
            next.status = status;
            Ok(with_reason(next, reason))
        }
        None => Err(invalid(node, "cancel")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> ActionContext {
        ActionContext::on(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap())
    }

    fn waiting_on(key: NodeKey) -> Prerequisites {
        Prerequisites {
            unsatisfied: BTreeSet::from([key]),
        }
    }

    fn node(key: NodeKey, status: NodeStatus) -> WorkNode {
        WorkNode::new(key, key.to_string()).with_status(status)
    }

    #[test]
    fn completing_a_not_started_step_is_invalid() {
        let step = node(NodeKey::step(1), NodeStatus::Work(WorkStatus::NotStarted));
        let err = complete(&step, &ctx()).unwrap_err();
        assert!(matches!(err, SiteplanError::InvalidStateTransition(_)));
    }

    #[test]
    fn step_can_start_speculatively_but_task_cannot() {
        let prereq = waiting_on(NodeKey::stage(1));

        let step = node(NodeKey::step(1), NodeStatus::Work(WorkStatus::NotStarted));
        let started = start(&step, &ctx(), &prereq).unwrap();
        assert_eq!(started.status, NodeStatus::Work(WorkStatus::InProgress));
        assert_eq!(started.actual_start, Some(ctx().date));

        let task = node(NodeKey::task(1), NodeStatus::Work(WorkStatus::NotStarted));
        let err = start(&task, &ctx(), &prereq).unwrap_err();
        match err {
            SiteplanError::InvalidStateTransition(msg) => assert!(msg.contains("stage:1")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn only_steps_accept_ready_to_start() {
        let step = node(NodeKey::step(1), NodeStatus::Work(WorkStatus::ReadyToStart));
        assert!(start(&step, &ctx(), &Prerequisites::default()).is_ok());

        let ready = mark_ready(&node(NodeKey::step(2), NodeStatus::Work(WorkStatus::NotStarted))).unwrap();
        assert_eq!(ready.status, NodeStatus::Work(WorkStatus::ReadyToStart));
        assert!(mark_ready(&node(NodeKey::task(2), NodeStatus::Work(WorkStatus::NotStarted))).is_err());
    }

    #[test]
    fn step_completion_needs_actual_start() {
        let step = node(NodeKey::step(1), NodeStatus::Work(WorkStatus::InProgress));
        assert!(matches!(
            complete(&step, &ctx()),
            Err(SiteplanError::InvalidStateTransition(_))
        ));

        let step = step.with_actual_start(ctx().date);
        let done = complete(&step, &ctx()).unwrap();
        assert_eq!(done.status, NodeStatus::Work(WorkStatus::Completed));
        assert_eq!(done.completion, 100);
        assert_eq!(done.actual_end, Some(ctx().date));
    }

    #[test]
    fn completion_cannot_predate_start() {
        let later = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let task = node(NodeKey::task(1), NodeStatus::Work(WorkStatus::InProgress)).with_actual_start(later);
        assert!(matches!(
            complete(&task, &ctx()),
            Err(SiteplanError::InvalidArgument(_))
        ));
    }

    #[test]
    fn assignment_lifecycle() {
        let pending = node(NodeKey::assignment(1), NodeStatus::initial_for(EntityType::Assignment));
        let accepted = accept(&pending).unwrap();
        assert_eq!(accepted.status, NodeStatus::Assignment(AssignmentStatus::Accepted));
        assert!(accept(&accepted).is_err());
        assert!(decline(&accepted, None).is_err());

        let cancelled = cancel(&accepted, Some("trade left site")).unwrap();
        assert_eq!(cancelled.status, NodeStatus::Assignment(AssignmentStatus::Cancelled));
        assert_eq!(cancelled.status_reason.as_deref(), Some("trade left site"));

        let declined = decline(&pending, Some(" double booked ")).unwrap();
        assert_eq!(declined.status_reason.as_deref(), Some("double booked"));

        // Pending assignments can only be declined, not cancelled.
        assert!(cancel(&pending, None).is_err());
        assert!(start(&pending, &ctx(), &Prerequisites::default()).is_err());
    }

    #[test]
    fn accept_is_assignment_only() {
        let task = node(NodeKey::task(1), NodeStatus::Work(WorkStatus::NotStarted));
        assert!(matches!(accept(&task), Err(SiteplanError::InvalidStateTransition(_))));
    }

    #[test]
    fn progress_out_of_range_is_invalid_argument() {
        let task = node(NodeKey::task(1), NodeStatus::Work(WorkStatus::InProgress));
        assert!(matches!(update_progress(&task, 101), Err(SiteplanError::InvalidArgument(_))));
        assert!(matches!(update_progress(&task, -1), Err(SiteplanError::InvalidArgument(_))));
        assert_eq!(update_progress(&task, 55).unwrap().completion, 55);
    }

    #[test]
    fn block_keeps_status_and_needs_reason() {
        let task = node(NodeKey::task(1), NodeStatus::Work(WorkStatus::InProgress));
        let blocked = block(&task, "concrete truck late").unwrap();
        assert_eq!(blocked.status, task.status);
        assert_eq!(blocked.blocked_reason.as_deref(), Some("concrete truck late"));
        assert!(matches!(block(&task, "  "), Err(SiteplanError::InvalidArgument(_))));

        let cleared = unblock(&blocked).unwrap();
        assert!(!cleared.is_blocked());
        assert!(unblock(&cleared).is_err());
    }

    #[test]
    fn hold_and_resume_remember_whether_work_began() {
        let fresh = node(NodeKey::task(1), NodeStatus::Work(WorkStatus::NotStarted));
        let held = hold(&fresh, Some("awaiting variation approval")).unwrap();
        assert_eq!(held.status_reason.as_deref(), Some("awaiting variation approval"));
        let resumed = resume(&held).unwrap();
        assert_eq!(resumed.status, NodeStatus::Work(WorkStatus::NotStarted));
        assert_eq!(resumed.status_reason, None);

        let running = node(NodeKey::task(2), NodeStatus::Work(WorkStatus::InProgress)).with_actual_start(ctx().date);
        let held = hold(&running, None).unwrap();
        assert_eq!(held.status_reason, None);
        assert_eq!(resume(&held).unwrap().status, NodeStatus::Work(WorkStatus::InProgress));
    }

    #[test]
    fn terminal_work_cannot_be_cancelled_again() {
        let done = node(NodeKey::stage(1), NodeStatus::Work(WorkStatus::Completed));
        assert!(cancel(&done, None).is_err());
        assert!(hold(&done, None).is_err());
        assert!(block(&done, "late").is_err());
    }
}
