// src/engine/core.rs

//! Pure per-project core.
//!
//! [`ProjectCore`] owns one project's dependency graph, business calendar and
//! workflow state machine. Every operation is synchronous and deterministic:
//! - apply a workflow action (or a batch of them, all-or-nothing)
//! - add nodes and dependency edges
//! - recompute the schedule and write edge annotations back into the graph
//!
//! It has no channels, no Tokio types, and does not perform any IO, so the
//! async shell in [`crate::engine::runtime`] only has to serialize calls.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::calendar::{BusinessCalendar, holiday::normalize_region};
use crate::errors::Result;
use crate::graph::{DependencyGraph, EdgeId, WorkNode};
use crate::schedule::{ScheduleCalculator, ScheduleSnapshot};
use crate::types::NodeKey;
use crate::workflow::{Action, ActionContext, TransitionResult, WorkflowStateMachine};

/// Identity and placement of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    /// Holiday region the project site is in.
    pub region: String,
}

/// Transitions and the schedule computed right after them.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub transitions: Vec<TransitionResult>,
    pub schedule: ScheduleSnapshot,
    /// Node state the schedule was computed from.
    pub nodes: Vec<WorkNode>,
}

/// Single project state: graph, calendar, state machine.
#[derive(Debug, Clone)]
pub struct ProjectCore {
    info: ProjectInfo,
    graph: DependencyGraph,
    calendar: BusinessCalendar,
    machine: WorkflowStateMachine,
}

impl ProjectCore {
    pub fn new(
        mut info: ProjectInfo,
        graph: DependencyGraph,
        calendar: BusinessCalendar,
        machine: WorkflowStateMachine,
    ) -> Self {
        info.region = normalize_region(&info.region);
        Self {
            info,
            graph,
            calendar,
            machine,
        }
    }

    pub fn info(&self) -> &ProjectInfo {
        &self.info
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn machine(&self) -> &WorkflowStateMachine {
        &self.machine
    }

    pub fn add_node(&mut self, node: WorkNode) -> Result<()> {
        self.graph.add_node(node)
    }

    pub fn add_edge(&mut self, dependent: NodeKey, depends_on: NodeKey, lag_days: i64) -> Result<EdgeId> {
        self.graph.add_edge(dependent, depends_on, lag_days)
    }

    /// Apply one action; the graph is untouched on error.
    pub fn apply_action(&mut self, node: NodeKey, action: &Action, ctx: &ActionContext) -> Result<TransitionResult> {
        self.machine.apply_action(&mut self.graph, node, action, ctx)
    }

    /// Apply actions in order. If any fails, none of them take effect.
    pub fn apply_batch(
        &mut self,
        actions: &[(NodeKey, Action)],
        ctx: &ActionContext,
    ) -> Result<Vec<TransitionResult>> {
        let checkpoint = self.graph.clone();
        let mut results = Vec::with_capacity(actions.len());

        for (index, (node, action)) in actions.iter().enumerate() {
            match self.machine.apply_action(&mut self.graph, *node, action, ctx) {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(
                        project = %self.info.id,
                        index,
                        node = %node,
                        error = %e,
                        "batch rejected; rolling back earlier actions"
                    );
                    self.graph = checkpoint;
                    return Err(e);
                }
            }
        }

        debug!(project = %self.info.id, applied = results.len(), "batch applied");
        Ok(results)
    }

    /// Compute the schedule as of `as_of` and cache edge annotations.
    pub fn recompute_schedule(&mut self, as_of: NaiveDate) -> Result<ScheduleSnapshot> {
        let snapshot = ScheduleCalculator::new(&self.calendar, &self.info.region).recompute(
            &self.graph,
            self.info.start_date,
            as_of,
        )?;
        self.graph.annotate_edges(&snapshot.edges);

        info!(
            project = %self.info.id,
            %as_of,
            finish = %snapshot.summary.project_finish,
            "project schedule refreshed"
        );
        Ok(snapshot)
    }

    /// Apply a batch, then recompute on the result. If either step fails the
    /// project is left as it was.
    pub fn apply_and_recompute(
        &mut self,
        actions: &[(NodeKey, Action)],
        ctx: &ActionContext,
        as_of: NaiveDate,
    ) -> Result<BatchOutcome> {
        let checkpoint = self.graph.clone();
        let transitions = self.apply_batch(actions, ctx)?;
        match self.recompute_schedule(as_of) {
            Ok(schedule) => Ok(BatchOutcome {
                transitions,
                schedule,
                nodes: self.nodes(),
            }),
            Err(e) => {
                warn!(project = %self.info.id, error = %e, "schedule rejected; rolling back batch");
                self.graph = checkpoint;
                Err(e)
            }
        }
    }

    /// Current copy of every node, in key order.
    pub fn nodes(&self) -> Vec<WorkNode> {
        self.graph.nodes().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SiteplanError;
    use crate::graph::EdgeStatus;
    use crate::types::{Duration, ParentPromotion};
    use crate::workflow::status::{NodeStatus, WorkStatus};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    fn core() -> ProjectCore {
        let mut graph = DependencyGraph::new();
        for id in 1..=3 {
            graph
                .add_node(WorkNode::new(NodeKey::task(id), format!("t{id}")).with_duration(Duration::days(2)))
                .unwrap();
        }
        graph.add_edge(NodeKey::task(2), NodeKey::task(1), 0).unwrap();
        graph.add_edge(NodeKey::task(3), NodeKey::task(2), 0).unwrap();

        let info = ProjectInfo {
            id: "p1".into(),
            name: "Harbour St".into(),
            start_date: monday(),
            region: "nsw".into(),
        };
        ProjectCore::new(
            info,
            graph,
            BusinessCalendar::weekdays_only(),
            WorkflowStateMachine::new(ParentPromotion::Promote),
        )
    }

    #[test]
    fn region_is_normalized() {
        assert_eq!(core().info().region, "NSW");
    }

    #[test]
    fn batch_applies_in_order() {
        let mut c = core();
        let ctx = ActionContext::on(monday());
        let results = c
            .apply_batch(
                &[
                    (NodeKey::task(1), Action::Start),
                    (NodeKey::task(1), Action::Complete),
                    (NodeKey::task(2), Action::Start),
                ],
                &ctx,
            )
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(
            c.graph().node(NodeKey::task(2)).unwrap().status,
            NodeStatus::Work(WorkStatus::InProgress)
        );
    }

    #[test]
    fn failed_batch_leaves_project_unchanged() {
        let mut c = core();
        let before = c.nodes();
        let ctx = ActionContext::on(monday());
        let err = c
            .apply_batch(
                &[
                    (NodeKey::task(1), Action::Start),
                    // task 3 still waits on task 2
                    (NodeKey::task(3), Action::Start),
                ],
                &ctx,
            )
            .unwrap_err();
        assert!(matches!(err, SiteplanError::InvalidStateTransition(_)));
        assert_eq!(c.nodes(), before);
    }

    #[test]
    fn recompute_writes_edge_cache() {
        let mut c = core();
        let snap = c.recompute_schedule(monday()).unwrap();
        assert_eq!(snap.summary.critical_path.len(), 3);
        assert!(c.graph().edges().iter().all(|e| e.is_critical_path));
        assert!(c.graph().edges().iter().all(|e| e.status == EdgeStatus::Pending));
    }

    #[test]
    fn apply_and_recompute_schedules_the_new_state() {
        let mut c = core();
        let ctx = ActionContext::on(monday());
        let outcome = c
            .apply_and_recompute(
                &[(NodeKey::task(1), Action::Start), (NodeKey::task(1), Action::Complete)],
                &ctx,
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            )
            .unwrap();
        assert_eq!(outcome.transitions.len(), 2);
        assert_eq!(outcome.nodes, c.nodes());
        assert!(!outcome.schedule.node(NodeKey::task(1)).unwrap().is_critical_path);
        assert_eq!(
            outcome.schedule.summary.critical_path,
            vec![NodeKey::task(2), NodeKey::task(3)]
        );
        assert_eq!(c.graph().edges()[0].status, EdgeStatus::Satisfied);
    }

    #[test]
    fn failed_recompute_rolls_back_the_batch() {
        let mut c = core();
        c.graph.force_edge_unchecked(NodeKey::task(2), NodeKey::task(3));
        let before = c.nodes();
        let err = c
            .apply_and_recompute(&[(NodeKey::task(1), Action::Start)], &ActionContext::on(monday()), monday())
            .unwrap_err();
        assert!(matches!(err, SiteplanError::CycleDetected(_)));
        assert_eq!(c.nodes(), before);
    }
}
