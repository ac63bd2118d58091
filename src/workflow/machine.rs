// src/workflow/machine.rs

//! Applies workflow actions to a dependency graph.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::graph::{DependencyGraph, Propagation, WorkNode};
use crate::types::{EntityType, NodeKey, ParentPromotion};
use crate::workflow::action::{Action, ActionContext, ActionType};
use crate::workflow::status::{NodeStatus, WorkStatus};
use crate::workflow::transitions::{Prerequisites, transition};

/// Notification emitted by an applied action. Delivery is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Transitioned {
        node: NodeKey,
        action: ActionType,
        from: NodeStatus,
        to: NodeStatus,
        actor: Option<String>,
        date: NaiveDate,
    },
    /// All of `node`'s dependencies are now satisfied.
    NowUnblocked { node: NodeKey, date: NaiveDate },
    /// `node` moved to `IN_PROGRESS` because `child` started.
    ParentPromoted { node: NodeKey, child: NodeKey },
}

/// What a successfully applied action changed.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub node: NodeKey,
    pub action: ActionType,
    pub from: NodeStatus,
    pub to: NodeStatus,
    pub propagation: Propagation,
    pub promoted_parents: Vec<NodeKey>,
    pub events: Vec<WorkflowEvent>,
}

impl TransitionResult {
    pub fn status_changed(&self) -> bool {
        self.from != self.to
    }

    pub fn now_unblocked(&self) -> &[NodeKey] {
        &self.propagation.now_unblocked
    }
}

/// Per-kind lifecycle rules plus the parent-promotion policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowStateMachine {
    policy: ParentPromotion,
}

impl WorkflowStateMachine {
    pub fn new(policy: ParentPromotion) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ParentPromotion {
        self.policy
    }

    /// Validate and apply `action` to `node_ref`, then propagate satisfaction.
    ///
    /// Either everything is committed or nothing is: if propagation fails the
    /// node and any promoted parents are restored.
    pub fn apply_action(
        &self,
        graph: &mut DependencyGraph,
        node_ref: NodeKey,
        action: &Action,
        ctx: &ActionContext,
    ) -> Result<TransitionResult> {
        let current = graph.require(node_ref)?.clone();
        let prereq = Prerequisites::for_node(graph, node_ref);

        let mut updated = transition(&current, action, ctx, &prereq).inspect_err(|e| {
            debug!(node = %node_ref, action = %action.action_type(), error = %e, "action rejected");
        })?;
        updated.last_actor = ctx.actor.clone();

        if action.action_type() == ActionType::Start
            && current.kind() == EntityType::Step
            && !prereq.all_satisfied()
        {
            warn!(
                node = %node_ref,
                waiting_on = ?prereq.unsatisfied,
                "step started before its dependencies were satisfied"
            );
        }

        let promoted = if action.action_type() == ActionType::Start {
            self.plan_parent_promotion(graph, &current, ctx)?
        } else {
            Vec::new()
        };

        // Commit, remembering what to roll back to.
        let mut previous = vec![graph.replace_node(updated.clone())?];
        for parent in &promoted {
            match graph.replace_node(parent.clone()) {
                Ok(old) => previous.push(old),
                Err(e) => {
                    restore(graph, previous);
                    return Err(e);
                }
            }
        }

        let propagation = match graph.propagate_satisfaction(node_ref) {
            Ok(p) => p,
            Err(e) => {
                warn!(node = %node_ref, error = %e, "propagation failed; rolling back action");
                restore(graph, previous);
                return Err(e);
            }
        };

        info!(
            node = %node_ref,
            action = %action.action_type(),
            from = %current.status,
            to = %updated.status,
            actor = ctx.actor.as_deref().unwrap_or("-"),
            "applied workflow action"
        );

        let mut events = vec![WorkflowEvent::Transitioned {
            node: node_ref,
            action: action.action_type(),
            from: current.status,
            to: updated.status,
            actor: ctx.actor.clone(),
            date: ctx.date,
        }];
        let mut child = node_ref;
        for parent in &promoted {
            events.push(WorkflowEvent::ParentPromoted {
                node: parent.key,
                child,
            });
            child = parent.key;
        }
        events.extend(
            propagation
                .now_unblocked
                .iter()
                .map(|node| WorkflowEvent::NowUnblocked {
                    node: *node,
                    date: ctx.date,
                }),
        );

        Ok(TransitionResult {
            node: node_ref,
            action: action.action_type(),
            from: current.status,
            to: updated.status,
            propagation,
            promoted_parents: promoted.iter().map(|p| p.key).collect(),
            events,
        })
    }

    /// Walk up the containment chain, promoting parents that have not started.
    ///
    /// Stops at the first parent that is already past `NOT_STARTED`.
    fn plan_parent_promotion(
        &self,
        graph: &DependencyGraph,
        child: &WorkNode,
        ctx: &ActionContext,
    ) -> Result<Vec<WorkNode>> {
        if self.policy == ParentPromotion::Disabled {
            return Ok(Vec::new());
        }

        let mut promoted = Vec::new();
        let mut next = child.parent;
        while let Some(parent_key) = next {
            let parent = graph.require(parent_key)?;
            let promotable = matches!(
                parent.status,
                NodeStatus::Work(WorkStatus::NotStarted) | NodeStatus::Work(WorkStatus::ReadyToStart)
            );
            if !promotable {
                break;
            }

            let mut up = parent.clone();
            up.status = NodeStatus::Work(WorkStatus::InProgress);
            up.actual_start.get_or_insert(ctx.date);
            up.last_actor = ctx.actor.clone();
            debug!(parent = %parent_key, child = %child.key, "promoting parent to IN_PROGRESS");
            promoted.push(up);
            next = parent.parent;
        }
        Ok(promoted)
    }
}

fn restore(graph: &mut DependencyGraph, previous: Vec<WorkNode>) {
    for node in previous {
        let key = node.key;
        if let Err(e) = graph.replace_node(node) {
            warn!(node = %key, error = %e, "rollback could not restore node");
        }
    }
}
