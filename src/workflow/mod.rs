// src/workflow/mod.rs

//! Lifecycle state machine for work nodes.
//!
//! - [`status`] defines the per-kind status enums.
//! - [`action`] defines the actions callers can request.
//! - [`transitions`] holds one pure function per action.
//! - [`machine`] validates, commits and propagates an action against the
//!   dependency graph, producing a [`TransitionResult`].

pub mod action;
pub mod machine;
pub mod status;
pub mod transitions;

pub use action::{Action, ActionContext, ActionType};
pub use machine::{TransitionResult, WorkflowEvent, WorkflowStateMachine};
pub use status::{AssignmentStatus, NodeStatus, WorkStatus};
