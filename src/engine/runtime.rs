// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, SiteplanError};
use crate::graph::{EdgeId, WorkNode};
use crate::schedule::ScheduleSnapshot;
use crate::types::NodeKey;
use crate::workflow::{Action, ActionContext, TransitionResult, WorkflowEvent};

use super::core::{BatchOutcome, ProjectCore};

const COMMAND_QUEUE_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests served by a [`ProjectRuntime`].
pub enum ProjectCommand {
    ApplyAction {
        node: NodeKey,
        action: Action,
        ctx: ActionContext,
        reply: Reply<TransitionResult>,
    },
    ApplyBatch {
        actions: Vec<(NodeKey, Action)>,
        ctx: ActionContext,
        reply: Reply<Vec<TransitionResult>>,
    },
    /// Apply a batch and recompute in one turn of the runtime.
    ApplyAndRecompute {
        actions: Vec<(NodeKey, Action)>,
        ctx: ActionContext,
        as_of: NaiveDate,
        reply: Reply<BatchOutcome>,
    },
    AddEdge {
        dependent: NodeKey,
        depends_on: NodeKey,
        lag_days: i64,
        reply: Reply<EdgeId>,
    },
    Recompute {
        as_of: NaiveDate,
        reply: Reply<ScheduleSnapshot>,
    },
    Nodes {
        reply: oneshot::Sender<Vec<WorkNode>>,
    },
}

impl fmt::Debug for ProjectCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectCommand::ApplyAction { node, action, .. } => f
                .debug_struct("ApplyAction")
                .field("node", node)
                .field("action", action)
                .finish_non_exhaustive(),
            ProjectCommand::ApplyBatch { actions, .. } => f
                .debug_struct("ApplyBatch")
                .field("len", &actions.len())
                .finish_non_exhaustive(),
            ProjectCommand::ApplyAndRecompute { actions, as_of, .. } => f
                .debug_struct("ApplyAndRecompute")
                .field("len", &actions.len())
                .field("as_of", as_of)
                .finish_non_exhaustive(),
            ProjectCommand::AddEdge {
                dependent, depends_on, ..
            } => f
                .debug_struct("AddEdge")
                .field("dependent", dependent)
                .field("depends_on", depends_on)
                .finish_non_exhaustive(),
            ProjectCommand::Recompute { as_of, .. } => {
                f.debug_struct("Recompute").field("as_of", as_of).finish_non_exhaustive()
            }
            ProjectCommand::Nodes { .. } => f.write_str("Nodes"),
        }
    }
}

/// Single writer for one project.
///
/// Owns a [`ProjectCore`] and serves [`ProjectCommand`]s one at a time, so
/// "apply action, propagate, recompute" never interleaves for a project.
/// Workflow events from applied actions are forwarded to an optional sink.
pub struct ProjectRuntime {
    core: ProjectCore,
    command_rx: mpsc::Receiver<ProjectCommand>,
    events: Option<mpsc::Sender<WorkflowEvent>>,
}

impl fmt::Debug for ProjectRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectRuntime")
            .field("project", &self.core.id())
            .finish_non_exhaustive()
    }
}

impl ProjectRuntime {
    pub fn new(
        core: ProjectCore,
        command_rx: mpsc::Receiver<ProjectCommand>,
        events: Option<mpsc::Sender<WorkflowEvent>>,
    ) -> Self {
        Self {
            core,
            command_rx,
            events,
        }
    }

    /// Spawn the runtime on the current Tokio runtime and return a handle.
    pub fn spawn(core: ProjectCore, events: Option<mpsc::Sender<WorkflowEvent>>) -> ProjectHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let project = core.id().to_string();
        let runtime = ProjectRuntime::new(core, rx, events);
        let task = tokio::spawn(runtime.run());
        ProjectHandle {
            project,
            tx,
            task: Some(task),
        }
    }

    /// Serve commands until every handle is dropped. Returns the final core.
    pub async fn run(mut self) -> ProjectCore {
        info!(project = %self.core.id(), "project runtime started");

        while let Some(command) = self.command_rx.recv().await {
            debug!(project = %self.core.id(), ?command, "project runtime received command");
            self.handle(command).await;
        }

        info!(project = %self.core.id(), "command channel closed; project runtime exiting");
        self.core
    }

    async fn handle(&mut self, command: ProjectCommand) {
        match command {
            ProjectCommand::ApplyAction {
                node,
                action,
                ctx,
                reply,
            } => {
                let result = self.core.apply_action(node, &action, &ctx);
                if let Ok(r) = &result {
                    self.publish(&r.events).await;
                }
                let _ = reply.send(result);
            }
            ProjectCommand::ApplyBatch { actions, ctx, reply } => {
                let result = self.core.apply_batch(&actions, &ctx);
                if let Ok(results) = &result {
                    for r in results {
                        self.publish(&r.events).await;
                    }
                }
                let _ = reply.send(result);
            }
            ProjectCommand::ApplyAndRecompute {
                actions,
                ctx,
                as_of,
                reply,
            } => {
                let result = self.core.apply_and_recompute(&actions, &ctx, as_of);
                if let Ok(outcome) = &result {
                    for r in &outcome.transitions {
                        self.publish(&r.events).await;
                    }
                }
                let _ = reply.send(result);
            }
            ProjectCommand::AddEdge {
                dependent,
                depends_on,
                lag_days,
                reply,
            } => {
                let _ = reply.send(self.core.add_edge(dependent, depends_on, lag_days));
            }
            ProjectCommand::Recompute { as_of, reply } => {
                let _ = reply.send(self.core.recompute_schedule(as_of));
            }
            ProjectCommand::Nodes { reply } => {
                let _ = reply.send(self.core.nodes());
            }
        }
    }

    async fn publish(&mut self, events: &[WorkflowEvent]) {
        let Some(sink) = &self.events else { return };
        for event in events {
            if sink.send(event.clone()).await.is_err() {
                warn!(project = %self.core.id(), "event sink closed; dropping further workflow events");
                self.events = None;
                return;
            }
        }
    }
}

/// Cloneable-by-sender client of a [`ProjectRuntime`].
#[derive(Debug)]
pub struct ProjectHandle {
    project: String,
    tx: mpsc::Sender<ProjectCommand>,
    task: Option<JoinHandle<ProjectCore>>,
}

impl ProjectHandle {
    pub fn project(&self) -> &str {
        &self.project
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ProjectCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| SiteplanError::RuntimeClosed(self.project.clone()))?;
        rx.await
            .map_err(|_| SiteplanError::RuntimeClosed(self.project.clone()))
    }

    pub async fn apply_action(&self, node: NodeKey, action: Action, ctx: ActionContext) -> Result<TransitionResult> {
        self.request(|reply| ProjectCommand::ApplyAction {
            node,
            action,
            ctx,
            reply,
        })
        .await?
    }

    pub async fn apply_batch(
        &self,
        actions: Vec<(NodeKey, Action)>,
        ctx: ActionContext,
    ) -> Result<Vec<TransitionResult>> {
        self.request(|reply| ProjectCommand::ApplyBatch { actions, ctx, reply })
            .await?
    }

    /// Apply `actions` and recompute as of `as_of` with no other command in
    /// between.
    pub async fn apply_and_recompute(
        &self,
        actions: Vec<(NodeKey, Action)>,
        ctx: ActionContext,
        as_of: NaiveDate,
    ) -> Result<BatchOutcome> {
        self.request(|reply| ProjectCommand::ApplyAndRecompute {
            actions,
            ctx,
            as_of,
            reply,
        })
        .await?
    }

    pub async fn add_edge(&self, dependent: NodeKey, depends_on: NodeKey, lag_days: i64) -> Result<EdgeId> {
        self.request(|reply| ProjectCommand::AddEdge {
            dependent,
            depends_on,
            lag_days,
            reply,
        })
        .await?
    }

    pub async fn recompute_schedule(&self, as_of: NaiveDate) -> Result<ScheduleSnapshot> {
        self.request(|reply| ProjectCommand::Recompute { as_of, reply })
            .await?
    }

    pub async fn nodes(&self) -> Result<Vec<WorkNode>> {
        self.request(|reply| ProjectCommand::Nodes { reply }).await
    }

    /// Close the command channel and wait for the runtime to hand back its core.
    pub async fn shutdown(mut self) -> Result<ProjectCore> {
        let task = self
            .task
            .take()
            .ok_or_else(|| SiteplanError::RuntimeClosed(self.project.clone()))?;
        let project = self.project.clone();
        drop(self);
        task.await
            .map_err(|e| SiteplanError::RuntimeClosed(format!("{project}: {e}")))
    }
}

/// One [`ProjectRuntime`] per project id.
///
/// Projects never share mutable state, so their runtimes run concurrently.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: HashMap<String, ProjectHandle>,
    events: Option<mpsc::Sender<WorkflowEvent>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward workflow events of every project registered from now on.
    pub fn with_event_sink(mut self, events: mpsc::Sender<WorkflowEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Spawn a runtime for `core`. Fails if the id is already registered.
    pub fn register(&mut self, core: ProjectCore) -> Result<&ProjectHandle> {
        let id = core.id().to_string();
        if self.projects.contains_key(&id) {
            return Err(SiteplanError::InvalidArgument(format!(
                "project '{id}' is already registered"
            )));
        }
        let handle = ProjectRuntime::spawn(core, self.events.clone());
        info!(project = %id, "registered project");
        Ok(self.projects.entry(id).or_insert(handle))
    }

    pub fn get(&self, id: &str) -> Result<&ProjectHandle> {
        self.projects
            .get(id)
            .ok_or_else(|| SiteplanError::NotFound(format!("project '{id}'")))
    }

    pub fn project_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.projects.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub async fn apply_action(
        &self,
        project: &str,
        node: NodeKey,
        action: Action,
        ctx: ActionContext,
    ) -> Result<TransitionResult> {
        self.get(project)?.apply_action(node, action, ctx).await
    }

    pub async fn recompute_schedule(&self, project: &str, as_of: NaiveDate) -> Result<ScheduleSnapshot> {
        self.get(project)?.recompute_schedule(as_of).await
    }

    /// Remove a project and wait for its runtime to finish.
    pub async fn remove(&mut self, id: &str) -> Result<ProjectCore> {
        let handle = self
            .projects
            .remove(id)
            .ok_or_else(|| SiteplanError::NotFound(format!("project '{id}'")))?;
        handle.shutdown().await
    }
}
