// src/graph/dependency_graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::errors::{Result, SiteplanError};
use crate::graph::edge::{DependencyEdge, EdgeId, EdgeStatus, derive_edge_status};
use crate::graph::node::WorkNode;
use crate::types::NodeKey;

/// Per-edge analytics written back from a schedule snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeAnnotation {
    pub edge: EdgeId,
    pub is_critical_path: bool,
    pub slack_days: i64,
}

/// Outcome of [`DependencyGraph::propagate_satisfaction`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    pub newly_satisfied: Vec<EdgeId>,
    pub newly_blocked: Vec<EdgeId>,
    /// Edges that went from `Blocked` back to `Pending`.
    pub reopened: Vec<EdgeId>,
    /// Dependents whose incoming edges are now all satisfied.
    pub now_unblocked: Vec<NodeKey>,
}

impl Propagation {
    pub fn is_empty(&self) -> bool {
        self.newly_satisfied.is_empty()
            && self.newly_blocked.is_empty()
            && self.reopened.is_empty()
            && self.now_unblocked.is_empty()
    }
}

/// Arena of work nodes plus the finish-to-start edges between them.
///
/// Nodes are keyed by [`NodeKey`]; edges live in a `Vec` indexed by
/// [`EdgeId`]. The adjacency is a `petgraph` map with edge direction
/// `depends_on -> dependent`, weighted by the edge id. The adjacency is kept
/// acyclic: [`add_edge`](Self::add_edge) refuses any edge that would close a
/// cycle.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<NodeKey, WorkNode>,
    edges: Vec<DependencyEdge>,
    adjacency: DiGraphMap<NodeKey, EdgeId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Its parent, if any, must already be present.
    pub fn add_node(&mut self, node: WorkNode) -> Result<()> {
        if self.nodes.contains_key(&node.key) {
            return Err(SiteplanError::InvalidArgument(format!(
                "node {} already exists",
                node.key
            )));
        }
        if !node.status.is_valid_for(node.kind()) {
            return Err(SiteplanError::InvalidArgument(format!(
                "status {} is not valid for {}",
                node.status, node.key
            )));
        }
        if node.completion > 100 {
            return Err(SiteplanError::InvalidArgument(format!(
                "completion of {} must be within 0..=100 (got {})",
                node.key, node.completion
            )));
        }
        if let Some(parent) = node.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(SiteplanError::NotFound(format!(
                    "parent {} of {}",
                    parent, node.key
                )));
            }
            if parent.kind >= node.kind() {
                return Err(SiteplanError::InvalidArgument(format!(
                    "{} cannot be the parent of {}",
                    parent, node.key
                )));
            }
        }

        debug!(node = %node.key, name = %node.name, "adding work node");
        self.adjacency.add_node(node.key);
        self.nodes.insert(node.key, node);
        Ok(())
    }

    /// Add a finish-to-start edge `depends_on -> dependent`.
    ///
    /// Rejected edges leave the graph untouched.
    pub fn add_edge(&mut self, dependent: NodeKey, depends_on: NodeKey, lag_days: i64) -> Result<EdgeId> {
        let predecessor = self.require(depends_on)?;
        self.require(dependent)?;

        if lag_days < 0 {
            return Err(SiteplanError::InvalidArgument(format!(
                "lag between {depends_on} and {dependent} must be >= 0 (got {lag_days})"
            )));
        }
        if self.would_create_cycle(dependent, depends_on) {
            warn!(%dependent, %depends_on, "rejecting edge that would close a cycle");
            return Err(SiteplanError::CycleDetected(format!(
                "edge {depends_on} -> {dependent} would close a cycle"
            )));
        }
        if self.adjacency.contains_edge(depends_on, dependent) {
            return Err(SiteplanError::InvalidArgument(format!(
                "{dependent} already depends on {depends_on}"
            )));
        }

        let id = self.edges.len();
        let mut edge = DependencyEdge::new(id, dependent, depends_on, lag_days);
        edge.status = derive_edge_status(EdgeStatus::Pending, predecessor);

        debug!(edge = id, %dependent, %depends_on, lag_days, status = %edge.status, "adding dependency edge");
        self.adjacency.add_edge(depends_on, dependent, id);
        self.edges.push(edge);
        Ok(id)
    }

    /// Whether adding `depends_on -> dependent` would make the graph cyclic.
    pub fn would_create_cycle(&self, dependent: NodeKey, depends_on: NodeKey) -> bool {
        dependent == depends_on || has_path_connecting(&self.adjacency, dependent, depends_on, None)
    }

    pub fn node(&self, key: NodeKey) -> Option<&WorkNode> {
        self.nodes.get(&key)
    }

    pub fn require(&self, key: NodeKey) -> Result<&WorkNode> {
        self.nodes
            .get(&key)
            .ok_or_else(|| SiteplanError::NotFound(format!("node {key}")))
    }

    /// Swap in a new version of an existing node, returning the old one.
    pub(crate) fn replace_node(&mut self, node: WorkNode) -> Result<WorkNode> {
        match self.nodes.get_mut(&node.key) {
            Some(slot) => Ok(std::mem::replace(slot, node)),
            None => Err(SiteplanError::NotFound(format!("node {}", node.key))),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &WorkNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&DependencyEdge> {
        self.edges.get(id)
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn edge_between(&self, depends_on: NodeKey, dependent: NodeKey) -> Option<&DependencyEdge> {
        self.adjacency
            .edge_weight(depends_on, dependent)
            .and_then(|id| self.edges.get(*id))
    }

    pub fn incoming_edges(&self, key: NodeKey) -> Vec<&DependencyEdge> {
        self.edges_directed(key, Direction::Incoming)
    }

    pub fn outgoing_edges(&self, key: NodeKey) -> Vec<&DependencyEdge> {
        self.edges_directed(key, Direction::Outgoing)
    }

    fn edges_directed(&self, key: NodeKey, dir: Direction) -> Vec<&DependencyEdge> {
        if !self.adjacency.contains_node(key) {
            return Vec::new();
        }
        self.adjacency
            .edges_directed(key, dir)
            .filter_map(|(_, _, id)| self.edges.get(*id))
            .collect()
    }

    /// Nodes `key` depends on directly.
    pub fn predecessors_of(&self, key: NodeKey) -> BTreeSet<NodeKey> {
        self.incoming_edges(key).iter().map(|e| e.depends_on).collect()
    }

    /// Nodes that depend directly on `key`.
    pub fn successors_of(&self, key: NodeKey) -> BTreeSet<NodeKey> {
        self.outgoing_edges(key).iter().map(|e| e.dependent).collect()
    }

    /// Every node reachable downstream of `key`, excluding `key`.
    pub fn descendants_of(&self, key: NodeKey) -> BTreeSet<NodeKey> {
        let mut out = BTreeSet::new();
        let mut stack: Vec<NodeKey> = self.successors_of(key).into_iter().collect();
        while let Some(next) = stack.pop() {
            if out.insert(next) {
                stack.extend(self.successors_of(next));
            }
        }
        out
    }

    /// Direct children in the work breakdown (not dependency successors).
    pub fn children_of(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(key))
            .map(|n| n.key)
            .collect()
    }

    /// True iff the edge's predecessor is complete.
    pub fn is_satisfied(&self, edge: &DependencyEdge) -> bool {
        self.nodes
            .get(&edge.depends_on)
            .map(|n| n.status.is_complete())
            .unwrap_or(false)
    }

    /// All incoming edges of `key` are `Satisfied` (vacuously true for roots).
    pub fn dependencies_satisfied(&self, key: NodeKey) -> bool {
        self.incoming_edges(key)
            .iter()
            .all(|e| e.status == EdgeStatus::Satisfied)
    }

    /// Re-derive the status of every edge leaving `changed` and work out which
    /// dependents became startable.
    ///
    /// The whole change set is computed before anything is written, so an
    /// error leaves every edge as it was. When a dependent that is already
    /// complete has pending outgoing edges, it is visited as well.
    pub fn propagate_satisfaction(&mut self, changed: NodeKey) -> Result<Propagation> {
        self.require(changed)?;

        let mut planned: HashMap<EdgeId, EdgeStatus> = HashMap::new();
        let mut result = Propagation::default();
        let mut unblocked_seen: HashSet<NodeKey> = HashSet::new();
        let mut visited: HashSet<NodeKey> = HashSet::new();
        let mut queue: VecDeque<NodeKey> = VecDeque::from([changed]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let predecessor = self.require(current)?;

            for edge in self.outgoing_edges(current) {
                let before = planned.get(&edge.id).copied().unwrap_or(edge.status);
                let after = derive_edge_status(before, predecessor);
                if after == before {
                    continue;
                }
                planned.insert(edge.id, after);

                match (before, after) {
                    (_, EdgeStatus::Satisfied) => result.newly_satisfied.push(edge.id),
                    (_, EdgeStatus::Blocked) => result.newly_blocked.push(edge.id),
                    (EdgeStatus::Blocked, EdgeStatus::Pending) => result.reopened.push(edge.id),
                    _ => {}
                }

                if after != EdgeStatus::Satisfied {
                    continue;
                }

                let dependent = self.require(edge.dependent)?;
                let all_satisfied = self.incoming_edges(dependent.key).iter().all(|e| {
                    planned.get(&e.id).copied().unwrap_or(e.status) == EdgeStatus::Satisfied
                });
                if all_satisfied && unblocked_seen.insert(dependent.key) {
                    result.now_unblocked.push(dependent.key);
                }
                if dependent.status.is_complete() {
                    queue.push_back(dependent.key);
                }
            }
        }

        for (id, status) in planned {
            if let Some(edge) = self.edges.get_mut(id) {
                edge.status = status;
            }
        }
        result.newly_satisfied.sort_unstable();
        result.newly_blocked.sort_unstable();
        result.reopened.sort_unstable();

        if !result.is_empty() {
            debug!(
                node = %changed,
                satisfied = ?result.newly_satisfied,
                blocked = ?result.newly_blocked,
                unblocked = ?result.now_unblocked,
                "propagated dependency satisfaction"
            );
        }
        Ok(result)
    }

    /// Kahn's algorithm over all nodes.
    ///
    /// Ready nodes are taken in key order so the result is deterministic.
    /// Fails with [`SiteplanError::CycleDetected`] if the queue drains before
    /// every node has been emitted.
    pub fn topological_order(&self) -> Result<Vec<NodeKey>> {
        let mut in_degree: BTreeMap<NodeKey, usize> = self
            .nodes
            .keys()
            .map(|k| {
                let deg = self.adjacency.neighbors_directed(*k, Direction::Incoming).count();
                (*k, deg)
            })
            .collect();

        let mut ready: BTreeSet<NodeKey> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(k, _)| *k)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for succ in self.adjacency.neighbors_directed(next, Direction::Outgoing) {
                if let Some(deg) = in_degree.get_mut(&succ) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(succ);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck: Vec<String> = in_degree
                .iter()
                .filter(|(_, deg)| **deg > 0)
                .map(|(k, _)| k.to_string())
                .collect();
            return Err(SiteplanError::CycleDetected(format!(
                "nodes left unordered: {}",
                stuck.join(", ")
            )));
        }

        Ok(order)
    }

    pub fn validate_acyclic(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Write the analytics cache on edges. Status is not touched.
    pub fn annotate_edges(&mut self, annotations: &[EdgeAnnotation]) {
        for a in annotations {
            if let Some(edge) = self.edges.get_mut(a.edge) {
                edge.is_critical_path = a.is_critical_path;
                edge.slack_days = a.slack_days;
            }
        }
    }

    /// Test-only escape hatch for building corrupted graphs.
    #[cfg(test)]
    pub(crate) fn force_edge_unchecked(&mut self, dependent: NodeKey, depends_on: NodeKey) {
        let id = self.edges.len();
        self.adjacency.add_edge(depends_on, dependent, id);
        self.edges.push(DependencyEdge::new(id, dependent, depends_on, 0));
    }
}
