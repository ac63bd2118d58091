// src/schedule/snapshot.rs

//! Output types of a schedule pass.
//!
//! A [`ScheduleSnapshot`] is a derived view. Nodes and edges in the graph stay
//! authoritative; a snapshot can be thrown away and recomputed at any time.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::graph::EdgeAnnotation;
use crate::types::NodeKey;

/// Computed dates and analytics for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSchedule {
    pub node: NodeKey,
    /// Business days the node still occupies in this plan.
    pub duration_days: i64,
    /// Earliest start.
    pub planned_start: NaiveDate,
    /// Earliest finish: `planned_start` plus `duration_days` business days.
    pub planned_end: NaiveDate,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub is_critical_path: bool,
    pub slack_days: i64,
    pub dependencies_satisfied: bool,
    pub at_risk: bool,
    /// Business days between the persisted baseline end and `planned_end`;
    /// positive means late. `None` without a baseline.
    pub variance_days: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bottleneck {
    pub node: NodeKey,
    pub successor_count: usize,
    /// Sum of slack over every node downstream of this one.
    pub downstream_slack: i64,
    pub severity: Severity,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelOpportunity {
    pub common_predecessor: NodeKey,
    pub nodes: Vec<NodeKey>,
    pub sequential_days: i64,
    pub parallel_days: i64,
    pub potential_saving_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleWarning {
    pub node: Option<NodeKey>,
    pub message: String,
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "WARNING {node}: {}", self.message),
            None => write!(f, "WARNING: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub project_start: NaiveDate,
    pub project_finish: NaiveDate,
    /// Business days from the first critical node's planned start to the
    /// project finish; 0 once no critical work remains.
    pub critical_path_duration: i64,
    /// Critical nodes in topological order.
    pub critical_path: Vec<NodeKey>,
    pub total_slack: i64,
    pub bottlenecks: Vec<Bottleneck>,
    pub parallel_opportunities: Vec<ParallelOpportunity>,
    /// 0 (no known risk) to 100.
    pub risk_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub as_of: NaiveDate,
    pub region: String,
    pub nodes: BTreeMap<NodeKey, NodeSchedule>,
    pub edges: Vec<EdgeAnnotation>,
    pub summary: ScheduleSummary,
    pub warnings: Vec<ScheduleWarning>,
}

impl ScheduleSnapshot {
    pub fn node(&self, key: NodeKey) -> Option<&NodeSchedule> {
        self.nodes.get(&key)
    }

    pub fn critical_nodes(&self) -> impl Iterator<Item = &NodeSchedule> {
        self.nodes.values().filter(|n| n.is_critical_path)
    }
}
