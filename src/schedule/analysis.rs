// src/schedule/analysis.rs

//! Project-level analytics derived from a finished CPM pass.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::graph::DependencyGraph;
use crate::schedule::calculator::Pass;
use crate::schedule::snapshot::{Bottleneck, NodeSchedule, ParallelOpportunity, Severity};
use crate::types::{EntityType, NodeKey};

const HIGH_ADVICE: &str =
    "Expedite this item: add crew or resources, it gates several critical successors";
const MEDIUM_ADVICE: &str = "Monitor daily and prepare a recovery plan for its successors";
const LOW_ADVICE: &str = "Track at the weekly review";

const BLOCKED_CRITICAL_WEIGHT: u32 = 25;
const BLOCKED_WEIGHT: u32 = 10;
const SPECULATIVE_WEIGHT: u32 = 10;
const OVERDUE_WEIGHT: u32 = 15;

fn tier(successors: usize, downstream_slack: i64) -> Severity {
    if successors >= 4 || downstream_slack == 0 {
        Severity::High
    } else if successors == 3 || downstream_slack <= 5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn advice(severity: Severity) -> &'static str {
    match severity {
        Severity::High => HIGH_ADVICE,
        Severity::Medium => MEDIUM_ADVICE,
        Severity::Low => LOW_ADVICE,
    }
}

/// Critical nodes with more than one direct successor, most severe first.
pub fn bottlenecks(graph: &DependencyGraph, nodes: &BTreeMap<NodeKey, NodeSchedule>) -> Vec<Bottleneck> {
    let mut out: Vec<Bottleneck> = nodes
        .values()
        .filter(|n| n.is_critical_path)
        .filter_map(|n| {
            let successor_count = graph.successors_of(n.node).len();
            if successor_count < 2 {
                return None;
            }
            let downstream_slack = graph
                .descendants_of(n.node)
                .iter()
                .filter_map(|k| nodes.get(k))
                .map(|d| d.slack_days)
                .sum();
            let severity = tier(successor_count, downstream_slack);
            Some(Bottleneck {
                node: n.node,
                successor_count,
                downstream_slack,
                severity,
                recommendation: advice(severity),
            })
        })
        .collect();

    out.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(b.successor_count.cmp(&a.successor_count))
            .then(a.downstream_slack.cmp(&b.downstream_slack))
            .then(a.node.cmp(&b.node))
    });
    out
}

/// Not-started, unblocked work whose predecessors are all done.
fn startable(graph: &DependencyGraph, nodes: &BTreeMap<NodeKey, NodeSchedule>) -> BTreeSet<NodeKey> {
    graph
        .nodes()
        .filter(|n| n.kind() != EntityType::Assignment)
        .filter(|n| n.status.is_not_started() && !n.is_blocked())
        .filter(|n| nodes.get(&n.key).is_some_and(|s| s.dependencies_satisfied))
        .filter(|n| !graph.incoming_edges(n.key).is_empty())
        .map(|n| n.key)
        .collect()
}

/// Groups of startable nodes sharing an immediate predecessor, largest saving
/// first.
///
/// Members never depend on each other: a node waiting on another startable
/// node is not itself startable.
pub fn parallel_opportunities(
    graph: &DependencyGraph,
    nodes: &BTreeMap<NodeKey, NodeSchedule>,
) -> Vec<ParallelOpportunity> {
    let candidates = startable(graph, nodes);

    let mut by_predecessor: BTreeMap<NodeKey, Vec<NodeKey>> = BTreeMap::new();
    for key in &candidates {
        for pred in graph.predecessors_of(*key) {
            by_predecessor.entry(pred).or_default().push(*key);
        }
    }

    let mut seen: BTreeSet<Vec<NodeKey>> = BTreeSet::new();
    let mut out = Vec::new();
    for (pred, group) in by_predecessor {
        if group.len() < 2 || !seen.insert(group.clone()) {
            continue;
        }

        let days: Vec<i64> = group
            .iter()
            .map(|k| nodes.get(k).map_or(0, |s| s.duration_days))
            .collect();
        let sequential_days: i64 = days.iter().sum();
        let parallel_days = days.iter().copied().max().unwrap_or(0);
        out.push(ParallelOpportunity {
            common_predecessor: pred,
            nodes: group,
            sequential_days,
            parallel_days,
            potential_saving_days: sequential_days - parallel_days,
        });
    }

    out.sort_by(|a, b| b.potential_saving_days.cmp(&a.potential_saving_days));
    out
}

/// 0..=100 weighting of blocked, speculative and overdue work.
pub(crate) fn risk_score(
    graph: &DependencyGraph,
    nodes: &BTreeMap<NodeKey, NodeSchedule>,
    passes: &HashMap<NodeKey, Pass>,
) -> u8 {
    let mut score: u32 = 0;
    for node in graph.nodes() {
        if node.status.is_complete() || node.status.is_dead() {
            continue;
        }
        let Some(schedule) = nodes.get(&node.key) else { continue };

        if node.is_blocked() {
            score += if schedule.is_critical_path {
                BLOCKED_CRITICAL_WEIGHT
            } else {
                BLOCKED_WEIGHT
            };
        }
        if node.kind() == EntityType::Step && node.status.is_in_progress() && !schedule.dependencies_satisfied {
            score += SPECULATIVE_WEIGHT;
        }
        if passes.get(&node.key).is_some_and(|p| p.replanned) {
            score += OVERDUE_WEIGHT;
        }
    }
    score.min(100) as u8
}
