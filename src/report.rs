// src/report.rs

//! Plain-text rendering of projects and schedules for the CLI.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::config::ProjectConfig;
use crate::graph::WorkNode;
use crate::schedule::ScheduleSnapshot;
use crate::types::NodeKey;
use crate::workflow::{TransitionResult, WorkflowEvent};

/// Project overview without any scheduling (`--dry-run`).
pub fn render_dry_run(cfg: &ProjectConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "siteplan dry-run");
    let _ = writeln!(out, "  project = {} ({})", cfg.info.name, cfg.info.id);
    let _ = writeln!(out, "  start_date = {}", cfg.info.start_date);
    let _ = writeln!(out, "  region = {}", cfg.info.region);
    let _ = writeln!(out, "  parent_promotion = {:?}", cfg.parent_promotion);
    let _ = writeln!(out, "  holidays = {}", cfg.calendar.holidays().len());
    let _ = writeln!(out);

    let mut deps: BTreeMap<NodeKey, Vec<NodeKey>> = BTreeMap::new();
    for edge in &cfg.edges {
        deps.entry(edge.dependent).or_default().push(edge.depends_on);
    }

    let _ = writeln!(out, "nodes ({}):", cfg.nodes.len());
    for node in &cfg.nodes {
        let _ = writeln!(out, "  - {} {}", node.key, node.name);
        let _ = writeln!(out, "      status: {}", node.status);
        if let Some(d) = node.duration {
            let _ = writeln!(out, "      duration: {} {:?}", d.amount, d.unit);
        }
        if let Some(parent) = node.parent {
            let _ = writeln!(out, "      parent: {parent}");
        }
        if let Some(list) = deps.get(&node.key) {
            let names: Vec<String> = list.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "      after: {}", names.join(", "));
        }
        if let Some(reason) = &node.blocked_reason {
            let _ = writeln!(out, "      blocked: {reason}");
        }
        if let Some(reason) = &node.status_reason {
            let _ = writeln!(out, "      reason: {reason}");
        }
    }
    out
}

/// One line per applied action.
pub fn render_transitions(results: &[TransitionResult]) -> String {
    let mut out = String::new();
    for r in results {
        let _ = writeln!(out, "{} {}: {} -> {}", r.action, r.node, r.from, r.to);
        for event in &r.events {
            match event {
                WorkflowEvent::NowUnblocked { node, .. } => {
                    let _ = writeln!(out, "  {node} can now start");
                }
                WorkflowEvent::ParentPromoted { node, .. } => {
                    let _ = writeln!(out, "  {node} promoted to IN_PROGRESS");
                }
                WorkflowEvent::Transitioned { .. } => {}
            }
        }
    }
    out
}

/// Full schedule table plus summary analytics.
pub fn render_schedule(snapshot: &ScheduleSnapshot, nodes: &[WorkNode]) -> String {
    let names: BTreeMap<NodeKey, &WorkNode> = nodes.iter().map(|n| (n.key, n)).collect();
    let summary = &snapshot.summary;
    let mut out = String::new();

    let _ = writeln!(out, "schedule as of {} (region {})", snapshot.as_of, snapshot.region);
    let _ = writeln!(
        out,
        "  {} -> {} ({} business days)",
        summary.project_start, summary.project_finish, summary.critical_path_duration
    );
    let _ = writeln!(out, "  risk score: {}/100", summary.risk_score);
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{:<14} {:<15} {:>4} {:<10} {:<10} {:>5}  flags",
        "node", "status", "days", "start", "finish", "slack"
    );
    for (key, s) in &snapshot.nodes {
        let status = names.get(key).map(|n| n.status.as_str()).unwrap_or("-");
        let mut flags = Vec::new();
        if s.is_critical_path {
            flags.push("critical");
        }
        if s.at_risk {
            flags.push("at-risk");
        }
        if !s.dependencies_satisfied {
            flags.push("waiting");
        }
        let _ = writeln!(
            out,
            "{:<14} {:<15} {:>4} {:<10} {:<10} {:>5}  {}",
            key.to_string(),
            status,
            s.duration_days,
            s.planned_start,
            s.planned_end,
            s.slack_days,
            flags.join(",")
        );
    }

    let path: Vec<String> = summary.critical_path.iter().map(ToString::to_string).collect();
    let _ = writeln!(out);
    let _ = writeln!(out, "critical path: {}", path.join(" -> "));
    let _ = writeln!(out, "total slack: {} business days", summary.total_slack);

    if !summary.bottlenecks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "bottlenecks:");
        for b in &summary.bottlenecks {
            let _ = writeln!(
                out,
                "  [{}] {} ({} successors, {} days downstream slack): {}",
                b.severity, b.node, b.successor_count, b.downstream_slack, b.recommendation
            );
        }
    }

    if !summary.parallel_opportunities.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "parallel opportunities:");
        for p in &summary.parallel_opportunities {
            let members: Vec<String> = p.nodes.iter().map(ToString::to_string).collect();
            let _ = writeln!(
                out,
                "  after {}: {} (save {} of {} days)",
                p.common_predecessor,
                members.join(", "),
                p.potential_saving_days,
                p.sequential_days
            );
        }
    }

    for warning in &snapshot.warnings {
        let _ = writeln!(out, "{warning}");
    }
    out
}
