// src/schedule/calculator.rs

//! Critical-path calculation over business days.
//!
//! The pass is classic CPM:
//! 1. reject cyclic graphs,
//! 2. order nodes topologically,
//! 3. forward pass for earliest start/finish,
//! 4. backward pass from the project finish for latest start/finish,
//! 5. slack and criticality per node and per edge,
//! 6. bottleneck, parallel-opportunity and risk analysis.
//!
//! Dates are half-open: a node with `d` business days starting on `s`
//! finishes on `add_business_days(s, d)`, which is also the earliest day a
//! lag-free successor can start.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::calendar::BusinessCalendar;
use crate::errors::Result;
use crate::graph::{DependencyGraph, EdgeAnnotation, WorkNode};
use crate::schedule::analysis;
use crate::schedule::snapshot::{NodeSchedule, ScheduleSnapshot, ScheduleSummary, ScheduleWarning};
use crate::types::{EntityType, NodeKey};
use crate::workflow::status::{NodeStatus, WorkStatus};

/// Forward-pass result for one node (internal).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pass {
    pub es: NaiveDate,
    pub ef: NaiveDate,
    pub ls: NaiveDate,
    pub lf: NaiveDate,
    /// Estimated business days before any progress adjustment.
    pub estimate: i64,
    /// In-progress work whose finish had to be moved past `as_of`.
    pub replanned: bool,
}

/// Computes [`ScheduleSnapshot`]s for one region's calendar.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleCalculator<'a> {
    calendar: &'a BusinessCalendar,
    region: &'a str,
}

impl<'a> ScheduleCalculator<'a> {
    pub fn new(calendar: &'a BusinessCalendar, region: &'a str) -> Self {
        Self { calendar, region }
    }

    /// Recompute the whole schedule.
    ///
    /// Fails with `CycleDetected` before producing anything if the graph is
    /// cyclic. Never modifies the graph.
    pub fn recompute(
        &self,
        graph: &DependencyGraph,
        project_start: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<ScheduleSnapshot> {
        graph.validate_acyclic()?;
        let order = graph.topological_order()?;

        let start = self.calendar.align_forward(project_start, self.region);
        let today = self.calendar.align_forward(as_of, self.region);
        let mut warnings = Vec::new();

        let mut passes: HashMap<NodeKey, Pass> = HashMap::with_capacity(order.len());
        for key in &order {
            let node = graph.require(*key)?;
            let estimate = self.estimate_days(node, &mut warnings);
            let ready = self.ready_date(graph, *key, start, &passes);
            let pass = self.forward(node, estimate, ready, today);
            passes.insert(*key, pass);
        }

        let project_finish = passes.values().map(|p| p.ef).max().unwrap_or(start).max(start);

        for key in order.iter().rev() {
            let node = graph.require(*key)?;
            let lf = graph
                .outgoing_edges(*key)
                .iter()
                .filter_map(|e| {
                    passes
                        .get(&e.dependent)
                        .map(|succ| self.calendar.add_business_days(succ.ls, -e.lag_days, self.region))
                })
                .min()
                .unwrap_or(project_finish);

            if let Some(pass) = passes.get_mut(key) {
                if is_settled(&node.status) {
                    pass.ls = pass.es;
                    pass.lf = pass.ef;
                } else {
                    let span = self.calendar.business_days_between(pass.es, pass.ef, self.region);
                    pass.lf = lf;
                    pass.ls = self.calendar.add_business_days(lf, -span, self.region);
                }
            }
        }

        let mut nodes = BTreeMap::new();
        for key in &order {
            let node = graph.require(*key)?;
            let Some(pass) = passes.get(key) else { continue };
            nodes.insert(*key, self.node_schedule(graph, node, pass, today));
        }

        let edges: Vec<EdgeAnnotation> = graph
            .edges()
            .iter()
            .filter_map(|e| {
                let pred = passes.get(&e.depends_on)?;
                let succ = passes.get(&e.dependent)?;
                let ready = self.calendar.add_business_days(pred.ef, e.lag_days, self.region);
                let slack = self.calendar.business_days_between(ready, succ.es, self.region).max(0);
                let critical = nodes.get(&e.depends_on).is_some_and(|n: &NodeSchedule| n.is_critical_path)
                    && nodes.get(&e.dependent).is_some_and(|n: &NodeSchedule| n.is_critical_path)
                    && slack == 0;
                Some(EdgeAnnotation {
                    edge: e.id,
                    is_critical_path: critical,
                    slack_days: slack,
                })
            })
            .collect();

        let critical_path: Vec<NodeKey> = order
            .iter()
            .filter(|k| nodes.get(*k).is_some_and(|n| n.is_critical_path))
            .copied()
            .collect();
        // Measured from the head of the critical chain: idle days before
        // `as_of` and finished work are not part of it.
        let critical_path_duration = critical_path
            .iter()
            .filter_map(|k| nodes.get(k))
            .map(|n| n.planned_start)
            .min()
            .map_or(0, |head| self.calendar.business_days_between(head, project_finish, self.region));
        let total_slack = nodes.values().map(|n| n.slack_days).sum();
        let bottlenecks = analysis::bottlenecks(graph, &nodes);
        let parallel_opportunities = analysis::parallel_opportunities(graph, &nodes);
        let risk_score = analysis::risk_score(graph, &nodes, &passes);

        let summary = ScheduleSummary {
            project_start: start,
            project_finish,
            critical_path_duration,
            critical_path,
            total_slack,
            bottlenecks,
            parallel_opportunities,
            risk_score,
        };

        info!(
            nodes = nodes.len(),
            finish = %summary.project_finish,
            duration = summary.critical_path_duration,
            critical = summary.critical_path.len(),
            risk = summary.risk_score,
            warnings = warnings.len(),
            "schedule recomputed"
        );

        Ok(ScheduleSnapshot {
            as_of,
            region: self.region.to_string(),
            nodes,
            edges,
            summary,
            warnings,
        })
    }

    /// Estimated business days; a missing estimate counts as zero.
    fn estimate_days(&self, node: &WorkNode, warnings: &mut Vec<ScheduleWarning>) -> i64 {
        match node.duration {
            Some(d) => self.calendar.duration_in_business_days(d),
            None => {
                // Assignments carry no duration of their own.
                if node.kind() != EntityType::Assignment {
                    warn!(node = %node.key, "no duration estimate; assuming 0 business days");
                    warnings.push(ScheduleWarning {
                        node: Some(node.key),
                        message: "no duration estimate; assuming 0 business days".to_string(),
                    });
                }
                0
            }
        }
    }

    /// Latest of the project start and every predecessor's finish plus lag.
    fn ready_date(
        &self,
        graph: &DependencyGraph,
        key: NodeKey,
        start: NaiveDate,
        passes: &HashMap<NodeKey, Pass>,
    ) -> NaiveDate {
        graph
            .incoming_edges(key)
            .iter()
            .filter_map(|e| {
                passes
                    .get(&e.depends_on)
                    .map(|pred| self.calendar.add_business_days(pred.ef, e.lag_days, self.region))
            })
            .fold(start, NaiveDate::max)
    }

    fn forward(&self, node: &WorkNode, estimate: i64, ready: NaiveDate, today: NaiveDate) -> Pass {
        let cal = self.calendar;
        let region = self.region;
        let mut replanned = false;

        let (es, ef) = match node.status {
            _ if node.status.is_complete() => {
                let es = node.actual_start.unwrap_or_else(|| cal.align_forward(ready, region));
                let ef = node
                    .actual_end
                    .unwrap_or_else(|| cal.add_business_days(es, estimate, region));
                (es, ef.max(es))
            }
            _ if node.status.is_dead() => {
                let es = cal.align_forward(ready, region);
                (es, es)
            }
            NodeStatus::Work(WorkStatus::InProgress) | NodeStatus::Work(WorkStatus::OnHold)
                if node.actual_start.is_some() =>
            {
                let es = node.actual_start.unwrap_or(ready);
                let mut ef = cal.add_business_days(es, estimate, region);
                if ef < today {
                    let remaining = remaining_days(estimate, node.completion);
                    ef = cal.add_business_days(today, remaining, region);
                    replanned = true;
                    debug!(node = %node.key, remaining, %ef, "re-planning overrunning work from as-of date");
                }
                (es, ef)
            }
            _ => {
                let es = cal.align_forward(ready.max(today), region);
                (es, cal.add_business_days(es, estimate, region))
            }
        };

        Pass {
            es,
            ef,
            ls: es,
            lf: ef,
            estimate,
            replanned,
        }
    }

    fn node_schedule(&self, graph: &DependencyGraph, node: &WorkNode, pass: &Pass, today: NaiveDate) -> NodeSchedule {
        let raw_slack = self.calendar.business_days_between(pass.es, pass.ls, self.region);
        let settled = is_settled(&node.status);
        let is_critical_path = !settled && raw_slack <= 0;
        let dependencies_satisfied = graph.dependencies_satisfied(node.key);

        let speculative = node.status.is_in_progress() && !dependencies_satisfied;
        let late_start = node.status.is_not_started() && node.planned_start.is_some_and(|p| p < today);
        let at_risk = !settled && (node.is_blocked() || speculative || pass.replanned || late_start);

        NodeSchedule {
            node: node.key,
            duration_days: self.calendar.business_days_between(pass.es, pass.ef, self.region),
            planned_start: pass.es,
            planned_end: pass.ef,
            latest_start: pass.ls,
            latest_finish: pass.lf,
            actual_start: node.actual_start,
            actual_end: node.actual_end,
            is_critical_path,
            slack_days: if settled { 0 } else { raw_slack.max(0) },
            dependencies_satisfied,
            at_risk,
            variance_days: node
                .planned_end
                .map(|baseline| self.calendar.business_days_between(baseline, pass.ef, self.region)),
        }
    }
}

/// Finished, cancelled or declined: no longer schedulable work.
fn is_settled(status: &NodeStatus) -> bool {
    status.is_complete() || status.is_dead()
}

/// Share of `estimate` left at `completion` percent, rounded up.
fn remaining_days(estimate: i64, completion: u8) -> i64 {
    let left = 100 - i64::from(completion.min(100));
    (estimate * left + 99) / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarSettings, Holiday, HolidayCalendar};
    use crate::errors::SiteplanError;
    use crate::types::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monday() -> NaiveDate {
        d(2024, 1, 8)
    }

    fn task(id: u64, days: u32) -> WorkNode {
        WorkNode::new(NodeKey::task(id), format!("task {id}")).with_duration(Duration::days(days))
    }

    /// 1(3) -> 2(2) -> 3(4); 1 -> 4(1) -> 3
    fn diamond() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (id, days) in [(1, 3), (2, 2), (3, 4), (4, 1)] {
            g.add_node(task(id, days)).unwrap();
        }
        g.add_edge(NodeKey::task(2), NodeKey::task(1), 0).unwrap();
        g.add_edge(NodeKey::task(3), NodeKey::task(2), 0).unwrap();
        g.add_edge(NodeKey::task(4), NodeKey::task(1), 0).unwrap();
        g.add_edge(NodeKey::task(3), NodeKey::task(4), 0).unwrap();
        g
    }

    #[test]
    fn forward_and_backward_pass_on_a_diamond() {
        let cal = BusinessCalendar::weekdays_only();
        let calc = ScheduleCalculator::new(&cal, "NSW");
        let snap = calc.recompute(&diamond(), monday(), monday()).unwrap();

        let t1 = snap.node(NodeKey::task(1)).unwrap();
        assert_eq!(t1.planned_start, d(2024, 1, 8));
        assert_eq!(t1.planned_end, d(2024, 1, 11));

        let t2 = snap.node(NodeKey::task(2)).unwrap();
        assert_eq!(t2.planned_start, d(2024, 1, 11));
        assert_eq!(t2.planned_end, d(2024, 1, 15));

        let t3 = snap.node(NodeKey::task(3)).unwrap();
        assert_eq!(t3.planned_start, d(2024, 1, 15));
        assert_eq!(t3.planned_end, d(2024, 1, 19));

        let t4 = snap.node(NodeKey::task(4)).unwrap();
        assert!(!t4.is_critical_path);
        assert_eq!(t4.slack_days, 1);
        assert_eq!(t4.latest_start, d(2024, 1, 12));

        assert_eq!(
            snap.summary.critical_path,
            vec![NodeKey::task(1), NodeKey::task(2), NodeKey::task(3)]
        );
        assert_eq!(snap.summary.critical_path_duration, 9);
        assert_eq!(snap.summary.total_slack, 1);
    }

    #[test]
    fn edge_annotations_mark_the_critical_chain() {
        let cal = BusinessCalendar::weekdays_only();
        let g = diamond();
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, monday(), monday())
            .unwrap();

        let find = |from: u64, to: u64| {
            let id = g.edge_between(NodeKey::task(from), NodeKey::task(to)).unwrap().id;
            *snap.edges.iter().find(|a| a.edge == id).unwrap()
        };
        assert!(find(1, 2).is_critical_path);
        assert!(find(2, 3).is_critical_path);
        assert!(!find(1, 4).is_critical_path);
        assert_eq!(find(4, 3).slack_days, 1);
    }

    #[test]
    fn lag_and_holidays_push_dates() {
        let mut holidays = HolidayCalendar::new().with_region("NSW");
        holidays
            .insert(Holiday::state(d(2024, 1, 26), "Australia Day", "NSW"))
            .unwrap();
        let cal = BusinessCalendar::new(CalendarSettings::default(), holidays).unwrap();

        let mut g = DependencyGraph::new();
        g.add_node(task(1, 5)).unwrap();
        g.add_node(task(2, 1)).unwrap();
        g.add_edge(NodeKey::task(2), NodeKey::task(1), 2).unwrap();

        // Mon 22 Jan + 5 bd (skipping Fri 26) = Tue 30 Jan; +2 lag = Thu 1 Feb.
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, d(2024, 1, 22), d(2024, 1, 22))
            .unwrap();
        assert_eq!(snap.node(NodeKey::task(1)).unwrap().planned_end, d(2024, 1, 30));
        assert_eq!(snap.node(NodeKey::task(2)).unwrap().planned_start, d(2024, 2, 1));
    }

    #[test]
    fn weekend_project_start_is_aligned() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = DependencyGraph::new();
        g.add_node(task(1, 1)).unwrap();
        let saturday = d(2024, 1, 6);
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, saturday, saturday)
            .unwrap();
        assert_eq!(snap.summary.project_start, d(2024, 1, 8));
        assert_eq!(snap.node(NodeKey::task(1)).unwrap().planned_start, d(2024, 1, 8));
    }

    #[test]
    fn missing_duration_is_a_warning_not_an_error() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = DependencyGraph::new();
        g.add_node(WorkNode::new(NodeKey::step(1), "unestimated")).unwrap();
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, monday(), monday())
            .unwrap();
        assert_eq!(snap.warnings.len(), 1);
        assert_eq!(snap.warnings[0].node, Some(NodeKey::step(1)));
        assert_eq!(snap.node(NodeKey::step(1)).unwrap().duration_days, 0);
    }

    #[test]
    fn cycle_aborts_without_snapshot() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = diamond();
        g.force_edge_unchecked(NodeKey::task(1), NodeKey::task(3));
        let err = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, monday(), monday())
            .unwrap_err();
        assert!(matches!(err, SiteplanError::CycleDetected(_)));
    }

    #[test]
    fn completed_nodes_use_actual_dates_and_are_not_critical() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = DependencyGraph::new();
        g.add_node(
            task(1, 3)
                .with_status(NodeStatus::Work(WorkStatus::Completed))
                .with_actual_start(d(2024, 1, 2))
                .with_actual_end(d(2024, 1, 4)),
        )
        .unwrap();
        g.add_node(task(2, 2)).unwrap();
        g.add_edge(NodeKey::task(2), NodeKey::task(1), 0).unwrap();

        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, d(2024, 1, 2), d(2024, 1, 4))
            .unwrap();
        let t1 = snap.node(NodeKey::task(1)).unwrap();
        assert_eq!(t1.planned_end, d(2024, 1, 4));
        assert!(!t1.is_critical_path);
        let t2 = snap.node(NodeKey::task(2)).unwrap();
        assert_eq!(t2.planned_start, d(2024, 1, 4));
        assert!(t2.is_critical_path);
    }

    #[test]
    fn overrunning_work_is_replanned_from_as_of() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = DependencyGraph::new();
        let mut node = task(1, 4)
            .with_status(NodeStatus::Work(WorkStatus::InProgress))
            .with_actual_start(d(2024, 1, 8));
        node.completion = 50;
        g.add_node(node).unwrap();

        // Due Fri 12 Jan; on Mon 15 Jan half of it (2 days) is still left.
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, d(2024, 1, 8), d(2024, 1, 15))
            .unwrap();
        let t1 = snap.node(NodeKey::task(1)).unwrap();
        assert_eq!(t1.planned_end, d(2024, 1, 17));
        assert!(t1.at_risk);
        assert!(t1.is_critical_path);
    }

    #[test]
    fn not_started_work_never_starts_before_as_of() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = DependencyGraph::new();
        g.add_node(task(1, 2)).unwrap();
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, d(2024, 1, 8), d(2024, 1, 10))
            .unwrap();
        assert_eq!(snap.node(NodeKey::task(1)).unwrap().planned_start, d(2024, 1, 10));
    }

    #[test]
    fn project_duration_starts_at_the_head_of_the_critical_chain() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = DependencyGraph::new();
        g.add_node(task(1, 3)).unwrap();
        g.add_node(task(2, 2)).unwrap();
        g.add_edge(NodeKey::task(2), NodeKey::task(1), 0).unwrap();

        // Nothing moved for two weeks; the chain now starts on Mon 22 Jan.
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, d(2024, 1, 8), d(2024, 1, 22))
            .unwrap();
        let chain: i64 = snap
            .summary
            .critical_path
            .iter()
            .map(|k| snap.node(*k).unwrap().duration_days)
            .sum();
        assert_eq!(snap.summary.critical_path, vec![NodeKey::task(1), NodeKey::task(2)]);
        assert_eq!(chain, 5);
        assert_eq!(snap.summary.critical_path_duration, chain);
        assert_eq!(snap.summary.project_start, d(2024, 1, 8));
        assert_eq!(snap.summary.project_finish, d(2024, 1, 29));
    }

    #[test]
    fn finished_project_has_no_critical_duration() {
        let cal = BusinessCalendar::weekdays_only();
        let mut g = DependencyGraph::new();
        g.add_node(
            task(1, 3)
                .with_status(NodeStatus::Work(WorkStatus::Completed))
                .with_actual_start(d(2024, 1, 8))
                .with_actual_end(d(2024, 1, 11)),
        )
        .unwrap();
        let snap = ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, d(2024, 1, 8), d(2024, 1, 15))
            .unwrap();
        assert!(snap.summary.critical_path.is_empty());
        assert_eq!(snap.summary.critical_path_duration, 0);
        assert_eq!(snap.summary.project_finish, d(2024, 1, 11));
    }

    #[test]
    fn calculation_does_not_touch_the_graph() {
        let cal = BusinessCalendar::weekdays_only();
        let g = diamond();
        let before_nodes: Vec<WorkNode> = g.nodes().cloned().collect();
        let before_edges = g.edges().to_vec();
        ScheduleCalculator::new(&cal, "NSW")
            .recompute(&g, monday(), monday())
            .unwrap();
        assert_eq!(g.nodes().cloned().collect::<Vec<_>>(), before_nodes);
        assert_eq!(g.edges(), before_edges.as_slice());
    }

    #[test]
    fn remaining_days_rounds_up() {
        assert_eq!(remaining_days(4, 50), 2);
        assert_eq!(remaining_days(3, 50), 2);
        assert_eq!(remaining_days(3, 100), 0);
        assert_eq!(remaining_days(0, 0), 0);
    }
}
