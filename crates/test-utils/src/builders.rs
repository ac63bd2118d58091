#![allow(dead_code)]

use chrono::NaiveDate;
use siteplan::calendar::{BusinessCalendar, CalendarSettings, Holiday, HolidayCalendar};
use siteplan::engine::{ProjectCore, ProjectInfo};
use siteplan::graph::{DependencyGraph, WorkNode};
use siteplan::types::{Duration, NodeKey, ParentPromotion};
use siteplan::workflow::{NodeStatus, WorkflowStateMachine};

use crate::date;

/// Builder for `ProjectCore` to simplify test setup.
///
/// Nodes and edges are inserted immediately, so a builder call that would
/// violate a graph rule panics at the offending line.
pub struct ProjectBuilder {
    info: ProjectInfo,
    graph: DependencyGraph,
    settings: CalendarSettings,
    holidays: HolidayCalendar,
    policy: ParentPromotion,
}

impl ProjectBuilder {
    /// Project starting Monday 2024-01-08 in NSW.
    pub fn new(id: &str) -> Self {
        Self {
            info: ProjectInfo {
                id: id.to_string(),
                name: id.to_string(),
                start_date: date(2024, 1, 8),
                region: "NSW".to_string(),
            },
            graph: DependencyGraph::new(),
            settings: CalendarSettings::default(),
            holidays: HolidayCalendar::new().with_region("NSW"),
            policy: ParentPromotion::Promote,
        }
    }

    pub fn starting(mut self, start: NaiveDate) -> Self {
        self.info.start_date = start;
        self
    }

    pub fn region(mut self, region: &str) -> Self {
        self.holidays.register_region(region);
        self.info.region = region.to_string();
        self
    }

    pub fn holiday(mut self, holiday: Holiday) -> Self {
        self.holidays.insert(holiday).expect("valid holiday");
        self
    }

    pub fn settings(mut self, settings: CalendarSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn policy(mut self, policy: ParentPromotion) -> Self {
        self.policy = policy;
        self
    }

    pub fn node(mut self, node: WorkNode) -> Self {
        self.graph.add_node(node).expect("node accepted by graph");
        self
    }

    pub fn stage(self, id: u64, days: u32) -> Self {
        self.node(WorkNode::new(NodeKey::stage(id), format!("stage {id}")).with_duration(Duration::days(days)))
    }

    pub fn task(self, id: u64, days: u32) -> Self {
        self.node(WorkNode::new(NodeKey::task(id), format!("task {id}")).with_duration(Duration::days(days)))
    }

    pub fn step(self, id: u64, days: u32) -> Self {
        self.node(WorkNode::new(NodeKey::step(id), format!("step {id}")).with_duration(Duration::days(days)))
    }

    pub fn child_task(self, id: u64, parent: NodeKey, days: u32) -> Self {
        self.node(
            WorkNode::new(NodeKey::task(id), format!("task {id}"))
                .with_duration(Duration::days(days))
                .with_parent(parent),
        )
    }

    pub fn child_step(self, id: u64, parent: NodeKey, days: u32) -> Self {
        self.node(
            WorkNode::new(NodeKey::step(id), format!("step {id}"))
                .with_duration(Duration::days(days))
                .with_parent(parent),
        )
    }

    /// A node already finished between `start` and `end`.
    pub fn completed(self, key: NodeKey, days: u32, start: NaiveDate, end: NaiveDate) -> Self {
        let status = NodeStatus::Work(siteplan::workflow::WorkStatus::Completed);
        let mut node = WorkNode::new(key, key.to_string())
            .with_duration(Duration::days(days))
            .with_status(status)
            .with_actual_start(start)
            .with_actual_end(end);
        node.completion = 100;
        self.node(node)
    }

    /// `dependent` waits for `depends_on`.
    pub fn edge(self, dependent: NodeKey, depends_on: NodeKey) -> Self {
        self.edge_with_lag(dependent, depends_on, 0)
    }

    pub fn edge_with_lag(mut self, dependent: NodeKey, depends_on: NodeKey, lag: i64) -> Self {
        self.graph
            .add_edge(dependent, depends_on, lag)
            .expect("edge accepted by graph");
        self
    }

    pub fn build_graph(self) -> DependencyGraph {
        self.graph
    }

    pub fn build_calendar(&self) -> BusinessCalendar {
        BusinessCalendar::new(self.settings.clone(), self.holidays.clone())
            .expect("valid calendar settings")
    }

    pub fn build(self) -> ProjectCore {
        let calendar = self.build_calendar();
        ProjectCore::new(
            self.info,
            self.graph,
            calendar,
            WorkflowStateMachine::new(self.policy),
        )
    }
}
