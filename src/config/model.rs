// src/config/model.rs

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::calendar::{BusinessCalendar, Holiday};
use crate::engine::{ProjectCore, ProjectInfo};
use crate::errors::Result;
use crate::graph::{DependencyGraph, WorkNode};
use crate::types::{DurationUnit, NodeKey, ParentPromotion};
use crate::workflow::WorkflowStateMachine;

/// Project file as read from TOML.
///
/// ```toml
/// [project]
/// id = "harbour-st"
/// name = "12 Harbour St"
/// start_date = "2024-01-08"
/// region = "NSW"
///
/// [calendar]
/// working_days = ["mon", "tue", "wed", "thu", "fri"]
/// start_of_day = "07:00"
/// end_of_day = "15:00"
///
/// [[holiday]]
/// date = "2024-01-26"
/// name = "Australia Day"
/// scope = "national"
///
/// [[node]]
/// key = "stage:1"
/// name = "Site establishment"
/// duration = 3
///
/// [[node]]
/// key = "task:1"
/// name = "Set out"
/// parent = "stage:1"
/// duration = 16
/// unit = "hours"
///
/// [[edge]]
/// dependent = "task:1"
/// depends_on = "stage:1"
/// ```
///
/// Dates and times are quoted strings. Nothing here is semantically checked;
/// convert into [`ProjectConfig`] with `TryFrom` for that.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProjectFile {
    pub project: ProjectSection,

    #[serde(default)]
    pub calendar: CalendarSection,

    #[serde(default)]
    pub workflow: WorkflowSection,

    #[serde(default)]
    pub holiday: Vec<Holiday>,

    #[serde(default)]
    pub node: Vec<NodeConfig>,

    #[serde(default)]
    pub edge: Vec<EdgeConfig>,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    pub start_date: NaiveDate,

    /// Holiday region of the site; defaults to `calendar.default_region`.
    #[serde(default)]
    pub region: Option<String>,
}

/// `[calendar]` section. Missing keys keep the default Mon-Fri 07:00-15:00 week.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CalendarSection {
    #[serde(default)]
    pub working_days: Option<Vec<String>>,

    /// `HH:MM` or `HH:MM:SS`.
    #[serde(default)]
    pub start_of_day: Option<String>,

    #[serde(default)]
    pub end_of_day: Option<String>,

    #[serde(default)]
    pub default_region: Option<String>,

    /// Regions that observe national holidays, besides the default and the
    /// project region.
    #[serde(default)]
    pub regions: Vec<String>,
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkflowSection {
    #[serde(default)]
    pub parent_promotion: ParentPromotion,
}

/// `[[node]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub key: NodeKey,

    pub name: String,

    /// Estimated duration in `unit`s; absent means "not estimated".
    #[serde(default)]
    pub duration: Option<u32>,

    #[serde(default)]
    pub unit: DurationUnit,

    /// Status name such as `"IN_PROGRESS"`; defaults to the kind's initial
    /// status.
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub parent: Option<NodeKey>,

    #[serde(default)]
    pub planned_start: Option<NaiveDate>,

    #[serde(default)]
    pub planned_end: Option<NaiveDate>,

    #[serde(default)]
    pub actual_start: Option<NaiveDate>,

    #[serde(default)]
    pub actual_end: Option<NaiveDate>,

    #[serde(default)]
    pub completion: u8,

    #[serde(default)]
    pub assignee: Option<String>,

    #[serde(default)]
    pub blocked_reason: Option<String>,

    /// Why the node is on hold, declined or cancelled.
    #[serde(default)]
    pub status_reason: Option<String>,
}

/// `[[edge]]` entry: `dependent` cannot start until `depends_on` finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EdgeConfig {
    pub dependent: NodeKey,
    pub depends_on: NodeKey,

    #[serde(default)]
    pub lag_days: i64,
}

/// Validated project configuration.
///
/// Only constructed through `TryFrom<RawProjectFile>` (see `validate.rs`), so
/// every node status, calendar setting and edge endpoint has been checked and
/// the edge set is acyclic.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub info: ProjectInfo,
    pub calendar: BusinessCalendar,
    pub parent_promotion: ParentPromotion,
    /// Sorted by key, so parents come before their children.
    pub nodes: Vec<WorkNode>,
    pub edges: Vec<EdgeConfig>,
}

impl ProjectConfig {
    pub(crate) fn new_unchecked(
        info: ProjectInfo,
        calendar: BusinessCalendar,
        parent_promotion: ParentPromotion,
        nodes: Vec<WorkNode>,
        edges: Vec<EdgeConfig>,
    ) -> Self {
        Self {
            info,
            calendar,
            parent_promotion,
            nodes,
            edges,
        }
    }

    /// Build the in-memory project.
    pub fn build_project(self) -> Result<ProjectCore> {
        let mut graph = DependencyGraph::new();
        for node in self.nodes {
            graph.add_node(node)?;
        }
        for edge in &self.edges {
            graph.add_edge(edge.dependent, edge.depends_on, edge.lag_days)?;
        }
        Ok(ProjectCore::new(
            self.info,
            graph,
            self.calendar,
            WorkflowStateMachine::new(self.parent_promotion),
        ))
    }
}

/// `HH:MM[:SS]` parser for calendar times.
pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}
