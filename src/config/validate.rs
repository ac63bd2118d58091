// src/config/validate.rs

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::Weekday;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::calendar::holiday::normalize_region;
use crate::calendar::{BusinessCalendar, CalendarSettings, HolidayCalendar};
use crate::config::model::{CalendarSection, NodeConfig, ProjectConfig, RawProjectFile, parse_time};
use crate::engine::ProjectInfo;
use crate::errors::{Result, SiteplanError};
use crate::graph::WorkNode;
use crate::types::{Duration, DurationUnit, NodeKey};
use crate::workflow::NodeStatus;

impl TryFrom<RawProjectFile> for ProjectConfig {
    type Error = SiteplanError;

    fn try_from(raw: RawProjectFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_nodes(&raw)?;
        let keys = validate_node_keys(&raw)?;
        validate_edges(&raw, &keys)?;
        validate_dag(&raw)?;

        let settings = calendar_settings(&raw.calendar)?;
        let region = normalize_region(
            raw.project
                .region
                .as_deref()
                .unwrap_or(&settings.default_region),
        );

        let mut holidays = HolidayCalendar::new()
            .with_region(&settings.default_region)
            .with_region(&region);
        for extra in &raw.calendar.regions {
            holidays.register_region(extra);
        }
        for holiday in raw.holiday {
            holidays
                .insert(holiday)
                .map_err(|e| SiteplanError::ConfigError(format!("[[holiday]]: {e}")))?;
        }
        let calendar = BusinessCalendar::new(settings, holidays)
            .map_err(|e| SiteplanError::ConfigError(format!("[calendar]: {e}")))?;

        let mut nodes = raw
            .node
            .iter()
            .map(work_node)
            .collect::<Result<Vec<_>>>()?;
        nodes.sort_by_key(|n| n.key);

        let info = ProjectInfo {
            name: raw.project.name.unwrap_or_else(|| raw.project.id.clone()),
            id: raw.project.id,
            start_date: raw.project.start_date,
            region,
        };

        Ok(ProjectConfig::new_unchecked(
            info,
            calendar,
            raw.workflow.parent_promotion,
            nodes,
            raw.edge,
        ))
    }
}

fn ensure_has_nodes(cfg: &RawProjectFile) -> Result<()> {
    if cfg.project.id.trim().is_empty() {
        return Err(SiteplanError::ConfigError(
            "[project].id must not be empty".to_string(),
        ));
    }
    if cfg.node.is_empty() {
        return Err(SiteplanError::ConfigError(
            "project must contain at least one [[node]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_node_keys(cfg: &RawProjectFile) -> Result<BTreeSet<NodeKey>> {
    let mut keys = BTreeSet::new();
    for node in &cfg.node {
        if !keys.insert(node.key) {
            return Err(SiteplanError::ConfigError(format!(
                "node '{}' is defined more than once",
                node.key
            )));
        }
    }
    for node in &cfg.node {
        if let Some(parent) = node.parent {
            if !keys.contains(&parent) {
                return Err(SiteplanError::ConfigError(format!(
                    "node '{}' has unknown parent '{}'",
                    node.key, parent
                )));
            }
            if parent.kind >= node.key.kind {
                return Err(SiteplanError::ConfigError(format!(
                    "'{}' cannot be the parent of '{}'",
                    parent, node.key
                )));
            }
        }
        if node.completion > 100 {
            return Err(SiteplanError::ConfigError(format!(
                "node '{}' has completion {} (must be 0..=100)",
                node.key, node.completion
            )));
        }
    }
    Ok(keys)
}

fn validate_edges(cfg: &RawProjectFile, keys: &BTreeSet<NodeKey>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for edge in &cfg.edge {
        for end in [edge.dependent, edge.depends_on] {
            if !keys.contains(&end) {
                return Err(SiteplanError::ConfigError(format!(
                    "edge {} -> {} refers to unknown node '{}'",
                    edge.depends_on, edge.dependent, end
                )));
            }
        }
        if edge.dependent == edge.depends_on {
            return Err(SiteplanError::ConfigError(format!(
                "node '{}' cannot depend on itself",
                edge.dependent
            )));
        }
        if edge.lag_days < 0 {
            return Err(SiteplanError::ConfigError(format!(
                "edge {} -> {} has negative lag_days ({})",
                edge.depends_on, edge.dependent, edge.lag_days
            )));
        }
        if !seen.insert((edge.depends_on, edge.dependent)) {
            return Err(SiteplanError::ConfigError(format!(
                "edge {} -> {} is listed more than once",
                edge.depends_on, edge.dependent
            )));
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawProjectFile) -> Result<()> {
    // Edge direction: depends_on -> dependent.
    let mut graph: DiGraphMap<NodeKey, ()> = DiGraphMap::new();
    for node in &cfg.node {
        graph.add_node(node.key);
    }
    for edge in &cfg.edge {
        graph.add_edge(edge.depends_on, edge.dependent, ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SiteplanError::CycleDetected(format!(
            "cycle in [[edge]] list involving node '{}'",
            cycle.node_id()
        ))),
    }
}

fn calendar_settings(section: &CalendarSection) -> Result<CalendarSettings> {
    let mut settings = CalendarSettings::default();

    if let Some(days) = &section.working_days {
        let mut parsed = Vec::with_capacity(days.len());
        for day in days {
            let weekday = Weekday::from_str(day).map_err(|_| {
                SiteplanError::ConfigError(format!("[calendar].working_days: unknown weekday '{day}'"))
            })?;
            if !parsed.contains(&weekday) {
                parsed.push(weekday);
            }
        }
        settings.working_days = parsed;
    }
    if let Some(start) = &section.start_of_day {
        settings.start_of_day = parse_time(start).ok_or_else(|| {
            SiteplanError::ConfigError(format!("[calendar].start_of_day: invalid time '{start}'"))
        })?;
    }
    if let Some(end) = &section.end_of_day {
        settings.end_of_day = parse_time(end).ok_or_else(|| {
            SiteplanError::ConfigError(format!("[calendar].end_of_day: invalid time '{end}'"))
        })?;
    }
    if let Some(region) = &section.default_region {
        settings.default_region = normalize_region(region);
    }
    Ok(settings)
}

fn work_node(cfg: &NodeConfig) -> Result<WorkNode> {
    let mut node = WorkNode::new(cfg.key, cfg.name.clone());

    if let Some(status) = &cfg.status {
        node.status = NodeStatus::parse_for(cfg.key.kind, status)
            .map_err(|e| SiteplanError::ConfigError(format!("node '{}': {e}", cfg.key)))?;
    }
    node.duration = cfg.duration.map(|amount| match cfg.unit {
        DurationUnit::Days => Duration::days(amount),
        DurationUnit::Hours => Duration::hours(amount),
    });
    node.parent = cfg.parent;
    node.planned_start = cfg.planned_start;
    node.planned_end = cfg.planned_end;
    node.actual_start = cfg.actual_start;
    node.actual_end = cfg.actual_end;
    node.completion = cfg.completion;
    node.assignee = cfg.assignee.clone();
    node.blocked_reason = cfg.blocked_reason.clone();
    node.status_reason = cfg.status_reason.clone();
    Ok(node)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::workflow::WorkStatus;

    fn parse(src: &str) -> Result<ProjectConfig> {
        let raw: RawProjectFile = toml::from_str(src)?;
        ProjectConfig::try_from(raw)
    }

    const MINIMAL: &str = r#"
        [project]
        id = "p"
        start_date = "2024-01-08"

        [[node]]
        key = "task:1"
        name = "Excavate"
        duration = 3
    "#;

    #[test]
    fn minimal_file_uses_defaults() {
        let cfg = parse(MINIMAL).unwrap();
        assert_eq!(cfg.info.name, "p");
        assert_eq!(cfg.info.region, "NSW");
        assert_eq!(cfg.info.start_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(cfg.calendar.settings(), &CalendarSettings::default());
        assert_eq!(cfg.nodes[0].duration, Some(Duration::days(3)));
    }

    #[test]
    fn statuses_and_hours_are_parsed() {
        let cfg = parse(
            r#"
            [project]
            id = "p"
            start_date = "2024-01-08"

            [[node]]
            key = "step:4"
            name = "Pour"
            duration = 12
            unit = "hours"
            status = "in_progress"
            actual_start = "2024-01-09"
            completion = 40
            "#,
        )
        .unwrap();
        let node = &cfg.nodes[0];
        assert_eq!(node.status, NodeStatus::Work(WorkStatus::InProgress));
        assert_eq!(node.duration, Some(Duration::hours(12)));
        assert_eq!(node.completion, 40);
    }

    #[test]
    fn ready_to_start_is_only_for_steps() {
        let err = parse(
            r#"
            [project]
            id = "p"
            start_date = "2024-01-08"

            [[node]]
            key = "task:1"
            name = "Frame"
            status = "READY_TO_START"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SiteplanError::ConfigError(_)));
    }

    #[test]
    fn unknown_edge_endpoint_is_rejected() {
        let src = format!("{MINIMAL}\n[[edge]]\ndependent = \"task:1\"\ndepends_on = \"task:9\"\n");
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("task:9"));
    }

    #[test]
    fn cyclic_edges_are_rejected() {
        let err = parse(
            r#"
            [project]
            id = "p"
            start_date = "2024-01-08"

            [[node]]
            key = "task:1"
            name = "a"

            [[node]]
            key = "task:2"
            name = "b"

            [[edge]]
            dependent = "task:1"
            depends_on = "task:2"

            [[edge]]
            dependent = "task:2"
            depends_on = "task:1"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SiteplanError::CycleDetected(_)));
    }

    #[test]
    fn custom_calendar_section() {
        let cfg = parse(
            r#"
            [project]
            id = "p"
            start_date = "2024-01-08"
            region = "vic"

            [calendar]
            working_days = ["mon", "tue", "wed", "thu", "fri", "sat"]
            start_of_day = "06:30"
            end_of_day = "16:30"

            [[holiday]]
            date = "2024-03-11"
            name = "Labour Day"
            scope = "state"
            region = "VIC"

            [[node]]
            key = "task:1"
            name = "x"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.info.region, "VIC");
        assert_eq!(cfg.calendar.settings().working_days.len(), 6);
        assert_eq!(cfg.calendar.working_hours_per_day(), 10.0);
        assert!(!cfg
            .calendar
            .is_business_day(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(), "VIC"));
    }

    #[test]
    fn bad_time_is_a_config_error() {
        let src = MINIMAL.replace(
            "[[node]]",
            "[calendar]\nstart_of_day = \"seven\"\n\n[[node]]",
        );
        let err = parse(&src).unwrap_err();
        assert!(err.to_string().contains("start_of_day"));
    }

    #[test]
    fn empty_project_is_rejected() {
        let err = parse("[project]\nid = \"p\"\nstart_date = \"2024-01-08\"\n").unwrap_err();
        assert!(matches!(err, SiteplanError::ConfigError(_)));
    }

    #[test]
    fn parents_sort_before_children() {
        let cfg = parse(
            r#"
            [project]
            id = "p"
            start_date = "2024-01-08"

            [[node]]
            key = "step:1"
            name = "child"
            parent = "task:1"

            [[node]]
            key = "task:1"
            name = "parent"
            "#,
        )
        .unwrap();
        let core = cfg.build_project().unwrap();
        assert_eq!(core.graph().node_count(), 2);
    }
}
