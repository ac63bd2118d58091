// src/types.rs

//! Shared identifiers and small value types: node keys, durations and
//! workflow policies.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Kind discriminator for a work node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Stage,
    Task,
    Step,
    Assignment,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Stage => "stage",
            EntityType::Task => "task",
            EntityType::Step => "step",
            EntityType::Assignment => "assignment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stage" => Ok(EntityType::Stage),
            "task" => Ok(EntityType::Task),
            "step" => Ok(EntityType::Step),
            "assignment" => Ok(EntityType::Assignment),
            other => Err(format!(
                "invalid entity type: {other} (expected \"stage\", \"task\", \"step\" or \"assignment\")"
            )),
        }
    }
}

/// Identity of a work node: `(entity type, entity id)`.
///
/// The textual form is `<type>:<id>`, e.g. `stage:1` or `step:12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct NodeKey {
    pub kind: EntityType,
    pub id: u64,
}

impl NodeKey {
    pub fn new(kind: EntityType, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn stage(id: u64) -> Self {
        Self::new(EntityType::Stage, id)
    }

    pub fn task(id: u64) -> Self {
        Self::new(EntityType::Task, id)
    }

    pub fn step(id: u64) -> Self {
        Self::new(EntityType::Step, id)
    }

    pub fn assignment(id: u64) -> Self {
        Self::new(EntityType::Assignment, id)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for NodeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("invalid node reference: {s} (expected \"<type>:<id>\")"))?;
        let kind = EntityType::from_str(kind)?;
        let id = id
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid node id in {s}: {e}"))?;
        Ok(NodeKey { kind, id })
    }
}

impl TryFrom<String> for NodeKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NodeKey::from_str(&value)
    }
}

/// Dependency semantics of an edge. Only finish-to-start is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    #[default]
    FinishToStart,
}

/// How a node's estimated duration is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Days,
    Hours,
}

/// Estimated duration of a work node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    pub amount: u32,
    pub unit: DurationUnit,
}

impl Duration {
    pub fn days(amount: u32) -> Self {
        Self {
            amount,
            unit: DurationUnit::Days,
        }
    }

    pub fn hours(amount: u32) -> Self {
        Self {
            amount,
            unit: DurationUnit::Hours,
        }
    }
}

/// Whether a child starting should promote its not-started parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParentPromotion {
    /// Move `NOT_STARTED` parents to `IN_PROGRESS` when a child starts.
    #[default]
    Promote,
    /// Leave parent status alone.
    Disabled,
}

impl FromStr for ParentPromotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "promote" => Ok(ParentPromotion::Promote),
            "disabled" => Ok(ParentPromotion::Disabled),
            other => Err(format!(
                "invalid parent_promotion: {other} (expected \"promote\" or \"disabled\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_parses_textual_form() {
        assert_eq!("step:12".parse::<NodeKey>().unwrap(), NodeKey::step(12));
        assert_eq!(" Stage:1 ".parse::<NodeKey>().unwrap(), NodeKey::stage(1));
        assert_eq!(NodeKey::assignment(3).to_string(), "assignment:3");
    }

    #[test]
    fn node_key_rejects_garbage() {
        assert!("step".parse::<NodeKey>().is_err());
        assert!("phase:1".parse::<NodeKey>().is_err());
        assert!("task:-1".parse::<NodeKey>().is_err());
    }

    #[test]
    fn node_keys_order_by_kind_then_id() {
        let mut keys = vec![NodeKey::step(1), NodeKey::stage(2), NodeKey::stage(1)];
        keys.sort();
        assert_eq!(keys, vec![NodeKey::stage(1), NodeKey::stage(2), NodeKey::step(1)]);
    }
}
