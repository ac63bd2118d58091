// src/workflow/action.rs

//! Workflow actions and the context they are applied in.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

/// An action requested against a single work node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Complete,
    Accept,
    Decline { reason: Option<String> },
    Block { reason: String },
    Unblock,
    /// Completion percentage; validated to `0..=100` by the state machine.
    UpdateProgress { percent: i64 },
    MarkReady,
    Hold { reason: Option<String> },
    Resume,
    Cancel { reason: Option<String> },
}

/// Payload-free discriminator of an [`Action`], used in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Start,
    Complete,
    Accept,
    Decline,
    Block,
    Unblock,
    UpdateProgress,
    MarkReady,
    Hold,
    Resume,
    Cancel,
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Start => ActionType::Start,
            Action::Complete => ActionType::Complete,
            Action::Accept => ActionType::Accept,
            Action::Decline { .. } => ActionType::Decline,
            Action::Block { .. } => ActionType::Block,
            Action::Unblock => ActionType::Unblock,
            Action::UpdateProgress { .. } => ActionType::UpdateProgress,
            Action::MarkReady => ActionType::MarkReady,
            Action::Hold { .. } => ActionType::Hold,
            Action::Resume => ActionType::Resume,
            Action::Cancel { .. } => ActionType::Cancel,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Start => "start",
            ActionType::Complete => "complete",
            ActionType::Accept => "accept",
            ActionType::Decline => "decline",
            ActionType::Block => "block",
            ActionType::Unblock => "unblock",
            ActionType::UpdateProgress => "progress",
            ActionType::MarkReady => "ready",
            ActionType::Hold => "hold",
            ActionType::Resume => "resume",
            ActionType::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Parses `name` or `name=argument`, e.g. `start`, `progress=40`,
/// `block=waiting on council permit`.
impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once('=') {
            Some((name, arg)) => (name.trim(), Some(arg.trim().to_string())),
            None => (s.trim(), None),
        };
        let arg = arg.filter(|a| !a.is_empty());

        match name.to_lowercase().as_str() {
            "start" => Ok(Action::Start),
            "complete" => Ok(Action::Complete),
            "accept" => Ok(Action::Accept),
            "decline" => Ok(Action::Decline { reason: arg }),
            "block" => Ok(Action::Block {
                reason: arg.unwrap_or_default(),
            }),
            "unblock" => Ok(Action::Unblock),
            "progress" => {
                let raw = arg.ok_or_else(|| "progress needs a percentage, e.g. progress=40".to_string())?;
                let percent = raw
                    .trim_end_matches('%')
                    .parse::<i64>()
                    .map_err(|e| format!("invalid progress percentage {raw}: {e}"))?;
                Ok(Action::UpdateProgress { percent })
            }
            "ready" => Ok(Action::MarkReady),
            "hold" => Ok(Action::Hold { reason: arg }),
            "resume" => Ok(Action::Resume),
            "cancel" => Ok(Action::Cancel { reason: arg }),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// When and by whom an action is applied.
///
/// The actor is recorded for audit only; permissions are checked elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    pub date: NaiveDate,
    pub actor: Option<String>,
}

impl ActionContext {
    pub fn on(date: NaiveDate) -> Self {
        Self { date, actor: None }
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_argument_actions() {
        assert_eq!("start".parse::<Action>().unwrap(), Action::Start);
        assert_eq!(
            "progress=40%".parse::<Action>().unwrap(),
            Action::UpdateProgress { percent: 40 }
        );
        assert_eq!(
            "block = rain delay".parse::<Action>().unwrap(),
            Action::Block {
                reason: "rain delay".into()
            }
        );
        assert_eq!(
            "cancel".parse::<Action>().unwrap(),
            Action::Cancel { reason: None }
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_actions() {
        assert!("demolish".parse::<Action>().is_err());
        assert!("progress".parse::<Action>().is_err());
        assert!("progress=lots".parse::<Action>().is_err());
    }
}
