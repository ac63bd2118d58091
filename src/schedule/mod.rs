// src/schedule/mod.rs

//! Calendar-aware critical-path scheduling.
//!
//! - [`calculator`] runs the forward/backward passes.
//! - [`analysis`] derives bottlenecks, parallel groups and the risk score.
//! - [`snapshot`] holds the output types.

pub mod analysis;
pub mod calculator;
pub mod snapshot;

pub use calculator::ScheduleCalculator;
pub use snapshot::{
    Bottleneck, NodeSchedule, ParallelOpportunity, ScheduleSnapshot, ScheduleSummary, ScheduleWarning,
    Severity,
};
