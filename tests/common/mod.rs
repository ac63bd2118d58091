#![allow(dead_code)]

pub use siteplan_test_utils::builders::ProjectBuilder;
pub use siteplan_test_utils::event_recorder::{EventRecorder, unblocked_nodes};
pub use siteplan_test_utils::{date, init_tracing, with_timeout};

use chrono::NaiveDate;

/// Monday 2024-01-08, the default project start.
pub fn monday() -> NaiveDate {
    date(2024, 1, 8)
}
