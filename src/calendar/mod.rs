// src/calendar/mod.rs

//! Business-day calendar.
//!
//! - [`holiday`] holds public-holiday reference data per region.
//! - [`business`] does the date arithmetic (working week + holidays).

pub mod business;
pub mod holiday;

pub use business::{BusinessCalendar, CalendarSettings};
pub use holiday::{Holiday, HolidayCalendar, HolidayScope};
