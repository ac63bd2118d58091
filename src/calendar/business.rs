// src/calendar/business.rs

//! Business-day arithmetic over a working-week pattern plus regional holidays.

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use tracing::trace;

use crate::calendar::holiday::HolidayCalendar;
use crate::errors::{Result, SiteplanError};
use crate::types::{Duration, DurationUnit};

/// Overridable calendar settings.
///
/// Changing settings only affects calculations made afterwards; dates that
/// were already computed are never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSettings {
    pub working_days: Vec<Weekday>,
    pub start_of_day: NaiveTime,
    pub end_of_day: NaiveTime,
    pub default_region: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            start_of_day: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            end_of_day: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or(NaiveTime::MIN),
            default_region: "NSW".to_string(),
        }
    }
}

impl CalendarSettings {
    fn validate(&self) -> Result<()> {
        if self.working_days.is_empty() {
            return Err(SiteplanError::InvalidArgument(
                "calendar must have at least one working day".to_string(),
            ));
        }
        if self.end_of_day <= self.start_of_day {
            return Err(SiteplanError::InvalidArgument(format!(
                "end_of_day ({}) must be after start_of_day ({})",
                self.end_of_day, self.start_of_day
            )));
        }
        Ok(())
    }
}

/// Region-aware business-day calculator.
#[derive(Debug, Clone)]
pub struct BusinessCalendar {
    settings: CalendarSettings,
    holidays: HolidayCalendar,
}

impl BusinessCalendar {
    pub fn new(settings: CalendarSettings, holidays: HolidayCalendar) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, holidays })
    }

    /// Mon-Fri, no holidays.
    pub fn weekdays_only() -> Self {
        Self {
            settings: CalendarSettings::default(),
            holidays: HolidayCalendar::new(),
        }
    }

    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    pub fn holidays(&self) -> &HolidayCalendar {
        &self.holidays
    }

    pub fn default_region(&self) -> &str {
        &self.settings.default_region
    }

    /// Replace the settings for subsequent calculations.
    pub fn reconfigure(&mut self, settings: CalendarSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn is_working_weekday(&self, date: NaiveDate) -> bool {
        self.settings.working_days.contains(&date.weekday())
    }

    pub fn is_business_day(&self, date: NaiveDate, region: &str) -> bool {
        self.is_working_weekday(date) && !self.holidays.is_holiday(date, region)
    }

    /// Walk `n` business days forward (or backward when negative).
    ///
    /// `n == 0` returns `date` unchanged, even if it is not a business day.
    pub fn add_business_days(&self, date: NaiveDate, n: i64, region: &str) -> NaiveDate {
        let forward = n > 0;
        let mut remaining = n.unsigned_abs();
        let mut current = date;

        while remaining > 0 {
            match step(current, forward) {
                Some(next) => current = next,
                None => break,
            }
            if self.is_business_day(current, region) {
                remaining -= 1;
            }
        }

        trace!(%date, n, %current, region, "add_business_days");
        current
    }

    /// Business days in `[start, end)`; negative when `start > end`.
    pub fn business_days_between(&self, start: NaiveDate, end: NaiveDate, region: &str) -> i64 {
        if start > end {
            return -self.business_days_between(end, start, region);
        }

        let mut count = 0;
        let mut current = start;
        while current < end {
            if self.is_business_day(current, region) {
                count += 1;
            }
            match step(current, true) {
                Some(next) => current = next,
                None => break,
            }
        }
        count
    }

    pub fn next_business_day(&self, date: NaiveDate, region: &str) -> NaiveDate {
        self.add_business_days(date, 1, region)
    }

    pub fn previous_business_day(&self, date: NaiveDate, region: &str) -> NaiveDate {
        self.add_business_days(date, -1, region)
    }

    /// `date` itself if it is a business day, otherwise the next one.
    pub fn align_forward(&self, date: NaiveDate, region: &str) -> NaiveDate {
        if self.is_business_day(date, region) {
            date
        } else {
            self.next_business_day(date, region)
        }
    }

    pub fn working_hours_per_day(&self) -> f64 {
        let span = self.settings.end_of_day - self.settings.start_of_day;
        span.num_minutes() as f64 / 60.0
    }

    /// Convert an estimate into whole business days, rounding hours up.
    pub fn duration_in_business_days(&self, duration: Duration) -> i64 {
        match duration.unit {
            DurationUnit::Days => i64::from(duration.amount),
            DurationUnit::Hours => {
                let per_day = self.working_hours_per_day();
                if per_day <= 0.0 {
                    return 0;
                }
                (f64::from(duration.amount) / per_day).ceil() as i64
            }
        }
    }
}

fn step(date: NaiveDate, forward: bool) -> Option<NaiveDate> {
    if forward {
        date.checked_add_days(Days::new(1))
    } else {
        date.checked_sub_days(Days::new(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::holiday::Holiday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn nsw_with_new_year() -> BusinessCalendar {
        let mut holidays = HolidayCalendar::new().with_region("NSW");
        holidays
            .insert(Holiday::state(d(2024, 1, 1), "New Year's Day", "NSW"))
            .unwrap();
        BusinessCalendar::new(CalendarSettings::default(), holidays).unwrap()
    }

    #[test]
    fn friday_plus_one_is_monday() {
        let cal = BusinessCalendar::weekdays_only();
        assert_eq!(cal.add_business_days(d(2024, 1, 5), 1, "NSW"), d(2024, 1, 8));
    }

    #[test]
    fn skips_weekend_and_holiday() {
        let cal = nsw_with_new_year();
        assert_eq!(cal.add_business_days(d(2023, 12, 29), 1, "NSW"), d(2024, 1, 2));
        // Another region does not observe the NSW holiday.
        assert_eq!(cal.add_business_days(d(2023, 12, 29), 1, "VIC"), d(2024, 1, 1));
    }

    #[test]
    fn zero_days_is_a_no_op_even_on_weekends() {
        let cal = BusinessCalendar::weekdays_only();
        let saturday = d(2024, 1, 6);
        assert_eq!(cal.add_business_days(saturday, 0, "NSW"), saturday);
    }

    #[test]
    fn walks_backwards() {
        let cal = nsw_with_new_year();
        assert_eq!(cal.add_business_days(d(2024, 1, 2), -1, "NSW"), d(2023, 12, 29));
        assert_eq!(cal.previous_business_day(d(2024, 1, 8), "NSW"), d(2024, 1, 5));
    }

    #[test]
    fn next_business_day_is_exclusive() {
        let cal = BusinessCalendar::weekdays_only();
        let monday = d(2024, 1, 8);
        assert_eq!(cal.next_business_day(monday, "NSW"), d(2024, 1, 9));
    }

    #[test]
    fn between_counts_half_open_with_sign() {
        let cal = nsw_with_new_year();
        // Fri 29 Dec .. Tue 2 Jan: only Fri 29 counts.
        assert_eq!(cal.business_days_between(d(2023, 12, 29), d(2024, 1, 2), "NSW"), 1);
        assert_eq!(cal.business_days_between(d(2024, 1, 2), d(2023, 12, 29), "NSW"), -1);
        assert_eq!(cal.business_days_between(d(2024, 1, 2), d(2024, 1, 2), "NSW"), 0);
        // A full week.
        assert_eq!(cal.business_days_between(d(2024, 1, 8), d(2024, 1, 15), "NSW"), 5);
    }

    #[test]
    fn unknown_region_only_skips_weekends() {
        let cal = nsw_with_new_year();
        assert!(cal.is_business_day(d(2024, 1, 1), "ZZ"));
        assert!(!cal.is_business_day(d(2024, 1, 1), "NSW"));
        assert!(!cal.is_business_day(d(2024, 1, 6), "ZZ"));
    }

    #[test]
    fn custom_working_week() {
        let settings = CalendarSettings {
            working_days: vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat],
            ..CalendarSettings::default()
        };
        let cal = BusinessCalendar::new(settings, HolidayCalendar::new()).unwrap();
        assert_eq!(cal.add_business_days(d(2024, 1, 5), 1, "NSW"), d(2024, 1, 6));
    }

    #[test]
    fn empty_working_week_is_rejected() {
        let settings = CalendarSettings {
            working_days: Vec::new(),
            ..CalendarSettings::default()
        };
        let err = BusinessCalendar::new(settings, HolidayCalendar::new()).unwrap_err();
        assert!(matches!(err, SiteplanError::InvalidArgument(_)));
    }

    #[test]
    fn reconfigure_changes_future_calculations() {
        let mut cal = BusinessCalendar::weekdays_only();
        assert_eq!(cal.next_business_day(d(2024, 1, 5), "NSW"), d(2024, 1, 8));

        let mut settings = cal.settings().clone();
        settings.working_days.push(Weekday::Sat);
        cal.reconfigure(settings).unwrap();
        assert_eq!(cal.next_business_day(d(2024, 1, 5), "NSW"), d(2024, 1, 6));
    }

    #[test]
    fn hours_round_up_to_whole_days() {
        // Default day is 07:00-15:00, i.e. 8 hours.
        let cal = BusinessCalendar::weekdays_only();
        assert_eq!(cal.duration_in_business_days(Duration::hours(8)), 1);
        assert_eq!(cal.duration_in_business_days(Duration::hours(9)), 2);
        assert_eq!(cal.duration_in_business_days(Duration::hours(0)), 0);
        assert_eq!(cal.duration_in_business_days(Duration::days(3)), 3);
    }
}
