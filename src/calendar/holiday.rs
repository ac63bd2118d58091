// src/calendar/holiday.rs

//! Public-holiday reference data, keyed by region.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::{Result, SiteplanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayScope {
    /// Observed in every known region.
    National,
    /// Observed only in the holiday's own region.
    State,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub scope: HolidayScope,
    #[serde(default)]
    pub region: Option<String>,
}

impl Holiday {
    pub fn national(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
            scope: HolidayScope::National,
            region: None,
        }
    }

    pub fn state(date: NaiveDate, name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
            scope: HolidayScope::State,
            region: Some(region.into()),
        }
    }
}

/// Region codes are matched case-insensitively.
pub(crate) fn normalize_region(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Holiday tables for a set of known regions.
///
/// A region is known once it has been registered explicitly or has been
/// mentioned by a loaded holiday. National holidays apply to every known
/// region; an unknown region observes no holidays at all.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    known_regions: HashSet<String>,
    national: BTreeMap<NaiveDate, Vec<Holiday>>,
    state: BTreeMap<(String, NaiveDate), Vec<Holiday>>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, code: &str) -> Self {
        self.register_region(code);
        self
    }

    pub fn register_region(&mut self, code: &str) {
        self.known_regions.insert(normalize_region(code));
    }

    pub fn is_known_region(&self, code: &str) -> bool {
        self.known_regions.contains(&normalize_region(code))
    }

    pub fn insert(&mut self, holiday: Holiday) -> Result<()> {
        if let Some(ref code) = holiday.region {
            self.register_region(code);
        }

        match holiday.scope {
            HolidayScope::National => {
                self.national.entry(holiday.date).or_default().push(holiday);
            }
            HolidayScope::State => {
                let code = holiday.region.as_deref().map(normalize_region).ok_or_else(|| {
                    SiteplanError::InvalidArgument(format!(
                        "state holiday '{}' on {} has no region",
                        holiday.name, holiday.date
                    ))
                })?;
                self.state
                    .entry((code, holiday.date))
                    .or_default()
                    .push(holiday);
            }
        }
        Ok(())
    }

    pub fn is_holiday(&self, date: NaiveDate, region: &str) -> bool {
        !self.holidays_on(date, region).is_empty()
    }

    /// All holidays observed in `region` on `date`.
    pub fn holidays_on(&self, date: NaiveDate, region: &str) -> Vec<&Holiday> {
        let code = normalize_region(region);
        if !self.known_regions.contains(&code) {
            return Vec::new();
        }

        let mut out: Vec<&Holiday> = self.national.get(&date).into_iter().flatten().collect();
        if let Some(list) = self.state.get(&(code, date)) {
            out.extend(list.iter());
        }
        out
    }

    /// Holidays observed in `region` within `[start, end)`, in date order.
    pub fn holidays_between(&self, start: NaiveDate, end: NaiveDate, region: &str) -> Vec<&Holiday> {
        let code = normalize_region(region);
        if !self.known_regions.contains(&code) || start >= end {
            return Vec::new();
        }

        let mut out: Vec<&Holiday> = self
            .national
            .range(start..end)
            .flat_map(|(_, list)| list.iter())
            .collect();
        out.extend(
            self.state
                .iter()
                .filter(|((region, date), _)| *region == code && *date >= start && *date < end)
                .flat_map(|(_, list)| list.iter()),
        );
        out.sort_by_key(|h| h.date);
        out
    }

    pub fn len(&self) -> usize {
        self.national.values().map(Vec::len).sum::<usize>()
            + self.state.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn state_holiday_only_applies_to_its_region() {
        let mut cal = HolidayCalendar::new().with_region("VIC");
        cal.insert(Holiday::state(d(2024, 10, 7), "Labour Day", "NSW"))
            .unwrap();

        assert!(cal.is_holiday(d(2024, 10, 7), "nsw"));
        assert!(!cal.is_holiday(d(2024, 10, 7), "VIC"));
    }

    #[test]
    fn national_holiday_applies_to_every_known_region() {
        let mut cal = HolidayCalendar::new().with_region("NSW").with_region("VIC");
        cal.insert(Holiday::national(d(2024, 1, 1), "New Year's Day"))
            .unwrap();

        assert!(cal.is_holiday(d(2024, 1, 1), "NSW"));
        assert!(cal.is_holiday(d(2024, 1, 1), "VIC"));
        // Unknown region falls back to weekends only.
        assert!(!cal.is_holiday(d(2024, 1, 1), "QLD"));
    }

    #[test]
    fn state_holiday_without_region_is_rejected() {
        let mut cal = HolidayCalendar::new();
        let h = Holiday {
            date: d(2024, 3, 11),
            name: "Orphan".into(),
            scope: HolidayScope::State,
            region: None,
        };
        assert!(matches!(cal.insert(h), Err(SiteplanError::InvalidArgument(_))));
        assert!(cal.is_empty());
    }

    #[test]
    fn holidays_between_is_half_open_and_sorted() {
        let mut cal = HolidayCalendar::new();
        cal.insert(Holiday::state(d(2024, 1, 26), "Australia Day", "NSW"))
            .unwrap();
        cal.insert(Holiday::national(d(2024, 1, 1), "New Year's Day"))
            .unwrap();

        let found = cal.holidays_between(d(2024, 1, 1), d(2024, 1, 26), "NSW");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "New Year's Day");

        let found = cal.holidays_between(d(2023, 12, 1), d(2024, 2, 1), "NSW");
        let names: Vec<_> = found.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["New Year's Day", "Australia Day"]);
    }
}
