//! Business-day calendar used for task durations.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use resman_core::WorkingDays;

/// Decides which days count towards a task's duration.
///
/// Independent of an assignee's own working days: a task spanning Monday to
/// Friday lasts five business days even if one assignee only works Tuesdays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessCalendar {
    business_days: WorkingDays,
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    /// Monday to Friday, no holidays.
    pub fn new() -> Self {
        Self {
            business_days: WorkingDays::WEEKDAYS,
            holidays: BTreeSet::new(),
        }
    }

    /// Use a different set of business weekdays.
    pub fn with_business_days(mut self, days: WorkingDays) -> Self {
        self.business_days = days;
        self
    }

    /// Exclude the given dates.
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Business weekdays.
    pub fn business_days(&self) -> WorkingDays {
        self.business_days
    }

    /// Holiday dates.
    pub fn holidays(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }

    /// Whether `date` counts as a business day.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        self.business_days.includes_date(date) && !self.holidays.contains(&date)
    }

    /// Number of business days in `[start, end]`, both inclusive.
    ///
    /// Returns 0 when `end` is before `start`.
    pub fn business_days_between(&self, start: NaiveDate, end: NaiveDate) -> u64 {
        if end < start {
            return 0;
        }

        let total = (end - start).num_days() as u64 + 1;
        let full_weeks = total / 7;
        let mut count = full_weeks * self.business_days.len() as u64;

        // At most six trailing days are left after whole weeks
        let tail_start = start + Days::new(full_weeks * 7);
        count += dates_between(tail_start, end)
            .filter(|d| self.business_days.includes_date(*d))
            .count() as u64;

        let holidays = self
            .holidays
            .range(start..=end)
            .filter(|d| self.business_days.includes_date(**d))
            .count() as u64;

        count - holidays
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::new()
    }
}

/// The Monday on or before `date`.
///
/// Clamped to `NaiveDate::MIN` when that Monday is not representable.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
        .unwrap_or(NaiveDate::MIN)
}

/// The seven dates starting at `start`.
///
/// Shorter when the week runs past `NaiveDate::MAX`.
pub fn week_of(start: NaiveDate) -> Vec<NaiveDate> {
    (0..7)
        .map_while(|i| start.checked_add_days(Days::new(i)))
        .collect()
}

/// Every date in `[from, to]`, including `NaiveDate::MAX` when it is `to`.
pub(crate) fn dates_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(from).filter(|d| *d <= to), move |d| {
        d.succ_opt().filter(|next| *next <= to)
    })
}

/// Whether `date` is a Saturday or Sunday.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
