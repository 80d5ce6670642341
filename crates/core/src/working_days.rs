//! Weekday sets for assignments.
//!
//! Weekdays are coded 0 = Sunday through 6 = Saturday, the convention used by
//! the documents the store hands over.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A set of weekdays on which an assignee works on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct WorkingDays(u8);

impl WorkingDays {
    /// No days at all.
    pub const NONE: WorkingDays = WorkingDays(0);

    /// Monday through Friday.
    pub const WEEKDAYS: WorkingDays = WorkingDays(0b0011_1110);

    /// Every day of the week.
    pub const ALL: WorkingDays = WorkingDays(0b0111_1111);

    /// Build a set from weekday codes (0 = Sunday .. 6 = Saturday).
    pub fn from_codes(codes: impl IntoIterator<Item = u8>) -> Result<Self, ModelError> {
        let mut bits = 0u8;
        for code in codes {
            if code > 6 {
                return Err(ModelError::InvalidWeekdayCode(code));
            }
            bits |= 1 << code;
        }
        Ok(Self(bits))
    }

    /// Build a set from chrono weekdays.
    pub fn from_weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        days.into_iter().fold(Self::NONE, |set, day| set.with(day))
    }

    /// Return a copy with `day` added.
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | 1 << day.num_days_from_sunday())
    }

    /// Whether the set includes `day`.
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    /// Whether the set includes the weekday of `date`.
    pub fn includes_date(&self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of days in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Weekday codes in ascending order.
    pub fn codes(&self) -> Vec<u8> {
        (0..7).filter(|code| self.0 & (1 << code) != 0).collect()
    }
}

impl TryFrom<Vec<u8>> for WorkingDays {
    type Error = ModelError;

    fn try_from(codes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_codes(codes)
    }
}

impl From<WorkingDays> for Vec<u8> {
    fn from(days: WorkingDays) -> Self {
        days.codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekdays_constant() {
        let days = WorkingDays::WEEKDAYS;
        assert_eq!(days.codes(), vec![1, 2, 3, 4, 5]);
        assert!(days.contains(Weekday::Mon));
        assert!(days.contains(Weekday::Fri));
        assert!(!days.contains(Weekday::Sat));
        assert!(!days.contains(Weekday::Sun));
    }

    #[test]
    fn test_from_codes_rejects_out_of_range() {
        assert!(matches!(
            WorkingDays::from_codes([1, 7]),
            Err(ModelError::InvalidWeekdayCode(7))
        ));
    }

    #[test]
    fn test_includes_date() {
        let days = WorkingDays::from_weekdays([Weekday::Sun]);
        // 2024-06-02 is a Sunday
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert!(days.includes_date(sunday));
        assert!(!days.includes_date(sunday.succ_opt().unwrap()));
    }

    #[test]
    fn test_serde_as_code_list() {
        let days = WorkingDays::from_codes([5, 0, 3]).unwrap();
        assert_eq!(serde_json::to_string(&days).unwrap(), "[0,3,5]");

        let back: WorkingDays = serde_json::from_str("[1,2,3,4,5]").unwrap();
        assert_eq!(back, WorkingDays::WEEKDAYS);
        assert!(serde_json::from_str::<WorkingDays>("[9]").is_err());
    }
}
