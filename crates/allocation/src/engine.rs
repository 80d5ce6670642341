//! The allocation engine.
//!
//! Every workload figure in Resman comes from here. A task's `hours` are
//! spread evenly over the business days of its range; each assignee takes
//! `effort`% of that daily rate on the weekdays they work on the task. A
//! member's allocation on a date is the sum over all tasks.
//!
//! The engine never fails on structurally valid input. Dangling assignees,
//! efforts that do not add up to 100, empty or inverted ranges all degrade
//! to literal or zero contributions and are logged as diagnostics.

use std::collections::HashSet;

use chrono::NaiveDate;
use resman_core::{
    Assignment, DailyAllocation, Diagnostic, Member, MemberId, Task, WorkloadLevel,
};
use tracing::{debug, trace, warn};

use crate::calendar::{dates_between, BusinessCalendar};
use crate::config::EngineConfig;

/// Classify allocated hours against a daily capacity.
///
/// | ratio            | level                  |
/// |------------------|------------------------|
/// | capacity <= 0    | `Unknown`              |
/// | `<= 0`           | `Idle`                 |
/// | `(0, 0.5)`       | `Light`                |
/// | `[0.5, 0.9)`     | `Good`                 |
/// | `[0.9, 1.0]`     | `High`                 |
/// | `(1.0, 1.2]`     | `Overloaded`           |
/// | `> 1.2`          | `CriticallyOverloaded` |
pub fn classify_workload(allocated_hours: f64, capacity: f64) -> WorkloadLevel {
    if !(capacity > 0.0) {
        return WorkloadLevel::Unknown;
    }
    let ratio = allocated_hours / capacity;
    if ratio.is_nan() {
        WorkloadLevel::Unknown
    } else if ratio <= 0.0 {
        WorkloadLevel::Idle
    } else if ratio < 0.5 {
        WorkloadLevel::Light
    } else if ratio < 0.9 {
        WorkloadLevel::Good
    } else if ratio <= 1.0 {
        WorkloadLevel::High
    } else if ratio <= 1.2 {
        WorkloadLevel::Overloaded
    } else {
        WorkloadLevel::CriticallyOverloaded
    }
}

/// Sum that gives the same result for any ordering of `values`.
pub(crate) fn order_independent_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

/// Computes per-member, per-day allocated hours over a snapshot.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    calendar: BusinessCalendar,
    log_diagnostics: bool,
}

impl Default for AllocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationEngine {
    /// Create an engine with the default Monday-to-Friday calendar.
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    /// Create an engine from configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            calendar: config.calendar(),
            log_diagnostics: config.log_diagnostics,
        }
    }

    /// Replace the business calendar.
    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// The business calendar in use.
    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    /// Task hours per business day of its range.
    ///
    /// A range with no business days (inverted, or weekend-only) carries the
    /// whole estimate as a single day's load.
    pub fn daily_hours_for_task(&self, task: &Task) -> f64 {
        let duration = self
            .calendar
            .business_days_between(task.start_date, task.end_date);
        if duration == 0 {
            trace!("Task {} has no business days, using {}h as one day", task.id, task.hours);
            task.hours
        } else {
            task.hours / duration as f64
        }
    }

    /// Hours one assignment contributes on `date`.
    ///
    /// Zero unless `date` is inside the task's range and on one of the
    /// assignment's working days.
    pub fn member_share_on_day(&self, task: &Task, assignment: &Assignment, date: NaiveDate) -> f64 {
        if !task.spans(date) || !assignment.working_days.includes_date(date) {
            return 0.0;
        }
        self.daily_hours_for_task(task) * (assignment.effort / 100.0)
    }

    /// Total hours allocated to a member on `date` across all tasks.
    ///
    /// Independent of the order of `tasks` and of assignments within them.
    pub fn allocation_for(&self, member_id: MemberId, date: NaiveDate, tasks: &[Task]) -> f64 {
        let shares: Vec<f64> = tasks
            .iter()
            .flat_map(|task| {
                task.assignments
                    .iter()
                    .filter(move |a| a.assignee_id == member_id)
                    .map(move |a| self.member_share_on_day(task, a, date))
            })
            .filter(|h| *h != 0.0)
            .collect();
        order_independent_sum(shares)
    }

    /// Allocation of a member on each calendar day of `[from, to]`.
    pub fn allocations_in_range(
        &self,
        member_id: MemberId,
        from: NaiveDate,
        to: NaiveDate,
        tasks: &[Task],
    ) -> Vec<DailyAllocation> {
        dates_between(from, to)
            .map(|date| DailyAllocation {
                member_id,
                date,
                hours: self.allocation_for(member_id, date, tasks),
            })
            .collect()
    }

    /// Allocation of every member on `date`, in member order.
    pub fn daily_allocations(
        &self,
        members: &[Member],
        tasks: &[Task],
        date: NaiveDate,
    ) -> Vec<DailyAllocation> {
        members
            .iter()
            .map(|m| DailyAllocation {
                member_id: m.id,
                date,
                hours: self.allocation_for(m.id, date, tasks),
            })
            .collect()
    }

    /// Members whose allocation on `on_date` strictly exceeds their capacity.
    ///
    /// Being exactly at capacity is `High`, not overloaded. Computed fresh on
    /// every call; members come back in input order.
    pub fn overloaded_members<'a>(
        &self,
        members: &'a [Member],
        tasks: &[Task],
        on_date: NaiveDate,
    ) -> Vec<&'a Member> {
        self.audit(members, tasks);
        let overloaded: Vec<&Member> = members
            .iter()
            .filter(|m| self.allocation_for(m.id, on_date, tasks) > m.capacity)
            .collect();
        debug!(
            "{} of {} member(s) overloaded on {}",
            overloaded.len(),
            members.len(),
            on_date
        );
        overloaded
    }

    /// Log data-quality findings for the given input.
    ///
    /// Returns the findings so callers can surface them too.
    pub fn audit(&self, members: &[Member], tasks: &[Task]) -> Vec<Diagnostic> {
        let known: HashSet<MemberId> = members.iter().map(|m| m.id).collect();
        let mut found: Vec<Diagnostic> = members.iter().flat_map(Member::diagnose).collect();
        for task in tasks {
            found.extend(task.diagnose());
            for assignment in &task.assignments {
                if !known.contains(&assignment.assignee_id) {
                    found.push(Diagnostic::DanglingAssignee {
                        task_id: task.id,
                        assignee_id: assignment.assignee_id,
                    });
                }
            }
        }

        self.report(&found);
        found
    }

    pub(crate) fn report(&self, findings: &[Diagnostic]) {
        if self.log_diagnostics {
            for finding in findings {
                warn!("{}", finding);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use resman_core::{ProjectId, WorkingDays};

    const EPS: f64 = 1e-9;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Mon 2024-06-03 .. Fri 2024-06-07
    fn week_task(hours: f64) -> Task {
        Task::new(ProjectId::new(), "t", date(2024, 6, 3), date(2024, 6, 7), hours)
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify_workload(0.0, 8.0), WorkloadLevel::Idle);
        assert_eq!(classify_workload(3.99, 8.0), WorkloadLevel::Light);
        assert_eq!(classify_workload(4.0, 8.0), WorkloadLevel::Good);
        assert_eq!(classify_workload(7.19, 8.0), WorkloadLevel::Good);
        assert_eq!(classify_workload(7.2, 8.0), WorkloadLevel::High);
        assert_eq!(classify_workload(8.0, 8.0), WorkloadLevel::High);
        assert_eq!(classify_workload(8.01, 8.0), WorkloadLevel::Overloaded);
        assert_eq!(classify_workload(9.6, 8.0), WorkloadLevel::Overloaded);
        assert_eq!(classify_workload(9.61, 8.0), WorkloadLevel::CriticallyOverloaded);
    }

    #[test]
    fn test_classify_zero_capacity_is_unknown() {
        for hours in [0.0, 1.0, 100.0, f64::INFINITY] {
            assert_eq!(classify_workload(hours, 0.0), WorkloadLevel::Unknown);
        }
        assert_eq!(classify_workload(4.0, -8.0), WorkloadLevel::Unknown);
        assert_eq!(classify_workload(4.0, f64::NAN), WorkloadLevel::Unknown);
        assert_eq!(classify_workload(f64::NAN, 8.0), WorkloadLevel::Unknown);
    }

    #[test]
    fn test_classify_is_monotonic() {
        for capacity in [0.5, 4.0, 8.0, 12.5] {
            let mut previous = classify_workload(0.0, capacity);
            for step in 1..=400 {
                let hours = step as f64 * 0.05;
                let level = classify_workload(hours, capacity);
                assert!(level >= previous, "{}h / {}h went {:?} -> {:?}", hours, capacity, previous, level);
                previous = level;
            }
        }
    }

    #[test]
    fn test_daily_hours_spread_over_business_days() {
        let engine = AllocationEngine::new();
        assert!((engine.daily_hours_for_task(&week_task(10.0)) - 2.0).abs() < EPS);

        // Mon .. next Mon is six business days
        let mut task = week_task(12.0);
        task.end_date = date(2024, 6, 10);
        assert!((engine.daily_hours_for_task(&task) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_daily_hours_sum_back_to_task_hours() {
        let engine = AllocationEngine::new();
        let start = date(2024, 5, 29);
        for len in 0..40u64 {
            let task = Task::new(ProjectId::new(), "t", start, start + Days::new(len), 37.5);
            let business_days: Vec<NaiveDate> = start
                .iter_days()
                .take_while(|d| *d <= task.end_date)
                .filter(|d| engine.calendar().is_business_day(*d))
                .collect();
            if business_days.is_empty() {
                continue;
            }
            let total: f64 = business_days.iter().map(|_| engine.daily_hours_for_task(&task)).sum();
            assert!((total - task.hours).abs() < 1e-9, "len {}: {}", len, total);
        }
    }

    #[test]
    fn test_zero_duration_collapses_to_one_day() {
        let engine = AllocationEngine::new();
        // Sat .. Sun
        let weekend = Task::new(ProjectId::new(), "t", date(2024, 6, 8), date(2024, 6, 9), 6.0);
        assert_eq!(engine.daily_hours_for_task(&weekend), 6.0);

        let inverted = Task::new(ProjectId::new(), "t", date(2024, 6, 7), date(2024, 6, 3), 6.0);
        assert_eq!(engine.daily_hours_for_task(&inverted), 6.0);
    }

    #[test]
    fn test_weekend_task_lands_on_worked_day() {
        let engine = AllocationEngine::new();
        let member = MemberId::new();
        let saturdays = WorkingDays::from_codes([6]).unwrap();
        // Sat .. Sun, no business days
        let tasks = vec![Task::new(ProjectId::new(), "t", date(2024, 6, 8), date(2024, 6, 9), 6.0)
            .with_assignment(Assignment::new(member, saturdays, 50.0))];

        assert!((engine.allocation_for(member, date(2024, 6, 8), &tasks) - 3.0).abs() < EPS);
        assert_eq!(engine.allocation_for(member, date(2024, 6, 9), &tasks), 0.0);
        assert_eq!(engine.allocation_for(member, date(2024, 6, 7), &tasks), 0.0);
    }

    #[test]
    fn test_allocations_in_range_reaches_max_date() {
        let engine = AllocationEngine::new();
        let from = NaiveDate::MAX - Days::new(1);
        let range = engine.allocations_in_range(MemberId::new(), from, NaiveDate::MAX, &[]);
        assert_eq!(range.len(), 2);
        assert_eq!(range[1].date, NaiveDate::MAX);
    }

    #[test]
    fn test_single_assignee_full_week() {
        let engine = AllocationEngine::new();
        let member = MemberId::new();
        let task = week_task(10.0).with_assignment(Assignment::new(member, WorkingDays::WEEKDAYS, 100.0));
        let tasks = vec![task];

        for day in 3..=7 {
            let hours = engine.allocation_for(member, date(2024, 6, day), &tasks);
            assert!((hours - 2.0).abs() < EPS, "day {}: {}", day, hours);
        }
        assert_eq!(engine.allocation_for(member, date(2024, 6, 8), &tasks), 0.0);
        assert_eq!(engine.allocation_for(member, date(2024, 6, 2), &tasks), 0.0);
    }

    #[test]
    fn test_split_effort() {
        let engine = AllocationEngine::new();
        let a = MemberId::new();
        let b = MemberId::new();
        let tasks = vec![week_task(10.0)
            .with_assignment(Assignment::new(a, WorkingDays::WEEKDAYS, 60.0))
            .with_assignment(Assignment::new(b, WorkingDays::WEEKDAYS, 40.0))];

        let day = date(2024, 6, 4);
        let ha = engine.allocation_for(a, day, &tasks);
        let hb = engine.allocation_for(b, day, &tasks);
        assert!((ha - 1.2).abs() < EPS);
        assert!((hb - 0.8).abs() < EPS);
        assert!((ha + hb - 2.0).abs() < EPS);
    }

    #[test]
    fn test_share_respects_working_days() {
        let engine = AllocationEngine::new();
        let member = MemberId::new();
        let tuesdays = WorkingDays::from_codes([2]).unwrap();
        let task = week_task(10.0);
        let assignment = Assignment::new(member, tuesdays, 50.0);

        // Tue 2024-06-04
        assert!((engine.member_share_on_day(&task, &assignment, date(2024, 6, 4)) - 1.0).abs() < EPS);
        assert_eq!(engine.member_share_on_day(&task, &assignment, date(2024, 6, 5)), 0.0);
        // Tuesday outside the range
        assert_eq!(engine.member_share_on_day(&task, &assignment, date(2024, 6, 11)), 0.0);
    }

    #[test]
    fn test_effort_taken_literally() {
        let engine = AllocationEngine::new();
        let a = MemberId::new();
        let b = MemberId::new();
        let tasks = vec![week_task(10.0)
            .with_assignment(Assignment::new(a, WorkingDays::WEEKDAYS, 80.0))
            .with_assignment(Assignment::new(b, WorkingDays::WEEKDAYS, 80.0))];

        let day = date(2024, 6, 5);
        let combined = engine.allocation_for(a, day, &tasks) + engine.allocation_for(b, day, &tasks);
        assert!((combined - 3.2).abs() < EPS);
    }

    #[test]
    fn test_unassigned_task_contributes_nothing() {
        let engine = AllocationEngine::new();
        let tasks = vec![week_task(40.0)];
        assert_eq!(engine.allocation_for(MemberId::new(), date(2024, 6, 4), &tasks), 0.0);
    }

    #[test]
    fn test_allocation_is_order_independent() {
        let engine = AllocationEngine::new();
        let member = MemberId::new();
        let other = MemberId::new();
        let mut tasks: Vec<Task> = [7.3, 11.1, 0.7, 19.9, 3.3]
            .iter()
            .enumerate()
            .map(|(i, hours)| {
                week_task(*hours)
                    .with_assignment(Assignment::new(other, WorkingDays::WEEKDAYS, 100.0 - (i as f64 * 7.0)))
                    .with_assignment(Assignment::new(member, WorkingDays::WEEKDAYS, i as f64 * 7.0 + 0.1))
            })
            .collect();

        let day = date(2024, 6, 6);
        let expected = engine.allocation_for(member, day, &tasks);

        tasks.reverse();
        assert_eq!(engine.allocation_for(member, day, &tasks), expected);

        tasks.rotate_left(2);
        for task in &mut tasks {
            task.assignments.reverse();
        }
        assert_eq!(engine.allocation_for(member, day, &tasks), expected);
    }

    #[test]
    fn test_allocations_in_range() {
        let engine = AllocationEngine::new();
        let member = MemberId::new();
        let tasks = vec![week_task(10.0).with_assignment(Assignment::new(member, WorkingDays::WEEKDAYS, 100.0))];

        let range = engine.allocations_in_range(member, date(2024, 6, 1), date(2024, 6, 9), &tasks);
        assert_eq!(range.len(), 9);
        let total: f64 = range.iter().map(|a| a.hours).sum();
        assert!((total - 10.0).abs() < EPS);
        assert_eq!(range[0].hours, 0.0);

        assert!(engine
            .allocations_in_range(member, date(2024, 6, 9), date(2024, 6, 1), &tasks)
            .is_empty());
    }

    #[test]
    fn test_overloaded_members_strict() {
        let engine = AllocationEngine::new();
        let at_capacity = Member::new("at", 2.0);
        let over = Member::new("over", 1.5);
        let idle = Member::new("idle", 8.0);
        let members = vec![at_capacity.clone(), over.clone(), idle];

        let tasks = vec![
            week_task(10.0).with_assignment(Assignment::new(at_capacity.id, WorkingDays::WEEKDAYS, 100.0)),
            week_task(10.0).with_assignment(Assignment::new(over.id, WorkingDays::WEEKDAYS, 100.0)),
        ];

        let overloaded = engine.overloaded_members(&members, &tasks, date(2024, 6, 4));
        assert_eq!(overloaded.len(), 1);
        assert_eq!(overloaded[0].id, over.id);

        // Nobody works on Saturday
        assert!(engine.overloaded_members(&members, &tasks, date(2024, 6, 8)).is_empty());
    }

    #[test]
    fn test_overloaded_members_empty_inputs() {
        let engine = AllocationEngine::new();
        assert!(engine.overloaded_members(&[], &[], date(2024, 6, 4)).is_empty());
        let members = vec![Member::new("a", 8.0)];
        assert!(engine.overloaded_members(&members, &[], date(2024, 6, 4)).is_empty());
    }

    #[test]
    fn test_dangling_assignee_is_absorbed() {
        let engine = AllocationEngine::new();
        let member = Member::new("a", 8.0);
        let ghost = MemberId::new();
        let tasks = vec![week_task(10.0)
            .with_assignment(Assignment::new(ghost, WorkingDays::WEEKDAYS, 50.0))
            .with_assignment(Assignment::new(member.id, WorkingDays::WEEKDAYS, 50.0))];

        let members = vec![member.clone()];
        let findings = engine.audit(&members, &tasks);
        assert!(findings.iter().any(|d| matches!(d, Diagnostic::DanglingAssignee { assignee_id, .. } if *assignee_id == ghost)));

        let allocations = engine.daily_allocations(&members, &tasks, date(2024, 6, 4));
        assert_eq!(allocations.len(), 1);
        assert!((allocations[0].hours - 1.0).abs() < EPS);
    }

    #[test]
    fn test_order_independent_sum() {
        let values = vec![0.1, 0.2, 0.3, 1e16, -1e16];
        let mut reversed = values.clone();
        reversed.reverse();
        assert_eq!(order_independent_sum(values), order_independent_sum(reversed));
        assert_eq!(order_independent_sum(Vec::new()), 0.0);
    }
}
