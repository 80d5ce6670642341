//! Task model - dated, estimated work split across assignees.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::id::{MemberId, ProjectId, TaskId};
use crate::working_days::WorkingDays;

/// A task spanning an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Owning project
    pub project_id: ProjectId,

    /// Task name
    #[serde(default)]
    pub name: String,

    /// First day of work (inclusive)
    pub start_date: NaiveDate,

    /// Last day of work (inclusive)
    pub end_date: NaiveDate,

    /// Total estimated effort in hours.
    ///
    /// This is the task total, split between assignees by their effort
    /// percentage. Some screens of the product have treated it as hours per
    /// person; those callers must multiply before handing tasks over.
    pub hours: f64,

    /// One entry per assignee
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Task {
    /// Create an unassigned task.
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        hours: f64,
    ) -> Self {
        Self {
            id: TaskId::new(),
            project_id,
            name: name.into(),
            start_date,
            end_date,
            hours,
            assignments: Vec::new(),
        }
    }

    /// Add an assignment.
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    /// Whether `date` falls in the task's inclusive range.
    pub fn spans(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Whether the date range is inverted.
    pub fn has_inverted_range(&self) -> bool {
        self.end_date < self.start_date
    }

    /// Whether the member is assigned to this task.
    pub fn is_assigned(&self, member_id: MemberId) -> bool {
        self.assignments.iter().any(|a| a.assignee_id == member_id)
    }

    /// Sum of effort percentages across assignments.
    pub fn total_effort(&self) -> f64 {
        self.assignments.iter().map(|a| a.effort).sum()
    }
}

/// One assignee's share of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// Assigned member
    pub assignee_id: MemberId,

    /// Weekdays on which the assignee works on the task
    pub working_days: WorkingDays,

    /// Share of the task's hours, as a percentage
    pub effort: f64,
}

impl Assignment {
    /// Create an assignment.
    pub fn new(assignee_id: MemberId, working_days: WorkingDays, effort: f64) -> Self {
        Self {
            assignee_id,
            working_days,
            effort,
        }
    }
}

/// Filter for querying tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Only tasks of this project
    pub project_id: Option<ProjectId>,

    /// Only tasks assigned to this member
    pub assignee_id: Option<MemberId>,

    /// Only tasks whose range contains this date
    pub active_on: Option<NaiveDate>,
}

impl TaskFilter {
    /// Whether a task passes the filter.
    pub fn matches(&self, task: &Task) -> bool {
        self.project_id.map_or(true, |p| task.project_id == p)
            && self.assignee_id.map_or(true, |m| task.is_assigned(m))
            && self.active_on.map_or(true, |d| task.spans(d))
    }
}
