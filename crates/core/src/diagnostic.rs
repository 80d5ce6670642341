//! Data-quality findings.
//!
//! None of these stop a workload computation. They describe input that the
//! engine absorbs as literal or zero contributions, so callers can surface
//! them to whoever owns the data.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::id::{MemberId, ProjectId, TaskId};
use crate::member::Member;
use crate::snapshot::Snapshot;
use crate::task::Task;

/// Tolerance used when checking that efforts add up to 100%.
pub const EFFORT_SUM_TOLERANCE: f64 = 1e-6;

/// A data-quality finding about a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Diagnostic {
    /// Assignment references a member that is not in the snapshot
    DanglingAssignee { task_id: TaskId, assignee_id: MemberId },

    /// Same member assigned twice to one task
    DuplicateAssignee { task_id: TaskId, assignee_id: MemberId },

    /// Task references a project missing from the snapshot
    UnknownProject { task_id: TaskId, project_id: ProjectId },

    /// Efforts across a task's assignments do not add up to 100
    EffortSumMismatch { task_id: TaskId, total: f64 },

    /// Single effort outside 0..=100
    EffortOutOfRange { task_id: TaskId, assignee_id: MemberId, effort: f64 },

    /// Assignment without any working day
    NoWorkingDays { task_id: TaskId, assignee_id: MemberId },

    /// End date before start date
    InvertedRange { task_id: TaskId },

    /// Negative estimated hours
    NegativeHours { task_id: TaskId, hours: f64 },

    /// Capacity is zero or negative
    NonPositiveCapacity { member_id: MemberId, capacity: f64 },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DanglingAssignee { task_id, assignee_id } => {
                write!(f, "task {} is assigned to unknown member {}", task_id, assignee_id)
            }
            Diagnostic::DuplicateAssignee { task_id, assignee_id } => {
                write!(f, "task {} assigns member {} more than once", task_id, assignee_id)
            }
            Diagnostic::UnknownProject { task_id, project_id } => {
                write!(f, "task {} belongs to unknown project {}", task_id, project_id)
            }
            Diagnostic::EffortSumMismatch { task_id, total } => {
                write!(f, "task {} efforts sum to {}%, expected 100%", task_id, total)
            }
            Diagnostic::EffortOutOfRange { task_id, assignee_id, effort } => write!(
                f,
                "task {} gives member {} an effort of {}%, outside 0-100",
                task_id, assignee_id, effort
            ),
            Diagnostic::NoWorkingDays { task_id, assignee_id } => {
                write!(f, "task {} gives member {} no working days", task_id, assignee_id)
            }
            Diagnostic::InvertedRange { task_id } => {
                write!(f, "task {} ends before it starts", task_id)
            }
            Diagnostic::NegativeHours { task_id, hours } => {
                write!(f, "task {} has negative estimate {}h", task_id, hours)
            }
            Diagnostic::NonPositiveCapacity { member_id, capacity } => {
                write!(f, "member {} has non-positive capacity {}h", member_id, capacity)
            }
        }
    }
}

impl Task {
    /// Findings that concern this task alone, without looking up references.
    pub fn diagnose(&self) -> Vec<Diagnostic> {
        let mut found = Vec::new();
        if self.has_inverted_range() {
            found.push(Diagnostic::InvertedRange { task_id: self.id });
        }
        if self.hours < 0.0 {
            found.push(Diagnostic::NegativeHours { task_id: self.id, hours: self.hours });
        }

        let mut seen = HashSet::new();
        for assignment in &self.assignments {
            let assignee_id = assignment.assignee_id;
            if !seen.insert(assignee_id) {
                found.push(Diagnostic::DuplicateAssignee { task_id: self.id, assignee_id });
            }
            if !(0.0..=100.0).contains(&assignment.effort) {
                found.push(Diagnostic::EffortOutOfRange {
                    task_id: self.id,
                    assignee_id,
                    effort: assignment.effort,
                });
            }
            if assignment.working_days.is_empty() {
                found.push(Diagnostic::NoWorkingDays { task_id: self.id, assignee_id });
            }
        }

        if !self.assignments.is_empty() {
            let total = self.total_effort();
            if (total - 100.0).abs() > EFFORT_SUM_TOLERANCE {
                found.push(Diagnostic::EffortSumMismatch { task_id: self.id, total });
            }
        }

        found
    }
}

impl Member {
    /// Findings that concern this member alone.
    pub fn diagnose(&self) -> Vec<Diagnostic> {
        if self.capacity > 0.0 {
            Vec::new()
        } else {
            vec![Diagnostic::NonPositiveCapacity {
                member_id: self.id,
                capacity: self.capacity,
            }]
        }
    }
}

impl Snapshot {
    /// Collect data-quality findings.
    ///
    /// Project references are only checked when the snapshot carries projects.
    pub fn diagnose(&self) -> Vec<Diagnostic> {
        let members = self.member_index();
        let projects = self.project_index();
        let mut found: Vec<Diagnostic> = self.members.iter().flat_map(Member::diagnose).collect();

        for task in &self.tasks {
            found.extend(task.diagnose());

            if !self.projects.is_empty() && !projects.contains_key(&task.project_id) {
                found.push(Diagnostic::UnknownProject {
                    task_id: task.id,
                    project_id: task.project_id,
                });
            }
            for assignment in &task.assignments {
                if !members.contains_key(&assignment.assignee_id) {
                    found.push(Diagnostic::DanglingAssignee {
                        task_id: task.id,
                        assignee_id: assignment.assignee_id,
                    });
                }
            }
        }

        found
    }
}
