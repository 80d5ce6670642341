//! Consumers of the engine: alerts, summaries, portfolio health and task
//! enrichment.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use resman_core::{
    Diagnostic, Member, MemberId, Project, ProjectId, ProjectStatus, Snapshot, Task, WorkloadLevel,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{classify_workload, order_independent_sum, AllocationEngine};

/// A member over capacity on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverloadAlert {
    /// Overloaded member
    pub member_id: MemberId,
    /// Member display name
    pub name: String,
    /// Date the alert applies to
    pub date: NaiveDate,
    /// Hours allocated on that date
    pub allocated: f64,
    /// Daily capacity
    pub capacity: f64,
    /// Classification of the allocation
    pub level: WorkloadLevel,
}

impl OverloadAlert {
    /// Hours above capacity.
    pub fn excess(&self) -> f64 {
        self.allocated - self.capacity
    }
}

/// Workload of one member over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    /// Member
    pub member_id: MemberId,
    /// Member display name
    pub name: String,
    /// Daily capacity
    pub capacity: f64,
    /// Hours allocated over the whole range
    pub total_hours: f64,
    /// Highest single-day allocation
    pub peak_hours: f64,
    /// Total hours divided by the business days in the range
    pub average_hours: f64,
    /// Classification of the peak day
    pub peak_level: WorkloadLevel,
    /// Days on which allocation exceeded capacity
    pub overloaded_days: u32,
}

/// Workload pressure on one project's staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHealth {
    /// Project, `None` for tasks whose project is unknown
    pub project_id: Option<ProjectId>,
    /// Project name
    pub name: String,
    /// Reported status, `None` for tasks whose project is unknown
    pub status: Option<ProjectStatus>,
    /// All tasks of the project
    pub task_count: usize,
    /// Tasks active on the evaluated date
    pub active_task_count: usize,
    /// Overloaded members assigned to an active task, in member order
    pub overloaded_assignees: Vec<MemberId>,
}

impl ProjectHealth {
    /// Whether any active assignee is overloaded.
    pub fn is_strained(&self) -> bool {
        !self.overloaded_assignees.is_empty()
    }
}

/// A task with its computed daily hours, as sent for AI analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTask {
    /// The task itself
    #[serde(flatten)]
    pub task: Task,
    /// Hours per business day of the task's range
    pub daily_hours: f64,
}

impl AllocationEngine {
    /// Alerts for every member over capacity on `on_date`, in member order.
    pub fn overload_alerts(&self, members: &[Member], tasks: &[Task], on_date: NaiveDate) -> Vec<OverloadAlert> {
        self.audit(members, tasks);
        members
            .iter()
            .filter_map(|member| {
                let allocated = self.allocation_for(member.id, on_date, tasks);
                (allocated > member.capacity).then(|| OverloadAlert {
                    member_id: member.id,
                    name: member.name.clone(),
                    date: on_date,
                    allocated,
                    capacity: member.capacity,
                    level: classify_workload(allocated, member.capacity),
                })
            })
            .collect()
    }

    /// Per-member totals over `[from, to]`.
    pub fn member_summaries(
        &self,
        members: &[Member],
        tasks: &[Task],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<MemberSummary> {
        self.audit(members, tasks);
        let business_days = self.calendar().business_days_between(from, to);

        members
            .iter()
            .map(|member| {
                let days = self.allocations_in_range(member.id, from, to, tasks);
                let peak_hours = days.iter().map(|d| d.hours).fold(0.0, f64::max);
                let overloaded_days = days.iter().filter(|d| d.hours > member.capacity).count() as u32;
                let total_hours = order_independent_sum(days.into_iter().map(|d| d.hours).collect());
                let average_hours = if business_days == 0 {
                    0.0
                } else {
                    total_hours / business_days as f64
                };

                MemberSummary {
                    member_id: member.id,
                    name: member.name.clone(),
                    capacity: member.capacity,
                    total_hours,
                    peak_hours,
                    average_hours,
                    peak_level: classify_workload(peak_hours, member.capacity),
                    overloaded_days,
                }
            })
            .collect()
    }

    /// Overloaded staff per project on `on_date`.
    ///
    /// One entry per project in input order. Tasks pointing at a project that
    /// is not in `projects` are collected into a trailing entry without a
    /// project id.
    pub fn portfolio_health(
        &self,
        projects: &[Project],
        members: &[Member],
        tasks: &[Task],
        on_date: NaiveDate,
    ) -> Vec<ProjectHealth> {
        let overloaded: Vec<MemberId> = self
            .overloaded_members(members, tasks, on_date)
            .into_iter()
            .map(|m| m.id)
            .collect();

        let mut health: Vec<ProjectHealth> = projects
            .iter()
            .map(|project| {
                let own: Vec<&Task> = tasks.iter().filter(|t| t.project_id == project.id).collect();
                project_health(Some(project), &own, &overloaded, on_date)
            })
            .collect();

        let known: HashSet<ProjectId> = projects.iter().map(|p| p.id).collect();
        let orphans: Vec<&Task> = tasks.iter().filter(|t| !known.contains(&t.project_id)).collect();
        if !orphans.is_empty() {
            let missing: BTreeSet<ProjectId> = orphans.iter().map(|t| t.project_id).collect();
            warn!(
                "{} task(s) reference {} unknown project(s)",
                orphans.len(),
                missing.len()
            );
            health.push(project_health(None, &orphans, &overloaded, on_date));
        }

        debug!("Portfolio health computed for {} project(s) on {}", projects.len(), on_date);
        health
    }

    /// Attach `daily_hours` to each task.
    pub fn enrich_tasks(&self, tasks: &[Task]) -> Vec<EnrichedTask> {
        tasks
            .iter()
            .map(|task| EnrichedTask {
                daily_hours: self.daily_hours_for_task(task),
                task: task.clone(),
            })
            .collect()
    }

    /// Full data-quality report for a snapshot, logged when enabled.
    pub fn diagnose(&self, snapshot: &Snapshot) -> Vec<Diagnostic> {
        let findings = snapshot.diagnose();
        self.report(&findings);
        debug!("Snapshot has {} data-quality finding(s)", findings.len());
        findings
    }
}

fn project_health(
    project: Option<&Project>,
    tasks: &[&Task],
    overloaded: &[MemberId],
    on_date: NaiveDate,
) -> ProjectHealth {
    let active: Vec<&&Task> = tasks.iter().filter(|t| t.spans(on_date)).collect();
    let overloaded_assignees = overloaded
        .iter()
        .copied()
        .filter(|id| active.iter().any(|t| t.is_assigned(*id)))
        .collect();

    ProjectHealth {
        project_id: project.map(|p| p.id),
        name: project.map_or_else(|| "(no project)".to_string(), |p| p.name.clone()),
        status: project.map(|p| p.status),
        task_count: tasks.len(),
        active_task_count: active.len(),
        overloaded_assignees,
    }
}
