//! Weekly member-by-day workload grid.

use chrono::NaiveDate;
use resman_core::{Member, MemberId, Task, WorkloadLevel};
use serde::{Deserialize, Serialize};

use crate::calendar::week_of;
use crate::engine::{classify_workload, AllocationEngine};

/// One member's row in a [`Heatmap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapRow {
    /// Member
    pub member_id: MemberId,
    /// Member display name
    pub name: String,
    /// Daily capacity in hours
    pub capacity: f64,
    /// Allocated hours for each day of the week
    pub hours: Vec<f64>,
    /// Classification of each day
    pub levels: Vec<WorkloadLevel>,
}

impl HeatmapRow {
    /// Total allocated hours over the week.
    pub fn total_hours(&self) -> f64 {
        self.hours.iter().sum()
    }

    /// Highest level reached on any day.
    pub fn peak(&self) -> WorkloadLevel {
        self.levels
            .iter()
            .copied()
            .max()
            .unwrap_or(WorkloadLevel::Unknown)
    }
}

/// Up to seven consecutive days of allocations for every member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    /// First day shown
    pub week_start: NaiveDate,
    /// The dates shown, starting at `week_start`; seven unless the week runs
    /// past the last representable date
    pub days: Vec<NaiveDate>,
    /// One row per member, in input order
    pub rows: Vec<HeatmapRow>,
}

impl Heatmap {
    /// Row for a member, if present.
    pub fn row(&self, member_id: MemberId) -> Option<&HeatmapRow> {
        self.rows.iter().find(|r| r.member_id == member_id)
    }

    /// Whether there are no members to show.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl AllocationEngine {
    /// Build the heatmap for the seven days starting at `week_start`, cut short
    /// at the last representable date.
    ///
    /// The caller picks the start; use [`crate::week_start`] for a
    /// Monday-aligned week.
    pub fn weekly_heatmap(&self, members: &[Member], tasks: &[Task], week_start: NaiveDate) -> Heatmap {
        self.audit(members, tasks);
        let days = week_of(week_start);
        let rows = members
            .iter()
            .map(|member| {
                let hours: Vec<f64> = days
                    .iter()
                    .map(|day| self.allocation_for(member.id, *day, tasks))
                    .collect();
                let levels = hours
                    .iter()
                    .map(|h| classify_workload(*h, member.capacity))
                    .collect();
                HeatmapRow {
                    member_id: member.id,
                    name: member.name.clone(),
                    capacity: member.capacity,
                    hours,
                    levels,
                }
            })
            .collect();

        Heatmap {
            week_start,
            days,
            rows,
        }
    }
}
