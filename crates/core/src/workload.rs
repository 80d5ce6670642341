//! Derived workload values produced by the allocation engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::id::MemberId;

/// Hours a member is allocated on a specific date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAllocation {
    /// Member the hours belong to
    pub member_id: MemberId,

    /// Calendar date
    pub date: NaiveDate,

    /// Allocated hours from every task active on the date
    pub hours: f64,
}

/// Classification of allocated hours against capacity.
///
/// Variants are ordered from least to most loaded, with `Unknown` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkloadLevel {
    /// Capacity is zero or negative, no ratio can be formed
    Unknown,
    /// Nothing allocated
    Idle,
    /// Under half of capacity
    Light,
    /// Half to 90% of capacity
    Good,
    /// 90% up to and including full capacity
    High,
    /// Over capacity, up to 120%
    Overloaded,
    /// Over 120% of capacity
    CriticallyOverloaded,
}

impl WorkloadLevel {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadLevel::Unknown => "Unknown",
            WorkloadLevel::Idle => "Idle",
            WorkloadLevel::Light => "Light",
            WorkloadLevel::Good => "Good",
            WorkloadLevel::High => "High",
            WorkloadLevel::Overloaded => "Overloaded",
            WorkloadLevel::CriticallyOverloaded => "CriticallyOverloaded",
        }
    }

    /// Whether the level is above capacity.
    pub fn is_overloaded(&self) -> bool {
        matches!(
            self,
            WorkloadLevel::Overloaded | WorkloadLevel::CriticallyOverloaded
        )
    }
}

impl std::fmt::Display for WorkloadLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
