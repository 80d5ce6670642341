//! Resman core data models.
//!
//! This crate defines the members, tasks and projects the allocation engine
//! computes workload over, plus the derived values it produces.

#![warn(missing_docs)]

// Core identities
mod id;
mod error;

// Resources
mod member;
mod project;

// Work
mod task;
mod working_days;

// Engine input and output
mod snapshot;
mod workload;
mod diagnostic;
mod event;

// Re-exports
pub use id::*;
pub use error::ModelError;

pub use member::{Member, Team, TeamDirectory};
pub use project::{Project, ProjectStatus};

pub use task::{Task, Assignment, TaskFilter};
pub use working_days::WorkingDays;

pub use snapshot::Snapshot;
pub use workload::{DailyAllocation, WorkloadLevel};
pub use diagnostic::{Diagnostic, EFFORT_SUM_TOLERANCE};
pub use event::{ChangeEvent, ChangeKind};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
