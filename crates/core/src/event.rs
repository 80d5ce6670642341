//! Change events published by stores.

use serde::{Deserialize, Serialize};

use crate::id::{MemberId, ProjectId, TaskId, TeamId};
use crate::Time;

/// What changed in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "camelCase")]
pub enum ChangeKind {
    /// Member created or updated
    MemberSaved(MemberId),
    /// Member removed
    MemberDeleted(MemberId),
    /// Team created or updated
    TeamSaved(TeamId),
    /// Project created or updated
    ProjectSaved(ProjectId),
    /// Project removed
    ProjectDeleted(ProjectId),
    /// Task created or updated
    TaskSaved(TaskId),
    /// Task removed
    TaskDeleted(TaskId),
}

impl ChangeKind {
    /// Whether the change can alter computed workload.
    ///
    /// Teams and projects are grouping data only.
    pub fn affects_workload(&self) -> bool {
        matches!(
            self,
            ChangeKind::MemberSaved(_)
                | ChangeKind::MemberDeleted(_)
                | ChangeKind::TaskSaved(_)
                | ChangeKind::TaskDeleted(_)
        )
    }
}

/// A change notification with its store revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonic store revision after the change
    pub revision: u64,

    /// What changed
    pub kind: ChangeKind,

    /// When it happened
    pub timestamp: Time,
}

impl ChangeEvent {
    /// Create a new event stamped now.
    pub fn new(revision: u64, kind: ChangeKind) -> Self {
        Self {
            revision,
            kind,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affects_workload() {
        assert!(ChangeKind::TaskSaved(TaskId::new()).affects_workload());
        assert!(ChangeKind::MemberDeleted(MemberId::new()).affects_workload());
        assert!(!ChangeKind::TeamSaved(TeamId::new()).affects_workload());
        assert!(!ChangeKind::ProjectSaved(ProjectId::new()).affects_workload());
    }
}
