//! Immutable point-in-time view of members and tasks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::id::{MemberId, ProjectId};
use crate::member::Member;
use crate::project::Project;
use crate::task::Task;

/// The input to one workload computation.
///
/// `members` and `tasks` are required when decoding: a document missing either
/// collection is rejected rather than treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// All members
    pub members: Vec<Member>,

    /// All tasks
    pub tasks: Vec<Task>,

    /// Projects, needed only for portfolio health
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Snapshot {
    /// Create a snapshot from members and tasks.
    pub fn new(members: Vec<Member>, tasks: Vec<Task>) -> Self {
        Self {
            members,
            tasks,
            projects: Vec::new(),
        }
    }

    /// Attach projects.
    pub fn with_projects(mut self, projects: Vec<Project>) -> Self {
        self.projects = projects;
        self
    }

    /// Decode a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Index members by id.
    pub fn member_index(&self) -> HashMap<MemberId, &Member> {
        self.members.iter().map(|m| (m.id, m)).collect()
    }

    /// Index projects by id.
    pub fn project_index(&self) -> HashMap<ProjectId, &Project> {
        self.projects.iter().map(|p| (p.id, p)).collect()
    }
}
