//! Storage trait abstraction.

use async_trait::async_trait;
use resman_core::{
    Member, MemberId, Project, ProjectId, Snapshot, Task, TaskFilter, TaskId, Team,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record rejected before saving
    #[error("Invalid record: {0}")]
    Invalid(String),

    /// Operation would break a reference held by another record
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Storage abstraction for members, teams, projects and tasks.
///
/// This trait allows different storage backends to be plugged in. Every
/// backend enforces the same referential guards (see [`crate::guard`]).
#[async_trait]
pub trait Storage: Send + Sync {
    // === Member operations ===

    /// Save a member (create or update).
    async fn save_member(&self, member: &Member) -> Result<()>;

    /// Load a member by ID.
    async fn load_member(&self, id: MemberId) -> Result<Option<Member>>;

    /// List all members.
    async fn list_members(&self) -> Result<Vec<Member>>;

    /// Delete a member. Fails while any task assignment references it.
    async fn delete_member(&self, id: MemberId) -> Result<()>;

    // === Team operations ===

    /// Save a team (create or update).
    async fn save_team(&self, team: &Team) -> Result<()>;

    /// List all teams.
    async fn list_teams(&self) -> Result<Vec<Team>>;

    // === Project operations ===

    /// Save a project (create or update).
    async fn save_project(&self, project: &Project) -> Result<()>;

    /// Load a project by ID.
    async fn load_project(&self, id: ProjectId) -> Result<Option<Project>>;

    /// List all projects.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Delete a project. Fails while it still owns tasks.
    async fn delete_project(&self, id: ProjectId) -> Result<()>;

    // === Task operations ===

    /// Save a task (create or update).
    async fn save_task(&self, task: &Task) -> Result<()>;

    /// Load a task by ID.
    async fn load_task(&self, id: TaskId) -> Result<Option<Task>>;

    /// List tasks matching the filter.
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Delete a task.
    async fn delete_task(&self, id: TaskId) -> Result<()>;

    // === Snapshot ===

    /// Copy the current members, tasks and projects into an owned snapshot.
    async fn snapshot(&self) -> Result<Snapshot> {
        let members = self.list_members().await?;
        let tasks = self.list_tasks(&TaskFilter::default()).await?;
        let projects = self.list_projects().await?;
        Ok(Snapshot::new(members, tasks).with_projects(projects))
    }
}
