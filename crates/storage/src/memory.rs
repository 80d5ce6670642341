//! In-memory store with change notifications.
//!
//! The store owns its state explicitly and is passed by reference (usually an
//! `Arc`) to whoever needs it. Readers take owned snapshots; interested
//! parties subscribe to a broadcast stream of [`ChangeEvent`]s.

use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use resman_core::{
    ChangeEvent, ChangeKind, Member, MemberId, Project, ProjectId, Snapshot, Task, TaskFilter,
    TaskId, Team, TeamId,
};
use tokio::sync::broadcast;
use tracing::debug;

use super::{guard, Result, Storage};

/// Default capacity of the change channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct State {
    revision: u64,
    members: BTreeMap<MemberId, Member>,
    teams: BTreeMap<TeamId, Team>,
    projects: BTreeMap<ProjectId, Project>,
    tasks: BTreeMap<TaskId, Task>,
}

/// In-memory storage backend.
pub struct MemoryStore {
    state: RwLock<State>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an empty store with a custom change channel capacity.
    pub fn with_channel_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(State::default()),
            changes,
        }
    }

    /// Subscribe to change notifications.
    ///
    /// Slow subscribers may observe `RecvError::Lagged`; the latest snapshot
    /// is always available through [`MemoryStore::current`].
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Current revision, incremented by every change.
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    /// Owned copy of the current state.
    pub fn current(&self) -> Snapshot {
        self.versioned().1
    }

    /// Owned copy of the current state together with its revision, taken
    /// under a single read lock.
    pub fn versioned(&self) -> (u64, Snapshot) {
        let state = self.read();
        let snapshot = Snapshot::new(
            state.members.values().cloned().collect(),
            state.tasks.values().cloned().collect(),
        )
        .with_projects(state.projects.values().cloned().collect());
        (state.revision, snapshot)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &mut State, kind: ChangeKind) {
        state.revision += 1;
        debug!("Store revision {}: {:?}", state.revision, kind);
        // No receivers is fine
        let _ = self.changes.send(ChangeEvent::new(state.revision, kind));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStore {
    async fn save_member(&self, member: &Member) -> Result<()> {
        guard::check_member(member)?;
        let mut state = self.write();
        state.members.insert(member.id, member.clone());
        self.publish(&mut state, ChangeKind::MemberSaved(member.id));
        Ok(())
    }

    async fn load_member(&self, id: MemberId) -> Result<Option<Member>> {
        Ok(self.read().members.get(&id).cloned())
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.read().members.values().cloned().collect())
    }

    async fn delete_member(&self, id: MemberId) -> Result<()> {
        let mut state = self.write();
        let tasks: Vec<Task> = state.tasks.values().cloned().collect();
        guard::check_member_unreferenced(id, &tasks)?;
        if state.members.remove(&id).is_some() {
            self.publish(&mut state, ChangeKind::MemberDeleted(id));
        }
        Ok(())
    }

    async fn save_team(&self, team: &Team) -> Result<()> {
        let mut state = self.write();
        let teams: Vec<Team> = state.teams.values().cloned().collect();
        guard::check_team_name(team, &teams)?;
        state.teams.insert(team.id, team.clone());
        self.publish(&mut state, ChangeKind::TeamSaved(team.id));
        Ok(())
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        Ok(self.read().teams.values().cloned().collect())
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        let mut state = self.write();
        state.projects.insert(project.id, project.clone());
        self.publish(&mut state, ChangeKind::ProjectSaved(project.id));
        Ok(())
    }

    async fn load_project(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.read().projects.get(&id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.read().projects.values().cloned().collect())
    }

    async fn delete_project(&self, id: ProjectId) -> Result<()> {
        let mut state = self.write();
        let tasks: Vec<Task> = state.tasks.values().cloned().collect();
        guard::check_project_empty(id, &tasks)?;
        if state.projects.remove(&id).is_some() {
            self.publish(&mut state, ChangeKind::ProjectDeleted(id));
        }
        Ok(())
    }

    async fn save_task(&self, task: &Task) -> Result<()> {
        let mut state = self.write();
        let project_exists = state.projects.contains_key(&task.project_id);
        let members: HashSet<MemberId> = state.members.keys().copied().collect();
        guard::check_task(task, project_exists, |id| members.contains(&id))?;
        state.tasks.insert(task.id, task.clone());
        self.publish(&mut state, ChangeKind::TaskSaved(task.id));
        Ok(())
    }

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.read().tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        Ok(self
            .read()
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn delete_task(&self, id: TaskId) -> Result<()> {
        let mut state = self.write();
        if state.tasks.remove(&id).is_some() {
            self.publish(&mut state, ChangeKind::TaskDeleted(id));
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use resman_core::{Assignment, WorkingDays};
    use crate::StorageError;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_changes_are_published_in_order() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        let member = Member::new("Ana", 8.0);
        let project = Project::new("p");
        store.save_member(&member).await.unwrap();
        store.save_project(&project).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::MemberSaved(member.id));
        assert_eq!(first.revision, 1);
        assert_eq!(second.kind, ChangeKind::ProjectSaved(project.id));
        assert_eq!(second.revision, 2);
        assert_eq!(store.revision(), 2);
    }

    #[tokio::test]
    async fn test_rejected_writes_do_not_publish() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        let err = store.save_member(&Member::new("zero", 0.0)).await.unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));
        assert_eq!(store.revision(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_copy() {
        let store = MemoryStore::new();
        let member = Member::new("Ana", 8.0);
        let project = Project::new("p");
        store.save_member(&member).await.unwrap();
        store.save_project(&project).await.unwrap();

        let before = store.snapshot().await.unwrap();

        let task = Task::new(project.id, "t", date(3), date(7), 10.0)
            .with_assignment(Assignment::new(member.id, WorkingDays::WEEKDAYS, 100.0));
        store.save_task(&task).await.unwrap();

        assert!(before.tasks.is_empty());
        assert_eq!(store.snapshot().await.unwrap().tasks, vec![task]);
    }

    #[tokio::test]
    async fn test_member_delete_blocked_while_assigned() {
        let store = MemoryStore::new();
        let member = Member::new("Ana", 8.0);
        let project = Project::new("p");
        store.save_member(&member).await.unwrap();
        store.save_project(&project).await.unwrap();
        let task = Task::new(project.id, "t", date(3), date(7), 10.0)
            .with_assignment(Assignment::new(member.id, WorkingDays::WEEKDAYS, 100.0));
        store.save_task(&task).await.unwrap();

        assert!(matches!(
            store.delete_member(member.id).await,
            Err(StorageError::Conflict(_))
        ));

        store.delete_task(task.id).await.unwrap();
        store.delete_member(member.id).await.unwrap();
        assert!(store.list_members().await.unwrap().is_empty());
    }
}
