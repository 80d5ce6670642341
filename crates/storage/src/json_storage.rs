//! JSON file storage implementation.
//!
//! Stores each record as a JSON file under a root directory (usually
//! `.resman/`) and keeps small per-object meta markers (version + updated_at).

use std::path::{Path, PathBuf};

use resman_core::{
    Member, MemberId, Project, ProjectId, Snapshot, Task, TaskFilter, TaskId, Team, TeamId,
};
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{guard, Result, Storage};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    /// Serialises guarded writes so check-then-write is not interleaved.
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage, creating the record and meta directories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for kind in ["members", "teams", "projects", "tasks"] {
            fs::create_dir_all(root.join(kind)).await?;
            fs::create_dir_all(root.join("meta").join(kind)).await?;
        }
        info!("Opened JSON storage at {}", root.display());

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn member_path(&self, id: MemberId) -> PathBuf {
        self.root.join("members").join(format!("{}.json", id))
    }
    fn team_path(&self, id: TeamId) -> PathBuf {
        self.root.join("teams").join(format!("{}.json", id))
    }
    fn project_path(&self, id: ProjectId) -> PathBuf {
        self.root.join("projects").join(format!("{}.json", id))
    }
    fn task_path(&self, id: TaskId) -> PathBuf {
        self.root.join("tasks").join(format!("{}.json", id))
    }

    fn meta_path(&self, kind: &str, id: &str) -> PathBuf {
        self.root.join("meta").join(kind).join(format!("{}.meta.json", id))
    }

    /// Read and increment per-object version, return new version.
    async fn bump_version(&self, kind: &str, id: &str) -> Result<u64> {
        let path = self.meta_path(kind, id);
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        fs::write(&path, serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        Ok(version)
    }

    async fn write_record<T: Serialize>(&self, kind: &str, id: &str, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json.as_bytes()).await?;
        let version = self.bump_version(kind, id).await?;
        debug!("Saved {} {} (v{})", kind, id, version);
        Ok(())
    }

    /// Every task on disk, failing on the first unreadable record.
    ///
    /// Used by delete guards, which must not overlook a reference.
    async fn all_tasks_strict(&self) -> Result<Vec<Task>> {
        list_dir(&self.root.join("tasks"), Unreadable::Fail).await
    }

    async fn remove_record(&self, kind: &str, id: &str, path: &Path) -> Result<()> {
        remove_if_exists(path).await?;
        remove_if_exists(&self.meta_path(kind, id)).await?;
        debug!("Deleted {} {}", kind, id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_member(&self, member: &Member) -> Result<()> {
        guard::check_member(member)?;
        let _guard = self.write_lock.lock().await;
        let id = member.id.to_string();
        self.write_record("members", &id, &self.member_path(member.id), member).await
    }

    async fn load_member(&self, id: MemberId) -> Result<Option<Member>> {
        read_json(&self.member_path(id)).await
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        let mut members: Vec<Member> = list_dir(&self.root.join("members"), Unreadable::Skip).await?;
        members.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(members)
    }

    async fn delete_member(&self, id: MemberId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let tasks = self.all_tasks_strict().await?;
        guard::check_member_unreferenced(id, &tasks)?;
        self.remove_record("members", &id.to_string(), &self.member_path(id)).await
    }

    async fn save_team(&self, team: &Team) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let teams = self.list_teams().await?;
        guard::check_team_name(team, &teams)?;
        let id = team.id.to_string();
        self.write_record("teams", &id, &self.team_path(team.id), team).await
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let mut teams: Vec<Team> = list_dir(&self.root.join("teams"), Unreadable::Skip).await?;
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let id = project.id.to_string();
        self.write_record("projects", &id, &self.project_path(project.id), project).await
    }

    async fn load_project(&self, id: ProjectId) -> Result<Option<Project>> {
        read_json(&self.project_path(id)).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = list_dir(&self.root.join("projects"), Unreadable::Skip).await?;
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    async fn delete_project(&self, id: ProjectId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let tasks = self.all_tasks_strict().await?;
        guard::check_project_empty(id, &tasks)?;
        self.remove_record("projects", &id.to_string(), &self.project_path(id)).await
    }

    async fn save_task(&self, task: &Task) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let project_exists = self.load_project(task.project_id).await?.is_some();
        let members: std::collections::HashSet<MemberId> =
            self.list_members().await?.into_iter().map(|m| m.id).collect();
        guard::check_task(task, project_exists, |id| members.contains(&id))?;

        let id = task.id.to_string();
        self.write_record("tasks", &id, &self.task_path(task.id), task).await
    }

    async fn load_task(&self, id: TaskId) -> Result<Option<Task>> {
        read_json(&self.task_path(id)).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let all: Vec<Task> = list_dir(&self.root.join("tasks"), Unreadable::Skip).await?;
        let mut tasks: Vec<Task> = all.into_iter().filter(|t| filter.matches(t)).collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    async fn delete_task(&self, id: TaskId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.remove_record("tasks", &id.to_string(), &self.task_path(id)).await
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let _guard = self.write_lock.lock().await;
        let members = self.list_members().await?;
        let tasks = self.list_tasks(&TaskFilter::default()).await?;
        let projects = self.list_projects().await?;
        Ok(Snapshot::new(members, tasks).with_projects(projects))
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// What to do with a record that cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unreadable {
    /// Log and leave it out
    Skip,
    /// Return the error
    Fail,
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path, unreadable: Unreadable) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&entry.path()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) if unreadable == Unreadable::Skip => {
                tracing::warn!("Skipping unreadable record {}: {}", entry.path().display(), e)
            }
            Err(e) => {
                tracing::warn!("Unreadable record {}: {}", entry.path().display(), e);
                return Err(e);
            }
        }
    }
    Ok(items)
}
