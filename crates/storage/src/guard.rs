//! Referential and data-quality guards shared by every backend.
//!
//! The allocation engine tolerates bad data; the stores are where it gets
//! rejected in the first place.

use resman_core::{Member, MemberId, ProjectId, Task, Team};
use tracing::warn;

use crate::trait_::{Result, StorageError};

/// Reject members with non-positive capacity.
pub fn check_member(member: &Member) -> Result<()> {
    if let Some(finding) = member.diagnose().into_iter().next() {
        warn!("Rejected member {}: {}", member.id, finding);
        return Err(StorageError::Invalid(finding.to_string()));
    }
    Ok(())
}

/// Reject tasks with task-local problems or dangling references.
///
/// `project_exists` reports whether the task's project is stored;
/// `member_exists` is asked for every assignee.
pub fn check_task(
    task: &Task,
    project_exists: bool,
    member_exists: impl Fn(MemberId) -> bool,
) -> Result<()> {
    let findings = task.diagnose();
    if !findings.is_empty() {
        let reasons: Vec<String> = findings.iter().map(ToString::to_string).collect();
        warn!("Rejected task {}: {}", task.id, reasons.join("; "));
        return Err(StorageError::Invalid(reasons.join("; ")));
    }

    if !project_exists {
        warn!("Rejected task {}: unknown project {}", task.id, task.project_id);
        return Err(StorageError::NotFound(format!("project {}", task.project_id)));
    }

    if let Some(missing) = task
        .assignments
        .iter()
        .map(|a| a.assignee_id)
        .find(|id| !member_exists(*id))
    {
        warn!("Rejected task {}: unknown assignee {}", task.id, missing);
        return Err(StorageError::NotFound(format!("member {}", missing)));
    }

    Ok(())
}

/// Refuse to delete a member that any task still assigns.
pub fn check_member_unreferenced(id: MemberId, tasks: &[Task]) -> Result<()> {
    let referencing: Vec<String> = tasks
        .iter()
        .filter(|t| t.is_assigned(id))
        .map(|t| t.id.to_string())
        .collect();

    if referencing.is_empty() {
        Ok(())
    } else {
        warn!("Refused to delete member {} referenced by {} task(s)", id, referencing.len());
        Err(StorageError::Conflict(format!(
            "member {} is assigned to task(s) {}",
            id,
            referencing.join(", ")
        )))
    }
}

/// Refuse to delete a project that still owns tasks.
pub fn check_project_empty(id: ProjectId, tasks: &[Task]) -> Result<()> {
    let owned = tasks.iter().filter(|t| t.project_id == id).count();
    if owned == 0 {
        Ok(())
    } else {
        warn!("Refused to delete project {} owning {} task(s)", id, owned);
        Err(StorageError::Conflict(format!("project {} still has {} task(s)", id, owned)))
    }
}

/// Team names are unique across teams.
pub fn check_team_name(team: &Team, existing: &[Team]) -> Result<()> {
    if existing.iter().any(|t| t.name == team.name && t.id != team.id) {
        warn!("Rejected team {}: name '{}' already taken", team.id, team.name);
        return Err(StorageError::Conflict(format!("team name '{}' already exists", team.name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use resman_core::{Assignment, WorkingDays};

    fn task(project: ProjectId, member: MemberId) -> Task {
        Task::new(
            project,
            "t",
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 7).unwrap(),
            10.0,
        )
        .with_assignment(Assignment::new(member, WorkingDays::WEEKDAYS, 100.0))
    }

    #[test]
    fn test_check_member_capacity() {
        assert!(check_member(&Member::new("a", 8.0)).is_ok());
        assert!(matches!(
            check_member(&Member::new("b", 0.0)),
            Err(StorageError::Invalid(_))
        ));
    }

    #[test]
    fn test_check_task_references() {
        let member = MemberId::new();
        let t = task(ProjectId::new(), member);

        assert!(check_task(&t, true, |id| id == member).is_ok());
        assert!(matches!(check_task(&t, false, |_| true), Err(StorageError::NotFound(_))));
        assert!(matches!(check_task(&t, true, |_| false), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_check_task_rejects_effort_mismatch() {
        let mut t = task(ProjectId::new(), MemberId::new());
        t.assignments[0].effort = 60.0;
        assert!(matches!(check_task(&t, true, |_| true), Err(StorageError::Invalid(_))));
    }

    #[test]
    fn test_member_reference_guard() {
        let member = MemberId::new();
        let tasks = vec![task(ProjectId::new(), member)];
        assert!(matches!(
            check_member_unreferenced(member, &tasks),
            Err(StorageError::Conflict(_))
        ));
        assert!(check_member_unreferenced(MemberId::new(), &tasks).is_ok());
    }

    #[test]
    fn test_project_guard() {
        let project = ProjectId::new();
        let tasks = vec![task(project, MemberId::new())];
        assert!(check_project_empty(project, &tasks).is_err());
        assert!(check_project_empty(ProjectId::new(), &tasks).is_ok());
    }

    #[test]
    fn test_team_name_unique() {
        let design = Team::new("design");
        let mut renamed = design.clone();
        renamed.name = "design".into();

        assert!(check_team_name(&renamed, &[design.clone()]).is_ok());
        assert!(check_team_name(&Team::new("design"), &[design]).is_err());
    }
}
