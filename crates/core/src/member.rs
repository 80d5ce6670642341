//! Member and team models.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::id::{MemberId, TeamId};

/// A person whose working hours can be allocated to tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Unique identifier
    pub id: MemberId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Names of the teams this member belongs to
    #[serde(default)]
    pub teams: BTreeSet<String>,

    /// Hours of work the member can perform per working day
    pub capacity: f64,
}

impl Member {
    /// Create a member with the given daily capacity.
    pub fn new(name: impl Into<String>, capacity: f64) -> Self {
        Self {
            id: MemberId::new(),
            name: name.into(),
            teams: BTreeSet::new(),
            capacity,
        }
    }

    /// Add a team membership by name.
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.teams.insert(team.into());
        self
    }

    /// Whether the member belongs to the named team.
    pub fn in_team(&self, team: &str) -> bool {
        self.teams.contains(team)
    }
}

/// A named group of members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Unique identifier
    pub id: TeamId,

    /// Team name, unique across teams
    pub name: String,
}

impl Team {
    /// Create a new team.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TeamId::new(),
            name: name.into(),
        }
    }
}

/// Maps the team names stored on members to team identifiers.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    by_name: HashMap<String, TeamId>,
}

impl TeamDirectory {
    /// Build a directory from known teams. Later duplicates of a name win.
    pub fn new(teams: &[Team]) -> Self {
        Self {
            by_name: teams.iter().map(|t| (t.name.clone(), t.id)).collect(),
        }
    }

    /// Resolve a team name.
    pub fn resolve(&self, name: &str) -> Option<TeamId> {
        self.by_name.get(name).copied()
    }

    /// Resolve every team a member references. Unknown names are returned separately.
    pub fn resolve_member(&self, member: &Member) -> (Vec<TeamId>, Vec<String>) {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for name in &member.teams {
            match self.resolve(name) {
                Some(id) => known.push(id),
                None => unknown.push(name.clone()),
            }
        }
        (known, unknown)
    }

    /// Members belonging to the named team, in input order.
    pub fn members_of<'a>(&self, team: &str, members: &'a [Member]) -> Vec<&'a Member> {
        members.iter().filter(|m| m.in_team(team)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_deserializes_without_optional_fields() {
        let id = MemberId::new();
        let json = format!(r#"{{"id":"{}","capacity":6.5}}"#, id);
        let member: Member = serde_json::from_str(&json).unwrap();
        assert_eq!(member.id, id);
        assert_eq!(member.capacity, 6.5);
        assert!(member.teams.is_empty());
    }

    #[test]
    fn test_team_directory_resolution() {
        let design = Team::new("design");
        let dir = TeamDirectory::new(&[design.clone(), Team::new("platform")]);

        let member = Member::new("Ana", 8.0).with_team("design").with_team("ghost");
        let (known, unknown) = dir.resolve_member(&member);
        assert_eq!(known, vec![design.id]);
        assert_eq!(unknown, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_members_of_team() {
        let members = vec![
            Member::new("a", 8.0).with_team("ops"),
            Member::new("b", 8.0),
            Member::new("c", 4.0).with_team("ops"),
        ];
        let dir = TeamDirectory::default();
        let ops = dir.members_of("ops", &members);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "a");
        assert_eq!(ops[1].name, "c");
    }
}
