//! Project model - grouping key for tasks.

use serde::{Deserialize, Serialize};

use crate::id::ProjectId;

/// A project groups tasks and carries a health status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    /// Project name
    #[serde(default)]
    pub name: String,

    /// Reported status
    pub status: ProjectStatus,
}

impl Project {
    /// Create an on-track project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            status: ProjectStatus::OnTrack,
        }
    }

    /// Set the status.
    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }
}

/// Project status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    /// Progressing as planned
    OnTrack,
    /// Some risk of slipping
    AtRisk,
    /// Behind plan
    OffTrack,
}

impl ProjectStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::OnTrack => "OnTrack",
            ProjectStatus::AtRisk => "AtRisk",
            ProjectStatus::OffTrack => "OffTrack",
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "ontrack" => Ok(ProjectStatus::OnTrack),
            "atrisk" => Ok(ProjectStatus::AtRisk),
            "offtrack" => Ok(ProjectStatus::OffTrack),
            _ => Err(format!("unknown project status: {}", s)),
        }
    }
}
