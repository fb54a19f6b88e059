// Core records for the kanban workflow

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::errors::WorkflowError;
use super::status::{ProjectPriority, ProjectStatus};

/// Opaque project identifier as stored by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a project created from this session.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Fields the workflow engine carries around but does not interpret,
/// apart from `archived` and the ordering keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectPayload {
    pub project_name: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub priority: ProjectPriority,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A project card on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(rename = "project_id")]
    pub id: ProjectId,
    pub status: ProjectStatus,
    #[serde(flatten)]
    pub payload: ProjectPayload,
}

impl WorkItem {
    pub fn new(id: impl Into<ProjectId>, project_name: impl Into<String>, status: ProjectStatus) -> Self {
        Self {
            id: id.into(),
            status,
            payload: ProjectPayload {
                project_name: project_name.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_priority(mut self, priority: ProjectPriority) -> Self {
        self.payload.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.payload.deadline = Some(deadline);
        self
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.payload.client_id = client_id.into();
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.payload.archived = archived;
        self
    }

    pub fn name(&self) -> &str {
        &self.payload.project_name
    }
}

/// Where a card sat before it was moved: its column and position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub status: ProjectStatus,
    pub index: usize,
}

const MAX_NAME_CHARS: usize = 150;
const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Input for creating a project from the board.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub project_name: String,
    pub client_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub priority: ProjectPriority,
}

impl ProjectDraft {
    pub fn new(project_name: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    /// Field rules applied before anything is written. `today` is injected so
    /// the deadline rule stays testable.
    pub fn validate(&self, today: NaiveDate) -> Result<(), WorkflowError> {
        let name_len = self.project_name.trim().chars().count();
        if name_len == 0 {
            return Err(WorkflowError::InvalidDraft(
                "project name is required".to_string(),
            ));
        }
        if self.project_name.chars().count() > MAX_NAME_CHARS {
            return Err(WorkflowError::InvalidDraft(format!(
                "project name cannot exceed {MAX_NAME_CHARS} characters"
            )));
        }
        if self.client_id.trim().is_empty() {
            return Err(WorkflowError::InvalidDraft("client is required".to_string()));
        }
        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(WorkflowError::InvalidDraft(format!(
                    "description cannot exceed {MAX_DESCRIPTION_CHARS} characters"
                )));
            }
        }
        if let Some(budget) = self.budget {
            if !(budget >= 0.0) {
                return Err(WorkflowError::InvalidDraft(
                    "budget cannot be negative".to_string(),
                ));
            }
        }
        if let Some(deadline) = self.deadline {
            if deadline <= today {
                return Err(WorkflowError::InvalidDraft(
                    "deadline must be in the future".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn into_item(self, id: ProjectId) -> WorkItem {
        WorkItem {
            id,
            status: self.status,
            payload: ProjectPayload {
                project_name: self.project_name,
                client_id: self.client_id,
                description: self.description,
                budget: self.budget,
                deadline: self.deadline,
                priority: self.priority,
                archived: false,
                updated_at: Some(Utc::now()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn test_work_item_json_matches_record_shape() {
        let item = WorkItem::new("p-1", "Website redesign", ProjectStatus::InProgress)
            .with_priority(ProjectPriority::High);
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["project_id"], "p-1");
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["project_name"], "Website redesign");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["archived"], false);
    }

    #[test]
    fn test_work_item_parses_minimal_record() {
        let item: WorkItem = serde_json::from_str(
            r#"{"project_id":"p-9","status":"testing","project_name":"API"}"#,
        )
        .unwrap();
        assert_eq!(item.id, ProjectId::from("p-9"));
        assert_eq!(item.status, ProjectStatus::Testing);
        assert_eq!(item.payload.priority, ProjectPriority::Medium);
        assert!(!item.payload.archived);
    }

    #[test]
    fn test_unknown_status_in_record_is_rejected() {
        let parsed: Result<WorkItem, _> = serde_json::from_str(
            r#"{"project_id":"p-9","status":"paused","project_name":"API"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_draft_validation() {
        let draft = ProjectDraft::new("CRM rollout", "client-1");
        assert!(draft.validate(today()).is_ok());

        let empty = ProjectDraft::new("   ", "client-1");
        assert!(matches!(empty.validate(today()), Err(WorkflowError::InvalidDraft(_))));

        let long = ProjectDraft::new("x".repeat(151), "client-1");
        assert!(long.validate(today()).is_err());

        let no_client = ProjectDraft::new("CRM rollout", "");
        assert!(no_client.validate(today()).is_err());

        let mut negative = ProjectDraft::new("CRM rollout", "client-1");
        negative.budget = Some(-1.0);
        assert!(negative.validate(today()).is_err());

        let mut past = ProjectDraft::new("CRM rollout", "client-1");
        past.deadline = Some(today());
        assert!(past.validate(today()).is_err());
        past.deadline = today().succ_opt();
        assert!(past.validate(today()).is_ok());
    }

    #[test]
    fn test_draft_into_item_defaults_to_backlog() {
        let item = ProjectDraft::new("CRM rollout", "client-1").into_item(ProjectId::from("p-2"));
        assert_eq!(item.status, ProjectStatus::Backlog);
        assert!(!item.payload.archived);
        assert!(item.payload.updated_at.is_some());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ProjectId::generate(), ProjectId::generate());
    }
}
