// Project status and priority enums shared by the board, the remote store and the CLI

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::WorkflowError;

/// Kanban column a project lives in.
///
/// The set is closed: anything else coming off the wire is rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Backlog,
    Proposal,
    Approved,
    InProgress,
    Testing,
    Completed,
    Cancelled,
}

/// Display order of the board columns, left to right.
pub const COLUMN_ORDER: [ProjectStatus; 7] = [
    ProjectStatus::Backlog,
    ProjectStatus::Proposal,
    ProjectStatus::Approved,
    ProjectStatus::InProgress,
    ProjectStatus::Testing,
    ProjectStatus::Completed,
    ProjectStatus::Cancelled,
];

impl ProjectStatus {
    /// Wire label, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Backlog => "backlog",
            ProjectStatus::Proposal => "proposal",
            ProjectStatus::Approved => "approved",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Testing => "testing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    /// Human-readable column title used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Backlog => "Backlog",
            ProjectStatus::Proposal => "Proposal",
            ProjectStatus::Approved => "Approved",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Testing => "Testing",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Cancelled => "Cancelled",
        }
    }

    /// Position of the column in [`COLUMN_ORDER`].
    pub fn column_index(&self) -> usize {
        match self {
            ProjectStatus::Backlog => 0,
            ProjectStatus::Proposal => 1,
            ProjectStatus::Approved => 2,
            ProjectStatus::InProgress => 3,
            ProjectStatus::Testing => 4,
            ProjectStatus::Completed => 5,
            ProjectStatus::Cancelled => 6,
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Backlog
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        COLUMN_ORDER
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| WorkflowError::UnknownStatus(s.to_string()))
    }
}

/// Project priority, used to order cards when the board is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for ProjectPriority {
    fn default() -> Self {
        ProjectPriority::Medium
    }
}

impl fmt::Display for ProjectPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProjectPriority::Low => "low",
            ProjectPriority::Medium => "medium",
            ProjectPriority::High => "high",
            ProjectPriority::Urgent => "urgent",
        };
        f.write_str(label)
    }
}
