use thiserror::Error;

use super::status::ProjectStatus;
use super::types::ProjectId;
use crate::remote::RemoteError;

/// Errors surfaced to the board when a mutation cannot go through.
///
/// Every variant is terminal for the attempt that produced it. Nothing here is
/// retried automatically; the user re-issues the drag.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("Cannot move project from \"{}\" to \"{}\"", from.label(), to.label())]
    IllegalTransition {
        from: ProjectStatus,
        to: ProjectStatus,
    },
    #[error("Update rejected: {0}")]
    RemoteRejected(String),
    #[error("Update failed: {0}")]
    RemoteUnreachable(String),
    #[error("Project {0} already has a move in flight")]
    MovePending(ProjectId),
    #[error("Unknown project status: {0}")]
    UnknownStatus(String),
    #[error("Invalid project: {0}")]
    InvalidDraft(String),
}

impl From<RemoteError> for WorkflowError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected(msg) => WorkflowError::RemoteRejected(msg),
            RemoteError::Unreachable(msg) => WorkflowError::RemoteUnreachable(msg),
            // The row vanished under us, which the board treats as a refusal.
            missing @ RemoteError::NotFound(_) => WorkflowError::RemoteRejected(missing.to_string()),
            RemoteError::Workflow(inner) => match inner {
                // A server-side guard rejection is a rejection like any other.
                WorkflowError::IllegalTransition { .. } => {
                    WorkflowError::RemoteRejected(inner.to_string())
                }
                other => other,
            },
        }
    }
}
