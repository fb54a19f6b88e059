// Kanban transition table and the guard every status write goes through
//
// The table is plain data. Identity moves are always legal; anything not
// listed is rejected, including statuses we cannot parse.

use super::errors::WorkflowError;
use super::status::ProjectStatus;

/// Allowed successors for each status.
///
/// `proposal -> backlog` is part of the canonical table. One of the two board
/// prototypes did not allow it; we keep it so a proposal can be parked again.
pub const TRANSITIONS: &[(ProjectStatus, &[ProjectStatus])] = &[
    (
        ProjectStatus::Backlog,
        &[ProjectStatus::Proposal, ProjectStatus::Cancelled],
    ),
    (
        ProjectStatus::Proposal,
        &[
            ProjectStatus::Approved,
            ProjectStatus::Cancelled,
            ProjectStatus::Backlog,
        ],
    ),
    (
        ProjectStatus::Approved,
        &[ProjectStatus::InProgress, ProjectStatus::Cancelled],
    ),
    (
        ProjectStatus::InProgress,
        &[ProjectStatus::Testing, ProjectStatus::Cancelled],
    ),
    (
        ProjectStatus::Testing,
        &[
            ProjectStatus::InProgress,
            ProjectStatus::Completed,
            ProjectStatus::Cancelled,
        ],
    ),
    (ProjectStatus::Completed, &[]),
    (ProjectStatus::Cancelled, &[ProjectStatus::Backlog]),
];

/// Successor set for `from`. Empty for terminal statuses.
pub fn allowed_next_states(from: ProjectStatus) -> &'static [ProjectStatus] {
    TRANSITIONS
        .iter()
        .find(|(status, _)| *status == from)
        .map(|(_, next)| *next)
        .unwrap_or(&[])
}

/// Returns true when a card may move from `from` to `to`.
pub fn is_transition_allowed(from: ProjectStatus, to: ProjectStatus) -> bool {
    from == to || allowed_next_states(from).contains(&to)
}

/// Same check over wire labels. Unknown labels on either side fail closed.
pub fn is_transition_allowed_str(from: &str, to: &str) -> bool {
    match (from.parse::<ProjectStatus>(), to.parse::<ProjectStatus>()) {
        (Ok(from), Ok(to)) => is_transition_allowed(from, to),
        _ => false,
    }
}

/// Error-returning form of [`is_transition_allowed`].
pub fn guard_transition(from: ProjectStatus, to: ProjectStatus) -> Result<(), WorkflowError> {
    if is_transition_allowed(from, to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// A status with no way out. Only `completed` qualifies; `cancelled` can reopen.
pub fn is_terminal_status(status: ProjectStatus) -> bool {
    allowed_next_states(status).is_empty()
}
