use serde::{Deserialize, Serialize};
use statig::prelude::*;

use super::status::ProjectStatus;
use super::types::ProjectId;

/// Inputs driving a single drag from drop to settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveEvent {
    Validate { legal: bool },
    ApplyLocal,
    RemoteConfirmed,
    RemoteFailed { reason: String },
}

/// Where a move attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovePhase {
    Requested,
    Validated,
    AppliedLocally,
    Confirmed,
    RolledBack,
    Rejected,
}

impl MovePhase {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            MovePhase::Confirmed | MovePhase::RolledBack | MovePhase::Rejected
        )
    }
}

/// Lifecycle of one optimistic move.
///
/// Events that do not apply to the current state are ignored, so a late
/// confirmation can never resurrect a rejected move.
pub struct MoveLifecycle {
    pub project_id: ProjectId,
    pub from: ProjectStatus,
    pub to: ProjectStatus,
    phase: MovePhase,
    failure: Option<String>,
}

impl MoveLifecycle {
    pub fn new(project_id: ProjectId, from: ProjectStatus, to: ProjectStatus) -> Self {
        Self {
            project_id,
            from,
            to,
            phase: MovePhase::Requested,
            failure: None,
        }
    }

    pub fn phase(&self) -> MovePhase {
        self.phase
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    fn ignore_settled(&self, event: &MoveEvent) -> Outcome<State> {
        tracing::debug!(
            project_id = %self.project_id,
            phase = ?self.phase,
            event = ?event,
            "Event ignored, move already settled"
        );
        Handled
    }
}

#[state_machine(initial = "State::idle()")]
impl MoveLifecycle {
    #[state]
    fn idle(&mut self, event: &MoveEvent) -> Outcome<State> {
        match event {
            MoveEvent::Validate { legal: true } => {
                self.phase = MovePhase::Validated;
                Transition(State::validated())
            }
            MoveEvent::Validate { legal: false } => {
                self.phase = MovePhase::Rejected;
                tracing::info!(
                    project_id = %self.project_id,
                    from = %self.from,
                    to = %self.to,
                    "Move rejected by transition table"
                );
                Transition(State::rejected())
            }
            _ => Handled,
        }
    }

    #[state]
    fn validated(&mut self, event: &MoveEvent) -> Outcome<State> {
        match event {
            MoveEvent::ApplyLocal => {
                self.phase = MovePhase::AppliedLocally;
                Transition(State::applied_locally())
            }
            _ => Handled,
        }
    }

    #[state]
    fn applied_locally(&mut self, event: &MoveEvent) -> Outcome<State> {
        match event {
            MoveEvent::RemoteConfirmed => {
                self.phase = MovePhase::Confirmed;
                tracing::debug!(project_id = %self.project_id, to = %self.to, "Move confirmed");
                Transition(State::confirmed())
            }
            MoveEvent::RemoteFailed { reason } => {
                self.phase = MovePhase::RolledBack;
                self.failure = Some(reason.clone());
                tracing::warn!(
                    project_id = %self.project_id,
                    from = %self.from,
                    reason = %reason,
                    "Move rolled back"
                );
                Transition(State::rolled_back())
            }
            _ => Handled,
        }
    }

    #[state]
    fn confirmed(&mut self, event: &MoveEvent) -> Outcome<State> {
        self.ignore_settled(event)
    }

    #[state]
    fn rolled_back(&mut self, event: &MoveEvent) -> Outcome<State> {
        self.ignore_settled(event)
    }

    #[state]
    fn rejected(&mut self, event: &MoveEvent) -> Outcome<State> {
        self.ignore_settled(event)
    }
}
