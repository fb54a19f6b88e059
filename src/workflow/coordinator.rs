// Optimistic move protocol
//
// A drag is applied to the board first and confirmed by the record store
// afterwards. The board lock is never held across the remote call, so change
// events keep flowing while a move is in flight.

use std::sync::Arc;
use statig::prelude::*;
use tracing::{info, warn, Instrument};

use super::board::SharedBoard;
use super::errors::WorkflowError;
use super::lifecycle::{MoveEvent, MoveLifecycle};
use super::notify::{Notification, Notifier};
use super::status::ProjectStatus;
use super::transitions::is_transition_allowed;
use super::types::{ProjectId, WorkItem};
use crate::config::WorkflowConfig;
use crate::remote::RemoteStore;
use crate::telemetry::{create_board_span, generate_correlation_id};

/// How a move request ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The record store accepted the move.
    Confirmed { item: WorkItem, from: ProjectStatus },
    /// Dropped onto its own column.
    Unchanged,
    /// The id is no longer on the board.
    Stale,
    /// The board was unmounted before the move settled.
    Detached,
}

pub struct MoveCoordinator {
    board: SharedBoard,
    remote: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    settings: WorkflowConfig,
}

impl MoveCoordinator {
    pub fn new(
        board: SharedBoard,
        remote: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
        settings: WorkflowConfig,
    ) -> Self {
        Self {
            board,
            remote,
            notifier,
            settings,
        }
    }

    /// Moves `id` to `to`, optimistically.
    ///
    /// Illegal transitions are refused before anything is touched. Remote
    /// failures restore the card to its exact previous position and come
    /// back as `RemoteRejected` or `RemoteUnreachable`.
    pub async fn request_move(
        &self,
        id: &ProjectId,
        to: ProjectStatus,
    ) -> Result<MoveOutcome, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_board_span("move", Some(id.as_str()), Some(&correlation_id));
        self.run_move(id, to).instrument(span).await
    }

    async fn run_move(
        &self,
        id: &ProjectId,
        to: ProjectStatus,
    ) -> Result<MoveOutcome, WorkflowError> {
        let mut board = self.board.lock().await;
        if !board.is_mounted() {
            return Ok(MoveOutcome::Detached);
        }
        let Some(current) = board.store.get(id) else {
            info!(project_id = %id, "Move ignored, project not on board");
            return Ok(MoveOutcome::Stale);
        };
        let from = current.status;
        if from == to {
            return Ok(MoveOutcome::Unchanged);
        }

        let mut lifecycle = MoveLifecycle::new(id.clone(), from, to).state_machine();
        let legal = is_transition_allowed(from, to);
        lifecycle.handle(&MoveEvent::Validate { legal });
        if !legal {
            drop(board);
            self.notifier.notify(Notification::IllegalMove { from, to });
            return Err(WorkflowError::IllegalTransition { from, to });
        }

        if self.settings.block_pending_moves && board.is_in_flight(id) {
            return Err(WorkflowError::MovePending(id.clone()));
        }

        let Some(previous) = board.store.move_local(id, to) else {
            return Ok(MoveOutcome::Stale);
        };
        lifecycle.handle(&MoveEvent::ApplyLocal);
        board.pending.register_move(id.clone(), to);
        board.begin_move(id);
        let record = match board.store.get(id) {
            Some(item) => item.clone(),
            None => return Ok(MoveOutcome::Stale),
        };
        drop(board);

        info!(project_id = %id, from = %from, to = %to, "Move applied locally");
        let result = self.remote.update_project(&record).await;

        let mut board = self.board.lock().await;
        board.finish_move(id);
        if !board.is_mounted() {
            warn!(project_id = %id, "Move settled after board was unmounted");
            return Ok(MoveOutcome::Detached);
        }

        match result {
            Ok(confirmed) => {
                lifecycle.handle(&MoveEvent::RemoteConfirmed);
                board.store.update_existing(confirmed.clone());
                if self.settings.clear_pending_on_confirm {
                    board.pending.clear(id);
                }
                drop(board);

                info!(project_id = %id, to = %to, phase = ?lifecycle.inner().phase(), "Move confirmed");
                self.notifier.notify(Notification::MoveConfirmed {
                    name: confirmed.name().to_string(),
                    to,
                });
                Ok(MoveOutcome::Confirmed {
                    item: confirmed,
                    from,
                })
            }
            Err(remote_err) => {
                let err = WorkflowError::from(remote_err);
                lifecycle.handle(&MoveEvent::RemoteFailed {
                    reason: err.to_string(),
                });
                board.store.restore(id, previous);
                board.pending.clear(id);
                drop(board);

                self.notifier.notify(Notification::MoveFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}
