// One mounted board: store, pending set, coordinator and change listener
//
// Nothing here is global. Two sessions over the same record store only see
// each other through the change stream.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::board::{BoardSnapshot, BoardState, SharedBoard};
use super::coordinator::{MoveCoordinator, MoveOutcome};
use super::errors::WorkflowError;
use super::notify::{Notification, Notifier};
use super::pending::PendingMutations;
use super::realtime::{RealtimeListener, RealtimeMergeHandler};
use super::status::ProjectStatus;
use super::types::{ProjectDraft, ProjectId, WorkItem};
use crate::config::AncloraConfig;
use crate::remote::RemoteStore;

enum ListenerSlot {
    /// Events are processed when the owner calls [`KanbanSession::pump`].
    Manual(RealtimeListener),
    /// Events are processed by a background task.
    Spawned(JoinHandle<()>),
    Stopped,
}

pub struct KanbanSession {
    board: SharedBoard,
    remote: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    coordinator: MoveCoordinator,
    listener: ListenerSlot,
}

impl KanbanSession {
    /// Subscribes to changes, then loads the board. Subscribing first means a
    /// change landing between the two is replayed rather than lost.
    pub async fn mount(
        remote: Arc<dyn RemoteStore>,
        config: &AncloraConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, WorkflowError> {
        let pending = PendingMutations::new(config.workflow.pending_ttl());
        let board: SharedBoard = Arc::new(Mutex::new(BoardState::new(pending)));

        let handler = RealtimeMergeHandler::new(&config.realtime, notifier.clone());
        let listener = RealtimeListener::new(board.clone(), remote.clone(), handler);

        let items = remote.fetch_board_items().await?;
        let loaded = {
            let mut state = board.lock().await;
            state.store.load(items);
            state.store.len()
        };
        info!(
            items = loaded,
            channel = %config.realtime.channel,
            "Board mounted"
        );

        let coordinator = MoveCoordinator::new(
            board.clone(),
            remote.clone(),
            notifier.clone(),
            config.workflow.clone(),
        );

        Ok(Self {
            board,
            remote,
            notifier,
            coordinator,
            listener: ListenerSlot::Manual(listener),
        })
    }

    /// Hands the change subscription to a background task.
    pub fn start_listener(&mut self) {
        if let ListenerSlot::Manual(listener) =
            std::mem::replace(&mut self.listener, ListenerSlot::Stopped)
        {
            self.listener = ListenerSlot::Spawned(tokio::spawn(listener.run()));
        }
    }

    /// Processes delivered change events. A no-op once the listener runs in
    /// the background.
    pub async fn pump(&mut self) -> Result<usize, WorkflowError> {
        match &mut self.listener {
            ListenerSlot::Manual(listener) => listener.pump().await,
            _ => Ok(0),
        }
    }

    /// Full refetch, replacing whatever the board currently shows.
    pub async fn refresh(&self) -> Result<usize, WorkflowError> {
        let items = self.remote.fetch_board_items().await?;
        let mut state = self.board.lock().await;
        if !state.is_mounted() {
            return Ok(0);
        }
        state.store.load(items);
        Ok(state.store.len())
    }

    pub async fn request_move(
        &self,
        id: &ProjectId,
        to: ProjectStatus,
    ) -> Result<MoveOutcome, WorkflowError> {
        self.coordinator.request_move(id, to).await
    }

    /// Validates the draft, writes it, then shows it locally.
    pub async fn create_project(&self, draft: ProjectDraft) -> Result<WorkItem, WorkflowError> {
        draft.validate(Utc::now().date_naive())?;
        let item = draft.into_item(ProjectId::generate());

        self.board.lock().await.pending.register(item.id.clone());
        let created = match self.remote.create_project(&item).await {
            Ok(created) => created,
            Err(err) => {
                self.board.lock().await.pending.clear(&item.id);
                return Err(err.into());
            }
        };

        let mut state = self.board.lock().await;
        if state.is_mounted() {
            state.store.insert(created.clone());
        }
        drop(state);

        info!(project_id = %created.id, status = %created.status, "Project created");
        self.notifier.notify(Notification::ProjectCreated {
            name: created.name().to_string(),
        });
        Ok(created)
    }

    /// Takes a card off the board without deleting its record.
    pub async fn archive_project(&self, id: &ProjectId) -> Result<(), WorkflowError> {
        let archived = self.write_guarded(id, self.remote.set_archived(id, true)).await?;

        let mut state = self.board.lock().await;
        if state.is_mounted() {
            state.store.remove(id);
        }
        drop(state);

        self.notifier.notify(Notification::ProjectArchived {
            name: archived.name().to_string(),
        });
        Ok(())
    }

    /// Puts an archived project back on the board.
    pub async fn unarchive_project(&self, id: &ProjectId) -> Result<WorkItem, WorkflowError> {
        let restored = self.write_guarded(id, self.remote.set_archived(id, false)).await?;

        let mut state = self.board.lock().await;
        if state.is_mounted() && !state.store.update_existing(restored.clone()) {
            state.store.insert(restored.clone());
        }
        drop(state);

        self.notifier.notify(Notification::ProjectRestored {
            name: restored.name().to_string(),
        });
        Ok(restored)
    }

    pub async fn delete_project(&self, id: &ProjectId) -> Result<(), WorkflowError> {
        self.write_guarded(id, self.remote.delete_project(id)).await?;

        let mut state = self.board.lock().await;
        let removed = if state.is_mounted() {
            state.store.remove(id)
        } else {
            None
        };
        drop(state);

        if let Some(removed) = removed {
            self.notifier.notify(Notification::ProjectDeleted {
                name: removed.name().to_string(),
            });
        }
        Ok(())
    }

    /// Registers `id` as pending around a remote write so its echo is skipped.
    async fn write_guarded<T>(
        &self,
        id: &ProjectId,
        write: impl std::future::Future<Output = Result<T, crate::remote::RemoteError>>,
    ) -> Result<T, WorkflowError> {
        self.board.lock().await.pending.register(id.clone());
        match write.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.board.lock().await.pending.clear(id);
                warn!(project_id = %id, error = %err, "Project write failed");
                Err(err.into())
            }
        }
    }

    pub async fn board_snapshot(&self) -> BoardSnapshot {
        self.board.lock().await.store.snapshot()
    }

    pub async fn item(&self, id: &ProjectId) -> Option<WorkItem> {
        self.board.lock().await.store.get(id).cloned()
    }

    pub async fn items(&self) -> Vec<WorkItem> {
        self.board.lock().await.store.items().cloned().collect()
    }

    pub async fn check_invariants(&self) -> Result<(), String> {
        self.board.lock().await.store.check_invariants()
    }

    /// Shared handle on the board state, for embedding in a UI.
    pub fn board(&self) -> SharedBoard {
        self.board.clone()
    }

    /// Stops the listener and drops the board. Remote calls still in flight
    /// settle as no-ops.
    pub async fn unmount(mut self) {
        self.stop_listener();
        self.board.lock().await.unmount();
        info!("Board unmounted");
    }

    fn stop_listener(&mut self) {
        if let ListenerSlot::Spawned(handle) =
            std::mem::replace(&mut self.listener, ListenerSlot::Stopped)
        {
            handle.abort();
        }
    }
}

impl Drop for KanbanSession {
    fn drop(&mut self) {
        self.stop_listener();
        if let Ok(mut state) = self.board.try_lock() {
            if state.is_mounted() {
                state.unmount();
            }
        }
    }
}
