// Merging change events from the record store into the local board
//
// Every session sees every change, its own included. Writes this session made
// are recognised through the pending set and applied without a toast.

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, warn};

use super::board::{BoardState, SharedBoard};
use super::errors::WorkflowError;
use super::notify::{Notification, Notifier};
use super::pending::EchoMatch;
use crate::config::RealtimeConfig;
use crate::remote::{ChangeEvent, ChangeOperation, RemoteStore};

/// What a single change event did to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Not for this board's schema or table.
    Ignored,
    /// Our own write coming back.
    Echo,
    /// Another session's change, now reflected locally.
    Applied { notification: Option<Notification> },
    /// Duplicate, out of order or about a card we do not have.
    Stale,
}

pub struct RealtimeMergeHandler {
    schema: String,
    table: String,
    show_notifications: bool,
    notifier: Arc<dyn Notifier>,
}

impl RealtimeMergeHandler {
    pub fn new(config: &RealtimeConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            schema: config.schema.clone(),
            table: config.table.clone(),
            show_notifications: config.show_notifications,
            notifier,
        }
    }

    pub fn handle(&self, state: &mut BoardState, event: &ChangeEvent) -> MergeOutcome {
        if !event.matches_scope(&self.schema, &self.table) {
            debug!(schema = %event.schema, table = %event.table, "Change event out of scope");
            return MergeOutcome::Ignored;
        }
        if !state.is_mounted() {
            return MergeOutcome::Stale;
        }

        let outcome = match event.operation {
            ChangeOperation::Insert => Self::merge_insert(state, event),
            ChangeOperation::Update => Self::merge_update(state, event),
            ChangeOperation::Delete => Self::merge_delete(state, event),
        };

        if let MergeOutcome::Applied {
            notification: Some(notification),
        } = &outcome
        {
            if self.show_notifications {
                self.notifier.notify(notification.clone());
            }
        }
        outcome
    }

    fn merge_insert(state: &mut BoardState, event: &ChangeEvent) -> MergeOutcome {
        let Some(item) = &event.new_record else {
            return MergeOutcome::Stale;
        };
        if state.pending.take(&item.id) {
            debug!(project_id = %item.id, "Skipping echo of own insert");
            return MergeOutcome::Echo;
        }
        let is_new = !state.store.contains(&item.id);
        if !state.store.apply_remote_change(event) {
            return MergeOutcome::Stale;
        }
        info!(project_id = %item.id, status = %item.status, "Remote insert merged");
        MergeOutcome::Applied {
            notification: is_new.then(|| Notification::ProjectCreated {
                name: item.name().to_string(),
            }),
        }
    }

    fn merge_update(state: &mut BoardState, event: &ChangeEvent) -> MergeOutcome {
        let Some(item) = &event.new_record else {
            return MergeOutcome::Stale;
        };
        match state.pending.match_echo(&item.id, item.status) {
            EchoMatch::Current => {
                // Still applied: the stored row may differ from what we drew.
                state.store.apply_remote_change(event);
                debug!(project_id = %item.id, "Own update echoed back");
                return MergeOutcome::Echo;
            }
            EchoMatch::Superseded => {
                debug!(project_id = %item.id, status = %item.status, "Skipping echo of an overtaken move");
                return MergeOutcome::Echo;
            }
            EchoMatch::NotPending => {}
        }
        let Some(previous) = state.store.get(&item.id).map(|current| current.status) else {
            if event.restores_archived() && state.store.apply_remote_change(event) {
                info!(project_id = %item.id, status = %item.status, "Remote unarchive merged");
                return MergeOutcome::Applied {
                    notification: Some(Notification::ProjectRestored {
                        name: item.name().to_string(),
                    }),
                };
            }
            return MergeOutcome::Stale;
        };
        if !state.store.apply_remote_change(event) {
            return MergeOutcome::Stale;
        }

        let name = item.name().to_string();
        let notification = if item.payload.archived {
            Some(Notification::ProjectArchived { name })
        } else if item.status != previous {
            Some(Notification::ProjectMoved {
                name,
                to: item.status,
            })
        } else {
            None
        };
        info!(project_id = %item.id, from = %previous, to = %item.status, "Remote update merged");
        MergeOutcome::Applied { notification }
    }

    fn merge_delete(state: &mut BoardState, event: &ChangeEvent) -> MergeOutcome {
        let Some(id) = event.project_id() else {
            return MergeOutcome::Stale;
        };
        if state.pending.take(id) {
            state.store.remove(id);
            return MergeOutcome::Echo;
        }
        match state.store.remove(id) {
            Some(removed) => {
                info!(project_id = %id, "Remote delete merged");
                MergeOutcome::Applied {
                    notification: Some(Notification::ProjectDeleted {
                        name: removed.name().to_string(),
                    }),
                }
            }
            None => MergeOutcome::Stale,
        }
    }
}

/// Feeds one subscription into one board, in receipt order.
pub struct RealtimeListener {
    board: SharedBoard,
    remote: Arc<dyn RemoteStore>,
    events: broadcast::Receiver<ChangeEvent>,
    handler: RealtimeMergeHandler,
}

impl RealtimeListener {
    /// Subscribes right away so nothing published after this call is missed.
    pub fn new(board: SharedBoard, remote: Arc<dyn RemoteStore>, handler: RealtimeMergeHandler) -> Self {
        let events = remote.subscribe();
        Self {
            board,
            remote,
            events,
            handler,
        }
    }

    /// Handles every event already delivered, without waiting for more.
    /// Returns how many events were processed.
    pub async fn pump(&mut self) -> Result<usize, WorkflowError> {
        let mut processed = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.dispatch(&event).await;
                    processed += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change subscription lagged, resyncing board");
                    self.resync().await?;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        Ok(processed)
    }

    /// Runs until the subscription closes or the board is unmounted.
    pub async fn run(mut self) {
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    if !self.dispatch(&event).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change subscription lagged, resyncing board");
                    if let Err(err) = self.resync().await {
                        warn!(error = %err, "Board resync failed");
                    }
                }
                Err(RecvError::Closed) => {
                    info!("Change subscription closed");
                    break;
                }
            }
        }
    }

    /// Returns false once the board is gone.
    async fn dispatch(&self, event: &ChangeEvent) -> bool {
        let mut state = self.board.lock().await;
        if !state.is_mounted() {
            return false;
        }
        state.pending.purge_expired();
        self.handler.handle(&mut state, event);
        true
    }

    async fn resync(&self) -> Result<(), WorkflowError> {
        let items = self.remote.fetch_board_items().await?;
        let mut state = self.board.lock().await;
        if state.is_mounted() {
            state.store.load(items);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRecordStore;
    use crate::workflow::notify::{ChannelNotifier, MockNotifier};
    use crate::workflow::pending::PendingMutations;
    use crate::workflow::{ProjectId, ProjectStatus, WorkItem};
    use tokio::sync::{mpsc, Mutex};
    use ProjectStatus::*;

    fn item(id: &str, status: ProjectStatus) -> WorkItem {
        WorkItem::new(id, format!("Project {id}"), status)
    }

    fn id(id: &str) -> ProjectId {
        ProjectId::from(id)
    }

    fn state_with(items: Vec<WorkItem>) -> BoardState {
        let mut state = BoardState::new(PendingMutations::default());
        state.store.load(items);
        state
    }

    fn handler() -> (RealtimeMergeHandler, mpsc::UnboundedReceiver<Notification>) {
        let (notifier, rx) = ChannelNotifier::new();
        (
            RealtimeMergeHandler::new(&RealtimeConfig::default(), Arc::new(notifier)),
            rx,
        )
    }

    #[tokio::test]
    async fn test_foreign_move_notifies() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![item("p1", InProgress)]);

        let event = ChangeEvent::update(Some(item("p1", InProgress)), item("p1", Testing));
        let outcome = handler.handle(&mut state, &event);

        let expected = Notification::ProjectMoved {
            name: "Project p1".to_string(),
            to: Testing,
        };
        assert_eq!(
            outcome,
            MergeOutcome::Applied {
                notification: Some(expected.clone())
            }
        );
        assert_eq!(rx.try_recv().unwrap(), expected);
        assert_eq!(state.store.get(&id("p1")).unwrap().status, Testing);
    }

    #[tokio::test]
    async fn test_own_echo_is_silent_and_consumes_pending() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![item("p1", Proposal)]);
        state.pending.register(id("p1"));

        let event = ChangeEvent::update(Some(item("p1", Backlog)), item("p1", Proposal));
        assert_eq!(handler.handle(&mut state, &event), MergeOutcome::Echo);
        assert!(rx.try_recv().is_err());
        assert!(!state.pending.is_pending(&id("p1")));
        assert_eq!(state.store.get(&id("p1")).unwrap().status, Proposal);
    }

    #[tokio::test]
    async fn test_echo_corrects_divergence() {
        let (handler, _rx) = handler();
        let mut state = state_with(vec![item("p1", Proposal)]);
        state.pending.register(id("p1"));

        let mut stored = item("p1", Proposal);
        stored.payload.description = Some("set by trigger".to_string());
        handler.handle(&mut state, &ChangeEvent::update(None, stored.clone()));
        assert_eq!(state.store.get(&id("p1")), Some(&stored));
    }

    #[tokio::test]
    async fn test_overtaken_echo_does_not_move_card_back() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![item("p1", Approved)]);
        state.pending.register_move(id("p1"), Approved);

        let first = ChangeEvent::update(Some(item("p1", Backlog)), item("p1", Proposal));
        assert_eq!(handler.handle(&mut state, &first), MergeOutcome::Echo);
        assert_eq!(state.store.get(&id("p1")).unwrap().status, Approved);
        assert!(state.pending.is_pending(&id("p1")));

        let second = ChangeEvent::update(Some(item("p1", Proposal)), item("p1", Approved));
        assert_eq!(handler.handle(&mut state, &second), MergeOutcome::Echo);
        assert!(!state.pending.is_pending(&id("p1")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_foreign_unarchive_puts_card_back() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![]);

        let event = ChangeEvent::update(
            Some(item("p1", Completed).archived(true)),
            item("p1", Completed),
        );
        let expected = Notification::ProjectRestored {
            name: "Project p1".to_string(),
        };
        assert_eq!(
            handler.handle(&mut state, &event),
            MergeOutcome::Applied {
                notification: Some(expected.clone())
            }
        );
        assert_eq!(rx.try_recv().unwrap(), expected);
        assert_eq!(state.store.get(&id("p1")).unwrap().status, Completed);

        assert_eq!(handler.handle(&mut state, &event), MergeOutcome::Stale);
        assert_eq!(state.store.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_and_duplicate_insert() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![]);
        let event = ChangeEvent::insert(item("p9", Backlog));

        assert!(matches!(
            handler.handle(&mut state, &event),
            MergeOutcome::Applied { notification: Some(Notification::ProjectCreated { .. }) }
        ));
        assert_eq!(handler.handle(&mut state, &event), MergeOutcome::Stale);
        assert_eq!(state.store.len(), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_own_insert_is_skipped() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![item("p9", Backlog)]);
        state.pending.register(id("p9"));

        let event = ChangeEvent::insert(item("p9", Backlog));
        assert_eq!(handler.handle(&mut state, &event), MergeOutcome::Echo);
        assert_eq!(state.store.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_then_stray_update() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![item("p1", Testing)]);

        let deleted = handler.handle(&mut state, &ChangeEvent::delete(item("p1", Testing)));
        assert_eq!(
            deleted,
            MergeOutcome::Applied {
                notification: Some(Notification::ProjectDeleted {
                    name: "Project p1".to_string()
                })
            }
        );

        let stray = ChangeEvent::update(None, item("p1", Completed));
        assert_eq!(handler.handle(&mut state, &stray), MergeOutcome::Stale);
        assert!(state.store.is_empty());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_archive_update_notifies_and_removes() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![item("p1", Completed)]);

        let event = ChangeEvent::update(None, item("p1", Completed).archived(true));
        handler.handle(&mut state, &event);
        assert!(state.store.is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::ProjectArchived {
                name: "Project p1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_payload_only_update_is_silent() {
        let (handler, mut rx) = handler();
        let mut state = state_with(vec![item("p1", Approved)]);

        let renamed = item("p1", Approved).with_client("client-7");
        let outcome = handler.handle(&mut state, &ChangeEvent::update(None, renamed));
        assert_eq!(outcome, MergeOutcome::Applied { notification: None });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_out_of_scope_events_are_ignored() {
        let (handler, _rx) = handler();
        let mut state = state_with(vec![]);
        let event = ChangeEvent::insert(item("p1", Backlog)).in_scope("public", "invoices");
        assert_eq!(handler.handle(&mut state, &event), MergeOutcome::Ignored);
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_notifications_can_be_disabled() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(0);
        let config = RealtimeConfig {
            show_notifications: false,
            ..RealtimeConfig::default()
        };
        let handler = RealtimeMergeHandler::new(&config, Arc::new(notifier));
        let mut state = state_with(vec![item("p1", Backlog)]);

        let outcome = handler.handle(&mut state, &ChangeEvent::update(None, item("p1", Proposal)));
        assert!(matches!(outcome, MergeOutcome::Applied { notification: Some(_) }));
    }

    #[tokio::test]
    async fn test_listener_pumps_in_order() {
        let remote = Arc::new(MemoryRecordStore::new());
        let board: SharedBoard = Arc::new(Mutex::new(BoardState::new(PendingMutations::default())));
        let (handler, _rx) = handler();
        let mut listener = RealtimeListener::new(board.clone(), remote.clone(), handler);

        remote.emit(ChangeEvent::insert(item("p1", Backlog)));
        remote.emit(ChangeEvent::update(Some(item("p1", Backlog)), item("p1", Proposal)));
        remote.emit(ChangeEvent::delete(item("p1", Proposal)));
        remote.emit(ChangeEvent::insert(item("p2", Approved)));

        assert_eq!(listener.pump().await.unwrap(), 4);
        let state = board.lock().await;
        assert!(!state.store.contains(&id("p1")));
        assert_eq!(state.store.get(&id("p2")).unwrap().status, Approved);
    }

    #[tokio::test]
    async fn test_listener_resyncs_after_lag() {
        let remote = Arc::new(MemoryRecordStore::with_capacity(2));
        let board: SharedBoard = Arc::new(Mutex::new(BoardState::new(PendingMutations::default())));
        let (handler, _rx) = handler();
        let mut listener = RealtimeListener::new(board.clone(), remote.clone(), handler);

        for n in 0..5 {
            let project = item(&format!("p{n}"), Backlog);
            remote.create_project(&project).await.unwrap();
        }

        listener.pump().await.unwrap();
        let state = board.lock().await;
        assert_eq!(state.store.len(), 5);
        assert!(state.store.check_invariants().is_ok());
    }
}
