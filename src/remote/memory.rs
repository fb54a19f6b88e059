// In-process record store with the same contract as the hosted one
//
// Used by tests and the CLI simulator. Unlike a generic record store it
// enforces the transition table on every write, so a stale or misbehaving
// client cannot persist an illegal move.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::{ChangeEvent, RemoteError, RemoteStore};
use crate::workflow::transitions::guard_transition;
use crate::workflow::{ProjectId, WorkItem};

const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<ProjectId, WorkItem>>,
    failures: Mutex<VecDeque<RemoteError>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_BUFFER)
    }

    /// `event_buffer` bounds how far a slow subscriber may fall behind before
    /// it observes a lag.
    pub fn with_capacity(event_buffer: usize) -> Self {
        Self::build(BTreeMap::new(), event_buffer)
    }

    /// Store pre-populated with `items`. No change events are published.
    pub fn with_records(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let records = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        Self::build(records, DEFAULT_EVENT_BUFFER)
    }

    fn build(records: BTreeMap<ProjectId, WorkItem>, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            records: Mutex::new(records),
            failures: Mutex::new(VecDeque::new()),
            events,
        }
    }

    /// The next write fails with `error` instead of touching any record.
    pub async fn fail_next_write(&self, error: RemoteError) {
        self.failures.lock().await.push_back(error);
    }

    /// Current stored version of a record, archived or not.
    pub async fn record(&self, id: &ProjectId) -> Option<WorkItem> {
        self.records.lock().await.get(id).cloned()
    }

    /// Publishes a raw change event, as another writer of the table would.
    pub fn emit(&self, event: ChangeEvent) {
        self.publish(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    async fn take_failure(&self) -> Result<(), RemoteError> {
        match self.failures.lock().await.pop_front() {
            Some(err) => {
                warn!(error = %err, "Injected record store failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn publish(&self, event: ChangeEvent) {
        // No subscribers is not an error: nobody has the board open.
        if self.events.send(event).is_err() {
            debug!("Change event dropped, no subscribers");
        }
    }
}

/// Board order: priority descending, then nearest deadline, undated last.
fn board_order(a: &WorkItem, b: &WorkItem) -> Ordering {
    b.payload
        .priority
        .cmp(&a.payload.priority)
        .then_with(|| match (a.payload.deadline, b.payload.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

#[async_trait]
impl RemoteStore for MemoryRecordStore {
    async fn fetch_board_items(&self) -> Result<Vec<WorkItem>, RemoteError> {
        let records = self.records.lock().await;
        let mut items: Vec<WorkItem> = records
            .values()
            .filter(|item| !item.payload.archived)
            .cloned()
            .collect();
        items.sort_by(board_order);
        Ok(items)
    }

    async fn get_project(&self, id: &ProjectId) -> Result<WorkItem, RemoteError> {
        self.records
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.clone()))
    }

    async fn create_project(&self, item: &WorkItem) -> Result<WorkItem, RemoteError> {
        self.take_failure().await?;
        let mut records = self.records.lock().await;
        if records.contains_key(&item.id) {
            return Err(RemoteError::Rejected(format!(
                "duplicate key value violates unique constraint on project_id {}",
                item.id
            )));
        }
        let mut stored = item.clone();
        stored.payload.updated_at = Some(Utc::now());
        records.insert(stored.id.clone(), stored.clone());
        drop(records);

        info!(project_id = %stored.id, status = %stored.status, "Project created");
        self.publish(ChangeEvent::insert(stored.clone()));
        Ok(stored)
    }

    async fn update_project(&self, item: &WorkItem) -> Result<WorkItem, RemoteError> {
        self.take_failure().await?;
        let mut records = self.records.lock().await;
        let current = records
            .get(&item.id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(item.id.clone()))?;

        guard_transition(current.status, item.status)?;

        let mut stored = item.clone();
        stored.payload.updated_at = Some(Utc::now());
        records.insert(stored.id.clone(), stored.clone());
        drop(records);

        info!(
            project_id = %stored.id,
            from = %current.status,
            to = %stored.status,
            "Project updated"
        );
        self.publish(ChangeEvent::update(Some(current), stored.clone()));
        Ok(stored)
    }

    async fn set_archived(&self, id: &ProjectId, archived: bool) -> Result<WorkItem, RemoteError> {
        self.take_failure().await?;
        let mut records = self.records.lock().await;
        let current = records
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;

        let mut stored = current.clone();
        stored.payload.archived = archived;
        stored.payload.updated_at = Some(Utc::now());
        records.insert(id.clone(), stored.clone());
        drop(records);

        info!(project_id = %id, archived, "Project archive flag changed");
        self.publish(ChangeEvent::update(Some(current), stored.clone()));
        Ok(stored)
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<(), RemoteError> {
        self.take_failure().await?;
        let removed = self
            .records
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;

        info!(project_id = %id, "Project deleted");
        self.publish(ChangeEvent::delete(removed));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}
