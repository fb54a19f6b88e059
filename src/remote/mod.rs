// Remote record store seam
//
// The hosted database is an external collaborator. Everything the board needs
// from it goes through `RemoteStore` so the coordinator can be exercised
// against mocks or the in-memory store.

pub mod events;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::workflow::{ProjectId, WorkItem, WorkflowError};

pub use events::{ChangeEvent, ChangeOperation, DEFAULT_SCHEMA, DEFAULT_TABLE};
pub use memory::MemoryRecordStore;

/// Failures reported by the record store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// The store refused the write (constraint, permission, guard).
    #[error("{0}")]
    Rejected(String),
    /// The request never got an answer.
    #[error("{0}")]
    Unreachable(String),
    #[error("project {0} not found")]
    NotFound(ProjectId),
    /// A workflow rule enforced on the store side.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Record CRUD and change subscription over the projects collection.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Active (non-archived) projects in board order.
    async fn fetch_board_items(&self) -> Result<Vec<WorkItem>, RemoteError>;

    async fn get_project(&self, id: &ProjectId) -> Result<WorkItem, RemoteError>;

    async fn create_project(&self, item: &WorkItem) -> Result<WorkItem, RemoteError>;

    /// Writes the whole record, not just the status, so the store can validate it.
    async fn update_project(&self, item: &WorkItem) -> Result<WorkItem, RemoteError>;

    async fn set_archived(&self, id: &ProjectId, archived: bool) -> Result<WorkItem, RemoteError>;

    async fn delete_project(&self, id: &ProjectId) -> Result<(), RemoteError>;

    /// New receiver on the change stream. Only events published after the call
    /// are delivered.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
