// Anclora kanban workflow engine
// Status transition rules, the optimistic move protocol and realtime board sync.

pub mod cli;
pub mod config;
pub mod remote;
pub mod telemetry;
pub mod workflow;

pub use config::{config, init_config, AncloraConfig};
pub use remote::{ChangeEvent, ChangeOperation, MemoryRecordStore, RemoteError, RemoteStore};
pub use telemetry::{create_board_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    is_transition_allowed, KanbanSession, MoveCoordinator, MoveOutcome, Notification,
    ProjectDraft, ProjectId, ProjectStatus, WorkItem, WorkflowError, WorkflowStore,
};
