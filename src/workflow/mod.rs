// Kanban workflow engine: transition rules, board state and the move protocol

pub mod board;
pub mod coordinator;
pub mod errors;
pub mod lifecycle;
pub mod notify;
pub mod pending;
pub mod realtime;
pub mod session;
pub mod status;
pub mod transitions;
pub mod types;

pub use board::{BoardSnapshot, BoardState, SharedBoard, WorkflowStore};
pub use coordinator::{MoveCoordinator, MoveOutcome};
pub use errors::WorkflowError;
pub use lifecycle::{MoveEvent, MoveLifecycle, MovePhase};
pub use notify::{ChannelNotifier, Notification, Notifier, TracingNotifier};
pub use pending::{EchoMatch, PendingMutations, DEFAULT_PENDING_TTL};
pub use realtime::{MergeOutcome, RealtimeListener, RealtimeMergeHandler};
pub use session::KanbanSession;
pub use status::{ProjectPriority, ProjectStatus, COLUMN_ORDER};
pub use transitions::{
    allowed_next_states, guard_transition, is_terminal_status, is_transition_allowed,
    is_transition_allowed_str, TRANSITIONS,
};
pub use types::{Placement, ProjectDraft, ProjectId, ProjectPayload, WorkItem};
