// User-facing notifications raised by moves and remote changes

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::status::ProjectStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    ProjectCreated { name: String },
    ProjectMoved { name: String, to: ProjectStatus },
    ProjectArchived { name: String },
    ProjectRestored { name: String },
    ProjectDeleted { name: String },
    MoveConfirmed { name: String, to: ProjectStatus },
    MoveFailed { message: String },
    IllegalMove { from: ProjectStatus, to: ProjectStatus },
}

impl Notification {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notification::MoveFailed { .. } | Notification::IllegalMove { .. }
        )
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::ProjectCreated { name } => write!(f, "New project: {name}"),
            Notification::ProjectMoved { name, to } => {
                write!(f, "\"{name}\" moved to {}", to.label())
            }
            Notification::ProjectArchived { name } => write!(f, "\"{name}\" archived"),
            Notification::ProjectRestored { name } => write!(f, "\"{name}\" restored"),
            Notification::ProjectDeleted { name } => write!(f, "\"{name}\" deleted"),
            Notification::MoveConfirmed { name, to } => {
                write!(f, "Project \"{name}\" moved to {}", to.label())
            }
            Notification::MoveFailed { message } => f.write_str(message),
            Notification::IllegalMove { from, to } => write!(
                f,
                "Cannot move project from \"{}\" to \"{}\"",
                from.label(),
                to.label()
            ),
        }
    }
}

/// Sink for notifications. Delivery is best effort and never fails a move.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs notifications instead of showing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            warn!(notification = %notification, "Board notification");
        } else {
            info!(notification = %notification, "Board notification");
        }
    }
}

/// Forwards notifications to a channel, for UIs and tests.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("Notification dropped, receiver gone");
        }
    }
}
