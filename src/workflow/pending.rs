// Ids this session has just written, so their change echoes can be skipped
//
// Entries expire on their own. An echo that never arrives must not leave an
// id muted forever, or later changes from other sessions would be dropped.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::status::ProjectStatus;
use super::types::ProjectId;

pub const DEFAULT_PENDING_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    deadline: Instant,
    /// Status the write put on the record, when it was a move.
    expected: Option<ProjectStatus>,
}

/// How an incoming update relates to what this session wrote last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoMatch {
    /// Nothing live is pending for the id.
    NotPending,
    /// The echo of the latest write. The entry is consumed.
    Current,
    /// Carries a status other than the one we wrote last, so an older write
    /// of ours already overtaken locally. The entry stays for the real echo.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct PendingMutations {
    ttl: Duration,
    entries: HashMap<ProjectId, PendingWrite>,
}

impl Default for PendingMutations {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TTL)
    }
}

impl PendingMutations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Marks `id` as pending for one TTL from now. Any echo for it matches.
    /// Re-registering restarts the TTL.
    pub fn register(&mut self, id: ProjectId) {
        self.insert(id, None);
    }

    /// Like `register`, for a move that leaves the record in `status`.
    pub fn register_move(&mut self, id: ProjectId, status: ProjectStatus) {
        self.insert(id, Some(status));
    }

    fn insert(&mut self, id: ProjectId, expected: Option<ProjectStatus>) {
        let deadline = Instant::now() + self.ttl;
        debug!(
            project_id = %id,
            expected = ?expected,
            ttl_ms = self.ttl.as_millis() as u64,
            "Pending mutation registered"
        );
        self.entries.insert(id, PendingWrite { deadline, expected });
    }

    pub fn is_pending(&self, id: &ProjectId) -> bool {
        self.entries
            .get(id)
            .is_some_and(|write| write.deadline > Instant::now())
    }

    /// Consumes the entry for `id`. Returns true only when it had not expired.
    pub fn take(&mut self, id: &ProjectId) -> bool {
        match self.entries.remove(id) {
            Some(write) => write.deadline > Instant::now(),
            None => false,
        }
    }

    /// Classifies an update for `id` that left the record in `status`.
    pub fn match_echo(&mut self, id: &ProjectId, status: ProjectStatus) -> EchoMatch {
        let Some(write) = self.entries.get(id).copied() else {
            return EchoMatch::NotPending;
        };
        if write.deadline <= Instant::now() {
            self.entries.remove(id);
            return EchoMatch::NotPending;
        }
        match write.expected {
            Some(expected) if expected != status => EchoMatch::Superseded,
            _ => {
                self.entries.remove(id);
                EchoMatch::Current
            }
        }
    }

    pub fn clear(&mut self, id: &ProjectId) {
        self.entries.remove(id);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Drops expired entries and returns how many went.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, write| write.deadline > now);
        before - self.entries.len()
    }

    /// Live entries only.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.values().filter(|w| w.deadline > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(id: &str) -> ProjectId {
        ProjectId::from(id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let mut pending = PendingMutations::new(Duration::from_millis(5000));
        pending.register(id("p1"));
        assert!(pending.is_pending(&id("p1")));

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert!(pending.is_pending(&id("p1")));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(!pending.is_pending(&id("p1")));
        assert!(!pending.take(&id("p1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_consumes_entry() {
        let mut pending = PendingMutations::default();
        pending.register(id("p1"));

        assert!(pending.take(&id("p1")));
        assert!(!pending.take(&id("p1")));
        assert!(pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reregister_restarts_ttl() {
        let mut pending = PendingMutations::new(Duration::from_secs(5));
        pending.register(id("p1"));
        tokio::time::advance(Duration::from_secs(4)).await;
        pending.register(id("p1"));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(pending.is_pending(&id("p1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let mut pending = PendingMutations::new(Duration::from_secs(1));
        pending.register(id("old"));
        tokio::time::advance(Duration::from_secs(2)).await;
        pending.register(id("fresh"));

        assert_eq!(pending.purge_expired(), 1);
        assert_eq!(pending.len(), 1);
        assert!(pending.is_pending(&id("fresh")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_move_echo_is_superseded() {
        let mut pending = PendingMutations::default();
        pending.register_move(id("p1"), ProjectStatus::Proposal);
        pending.register_move(id("p1"), ProjectStatus::Approved);

        assert_eq!(
            pending.match_echo(&id("p1"), ProjectStatus::Proposal),
            EchoMatch::Superseded
        );
        assert!(pending.is_pending(&id("p1")));
        assert_eq!(
            pending.match_echo(&id("p1"), ProjectStatus::Approved),
            EchoMatch::Current
        );
        assert_eq!(
            pending.match_echo(&id("p1"), ProjectStatus::Approved),
            EchoMatch::NotPending
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_entry_matches_any_status() {
        let mut pending = PendingMutations::default();
        pending.register(id("p1"));
        assert_eq!(
            pending.match_echo(&id("p1"), ProjectStatus::Cancelled),
            EchoMatch::Current
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_move_entry_does_not_match() {
        let mut pending = PendingMutations::new(Duration::from_secs(1));
        pending.register_move(id("p1"), ProjectStatus::Testing);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            pending.match_echo(&id("p1"), ProjectStatus::InProgress),
            EchoMatch::NotPending
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut pending = PendingMutations::default();
        pending.register(id("p1"));
        pending.clear(&id("p1"));
        pending.clear(&id("p1"));
        assert!(!pending.is_pending(&id("p1")));
    }
}
