// In-memory kanban board
//
// Every card sits in exactly one column and its `status` always names that
// column. All mutations go through this type so the two can never drift.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::pending::PendingMutations;
use super::status::{ProjectStatus, COLUMN_ORDER};
use super::types::{Placement, ProjectId, WorkItem};
use crate::remote::{ChangeEvent, ChangeOperation};

/// Column contents by status, as ids. Every status is present.
pub type BoardSnapshot = BTreeMap<ProjectStatus, Vec<ProjectId>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowStore {
    columns: [Vec<WorkItem>; 7],
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let mut store = Self::new();
        store.load(items);
        store
    }

    /// Replaces the whole board. Archived items and repeated ids are dropped;
    /// the first occurrence of an id wins.
    pub fn load(&mut self, items: impl IntoIterator<Item = WorkItem>) {
        let mut columns: [Vec<WorkItem>; 7] = Default::default();
        let mut seen = HashSet::new();
        for item in items {
            if item.payload.archived || !seen.insert(item.id.clone()) {
                continue;
            }
            columns[item.status.column_index()].push(item);
        }
        self.columns = columns;
        debug!(items = self.len(), "Board loaded");
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Vec::is_empty)
    }

    pub fn column(&self, status: ProjectStatus) -> &[WorkItem] {
        &self.columns[status.column_index()]
    }

    pub fn locate(&self, id: &ProjectId) -> Option<Placement> {
        COLUMN_ORDER.iter().find_map(|status| {
            self.column(*status)
                .iter()
                .position(|item| &item.id == id)
                .map(|index| Placement {
                    status: *status,
                    index,
                })
        })
    }

    pub fn get(&self, id: &ProjectId) -> Option<&WorkItem> {
        self.locate(id)
            .map(|placement| &self.columns[placement.status.column_index()][placement.index])
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.locate(id).is_some()
    }

    /// Optimistic move: take the card out of its column, append it to `to`
    /// and update its status. Returns where it was, or `None` when the id is
    /// not on the board.
    pub fn move_local(&mut self, id: &ProjectId, to: ProjectStatus) -> Option<Placement> {
        let from = self.locate(id)?;
        let mut item = self.columns[from.status.column_index()].remove(from.index);
        item.status = to;
        self.columns[to.column_index()].push(item);
        Some(from)
    }

    /// Moves the card back to `to` after a failed confirmation.
    pub fn rollback(&mut self, id: &ProjectId, to: ProjectStatus) -> bool {
        self.move_local(id, to).is_some()
    }

    /// Puts the card back at its exact previous position.
    pub fn restore(&mut self, id: &ProjectId, placement: Placement) -> bool {
        let Some(current) = self.locate(id) else {
            return false;
        };
        let mut item = self.columns[current.status.column_index()].remove(current.index);
        item.status = placement.status;
        let column = &mut self.columns[placement.status.column_index()];
        let index = placement.index.min(column.len());
        column.insert(index, item);
        true
    }

    /// Adds a card to the end of its column. Duplicates and archived items
    /// are ignored.
    pub fn insert(&mut self, item: WorkItem) -> bool {
        if item.payload.archived || self.contains(&item.id) {
            return false;
        }
        self.columns[item.status.column_index()].push(item);
        true
    }

    pub fn remove(&mut self, id: &ProjectId) -> Option<WorkItem> {
        let placement = self.locate(id)?;
        Some(self.columns[placement.status.column_index()].remove(placement.index))
    }

    /// Replaces a card that is already on the board with `item`. Same status
    /// keeps its position; a new status moves it to the end of that column;
    /// archived takes it off the board. Unknown ids are left alone.
    pub fn update_existing(&mut self, item: WorkItem) -> bool {
        let Some(placement) = self.locate(&item.id) else {
            return false;
        };
        if item.payload.archived {
            self.columns[placement.status.column_index()].remove(placement.index);
        } else if item.status == placement.status {
            self.columns[placement.status.column_index()][placement.index] = item;
        } else {
            self.columns[placement.status.column_index()].remove(placement.index);
            self.columns[item.status.column_index()].push(item);
        }
        true
    }

    /// Applies a change observed on the record store, whoever made it.
    /// Returns whether the board changed. References to cards that are not on
    /// the board are no-ops, except an update that takes a card out of the
    /// archive, which puts it back.
    pub fn apply_remote_change(&mut self, event: &ChangeEvent) -> bool {
        match event.operation {
            ChangeOperation::Insert => match &event.new_record {
                Some(item) if self.contains(&item.id) => self.update_if_changed(item),
                Some(item) => self.insert(item.clone()),
                None => false,
            },
            ChangeOperation::Update => match &event.new_record {
                Some(item) if !self.contains(&item.id) && event.restores_archived() => {
                    self.insert(item.clone())
                }
                Some(item) => self.update_if_changed(item),
                None => false,
            },
            ChangeOperation::Delete => match event.project_id() {
                Some(id) => self.remove(id).is_some(),
                None => false,
            },
        }
    }

    fn update_if_changed(&mut self, item: &WorkItem) -> bool {
        if self.get(&item.id) == Some(item) {
            return false;
        }
        self.update_existing(item.clone())
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        COLUMN_ORDER
            .iter()
            .map(|status| {
                let ids = self.column(*status).iter().map(|i| i.id.clone()).collect();
                (*status, ids)
            })
            .collect()
    }

    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.columns.iter().flatten()
    }

    /// Checks that every card's status names its column and that no id
    /// appears twice.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for status in COLUMN_ORDER {
            for item in self.column(status) {
                if item.status != status {
                    return Err(format!(
                        "project {} has status {} but sits in column {}",
                        item.id, item.status, status
                    ));
                }
                if !seen.insert(&item.id) {
                    return Err(format!("project {} appears more than once", item.id));
                }
            }
        }
        Ok(())
    }
}

/// Everything a mounted board owns: the cards, the ids whose change echoes
/// should be swallowed and the moves still waiting on the record store.
#[derive(Debug)]
pub struct BoardState {
    pub store: WorkflowStore,
    pub pending: PendingMutations,
    in_flight: HashSet<ProjectId>,
    mounted: bool,
}

impl BoardState {
    pub fn new(pending: PendingMutations) -> Self {
        Self {
            store: WorkflowStore::new(),
            pending,
            in_flight: HashSet::new(),
            mounted: true,
        }
    }

    /// Marks a move on `id` as unsettled. Returns false if one already was.
    pub fn begin_move(&mut self, id: &ProjectId) -> bool {
        self.in_flight.insert(id.clone())
    }

    pub fn finish_move(&mut self, id: &ProjectId) {
        self.in_flight.remove(id);
    }

    pub fn is_in_flight(&self, id: &ProjectId) -> bool {
        self.in_flight.contains(id)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Marks the board as gone. Late results arriving afterwards are dropped.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.store = WorkflowStore::new();
        self.pending.clear_all();
        self.in_flight.clear();
    }
}

pub type SharedBoard = Arc<Mutex<BoardState>>;
