// Change notifications published by the record store

use serde::{Deserialize, Serialize};

use crate::workflow::{ProjectId, WorkItem};

pub const DEFAULT_SCHEMA: &str = "anclora";
pub const DEFAULT_TABLE: &str = "projects";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

/// One row-level change on the projects table.
///
/// `old_record` is only guaranteed for deletes; updates may or may not carry
/// the previous row depending on how the table replicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    pub operation: ChangeOperation,
    #[serde(default)]
    pub old_record: Option<WorkItem>,
    #[serde(default)]
    pub new_record: Option<WorkItem>,
}

impl ChangeEvent {
    pub fn insert(item: WorkItem) -> Self {
        Self::scoped(ChangeOperation::Insert, None, Some(item))
    }

    pub fn update(old: Option<WorkItem>, new: WorkItem) -> Self {
        Self::scoped(ChangeOperation::Update, old, Some(new))
    }

    pub fn delete(old: WorkItem) -> Self {
        Self::scoped(ChangeOperation::Delete, Some(old), None)
    }

    fn scoped(
        operation: ChangeOperation,
        old_record: Option<WorkItem>,
        new_record: Option<WorkItem>,
    ) -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
            operation,
            old_record,
            new_record,
        }
    }

    /// Re-targets the event at another schema/table.
    pub fn in_scope(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema = schema.into();
        self.table = table.into();
        self
    }

    pub fn matches_scope(&self, schema: &str, table: &str) -> bool {
        self.schema == schema && self.table == table
    }

    /// Id of the affected row, taken from whichever record is present.
    pub fn project_id(&self) -> Option<&ProjectId> {
        self.new_record
            .as_ref()
            .or(self.old_record.as_ref())
            .map(|item| &item.id)
    }

    /// An update taking a row out of the archive. Only recognisable when the
    /// previous row came along with the event.
    pub fn restores_archived(&self) -> bool {
        self.operation == ChangeOperation::Update
            && self.old_record.as_ref().is_some_and(|old| old.payload.archived)
            && self.new_record.as_ref().is_some_and(|new| !new.payload.archived)
    }
}
