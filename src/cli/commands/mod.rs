use anyhow::{Context, Result};
use std::path::Path;

use crate::workflow::{WorkItem, WorkflowStore, COLUMN_ORDER};

pub mod board;
pub mod check;
pub mod simulate;
pub mod transitions;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Reads a JSON array of project records.
pub fn read_items(path: &Path) -> Result<Vec<WorkItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid project records in {}", path.display()))
}

/// Column-by-column rendering of a board.
pub fn render_board(store: &WorkflowStore) -> String {
    let mut out = String::new();
    for status in COLUMN_ORDER {
        let column = store.column(status);
        out.push_str(&format!("{} ({})\n", status.label(), column.len()));
        for item in column {
            out.push_str(&format!(
                "  - {}  {} [{}]\n",
                item.id,
                item.name(),
                item.payload.priority
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{ProjectPriority, ProjectStatus};

    #[test]
    fn test_render_board_lists_every_column() {
        let store = WorkflowStore::from_items(vec![WorkItem::new(
            "p1",
            "Website",
            ProjectStatus::InProgress,
        )
        .with_priority(ProjectPriority::High)]);

        let text = render_board(&store);
        assert!(text.contains("Backlog (0)"));
        assert!(text.contains("In Progress (1)"));
        assert!(text.contains("  - p1  Website [high]"));
        assert_eq!(text.lines().filter(|l| l.contains('(')).count(), 7);
    }

    #[test]
    fn test_read_items_reports_path() {
        let err = read_items(Path::new("/definitely/missing.json")).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
