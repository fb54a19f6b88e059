use anyhow::Result;
use std::collections::BTreeMap;

use super::Command;
use crate::workflow::{allowed_next_states, is_terminal_status, ProjectStatus, COLUMN_ORDER};

pub struct TransitionsCommand {
    pub json: bool,
}

impl TransitionsCommand {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl Command for TransitionsCommand {
    async fn execute(&self) -> Result<()> {
        if self.json {
            let table: BTreeMap<&str, Vec<&str>> = COLUMN_ORDER
                .iter()
                .map(|status| {
                    let next = allowed_next_states(*status)
                        .iter()
                        .map(ProjectStatus::as_str)
                        .collect();
                    (status.as_str(), next)
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&table)?);
            return Ok(());
        }

        for status in COLUMN_ORDER {
            let next: Vec<&str> = allowed_next_states(status)
                .iter()
                .map(ProjectStatus::as_str)
                .collect();
            if is_terminal_status(status) {
                println!("{:<12} -> (terminal)", status.as_str());
            } else {
                println!("{:<12} -> {}", status.as_str(), next.join(", "));
            }
        }
        Ok(())
    }
}
