use anyhow::Result;

use super::Command;
use crate::workflow::{guard_transition, ProjectStatus};

pub struct CheckCommand {
    pub from: String,
    pub to: String,
}

impl CheckCommand {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Command for CheckCommand {
    async fn execute(&self) -> Result<()> {
        let from: ProjectStatus = self.from.parse()?;
        let to: ProjectStatus = self.to.parse()?;
        guard_transition(from, to)?;
        println!("allowed: {} -> {}", from, to);
        Ok(())
    }
}
