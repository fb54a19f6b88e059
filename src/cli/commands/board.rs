use anyhow::Result;
use std::path::PathBuf;

use super::{read_items, render_board, Command};
use crate::workflow::WorkflowStore;

pub struct BoardCommand {
    pub file: PathBuf,
}

impl BoardCommand {
    pub fn new(file: PathBuf) -> Self {
        Self { file }
    }
}

impl Command for BoardCommand {
    async fn execute(&self) -> Result<()> {
        let items = read_items(&self.file)?;
        let store = WorkflowStore::from_items(items);
        print!("{}", render_board(&store));
        Ok(())
    }
}
