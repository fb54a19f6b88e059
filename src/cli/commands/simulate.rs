use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::{read_items, render_board, Command};
use crate::config::AncloraConfig;
use crate::remote::{MemoryRecordStore, RemoteError, RemoteStore};
use crate::workflow::{ChannelNotifier, KanbanSession, MoveOutcome, ProjectId, ProjectStatus};

pub struct SimulateCommand {
    pub file: PathBuf,
    pub moves: Vec<String>,
    pub fail_next: Option<String>,
    pub config: AncloraConfig,
}

impl SimulateCommand {
    pub fn new(file: PathBuf, moves: Vec<String>, config: AncloraConfig) -> Self {
        Self {
            file,
            moves,
            fail_next: None,
            config,
        }
    }

    pub fn with_fail_next(mut self, reason: Option<String>) -> Self {
        self.fail_next = reason;
        self
    }
}

/// Parses `id=status`.
pub fn parse_move(raw: &str) -> Result<(ProjectId, ProjectStatus)> {
    let (id, status) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid move '{raw}', expected ID=STATUS"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(anyhow!("Invalid move '{raw}', missing project id"));
    }
    Ok((ProjectId::from(id), status.trim().parse()?))
}

impl Command for SimulateCommand {
    async fn execute(&self) -> Result<()> {
        let moves = self
            .moves
            .iter()
            .map(String::as_str)
            .map(parse_move)
            .collect::<Result<Vec<_>>>()?;

        let remote = Arc::new(MemoryRecordStore::with_capacity(self.config.realtime.event_buffer));
        for item in read_items(&self.file)? {
            remote.create_project(&item).await?;
        }
        if let Some(reason) = &self.fail_next {
            remote
                .fail_next_write(RemoteError::Unreachable(reason.clone()))
                .await;
        }

        let (notifier, mut notifications) = ChannelNotifier::new();
        let mut session = KanbanSession::mount(remote.clone(), &self.config, Arc::new(notifier)).await?;

        for (id, to) in moves {
            match session.request_move(&id, to).await {
                Ok(MoveOutcome::Confirmed { from, .. }) => {
                    println!("ok       {id}: {from} -> {to}");
                }
                Ok(MoveOutcome::Unchanged) => println!("same     {id}: already {to}"),
                Ok(MoveOutcome::Stale) => println!("missing  {id}"),
                Ok(MoveOutcome::Detached) => println!("detached {id}"),
                Err(err) => println!("failed   {id}: {err}"),
            }
            session.pump().await?;
            while let Ok(notification) = notifications.try_recv() {
                println!("         > {notification}");
            }
        }

        println!();
        let board = session.board();
        let rendered = render_board(&board.lock().await.store);
        print!("{rendered}");

        session
            .check_invariants()
            .await
            .map_err(|violation| anyhow!("Board invariant violated: {violation}"))?;
        session.unmount().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move() {
        let (id, status) = parse_move("p1=in_progress").unwrap();
        assert_eq!(id, ProjectId::from("p1"));
        assert_eq!(status, ProjectStatus::InProgress);

        assert!(parse_move("p1").is_err());
        assert!(parse_move("=testing").is_err());
        assert!(parse_move("p1=paused").is_err());
    }
}
