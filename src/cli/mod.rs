use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "anclora-kanban")]
#[command(about = "Kanban workflow engine for Anclora project boards")]
#[command(long_about = "Inspect the project status workflow, check individual moves and replay \
                       drag-and-drop sessions against an in-memory record store. Start with \
                       'anclora-kanban transitions' to see which moves are allowed.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the status transition table
    Transitions {
        /// Emit JSON instead of a table
        #[arg(long, help = "Print the table as a JSON object keyed by status")]
        json: bool,
    },
    /// Check whether a single move is allowed
    Check {
        /// Current status (e.g. backlog)
        from: String,
        /// Target status (e.g. proposal)
        to: String,
    },
    /// Show a board built from a JSON file of project records
    Board {
        /// JSON array of project records
        #[arg(long, help = "Path to a JSON array of project records")]
        file: PathBuf,
    },
    /// Replay moves against an in-memory record store and show the result
    Simulate {
        /// JSON array of project records seeding the store
        #[arg(long, help = "Path to a JSON array of project records")]
        file: PathBuf,
        /// Moves to apply in order, as id=status
        #[arg(long = "move", value_name = "ID=STATUS", help = "Move to request, e.g. p1=proposal (repeatable)")]
        moves: Vec<String>,
        /// Make the next write fail as if the network dropped
        #[arg(long, value_name = "REASON", help = "Fail the first remote write with this message")]
        fail_next: Option<String>,
    },
}
