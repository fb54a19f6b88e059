use anyhow::Result;
use clap::Parser;

use anclora_workflow::cli::commands::board::BoardCommand;
use anclora_workflow::cli::commands::check::CheckCommand;
use anclora_workflow::cli::commands::simulate::SimulateCommand;
use anclora_workflow::cli::commands::transitions::TransitionsCommand;
use anclora_workflow::cli::commands::Command;
use anclora_workflow::cli::{Cli, Commands};
use anclora_workflow::config::{config, init_config, AncloraConfig};
use anclora_workflow::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config: AncloraConfig = config()?.clone();
    init_telemetry(&config.observability)?;
    init_config()?;

    match cli.command {
        Commands::Transitions { json } => tokio::runtime::Runtime::new()?
            .block_on(async { TransitionsCommand::new(json).execute().await }),
        Commands::Check { from, to } => tokio::runtime::Runtime::new()?
            .block_on(async { CheckCommand::new(from, to).execute().await }),
        Commands::Board { file } => tokio::runtime::Runtime::new()?
            .block_on(async { BoardCommand::new(file).execute().await }),
        Commands::Simulate {
            file,
            moves,
            fail_next,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            SimulateCommand::new(file, moves, config)
                .with_fail_next(fail_next)
                .execute()
                .await
        }),
    }
}
