use anyhow::Result;
use clap::Parser;

use supply_chain_ledger::cli::commands::{
    serial_command, show_how_to_get_started, CheckCommand, SimulateCommand, StatesCommand,
};
use supply_chain_ledger::cli::{Cli, Commands};
use supply_chain_ledger::{config, init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config()?;
    init_telemetry(&config.observability)?;

    let result = match cli.command {
        None => tokio::runtime::Runtime::new()?.block_on(show_how_to_get_started()),
        Some(Commands::States) => StatesCommand.execute(),
        Some(Commands::Check { state, permissions }) => {
            CheckCommand::new(state, &permissions).execute()
        }
        Some(Commands::Simulate {
            id,
            permissions,
            user,
        }) => tokio::runtime::Runtime::new()?
            .block_on(async { SimulateCommand::new(id, user, &permissions).execute(config).await }),
        Some(Commands::Serial) => serial_command(),
    };

    shutdown_telemetry();
    result
}
