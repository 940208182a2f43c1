//! CLI mode
//!
//! Builds the application context and delegates to the command handlers.

use std::sync::Arc;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::StaticConfig;
use crate::interfaces::cli::{CliError, commands, run_cli_command};
use crate::runtime::startup::prepare_startup;

/// Run CLI mode
///
/// `config generate` works without a database; every other command gets a
/// fully wired [`AppContext`](crate::runtime::AppContext).
pub async fn run_cli(cli: Cli, config: Arc<StaticConfig>) -> Result<(), CliError> {
    if let Commands::Config {
        action: ConfigCommands::Generate { output_path, force },
    } = cli.command
    {
        return commands::config_generate(output_path, force).await;
    }

    let context = prepare_startup(&config)
        .await
        .map_err(|e| CliError::StorageError(format!("{:#}", e)))?;
    run_cli_command(&context, cli.as_user, cli.command).await
}
