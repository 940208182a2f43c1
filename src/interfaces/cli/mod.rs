//! CLI interface module
//!
//! Command handlers print with `colored`; failures surface as [`CliError`].

pub mod commands;

use std::fmt;

use crate::access::Requester;
use crate::cli::Commands;
use crate::errors::{ErrorKind, LinkRelayError};
use crate::runtime::AppContext;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<LinkRelayError> for CliError {
    fn from(err: LinkRelayError) -> Self {
        match err.kind() {
            ErrorKind::Persistence => CliError::StorageError(err.to_string()),
            _ => CliError::CommandError(err.to_string()),
        }
    }
}

/// `--as` is mandatory for everything that acts on someone's records
pub(crate) fn acting_requester(
    context: &AppContext,
    as_user: Option<i64>,
) -> Result<Requester, CliError> {
    as_user
        .map(|id| context.requester(id))
        .ok_or_else(|| CliError::ParseError("this command needs --as <USER_ID>".to_string()))
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(
    context: &AppContext,
    as_user: Option<i64>,
    cmd: Commands,
) -> Result<(), CliError> {
    // resolve / stats / cleanup 不需要身份
    match cmd {
        Commands::Resolve { code } => return commands::resolve_link(context, code).await,
        Commands::Stats { json } => return commands::show_stats(context, json).await,
        Commands::Cleanup => return commands::cleanup_temp(context).await,
        Commands::Config { .. } => {
            return Err(CliError::CommandError(
                "config commands are handled before startup".to_string(),
            ));
        }
        _ => {}
    }

    let requester = acting_requester(context, as_user)?;

    match cmd {
        Commands::Register { name, handle } => {
            commands::register_owner(context, requester, name, handle).await
        }
        Commands::Owner { owner_id } => commands::show_owner(context, requester, owner_id).await,
        Commands::Shorten { input, text } => {
            if text {
                commands::shorten_text(context, requester, input).await
            } else {
                commands::shorten_link(context, requester, input).await
            }
        }
        Commands::Links { owner, limit } => {
            commands::list_links(context, requester, owner, limit).await
        }
        Commands::DeleteLink { code } => commands::delete_link(context, requester, code).await,
        Commands::Ingest { path } => commands::ingest_file(context, requester, path).await,
        Commands::Upload { path, to, caption } => {
            commands::upload_file(context, path, to, caption).await
        }
        Commands::Files { owner, limit } => {
            commands::list_files(context, requester, owner, limit).await
        }
        Commands::Forward { file_ref, to } => {
            commands::forward_file(context, requester, file_ref, to).await
        }
        Commands::Deliver { file_ref } => commands::deliver_file(context, requester, file_ref).await,
        Commands::DeleteFile { file_ref } => {
            commands::delete_file(context, requester, file_ref).await
        }
        Commands::Broadcast { text } => commands::broadcast(context, requester, text).await,
        Commands::Block { owner_id, unblock } => {
            commands::block_owner(context, requester, owner_id, !unblock).await
        }
        Commands::Resolve { .. } | Commands::Stats { .. } | Commands::Cleanup | Commands::Config { .. } => {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_groups_by_kind() {
        let err: CliError = LinkRelayError::database_operation("disk full").into();
        assert!(matches!(err, CliError::StorageError(_)));

        let err: CliError = LinkRelayError::permission_denied("not yours").into();
        assert!(matches!(err, CliError::CommandError(ref m) if m.contains("not yours")));
    }

    #[test]
    fn test_format_simple() {
        let err = CliError::ParseError("bad id".to_string());
        assert_eq!(err.format_simple(), "Parse error: bad id");
        assert_eq!(err.to_string(), err.format_simple());
    }
}
