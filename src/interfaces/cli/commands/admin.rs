//! Operator and maintenance commands

use colored::Colorize;

use crate::access::Requester;
use crate::interfaces::cli::CliError;
use crate::runtime::AppContext;
use crate::utils::format_file_size;

pub async fn broadcast(
    context: &AppContext,
    requester: Requester,
    text: String,
) -> Result<(), CliError> {
    let report = context.broadcast_service.broadcast(&text, &requester).await?;

    println!(
        "{} Broadcast sent to {}/{} users",
        "✓".bold().green(),
        report.sent.to_string().green(),
        report.total
    );
    if report.failed > 0 {
        println!(
            "{} {} deliveries failed",
            "⚠".bold().yellow(),
            report.failed.to_string().red()
        );
    }
    Ok(())
}

pub async fn block_owner(
    context: &AppContext,
    requester: Requester,
    owner_id: i64,
    blocked: bool,
) -> Result<(), CliError> {
    if !requester.is_operator {
        return Err(CliError::CommandError(format!(
            "user {} is not an operator",
            requester.id
        )));
    }

    context.storage.set_blocked(owner_id, blocked).await?;
    let action = if blocked { "Blocked" } else { "Unblocked" };
    println!(
        "{} {} user {}",
        "✓".bold().green(),
        action,
        owner_id.to_string().cyan()
    );
    Ok(())
}

pub async fn show_stats(context: &AppContext, json: bool) -> Result<(), CliError> {
    let stats = context.storage.stats().await?;

    if json {
        let json_str = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::CommandError(format!("Failed to serialize to JSON: {}", e)))?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("{}", "Statistics:".bold().green());
    println!("  users:   {}", stats.owners.to_string().cyan());
    println!("  links:   {}", stats.links.to_string().cyan());
    println!("  clicks:  {}", stats.clicks.to_string().cyan());
    println!("  files:   {}", stats.files.to_string().cyan());
    println!("  stored:  {}", format_file_size(stats.stored_bytes).cyan());
    Ok(())
}

pub async fn cleanup_temp(context: &AppContext) -> Result<(), CliError> {
    let removed = context.transfer_engine.cleanup_stale_files().await?;
    if removed == 0 {
        println!("{} No stale temp files", "ℹ".bold().blue());
    } else {
        println!(
            "{} Removed {} stale temp files",
            "✓".bold().green(),
            removed.to_string().green()
        );
    }
    Ok(())
}
