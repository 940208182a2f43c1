//! File relay commands

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;

use super::owners::target_owner;
use crate::access::Requester;
use crate::interfaces::cli::CliError;
use crate::runtime::AppContext;
use crate::services::{ProgressEvent, ProgressObserver};
use crate::transport::ChatId;
use crate::utils::format_file_size;

fn progress_printer() -> Arc<dyn ProgressObserver> {
    Arc::new(|event: &ProgressEvent| {
        println!("  {} {}", "↻".blue(), event.summary().dimmed());
    })
}

pub async fn ingest_file(
    context: &AppContext,
    requester: Requester,
    path: PathBuf,
) -> Result<(), CliError> {
    // 模拟用户把文件发到自己的会话里
    let media = context
        .transport
        .post_media(ChatId(requester.id), &path)
        .await
        .map_err(|e| CliError::CommandError(format!("Failed to post {}: {}", path.display(), e)))?;

    let completed = context
        .transfer_engine
        .ingest(requester.id, &media, progress_printer())
        .await?;
    let record = &completed.record;

    println!(
        "{} Stored {} ({}, {})",
        "✓".bold().green(),
        record.name.cyan(),
        format_file_size(record.size_bytes),
        record.media_type
    );
    println!("  ref:    {}", record.file_ref.yellow());
    println!("  local:  {}", completed.local_path.display());
    match record.mirror {
        Some(mirror) => println!("  mirror: {}", mirror),
        None => println!("  mirror: {}", "none".dimmed()),
    }
    Ok(())
}

pub async fn upload_file(
    context: &AppContext,
    path: PathBuf,
    to: i64,
    caption: Option<String>,
) -> Result<(), CliError> {
    let message = context
        .transfer_engine
        .upload(ChatId(to), &path, caption.as_deref(), progress_printer())
        .await?;
    println!(
        "{} Sent {} as message {}",
        "✓".bold().green(),
        path.display().to_string().cyan(),
        message.to_string().yellow()
    );
    Ok(())
}

pub async fn list_files(
    context: &AppContext,
    requester: Requester,
    owner: Option<i64>,
    limit: u64,
) -> Result<(), CliError> {
    let owner_id = target_owner(requester, owner)?;
    let files = context
        .file_service
        .list_by_owner(owner_id, limit)
        .await
        .map_err(|e| CliError::CommandError(format!("Failed to load files: {}", e)))?;

    if files.is_empty() {
        println!("{} No files found", "ℹ".bold().blue());
        return Ok(());
    }

    println!("{}", "File list:".bold().green());
    println!();
    for file in &files {
        let mut info_parts = vec![
            file.file_ref.yellow().to_string(),
            file.name.cyan().to_string(),
            format!("({}, {})", format_file_size(file.size_bytes), file.media_type),
        ];
        if file.download_count > 0 {
            info_parts.push(
                format!("(downloads: {})", file.download_count)
                    .dimmed()
                    .cyan()
                    .to_string(),
            );
        }
        if file.mirror.is_some() {
            info_parts.push("⧉".to_string());
        }
        println!("  {}", info_parts.join(" "));
    }
    println!();
    println!(
        "{} Showing {} files",
        "ℹ".bold().blue(),
        files.len().to_string().green()
    );
    Ok(())
}

pub async fn forward_file(
    context: &AppContext,
    requester: Requester,
    file_ref: String,
    to: i64,
) -> Result<(), CliError> {
    let message = context
        .file_service
        .forward(&file_ref, ChatId(to), &requester)
        .await?;
    println!(
        "{} Forwarded {} to {}",
        "✓".bold().green(),
        file_ref.cyan(),
        message.to_string().yellow()
    );
    Ok(())
}

pub async fn deliver_file(
    context: &AppContext,
    requester: Requester,
    file_ref: String,
) -> Result<(), CliError> {
    let message = context.file_service.deliver(&file_ref, &requester).await?;
    println!(
        "{} Delivered {} as {}",
        "✓".bold().green(),
        file_ref.cyan(),
        message.to_string().yellow()
    );
    Ok(())
}

pub async fn delete_file(
    context: &AppContext,
    requester: Requester,
    file_ref: String,
) -> Result<(), CliError> {
    let record = context.file_service.delete(&file_ref, &requester).await?;
    println!(
        "{} Deleted file: {} ({})",
        "✓".bold().green(),
        file_ref.cyan(),
        record.name
    );
    Ok(())
}
