//! Short link commands

use colored::Colorize;

use super::owners::target_owner;
use crate::access::Requester;
use crate::interfaces::cli::CliError;
use crate::runtime::AppContext;
use crate::services::ShortenResult;

fn print_shortened(result: &ShortenResult) {
    println!(
        "{} {} -> {}",
        "✓".bold().green(),
        result.short_url.cyan(),
        result.link.original_url.blue().underline()
    );
}

pub async fn shorten_link(
    context: &AppContext,
    requester: Requester,
    url: String,
) -> Result<(), CliError> {
    let result = context.link_service.shorten(requester.id, &url).await?;
    print_shortened(&result);
    Ok(())
}

pub async fn shorten_text(
    context: &AppContext,
    requester: Requester,
    text: String,
) -> Result<(), CliError> {
    let results = context.link_service.shorten_text(requester.id, &text).await?;
    if results.is_empty() {
        println!("{} No URLs found in the text", "ℹ".bold().blue());
        return Ok(());
    }
    for result in &results {
        print_shortened(result);
    }
    Ok(())
}

pub async fn resolve_link(context: &AppContext, code: String) -> Result<(), CliError> {
    let link = context.link_service.resolve(&code).await?;
    println!(
        "{} -> {} {}",
        link.code.cyan(),
        link.original_url.blue().underline(),
        format!("(clicks: {})", link.click_count).dimmed().cyan()
    );
    Ok(())
}

pub async fn list_links(
    context: &AppContext,
    requester: Requester,
    owner: Option<i64>,
    limit: u64,
) -> Result<(), CliError> {
    let owner_id = target_owner(requester, owner)?;
    let links = context
        .link_service
        .list_by_owner(owner_id, limit)
        .await
        .map_err(|e| CliError::CommandError(format!("Failed to load links: {}", e)))?;

    if links.is_empty() {
        println!("{} No short links found", "ℹ".bold().blue());
        return Ok(());
    }

    println!("{}", "Short link list:".bold().green());
    println!();
    for link in &links {
        let mut info_parts = vec![format!(
            "{} -> {}",
            link.code.cyan(),
            link.original_url.blue().underline()
        )];
        if link.click_count > 0 {
            info_parts.push(
                format!("(clicks: {})", link.click_count)
                    .dimmed()
                    .cyan()
                    .to_string(),
            );
        }
        info_parts.push(
            link.created_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed()
                .to_string(),
        );
        println!("  {}", info_parts.join(" "));
    }
    println!();
    println!(
        "{} Showing {} short links",
        "ℹ".bold().blue(),
        links.len().to_string().green()
    );
    Ok(())
}

pub async fn delete_link(
    context: &AppContext,
    requester: Requester,
    code: String,
) -> Result<(), CliError> {
    context.link_service.delete(&code, &requester).await?;
    println!("{} Deleted short link: {}", "✓".bold().green(), code.cyan());
    Ok(())
}
