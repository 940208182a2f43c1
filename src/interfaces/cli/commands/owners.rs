//! Owner profile commands

use colored::Colorize;

use crate::access::Requester;
use crate::interfaces::cli::CliError;
use crate::runtime::AppContext;
use crate::storage::OwnerProfile;

/// Whose records a listing command looks at; other users need an operator
pub(super) fn target_owner(requester: Requester, owner: Option<i64>) -> Result<i64, CliError> {
    let owner_id = owner.unwrap_or(requester.id);
    if !requester.may_manage(owner_id) {
        return Err(CliError::CommandError(format!(
            "user {} may not look at records of user {}",
            requester.id, owner_id
        )));
    }
    Ok(owner_id)
}

pub async fn register_owner(
    context: &AppContext,
    requester: Requester,
    name: Option<String>,
    handle: Option<String>,
) -> Result<(), CliError> {
    let profile = OwnerProfile {
        display_name: name,
        handle,
        ..OwnerProfile::new(requester.id)
    };
    let owner = context.storage.register_owner(&profile).await?;

    println!(
        "{} Registered user {} {}",
        "✓".bold().green(),
        owner.id.to_string().cyan(),
        owner.display_name.as_deref().unwrap_or("").dimmed()
    );
    Ok(())
}

pub async fn show_owner(
    context: &AppContext,
    requester: Requester,
    owner_id: Option<i64>,
) -> Result<(), CliError> {
    let owner_id = target_owner(requester, owner_id)?;
    let owner = context
        .storage
        .get_owner(owner_id)
        .await?
        .ok_or_else(|| CliError::CommandError(format!("User does not exist: {}", owner_id)))?;
    let link_stats = context.link_service.owner_stats(owner_id).await?;

    println!("{} {}", "User".bold().green(), owner.id.to_string().cyan());
    if let Some(name) = &owner.display_name {
        println!("  name:    {}", name);
    }
    if let Some(handle) = &owner.handle {
        println!("  handle:  @{}", handle);
    }
    println!(
        "  joined:  {}",
        owner.joined_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if owner.is_blocked {
        println!("  {}", "blocked".red().bold());
    }
    if context.access.is_operator(owner.id) {
        println!("  {}", "operator".yellow());
    }
    println!(
        "  links:   {} ({} clicks)",
        owner.links_count.to_string().green(),
        link_stats.clicks
    );
    println!("  files:   {}", owner.files_count.to_string().green());
    Ok(())
}
