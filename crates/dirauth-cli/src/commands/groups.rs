//! user-groups and groups commands

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;

/// Groups of one user
pub async fn user_groups(ctx: &CommandContext, username: &str) -> Result<()> {
    let groups = ctx
        .client
        .get_user_groups(username, &ctx.settings)
        .await
        .with_context(|| format!("Group lookup for {} failed", username))?;

    if ctx.is_json() {
        ctx.print_json(&groups)?;
    } else if groups.is_empty() {
        eprintln!("{} belongs to no groups", username.cyan());
    } else {
        for group in &groups {
            println!("{}", group);
        }
    }

    Ok(())
}

/// Every (member, group) pair
pub async fn memberships(ctx: &CommandContext) -> Result<()> {
    let (memberships, failure) = match ctx.client.search_groups(&ctx.settings).await {
        Ok(memberships) => (memberships, None),
        Err(failure) => (failure.partial, Some(failure.error)),
    };

    if ctx.is_json() {
        ctx.print_json(&memberships)?;
    } else {
        for membership in &memberships {
            println!("{}\t{}", membership.group.bold(), membership.name);
        }
    }

    match failure {
        Some(error) => Err(anyhow::anyhow!(
            "Group enumeration stopped after {} memberships: {}",
            memberships.len(),
            error
        )),
        None => Ok(()),
    }
}
