//! users command - list every user found by the user searches

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let (users, failure) = match ctx.client.search_users(&ctx.settings).await {
        Ok(users) => (users, None),
        Err(failure) => (failure.partial, Some(failure.error)),
    };

    if ctx.is_json() {
        ctx.print_json(&users)?;
    } else {
        for user in &users {
            println!("{}", user);
        }
        if failure.is_none() {
            eprintln!("{} {} users", "Total:".cyan(), users.len());
        }
    }

    match failure {
        Some(error) => Err(anyhow::anyhow!(
            "User enumeration stopped after {} users: {}",
            users.len(),
            error
        )),
        None => Ok(()),
    }
}
