//! auth command - check a user's password

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct AuthResult<'a> {
    username: &'a str,
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

pub async fn execute(ctx: &CommandContext, username: &str, password: &str) -> Result<()> {
    let result = ctx
        .client
        .authenticate(username, password, &ctx.settings)
        .await;

    if ctx.is_json() {
        ctx.print_json(&AuthResult {
            username,
            authenticated: result.is_ok(),
            error: result.as_ref().err().map(|e| e.code()),
        })?;
    } else if result.is_ok() {
        println!("{} {} authenticated", "OK".green().bold(), username);
    }

    result.map_err(|e| anyhow::anyhow!("Authentication of {} failed: {}", username, e))
}
