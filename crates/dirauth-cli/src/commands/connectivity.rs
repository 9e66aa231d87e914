//! test command - connect and bind to the directory

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct ConnectivityResult<'a> {
    status: &'static str,
    servers: &'a [String],
    anonymous: bool,
}

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    ctx.client
        .test_connectivity(&ctx.settings)
        .await
        .with_context(|| {
            format!(
                "Connectivity test against {} failed",
                ctx.settings.urls.join(", ")
            )
        })?;

    if ctx.is_json() {
        ctx.print_json(&ConnectivityResult {
            status: "ok",
            servers: &ctx.settings.urls,
            anonymous: ctx.settings.anonymous_mode,
        })?;
    } else {
        let bind = if ctx.settings.anonymous_mode {
            "anonymous".to_string()
        } else {
            ctx.settings.reader_dn.clone()
        };
        println!("{} bound as {}", "OK".green().bold(), bind.cyan());
    }

    Ok(())
}
