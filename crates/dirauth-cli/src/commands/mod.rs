//! CLI command implementations

pub mod auth;
pub mod connectivity;
pub mod groups;
pub mod users;

use crate::OutputFormat;
use anyhow::Result;
use dirauth_core::DirectorySettings;
use dirauth_ldap::DirectoryClient;
use serde::Serialize;

/// Context passed to all commands
pub struct CommandContext {
    pub settings: DirectorySettings,
    pub client: DirectoryClient,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
