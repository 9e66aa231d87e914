//! Dirauth - LDAP/Active Directory authentication client
//!
//! Runs directory operations (connectivity test, password check, group lookup,
//! user and group enumeration) against a configured directory.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use dirauth_core::{DirauthConfig, LoggingConfig};
use dirauth_ldap::DirectoryClient;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "dirauth")]
#[command(author = "Dirauth Team")]
#[command(version = dirauth_core::VERSION)]
#[command(about = "LDAP/Active Directory authentication client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (settings are read from DIRAUTH_* variables otherwise)
    #[arg(short, long, global = true, env = "DIRAUTH_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DIRAUTH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect and bind without searching
    Test,

    /// Check a user's password
    Auth {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long, env = "DIRAUTH_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List the groups a user belongs to
    UserGroups {
        /// Login name
        #[arg(short, long)]
        username: String,
    },

    /// List all users
    Users,

    /// List all group memberships
    Groups,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging, cli.log_level.as_deref());
    debug!("Using directory servers: {:?}", config.ldap.urls);

    let ctx = CommandContext {
        settings: config.ldap,
        client: DirectoryClient::new(),
        output_format: cli.output,
    };

    match cli.command {
        Commands::Test => commands::connectivity::execute(&ctx).await,
        Commands::Auth { username, password } => {
            commands::auth::execute(&ctx, &username, &password).await
        }
        Commands::UserGroups { username } => {
            commands::groups::user_groups(&ctx, &username).await
        }
        Commands::Users => commands::users::execute(&ctx).await,
        Commands::Groups => commands::groups::memberships(&ctx).await,
    }
}

fn load_config(path: Option<&str>) -> Result<DirauthConfig> {
    match path {
        Some(path) => DirauthConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => Ok(DirauthConfig::from_env()),
    }
}

/// `RUST_LOG` wins over `--log-level`, which wins over the configured level.
/// Logs go to stderr so stdout stays parseable.
fn init_logging(logging: &LoggingConfig, level: Option<&str>) {
    let level = level.unwrap_or(logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
