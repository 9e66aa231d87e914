//! Dirauth Core Library
//!
//! Configuration types and errors shared by the directory client and its command-line tool.

pub mod config;
pub mod error;

pub use config::{
    DirauthConfig, DirectorySettings, GroupSearchSettings, LoggingConfig, SearchLimits,
    TlsSettings, UserSearchSettings,
};
pub use error::{Error, Result};

/// Dirauth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default LDAP port
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default LDAPS port
pub const DEFAULT_LDAPS_PORT: u16 = 636;
