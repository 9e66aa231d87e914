//! LDAP/Active Directory client
//!
//! Works against:
//! - LDAP (OpenLDAP, 389 Directory Server)
//! - Microsoft Active Directory
//!
//! Features:
//! - Password verification with a service-account search
//! - Group membership lookup
//! - User and group enumeration
//! - Ordered server failover
//! - TLS/STARTTLS support

mod client;
mod connection;
mod error;
mod filter;
mod search;
mod session;
mod tls;
mod types;

#[cfg(test)]
mod testing;

pub use client::DirectoryClient;
pub use connection::{establish, Connection};
pub use error::*;
pub use filter::{equality_filter, escape_filter_value};
pub use search::{SourcePolicy, GROUP_ENUMERATION, USER_ENUMERATION, USER_GROUPS, USER_RESOLUTION};
pub use session::{Connector, DirectorySession, Ldap3Connector, Ldap3Session};
pub use tls::{PemTransportBuilder, SecureTransportBuilder, TransportMode, TransportSecurity};
pub use types::*;
