//! Directory authentication for Dirauth
//!
//! [`DirectoryClient`] verifies passwords and reads group memberships from an
//! LDAP or Active Directory deployment described by a
//! [`DirectorySettings`](dirauth_core::DirectorySettings).

pub mod ldap;

pub use ldap::{
    DirectoryClient, DirectoryError, DirectoryGroupMembership, DirectoryResult,
    EnumerationResult, ErrorKind, PartialResult, TransportMode,
};
