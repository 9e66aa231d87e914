//! Policies for searching an ordered list of search bases
//!
//! Per-user lookups treat each configured base independently: a broken base is
//! logged and skipped. Bulk enumerations stop at the first broken base instead.

use crate::ldap::error::{DirectoryError, SessionError};
use tracing::{error, warn};

/// What a failed search against one configured base does to the whole operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePolicy {
    /// Log the failure and continue with the next base
    BestEffort,
    /// Abort the operation with the failure
    FailFast,
}

/// User lookup by login name
pub const USER_RESOLUTION: SourcePolicy = SourcePolicy::BestEffort;

/// Groups of one resolved user
pub const USER_GROUPS: SourcePolicy = SourcePolicy::BestEffort;

/// Enumeration of all users
pub const USER_ENUMERATION: SourcePolicy = SourcePolicy::FailFast;

/// Enumeration of all group memberships
pub const GROUP_ENUMERATION: SourcePolicy = SourcePolicy::FailFast;

impl SourcePolicy {
    /// Apply the policy to a failed search under `base_dn`.
    ///
    /// `Ok(())` means the caller moves on to the next base.
    pub fn absorb(self, base_dn: &str, err: SessionError) -> Result<(), DirectoryError> {
        match self {
            SourcePolicy::BestEffort => {
                warn!("LDAP search under {} failed, skipping: {}", base_dn, err);
                Ok(())
            }
            SourcePolicy::FailFast => {
                error!("LDAP search under {} failed: {}", base_dn, err);
                Err(DirectoryError::Operation(format!(
                    "search under {} failed: {}",
                    base_dn, err
                )))
            }
        }
    }
}
