//! Directory search types
//!
//! Requests and entries exchanged with a [`DirectorySession`](super::session::DirectorySession),
//! and the records returned to callers.

use dirauth_core::SearchLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Common name attribute of group entries
pub const GROUP_NAME_ATTRIBUTE: &str = "cn";

/// Attribute list asking only for the entry DN
pub const DN_ATTRIBUTE: &str = "dn";

/// Distinguished name of a user found by a user search
pub type ResolvedUser = String;

// ============================================================================
// Search Request
// ============================================================================

/// A subtree search that never dereferences aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base_dn: String,
    pub filter: String,
    pub attributes: Vec<String>,
    pub limits: SearchLimits,
}

impl SearchRequest {
    pub fn new(base_dn: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            attributes: Vec::new(),
            limits: SearchLimits::default(),
        }
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }
}

// ============================================================================
// Search Results
// ============================================================================

/// One entry returned by a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// First value of an attribute; attribute names are matched case-insensitively
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// All values of an attribute; attribute names are matched case-insensitively
    pub fn values(&self, name: &str) -> &[String] {
        if let Some(values) = self.attributes.get(name) {
            return values;
        }
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
        }
    }
}

/// A (member, group) pair produced by group enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryGroupMembership {
    /// Member identifier as stored in the group's member attribute
    pub name: String,

    /// Common name of the group
    pub group: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_ignores_case() {
        let entry = DirectoryEntry::new("cn=admins,ou=groups,dc=example,dc=com")
            .with_attribute("CN", ["admins"])
            .with_attribute("member", ["uid=alice,dc=example,dc=com", "uid=bob,dc=example,dc=com"]);

        assert_eq!(entry.first_value("cn"), Some("admins"));
        assert_eq!(entry.values("Member").len(), 2);
        assert!(entry.values("description").is_empty());
        assert_eq!(entry.first_value("description"), None);
    }

    #[test]
    fn test_search_request_builder() {
        let request = SearchRequest::new("ou=people,dc=example,dc=com", "(objectClass=*)")
            .attributes([DN_ATTRIBUTE]);

        assert_eq!(request.attributes, vec!["dn".to_string()]);
        assert_eq!(request.limits.size_limit, 0);
        assert_eq!(request.limits.time_limit, 0);
    }
}
