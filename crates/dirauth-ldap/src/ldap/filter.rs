//! Search filter construction
//!
//! Values that come from outside (login names, DNs) are escaped before they are
//! placed in a filter, so `*`, `(`, `)`, `\` and NUL always compare literally.

use std::borrow::Cow;

/// Escape a value for use inside an LDAP filter assertion
pub fn escape_filter_value(value: &str) -> Cow<'_, str> {
    ldap3::ldap_escape(value)
}

/// `(&<base_filter>(<attribute>=<escaped value>))`
pub fn equality_filter(base_filter: &str, attribute: &str, value: &str) -> String {
    format!(
        "(&{}({}={}))",
        base_filter,
        attribute,
        escape_filter_value(value)
    )
}
