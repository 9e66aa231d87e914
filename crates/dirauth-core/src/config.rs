//! Configuration for Dirauth
//!
//! Example config:
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [ldap]
//! urls = ["ldap1.example.com:389", "ldap2.example.com:389"]
//! reader_dn = "cn=readonly,dc=example,dc=com"
//! password = "secret"
//!
//! [ldap.tls]
//! start_tls = true
//! ca_cert_path = "/etc/dirauth/ca.pem"
//!
//! [[ldap.search_settings]]
//! base_dn = "ou=people,dc=example,dc=com"
//! filter = "(objectClass=inetOrgPerson)"
//! username_attribute = "uid"
//!
//! [[ldap.group_search_settings]]
//! group_base_dn = "ou=groups,dc=example,dc=com"
//! group_filter = "(objectClass=groupOfNames)"
//! group_attribute = "member"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirauthConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ldap: DirectorySettings,
}

impl DirauthConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        debug!("Loading configuration from {}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::ConfigRead(format!("{}: {}", path, e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::ConfigParse(e.to_string()))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("DIRAUTH_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("DIRAUTH_LOG_FORMAT") {
            config.logging.format = format;
        }

        if let Ok(urls) = std::env::var("DIRAUTH_LDAP_URLS") {
            config.ldap.urls = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(dn) = std::env::var("DIRAUTH_LDAP_READER_DN") {
            config.ldap.reader_dn = dn;
        }
        if let Ok(password) = std::env::var("DIRAUTH_LDAP_PASSWORD") {
            config.ldap.password = password;
        }
        if env_flag("DIRAUTH_LDAP_ANONYMOUS") {
            config.ldap.anonymous_mode = true;
        }

        // TLS from environment
        if env_flag("DIRAUTH_LDAP_TLS") {
            config.ldap.tls.enabled = true;
        }
        if env_flag("DIRAUTH_LDAP_STARTTLS") {
            config.ldap.tls.start_tls = true;
        }
        if env_flag("DIRAUTH_LDAP_TLS_SKIP_VERIFY") {
            config.ldap.tls.skip_verify = true;
        }
        if let Ok(ca) = std::env::var("DIRAUTH_LDAP_TLS_CA") {
            config.ldap.tls.ca_cert_path = Some(PathBuf::from(ca));
        }
        if let Ok(cert) = std::env::var("DIRAUTH_LDAP_TLS_CERT") {
            config.ldap.tls.cert_path = Some(PathBuf::from(cert));
        }
        if let Ok(key) = std::env::var("DIRAUTH_LDAP_TLS_KEY") {
            config.ldap.tls.key_path = Some(PathBuf::from(key));
        }

        // A single user/group search base can be given through the environment
        if let Ok(base_dn) = std::env::var("DIRAUTH_LDAP_USER_BASE_DN") {
            let mut search = UserSearchSettings::openldap(&base_dn);
            if let Ok(filter) = std::env::var("DIRAUTH_LDAP_USER_FILTER") {
                search.filter = filter;
            }
            if let Ok(attr) = std::env::var("DIRAUTH_LDAP_USERNAME_ATTRIBUTE") {
                search.username_attribute = attr;
            }
            config.ldap.search_settings.push(search);
        }
        if let Ok(base_dn) = std::env::var("DIRAUTH_LDAP_GROUP_BASE_DN") {
            let mut search = GroupSearchSettings::openldap(&base_dn);
            if let Ok(filter) = std::env::var("DIRAUTH_LDAP_GROUP_FILTER") {
                search.group_filter = filter;
            }
            if let Ok(attr) = std::env::var("DIRAUTH_LDAP_GROUP_ATTRIBUTE") {
                search.group_attribute = attr;
            }
            config.ldap.group_search_settings.push(search);
        }

        config
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Output format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ============================================================================
// Directory Settings
// ============================================================================

/// Settings for one directory (LDAP/Active Directory) deployment.
///
/// Server URLs are tried in order, as are the user and group search settings.
/// The order is significant and is never rearranged by the client.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Server endpoints as `host:port`
    /// Example: ["ldap1.example.com:389", "ldap2.example.com:389"]
    #[serde(default)]
    pub urls: Vec<String>,

    /// Skip the service-account bind and search anonymously
    #[serde(default)]
    pub anonymous_mode: bool,

    /// Service account DN used for searches
    /// Example: "cn=readonly,dc=example,dc=com"
    #[serde(default)]
    pub reader_dn: String,

    /// Service account password
    #[serde(default)]
    pub password: String,

    /// Transport security
    #[serde(default)]
    pub tls: TlsSettings,

    /// User search bases, tried in order
    #[serde(default)]
    pub search_settings: Vec<UserSearchSettings>,

    /// Group search bases, all of them are searched
    #[serde(default)]
    pub group_search_settings: Vec<GroupSearchSettings>,

    /// Connection timeout in seconds, unset means the transport default
    #[serde(default)]
    pub connect_timeout_seconds: Option<u64>,

    /// Size and time limits sent with every search
    #[serde(default)]
    pub search_limits: SearchLimits,
}

impl fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("DirectorySettings")
            .field("urls", &self.urls)
            .field("anonymous_mode", &self.anonymous_mode)
            .field("reader_dn", &self.reader_dn)
            .field("password", &password)
            .field("tls", &self.tls)
            .field("search_settings", &self.search_settings)
            .field("group_search_settings", &self.group_search_settings)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("search_limits", &self.search_limits)
            .finish()
    }
}

impl DirectorySettings {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.urls.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "At least one directory server URL is required".into(),
            ));
        }

        if self.urls.iter().any(|u| u.trim().is_empty()) {
            return Err(crate::Error::InvalidConfig(
                "Directory server URLs must not be empty".into(),
            ));
        }

        if !self.anonymous_mode && self.reader_dn.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Reader DN is required unless anonymous mode is enabled".into(),
            ));
        }

        self.tls.validate()?;

        for (i, search) in self.search_settings.iter().enumerate() {
            if search.base_dn.is_empty() {
                return Err(crate::Error::InvalidConfig(format!(
                    "User search #{}: base DN is required",
                    i + 1
                )));
            }
            if search.username_attribute.is_empty() {
                return Err(crate::Error::InvalidConfig(format!(
                    "User search #{}: username attribute is required",
                    i + 1
                )));
            }
        }

        for (i, search) in self.group_search_settings.iter().enumerate() {
            if search.group_base_dn.is_empty() {
                return Err(crate::Error::InvalidConfig(format!(
                    "Group search #{}: base DN is required",
                    i + 1
                )));
            }
            if search.group_attribute.is_empty() {
                return Err(crate::Error::InvalidConfig(format!(
                    "Group search #{}: group attribute is required",
                    i + 1
                )));
            }
        }

        Ok(())
    }
}

/// Transport security settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsSettings {
    /// Connect with TLS from the first byte (LDAPS)
    #[serde(default)]
    pub enabled: bool,

    /// Upgrade a plaintext connection with STARTTLS. Ignored when `enabled` is set.
    #[serde(default)]
    pub start_tls: bool,

    /// CA certificate used to verify the server (PEM format)
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Client certificate (PEM format)
    #[serde(default)]
    pub cert_path: Option<PathBuf>,

    /// Client private key (PEM format)
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Skip server certificate verification (not recommended for production)
    #[serde(default)]
    pub skip_verify: bool,
}

impl TlsSettings {
    pub fn validate(&self) -> crate::Result<()> {
        match (&self.cert_path, &self.key_path) {
            (Some(_), None) => Err(crate::Error::InvalidConfig(
                "TLS client certificate given without a key".into(),
            )),
            (None, Some(_)) => Err(crate::Error::InvalidConfig(
                "TLS client key given without a certificate".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// One user search base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchSettings {
    /// Example: "ou=people,dc=example,dc=com"
    pub base_dn: String,

    /// Base filter, combined with the username equality test
    /// Example: "(objectClass=inetOrgPerson)"
    #[serde(default = "default_user_filter")]
    pub filter: String,

    /// Attribute holding the login name
    #[serde(default = "default_username_attr")]
    pub username_attribute: String,
}

fn default_user_filter() -> String {
    "(objectClass=*)".to_string()
}

fn default_username_attr() -> String {
    "uid".to_string()
}

impl UserSearchSettings {
    pub fn new(
        base_dn: impl Into<String>,
        filter: impl Into<String>,
        username_attribute: impl Into<String>,
    ) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            username_attribute: username_attribute.into(),
        }
    }

    /// Active Directory defaults
    pub fn active_directory(base_dn: &str) -> Self {
        Self::new(
            base_dn,
            "(&(objectCategory=person)(objectClass=user))",
            "sAMAccountName",
        )
    }

    /// OpenLDAP / 389 Directory Server defaults
    pub fn openldap(base_dn: &str) -> Self {
        Self::new(base_dn, "(objectClass=inetOrgPerson)", "uid")
    }
}

/// One group search base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSearchSettings {
    /// Example: "ou=groups,dc=example,dc=com"
    pub group_base_dn: String,

    /// Example: "(objectClass=groupOfNames)"
    #[serde(default = "default_group_filter")]
    pub group_filter: String,

    /// Attribute listing the group's members
    #[serde(default = "default_member_attr")]
    pub group_attribute: String,
}

fn default_group_filter() -> String {
    "(objectClass=groupOfNames)".to_string()
}

fn default_member_attr() -> String {
    "member".to_string()
}

impl GroupSearchSettings {
    pub fn new(
        group_base_dn: impl Into<String>,
        group_filter: impl Into<String>,
        group_attribute: impl Into<String>,
    ) -> Self {
        Self {
            group_base_dn: group_base_dn.into(),
            group_filter: group_filter.into(),
            group_attribute: group_attribute.into(),
        }
    }

    /// Active Directory defaults
    pub fn active_directory(base_dn: &str) -> Self {
        Self::new(base_dn, "(objectClass=group)", "member")
    }

    /// OpenLDAP defaults (groupOfNames)
    pub fn openldap(base_dn: &str) -> Self {
        Self::new(base_dn, "(objectClass=groupOfNames)", "member")
    }
}

/// Search size/time limits. Zero means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    #[serde(default)]
    pub size_limit: i32,

    /// Seconds
    #[serde(default)]
    pub time_limit: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> DirectorySettings {
        DirectorySettings {
            urls: vec!["ldap.example.com:389".to_string()],
            reader_dn: "cn=readonly,dc=example,dc=com".to_string(),
            password: "secret".to_string(),
            search_settings: vec![UserSearchSettings::openldap("ou=people,dc=example,dc=com")],
            group_search_settings: vec![GroupSearchSettings::openldap(
                "ou=groups,dc=example,dc=com",
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_full_config() {
        let config = DirauthConfig::from_toml(
            r#"
            [logging]
            level = "debug"

            [ldap]
            urls = ["ldap1.example.com:389", "ldap2.example.com:389"]
            reader_dn = "cn=readonly,dc=example,dc=com"
            password = "secret"

            [ldap.tls]
            enabled = true
            skip_verify = true

            [[ldap.search_settings]]
            base_dn = "ou=people,dc=example,dc=com"
            filter = "(objectClass=person)"
            username_attribute = "uid"

            [[ldap.search_settings]]
            base_dn = "ou=contractors,dc=example,dc=com"

            [[ldap.group_search_settings]]
            group_base_dn = "ou=groups,dc=example,dc=com"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.ldap.urls.len(), 2);
        assert!(config.ldap.tls.enabled);
        assert!(config.ldap.tls.skip_verify);
        assert!(!config.ldap.tls.start_tls);

        // Order is kept as configured
        assert_eq!(config.ldap.search_settings[0].base_dn, "ou=people,dc=example,dc=com");
        assert_eq!(
            config.ldap.search_settings[1].base_dn,
            "ou=contractors,dc=example,dc=com"
        );
        assert_eq!(config.ldap.search_settings[1].filter, "(objectClass=*)");
        assert_eq!(config.ldap.search_settings[1].username_attribute, "uid");
        assert_eq!(config.ldap.group_search_settings[0].group_attribute, "member");
        assert_eq!(config.ldap.search_limits, SearchLimits::default());
        assert!(config.ldap.connect_timeout_seconds.is_none());
    }

    #[test]
    fn test_partial_logging_section() {
        let config = DirauthConfig::from_toml(
            "[logging]\nlevel = \"debug\"\n\n[ldap]\nurls = [\"ldap1.example.com:389\"]\nreader_dn = \"cn=r\"\n",
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");

        let config = DirauthConfig::from_toml("[logging]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_from_env() {
        let vars = [
            ("DIRAUTH_LDAP_URLS", " ldap1.example.com:389 , ,ldap2.example.com:636"),
            ("DIRAUTH_LDAP_READER_DN", "cn=readonly,dc=example,dc=com"),
            ("DIRAUTH_LDAP_TLS", "true"),
            ("DIRAUTH_LDAP_STARTTLS", "1"),
            ("DIRAUTH_LDAP_TLS_SKIP_VERIFY", "yes"),
            ("DIRAUTH_LDAP_TLS_CA", "/etc/dirauth/ca.pem"),
            ("DIRAUTH_LDAP_USER_BASE_DN", "ou=people,dc=example,dc=com"),
            ("DIRAUTH_LDAP_USERNAME_ATTRIBUTE", "cn"),
            ("DIRAUTH_LDAP_GROUP_BASE_DN", "ou=groups,dc=example,dc=com"),
        ];
        for (name, value) in vars {
            std::env::set_var(name, value);
        }

        let config = DirauthConfig::from_env();

        for (name, _) in vars {
            std::env::remove_var(name);
        }

        let ldap = config.ldap;
        assert_eq!(ldap.urls, vec!["ldap1.example.com:389", "ldap2.example.com:636"]);
        assert_eq!(ldap.reader_dn, "cn=readonly,dc=example,dc=com");
        assert!(ldap.tls.enabled);
        assert!(ldap.tls.start_tls);
        // Only "true" and "1" switch a flag on
        assert!(!ldap.tls.skip_verify);
        assert_eq!(ldap.tls.ca_cert_path, Some(PathBuf::from("/etc/dirauth/ca.pem")));

        assert_eq!(ldap.search_settings.len(), 1);
        assert_eq!(ldap.search_settings[0].filter, "(objectClass=inetOrgPerson)");
        assert_eq!(ldap.search_settings[0].username_attribute, "cn");
        assert_eq!(
            ldap.group_search_settings,
            vec![GroupSearchSettings::openldap("ou=groups,dc=example,dc=com")]
        );
        assert!(ldap.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = valid_settings();
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("cn=readonly,dc=example,dc=com"));

        let config = DirauthConfig {
            ldap: settings,
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_parse_error() {
        let err = DirauthConfig::from_toml("[ldap]\nurls = 5").unwrap_err();
        assert_eq!(err.code(), "ConfigParse");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dirauth.toml");
        std::fs::write(&path, "[ldap]\nurls = [\"localhost:389\"]\nanonymous_mode = true\n")
            .unwrap();

        let config = DirauthConfig::from_file(path.to_str().unwrap()).unwrap();
        assert!(config.ldap.anonymous_mode);
        assert!(config.ldap.validate().is_ok());

        let missing = DirauthConfig::from_file("/nonexistent/dirauth.toml").unwrap_err();
        assert_eq!(missing.code(), "ConfigRead");
    }

    #[test]
    fn test_validation() {
        assert!(valid_settings().validate().is_ok());

        let mut settings = valid_settings();
        settings.urls.clear();
        assert!(settings.validate().is_err());

        let mut settings = valid_settings();
        settings.reader_dn.clear();
        assert!(settings.validate().is_err());
        settings.anonymous_mode = true;
        assert!(settings.validate().is_ok());

        let mut settings = valid_settings();
        settings.tls.cert_path = Some(PathBuf::from("/etc/dirauth/client.pem"));
        assert!(settings.validate().is_err());
        settings.tls.key_path = Some(PathBuf::from("/etc/dirauth/client.key"));
        assert!(settings.validate().is_ok());

        let mut settings = valid_settings();
        settings.search_settings[0].username_attribute.clear();
        assert!(settings.validate().is_err());

        let mut settings = valid_settings();
        settings.group_search_settings[0].group_base_dn.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_active_directory_presets() {
        let users = UserSearchSettings::active_directory("cn=Users,dc=corp,dc=local");
        assert_eq!(users.username_attribute, "sAMAccountName");

        let groups = GroupSearchSettings::active_directory("cn=Users,dc=corp,dc=local");
        assert_eq!(groups.group_filter, "(objectClass=group)");
        assert_eq!(groups.group_attribute, "member");
    }
}
