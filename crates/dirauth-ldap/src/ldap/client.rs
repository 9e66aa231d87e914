//! LDAP Client implementation
//!
//! Every operation opens its own connection, binds, runs its searches and closes
//! the connection before returning. Nothing is shared between calls, so one client
//! can serve concurrent callers.

use crate::ldap::connection::{establish, Connection};
use crate::ldap::error::{DirectoryError, DirectoryResult, EnumerationResult, PartialResult};
use crate::ldap::filter::equality_filter;
use crate::ldap::search::{GROUP_ENUMERATION, USER_ENUMERATION, USER_GROUPS, USER_RESOLUTION};
use crate::ldap::session::{Connector, Ldap3Connector};
use crate::ldap::tls::{PemTransportBuilder, SecureTransportBuilder, TransportSecurity};
use crate::ldap::types::*;
use dirauth_core::DirectorySettings;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Directory client for authentication and user/group queries
#[derive(Clone)]
pub struct DirectoryClient {
    connector: Arc<dyn Connector>,
    transport: Arc<dyn SecureTransportBuilder>,
}

impl Default for DirectoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryClient {
    /// Client backed by `ldap3` and PEM files on disk
    pub fn new() -> Self {
        Self::with_parts(Arc::new(Ldap3Connector), Arc::new(PemTransportBuilder))
    }

    pub fn with_parts(
        connector: Arc<dyn Connector>,
        transport: Arc<dyn SecureTransportBuilder>,
    ) -> Self {
        Self {
            connector,
            transport,
        }
    }

    /// Check a user's password.
    ///
    /// An unknown user and a rejected password produce the same
    /// [`DirectoryError::Unauthorized`].
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<()> {
        let mut conn = self.open(settings).await?;
        let result = self
            .verify_credentials(&mut conn, username, password, settings)
            .await;
        conn.close().await;

        match &result {
            Ok(()) => info!("LDAP authentication succeeded for {}", username),
            Err(e) => debug!("LDAP authentication failed for {}: {}", username, e),
        }
        result
    }

    /// Distinguished name of `username`
    pub async fn resolve_user(
        &self,
        username: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<ResolvedUser> {
        let mut conn = self.open(settings).await?;
        let result = self.lookup_user(&mut conn, username, settings).await;
        conn.close().await;
        result
    }

    /// Names of the groups `username` belongs to, in search order without duplicates
    pub async fn get_user_groups(
        &self,
        username: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<Vec<String>> {
        let mut conn = self.open(settings).await?;
        let result = self.lookup_groups(&mut conn, username, settings).await;
        conn.close().await;
        result
    }

    /// Usernames of every entry matched by the user searches.
    ///
    /// Stops at the first failing search base and returns what was collected so far
    /// together with the error.
    pub async fn search_users(&self, settings: &DirectorySettings) -> EnumerationResult<String> {
        let mut conn = self.open(settings).await?;
        let result = self.enumerate_users(&mut conn, settings).await;
        conn.close().await;
        result
    }

    /// Every (member, group) pair found by the group searches.
    ///
    /// Stops at the first failing search base and returns what was collected so far
    /// together with the error.
    pub async fn search_groups(
        &self,
        settings: &DirectorySettings,
    ) -> EnumerationResult<DirectoryGroupMembership> {
        let mut conn = self.open(settings).await?;
        let result = self.enumerate_memberships(&mut conn, settings).await;
        conn.close().await;
        result
    }

    /// Connect and bind without searching.
    ///
    /// Binds with the service account, or anonymously in anonymous mode.
    pub async fn test_connectivity(&self, settings: &DirectorySettings) -> DirectoryResult<()> {
        let mut conn = self.open(settings).await?;
        let result = if settings.anonymous_mode {
            conn.anonymous_bind().await.map_err(|e| {
                warn!("Anonymous LDAP bind to {} failed: {}", conn.url(), e);
                DirectoryError::Config(format!("anonymous bind rejected: {}", e))
            })
        } else {
            self.bind_reader(&mut conn, settings).await
        };
        conn.close().await;

        if result.is_ok() {
            info!("LDAP connectivity test succeeded");
        }
        result
    }

    // =========================================================================
    // Private methods
    // =========================================================================

    async fn open(&self, settings: &DirectorySettings) -> DirectoryResult<Connection> {
        settings.validate()?;

        let security = TransportSecurity::negotiate(&settings.tls, self.transport.as_ref())?;
        let timeout = settings.connect_timeout_seconds.map(Duration::from_secs);

        establish(self.connector.as_ref(), &settings.urls, &security, timeout).await
    }

    /// Service-account bind; skipped in anonymous mode
    async fn bind_reader(
        &self,
        conn: &mut Connection,
        settings: &DirectorySettings,
    ) -> DirectoryResult<()> {
        if settings.anonymous_mode {
            return Ok(());
        }

        debug!("Binding to {} as {}", conn.url(), settings.reader_dn);
        conn.simple_bind(&settings.reader_dn, &settings.password)
            .await
            .map_err(|e| {
                warn!("Service account bind as {} failed: {}", settings.reader_dn, e);
                DirectoryError::Config(format!("service account bind failed: {}", e))
            })
    }

    async fn lookup_user(
        &self,
        conn: &mut Connection,
        username: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<ResolvedUser> {
        self.bind_reader(conn, settings).await?;
        self.search_user(conn, username, settings).await
    }

    async fn lookup_groups(
        &self,
        conn: &mut Connection,
        username: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<Vec<String>> {
        let user_dn = self.lookup_user(conn, username, settings).await?;
        self.groups_by_user(conn, &user_dn, settings).await
    }

    async fn verify_credentials(
        &self,
        conn: &mut Connection,
        username: &str,
        password: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<()> {
        self.bind_reader(conn, settings).await?;

        let user_dn = match self.search_user(conn, username, settings).await {
            Ok(dn) => dn,
            Err(DirectoryError::UserNotFound) => return Err(DirectoryError::Unauthorized),
            Err(e) => return Err(e),
        };

        // A simple bind with an empty password is an unauthenticated bind and
        // most servers accept it.
        if password.is_empty() {
            return Err(DirectoryError::Unauthorized);
        }

        conn.simple_bind(&user_dn, password).await.map_err(|e| {
            debug!("User bind as {} failed: {}", user_dn, e);
            DirectoryError::Unauthorized
        })
    }

    /// First search base returning exactly one entry wins
    async fn search_user(
        &self,
        conn: &mut Connection,
        username: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<ResolvedUser> {
        for search in &settings.search_settings {
            let request = SearchRequest::new(
                &search.base_dn,
                equality_filter(&search.filter, &search.username_attribute, username),
            )
            .attributes([DN_ATTRIBUTE])
            .limits(settings.search_limits);

            debug!("Searching for user with filter: {}", request.filter);

            match conn.search(&request).await {
                Ok(entries) => match entries.as_slice() {
                    [entry] => {
                        debug!("Found user DN: {}", entry.dn);
                        return Ok(entry.dn.clone());
                    }
                    [] => debug!("No user {} under {}", username, search.base_dn),
                    _ => warn!(
                        "{} entries match user {} under {}, ignoring",
                        entries.len(),
                        username,
                        search.base_dn
                    ),
                },
                Err(e) => USER_RESOLUTION.absorb(&search.base_dn, e)?,
            }
        }

        Err(DirectoryError::UserNotFound)
    }

    async fn groups_by_user(
        &self,
        conn: &mut Connection,
        user_dn: &str,
        settings: &DirectorySettings,
    ) -> DirectoryResult<Vec<String>> {
        let mut groups: Vec<String> = Vec::new();

        for search in &settings.group_search_settings {
            let request = SearchRequest::new(
                &search.group_base_dn,
                equality_filter(&search.group_filter, &search.group_attribute, user_dn),
            )
            .attributes([GROUP_NAME_ATTRIBUTE])
            .limits(settings.search_limits);

            debug!("Searching groups with filter: {}", request.filter);

            match conn.search(&request).await {
                Ok(entries) => {
                    for entry in entries {
                        if let Some(name) = entry.first_value(GROUP_NAME_ATTRIBUTE) {
                            if !groups.iter().any(|g| g == name) {
                                groups.push(name.to_string());
                            }
                        }
                    }
                }
                Err(e) => USER_GROUPS.absorb(&search.group_base_dn, e)?,
            }
        }

        debug!("Found {} groups for {}", groups.len(), user_dn);
        Ok(groups)
    }

    async fn enumerate_users(
        &self,
        conn: &mut Connection,
        settings: &DirectorySettings,
    ) -> EnumerationResult<String> {
        self.bind_reader(conn, settings).await?;

        let mut users = Vec::new();
        for search in &settings.search_settings {
            let request = SearchRequest::new(&search.base_dn, &search.filter)
                .attributes([DN_ATTRIBUTE, search.username_attribute.as_str()])
                .limits(settings.search_limits);

            match conn.search(&request).await {
                Ok(entries) => {
                    for entry in entries {
                        match entry.first_value(&search.username_attribute) {
                            Some(name) => users.push(name.to_string()),
                            None => debug!(
                                "Entry {} has no {} attribute",
                                entry.dn, search.username_attribute
                            ),
                        }
                    }
                }
                Err(e) => {
                    if let Err(error) = USER_ENUMERATION.absorb(&search.base_dn, e) {
                        return Err(PartialResult::new(users, error));
                    }
                }
            }
        }

        Ok(users)
    }

    async fn enumerate_memberships(
        &self,
        conn: &mut Connection,
        settings: &DirectorySettings,
    ) -> EnumerationResult<DirectoryGroupMembership> {
        self.bind_reader(conn, settings).await?;

        let mut memberships = Vec::new();
        for search in &settings.group_search_settings {
            let request = SearchRequest::new(&search.group_base_dn, &search.group_filter)
                .attributes([GROUP_NAME_ATTRIBUTE, search.group_attribute.as_str()])
                .limits(settings.search_limits);

            match conn.search(&request).await {
                Ok(entries) => {
                    for entry in entries {
                        let Some(group) = entry.first_value(GROUP_NAME_ATTRIBUTE) else {
                            debug!("Group entry {} has no common name", entry.dn);
                            continue;
                        };
                        for member in entry.values(&search.group_attribute) {
                            memberships.push(DirectoryGroupMembership {
                                name: member.clone(),
                                group: group.to_string(),
                            });
                        }
                    }
                }
                Err(e) => {
                    if let Err(error) = GROUP_ENUMERATION.absorb(&search.group_base_dn, e) {
                        return Err(PartialResult::new(memberships, error));
                    }
                }
            }
        }

        Ok(memberships)
    }
}
