//! Directory sessions
//!
//! [`Connector`] opens a [`DirectorySession`] to one server. The production
//! implementation drives `ldap3`'s async connection on the tokio runtime.

use crate::ldap::error::SessionError;
use crate::ldap::tls::{TransportMode, TransportSecurity};
use crate::ldap::types::{DirectoryEntry, SearchRequest};
use async_trait::async_trait;
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use std::time::Duration;
use tracing::debug;

/// A live, bound-or-unbound session with one directory server.
#[async_trait]
pub trait DirectorySession: Send {
    /// Simple bind with a DN and password
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), SessionError>;

    /// Unauthenticated bind
    async fn anonymous_bind(&mut self) -> Result<(), SessionError>;

    /// Subtree search, aliases never dereferenced
    async fn search(&mut self, request: &SearchRequest)
        -> Result<Vec<DirectoryEntry>, SessionError>;

    /// Graceful shutdown (unbind)
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Immediate release when a graceful close is not possible
    fn abort(&mut self);
}

/// Opens sessions to directory servers.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        security: &TransportSecurity,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn DirectorySession>, SessionError>;
}

// ============================================================================
// ldap3 implementation
// ============================================================================

/// Connects with `ldap3`
#[derive(Debug, Default, Clone, Copy)]
pub struct Ldap3Connector;

impl Ldap3Connector {
    /// `host:port` plus the scheme for the transport mode. A bare host gets the
    /// mode's default port.
    pub fn directory_url(url: &str, mode: TransportMode) -> String {
        let address = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
        if address.contains(':') {
            format!("{}://{}", mode.scheme(), address)
        } else {
            format!("{}://{}:{}", mode.scheme(), address, mode.default_port())
        }
    }

    fn conn_settings(security: &TransportSecurity, timeout: Option<Duration>) -> LdapConnSettings {
        let mut settings =
            LdapConnSettings::new().set_starttls(security.mode == TransportMode::StartTls);

        if let Some(config) = &security.config {
            settings = settings.set_config(config.clone());
        }
        if let Some(timeout) = timeout {
            settings = settings.set_conn_timeout(timeout);
        }

        settings
    }
}

#[async_trait]
impl Connector for Ldap3Connector {
    async fn connect(
        &self,
        url: &str,
        security: &TransportSecurity,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn DirectorySession>, SessionError> {
        let ldap_url = Self::directory_url(url, security.mode);
        debug!("Connecting to LDAP server: {} ({})", ldap_url, security.mode);

        // With STARTTLS, ldap3 runs the upgrade before returning; a failed upgrade
        // drops the plaintext stream and surfaces the error here.
        let (conn, ldap) =
            LdapConnAsync::with_settings(Self::conn_settings(security, timeout), &ldap_url)
                .await?;

        ldap3::drive!(conn);

        Ok(Box::new(Ldap3Session { ldap }))
    }
}

/// Session over an `ldap3` handle
pub struct Ldap3Session {
    ldap: Ldap,
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), SessionError> {
        self.ldap.simple_bind(dn, password).await?.success()?;
        Ok(())
    }

    async fn anonymous_bind(&mut self) -> Result<(), SessionError> {
        self.ldap.simple_bind("", "").await?.success()?;
        Ok(())
    }

    async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, SessionError> {
        let options = SearchOptions::new()
            .deref(DerefAliases::Never)
            .sizelimit(request.limits.size_limit)
            .timelimit(request.limits.time_limit);

        let (entries, _res) = self
            .ldap
            .with_search_options(options)
            .search(
                &request.base_dn,
                Scope::Subtree,
                &request.filter,
                request.attributes.clone(),
            )
            .await?
            .success()?;

        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_ref() && !entry.is_intermediate())
            .map(|entry| DirectoryEntry::from(SearchEntry::construct(entry)))
            .collect())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.ldap.unbind().await?;
        Ok(())
    }

    fn abort(&mut self) {
        // Dropping the last handle ends the driver task, which closes the socket.
        debug!("Releasing LDAP session without unbind");
    }
}
