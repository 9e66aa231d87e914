//! Connection establishment with ordered failover
//!
//! A [`Connection`] owns one session for the length of one client operation and
//! releases it exactly once: through [`Connection::close`] on the normal path, or
//! on drop when an operation unwinds early.

use crate::ldap::error::{DirectoryError, DirectoryResult, SessionError};
use crate::ldap::session::{Connector, DirectorySession};
use crate::ldap::tls::{server_name, TransportSecurity};
use crate::ldap::types::{DirectoryEntry, SearchRequest};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A live session to exactly one directory server
pub struct Connection {
    session: Option<Box<dyn DirectorySession>>,
    url: String,
}

impl Connection {
    pub fn new(session: Box<dyn DirectorySession>, url: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            url: url.into(),
        }
    }

    /// Server this connection is attached to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn session(&mut self) -> Result<&mut Box<dyn DirectorySession>, SessionError> {
        self.session
            .as_mut()
            .ok_or_else(|| SessionError::new("connection already closed"))
    }

    pub async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), SessionError> {
        self.session()?.simple_bind(dn, password).await
    }

    pub async fn anonymous_bind(&mut self) -> Result<(), SessionError> {
        self.session()?.anonymous_bind().await
    }

    pub async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, SessionError> {
        self.session()?.search(request).await
    }

    /// Unbind and release the session.
    pub async fn close(mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                debug!("LDAP unbind from {} failed: {}", self.url, e);
                session.abort();
            }
            debug!("Closed LDAP connection to {}", self.url);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!("Dropping open LDAP connection to {}", self.url);
            session.abort();
        }
    }
}

/// Connect to the first reachable server, trying `urls` strictly in order.
///
/// A failing server is logged and skipped. When none can be reached the error
/// carries no per-server detail.
pub async fn establish(
    connector: &dyn Connector,
    urls: &[String],
    security: &TransportSecurity,
    timeout: Option<Duration>,
) -> DirectoryResult<Connection> {
    for url in urls {
        match connector.connect(url, security, timeout).await {
            Ok(session) => {
                info!("Connected to LDAP server {} ({})", url, security.mode);
                return Ok(Connection::new(session, url.as_str()));
            }
            Err(e) => {
                warn!(
                    server = server_name(url),
                    "Failed creating LDAP connection to {}: {}", url, e
                );
            }
        }
    }

    Err(DirectoryError::NoReachableServer)
}
