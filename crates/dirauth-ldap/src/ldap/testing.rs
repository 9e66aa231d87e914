//! In-memory directory used by the unit tests
//!
//! Records every connect, bind, search and release so tests can assert on the
//! exact protocol sequence without a server.

use crate::ldap::error::{DirectoryError, DirectoryResult, SessionError};
use crate::ldap::session::{Connector, DirectorySession};
use crate::ldap::tls::{SecureTransportBuilder, TransportMode, TransportSecurity};
use crate::ldap::types::{DirectoryEntry, SearchRequest};
use async_trait::async_trait;
use dirauth_core::SearchLimits;
use parking_lot::Mutex;
use rustls::{ClientConfig, RootCertStore};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect { url: String, mode: TransportMode },
    Bind { dn: String },
    AnonymousBind,
    Search {
        base_dn: String,
        filter: String,
        attributes: Vec<String>,
        limits: SearchLimits,
    },
    Close,
    Abort,
}

#[derive(Default)]
struct State {
    unreachable: HashSet<String>,
    credentials: HashMap<String, String>,
    reject_anonymous: bool,
    results: HashMap<String, Result<Vec<DirectoryEntry>, SessionError>>,
    events: Vec<Event>,
    open: usize,
}

/// Scripted directory server, cheap to clone
#[derive(Clone, Default)]
pub struct ScriptedDirectory {
    state: Arc<Mutex<State>>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(self, url: &str) -> Self {
        self.state.lock().unreachable.insert(url.to_string());
        self
    }

    /// Accept a simple bind for `dn` with `password`
    pub fn account(self, dn: &str, password: &str) -> Self {
        self.state
            .lock()
            .credentials
            .insert(dn.to_string(), password.to_string());
        self
    }

    pub fn reject_anonymous(self) -> Self {
        self.state.lock().reject_anonymous = true;
        self
    }

    /// Entries returned by any search under `base_dn`
    pub fn entries(self, base_dn: &str, entries: Vec<DirectoryEntry>) -> Self {
        self.state
            .lock()
            .results
            .insert(base_dn.to_string(), Ok(entries));
        self
    }

    /// Searches under `base_dn` fail
    pub fn failing_search(self, base_dn: &str) -> Self {
        self.state.lock().results.insert(
            base_dn.to_string(),
            Err(SessionError::with_rc(32, "rc=32: no such object")),
        );
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| predicate(e)).count()
    }

    pub fn connect_attempts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Connect { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    /// (base DN, filter) of every search issued
    pub fn searches(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Search {
                    base_dn, filter, ..
                } => Some((base_dn, filter)),
                _ => None,
            })
            .collect()
    }

    /// Limits sent with every search issued
    pub fn search_limits(&self) -> Vec<SearchLimits> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Search { limits, .. } => Some(limits),
                _ => None,
            })
            .collect()
    }

    pub fn binds(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Bind { dn } => Some(dn),
                _ => None,
            })
            .collect()
    }

    /// Sessions handed out and not yet released
    pub fn open_sessions(&self) -> usize {
        self.state.lock().open
    }
}

#[async_trait]
impl Connector for ScriptedDirectory {
    async fn connect(
        &self,
        url: &str,
        security: &TransportSecurity,
        _timeout: Option<Duration>,
    ) -> Result<Box<dyn DirectorySession>, SessionError> {
        let mut state = self.state.lock();
        state.events.push(Event::Connect {
            url: url.to_string(),
            mode: security.mode,
        });

        if state.unreachable.contains(url) {
            return Err(SessionError::new(format!("connection refused: {}", url)));
        }

        state.open += 1;
        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
        }))
    }
}

struct ScriptedSession {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl DirectorySession for ScriptedSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.events.push(Event::Bind { dn: dn.to_string() });

        match state.credentials.get(dn) {
            Some(expected) if expected == password && !password.is_empty() => Ok(()),
            _ => Err(SessionError::with_rc(49, "rc=49: invalid credentials")),
        }
    }

    async fn anonymous_bind(&mut self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.events.push(Event::AnonymousBind);

        if state.reject_anonymous {
            Err(SessionError::with_rc(48, "rc=48: inappropriate authentication"))
        } else {
            Ok(())
        }
    }

    async fn search(
        &mut self,
        request: &SearchRequest,
    ) -> Result<Vec<DirectoryEntry>, SessionError> {
        let mut state = self.state.lock();
        state.events.push(Event::Search {
            base_dn: request.base_dn.clone(),
            filter: request.filter.clone(),
            attributes: request.attributes.clone(),
            limits: request.limits,
        });

        state
            .results
            .get(&request.base_dn)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        state.events.push(Event::Close);
        state.open -= 1;
        Ok(())
    }

    fn abort(&mut self) {
        let mut state = self.state.lock();
        state.events.push(Event::Abort);
        state.open -= 1;
    }
}

/// TLS builder that hands out an empty-trust configuration and counts calls
#[derive(Default)]
pub struct StaticTransportBuilder {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl StaticTransportBuilder {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SecureTransportBuilder for StaticTransportBuilder {
    fn build(
        &self,
        _ca_cert_path: Option<&Path>,
        _cert_path: Option<&Path>,
        _key_path: Option<&Path>,
        _skip_verify: bool,
    ) -> DirectoryResult<Arc<ClientConfig>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DirectoryError::Config(
                "Failed to parse certificates: malformed PEM".into(),
            ));
        }

        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| DirectoryError::Config(e.to_string()))?
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();

        Ok(Arc::new(config))
    }
}
