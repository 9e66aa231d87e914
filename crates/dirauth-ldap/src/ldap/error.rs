//! Directory client error types

use std::fmt;
use thiserror::Error;

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors returned by the directory client.
///
/// Transport and protocol failures never cross the client boundary as-is; they are
/// folded into one of these variants first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// None of the configured servers could be reached
    #[error("No reachable directory server")]
    NoReachableServer,

    /// A directory operation failed on an established connection
    #[error("Directory operation failed: {0}")]
    Operation(String),

    /// Invalid settings, unusable TLS material or rejected service account
    #[error("Invalid directory configuration: {0}")]
    Config(String),

    /// The end-user credentials were not accepted
    #[error("Unauthorized")]
    Unauthorized,

    /// No user search returned exactly one entry
    #[error("User not found or too many entries returned")]
    UserNotFound,
}

/// Coarse classification of [`DirectoryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Config,
    Unauthorized,
    UserNotFound,
}

impl DirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectoryError::NoReachableServer | DirectoryError::Operation(_) => {
                ErrorKind::Connection
            }
            DirectoryError::Config(_) => ErrorKind::Config,
            DirectoryError::Unauthorized => ErrorKind::Unauthorized,
            DirectoryError::UserNotFound => ErrorKind::UserNotFound,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::UserNotFound => "UserNotFound",
        }
    }
}

impl From<dirauth_core::Error> for DirectoryError {
    fn from(err: dirauth_core::Error) -> Self {
        DirectoryError::Config(err.to_string())
    }
}

/// Failure reported by a [`DirectorySession`](super::session::DirectorySession)
/// or a [`Connector`](super::session::Connector).
///
/// This is the low-level error; the client maps it to a [`DirectoryError`]
/// depending on where in the protocol it happened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SessionError {
    /// LDAP result code, when the server answered
    pub rc: Option<u32>,
    pub message: String,
}

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            rc: None,
            message: message.into(),
        }
    }

    pub fn with_rc(rc: u32, message: impl Into<String>) -> Self {
        Self {
            rc: Some(rc),
            message: message.into(),
        }
    }
}

impl From<ldap3::LdapError> for SessionError {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } => SessionError::with_rc(
                result.rc,
                if result.text.is_empty() {
                    format!("rc={}", result.rc)
                } else {
                    format!("rc={}: {}", result.rc, result.text)
                },
            ),
            other => SessionError::new(other.to_string()),
        }
    }
}

/// Outcome of a bulk enumeration that stopped on a failing search base.
///
/// `partial` holds everything collected before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult<T> {
    pub partial: Vec<T>,
    pub error: DirectoryError,
}

impl<T> PartialResult<T> {
    pub fn new(partial: Vec<T>, error: DirectoryError) -> Self {
        Self { partial, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl<T> From<DirectoryError> for PartialResult<T> {
    fn from(error: DirectoryError) -> Self {
        Self {
            partial: Vec::new(),
            error,
        }
    }
}

impl<T> fmt::Display for PartialResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} entries collected before failure)",
            self.error,
            self.partial.len()
        )
    }
}

impl<T: fmt::Debug> std::error::Error for PartialResult<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result type for bulk enumerations
pub type EnumerationResult<T> = Result<Vec<T>, PartialResult<T>>;
