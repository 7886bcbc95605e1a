//! Error types and handling for session coordination
//!
//! This module defines the errors that command issuers can observe. Note the
//! split the rest of the crate relies on: errors here are returned from
//! method calls (a command rejected while unbound, a persistence failure, a
//! misconfiguration), while hard *session* failures travel inside the
//! published [`SessionState`](crate::session::SessionState) as `last_error`:
//! observers read state, they never catch exceptions, to learn that a
//! session failed.
//!
//! # Error Categories
//!
//! - **Binding errors** - command issued without a bound host, fix by binding
//! - **Persistence errors** - the minimal restart record could not be
//!   written or read
//! - **Configuration errors** - invalid settings, not recoverable without a
//!   config change

use thiserror::Error;

/// Result type alias for session coordination operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors observable by command issuers
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// Command issued through a controller that is not bound to a host
    #[error("Not bound to a session host")]
    NotBound,

    /// The host's event loop has terminated and can no longer accept work
    #[error("Session host terminated")]
    HostTerminated,

    /// The minimal restart record could not be written or read
    #[error("Persistence failed: {reason}")]
    PersistenceFailed { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },
}

impl SessionError {
    /// Create a persistence failed error
    pub fn persistence_failed(reason: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Binding to a host makes the same command succeed.
            SessionError::NotBound => true,

            SessionError::HostTerminated
            | SessionError::PersistenceFailed { .. }
            | SessionError::InvalidConfiguration { .. } => false,
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            SessionError::NotBound | SessionError::HostTerminated => "binding",
            SessionError::PersistenceFailed { .. } => "persistence",
            SessionError::InvalidConfiguration { .. } => "configuration",
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::PersistenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::PersistenceFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_cover_every_variant() {
        assert_eq!(SessionError::NotBound.category(), "binding");
        assert_eq!(SessionError::HostTerminated.category(), "binding");
        assert_eq!(
            SessionError::persistence_failed("x").category(),
            "persistence"
        );
        assert_eq!(
            SessionError::invalid_configuration("persist_path", "empty").category(),
            "configuration"
        );
    }

    #[test]
    fn only_binding_errors_are_recoverable() {
        assert!(SessionError::NotBound.is_recoverable());
        assert!(!SessionError::HostTerminated.is_recoverable());
        assert!(!SessionError::persistence_failed("disk full").is_recoverable());
        assert!(!SessionError::invalid_configuration("f", "r").is_recoverable());
    }
}
