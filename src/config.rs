//! Host configuration
//!
//! Configuration for the session host: where the minimal restart record
//! lives, how reconnect attempts back off, and how long an establish may
//! run before it is treated as refused.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SessionError, SessionResult};
use crate::host::recovery::RetryConfig;

/// Configuration for a [`SessionHost`](crate::host::SessionHost)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path of the persisted session record
    pub persist_path: PathBuf,
    /// Backoff policy for transparent reconnect attempts
    pub reconnect: RetryConfig,
    /// Maximum time one establish attempt, initial or reconnect, may take
    /// before it is treated as a connect failure
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist_path: PathBuf::from("session.json"),
            reconnect: RetryConfig::default(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    pub fn new(persist_path: impl AsRef<Path>) -> Self {
        Self {
            persist_path: persist_path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Set the reconnect backoff policy
    pub fn with_reconnect(mut self, reconnect: RetryConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the establish attempt timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> SessionResult<()> {
        if self.persist_path.as_os_str().is_empty() {
            return Err(SessionError::invalid_configuration(
                "persist_path",
                "must not be empty",
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(SessionError::invalid_configuration(
                "connect_timeout",
                "must be greater than zero",
            ));
        }
        if self.reconnect.max_attempts == 0 {
            return Err(SessionError::invalid_configuration(
                "reconnect.max_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
