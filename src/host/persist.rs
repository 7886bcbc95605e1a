//! Minimal durable session record
//!
//! The one piece of state that must survive process death: enough to resume
//! a session that was active when the OS reclaimed the host. Written before
//! the `Connecting` snapshot acknowledges a start, cleared when an end
//! completes. The host is the only writer.
//!
//! Writes go through a temp file and rename so a crash mid-write leaves
//! either the old record or the new one, never a torn file. Absence of the
//! record on restart means `Disconnected`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SessionResult;
use crate::session::{SessionParams, VideoMode};

/// Persisted session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Media mode of the persisted session
    pub video_mode: VideoMode,
    /// Opaque parameters needed to resume
    pub params: SessionParams,
    /// Whether the session was active when last written
    pub active: bool,
}

impl PersistedSession {
    pub fn new(params: SessionParams) -> Self {
        Self {
            video_mode: params.video_mode,
            params,
            active: true,
        }
    }
}

/// Store for the persisted session record
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write the record atomically
    pub fn save(&self, record: &PersistedSession) -> SessionResult<()> {
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "session record persisted");
        Ok(())
    }

    /// Load the record, if one exists
    ///
    /// A corrupt record is treated the same as an absent one: the session is
    /// unrecoverable, which maps to `Disconnected`, not an error.
    pub fn load(&self) -> Option<PersistedSession> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read session record");
                return None;
            }
        };
        match serde_json::from_slice::<PersistedSession>(&bytes) {
            Ok(record) if record.active => Some(record),
            Ok(_) => None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "discarding corrupt session record");
                None
            }
        }
    }

    /// Remove the record
    pub fn clear(&self) -> SessionResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
