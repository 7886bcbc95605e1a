//! Session state model
//!
//! This module defines the authoritative description of one call session:
//! the connection state, the interruption flags, and the small parameter
//! record that must survive a process restart. Snapshots are immutable and
//! replaced wholesale on every transition; nothing outside the state machine
//! ever mutates one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one logical session (start to end)
pub type SessionId = Uuid;

/// Connection status of the underlying transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session, or the session has ended
    Disconnected,
    /// A session has been requested and the transport is being established
    Connecting,
    /// The transport is established and media can flow
    Connected,
    /// The transport dropped and is being re-established transparently
    Reconnecting,
    /// Establishment failed; recoverable by starting again
    Failed,
}

impl ConnectionState {
    /// Check whether the transport is live or in the process of becoming live
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }

    /// Check whether this is a resting state (no pending transport work)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }
}

/// Requested media mode for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoMode {
    /// Audio only, no video track
    AudioOnly,
    /// Camera video
    Webcam,
    /// Screen capture video
    ScreenShare,
}

impl VideoMode {
    /// Whether this mode carries a video track
    pub fn has_video(&self) -> bool {
        !matches!(self, VideoMode::AudioOnly)
    }
}

/// Opaque parameters needed to start or resume a session
///
/// The offer payload is never inspected by this crate; it is handed to the
/// transport as-is. The record is intentionally small because it is the one
/// piece of state persisted across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Opaque offer payload forwarded to the transport collaborator
    pub offer: String,
    /// Media mode requested for this session
    pub video_mode: VideoMode,
}

impl SessionParams {
    pub fn new(offer: impl Into<String>, video_mode: VideoMode) -> Self {
        Self {
            offer: offer.into(),
            video_mode,
        }
    }
}

/// Error descriptor attached to a published snapshot
///
/// Hard failures are surfaced here rather than thrown across the
/// subscription boundary; observers read state to learn of failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Human-readable failure reason from the transport or host
    pub reason: String,
    /// When the failure was recorded
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Advisory recommendation computed on low battery
///
/// Attached to the published snapshot; never forces a transition. The
/// consumer decides whether to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryAdvisory {
    /// Reduce video resolution or drop to audio-only to save power
    ReduceVideo,
}

/// Authoritative snapshot of the current call session
///
/// Exactly one snapshot is authoritative at any instant. The state machine
/// replaces it on every transition and distributes it by value; all
/// observers see the same totally ordered sequence of snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Identifier of the current logical session, if one has been requested
    pub session_id: Option<SessionId>,
    /// Transport connection status
    pub connection: ConnectionState,
    /// A session has been requested and not yet ended
    pub active: bool,
    /// Session is active but media is suspended by an interruption
    pub paused: bool,
    /// Media mode of the current session
    pub video_mode: VideoMode,
    /// Parameters needed to resume; present while the session is active
    pub session_params: Option<SessionParams>,
    /// Last hard failure; cleared on the next successful transition
    pub last_error: Option<ErrorInfo>,
    /// Battery recommendation; cleared on the next connection transition
    pub battery_advisory: Option<BatteryAdvisory>,
    /// Diagnostics timestamp of the transition that produced this snapshot
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// The default state before any session has been requested
    pub fn initial() -> Self {
        Self {
            session_id: None,
            connection: ConnectionState::Disconnected,
            active: false,
            paused: false,
            video_mode: VideoMode::AudioOnly,
            session_params: None,
            last_error: None,
            battery_advisory: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether a `StartSession` command would begin a new session
    ///
    /// `StartSession` is idempotent while a session is being established or
    /// is established; only `Disconnected` and `Failed` accept a new start.
    pub fn can_start(&self) -> bool {
        matches!(
            self.connection,
            ConnectionState::Disconnected | ConnectionState::Failed
        )
    }

    /// Validate the structural invariants of a snapshot
    ///
    /// Used by tests and debug assertions; production transitions preserve
    /// these by construction.
    pub fn invariants_hold(&self) -> bool {
        if !self.active && (self.paused || self.connection != ConnectionState::Disconnected) {
            return false;
        }
        if self.paused && !self.active {
            return false;
        }
        if self.connection == ConnectionState::Failed && self.last_error.is_none() {
            return false;
        }
        true
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}
