//! Event vocabulary consumed by the state machine
//!
//! Commands issued by the user, acknowledgments arriving from the transport,
//! and lifecycle signals detected on the platform all share one enum so the
//! host can serialize them into a single ordered queue. Transport results
//! are tagged with the establish attempt they answer, which is how late
//! acknowledgments for superseded attempts are discarded.

use serde::{Deserialize, Serialize};

use crate::session::{SessionId, SessionParams};

/// Identifier of one transport establish attempt
///
/// Monotonically increasing, owned by the state machine. A new attempt id is
/// allocated for every `StartSession` and every reconnect, so an
/// acknowledgment carrying a stale id can never resurrect a session that was
/// ended or restarted in the meantime.
pub type AttemptId = u64;

/// Device orientation reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Everything the state machine can be asked to apply
///
/// Commands and signals are applied one at a time, in arrival order. An
/// event that is not a valid input for the current state is a no-op, never
/// an error; duplicate and late signals are expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    // --- user commands ---
    /// Request a new session with the given parameters
    StartSession {
        session_id: SessionId,
        params: SessionParams,
    },
    /// End the current session
    EndSession,

    // --- transport results ---
    /// The transport finished establishing for the tagged attempt
    ConnectAck { attempt: AttemptId },
    /// The transport refused or timed out for the tagged attempt
    ConnectFailure { attempt: AttemptId, reason: String },
    /// An established transport was lost
    TransportDropped,

    // --- lifecycle signals ---
    /// An OS phone call started; media should be suspended
    PhoneCallStart,
    /// The OS phone call ended; media may resume
    PhoneCallEnd,
    /// The device battery is low
    LowBattery,
    /// The hosting application moved to the background
    AppBackground,
    /// The hosting application returned to the foreground
    AppForeground,
    /// The device orientation changed
    OrientationChange { orientation: Orientation },
}

impl SessionEvent {
    /// Whether this event originated from a lifecycle signal source rather
    /// than a user command or the transport
    pub fn is_signal(&self) -> bool {
        matches!(
            self,
            SessionEvent::PhoneCallStart
                | SessionEvent::PhoneCallEnd
                | SessionEvent::LowBattery
                | SessionEvent::AppBackground
                | SessionEvent::AppForeground
                | SessionEvent::OrientationChange { .. }
                | SessionEvent::TransportDropped
        )
    }

    /// Short name for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::StartSession { .. } => "start_session",
            SessionEvent::EndSession => "end_session",
            SessionEvent::ConnectAck { .. } => "connect_ack",
            SessionEvent::ConnectFailure { .. } => "connect_failure",
            SessionEvent::TransportDropped => "transport_dropped",
            SessionEvent::PhoneCallStart => "phone_call_start",
            SessionEvent::PhoneCallEnd => "phone_call_end",
            SessionEvent::LowBattery => "low_battery",
            SessionEvent::AppBackground => "app_background",
            SessionEvent::AppForeground => "app_foreground",
            SessionEvent::OrientationChange { .. } => "orientation_change",
        }
    }
}
