//! Call-session state machine
//!
//! Sole owner of [`SessionState`]. Every command, transport result and
//! lifecycle signal funnels through [`CallSessionStateMachine::apply`], one
//! event at a time, so the transition logic never sees concurrency. The
//! transition function is pure apart from diagnostics timestamps: the next
//! state depends only on the current state and the event being applied.
//!
//! An event that is not a valid input for the current state leaves the state
//! unchanged. This no-op closure is what makes duplicate and late signals
//! (a second `PhoneCallEnd`, a `ConnectAck` for an attempt that was
//! superseded) harmless instead of errors.
//!
//! Transitions that require transport work do not perform it; they return a
//! [`TransportAction`] and the host carries it out. That split keeps the
//! machine synchronous while establish and teardown take unbounded time.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::events::{AttemptId, SessionEvent};
use crate::session::{
    BatteryAdvisory, ConnectionState, ErrorInfo, SessionId, SessionParams, SessionState,
};

/// Side effect requested by a transition, performed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAction {
    /// Establish the transport for a fresh session
    Establish {
        attempt: AttemptId,
        params: SessionParams,
    },
    /// Re-establish a dropped transport, with retry/backoff
    Reestablish {
        attempt: AttemptId,
        params: SessionParams,
    },
    /// Instruct the transport to tear down
    Teardown,
}

/// Outcome of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The new snapshot, or `None` when the event was a no-op
    pub state: Option<SessionState>,
    /// Transport work the host must perform for this transition
    pub action: Option<TransportAction>,
}

impl Transition {
    fn noop() -> Self {
        Self {
            state: None,
            action: None,
        }
    }

    fn to(state: SessionState) -> Self {
        Self {
            state: Some(state),
            action: None,
        }
    }

    fn with_action(state: SessionState, action: TransportAction) -> Self {
        Self {
            state: Some(state),
            action: Some(action),
        }
    }
}

/// The state machine owning the authoritative [`SessionState`]
///
/// Attempt ids are allocated here, monotonically, one per establish or
/// re-establish. A transport result is applied only if it carries the
/// current attempt id; anything else is a stale answer for a superseded
/// attempt and is discarded.
#[derive(Debug)]
pub struct CallSessionStateMachine {
    state: SessionState,
    current_attempt: Option<AttemptId>,
    next_attempt: AttemptId,
}

impl CallSessionStateMachine {
    /// Create a machine in the initial `Disconnected` state
    pub fn new() -> Self {
        Self {
            state: SessionState::initial(),
            current_attempt: None,
            next_attempt: 1,
        }
    }

    /// Create a machine resuming a persisted session
    ///
    /// Used by the host after an involuntary process restart: the restored
    /// session starts in `Connecting` with the persisted parameters, and the
    /// returned action tells the host to establish the transport.
    pub fn resume(session_id: SessionId, params: SessionParams) -> (Self, TransportAction) {
        let mut machine = Self::new();
        let attempt = machine.allocate_attempt();
        machine.state = SessionState {
            session_id: Some(session_id),
            connection: ConnectionState::Connecting,
            active: true,
            paused: false,
            video_mode: params.video_mode,
            session_params: Some(params.clone()),
            last_error: None,
            battery_advisory: None,
            updated_at: Utc::now(),
        };
        info!(session_id = %session_id, attempt, "resuming persisted session");
        (machine, TransportAction::Establish { attempt, params })
    }

    /// The current authoritative snapshot
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn allocate_attempt(&mut self) -> AttemptId {
        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.current_attempt = Some(attempt);
        attempt
    }

    fn attempt_is_current(&self, attempt: AttemptId) -> bool {
        self.current_attempt == Some(attempt)
    }

    /// Apply one event and return the resulting transition
    ///
    /// The caller must serialize invocations; the host does this with its
    /// single event queue.
    pub fn apply(&mut self, event: &SessionEvent) -> Transition {
        let transition = self.compute(event);
        match &transition.state {
            Some(next) => {
                debug_assert!(next.invariants_hold());
                info!(
                    event = event.kind(),
                    from = ?self.state.connection,
                    to = ?next.connection,
                    active = next.active,
                    paused = next.paused,
                    "session transition"
                );
                self.state = next.clone();
            }
            None => {
                // Recorded for diagnostics only; no-op signals never touch state.
                debug!(
                    event = event.kind(),
                    state = ?self.state.connection,
                    "event ignored in current state"
                );
            }
        }
        transition
    }

    fn compute(&mut self, event: &SessionEvent) -> Transition {
        match event {
            SessionEvent::StartSession { session_id, params } => {
                if !self.state.can_start() {
                    // Idempotent: a second start while a session is being
                    // established or is established changes nothing and must
                    // not issue a second establish.
                    return Transition::noop();
                }
                let attempt = self.allocate_attempt();
                let state = SessionState {
                    session_id: Some(*session_id),
                    connection: ConnectionState::Connecting,
                    active: true,
                    paused: false,
                    video_mode: params.video_mode,
                    session_params: Some(params.clone()),
                    last_error: None,
                    battery_advisory: None,
                    updated_at: Utc::now(),
                };
                Transition::with_action(
                    state,
                    TransportAction::Establish {
                        attempt,
                        params: params.clone(),
                    },
                )
            }

            SessionEvent::EndSession => match self.state.connection {
                ConnectionState::Disconnected => Transition::noop(),
                ConnectionState::Failed => {
                    // Acknowledges the failure; nothing is established, so
                    // there is no transport to tear down.
                    self.current_attempt = None;
                    Transition::to(SessionState::initial())
                }
                ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Reconnecting => {
                    self.current_attempt = None;
                    Transition::with_action(SessionState::initial(), TransportAction::Teardown)
                }
            },

            SessionEvent::ConnectAck { attempt } => {
                if !self.attempt_is_current(*attempt) {
                    debug!(attempt, "discarding stale connect ack");
                    return Transition::noop();
                }
                match self.state.connection {
                    ConnectionState::Connecting | ConnectionState::Reconnecting => {
                        self.current_attempt = None;
                        Transition::to(SessionState {
                            connection: ConnectionState::Connected,
                            last_error: None,
                            updated_at: Utc::now(),
                            ..self.state.clone()
                        })
                    }
                    _ => Transition::noop(),
                }
            }

            SessionEvent::ConnectFailure { attempt, reason } => {
                if !self.attempt_is_current(*attempt) {
                    debug!(attempt, "discarding stale connect failure");
                    return Transition::noop();
                }
                match self.state.connection {
                    ConnectionState::Connecting | ConnectionState::Reconnecting => {
                        self.current_attempt = None;
                        warn!(attempt, reason = %reason, "session connect failed");
                        Transition::to(SessionState {
                            connection: ConnectionState::Failed,
                            paused: false,
                            last_error: Some(ErrorInfo::new(reason.clone())),
                            battery_advisory: None,
                            updated_at: Utc::now(),
                            ..self.state.clone()
                        })
                    }
                    _ => Transition::noop(),
                }
            }

            SessionEvent::TransportDropped => {
                if self.state.connection != ConnectionState::Connected {
                    return Transition::noop();
                }
                let Some(params) = self.state.session_params.clone() else {
                    warn!("connected session has no resume parameters; cannot reconnect");
                    return Transition::noop();
                };
                let attempt = self.allocate_attempt();
                Transition::with_action(
                    SessionState {
                        connection: ConnectionState::Reconnecting,
                        battery_advisory: None,
                        updated_at: Utc::now(),
                        ..self.state.clone()
                    },
                    TransportAction::Reestablish { attempt, params },
                )
            }

            SessionEvent::PhoneCallStart => {
                if self.state.connection == ConnectionState::Connected && !self.state.paused {
                    Transition::to(SessionState {
                        paused: true,
                        updated_at: Utc::now(),
                        ..self.state.clone()
                    })
                } else {
                    Transition::noop()
                }
            }

            SessionEvent::PhoneCallEnd => {
                if self.state.connection == ConnectionState::Connected && self.state.paused {
                    Transition::to(SessionState {
                        paused: false,
                        updated_at: Utc::now(),
                        ..self.state.clone()
                    })
                } else {
                    Transition::noop()
                }
            }

            SessionEvent::LowBattery => {
                // Advisory only: recommend a media reduction while connected
                // with video, never force a transition.
                let applies = self.state.active
                    && self.state.connection == ConnectionState::Connected
                    && self.state.video_mode.has_video();
                if applies && self.state.battery_advisory.is_none() {
                    Transition::to(SessionState {
                        battery_advisory: Some(BatteryAdvisory::ReduceVideo),
                        updated_at: Utc::now(),
                        ..self.state.clone()
                    })
                } else {
                    Transition::noop()
                }
            }

            SessionEvent::AppBackground
            | SessionEvent::AppForeground
            | SessionEvent::OrientationChange { .. } => {
                // Background continuation is the host's property, not the
                // machine's; these never move connection/active/paused.
                Transition::noop()
            }
        }
    }
}

impl Default for CallSessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
