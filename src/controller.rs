//! UI-facing session controller
//!
//! The controller is the handle UI code holds: bind to a host, issue
//! commands, subscribe to state. Binding is scoped acquisition: rebinding
//! is safe, and unbinding only releases the handle; it never terminates an
//! active session, which keeps the call alive across screen changes.
//!
//! Every command issued while unbound fails immediately with
//! [`SessionError::NotBound`]; failures of the session itself never surface
//! here, they appear as `last_error` on published state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{SessionError, SessionResult};
use crate::host::SessionHost;
use crate::session::{SessionParams, SessionState, VideoMode};

/// UI-facing facade over a [`SessionHost`]
#[derive(Default)]
pub struct SessionController {
    host: Option<Arc<SessionHost>>,
}

impl SessionController {
    /// Create an unbound controller
    pub fn new() -> Self {
        Self { host: None }
    }

    /// Bind to a host; redundant binds simply replace the handle
    pub fn bind(&mut self, host: Arc<SessionHost>) {
        debug!("controller bound to session host");
        self.host = Some(host);
    }

    /// Release the host handle
    ///
    /// Never ends an active session; the host keeps coordinating it.
    pub fn unbind(&mut self) {
        if self.host.take().is_some() {
            debug!("controller unbound from session host");
        }
    }

    /// Whether this controller is currently bound
    pub fn is_bound(&self) -> bool {
        self.host.is_some()
    }

    fn host(&self) -> SessionResult<&Arc<SessionHost>> {
        self.host.as_ref().ok_or(SessionError::NotBound)
    }

    /// Start a call with the given mode and opaque offer payload
    pub async fn start_call(
        &self,
        video_mode: VideoMode,
        offer: impl Into<String>,
    ) -> SessionResult<SessionState> {
        let host = self.host()?;
        host.start(SessionParams::new(offer, video_mode)).await
    }

    /// End the current call
    pub async fn end_call(&self) -> SessionResult<SessionState> {
        self.host()?.end().await
    }

    /// Current authoritative snapshot
    pub fn current_state(&self) -> SessionResult<SessionState> {
        Ok(self.host()?.current_state())
    }

    /// Live view of session state
    ///
    /// The first value yielded is the current snapshot at subscription time
    /// (replay-latest), so a late-binding observer immediately learns about
    /// a session that is already active; subsequent values follow the
    /// authoritative total order. Slow consumers see the newest snapshot
    /// next rather than a growing backlog.
    pub fn state_stream(&self) -> SessionResult<SessionStateStream> {
        Ok(SessionStateStream::new(self.host()?.subscribe()))
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("bound", &self.host.is_some())
            .finish()
    }
}

/// Replay-latest-then-live stream of [`SessionState`] snapshots
///
/// Safe to create any number of these; every stream observes the same total
/// order of snapshots.
#[derive(Debug)]
pub struct SessionStateStream {
    rx: watch::Receiver<SessionState>,
    primed: bool,
}

impl SessionStateStream {
    fn new(rx: watch::Receiver<SessionState>) -> Self {
        Self { rx, primed: false }
    }

    /// The most recent snapshot, without waiting
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Next snapshot: the current one on first call, then each change
    ///
    /// Returns `None` once the host has terminated and no further snapshots
    /// can be produced.
    pub async fn next(&mut self) -> Option<SessionState> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }
}
