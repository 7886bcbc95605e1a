//! Process-resident session host
//!
//! The host binds the state machine to a restart-tolerant execution
//! context. It owns the single event queue that serializes user commands,
//! transport results and lifecycle signals; the state machine only ever
//! runs inside the host's loop, which is the single-writer discipline that
//! keeps the whole system race-free.
//!
//! Restart tolerance: the host writes a minimal record before a start is
//! acknowledged and clears it when an end completes. A host constructed
//! while that record exists resumes the session in `Connecting` instead of
//! reverting to `Disconnected`; losing that continuity would be a
//! correctness bug, not a UX regression.
//!
//! State is published on a `tokio::sync::watch` channel: new subscribers
//! see the current snapshot immediately, everyone sees the same total order
//! of snapshots, and a slow subscriber simply sees the newest snapshot next.

pub mod persist;
pub mod recovery;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{AttemptId, SessionEvent};
use crate::lifecycle::LifecycleSignalSource;
use crate::machine::{CallSessionStateMachine, TransportAction};
use crate::session::{SessionId, SessionParams, SessionState};
use crate::transport::{EstablishOutcome, SessionTransport};

use persist::{PersistedSession, SessionStore};
use recovery::retry_establish;

/// Messages accepted by the host's event loop
pub(crate) enum HostMsg {
    Start {
        params: SessionParams,
        reply: oneshot::Sender<SessionResult<SessionState>>,
    },
    End {
        reply: oneshot::Sender<SessionResult<SessionState>>,
    },
    Event(SessionEvent),
}

/// Counters exposed for debug tooling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Sessions started since the host was created (including a resume)
    pub sessions_started: u64,
    /// Reconnect sequences begun after a transport drop
    pub reconnect_attempts: u64,
    /// Lifecycle signals that were no-ops for the current state
    pub signals_ignored: u64,
}

#[derive(Debug, Default)]
struct StatsInner {
    sessions_started: AtomicU64,
    reconnect_attempts: AtomicU64,
    signals_ignored: AtomicU64,
}

/// Process-resident owner of the call-session state machine
///
/// Outlives any single UI view; cheap to share behind an `Arc`. Dropping
/// every handle stops accepting commands but never tears down an
/// established session on its own.
pub struct SessionHost {
    msg_tx: mpsc::UnboundedSender<HostMsg>,
    state_rx: watch::Receiver<SessionState>,
    stats: Arc<StatsInner>,
}

impl SessionHost {
    /// Create a host, resuming a persisted session if one exists
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn SessionTransport>,
    ) -> SessionResult<Arc<Self>> {
        config.validate()?;
        let store = SessionStore::new(&config.persist_path);
        let stats = Arc::new(StatsInner::default());

        // Detect an involuntary restart before anything is published: a
        // present record yields an initial snapshot of Connecting, never a
        // silent revert to Disconnected.
        let (machine, resume_action) = match store.load() {
            Some(record) => {
                info!(video_mode = ?record.video_mode, "restoring session after host restart");
                stats.sessions_started.fetch_add(1, Ordering::Relaxed);
                let (machine, action) =
                    CallSessionStateMachine::resume(SessionId::new_v4(), record.params);
                (machine, Some(action))
            }
            None => (CallSessionStateMachine::new(), None),
        };

        let (state_tx, state_rx) = watch::channel(machine.state().clone());
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();

        let task = HostTask {
            machine,
            store,
            transport,
            config,
            state_tx,
            msg_tx: msg_tx.clone(),
            stats: stats.clone(),
        };
        tokio::spawn(task.run(msg_rx, resume_action));

        Ok(Arc::new(Self {
            msg_tx,
            state_rx,
            stats,
        }))
    }

    /// Start a session
    ///
    /// Idempotent: if a session is already being established or is
    /// established, the current state is returned and no second establish
    /// is issued. The restart record is written before the `Connecting`
    /// snapshot acknowledges the command.
    pub async fn start(&self, params: SessionParams) -> SessionResult<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.msg_tx
            .send(HostMsg::Start { params, reply })
            .map_err(|_| SessionError::HostTerminated)?;
        rx.await.map_err(|_| SessionError::HostTerminated)?
    }

    /// End the current session
    ///
    /// The transport is instructed to tear down before the `Disconnected`
    /// snapshot is published, and the restart record is cleared.
    pub async fn end(&self) -> SessionResult<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.msg_tx
            .send(HostMsg::End { reply })
            .map_err(|_| SessionError::HostTerminated)?;
        rx.await.map_err(|_| SessionError::HostTerminated)?
    }

    /// Current authoritative snapshot
    pub fn current_state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state snapshots (replay-latest, then live)
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Create a signal source feeding this host's event queue
    pub fn signal_source(&self) -> LifecycleSignalSource {
        LifecycleSignalSource::new(EventSender {
            msg_tx: self.msg_tx.clone(),
        })
    }

    /// Snapshot of host counters
    pub fn stats(&self) -> HostStats {
        HostStats {
            sessions_started: self.stats.sessions_started.load(Ordering::Relaxed),
            reconnect_attempts: self.stats.reconnect_attempts.load(Ordering::Relaxed),
            signals_ignored: self.stats.signals_ignored.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SessionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHost")
            .field("state", &*self.state_rx.borrow())
            .finish()
    }
}

/// Handle for feeding events into a host's queue
///
/// Held by the lifecycle signal source; sending never blocks and never
/// buffers beyond the value being forwarded.
#[derive(Clone)]
pub struct EventSender {
    msg_tx: mpsc::UnboundedSender<HostMsg>,
}

impl EventSender {
    /// Forward one event; silently dropped if the host has terminated
    pub fn send(&self, event: SessionEvent) {
        if self.msg_tx.send(HostMsg::Event(event)).is_err() {
            debug!("host terminated; dropping event");
        }
    }
}

struct HostTask {
    machine: CallSessionStateMachine,
    store: SessionStore,
    transport: Arc<dyn SessionTransport>,
    config: SessionConfig,
    state_tx: watch::Sender<SessionState>,
    msg_tx: mpsc::UnboundedSender<HostMsg>,
    stats: Arc<StatsInner>,
}

impl HostTask {
    async fn run(
        mut self,
        mut msg_rx: mpsc::UnboundedReceiver<HostMsg>,
        resume_action: Option<TransportAction>,
    ) {
        if let Some(action) = resume_action {
            self.perform(action).await;
        }

        while let Some(msg) = msg_rx.recv().await {
            match msg {
                HostMsg::Start { params, reply } => {
                    let result = self.handle_start(params).await;
                    let _ = reply.send(result);
                }
                HostMsg::End { reply } => {
                    let result = self.handle_end().await;
                    let _ = reply.send(result);
                }
                HostMsg::Event(event) => {
                    self.handle_event(event).await;
                }
            }
        }
        debug!("session host event loop stopped");
    }

    async fn handle_start(&mut self, params: SessionParams) -> SessionResult<SessionState> {
        if !self.machine.state().can_start() {
            debug!("start while session in progress; returning current state");
            return Ok(self.machine.state().clone());
        }

        // The record must be durable before the Connecting snapshot
        // acknowledges the command; a process death after this point resumes
        // instead of forgetting the session.
        self.store.save(&PersistedSession::new(params.clone()))?;

        let session_id = SessionId::new_v4();
        let transition = self
            .machine
            .apply(&SessionEvent::StartSession { session_id, params });
        self.stats.sessions_started.fetch_add(1, Ordering::Relaxed);

        if let Some(state) = transition.state {
            self.publish(state);
        }
        if let Some(action) = transition.action {
            self.perform(action).await;
        }
        Ok(self.machine.state().clone())
    }

    async fn handle_end(&mut self) -> SessionResult<SessionState> {
        let transition = self.machine.apply(&SessionEvent::EndSession);

        // Teardown is instructed (and awaited) before the Disconnected
        // snapshot becomes visible to any observer.
        if transition.action == Some(TransportAction::Teardown) {
            self.transport.teardown().await;
        }
        if transition.state.is_some() {
            if let Err(err) = self.store.clear() {
                warn!(error = %err, "failed to clear session record");
            }
        }
        if let Some(state) = transition.state {
            self.publish(state);
        }
        Ok(self.machine.state().clone())
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        let is_signal = event.is_signal();
        let transition = self.machine.apply(&event);

        if transition.state.is_none() && is_signal {
            self.stats.signals_ignored.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(state) = transition.state {
            self.publish(state);
        }
        if let Some(action) = transition.action {
            self.perform(action).await;
        }
    }

    fn publish(&self, state: SessionState) {
        if self.state_tx.send(state).is_err() {
            // No subscribers; the machine still owns the authoritative copy.
            debug!("no state subscribers");
        }
    }

    async fn perform(&mut self, action: TransportAction) {
        match action {
            TransportAction::Establish { attempt, params } => {
                self.spawn_establish(attempt, params, false);
            }
            TransportAction::Reestablish { attempt, params } => {
                self.stats.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
                self.spawn_establish(attempt, params, true);
            }
            TransportAction::Teardown => {
                self.transport.teardown().await;
            }
        }
    }

    /// Run an establish attempt off the event loop; its outcome re-enters
    /// the queue as a normal event and is discarded there if stale.
    fn spawn_establish(&self, attempt: AttemptId, params: SessionParams, reconnect: bool) {
        let transport = self.transport.clone();
        let msg_tx = self.msg_tx.clone();
        let connect_timeout = self.config.connect_timeout;
        let retry = self.config.reconnect.clone();

        tokio::spawn(async move {
            let outcome = if reconnect {
                retry_establish(transport.as_ref(), &params, &retry, connect_timeout).await
            } else {
                match timeout(connect_timeout, transport.establish(&params)).await {
                    Ok(outcome) => outcome,
                    Err(_) => EstablishOutcome::failure("connect timed out"),
                }
            };

            let event = match outcome {
                EstablishOutcome::Ack => SessionEvent::ConnectAck { attempt },
                EstablishOutcome::Failure { reason } => {
                    SessionEvent::ConnectFailure { attempt, reason }
                }
            };
            if msg_tx.send(HostMsg::Event(event)).is_err() {
                error!(attempt, "host terminated before establish outcome was applied");
            }
        });
    }
}
