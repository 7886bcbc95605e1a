//! Shared test fixtures: scripted transport and stream helpers

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use rtc_session_core::{
    EstablishOutcome, SessionParams, SessionState, SessionStateStream, SessionTransport,
};

/// Scripted transport collaborator
///
/// Pops one outcome per establish call; an empty script means `Ack`. When
/// gated, establish blocks until the test releases it, which lets tests
/// observe the interim `Connecting` snapshot deterministically.
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<EstablishOutcome>>,
    gate: Option<Semaphore>,
    establish_calls: AtomicUsize,
    teardown_calls: AtomicUsize,
}

impl ScriptedTransport {
    /// Transport that immediately acknowledges every establish
    pub fn acking() -> Arc<Self> {
        Self::with_outcomes(vec![])
    }

    /// Transport that answers establish calls from a script
    pub fn with_outcomes(outcomes: Vec<EstablishOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            gate: None,
            establish_calls: AtomicUsize::new(0),
            teardown_calls: AtomicUsize::new(0),
        })
    }

    /// Transport whose establish blocks until [`release`](Self::release)
    pub fn gated(outcomes: Vec<EstablishOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            gate: Some(Semaphore::new(0)),
            establish_calls: AtomicUsize::new(0),
            teardown_calls: AtomicUsize::new(0),
        })
    }

    /// Allow one pending (or future) establish call to complete
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn establish_count(&self) -> usize {
        self.establish_calls.load(Ordering::SeqCst)
    }

    pub fn teardown_count(&self) -> usize {
        self.teardown_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    async fn establish(&self, _params: &SessionParams) -> EstablishOutcome {
        self.establish_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(EstablishOutcome::Ack)
    }

    async fn teardown(&self) {
        self.teardown_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Await the next snapshot satisfying `pred`, with a hard timeout
pub async fn wait_for(
    stream: &mut SessionStateStream,
    pred: impl Fn(&SessionState) -> bool,
) -> SessionState {
    timeout(Duration::from_secs(2), async {
        loop {
            let state = stream.next().await.expect("state stream ended");
            if pred(&state) {
                return state;
            }
        }
    })
    .await
    .expect("timed out waiting for session state")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rtc_session_core=debug")
        .with_test_writer()
        .try_init();
}
