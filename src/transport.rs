//! Transport collaborator seam
//!
//! The media/signaling subsystem that actually negotiates and carries the
//! session is external to this crate. The host talks to it through
//! [`SessionTransport`]: establish with opaque parameters, tear down, and
//! nothing else. Drop notifications from the transport's own monitoring
//! arrive through the lifecycle signal path as `TransportDropped`.

use async_trait::async_trait;

use crate::session::SessionParams;

/// Result of one establish attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstablishOutcome {
    /// The transport is established and media can flow
    Ack,
    /// The transport refused or timed out
    Failure { reason: String },
}

impl EstablishOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

/// External transport/signaling collaborator
///
/// Implementations may take unbounded time in `establish`; the host never
/// blocks its event loop on it. Parameters are passed through opaquely and
/// never inspected.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    /// Establish the transport for a session
    async fn establish(&self, params: &SessionParams) -> EstablishOutcome;

    /// Instruct the transport to tear down
    ///
    /// Called before the session's `Disconnected` snapshot is published.
    /// Tearing down a transport that never finished establishing cancels
    /// the pending attempt.
    async fn teardown(&self);
}
