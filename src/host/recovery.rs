//! Reconnect backoff
//!
//! When an established transport drops, the host re-establishes it
//! transparently. The retries here use exponential backoff with optional
//! jitter so a fleet of clients recovering from the same outage does not
//! reconnect in lockstep.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::session::SessionParams;
use crate::transport::{EstablishOutcome, SessionTransport};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of establish attempts per reconnect
    pub max_attempts: u32,
    /// Initial delay before the second attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Aggressive policy for tests and local development
    pub fn quick() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 1.5,
            use_jitter: false,
        }
    }

    fn delay_for(&self, retry_index: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(retry_index as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);
        let with_jitter = if self.use_jitter {
            // Up to 10% jitter on top of the computed delay.
            capped * (1.0 + rand::random::<f64>() * 0.1)
        } else {
            capped
        };
        Duration::from_millis(with_jitter as u64)
    }
}

/// Re-establish a dropped transport, retrying with backoff
///
/// Each attempt is bounded by `attempt_timeout`; an attempt that neither
/// acks nor fails within that window counts as a failed attempt, so a
/// black-holed transport spends the budget and surfaces a failure instead
/// of hanging the reconnect forever.
///
/// Returns the first `Ack`, or the last failure once the attempt budget is
/// spent. The caller feeds the outcome back into the state machine as a
/// normal event; a stale outcome for a superseded attempt is discarded
/// there.
pub async fn retry_establish(
    transport: &dyn SessionTransport,
    params: &SessionParams,
    config: &RetryConfig,
    attempt_timeout: Duration,
) -> EstablishOutcome {
    let mut last_reason = String::from("no attempts made");
    for attempt_no in 0..config.max_attempts {
        if attempt_no > 0 {
            let delay = config.delay_for(attempt_no - 1);
            debug!(attempt_no, delay_ms = delay.as_millis() as u64, "backing off before reconnect");
            sleep(delay).await;
        }
        match timeout(attempt_timeout, transport.establish(params)).await {
            Ok(EstablishOutcome::Ack) => {
                debug!(attempt_no, "reconnect established");
                return EstablishOutcome::Ack;
            }
            Ok(EstablishOutcome::Failure { reason }) => {
                warn!(attempt_no, reason = %reason, "reconnect attempt failed");
                last_reason = reason;
            }
            Err(_) => {
                warn!(attempt_no, "reconnect attempt timed out");
                last_reason = String::from("connect timed out");
            }
        }
    }
    EstablishOutcome::Failure {
        reason: last_reason,
    }
}
