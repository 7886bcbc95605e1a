//! Lifecycle signal translation
//!
//! Maps raw platform conditions (app moved to background, an OS phone call
//! started, battery dropped below threshold, device rotated, connectivity
//! lost) onto the signal vocabulary the state machine consumes. This layer
//! is translation only: it holds no session state, performs no filtering or
//! deduplication, and forwards each condition immediately. Duplicate
//! signals are expected and tolerated downstream by the machine's no-op
//! closure, not suppressed here.

use tracing::debug;

use crate::events::{Orientation, SessionEvent};
use crate::host::EventSender;

/// Battery level below which a [`SessionEvent::LowBattery`] signal is raised
pub const LOW_BATTERY_THRESHOLD_PERCENT: u8 = 20;

/// Translates platform conditions into session signals
///
/// Obtained from [`SessionHost::signal_source`](crate::host::SessionHost::signal_source);
/// platform glue calls these methods from whatever callback context the OS
/// provides, and the host serializes the results into its single queue.
pub struct LifecycleSignalSource {
    events: EventSender,
}

impl LifecycleSignalSource {
    pub(crate) fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// The hosting application moved to the background
    pub fn app_backgrounded(&self) {
        self.forward(SessionEvent::AppBackground);
    }

    /// The hosting application returned to the foreground
    pub fn app_foregrounded(&self) {
        self.forward(SessionEvent::AppForeground);
    }

    /// An OS phone call started
    pub fn phone_call_started(&self) {
        self.forward(SessionEvent::PhoneCallStart);
    }

    /// The OS phone call ended
    pub fn phone_call_ended(&self) {
        self.forward(SessionEvent::PhoneCallEnd);
    }

    /// The battery level changed; raises `LowBattery` below the threshold
    pub fn battery_level_changed(&self, percent: u8) {
        if percent < LOW_BATTERY_THRESHOLD_PERCENT {
            self.forward(SessionEvent::LowBattery);
        }
    }

    /// The device orientation changed
    pub fn orientation_changed(&self, orientation: Orientation) {
        self.forward(SessionEvent::OrientationChange { orientation });
    }

    /// Connectivity monitoring reported the media transport as lost
    pub fn connection_lost(&self) {
        self.forward(SessionEvent::TransportDropped);
    }

    fn forward(&self, event: SessionEvent) {
        debug!(signal = event.kind(), "lifecycle signal");
        self.events.send(event);
    }
}
